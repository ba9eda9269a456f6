//! CurveKit paths: planar curves joined end to end, and a builder that
//! turns drawing commands into them.

pub mod builder;
pub mod path;

pub use builder::{PathBuilder, PathCommand};
pub use path::{default_registry, Path2};
