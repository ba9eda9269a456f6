pub mod error;
pub mod tolerance;
pub mod traits;

pub use error::{CurveError, Result};
pub use tolerance::{Tolerance, DEFAULT_MAX_ERROR, DEFAULT_MAX_ITERATIONS, EPSILON};
pub use traits::{BoundingBox, Validate};
