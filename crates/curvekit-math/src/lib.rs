pub mod aabb;
pub mod banded;
pub mod binomial;
pub mod domain;
pub mod point;
pub mod quadrature;

pub use glam::{dvec2, DVec2};
pub use aabb::Aabb2;
pub use banded::{BandedLu, BandedMatrix};
pub use domain::Domain;
pub use point::ControlPoint;

pub type Point2 = DVec2;
