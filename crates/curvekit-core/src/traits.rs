use crate::error::Result;

/// Validate structural integrity of a curve or path.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Compute an axis-aligned bounding box.
pub trait BoundingBox {
    type Point;
    fn bounding_box(&self) -> Option<(Self::Point, Self::Point)>;
}
