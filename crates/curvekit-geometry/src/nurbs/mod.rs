//! B-spline core algorithms: knot vector utilities, De Boor evaluation,
//! knot removal and global interpolation.

pub mod deboor;
pub mod fit;
pub mod knot;
pub mod removal;

pub use deboor::{curve_derivative, curve_point};
pub use fit::{interpolate, EndCondition, Interpolant};
pub use knot::{
    basis_functions, basis_functions_derivs, basis_functions_into, find_span, find_span_mult,
    multiplicity, BasisScratch,
};
pub use removal::remove_knot;
