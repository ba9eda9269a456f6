//! CurveKit geometry: Bezier, B-spline and polyline curves, plus the
//! B-spline algorithms they are built on.

pub mod curve;
pub mod nurbs;
pub mod tessellate;

pub use curve::{
    downcast_mut, BSplineCurve, BezierCurve, Curve, CurveConstructor, CurveKind, CurveRegistry,
    DerivativeOrder, KnotGeneration, PolylineCurve, PolylineKey,
};

use curvekit_math::DVec2;

pub type Bezier1 = BezierCurve<f64>;
pub type Bezier2 = BezierCurve<DVec2>;
pub type BSpline1 = BSplineCurve<f64>;
pub type BSpline2 = BSplineCurve<DVec2>;
pub type Polyline1 = PolylineCurve<f64>;
pub type Polyline2 = PolylineCurve<DVec2>;
