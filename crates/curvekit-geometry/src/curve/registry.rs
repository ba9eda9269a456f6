//! Constructors for empty curves, looked up by [`CurveKind`].

use std::collections::HashMap;
use std::fmt;

use curvekit_core::{CurveError, Result};
use curvekit_math::ControlPoint;

use super::{BSplineCurve, BezierCurve, Curve, CurveKind, PolylineCurve};

pub type CurveConstructor<P> = Box<dyn Fn() -> Box<dyn Curve<P>> + Send + Sync>;

/// Creates empty curves of a requested kind.
///
/// Paths use it to allocate the two pieces of a segment cut without knowing
/// the segment's concrete type.
pub struct CurveRegistry<P: ControlPoint> {
    constructors: HashMap<CurveKind, CurveConstructor<P>>,
}

impl<P: ControlPoint> CurveRegistry<P> {
    /// A registry with nothing registered.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Register `constructor` for `kind`, returning the one it replaces.
    pub fn register(&mut self, kind: CurveKind, constructor: CurveConstructor<P>) -> Option<CurveConstructor<P>> {
        self.constructors.insert(kind, constructor)
    }

    pub fn unregister(&mut self, kind: CurveKind) -> bool {
        self.constructors.remove(&kind).is_some()
    }

    pub fn is_registered(&self, kind: CurveKind) -> bool {
        self.constructors.contains_key(&kind)
    }

    pub fn create(&self, kind: CurveKind) -> Result<Box<dyn Curve<P>>> {
        self.constructors
            .get(&kind)
            .map(|make| make())
            .ok_or_else(|| CurveError::UnsupportedType(format!("no constructor registered for {kind:?}")))
    }
}

impl<P: ControlPoint> Default for CurveRegistry<P> {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(
            CurveKind::Bezier,
            Box::new(|| -> Box<dyn Curve<P>> { Box::new(BezierCurve::<P>::default()) }),
        );
        registry.register(
            CurveKind::BSpline,
            Box::new(|| -> Box<dyn Curve<P>> { Box::new(BSplineCurve::<P>::default()) }),
        );
        registry.register(
            CurveKind::Polyline,
            Box::new(|| -> Box<dyn Curve<P>> { Box::new(PolylineCurve::<P>::default()) }),
        );
        registry
    }
}

impl<P: ControlPoint> fmt::Debug for CurveRegistry<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CurveRegistry")
            .field("kinds", &self.constructors.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_kinds() {
        let registry = CurveRegistry::<f64>::default();
        for kind in [CurveKind::Bezier, CurveKind::BSpline, CurveKind::Polyline] {
            let curve = registry.create(kind).unwrap();
            assert_eq!(curve.kind(), kind);
            assert_eq!(curve.points_count(), 0);
        }
        assert!(matches!(
            registry.create(CurveKind::Path),
            Err(CurveError::UnsupportedType(_))
        ));
    }

    #[test]
    fn test_unregister() {
        let mut registry = CurveRegistry::<f64>::default();
        assert!(registry.unregister(CurveKind::Bezier));
        assert!(!registry.is_registered(CurveKind::Bezier));
        assert!(registry.create(CurveKind::Bezier).is_err());
        assert!(!registry.unregister(CurveKind::Bezier));
    }
}
