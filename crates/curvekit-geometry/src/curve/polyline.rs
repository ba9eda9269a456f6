//! Piecewise linear curves through parameter-tagged keys.

use std::any::Any;

use curvekit_core::{CurveError, Result, EPSILON};
use curvekit_math::{ControlPoint, Domain};
use serde::{Deserialize, Serialize};

use super::{downcast_mut, index_error, Curve, CurveKind, DerivativeOrder};

/// A value pinned to a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolylineKey<P> {
    pub parameter: f64,
    pub value: P,
}

impl<P> PolylineKey<P> {
    pub fn new(parameter: f64, value: P) -> Self {
        Self { parameter, value }
    }
}

/// Linear interpolation between keys sorted by parameter.
///
/// The domain always spans the first and last key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PolylineCurve<P> {
    keys: Vec<PolylineKey<P>>,
}

impl<P: ControlPoint> PolylineCurve<P> {
    pub fn from_keys(keys: &[PolylineKey<P>]) -> Result<Self> {
        let mut curve = Self::default();
        curve.set_keys(keys)?;
        Ok(curve)
    }

    pub fn from_points(points: &[P], domain: Domain) -> Result<Self> {
        let mut curve = Self::default();
        curve.set_points(points, domain)?;
        Ok(curve)
    }

    /// Replace every key; keys closer than `EPSILON` collapse into the later one.
    pub fn set_keys(&mut self, keys: &[PolylineKey<P>]) -> Result<()> {
        if keys.is_empty() {
            return Err(CurveError::InvalidParameter("a polyline needs at least one key".to_string()));
        }
        if keys.iter().any(|k| !k.parameter.is_finite()) {
            return Err(CurveError::InvalidParameter("key parameters must be finite".to_string()));
        }
        let mut sorted = Vec::new();
        sorted.try_reserve_exact(keys.len())?;
        sorted.extend_from_slice(keys);
        sorted.sort_by(|a, b| a.parameter.total_cmp(&b.parameter));

        let mut merged: Vec<PolylineKey<P>> = Vec::with_capacity(sorted.len());
        for key in sorted {
            match merged.last_mut() {
                Some(last) if key.parameter - last.parameter <= EPSILON => last.value = key.value,
                _ => merged.push(key),
            }
        }
        self.keys = merged;
        Ok(())
    }

    /// Replace every key with `points` spread evenly over `domain`.
    pub fn set_points(&mut self, points: &[P], domain: Domain) -> Result<()> {
        if points.len() > 1 && domain.is_degenerate() {
            return Err(CurveError::InvalidParameter(
                "cannot spread several points over a degenerate domain".to_string(),
            ));
        }
        let last = points.len().saturating_sub(1).max(1) as f64;
        let keys: Vec<_> = points
            .iter()
            .enumerate()
            .map(|(i, &value)| PolylineKey::new(domain.from_local(i as f64 / last), value))
            .collect();
        self.set_keys(&keys)
    }

    pub fn keys(&self) -> &[PolylineKey<P>] {
        &self.keys
    }

    /// Index `i` of the key with `key[i] <= u < key[i + 1]`.
    ///
    /// The domain end maps to the last key.
    pub fn param_to_key_index(&self, u: f64) -> Result<usize> {
        let domain = self.domain();
        if self.keys.is_empty() || !domain.contains(u) {
            return Err(CurveError::OutOfRange(format!(
                "parameter {u} outside [{}, {}]",
                domain.start(),
                domain.end()
            )));
        }
        let last = self.keys.len() - 1;
        if u >= self.keys[last].parameter {
            return Ok(last);
        }
        Ok(self
            .keys
            .partition_point(|k| k.parameter <= u)
            .saturating_sub(1))
    }

    /// Index of the segment used to evaluate `u`; the last segment at the end.
    fn segment_index(&self, u: f64) -> usize {
        let u = self.domain().clamp(u);
        let i = self.keys.partition_point(|k| k.parameter <= u).saturating_sub(1);
        i.min(self.keys.len().saturating_sub(2))
    }

    fn slope(&self, segment: usize) -> P {
        match (self.keys.get(segment), self.keys.get(segment + 1)) {
            (Some(a), Some(b)) => (b.value - a.value) / (b.parameter - a.parameter),
            _ => P::ZERO,
        }
    }

    /// Insert a key, or overwrite the value of one within `EPSILON`.
    ///
    /// Returns the index of the key.
    pub fn add_key(&mut self, key: PolylineKey<P>) -> Result<usize> {
        if !key.parameter.is_finite() {
            return Err(CurveError::InvalidParameter("key parameters must be finite".to_string()));
        }
        let i = self.keys.partition_point(|k| k.parameter < key.parameter);
        for j in [i.wrapping_sub(1), i] {
            if let Some(existing) = self.keys.get_mut(j) {
                if (existing.parameter - key.parameter).abs() <= EPSILON {
                    existing.value = key.value;
                    return Ok(j);
                }
            }
        }
        self.keys.insert(i, key);
        Ok(i)
    }

    pub fn remove_key(&mut self, index: usize) -> Result<PolylineKey<P>> {
        if index >= self.keys.len() {
            return Err(index_error(index, self.keys.len()));
        }
        Ok(self.keys.remove(index))
    }

    /// Move a key to `parameter`, merging with any key already there.
    ///
    /// Returns the new index of the key.
    pub fn move_key(&mut self, index: usize, parameter: f64) -> Result<usize> {
        if !parameter.is_finite() {
            return Err(CurveError::InvalidParameter("key parameters must be finite".to_string()));
        }
        let key = self.remove_key(index)?;
        self.add_key(PolylineKey::new(parameter, key.value))
    }

    /// Left and right first derivatives; they differ on interior keys.
    pub fn derivative_lr(&self, u: f64) -> Result<(P, P)> {
        let index = self.param_to_key_index(u)?;
        if self.keys.len() < 2 {
            return Ok((P::ZERO, P::ZERO));
        }
        let right = self.segment_index(u);
        let on_key = (self.keys[index].parameter - u).abs() <= EPSILON;
        let left = if on_key && index > 0 && index < self.keys.len() - 1 {
            index - 1
        } else {
            right
        };
        Ok((self.slope(left), self.slope(right)))
    }
}

impl<P: ControlPoint> Curve<P> for PolylineCurve<P> {
    fn kind(&self) -> CurveKind {
        CurveKind::Polyline
    }

    fn domain(&self) -> Domain {
        match (self.keys.first(), self.keys.last()) {
            (Some(first), Some(last)) => Domain::new(first.parameter, last.parameter)
                .unwrap_or_else(|_| Domain::degenerate(first.parameter)),
            _ => Domain::default(),
        }
    }

    fn set_domain(&mut self, domain: Domain) -> Result<()> {
        if self.keys.len() > 1 && domain.is_degenerate() {
            return Err(CurveError::InvalidParameter(
                "cannot collapse polyline keys onto a degenerate domain".to_string(),
            ));
        }
        if self.keys.len() == 1 {
            self.keys[0].parameter = domain.start();
            return Ok(());
        }
        let map = self.domain().remap_to(&domain)?;
        for key in &mut self.keys {
            key.parameter = map(key.parameter);
        }
        Ok(())
    }

    fn points_count(&self) -> usize {
        self.keys.len()
    }

    fn point(&self, index: usize) -> Result<P> {
        self.keys
            .get(index)
            .map(|k| k.value)
            .ok_or_else(|| index_error(index, self.keys.len()))
    }

    fn set_point(&mut self, index: usize, point: P) -> Result<()> {
        let count = self.keys.len();
        let key = self
            .keys
            .get_mut(index)
            .ok_or_else(|| index_error(index, count))?;
        key.value = point;
        Ok(())
    }

    fn evaluate(&self, u: f64) -> P {
        match self.keys.as_slice() {
            [] => P::ZERO,
            [only] => only.value,
            keys => {
                let i = self.segment_index(u);
                let (a, b) = (keys[i], keys[i + 1]);
                let t = (self.domain().clamp(u) - a.parameter) / (b.parameter - a.parameter);
                a.value.lerp(b.value, t)
            }
        }
    }

    fn derivative(&self, order: DerivativeOrder, u: f64) -> P {
        match order {
            DerivativeOrder::First if self.keys.len() > 1 => self.slope(self.segment_index(u)),
            _ => P::ZERO,
        }
    }

    fn clear(&mut self) {
        self.keys.clear();
    }

    fn clone_box(&self) -> Box<dyn Curve<P>> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn do_cut(&self, u: f64, left: &mut dyn Curve<P>, right: &mut dyn Curve<P>) -> Result<()> {
        let left = downcast_mut::<Self, P>(left)?;
        let right = downcast_mut::<Self, P>(right)?;
        let domain = self.domain();
        if self.keys.is_empty() || domain.is_start(u) {
            left.clear();
            *right = self.clone();
            return Ok(());
        }
        if domain.is_end(u) {
            *left = self.clone();
            right.clear();
            return Ok(());
        }

        let split = PolylineKey::new(u, self.evaluate(u));
        let mut lhs: Vec<_> = self
            .keys
            .iter()
            .copied()
            .filter(|k| k.parameter < u - EPSILON)
            .collect();
        lhs.push(split);
        let mut rhs = vec![split];
        rhs.extend(self.keys.iter().copied().filter(|k| k.parameter > u + EPSILON));

        left.keys = lhs;
        right.keys = rhs;
        Ok(())
    }

    fn flatten_breaks(&self) -> Vec<f64> {
        self.keys.iter().map(|k| k.parameter).collect()
    }

    fn flatten(&self, _max_deviation: f64) -> Vec<P> {
        self.keys.iter().map(|k| k.value).collect()
    }
}
