//! Contiguous chains of planar curves.

use std::any::Any;
use std::sync::{Arc, OnceLock};

use curvekit_core::{BoundingBox, CurveError, Result, Tolerance, Validate, EPSILON};
use curvekit_geometry::{downcast_mut, Curve, CurveKind, CurveRegistry, DerivativeOrder, Polyline2};
use curvekit_math::{Aabb2, DVec2, Domain};

type Segment = Box<dyn Curve<DVec2>>;

/// Shared registry holding every built-in kind, paths included.
pub fn default_registry() -> Arc<CurveRegistry<DVec2>> {
    static REGISTRY: OnceLock<Arc<CurveRegistry<DVec2>>> = OnceLock::new();
    REGISTRY
        .get_or_init(|| {
            let mut registry = CurveRegistry::default();
            registry.register(
                CurveKind::Path,
                Box::new(|| -> Box<dyn Curve<DVec2>> { Box::new(Path2::new()) }),
            );
            Arc::new(registry)
        })
        .clone()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Start,
    End,
}

/// A planar curve made of segments joined end to end.
///
/// Segment domains follow each other without gaps, so the path domain is
/// the union of theirs. A segment's last point and the next segment's first
/// point are the same *joint*; global point indices count every joint once,
/// and a closed path also shares its wrap point.
#[derive(Debug, Clone)]
pub struct Path2 {
    segments: Vec<Segment>,
    closed: bool,
    registry: Arc<CurveRegistry<DVec2>>,
    tolerance: Tolerance,
}

impl Default for Path2 {
    fn default() -> Self {
        Self::new()
    }
}

impl Path2 {
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(registry: Arc<CurveRegistry<DVec2>>) -> Self {
        Self {
            segments: Vec::new(),
            closed: false,
            registry,
            tolerance: Tolerance::default(),
        }
    }

    /// Use `tolerance.linear` to decide whether two end points coincide.
    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    pub fn registry(&self) -> &Arc<CurveRegistry<DVec2>> {
        &self.registry
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, index: usize) -> Option<&dyn Curve<DVec2>> {
        self.segments.get(index).map(|s| s.as_ref())
    }

    pub fn segments_count(&self) -> usize {
        self.segments.len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn empty_like(&self) -> Self {
        Self {
            segments: Vec::new(),
            closed: false,
            registry: Arc::clone(&self.registry),
            tolerance: self.tolerance,
        }
    }

    fn coincide(&self, a: DVec2, b: DVec2) -> bool {
        a.distance(b) <= self.tolerance.linear
    }

    fn segment_out_of_range(&self, index: usize) -> CurveError {
        CurveError::OutOfRange(format!(
            "segment index {index} out of range (count {})",
            self.segments.len()
        ))
    }

    /// Global index of the first point of segment `index`.
    fn first_point_index(&self, index: usize) -> usize {
        self.segments[..index]
            .iter()
            .map(|s| s.points_count().saturating_sub(1))
            .sum()
    }

    /// Segment and local point index owning global point `index`.
    ///
    /// Joints resolve to the segment that starts there.
    pub fn point_to_segment(&self, index: usize) -> Result<(usize, usize)> {
        let mut offset = 0;
        for (i, seg) in self.segments.iter().enumerate() {
            let owned = seg.points_count().saturating_sub(1);
            if index < offset + owned {
                return Ok((i, index - offset));
            }
            offset += owned;
        }
        if !self.closed && index == offset {
            if let Some(last) = self.segments.last() {
                return Ok((self.segments.len() - 1, last.points_count().saturating_sub(1)));
            }
        }
        Err(CurveError::OutOfRange(format!(
            "point index {index} out of range (count {})",
            self.points_count()
        )))
    }

    /// Index of the segment whose half-open domain holds `u`.
    ///
    /// The path end belongs to the last segment.
    pub fn param_to_segment_index(&self, u: f64) -> Result<usize> {
        let domain = self.domain();
        if self.segments.is_empty() || !domain.contains(u) {
            return Err(CurveError::OutOfRange(format!(
                "parameter {u} outside [{}, {}]",
                domain.start(),
                domain.end()
            )));
        }
        let i = self.segments.partition_point(|s| s.domain().end() <= u);
        Ok(i.min(self.segments.len() - 1))
    }

    fn segment_for(&self, u: f64) -> Option<&Segment> {
        let u = self.domain().clamp(u);
        let i = self.segments.partition_point(|s| s.domain().end() <= u);
        self.segments.get(i.min(self.segments.len().saturating_sub(1)))
    }

    /// Cut segment `index` at `u` into two new curves of the same kind.
    fn cut_segment(&self, index: usize, u: f64) -> Result<(Segment, Segment)> {
        let seg = &self.segments[index];
        let mut left = self.registry.create(seg.kind())?;
        let mut right = self.registry.create(seg.kind())?;
        seg.cut(u, left.as_mut(), right.as_mut())?;
        Ok((left, right))
    }

    /// Append a copy of `curve` at whichever open end it touches.
    ///
    /// The copy's domain is shifted, never rescaled, so it continues the
    /// path domain, and its joint point is snapped onto the path.
    pub fn append_segment(&mut self, curve: &dyn Curve<DVec2>) -> Result<()> {
        if self.closed {
            return Err(CurveError::InvalidOperation("cannot append to a closed path".to_string()));
        }
        if curve.points_count() == 0 {
            return Err(CurveError::InvalidParameter("cannot append an empty curve".to_string()));
        }
        if self.segments.is_empty() {
            self.segments.push(curve.clone_box());
            return Ok(());
        }
        if self.coincide(curve.start_point(), self.end_point()) {
            self.attach(curve, Side::End)
        } else if self.coincide(curve.end_point(), self.start_point()) {
            self.attach(curve, Side::Start)
        } else {
            Err(CurveError::InvalidParameter(format!(
                "curve from {} to {} touches neither path end ({} / {})",
                curve.start_point(),
                curve.end_point(),
                self.start_point(),
                self.end_point()
            )))
        }
    }

    fn attach(&mut self, curve: &dyn Curve<DVec2>, side: Side) -> Result<()> {
        let domain = self.domain();
        let mut piece = curve.clone_box();
        let d = piece.domain();
        let tolerance = self.tolerance.linear;
        match side {
            Side::End => {
                piece.set_domain(d.shifted(domain.end() - d.start()))?;
                snap_start(piece.as_mut(), self.end_point(), tolerance)?;
                self.segments.push(piece);
            }
            Side::Start => {
                piece.set_domain(d.shifted(domain.start() - d.end()))?;
                snap_end(piece.as_mut(), self.start_point(), tolerance)?;
                self.segments.insert(0, piece);
            }
        }
        log::debug!(
            "attached {:?} segment at path {side:?}, {} segments",
            curve.kind(),
            self.segments.len()
        );
        Ok(())
    }

    /// Append every segment of `other`; nothing changes if any of them fails.
    pub fn append_path(&mut self, other: &Path2) -> Result<()> {
        if self.closed || other.closed {
            return Err(CurveError::InvalidOperation("cannot join closed paths".to_string()));
        }
        if other.is_empty() {
            return Ok(());
        }
        let mut work = self.clone();
        if work.is_empty() {
            work.segments = other.segments.clone();
        } else if self.coincide(other.start_point(), self.end_point()) {
            for seg in &other.segments {
                work.attach(seg.as_ref(), Side::End)?;
            }
        } else if self.coincide(other.end_point(), self.start_point()) {
            for seg in other.segments.iter().rev() {
                work.attach(seg.as_ref(), Side::Start)?;
            }
        } else {
            return Err(CurveError::InvalidParameter(
                "paths do not share an end point".to_string(),
            ));
        }
        *self = work;
        Ok(())
    }

    /// Remove the first or last segment of an open path.
    pub fn remove_segment(&mut self, index: usize) -> Result<Segment> {
        if index >= self.segments.len() {
            return Err(self.segment_out_of_range(index));
        }
        if self.closed {
            return Err(CurveError::InvalidOperation(
                "cannot remove a segment from a closed path".to_string(),
            ));
        }
        if index != 0 && index != self.segments.len() - 1 {
            return Err(CurveError::InvalidOperation(format!(
                "segment {index} is not at a path end"
            )));
        }
        Ok(self.segments.remove(index))
    }

    /// Swap segment `index` for a copy of `curve` with the same end points.
    ///
    /// The copy takes over the replaced segment's domain.
    pub fn replace_segment(&mut self, index: usize, curve: &dyn Curve<DVec2>) -> Result<()> {
        let old = self
            .segments
            .get(index)
            .ok_or_else(|| self.segment_out_of_range(index))?;
        if curve.points_count() == 0 {
            return Err(CurveError::InvalidParameter("cannot insert an empty curve".to_string()));
        }
        let (start, end) = (old.start_point(), old.end_point());
        if !self.coincide(curve.start_point(), start) || !self.coincide(curve.end_point(), end) {
            return Err(CurveError::InvalidParameter(format!(
                "replacement must run from {start} to {end}"
            )));
        }
        let mut piece = curve.clone_box();
        piece.set_domain(old.domain())?;
        snap_start(piece.as_mut(), start, self.tolerance.linear)?;
        snap_end(piece.as_mut(), end, self.tolerance.linear)?;
        self.segments[index] = piece;
        Ok(())
    }

    /// Split the segment under `u` so a joint sits at `u`.
    ///
    /// Returns the global index of that joint.
    pub fn add_point(&mut self, u: f64) -> Result<usize> {
        let i = self.param_to_segment_index(u)?;
        let seg_domain = self.segments[i].domain();
        if seg_domain.is_start(u) {
            return Ok(self.first_point_index(i));
        }
        if seg_domain.is_end(u) {
            return Ok(if i + 1 < self.segments.len() {
                self.first_point_index(i + 1)
            } else if self.closed {
                0
            } else {
                self.points_count() - 1
            });
        }
        let (left, right) = self.cut_segment(i, u)?;
        let index = self.first_point_index(i) + left.points_count().saturating_sub(1);
        self.segments[i] = left;
        self.segments.insert(i + 1, right);
        Ok(index)
    }

    /// Open a closed path at `u`, which becomes the new start.
    ///
    /// Segments are rotated and shifted so the domain is unchanged.
    pub fn open_path(&mut self, u: f64) -> Result<()> {
        if !self.closed {
            return Err(CurveError::InvalidOperation("path is already open".to_string()));
        }
        let i = self.param_to_segment_index(u)?;
        let domain = self.domain();
        let u = domain.clamp(u);
        if domain.is_start(u) || domain.is_end(u) {
            self.closed = false;
            return Ok(());
        }

        let seg_domain = self.segments[i].domain();
        let (mut head, tail): (Vec<Segment>, Vec<Segment>) = if seg_domain.is_start(u) {
            (self.segments[i..].to_vec(), self.segments[..i].to_vec())
        } else if seg_domain.is_end(u) {
            (self.segments[i + 1..].to_vec(), self.segments[..=i].to_vec())
        } else {
            let (left, right) = self.cut_segment(i, u)?;
            let mut head = vec![right];
            head.extend_from_slice(&self.segments[i + 1..]);
            let mut tail = self.segments[..i].to_vec();
            tail.push(left);
            (head, tail)
        };

        let shift = domain.start() - u;
        for seg in &mut head {
            let d = seg.domain();
            seg.set_domain(d.shifted(shift))?;
        }
        for mut seg in tail {
            let d = seg.domain();
            seg.set_domain(d.shifted(shift + domain.length()))?;
            head.push(seg);
        }

        log::debug!("opened path at {u}, {} segments", head.len());
        self.segments = head;
        self.closed = false;
        Ok(())
    }

    /// Close the path, bridging a gap between the ends with a straight segment.
    pub fn close_path(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        if self.segments.is_empty() {
            return Err(CurveError::InvalidOperation("cannot close an empty path".to_string()));
        }
        let (start, end) = (self.start_point(), self.end_point());
        if self.coincide(start, end) {
            let tolerance = self.tolerance.linear;
            if let Some(last) = self.segments.last_mut() {
                snap_end(last.as_mut(), start, tolerance)?;
            }
        } else {
            let at = self.domain().end();
            let bridge = Polyline2::from_points(&[end, start], Domain::new(at, at + 1.0)?)?;
            self.attach(&bridge, Side::End)?;
        }
        self.closed = true;
        Ok(())
    }

    /// Cut at `u` into two new paths; the receiver is left untouched.
    ///
    /// A closed path is opened at `u` and returned whole as the left piece.
    pub fn split_path(&self, u: f64) -> Result<(Path2, Path2)> {
        if self.closed {
            let mut opened = self.clone();
            opened.open_path(u)?;
            return Ok((opened, self.empty_like()));
        }
        let i = self.param_to_segment_index(u)?;
        let seg_domain = self.segments[i].domain();
        let mut left = self.empty_like();
        let mut right = self.empty_like();
        if seg_domain.is_start(u) {
            left.segments = self.segments[..i].to_vec();
            right.segments = self.segments[i..].to_vec();
        } else if seg_domain.is_end(u) {
            left.segments = self.segments[..=i].to_vec();
            right.segments = self.segments[i + 1..].to_vec();
        } else {
            let (l, r) = self.cut_segment(i, u)?;
            left.segments = self.segments[..i].to_vec();
            left.segments.push(l);
            right.segments.push(r);
            right.segments.extend_from_slice(&self.segments[i + 1..]);
        }
        log::debug!(
            "split path at {u}: {} + {} segments",
            left.segments.len(),
            right.segments.len()
        );
        Ok((left, right))
    }

    /// Bounding box of all control points.
    pub fn aabb(&self) -> Option<Aabb2> {
        let mut aabb: Option<Aabb2> = None;
        for seg in &self.segments {
            for i in 0..seg.points_count() {
                let Ok(p) = seg.point(i) else { continue };
                match aabb.as_mut() {
                    Some(b) => b.include(p),
                    None => aabb = Some(Aabb2::new(p, p)),
                }
            }
        }
        aabb
    }
}

fn snap_start(curve: &mut dyn Curve<DVec2>, joint: DVec2, tolerance: f64) -> Result<()> {
    if curve.point(0)?.distance(joint) <= tolerance {
        curve.set_point(0, joint)?;
    }
    Ok(())
}

fn snap_end(curve: &mut dyn Curve<DVec2>, joint: DVec2, tolerance: f64) -> Result<()> {
    let last = curve.points_count().saturating_sub(1);
    if curve.point(last)?.distance(joint) <= tolerance {
        curve.set_point(last, joint)?;
    }
    Ok(())
}

impl Curve<DVec2> for Path2 {
    fn kind(&self) -> CurveKind {
        CurveKind::Path
    }

    fn domain(&self) -> Domain {
        match (self.segments.first(), self.segments.last()) {
            (Some(first), Some(last)) => first.domain().union(&last.domain()),
            _ => Domain::default(),
        }
    }

    /// Rescale every segment domain affinely onto `domain`.
    fn set_domain(&mut self, domain: Domain) -> Result<()> {
        if self.segments.is_empty() {
            return Ok(());
        }
        let map = self.domain().remap_to(&domain)?;
        let mut segments = self.segments.clone();
        for seg in &mut segments {
            let d = seg.domain();
            seg.set_domain(Domain::new(map(d.start()), map(d.end()))?)?;
        }
        self.segments = segments;
        Ok(())
    }

    fn points_count(&self) -> usize {
        if self.segments.is_empty() {
            return 0;
        }
        let shared: usize = self
            .segments
            .iter()
            .map(|s| s.points_count().saturating_sub(1))
            .sum();
        shared + usize::from(!self.closed)
    }

    fn point(&self, index: usize) -> Result<DVec2> {
        let (i, local) = self.point_to_segment(index)?;
        self.segments[i].point(local)
    }

    /// Move a point; a joint moves in both segments sharing it.
    fn set_point(&mut self, index: usize, point: DVec2) -> Result<()> {
        let (i, local) = self.point_to_segment(index)?;
        self.segments[i].set_point(local, point)?;
        if local == 0 {
            let previous = if i > 0 {
                Some(i - 1)
            } else if self.closed {
                Some(self.segments.len() - 1)
            } else {
                None
            };
            if let Some(j) = previous {
                let last = self.segments[j].points_count().saturating_sub(1);
                self.segments[j].set_point(last, point)?;
            }
        }
        Ok(())
    }

    fn evaluate(&self, u: f64) -> DVec2 {
        self.segment_for(u).map_or(DVec2::ZERO, |s| s.evaluate(u))
    }

    fn derivative(&self, order: DerivativeOrder, u: f64) -> DVec2 {
        self.segment_for(u)
            .map_or(DVec2::ZERO, |s| s.derivative(order, u))
    }

    fn clear(&mut self) {
        self.segments.clear();
        self.closed = false;
    }

    fn clone_box(&self) -> Box<dyn Curve<DVec2>> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn do_cut(&self, u: f64, left: &mut dyn Curve<DVec2>, right: &mut dyn Curve<DVec2>) -> Result<()> {
        let (lhs, rhs) = self.split_path(u)?;
        *downcast_mut::<Path2, DVec2>(left)? = lhs;
        *downcast_mut::<Path2, DVec2>(right)? = rhs;
        Ok(())
    }

    fn length(&self, u0: f64, u1: f64, max_error: f64) -> f64 {
        let domain = self.domain();
        let (a, b) = if u0 <= u1 { (u0, u1) } else { (u1, u0) };
        let (a, b) = (domain.clamp(a), domain.clamp(b));
        self.segments
            .iter()
            .map(|s| {
                let d = s.domain();
                let (lo, hi) = (a.max(d.start()), b.min(d.end()));
                if hi > lo {
                    s.length(lo, hi, max_error)
                } else {
                    0.0
                }
            })
            .sum()
    }

    fn global_parameter(&self, curve_pos: f64, max_error: f64, max_iterations: usize) -> Result<f64> {
        let domain = self.domain();
        if curve_pos <= 0.0 || self.segments.is_empty() {
            return Ok(domain.start());
        }
        let mut walked = 0.0;
        for seg in &self.segments {
            let len = seg.total_length(max_error);
            if curve_pos < walked + len {
                return seg.global_parameter(curve_pos - walked, max_error, max_iterations);
            }
            walked += len;
        }
        Ok(domain.end())
    }

    fn flatten_breaks(&self) -> Vec<f64> {
        let mut breaks: Vec<f64> = self.segments.iter().map(|s| s.domain().start()).collect();
        breaks.push(self.domain().end());
        breaks
    }

    /// Flatten each segment, dropping repeated joints and the wrap point.
    fn flatten(&self, max_deviation: f64) -> Vec<DVec2> {
        let mut points: Vec<DVec2> = Vec::new();
        for seg in &self.segments {
            for p in seg.flatten(max_deviation) {
                if points.last().map_or(true, |&q| !self.coincide(p, q)) {
                    points.push(p);
                }
            }
        }
        if self.closed && points.len() > 1 && self.coincide(points[0], points[points.len() - 1]) {
            points.pop();
        }
        points
    }
}

impl BoundingBox for Path2 {
    type Point = DVec2;

    fn bounding_box(&self) -> Option<(DVec2, DVec2)> {
        self.aabb().map(|b| (b.min, b.max))
    }
}

impl Validate for Path2 {
    fn validate(&self) -> Result<()> {
        for (i, w) in self.segments.windows(2).enumerate() {
            if (w[0].domain().end() - w[1].domain().start()).abs() > EPSILON {
                return Err(CurveError::InvalidParameter(format!(
                    "segments {i} and {} leave a parameter gap",
                    i + 1
                )));
            }
            if !self.coincide(w[0].end_point(), w[1].start_point()) {
                return Err(CurveError::InvalidParameter(format!(
                    "segments {i} and {} do not meet",
                    i + 1
                )));
            }
        }
        if self.closed {
            if let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) {
                if !self.coincide(last.end_point(), first.start_point()) {
                    return Err(CurveError::InvalidParameter("closed path does not wrap".to_string()));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_geometry::Bezier2;
    use curvekit_math::dvec2;

    fn line(a: DVec2, b: DVec2) -> Polyline2 {
        Polyline2::from_points(&[a, b], Domain::unit()).unwrap()
    }

    fn elbow() -> Path2 {
        let mut path = Path2::new();
        path.append_segment(&line(dvec2(0.0, 0.0), dvec2(1.0, 0.0))).unwrap();
        path.append_segment(&line(dvec2(1.0, 0.0), dvec2(1.0, 1.0))).unwrap();
        path
    }

    #[test]
    fn test_point_indexing() {
        let path = elbow();
        assert_eq!(path.points_count(), 3);
        assert_eq!(path.point_to_segment(0).unwrap(), (0, 0));
        assert_eq!(path.point_to_segment(1).unwrap(), (1, 0));
        assert_eq!(path.point_to_segment(2).unwrap(), (1, 1));
        assert!(path.point_to_segment(3).is_err());
        assert_eq!(path.point(1).unwrap(), dvec2(1.0, 0.0));
    }

    #[test]
    fn test_joint_moves_in_both_segments() {
        let mut path = elbow();
        path.set_point(1, dvec2(2.0, 0.0)).unwrap();
        assert_eq!(path.segments()[0].end_point(), dvec2(2.0, 0.0));
        assert_eq!(path.segments()[1].start_point(), dvec2(2.0, 0.0));
        path.validate().unwrap();
    }

    #[test]
    fn test_segment_lookup_is_half_open() {
        let path = elbow();
        assert_eq!(path.param_to_segment_index(0.5).unwrap(), 0);
        assert_eq!(path.param_to_segment_index(1.0).unwrap(), 1);
        assert_eq!(path.param_to_segment_index(2.0).unwrap(), 1);
        assert!(path.param_to_segment_index(2.5).is_err());
    }

    #[test]
    fn test_prepend_shifts_domain_backwards() {
        let mut path = elbow();
        path.append_segment(&line(dvec2(-1.0, 0.0), dvec2(0.0, 0.0))).unwrap();
        assert_eq!(path.segments_count(), 3);
        assert_eq!(path.domain(), Domain::new(-1.0, 2.0).unwrap());
        assert_eq!(path.start_point(), dvec2(-1.0, 0.0));
        path.validate().unwrap();
    }

    #[test]
    fn test_replace_segment_keeps_domain() {
        let mut path = elbow();
        let arc = Bezier2::new(
            &[dvec2(1.0, 0.0), dvec2(2.0, 0.5), dvec2(1.0, 1.0)],
            Domain::new(7.0, 9.0).unwrap(),
        )
        .unwrap();
        path.replace_segment(1, &arc).unwrap();
        assert_eq!(path.segments()[1].kind(), CurveKind::Bezier);
        assert_eq!(path.segments()[1].domain(), Domain::new(1.0, 2.0).unwrap());

        let wrong = line(dvec2(1.0, 0.0), dvec2(3.0, 3.0));
        assert!(matches!(
            path.replace_segment(1, &wrong),
            Err(CurveError::InvalidParameter(_))
        ));
        assert!(path.replace_segment(4, &arc).is_err());
    }
}
