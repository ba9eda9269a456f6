//! Command-stream construction of paths.

use std::f64::consts::FRAC_PI_2;

use curvekit_core::{CurveError, Result, Tolerance, EPSILON};
use curvekit_geometry::{BSpline2, Bezier2, Curve, KnotGeneration, Polyline2};
use curvekit_math::{DVec2, Domain};
use serde::{Deserialize, Serialize};

use crate::path::Path2;

/// One drawing command. Every command but `MoveTo` and `Close` adds
/// segments that start at the current point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PathCommand {
    MoveTo {
        to: DVec2,
    },
    LineTo {
        to: DVec2,
    },
    QuadTo {
        control: DVec2,
        to: DVec2,
    },
    CubicTo {
        control1: DVec2,
        control2: DVec2,
        to: DVec2,
    },
    /// Clamped uniform B-spline through the current point and `controls`.
    /// `degree` must lie in `1..=controls.len()`.
    #[serde(rename = "bspline_to")]
    BSplineTo {
        controls: Vec<DVec2>,
        degree: usize,
    },
    /// Elliptical arc around `center`, starting at the current point.
    ArcTo {
        center: DVec2,
        radii: DVec2,
        sweep_angle: f64,
        #[serde(default)]
        x_rotation: f64,
    },
    Close,
}

/// Records commands and turns them into one [`Path2`] per sub-path.
///
/// Every segment gets a unit-length domain, so a path of `n` segments
/// spans `[0, n]`.
#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    commands: Vec<PathCommand>,
    tolerance: Tolerance,
}

impl PathBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_commands(commands: Vec<PathCommand>) -> Self {
        Self {
            commands,
            tolerance: Tolerance::default(),
        }
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn commands(&self) -> &[PathCommand] {
        &self.commands
    }

    pub fn push(&mut self, command: PathCommand) -> &mut Self {
        self.commands.push(command);
        self
    }

    pub fn move_to(&mut self, to: DVec2) -> &mut Self {
        self.push(PathCommand::MoveTo { to })
    }

    pub fn line_to(&mut self, to: DVec2) -> &mut Self {
        self.push(PathCommand::LineTo { to })
    }

    pub fn quad_to(&mut self, control: DVec2, to: DVec2) -> &mut Self {
        self.push(PathCommand::QuadTo { control, to })
    }

    pub fn cubic_to(&mut self, control1: DVec2, control2: DVec2, to: DVec2) -> &mut Self {
        self.push(PathCommand::CubicTo {
            control1,
            control2,
            to,
        })
    }

    pub fn bspline_to(&mut self, controls: &[DVec2], degree: usize) -> &mut Self {
        self.push(PathCommand::BSplineTo {
            controls: controls.to_vec(),
            degree,
        })
    }

    /// Arc in center form; `sweep_angle` is in radians, positive counter-clockwise.
    pub fn arc_to(&mut self, center: DVec2, radii: DVec2, sweep_angle: f64, x_rotation: f64) -> &mut Self {
        self.push(PathCommand::ArcTo {
            center,
            radii,
            sweep_angle,
            x_rotation,
        })
    }

    pub fn close(&mut self) -> &mut Self {
        self.push(PathCommand::Close)
    }

    pub fn build(&self) -> Result<Vec<Path2>> {
        let mut paths = Vec::new();
        let mut current = Path2::new().with_tolerance(self.tolerance);
        let mut pen: Option<DVec2> = None;
        let mut subpath_start: Option<DVec2> = None;

        for command in &self.commands {
            match command {
                PathCommand::MoveTo { to } => {
                    self.finish(&mut current, &mut paths);
                    pen = Some(*to);
                    subpath_start = Some(*to);
                }
                PathCommand::Close => {
                    if !current.is_empty() {
                        current.close_path()?;
                        self.finish(&mut current, &mut paths);
                    }
                    pen = subpath_start;
                }
                drawing => {
                    let from = pen.ok_or_else(|| {
                        CurveError::InvalidOperation(format!("{drawing:?} without a current point"))
                    })?;
                    let (pieces, end) = segments_for(from, drawing)?;
                    for piece in &pieces {
                        current.append_segment(piece.as_ref())?;
                    }
                    pen = Some(end);
                }
            }
        }
        self.finish(&mut current, &mut paths);

        log::debug!("built {} paths from {} commands", paths.len(), self.commands.len());
        Ok(paths)
    }

    fn finish(&self, current: &mut Path2, paths: &mut Vec<Path2>) {
        if !current.is_empty() {
            let fresh = Path2::new().with_tolerance(self.tolerance);
            paths.push(std::mem::replace(current, fresh));
        }
    }
}

/// Segments drawn by `command` from `from`, and the new current point.
fn segments_for(from: DVec2, command: &PathCommand) -> Result<(Vec<Box<dyn Curve<DVec2>>>, DVec2)> {
    let unit = Domain::unit();
    let (piece, end): (Box<dyn Curve<DVec2>>, DVec2) = match command {
        PathCommand::LineTo { to } => (Box::new(Polyline2::from_points(&[from, *to], unit)?), *to),
        PathCommand::QuadTo { control, to } => (Box::new(Bezier2::new(&[from, *control, *to], unit)?), *to),
        PathCommand::CubicTo {
            control1,
            control2,
            to,
        } => (
            Box::new(Bezier2::new(&[from, *control1, *control2, *to], unit)?),
            *to,
        ),
        PathCommand::BSplineTo { controls, degree } => {
            let Some(&end) = controls.last() else {
                return Err(CurveError::InvalidParameter(
                    "bspline_to needs at least one control point".to_string(),
                ));
            };
            let mut points = Vec::with_capacity(controls.len() + 1);
            points.push(from);
            points.extend_from_slice(controls);
            let spline = BSpline2::new(&points, *degree, KnotGeneration::Uniform, true, unit)?;
            (Box::new(spline), end)
        }
        PathCommand::ArcTo {
            center,
            radii,
            sweep_angle,
            x_rotation,
        } => return arc_segments(from, *center, *radii, *sweep_angle, *x_rotation),
        PathCommand::MoveTo { .. } | PathCommand::Close => return Ok((Vec::new(), from)),
    };
    Ok((vec![piece], end))
}

/// Approximate an elliptical arc by cubic Beziers of at most a quarter turn.
fn arc_segments(
    from: DVec2,
    center: DVec2,
    radii: DVec2,
    sweep_angle: f64,
    x_rotation: f64,
) -> Result<(Vec<Box<dyn Curve<DVec2>>>, DVec2)> {
    if !(radii.x > 0.0 && radii.y > 0.0) || !sweep_angle.is_finite() {
        return Err(CurveError::InvalidParameter(format!(
            "invalid arc: radii {radii}, sweep {sweep_angle}"
        )));
    }
    if sweep_angle.abs() <= EPSILON {
        return Ok((Vec::new(), from));
    }

    let local = rotate_pt(from - center, -x_rotation);
    let mut angle0 = (local.y / radii.y).atan2(local.x / radii.x);
    let n = (sweep_angle.abs() / FRAC_PI_2).ceil().max(1.0) as usize;
    let angle_step = sweep_angle / n as f64;
    let arm_len = (4.0 / 3.0) * (0.25 * angle_step).tan();

    let mut segments: Vec<Box<dyn Curve<DVec2>>> = Vec::with_capacity(n);
    let mut p0 = from;
    for _ in 0..n {
        let angle1 = angle0 + angle_step;
        let p1 = p0 + arm_len * sample_ellipse(radii, x_rotation, angle0 + FRAC_PI_2);
        let p3 = center + sample_ellipse(radii, x_rotation, angle1);
        let p2 = p3 - arm_len * sample_ellipse(radii, x_rotation, angle1 + FRAC_PI_2);
        segments.push(Box::new(Bezier2::new(&[p0, p1, p2, p3], Domain::unit())?));
        angle0 = angle1;
        p0 = p3;
    }
    Ok((segments, p0))
}

fn sample_ellipse(radii: DVec2, x_rotation: f64, angle: f64) -> DVec2 {
    let u = radii.x * angle.cos();
    let v = radii.y * angle.sin();
    rotate_pt(DVec2::new(u, v), x_rotation)
}

fn rotate_pt(pt: DVec2, angle: f64) -> DVec2 {
    DVec2::new(
        pt.x * angle.cos() - pt.y * angle.sin(),
        pt.x * angle.sin() + pt.y * angle.cos(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use curvekit_math::dvec2;

    #[test]
    fn test_quarter_arc_stays_on_circle() {
        let (segments, end) =
            arc_segments(dvec2(1.0, 0.0), DVec2::ZERO, dvec2(1.0, 1.0), FRAC_PI_2, 0.0).unwrap();
        assert_eq!(segments.len(), 1);
        assert!((end - dvec2(0.0, 1.0)).length() < 1e-12);
        for i in 0..=10 {
            let r = segments[0].evaluate(i as f64 / 10.0).length();
            assert!((r - 1.0).abs() < 1e-3, "radius {r}");
        }
    }

    #[test]
    fn test_clockwise_arc() {
        let (segments, end) =
            arc_segments(dvec2(0.0, 1.0), DVec2::ZERO, dvec2(1.0, 1.0), -FRAC_PI_2, 0.0).unwrap();
        assert_eq!(segments.len(), 1);
        assert!((end - dvec2(1.0, 0.0)).length() < 1e-12);
        // Midpoint stays in the first quadrant
        let mid = segments[0].evaluate(0.5);
        assert!(mid.x > 0.6 && mid.y > 0.6);
    }

    #[test]
    fn test_full_ellipse_closes() {
        let radii = dvec2(2.0, 1.0);
        let (segments, end) =
            arc_segments(dvec2(2.0, 0.0), DVec2::ZERO, radii, 2.0 * std::f64::consts::PI, 0.0).unwrap();
        assert_eq!(segments.len(), 4);
        assert!((end - dvec2(2.0, 0.0)).length() < 1e-9);
    }

    #[test]
    fn test_invalid_arc() {
        assert!(arc_segments(dvec2(1.0, 0.0), DVec2::ZERO, dvec2(0.0, 1.0), 1.0, 0.0).is_err());
        let (segments, end) = arc_segments(dvec2(1.0, 0.0), DVec2::ZERO, dvec2(1.0, 1.0), 0.0, 0.0).unwrap();
        assert!(segments.is_empty());
        assert_eq!(end, dvec2(1.0, 0.0));
    }
}
