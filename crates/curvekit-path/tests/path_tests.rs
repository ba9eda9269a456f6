use approx::assert_abs_diff_eq;
use curvekit_core::{BoundingBox, CurveError, Tolerance, Validate};
use curvekit_geometry::{Bezier2, Curve, CurveKind, Polyline2};
use curvekit_math::{dvec2, DVec2, Domain};
use curvekit_path::{default_registry, Path2, PathBuilder, PathCommand};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn line(a: DVec2, b: DVec2) -> Polyline2 {
    Polyline2::from_points(&[a, b], Domain::unit()).unwrap()
}

fn square() -> Path2 {
    let mut paths = PathBuilder::new()
        .move_to(dvec2(0.0, 0.0))
        .line_to(dvec2(1.0, 0.0))
        .line_to(dvec2(1.0, 1.0))
        .line_to(dvec2(0.0, 1.0))
        .close()
        .build()
        .unwrap();
    assert_eq!(paths.len(), 1);
    paths.remove(0)
}

fn open_curve() -> Path2 {
    let mut path = Path2::new();
    path.append_segment(&line(dvec2(0.0, 0.0), dvec2(1.0, 0.0))).unwrap();
    let bump = Bezier2::new(
        &[dvec2(1.0, 0.0), dvec2(1.5, 1.0), dvec2(2.5, 1.0), dvec2(3.0, 0.0)],
        Domain::new(5.0, 7.0).unwrap(),
    )
    .unwrap();
    path.append_segment(&bump).unwrap();
    path
}

#[test]
fn test_square_from_builder() {
    init_logging();
    let sq = square();
    assert!(sq.is_closed());
    assert_eq!(sq.segments_count(), 4);
    assert_eq!(sq.domain(), Domain::new(0.0, 4.0).unwrap());
    assert_eq!(sq.points_count(), 4);
    sq.validate().unwrap();

    assert_eq!(sq.bounding_box(), Some((dvec2(0.0, 0.0), dvec2(1.0, 1.0))));
    assert_abs_diff_eq!(sq.total_length(1e-10), 4.0, epsilon = 1e-9);
    assert_abs_diff_eq!(sq.global_parameter(2.5, 1e-10, 32).unwrap(), 2.5, epsilon = 1e-9);
    assert!((sq.evaluate(2.5) - dvec2(0.5, 1.0)).length() < 1e-12);
}

#[test]
fn test_flatten_drops_joint_and_wrap_duplicates() {
    let points = square().flatten(1e-3);
    assert_eq!(
        points,
        vec![dvec2(0.0, 0.0), dvec2(1.0, 0.0), dvec2(1.0, 1.0), dvec2(0.0, 1.0)]
    );
}

#[test]
fn test_append_keeps_continuity() {
    let line = line(dvec2(0.0, 0.0), dvec2(1.0, 0.0));
    let bump = Bezier2::new(
        &[dvec2(1.0, 0.0), dvec2(1.5, 1.0), dvec2(2.5, 1.0), dvec2(3.0, 0.0)],
        Domain::new(5.0, 7.0).unwrap(),
    )
    .unwrap();
    let mut path = Path2::new();
    path.append_segment(&line).unwrap();
    path.append_segment(&bump).unwrap();

    assert_eq!(path.segments_count(), 2);
    // The joint is shared
    assert_eq!(path.points_count(), line.points_count() + bump.points_count() - 1);
    // The bump's domain is shifted, not rescaled
    assert_eq!(path.segments()[1].domain(), Domain::new(1.0, 3.0).unwrap());
    assert_eq!(path.domain(), Domain::new(0.0, 3.0).unwrap());
    assert!((path.evaluate(1.0) - dvec2(1.0, 0.0)).length() < 1e-12);
    assert!((path.end_point() - dvec2(3.0, 0.0)).length() < 1e-12);
    path.validate().unwrap();
}

#[test]
fn test_append_within_custom_tolerance() {
    let mut path = Path2::new().with_tolerance(Tolerance::new(1e-3));
    path.append_segment(&line(dvec2(0.0, 0.0), dvec2(1.0, 0.0))).unwrap();
    path.append_segment(&line(dvec2(1.0005, 0.0), dvec2(2.0, 0.0))).unwrap();
    // The joint is snapped onto the existing end
    assert_eq!(path.segments()[1].start_point(), dvec2(1.0, 0.0));
    assert!(path
        .append_segment(&line(dvec2(2.01, 0.0), dvec2(3.0, 0.0)))
        .is_err());

    let mut strict = Path2::new();
    strict.append_segment(&line(dvec2(0.0, 0.0), dvec2(1.0, 0.0))).unwrap();
    assert!(strict
        .append_segment(&line(dvec2(1.0005, 0.0), dvec2(2.0, 0.0)))
        .is_err());
}

#[test]
fn test_append_failures_leave_path_unchanged() {
    let mut path = open_curve();
    let stray = line(dvec2(10.0, 10.0), dvec2(11.0, 10.0));
    assert!(matches!(
        path.append_segment(&stray),
        Err(CurveError::InvalidParameter(_))
    ));
    assert!(matches!(
        path.append_segment(&Polyline2::default()),
        Err(CurveError::InvalidParameter(_))
    ));

    let mut other = Path2::new();
    other.append_segment(&line(dvec2(5.0, 5.0), dvec2(6.0, 5.0))).unwrap();
    assert!(path.append_path(&other).is_err());
    assert_eq!(path.segments_count(), 2);
    assert_eq!(path.domain(), Domain::new(0.0, 3.0).unwrap());

    let mut closed = square();
    assert!(matches!(
        closed.append_segment(&line(dvec2(0.0, 0.0), dvec2(-1.0, 0.0))),
        Err(CurveError::InvalidOperation(_))
    ));
    assert_eq!(closed.segments_count(), 4);
}

#[test]
fn test_append_path_both_ends() {
    let mut path = open_curve();
    let mut tail = Path2::new();
    tail.append_segment(&line(dvec2(3.0, 0.0), dvec2(4.0, 0.0))).unwrap();
    tail.append_segment(&line(dvec2(4.0, 0.0), dvec2(4.0, 2.0))).unwrap();
    path.append_path(&tail).unwrap();
    assert_eq!(path.segments_count(), 4);
    assert_eq!(path.domain(), Domain::new(0.0, 5.0).unwrap());

    let mut head = Path2::new();
    head.append_segment(&line(dvec2(-2.0, 0.0), dvec2(-1.0, 0.0))).unwrap();
    head.append_segment(&line(dvec2(-1.0, 0.0), dvec2(0.0, 0.0))).unwrap();
    path.append_path(&head).unwrap();
    assert_eq!(path.segments_count(), 6);
    assert_eq!(path.domain(), Domain::new(-2.0, 5.0).unwrap());
    assert!((path.start_point() - dvec2(-2.0, 0.0)).length() < 1e-12);
    path.validate().unwrap();
}

#[test]
fn test_shared_joint_editing() {
    let mut sq = square();
    sq.set_point(0, dvec2(-1.0, -1.0)).unwrap();
    assert_eq!(sq.start_point(), dvec2(-1.0, -1.0));
    assert_eq!(sq.end_point(), dvec2(-1.0, -1.0));
    sq.validate().unwrap();

    sq.translate(dvec2(1.0, 1.0)).unwrap();
    assert_eq!(sq.point(0).unwrap(), dvec2(0.0, 0.0));
    assert_eq!(sq.point(2).unwrap(), dvec2(2.0, 2.0));
    assert!(sq.point(4).is_err());
}

#[test]
fn test_cut_open_path() {
    let path = open_curve();
    let mut left = Path2::new();
    let mut right = Path2::new();
    path.cut(2.0, &mut left, &mut right).unwrap();

    assert_eq!(left.segments_count(), 2);
    assert_eq!(right.segments_count(), 1);
    assert_abs_diff_eq!(left.domain().end(), 2.0);
    assert_abs_diff_eq!(right.domain().start(), 2.0);
    assert!((left.end_point() - path.evaluate(2.0)).length() < 1e-12);
    assert!((right.evaluate(2.5) - path.evaluate(2.5)).length() < 1e-12);
    // The source is untouched
    assert_eq!(path.segments_count(), 2);

    path.cut(1.0, &mut left, &mut right).unwrap();
    assert_eq!(left.segments_count(), 1);
    assert_eq!(right.segments_count(), 1);
    assert_eq!(right.segments()[0].kind(), CurveKind::Bezier);

    let mut wrong = Polyline2::default();
    assert!(matches!(
        path.cut(1.0, &mut wrong, &mut right),
        Err(CurveError::UnsupportedType(_))
    ));
    assert!(matches!(
        path.cut(4.0, &mut left, &mut right),
        Err(CurveError::OutOfRange(_))
    ));
}

#[test]
fn test_cut_closed_path_opens_it() {
    let sq = square();
    let (left, right) = sq.split(1.5).unwrap();
    assert_eq!(right.points_count(), 0);
    let left = left.as_any().downcast_ref::<Path2>().unwrap();
    assert!(!left.is_closed());
    assert_eq!(left.domain(), sq.domain());
    assert!((left.start_point() - dvec2(1.0, 0.5)).length() < 1e-12);
    assert!((left.end_point() - dvec2(1.0, 0.5)).length() < 1e-12);
    assert!(sq.is_closed());
}

#[test]
fn test_open_path_rotates_segments() {
    let mut sq = square();
    sq.open_path(1.5).unwrap();
    assert!(!sq.is_closed());
    assert_eq!(sq.segments_count(), 5);
    assert_eq!(sq.domain(), Domain::new(0.0, 4.0).unwrap());
    assert!((sq.evaluate(0.5) - dvec2(1.0, 1.0)).length() < 1e-12);
    assert!((sq.evaluate(2.5) - dvec2(0.0, 0.0)).length() < 1e-12);
    sq.validate().unwrap();

    assert!(matches!(sq.open_path(1.0), Err(CurveError::InvalidOperation(_))));
}

#[test]
fn test_close_path_bridges_gap() {
    let mut path = open_curve();
    path.close_path().unwrap();
    assert!(path.is_closed());
    assert_eq!(path.segments_count(), 3);
    assert_eq!(path.segments()[2].kind(), CurveKind::Polyline);
    assert_eq!(path.domain(), Domain::new(0.0, 4.0).unwrap());
    path.validate().unwrap();
    assert!(Path2::new().close_path().is_err());
}

#[test]
fn test_add_point_splits_segment() {
    let mut path = open_curve();
    let before = path.points_count();
    let target = path.evaluate(2.0);
    let index = path.add_point(2.0).unwrap();
    // Cubic split: 4 + 4 points sharing one joint
    assert_eq!(path.points_count(), before + 3);
    assert_eq!(path.segments_count(), 3);
    assert!((path.point(index).unwrap() - target).length() < 1e-12);

    // Existing joints are reused
    assert_eq!(path.add_point(1.0).unwrap(), 1);
    assert_eq!(path.add_point(3.0).unwrap(), path.points_count() - 1);
}

#[test]
fn test_remove_segment_only_at_ends() {
    let mut path = open_curve();
    path.append_segment(&line(dvec2(3.0, 0.0), dvec2(4.0, 0.0))).unwrap();
    assert!(matches!(path.remove_segment(1), Err(CurveError::InvalidOperation(_))));
    assert!(matches!(path.remove_segment(7), Err(CurveError::OutOfRange(_))));
    let removed = path.remove_segment(2).unwrap();
    assert_eq!(removed.kind(), CurveKind::Polyline);
    path.remove_segment(0).unwrap();
    assert_eq!(path.domain(), Domain::new(1.0, 3.0).unwrap());
}

#[test]
fn test_set_domain_rescales_segments() {
    let mut path = open_curve();
    path.set_domain(Domain::unit()).unwrap();
    assert_abs_diff_eq!(path.segments()[0].domain().end(), 1.0 / 3.0, epsilon = 1e-12);
    assert!((path.evaluate(1.0) - dvec2(3.0, 0.0)).length() < 1e-12);
}

#[test]
fn test_builder_sub_paths_and_curves() {
    let paths = PathBuilder::new()
        .move_to(dvec2(0.0, 0.0))
        .quad_to(dvec2(1.0, 1.0), dvec2(2.0, 0.0))
        .cubic_to(dvec2(3.0, -1.0), dvec2(4.0, 1.0), dvec2(5.0, 0.0))
        .bspline_to(&[dvec2(6.0, 1.0), dvec2(7.0, -1.0), dvec2(8.0, 0.0)], 3)
        .move_to(dvec2(0.0, 5.0))
        .arc_to(dvec2(0.0, 4.0), dvec2(1.0, 1.0), std::f64::consts::PI, 0.0)
        .build()
        .unwrap();
    assert_eq!(paths.len(), 2);

    let first = &paths[0];
    assert_eq!(first.segments_count(), 3);
    assert_eq!(first.domain(), Domain::new(0.0, 3.0).unwrap());
    assert!((first.end_point() - dvec2(8.0, 0.0)).length() < 1e-12);
    first.validate().unwrap();

    let arc = &paths[1];
    assert_eq!(arc.segments_count(), 2);
    assert!((arc.end_point() - dvec2(0.0, 3.0)).length() < 1e-9);
}

#[test]
fn test_builder_needs_current_point() {
    let err = PathBuilder::new().line_to(dvec2(1.0, 0.0)).build().unwrap_err();
    assert!(matches!(err, CurveError::InvalidOperation(_)));
}

#[test]
fn test_builder_rejects_bad_bspline_degree() {
    let controls = [dvec2(1.0, 1.0), dvec2(2.0, 0.0)];
    for degree in [0, 3] {
        let err = PathBuilder::new()
            .move_to(dvec2(0.0, 0.0))
            .bspline_to(&controls, degree)
            .build()
            .unwrap_err();
        assert!(matches!(err, CurveError::InvalidParameter(_)), "degree {degree}: {err:?}");
    }
    let paths = PathBuilder::new()
        .move_to(dvec2(0.0, 0.0))
        .bspline_to(&controls, 2)
        .build()
        .unwrap();
    assert_eq!(paths[0].segments_count(), 1);
}

#[test]
fn test_builder_from_json_commands() {
    let json = r#"[
        {"op": "move_to", "to": [0.0, 0.0]},
        {"op": "line_to", "to": [2.0, 0.0]},
        {"op": "arc_to", "center": [2.0, 1.0], "radii": [1.0, 1.0], "sweep_angle": 3.141592653589793},
        {"op": "close"}
    ]"#;
    let commands: Vec<PathCommand> = serde_json::from_str(json).unwrap();
    let paths = PathBuilder::from_commands(commands).build().unwrap();
    assert_eq!(paths.len(), 1);
    let path = &paths[0];
    assert!(path.is_closed());
    // line, two quarter arcs, closing line
    assert_eq!(path.segments_count(), 4);
    path.validate().unwrap();
}

#[test]
fn test_registry_creates_paths() {
    let registry = default_registry();
    let made = registry.create(CurveKind::Path).unwrap();
    assert_eq!(made.kind(), CurveKind::Path);
    assert_eq!(made.points_count(), 0);
}
