//! Tests for landmark, angle and distance smoothing


use landmark_tracker::{
    filters::{
        angle::{normalize_angle, smooth_angle, WrappedExponentialFilter},
        create_filter,
        jump_gate::{GateDecision, JumpGatedLagFilter},
        landmark::LandmarkSmoother,
        PoseFilter,
    },
    landmarks::{FaceFrame, Landmark},
    pose_estimation::HeadPoseEstimate,
};
use test_helpers::assert_close;

fn uniform_face(len: usize, value: f64) -> FaceFrame {
    FaceFrame::from_points(vec![Landmark::new(value, value, value); len]).unwrap()
}

#[test]
fn test_landmark_smoother_converges_geometrically() {
    let mut smoother = LandmarkSmoother::new(0.7);
    smoother.smooth(uniform_face(478, 0.0));

    for step in 1..=20 {
        let out = smoother.smooth(uniform_face(478, 1.0));
        let expected = 1.0 - 0.7_f64.powi(step);
        for p in out.points() {
            assert_close(p.x, expected, 1e-9);
            assert_close(p.z, expected, 1e-9);
        }
    }
}

#[test]
fn test_landmark_smoother_shape_change_resets() {
    let mut smoother = LandmarkSmoother::new(0.5);
    smoother.smooth(uniform_face(10, 0.0));

    // A longer frame is passed through untouched and becomes the new history
    let out = smoother.smooth(uniform_face(12, 1.0));
    assert_eq!(out.len(), 12);
    assert!(out.points().iter().all(|p| p.x == 1.0));

    let out = smoother.smooth(uniform_face(12, 0.0));
    assert!(out.points().iter().all(|p| (p.x - 0.5).abs() < 1e-12));
}

#[test]
fn test_landmark_smoother_output_between_inputs() {
    let mut smoother = LandmarkSmoother::new(0.3);
    let a = uniform_face(33, 0.2);
    let b = uniform_face(33, 0.9);
    smoother.smooth(a);
    let out = smoother.smooth(b);
    for p in out.points() {
        assert!(p.x >= 0.2 && p.x <= 0.9);
    }
}

#[test]
fn test_angle_seam_takes_short_path() {
    assert_close(smooth_angle(-179.0, 179.0, 0.92), 179.16, 1e-9);
    assert_close(smooth_angle(179.0, -179.0, 0.92), -179.16, 1e-9);
    assert_close(smooth_angle(-170.0, 170.0, 0.0), -170.0, 1e-9);
}

#[test]
fn test_angle_sweep_across_seam_has_no_jumps() {
    let mut filter = WrappedExponentialFilter::new(0.5);
    let mut previous: Option<f64> = None;

    // Yaw sweeping from 150° through the seam to -150°
    for i in 0..=60 {
        let raw = normalize_angle(150.0 + f64::from(i));
        let yaw = filter.apply(HeadPoseEstimate::new(0.0, raw, 0.0)).yaw;
        assert!(yaw > -180.0 && yaw <= 180.0, "yaw {yaw} out of range");
        if let Some(prev) = previous {
            let step = normalize_angle(yaw - prev).abs();
            assert!(step < 2.0, "jump of {step}° at raw {raw}");
        }
        previous = Some(yaw);
    }
}

#[test]
fn test_create_filter_variants() {
    let mut none = create_filter("none").unwrap();
    let pose = HeadPoseEstimate::new(10.0, -20.0, 5.0);
    assert_eq!(none.apply(pose), pose);

    let mut exp = create_filter("exponential:0.5").unwrap();
    exp.apply(HeadPoseEstimate::default());
    let out = exp.apply(HeadPoseEstimate::new(10.0, 10.0, 10.0));
    assert_close(out.pitch, 5.0, 1e-9);

    assert!(create_filter("exponential:1.5").is_err());
    assert!(create_filter("kalman").is_err());
}

#[test]
fn test_filter_reset_restarts_from_next_sample() {
    let mut filter = create_filter("exponential:0.9").unwrap();
    filter.apply(HeadPoseEstimate::new(0.0, 0.0, 0.0));
    filter.reset();
    let out = filter.apply(HeadPoseEstimate::new(30.0, 40.0, 50.0));
    assert_eq!(out, HeadPoseEstimate::new(30.0, 40.0, 50.0));
}

#[test]
#[should_panic(expected = "Alpha must be in [0, 1]")]
fn test_wrapped_filter_rejects_alpha() {
    let _ = WrappedExponentialFilter::new(1.2);
}

#[test]
fn test_distance_gate_ignores_single_glitch() {
    let mut gate = JumpGatedLagFilter::new(0.8, 30.0, 5).unwrap();
    assert_eq!(gate.update(50.0), GateDecision::Seeded);
    assert_eq!(gate.update(120.0), GateDecision::Rejected);
    assert_eq!(gate.value(), Some(50.0));
    assert_eq!(gate.update(55.0), GateDecision::Accepted);
    assert_close(gate.value().unwrap(), 51.0, 1e-9);
}
