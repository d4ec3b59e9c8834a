//! Tests for YAML configuration loading and validation

use landmark_tracker::{
    config::{Config, EXAMPLE_CONFIG},
    distance::FocalModel,
    Error,
};
use std::path::PathBuf;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("landmark_tracker_{}_{name}", std::process::id()))
}

#[test]
fn test_config_file_round_trip() {
    let mut config = Config::default();
    config.smoothing.landmark_alpha = 0.5;
    config.distance.focal_length_px = Some(620.0);
    config.stability.enabled = true;
    config.frame.width = 1280;
    config.frame.height = 720;

    let path = temp_path("round_trip.yaml");
    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
}

#[test]
fn test_missing_file_is_io_error() {
    let err = Config::from_file(temp_path("does_not_exist.yaml")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_malformed_yaml_is_config_error() {
    let err = Config::from_yaml("smoothing: [not, a, map]").unwrap_err();
    assert!(matches!(err, Error::ConfigError(_)));
}

#[test]
fn test_example_config_parses() {
    let config = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.tracker_settings().distance.focal_model, FocalModel::FrameWidth);
}

#[test]
fn test_build_tracker_rejects_invalid_config() {
    let mut config = Config::default();
    config.distance.lag_beta = -0.1;
    assert!(matches!(config.build_tracker(), Err(Error::ConfigError(_))));

    let mut config = Config::default();
    config.gaze.min_iris_points = 0;
    assert!(config.build_tracker().is_err());

    let mut config = Config::default();
    config.distance.focal_length_px = Some(0.0);
    assert!(config.build_tracker().is_err());
}

#[test]
fn test_stability_section_enables_monitor() {
    let config = Config::from_yaml("stability:\n  enabled: true\n  alpha: 0.5\n").unwrap();
    let settings = config.tracker_settings();
    let stability = settings.stability.unwrap();
    assert_eq!(stability.alpha, 0.5);
    assert_eq!(stability.min_radius, 20.0);
}
