//! Configuration management for the landmark tracker

use crate::{
    constants::{
        DEFAULT_ANGLE_ALPHA, DEFAULT_DISTANCE_BETA, DEFAULT_DISTANCE_JUMP_CM, DEFAULT_FRAME_HEIGHT,
        DEFAULT_FRAME_WIDTH, DEFAULT_LANDMARK_ALPHA, DEFAULT_MAX_REJECTED_JUMPS,
        DEFAULT_STABILITY_ALPHA, DEFAULT_STABILITY_MAX_RADIUS, DEFAULT_STABILITY_MIN_RADIUS, MIN_IRIS_POINTS,
    },
    distance::{validate_reference_width, DistanceSettings, FocalModel, FrameSize},
    filters::{create_filter, PoseFilter},
    pipeline::{StabilitySettings, Tracker, TrackerSettings},
    Error, Result,
};
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tracker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Smoothing configuration
    pub smoothing: SmoothingConfig,

    /// Head pose configuration
    pub head_pose: HeadPoseConfig,

    /// Distance estimation configuration
    pub distance: DistanceConfig,

    /// Gaze tracking configuration
    pub gaze: GazeConfig,

    /// Stability indicator configuration
    pub stability: StabilityConfig,

    /// Frame configuration
    pub frame: FrameConfig,
}

/// Landmark and angle smoothing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of the previous frame in landmark smoothing (0.0-1.0)
    pub landmark_alpha: f64,

    /// Pose filter type (none, exponential)
    pub pose_filter: String,

    /// Weight of the previous angle in the exponential pose filter (0.0-1.0)
    pub angle_alpha: f64,
}

/// Head pose options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeadPoseConfig {
    /// Fall back to the face-only pose when no body landmarks arrive
    pub face_only_fallback: bool,
}

/// Distance estimation parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DistanceConfig {
    /// Face width in centimetres (10-20); the population average is used
    /// uncalibrated when unset
    pub reference_width_cm: Option<f64>,

    /// Pre-measured focal length in pixels; frame width is used when unset
    pub focal_length_px: Option<f64>,

    /// Weight of the previous distance in the lag filter (0.0-1.0)
    pub lag_beta: f64,

    /// Largest plausible frame-to-frame change in centimetres
    pub jump_threshold_cm: f64,

    /// Consecutive rejected jumps before accepting a new level (0 = never)
    pub max_rejected_jumps: u32,
}

/// Gaze tracking parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GazeConfig {
    /// Minimum iris ring points per eye
    pub min_iris_points: usize,
}

/// Stability indicator parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilityConfig {
    /// Compute the stability indicator
    pub enabled: bool,

    /// Radius at maximal rotation
    pub min_radius: f64,

    /// Radius for a neutral head
    pub max_radius: f64,

    /// Weight of the previous radius (0.0-1.0)
    pub alpha: f64,
}

/// Frame parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Frame width in pixels when the source does not report one
    pub width: u32,

    /// Frame height in pixels when the source does not report one
    pub height: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            landmark_alpha: DEFAULT_LANDMARK_ALPHA,
            pose_filter: "exponential".to_string(),
            angle_alpha: DEFAULT_ANGLE_ALPHA,
        }
    }
}

impl Default for HeadPoseConfig {
    fn default() -> Self {
        Self {
            face_only_fallback: true,
        }
    }
}

impl Default for DistanceConfig {
    fn default() -> Self {
        Self {
            reference_width_cm: None,
            focal_length_px: None,
            lag_beta: DEFAULT_DISTANCE_BETA,
            jump_threshold_cm: DEFAULT_DISTANCE_JUMP_CM,
            max_rejected_jumps: DEFAULT_MAX_REJECTED_JUMPS,
        }
    }
}

impl Default for GazeConfig {
    fn default() -> Self {
        Self {
            min_iris_points: MIN_IRIS_POINTS,
        }
    }
}

impl Default for StabilityConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            min_radius: DEFAULT_STABILITY_MIN_RADIUS,
            max_radius: DEFAULT_STABILITY_MAX_RADIUS,
            alpha: DEFAULT_STABILITY_ALPHA,
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_FRAME_WIDTH,
            height: DEFAULT_FRAME_HEIGHT,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read or `ConfigError` if it does not parse
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the text does not parse
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if serialization fails or `Io` if the file cannot be written
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Pose filter description in `name[:alpha]` form
    #[must_use]
    pub fn pose_filter_descriptor(&self) -> String {
        match self.smoothing.pose_filter.to_lowercase().as_str() {
            "exponential" | "angle" => format!("exponential:{}", self.smoothing.angle_alpha),
            other => other.to_string(),
        }
    }

    /// Create the pose filter from configuration
    ///
    /// # Errors
    ///
    /// Returns `FilterError` for an unknown filter or out-of-range alpha
    pub fn create_filter(&self) -> Result<Box<dyn PoseFilter>> {
        create_filter(&self.pose_filter_descriptor())
    }

    /// Tracker settings described by this configuration
    #[must_use]
    pub fn tracker_settings(&self) -> TrackerSettings {
        TrackerSettings {
            landmark_alpha: self.smoothing.landmark_alpha,
            pose_filter: self.pose_filter_descriptor(),
            face_only_fallback: self.head_pose.face_only_fallback,
            distance: DistanceSettings {
                focal_model: self
                    .distance
                    .focal_length_px
                    .map_or(FocalModel::FrameWidth, FocalModel::Fixed),
                lag_beta: self.distance.lag_beta,
                jump_threshold_cm: self.distance.jump_threshold_cm,
                max_rejected_jumps: self.distance.max_rejected_jumps,
            },
            min_iris_points: self.gaze.min_iris_points,
            stability: self.stability.enabled.then_some(StabilitySettings {
                min_radius: self.stability.min_radius,
                max_radius: self.stability.max_radius,
                alpha: self.stability.alpha,
            }),
            default_frame_size: FrameSize::new(self.frame.width, self.frame.height),
        }
    }

    /// Validate and build a tracker, applying the configured face width
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if validation fails, or the tracker construction error
    pub fn build_tracker(&self) -> Result<Tracker> {
        self.validate()?;
        let mut tracker = Tracker::new(self.tracker_settings())?;
        if let Some(width) = self.distance.reference_width_cm {
            tracker.calibrate(width)?;
        }
        info!("Tracker built from configuration");
        Ok(tracker)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        // Validate smoothing factors
        if !(0.0..=1.0).contains(&self.smoothing.landmark_alpha) {
            return Err(Error::ConfigError(
                "Landmark alpha must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.smoothing.angle_alpha) {
            return Err(Error::ConfigError(
                "Angle alpha must be between 0.0 and 1.0".to_string(),
            ));
        }
        create_filter(&self.pose_filter_descriptor()).map_err(|e| Error::ConfigError(e.to_string()))?;

        // Validate distance parameters
        if let Some(width) = self.distance.reference_width_cm {
            validate_reference_width(width).map_err(|e| Error::ConfigError(e.to_string()))?;
        }
        if let Some(focal) = self.distance.focal_length_px {
            if !(focal > 0.0) {
                return Err(Error::ConfigError("Focal length must be positive".to_string()));
            }
        }
        if !(0.0..=1.0).contains(&self.distance.lag_beta) {
            return Err(Error::ConfigError(
                "Distance lag beta must be between 0.0 and 1.0".to_string(),
            ));
        }
        if !(self.distance.jump_threshold_cm > 0.0) {
            return Err(Error::ConfigError(
                "Distance jump threshold must be positive".to_string(),
            ));
        }

        // Validate gaze parameters
        if self.gaze.min_iris_points == 0 {
            return Err(Error::ConfigError(
                "Minimum iris points must be greater than 0".to_string(),
            ));
        }

        // Validate stability parameters
        if self.stability.enabled {
            if !(self.stability.min_radius >= 0.0 && self.stability.max_radius >= self.stability.min_radius) {
                return Err(Error::ConfigError(
                    "Stability radii must satisfy 0 <= min_radius <= max_radius".to_string(),
                ));
            }
            if !(0.0..=1.0).contains(&self.stability.alpha) {
                return Err(Error::ConfigError(
                    "Stability alpha must be between 0.0 and 1.0".to_string(),
                ));
            }
        }

        // Validate frame settings
        if self.frame.width == 0 || self.frame.height == 0 {
            return Err(Error::ConfigError("Frame dimensions must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Landmark Tracker Configuration

# Smoothing
smoothing:
  landmark_alpha: 0.7
  pose_filter: "exponential"
  angle_alpha: 0.92

# Head pose
head_pose:
  face_only_fallback: true

# Distance estimation
distance:
  # reference_width_cm: 14.0
  # focal_length_px: 600.0
  lag_beta: 0.8
  jump_threshold_cm: 30.0
  max_rejected_jumps: 5

# Gaze tracking
gaze:
  min_iris_points: 4

# Stability indicator
stability:
  enabled: false
  min_radius: 20.0
  max_radius: 60.0
  alpha: 0.9

# Frame defaults
frame:
  width: 640
  height: 480
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed = Config::from_yaml(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed = Config::from_yaml("distance:\n  focal_length_px: 600.0\n").unwrap();
        assert_eq!(parsed.distance.focal_length_px, Some(600.0));
        assert_eq!(parsed.distance.lag_beta, DEFAULT_DISTANCE_BETA);
        assert_eq!(parsed.smoothing, SmoothingConfig::default());
        assert_eq!(
            parsed.tracker_settings().distance.focal_model,
            FocalModel::Fixed(600.0)
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.smoothing.landmark_alpha = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.distance.reference_width_cm = Some(25.0);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.smoothing.pose_filter = "kalman".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.frame.width = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.stability.enabled = true;
        config.stability.min_radius = 80.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pose_filter_descriptor() {
        let mut config = Config::default();
        assert_eq!(config.pose_filter_descriptor(), "exponential:0.92");
        config.smoothing.pose_filter = "none".to_string();
        assert_eq!(config.pose_filter_descriptor(), "none");
        assert!(config.create_filter().is_ok());
    }

    #[test]
    fn test_build_tracker_applies_width() {
        let mut config = Config::default();
        config.distance.reference_width_cm = Some(15.5);
        let tracker = config.build_tracker().unwrap();
        assert_eq!(tracker.calibration().reference_width_cm, 15.5);
        assert!(tracker.calibration().is_calibrated);

        let tracker = Config::default().build_tracker().unwrap();
        assert!(!tracker.calibration().is_calibrated);
    }

    #[test]
    fn test_configured_default_width_still_calibrates() {
        let config = Config::from_yaml("distance:\n  reference_width_cm: 14.0\n").unwrap();
        assert_eq!(config.distance.reference_width_cm, Some(14.0));
        let tracker = config.build_tracker().unwrap();
        assert!(tracker.calibration().is_calibrated);
        assert_eq!(tracker.calibration().reference_width_cm, 14.0);
    }
}
