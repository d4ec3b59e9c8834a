//! Stability indicator derived from the overall head pose magnitude.
//!
//! A still, centred head yields a large radius; strong rotation shrinks it.
//! The radius is exponentially smoothed so it can drive visual feedback.
//!
//! The monitor measures the magnitude of whatever pose it is given. A
//! body-relative pose at rest reads yaw ≈ 180°, so the tracker feeds it the
//! pose relative to the first pose of the current mode (see
//! [`HeadPoseEstimate::relative_to`]).

use crate::{
    constants::{DEFAULT_STABILITY_ALPHA, DEFAULT_STABILITY_MAX_RADIUS, DEFAULT_STABILITY_MIN_RADIUS},
    filters::validate_alpha,
    pose_estimation::HeadPoseEstimate,
    Error, Result,
};

/// Smoothed feedback radius driven by head pose magnitude
#[derive(Debug, Clone)]
pub struct StabilityMonitor {
    min_radius: f64,
    max_radius: f64,
    alpha: f64,
    radius: Option<f64>,
}

impl Default for StabilityMonitor {
    fn default() -> Self {
        Self {
            min_radius: DEFAULT_STABILITY_MIN_RADIUS,
            max_radius: DEFAULT_STABILITY_MAX_RADIUS,
            alpha: DEFAULT_STABILITY_ALPHA,
            radius: None,
        }
    }
}

/// Pose magnitude scaled so that 180° of combined rotation maps to 1
#[must_use]
pub fn normalized_magnitude(pose: &HeadPoseEstimate) -> f64 {
    (pose.magnitude() / 180.0).clamp(0.0, 1.0)
}

impl StabilityMonitor {
    /// Create a new stability monitor
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the radii are negative or inverted, or
    /// `FilterError` if alpha is outside [0, 1]
    pub fn new(min_radius: f64, max_radius: f64, alpha: f64) -> Result<Self> {
        if !(min_radius >= 0.0 && max_radius >= min_radius) {
            return Err(Error::ConfigError(format!(
                "Stability radii must satisfy 0 <= min <= max, got {min_radius}..{max_radius}"
            )));
        }
        Ok(Self {
            min_radius,
            max_radius,
            alpha: validate_alpha(alpha)?,
            radius: None,
        })
    }

    /// Current smoothed radius
    #[must_use]
    pub const fn radius(&self) -> Option<f64> {
        self.radius
    }

    /// Radius the monitor moves toward for a given pose
    #[must_use]
    pub fn target_radius(&self, pose: &HeadPoseEstimate) -> f64 {
        let magnitude = normalized_magnitude(pose);
        (self.max_radius - self.min_radius).mul_add(-magnitude, self.max_radius)
    }

    /// Update with a new pose and return the smoothed radius
    pub fn update(&mut self, pose: &HeadPoseEstimate) -> f64 {
        let target = self.target_radius(pose);
        let radius = match self.radius {
            Some(previous) => (target - previous).mul_add(1.0 - self.alpha, previous),
            None => target,
        };
        self.radius = Some(radius);
        radius
    }

    /// Reset monitor state
    pub fn reset(&mut self) {
        self.radius = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neutral_pose_gives_max_radius() {
        let mut monitor = StabilityMonitor::default();
        assert_eq!(monitor.update(&HeadPoseEstimate::default()), DEFAULT_STABILITY_MAX_RADIUS);
    }

    #[test]
    fn test_large_pose_gives_min_radius() {
        let monitor = StabilityMonitor::default();
        let target = monitor.target_radius(&HeadPoseEstimate::new(180.0, 180.0, 0.0));
        assert_eq!(target, DEFAULT_STABILITY_MIN_RADIUS);
    }

    #[test]
    fn test_smoothing_toward_target() {
        let mut monitor = StabilityMonitor::new(20.0, 60.0, 0.5).unwrap();
        monitor.update(&HeadPoseEstimate::default());
        // 90° yaw → magnitude 0.5 → target 40
        let r = monitor.update(&HeadPoseEstimate::new(0.0, 90.0, 0.0));
        assert!((r - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_radii() {
        assert!(StabilityMonitor::new(60.0, 20.0, 0.5).is_err());
        assert!(StabilityMonitor::new(-1.0, 20.0, 0.5).is_err());
        assert!(StabilityMonitor::new(20.0, 60.0, 2.0).is_err());
    }
}
