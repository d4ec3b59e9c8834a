//! Smoothing filters for landmark frames, angles and scalar estimates.
//!
//! Landmark frames go through [`landmark::LandmarkSmoother`] before any
//! geometry is computed. Head pose angles are smoothed by a [`PoseFilter`],
//! chosen by name through [`create_filter`]. Distance estimates use the
//! jump-gated lag filter in [`jump_gate`].

/// Exponential moving average over whole landmark frames
pub mod landmark;

/// Wrap-aware smoothing for angles in degrees
pub mod angle;

/// Lag filter with glitch rejection for scalar estimates
pub mod jump_gate;

use crate::{constants::DEFAULT_ANGLE_ALPHA, pose_estimation::HeadPoseEstimate, Error, Result};

/// Trait for head pose filters
pub trait PoseFilter: Send + Sync {
    /// Apply filter to a new pose estimate
    fn apply(&mut self, pose: HeadPoseEstimate) -> HeadPoseEstimate;

    /// Reset filter state
    fn reset(&mut self);

    /// Get filter name
    fn name(&self) -> &str;
}

/// No-op filter that passes through values unchanged
pub struct NoFilter;

impl PoseFilter for NoFilter {
    fn apply(&mut self, pose: HeadPoseEstimate) -> HeadPoseEstimate {
        pose
    }

    fn reset(&mut self) {}

    fn name(&self) -> &str {
        "NoFilter"
    }
}

/// Check a smoothing factor lies in [0, 1]
///
/// # Errors
///
/// Returns `FilterError` if alpha is outside [0, 1] or not finite
pub fn validate_alpha(alpha: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&alpha) {
        Ok(alpha)
    } else {
        Err(Error::FilterError(format!("Alpha must be in [0, 1], got {alpha}")))
    }
}

/// Create a pose filter from a `name[:alpha]` description
///
/// # Errors
///
/// Returns `FilterError` for unknown names or out-of-range parameters
pub fn create_filter(filter_type: &str) -> Result<Box<dyn PoseFilter>> {
    let lowered = filter_type.to_lowercase();
    let (name, param) = match lowered.split_once(':') {
        Some((name, param)) => (name, Some(param)),
        None => (lowered.as_str(), None),
    };

    let alpha = param
        .map(|p| {
            p.trim()
                .parse::<f64>()
                .map_err(|_| Error::FilterError(format!("Invalid alpha '{p}' in filter '{filter_type}'")))
                .and_then(validate_alpha)
        })
        .transpose()?;

    match name {
        "none" | "nofilter" => Ok(Box::new(NoFilter)),
        "exponential" | "angle" => Ok(Box::new(angle::WrappedExponentialFilter::new(
            alpha.unwrap_or(DEFAULT_ANGLE_ALPHA),
        ))),
        _ => Err(Error::FilterError(format!("Unknown filter type: {filter_type}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_filter() {
        let mut filter = NoFilter;
        let pose = HeadPoseEstimate::new(10.0, 20.0, 30.0);
        assert_eq!(filter.apply(pose), pose);
    }

    #[test]
    fn test_create_filter() {
        assert!(create_filter("none").is_ok());
        assert!(create_filter("exponential").is_ok());
        assert!(create_filter("Exponential:0.5").is_ok());
        assert!(create_filter("exponential:1.5").is_err());
        assert!(create_filter("exponential:abc").is_err());
        assert!(create_filter("kalman").is_err());
    }

    #[test]
    fn test_validate_alpha() {
        assert!(validate_alpha(0.0).is_ok());
        assert!(validate_alpha(1.0).is_ok());
        assert!(validate_alpha(-0.1).is_err());
        assert!(validate_alpha(f64::NAN).is_err());
    }
}
