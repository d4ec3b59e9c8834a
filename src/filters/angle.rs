use super::PoseFilter;
use crate::pose_estimation::HeadPoseEstimate;

/// Map an angle in degrees into (-180, 180]
#[must_use]
pub fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees % 360.0;
    if wrapped <= -180.0 {
        wrapped + 360.0
    } else if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

/// Smooth one angle toward `current` along the shorter arc
///
/// `alpha` is the weight kept by `previous`: 1.0 freezes the output and
/// 0.0 snaps straight to `current`.
#[must_use]
pub fn smooth_angle(current: f64, previous: f64, alpha: f64) -> f64 {
    let diff = current - previous;
    let mut wrapped = diff - (diff / 360.0).round() * 360.0;
    // round() sends ties away from zero, which can land exactly on -180
    if wrapped <= -180.0 {
        wrapped += 360.0;
    }
    normalize_angle(wrapped.mul_add(1.0 - alpha, previous))
}

/// Exponential smoothing of pitch, yaw and roll across the ±180° seam
pub struct WrappedExponentialFilter {
    alpha: f64,
    last: Option<HeadPoseEstimate>,
}

impl WrappedExponentialFilter {
    /// Create a new wrap-aware exponential filter
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range [0, 1]
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!((0.0..=1.0).contains(&alpha), "Alpha must be in [0, 1]");
        Self { alpha, last: None }
    }

    /// Smoothing factor
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Last filtered pose, if any
    #[must_use]
    pub const fn last(&self) -> Option<HeadPoseEstimate> {
        self.last
    }
}

impl PoseFilter for WrappedExponentialFilter {
    fn apply(&mut self, pose: HeadPoseEstimate) -> HeadPoseEstimate {
        let filtered = match self.last {
            Some(last) => HeadPoseEstimate {
                pitch: smooth_angle(pose.pitch, last.pitch, self.alpha),
                yaw: smooth_angle(pose.yaw, last.yaw, self.alpha),
                roll: smooth_angle(pose.roll, last.roll, self.alpha),
            },
            None => pose.normalized(),
        };

        self.last = Some(filtered);
        filtered
    }

    fn reset(&mut self) {
        self.last = None;
    }

    fn name(&self) -> &str {
        "WrappedExponentialFilter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_angle() {
        assert_eq!(normalize_angle(180.0), 180.0);
        assert_eq!(normalize_angle(-180.0), 180.0);
        assert_eq!(normalize_angle(190.0), -170.0);
        assert_eq!(normalize_angle(-190.0), 170.0);
        assert_eq!(normalize_angle(720.0), 0.0);
        assert_eq!(normalize_angle(45.0), 45.0);
    }

    #[test]
    fn test_smooth_across_seam() {
        let smoothed = smooth_angle(-179.0, 179.0, 0.92);
        assert!((smoothed - 179.16).abs() < 1e-9, "got {smoothed}");
    }

    #[test]
    fn test_smooth_across_seam_downward() {
        // 2° step past -180 lands back on the positive side
        let smoothed = smooth_angle(179.0, -179.0, 0.0);
        assert!((smoothed - 179.0).abs() < 1e-9);
    }

    #[test]
    fn test_alpha_extremes() {
        assert_eq!(smooth_angle(30.0, 10.0, 1.0), 10.0);
        assert_eq!(smooth_angle(30.0, 10.0, 0.0), 30.0);
    }

    #[test]
    fn test_half_turn_tie_stays_in_range() {
        let smoothed = smooth_angle(180.0, 0.0, 0.0);
        assert_eq!(smoothed, 180.0);
    }

    #[test]
    fn test_filter_first_sample_passes_through() {
        let mut filter = WrappedExponentialFilter::new(0.5);
        let first = filter.apply(HeadPoseEstimate::new(10.0, 20.0, 30.0));
        assert_eq!(first, HeadPoseEstimate::new(10.0, 20.0, 30.0));

        let second = filter.apply(HeadPoseEstimate::new(20.0, 40.0, 30.0));
        assert!((second.pitch - 15.0).abs() < 1e-9);
        assert!((second.yaw - 30.0).abs() < 1e-9);
        assert!((second.roll - 30.0).abs() < 1e-9);

        filter.reset();
        assert!(filter.last().is_none());
    }
}
