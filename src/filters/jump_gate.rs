use super::validate_alpha;
use crate::Result;
use log::debug;

/// Outcome of feeding one sample to a [`JumpGatedLagFilter`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// First sample, taken as-is
    Seeded,
    /// Sample blended into the running value
    Accepted,
    /// Sample jumped too far and was ignored
    Rejected,
    /// Too many consecutive rejections, filter restarted on the sample
    Reseeded,
}

/// First-order lag filter that ignores implausible jumps
///
/// `beta` weights the previous value. A sample further than `jump_threshold`
/// from the running value is dropped as a detection glitch, unless
/// `max_rejections` such samples arrive in a row, in which case the filter
/// restarts on the new level.
#[derive(Debug, Clone)]
pub struct JumpGatedLagFilter {
    beta: f64,
    jump_threshold: f64,
    max_rejections: u32,
    value: Option<f64>,
    rejections: u32,
}

impl JumpGatedLagFilter {
    /// Create a new jump-gated lag filter
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if beta is outside [0, 1] or the threshold is not positive
    pub fn new(beta: f64, jump_threshold: f64, max_rejections: u32) -> Result<Self> {
        let beta = validate_alpha(beta)?;
        if !(jump_threshold > 0.0) {
            return Err(crate::Error::FilterError(format!(
                "Jump threshold must be positive, got {jump_threshold}"
            )));
        }
        Ok(Self {
            beta,
            jump_threshold,
            max_rejections,
            value: None,
            rejections: 0,
        })
    }

    /// Current filtered value
    #[must_use]
    pub const fn value(&self) -> Option<f64> {
        self.value
    }

    /// Feed a new sample
    pub fn update(&mut self, sample: f64) -> GateDecision {
        let Some(previous) = self.value else {
            self.value = Some(sample);
            return GateDecision::Seeded;
        };

        if (sample - previous).abs() > self.jump_threshold {
            self.rejections += 1;
            if self.max_rejections > 0 && self.rejections >= self.max_rejections {
                debug!("Accepting new level {sample:.2} after {} rejected jumps", self.rejections);
                self.value = Some(sample);
                self.rejections = 0;
                return GateDecision::Reseeded;
            }
            return GateDecision::Rejected;
        }

        self.rejections = 0;
        self.value = Some(self.beta.mul_add(previous, (1.0 - self.beta) * sample));
        GateDecision::Accepted
    }

    /// Reset filter state
    pub fn reset(&mut self) {
        self.value = None;
        self.rejections = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lag_blend() {
        let mut filter = JumpGatedLagFilter::new(0.8, 30.0, 5).unwrap();
        assert_eq!(filter.update(50.0), GateDecision::Seeded);
        assert_eq!(filter.update(60.0), GateDecision::Accepted);
        assert!((filter.value().unwrap() - 52.0).abs() < 1e-9);
    }

    #[test]
    fn test_rejects_glitch() {
        let mut filter = JumpGatedLagFilter::new(0.8, 30.0, 5).unwrap();
        filter.update(50.0);
        assert_eq!(filter.update(200.0), GateDecision::Rejected);
        assert_eq!(filter.value(), Some(50.0));
    }

    #[test]
    fn test_reseeds_after_sustained_jump() {
        let mut filter = JumpGatedLagFilter::new(0.8, 30.0, 3).unwrap();
        filter.update(50.0);
        assert_eq!(filter.update(120.0), GateDecision::Rejected);
        assert_eq!(filter.update(121.0), GateDecision::Rejected);
        assert_eq!(filter.update(119.0), GateDecision::Reseeded);
        assert_eq!(filter.value(), Some(119.0));
    }

    #[test]
    fn test_zero_max_rejections_never_reseeds() {
        let mut filter = JumpGatedLagFilter::new(0.8, 30.0, 0).unwrap();
        filter.update(50.0);
        for _ in 0..20 {
            assert_eq!(filter.update(150.0), GateDecision::Rejected);
        }
        assert_eq!(filter.value(), Some(50.0));
    }

    #[test]
    fn test_invalid_parameters() {
        assert!(JumpGatedLagFilter::new(1.2, 30.0, 5).is_err());
        assert!(JumpGatedLagFilter::new(0.8, 0.0, 5).is_err());
        assert!(JumpGatedLagFilter::new(0.8, f64::NAN, 5).is_err());
    }
}
