use super::validate_alpha;
use crate::{
    landmarks::{Landmark, LandmarkFrame, LandmarkSet},
    Error, Result,
};
use log::debug;

/// Exponential moving average applied to every landmark of a frame
///
/// `alpha` weights the previous frame. A frame whose length differs from
/// the stored one restarts the filter from that frame.
#[derive(Debug, Clone)]
pub struct LandmarkSmoother<S: LandmarkSet> {
    alpha: f64,
    previous: Option<LandmarkFrame<S>>,
}

impl<S: LandmarkSet> LandmarkSmoother<S> {
    /// Create a new landmark smoother
    ///
    /// # Panics
    ///
    /// Panics if alpha is not in the range [0, 1]
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        assert!((0.0..=1.0).contains(&alpha), "Alpha must be in [0, 1]");
        Self { alpha, previous: None }
    }

    /// Create a new landmark smoother, validating alpha
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if alpha is not in the range [0, 1]
    pub fn try_new(alpha: f64) -> Result<Self> {
        Ok(Self {
            alpha: validate_alpha(alpha)?,
            previous: None,
        })
    }

    /// Smoothing factor
    #[must_use]
    pub const fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Last smoothed frame
    #[must_use]
    pub const fn previous(&self) -> Option<&LandmarkFrame<S>> {
        self.previous.as_ref()
    }

    /// Check that `current` continues the stored history
    ///
    /// # Errors
    ///
    /// Returns `ShapeMismatch` if the frame length differs from the stored
    /// frame; [`smooth`](Self::smooth) restarts from such a frame
    pub fn check_shape(&self, current: &LandmarkFrame<S>) -> Result<()> {
        match &self.previous {
            Some(previous) if previous.len() != current.len() => Err(Error::ShapeMismatch {
                expected: previous.len(),
                actual: current.len(),
            }),
            _ => Ok(()),
        }
    }

    /// Smooth a frame against the stored history
    pub fn smooth(&mut self, current: LandmarkFrame<S>) -> LandmarkFrame<S> {
        let smoothed = match &self.previous {
            Some(previous) if previous.len() == current.len() => {
                let points = previous
                    .points()
                    .iter()
                    .zip(current.points())
                    .map(|(prev, cur)| self.blend(*prev, *cur))
                    .collect();
                LandmarkFrame::from_trusted(points)
            }
            Some(previous) => {
                debug!(
                    "Landmark frame length changed from {} to {}, restarting smoother",
                    previous.len(),
                    current.len()
                );
                current
            }
            None => current,
        };

        self.previous = Some(smoothed.clone());
        smoothed
    }

    /// Forget the stored frame
    pub fn reset(&mut self) {
        self.previous = None;
    }

    fn blend(&self, previous: Landmark, current: Landmark) -> Landmark {
        let keep = self.alpha;
        let take = 1.0 - self.alpha;
        Landmark::new(
            keep.mul_add(previous.x, take * current.x),
            keep.mul_add(previous.y, take * current.y),
            keep.mul_add(previous.z, take * current.z),
        )
    }
}
