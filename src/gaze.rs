//! Per-eye gaze offset relative to a baseline captured on the first frame.
//!
//! Each eye's gaze angle is the direction from the eye centre (midpoint of
//! its corners) to the iris centre (mean of the iris ring), in pixel space.
//! Head roll is subtracted so that tilting the head does not read as a gaze
//! change. The first valid frame becomes the baseline; it is kept until
//! [`GazeTracker::reset_baseline`] is called.

use crate::{
    constants::MIN_IRIS_POINTS,
    distance::FrameSize,
    filters::angle::normalize_angle,
    landmarks::{EyeSide, FaceFrame, Landmark},
    Error, Result,
};
use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Gaze change relative to the baseline, in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeOffset {
    /// Left eye delta
    pub left_delta: f64,
    /// Right eye delta
    pub right_delta: f64,
    /// Mean of both eyes
    pub average_delta: f64,
}

impl GazeOffset {
    fn from_deltas(left_delta: f64, right_delta: f64) -> Self {
        Self {
            left_delta,
            right_delta,
            average_delta: (left_delta + right_delta) / 2.0,
        }
    }
}

/// Reference gaze angles captured once per session
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GazeBaseline {
    /// Left eye baseline angle
    pub left_angle: f64,
    /// Right eye baseline angle
    pub right_angle: f64,
    /// Whether a baseline has been captured
    pub is_set: bool,
}

/// Landmarks describing one eye
#[derive(Debug, Clone, Copy)]
pub struct EyeLandmarks<'a> {
    /// Iris ring points
    pub iris: &'a [Landmark],
    /// The two eye corners
    pub corners: [Landmark; 2],
}

/// Mean of the iris ring points
///
/// # Errors
///
/// Returns `InsufficientIrisPoints` if fewer than `min_points` are given
pub fn iris_center(points: &[Landmark], min_points: usize) -> Result<Landmark> {
    if points.len() < min_points.max(1) {
        return Err(Error::InsufficientIrisPoints {
            required: min_points,
            actual: points.len(),
        });
    }
    #[allow(clippy::cast_precision_loss)] // iris rings hold a handful of points
    let n = points.len() as f64;
    let sum = points
        .iter()
        .fold(nalgebra::Vector3::<f64>::zeros(), |acc, p| acc + p.to_vector());
    Ok(Landmark::from_vector(sum / n))
}

/// Gaze angle of one eye in degrees, before roll compensation
///
/// # Errors
///
/// Returns `InsufficientIrisPoints` if the iris ring is too small
pub fn eye_angle(eye: &EyeLandmarks<'_>, frame: FrameSize, min_points: usize) -> Result<f64> {
    let iris = iris_center(eye.iris, min_points)?;
    let center = eye.corners[0].midpoint(eye.corners[1]);
    let dx = (iris.x - center.x) * f64::from(frame.width);
    let dy = (iris.y - center.y) * f64::from(frame.height);
    Ok(dy.atan2(dx).to_degrees())
}

/// Gaze tracker state machine: uninitialized until the first valid frame
#[derive(Debug, Clone)]
pub struct GazeTracker {
    min_iris_points: usize,
    baseline: Option<(f64, f64)>,
}

impl Default for GazeTracker {
    fn default() -> Self {
        Self::new(MIN_IRIS_POINTS)
    }
}

impl GazeTracker {
    /// Create a new gaze tracker
    #[must_use]
    pub fn new(min_iris_points: usize) -> Self {
        info!("Initializing GazeTracker (min iris points: {min_iris_points})");
        Self {
            min_iris_points,
            baseline: None,
        }
    }

    /// Whether a baseline has been captured
    #[must_use]
    pub const fn is_calibrated(&self) -> bool {
        self.baseline.is_some()
    }

    /// Current baseline
    #[must_use]
    pub fn baseline(&self) -> GazeBaseline {
        self.baseline
            .map_or_else(GazeBaseline::default, |(left_angle, right_angle)| GazeBaseline {
                left_angle,
                right_angle,
                is_set: true,
            })
    }

    /// Clear the baseline; the next valid frame captures a new one
    pub fn reset_baseline(&mut self) {
        if self.baseline.take().is_some() {
            info!("Gaze baseline cleared");
        }
    }

    /// Update with both eyes and the current head roll
    ///
    /// # Errors
    ///
    /// Returns `InsufficientIrisPoints` if either iris ring is too small. No
    /// baseline is captured from a failing frame.
    pub fn update(
        &mut self,
        left: &EyeLandmarks<'_>,
        right: &EyeLandmarks<'_>,
        head_roll: f64,
        frame: FrameSize,
    ) -> Result<GazeOffset> {
        let left_angle = normalize_angle(eye_angle(left, frame, self.min_iris_points)? - head_roll);
        let right_angle = normalize_angle(eye_angle(right, frame, self.min_iris_points)? - head_roll);

        match self.baseline {
            None => {
                self.baseline = Some((left_angle, right_angle));
                debug!("Captured gaze baseline: left {left_angle:.2}°, right {right_angle:.2}°");
                Ok(GazeOffset::default())
            }
            Some((left_base, right_base)) => Ok(GazeOffset::from_deltas(
                normalize_angle(left_angle - left_base),
                normalize_angle(right_angle - right_base),
            )),
        }
    }

    /// Update from a full face-mesh frame
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` if eye corners are missing, or
    /// `InsufficientIrisPoints` if the frame lacks iris refinement
    pub fn update_from_face(&mut self, face: &FaceFrame, head_roll: f64, frame: FrameSize) -> Result<GazeOffset> {
        let left_iris = Self::iris_points(face, EyeSide::Left);
        let right_iris = Self::iris_points(face, EyeSide::Right);
        let left = EyeLandmarks {
            iris: &left_iris,
            corners: face.get_all(EyeSide::Left.corners())?,
        };
        let right = EyeLandmarks {
            iris: &right_iris,
            corners: face.get_all(EyeSide::Right.corners())?,
        };
        self.update(&left, &right, head_roll, frame)
    }

    fn iris_points(face: &FaceFrame, side: EyeSide) -> Vec<Landmark> {
        side.iris_ring()
            .into_iter()
            .filter_map(|id| face.get(id).ok())
            .collect()
    }
}
