//! Subject distance from the camera using a pinhole model.
//!
//! The apparent width between the two temple landmarks is compared with a
//! reference face width. The reference defaults to a population average and
//! can be overridden by calibration.

use crate::{
    constants::{
        DEFAULT_DISTANCE_BETA, DEFAULT_DISTANCE_JUMP_CM, DEFAULT_MAX_REJECTED_JUMPS, DEFAULT_REFERENCE_WIDTH_CM,
        MAX_REFERENCE_WIDTH_CM, MIN_REFERENCE_WIDTH_CM, MIN_WIDTH_PX,
    },
    filters::jump_gate::{GateDecision, JumpGatedLagFilter},
    landmarks::{FaceFrame, FaceLandmark},
    Error, Result,
};
use log::{info, warn};
use serde::{Deserialize, Serialize};

/// Frame dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl FrameSize {
    /// Create a frame size
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Source of the focal length in the pinhole formula
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum FocalModel {
    /// Use the frame width in pixels as the focal length
    #[default]
    FrameWidth,
    /// Pre-measured focal length in pixels
    Fixed(f64),
}

impl FocalModel {
    /// Focal length in pixels for a frame
    #[must_use]
    pub fn focal_length_px(&self, frame: FrameSize) -> f64 {
        match *self {
            Self::FrameWidth => f64::from(frame.width),
            Self::Fixed(focal) => focal,
        }
    }
}

/// User calibration of the reference face width
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationState {
    /// Real face width between the temples in centimetres
    pub reference_width_cm: f64,
    /// Whether the width came from a calibration call
    pub is_calibrated: bool,
}

impl Default for CalibrationState {
    fn default() -> Self {
        Self {
            reference_width_cm: DEFAULT_REFERENCE_WIDTH_CM,
            is_calibrated: false,
        }
    }
}

/// Check a face width lies in the plausible human range
///
/// # Errors
///
/// Returns `InvalidCalibration` if the width is outside [10, 20] cm
pub fn validate_reference_width(width_cm: f64) -> Result<f64> {
    if (MIN_REFERENCE_WIDTH_CM..=MAX_REFERENCE_WIDTH_CM).contains(&width_cm) {
        Ok(width_cm)
    } else {
        Err(Error::InvalidCalibration(format!(
            "Face width {width_cm} cm outside {MIN_REFERENCE_WIDTH_CM}-{MAX_REFERENCE_WIDTH_CM} cm"
        )))
    }
}

/// Pixel distance between the temple landmarks
///
/// # Errors
///
/// Returns `InsufficientLandmarks` if a temple landmark is missing
pub fn temple_width_px(face: &FaceFrame, frame: FrameSize) -> Result<f64> {
    let [left, right] = face.get_all([FaceLandmark::LeftTemple, FaceLandmark::RightTemple])?;
    let dx = (right.x - left.x) * f64::from(frame.width);
    let dy = (right.y - left.y) * f64::from(frame.height);
    Ok(dx.hypot(dy))
}

/// Pinhole distance for a measured pixel width
///
/// # Errors
///
/// Returns `DegenerateGeometry` if the pixel width is too small
pub fn pinhole_distance_cm(reference_width_cm: f64, focal_length_px: f64, width_px: f64) -> Result<f64> {
    if !(width_px >= MIN_WIDTH_PX) {
        return Err(Error::DegenerateGeometry(format!(
            "Temple width {width_px:.6} px too small to measure distance"
        )));
    }
    Ok(reference_width_cm * focal_length_px / width_px)
}

/// Reference width implied by a known distance and pixel width
///
/// # Errors
///
/// Returns `DegenerateGeometry` if the focal length is not positive
pub fn reference_width_for_distance(distance_cm: f64, focal_length_px: f64, width_px: f64) -> Result<f64> {
    if !(focal_length_px > 0.0) {
        return Err(Error::DegenerateGeometry(format!(
            "Focal length {focal_length_px} px must be positive"
        )));
    }
    Ok(distance_cm * width_px / focal_length_px)
}

/// Distance estimator tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceSettings {
    /// Focal length source
    pub focal_model: FocalModel,
    /// Weight of the previous distance in the lag filter
    pub lag_beta: f64,
    /// Largest plausible change between frames, in centimetres
    pub jump_threshold_cm: f64,
    /// Consecutive rejected jumps before accepting the new level
    pub max_rejected_jumps: u32,
}

impl Default for DistanceSettings {
    fn default() -> Self {
        Self {
            focal_model: FocalModel::default(),
            lag_beta: DEFAULT_DISTANCE_BETA,
            jump_threshold_cm: DEFAULT_DISTANCE_JUMP_CM,
            max_rejected_jumps: DEFAULT_MAX_REJECTED_JUMPS,
        }
    }
}

/// One distance estimation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DistanceReading {
    /// Smoothed distance in centimetres
    pub distance_cm: f64,
    /// Unsmoothed distance measured this frame
    pub raw_cm: f64,
    /// What the lag filter did with the measurement
    pub decision: GateDecision,
}

/// Distance estimator owning the calibration and the lag filter
#[derive(Debug, Clone)]
pub struct DistanceEstimator {
    calibration: CalibrationState,
    focal_model: FocalModel,
    filter: JumpGatedLagFilter,
}

impl DistanceEstimator {
    /// Create a new distance estimator
    ///
    /// # Errors
    ///
    /// Returns `FilterError` if the lag filter settings are invalid, or
    /// `DegenerateGeometry` if a fixed focal length is not positive
    pub fn new(settings: DistanceSettings) -> Result<Self> {
        if let FocalModel::Fixed(focal) = settings.focal_model {
            if !(focal > 0.0) {
                return Err(Error::DegenerateGeometry(format!(
                    "Focal length {focal} px must be positive"
                )));
            }
        }
        info!("Initializing DistanceEstimator with {:?}", settings.focal_model);
        Ok(Self {
            calibration: CalibrationState::default(),
            focal_model: settings.focal_model,
            filter: JumpGatedLagFilter::new(
                settings.lag_beta,
                settings.jump_threshold_cm,
                settings.max_rejected_jumps,
            )?,
        })
    }

    /// Current calibration
    #[must_use]
    pub const fn calibration(&self) -> CalibrationState {
        self.calibration
    }

    /// Last smoothed distance
    #[must_use]
    pub const fn last_distance_cm(&self) -> Option<f64> {
        self.filter.value()
    }

    /// Set the real face width
    ///
    /// # Errors
    ///
    /// Returns `InvalidCalibration` if the width is outside [10, 20] cm; the
    /// calibration is left unchanged
    pub fn calibrate(&mut self, reference_width_cm: f64) -> Result<()> {
        let width = validate_reference_width(reference_width_cm).inspect_err(|e| warn!("{e}"))?;
        self.calibration = CalibrationState {
            reference_width_cm: width,
            is_calibrated: true,
        };
        info!("Calibrated reference face width to {width:.2} cm");
        Ok(())
    }

    /// Derive the face width from a frame taken at a known distance
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` if temples are missing, or
    /// `InvalidCalibration` if the implied width is implausible
    pub fn calibrate_from_distance(&mut self, known_distance_cm: f64, face: &FaceFrame, frame: FrameSize) -> Result<f64> {
        let width_px = temple_width_px(face, frame)?;
        let width_cm =
            reference_width_for_distance(known_distance_cm, self.focal_model.focal_length_px(frame), width_px)?;
        self.calibrate(width_cm)?;
        Ok(width_cm)
    }

    /// Estimate the subject distance for a frame
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` or `DegenerateGeometry`; the previous
    /// distance is kept in both cases
    pub fn estimate(&mut self, face: &FaceFrame, frame: FrameSize) -> Result<DistanceReading> {
        let width_px = temple_width_px(face, frame)?;
        let raw_cm = pinhole_distance_cm(
            self.calibration.reference_width_cm,
            self.focal_model.focal_length_px(frame),
            width_px,
        )?;

        let decision = self.filter.update(raw_cm);
        if decision == GateDecision::Rejected {
            log::debug!("Ignoring distance jump to {raw_cm:.1} cm");
        }

        Ok(DistanceReading {
            distance_cm: self.filter.value().unwrap_or(raw_cm),
            raw_cm,
            decision,
        })
    }

    /// Forget the smoothed distance, keeping calibration
    pub fn reset(&mut self) {
        self.filter.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::Landmark;

    fn face_with_temples(left_x: f64, right_x: f64) -> FaceFrame {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 478];
        points[FaceLandmark::LeftTemple.index()] = Landmark::new(left_x, 0.5, 0.0);
        points[FaceLandmark::RightTemple.index()] = Landmark::new(right_x, 0.5, 0.0);
        FaceFrame::from_points(points).unwrap()
    }

    #[test]
    fn test_pinhole_frame_width_proxy() {
        let d = pinhole_distance_cm(15.0, 640.0, 200.0).unwrap();
        assert!((d - 48.0).abs() < 1e-9);
        let w = reference_width_for_distance(d, 640.0, 200.0).unwrap();
        assert!((w - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_width_is_degenerate() {
        assert!(matches!(
            pinhole_distance_cm(15.0, 640.0, 0.0),
            Err(Error::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_calibration_range() {
        let mut estimator = DistanceEstimator::new(DistanceSettings::default()).unwrap();
        assert!(estimator.calibrate(25.0).is_err());
        assert_eq!(estimator.calibration(), CalibrationState::default());
        assert!(estimator.calibrate(15.0).is_ok());
        assert_eq!(estimator.calibration().reference_width_cm, 15.0);
        assert!(estimator.calibration().is_calibrated);
        assert!(estimator.calibrate(9.99).is_err());
        assert_eq!(estimator.calibration().reference_width_cm, 15.0);
    }

    #[test]
    fn test_estimate_from_frame() {
        let mut estimator = DistanceEstimator::new(DistanceSettings::default()).unwrap();
        estimator.calibrate(15.0).unwrap();
        // 0.3125 of 640 px = 200 px
        let face = face_with_temples(0.34375, 0.65625);
        let reading = estimator.estimate(&face, FrameSize::new(640, 480)).unwrap();
        assert!((reading.distance_cm - 48.0).abs() < 1e-6);
        assert_eq!(reading.decision, GateDecision::Seeded);
    }

    #[test]
    fn test_fixed_focal_model() {
        let settings = DistanceSettings {
            focal_model: FocalModel::Fixed(500.0),
            ..DistanceSettings::default()
        };
        let mut estimator = DistanceEstimator::new(settings).unwrap();
        let face = face_with_temples(0.4, 0.6);
        let reading = estimator.estimate(&face, FrameSize::new(1000, 500)).unwrap();
        // 14 cm * 500 px / 200 px
        assert!((reading.raw_cm - 35.0).abs() < 1e-6);
    }

    #[test]
    fn test_invalid_fixed_focal() {
        let settings = DistanceSettings {
            focal_model: FocalModel::Fixed(0.0),
            ..DistanceSettings::default()
        };
        assert!(DistanceEstimator::new(settings).is_err());
    }

    #[test]
    fn test_calibrate_from_distance() {
        let mut estimator = DistanceEstimator::new(DistanceSettings::default()).unwrap();
        let face = face_with_temples(0.34375, 0.65625);
        let width = estimator
            .calibrate_from_distance(48.0, &face, FrameSize::new(640, 480))
            .unwrap();
        assert!((width - 15.0).abs() < 1e-9);
        assert!(estimator.calibration().is_calibrated);
    }
}
