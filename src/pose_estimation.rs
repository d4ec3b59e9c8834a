//! Head pose estimation from landmark geometry.
//!
//! Pitch and yaw are measured relative to the torso: yaw compares the nose
//! with the shoulder midline, pitch compares the nose with the eye line.
//! Roll is the slope of the eye line. When no body landmarks are available
//! a coarser face-only estimate can be used instead.

use crate::{
    constants::{EPSILON, FACE_ONLY_PITCH_OFFSET, FACE_ONLY_SCALE},
    filters::angle::normalize_angle,
    landmarks::{FaceFrame, FaceLandmark, PoseFrame, PoseLandmark},
    Result,
};
use log::debug;
use serde::{Deserialize, Serialize};

/// Head orientation in degrees, each angle in (-180, 180]
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadPoseEstimate {
    /// Nod, rotation about the lateral axis
    pub pitch: f64,
    /// Turn, rotation about the vertical axis
    pub yaw: f64,
    /// Tilt, rotation about the longitudinal axis
    pub roll: f64,
}

impl HeadPoseEstimate {
    /// Create an estimate from raw angles
    #[must_use]
    pub const fn new(pitch: f64, yaw: f64, roll: f64) -> Self {
        Self { pitch, yaw, roll }
    }

    /// Same estimate with every angle mapped into (-180, 180]
    #[must_use]
    pub fn normalized(self) -> Self {
        Self {
            pitch: normalize_angle(self.pitch),
            yaw: normalize_angle(self.yaw),
            roll: normalize_angle(self.roll),
        }
    }

    /// Angles of this estimate measured from `reference`
    #[must_use]
    pub fn relative_to(self, reference: Self) -> Self {
        Self::new(
            self.pitch - reference.pitch,
            self.yaw - reference.yaw,
            self.roll - reference.roll,
        )
        .normalized()
    }

    /// Euclidean norm of the three angles
    #[must_use]
    pub fn magnitude(&self) -> f64 {
        self.roll
            .mul_add(self.roll, self.pitch.mul_add(self.pitch, self.yaw * self.yaw))
            .sqrt()
    }
}

/// Which formulation produced a pose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseMode {
    /// Head relative to the torso, using body landmarks
    BodyRelative,
    /// Degraded estimate from face landmarks alone
    FaceOnly,
}

/// Angles that could not be measured this frame and kept their previous value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HeldAngles {
    /// Pitch was held
    pub pitch: bool,
    /// Yaw was held
    pub yaw: bool,
    /// Roll was held
    pub roll: bool,
}

impl HeldAngles {
    /// Whether any angle was held
    #[must_use]
    pub const fn any(&self) -> bool {
        self.pitch || self.yaw || self.roll
    }

    /// Names of the held angles
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        [("pitch", self.pitch), ("yaw", self.yaw), ("roll", self.roll)]
            .into_iter()
            .filter_map(|(name, held)| held.then_some(name))
            .collect()
    }
}

/// Result of one estimation step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseMeasurement {
    /// The estimate after holding degenerate angles
    pub estimate: HeadPoseEstimate,
    /// Formulation used
    pub mode: PoseMode,
    /// Angles held at their previous value
    pub held: HeldAngles,
}

/// Angle of the vector (dx, dy) in degrees, or `None` if it is too short
#[must_use]
pub fn vector_angle(dy: f64, dx: f64) -> Option<f64> {
    if dx.hypot(dy) < EPSILON {
        None
    } else {
        Some(dy.atan2(dx).to_degrees())
    }
}

/// Head pose estimator that retains the last valid estimate
///
/// Held angles only ever come from the formulation that is currently in
/// use: switching between body-relative and face-only drops the history.
#[derive(Debug, Clone, Default)]
pub struct HeadPoseEstimator {
    last: HeadPoseEstimate,
    mode: Option<PoseMode>,
}

impl HeadPoseEstimator {
    /// Create a new estimator with a neutral initial pose
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Last valid estimate
    #[must_use]
    pub const fn last(&self) -> HeadPoseEstimate {
        self.last
    }

    /// Formulation of the last valid estimate
    #[must_use]
    pub const fn mode(&self) -> Option<PoseMode> {
        self.mode
    }

    /// Estimate body-relative head pose
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` if a shoulder, the nose tip or an inner
    /// eye corner is missing. The last estimate is kept in that case.
    pub fn estimate(&mut self, pose: &PoseFrame, face: &FaceFrame) -> Result<PoseMeasurement> {
        let [left_shoulder, right_shoulder] =
            pose.get_all([PoseLandmark::LeftShoulder, PoseLandmark::RightShoulder])?;
        let [nose, left_eye, right_eye] = face.get_all([
            FaceLandmark::NoseTip,
            FaceLandmark::LeftEyeInner,
            FaceLandmark::RightEyeInner,
        ])?;

        let body_midline = left_shoulder.midpoint(right_shoulder);
        let mid_eyes = left_eye.midpoint(right_eye);

        let yaw = vector_angle(nose.x - body_midline.x, nose.z - body_midline.z);
        let pitch = vector_angle(nose.y - mid_eyes.y, nose.z - mid_eyes.z);
        let roll = vector_angle(right_eye.y - left_eye.y, right_eye.x - left_eye.x);

        Ok(self.commit(pitch, yaw, roll, PoseMode::BodyRelative))
    }

    /// Estimate a degraded head pose from face landmarks alone
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` if the nose tip or an outer eye corner
    /// is missing
    pub fn estimate_face_only(&mut self, face: &FaceFrame) -> Result<PoseMeasurement> {
        let [nose, left_eye, right_eye] = face.get_all([
            FaceLandmark::NoseTip,
            FaceLandmark::LeftEyeOuter,
            FaceLandmark::RightEyeOuter,
        ])?;

        let yaw = Some((right_eye.x - left_eye.x) * FACE_ONLY_SCALE);
        let pitch = Some(nose.y.mul_add(FACE_ONLY_SCALE, -FACE_ONLY_PITCH_OFFSET));
        let roll = vector_angle(right_eye.y - left_eye.y, right_eye.x - left_eye.x);

        Ok(self.commit(pitch, yaw, roll, PoseMode::FaceOnly))
    }

    /// Return to the neutral pose
    pub fn reset(&mut self) {
        self.last = HeadPoseEstimate::default();
        self.mode = None;
    }

    fn commit(&mut self, pitch: Option<f64>, yaw: Option<f64>, roll: Option<f64>, mode: PoseMode) -> PoseMeasurement {
        if let Some(previous) = self.mode.filter(|&previous| previous != mode) {
            debug!("Pose mode changed from {previous:?} to {mode:?}, dropping held angles");
            self.last = HeadPoseEstimate::default();
        }
        self.mode = Some(mode);

        let held = HeldAngles {
            pitch: pitch.is_none(),
            yaw: yaw.is_none(),
            roll: roll.is_none(),
        };
        if held.any() {
            debug!("Degenerate pose geometry, holding {:?}", held.names());
        }

        let estimate = HeadPoseEstimate {
            pitch: pitch.unwrap_or(self.last.pitch),
            yaw: yaw.unwrap_or(self.last.yaw),
            roll: roll.unwrap_or(self.last.roll),
        }
        .normalized();

        self.last = estimate;
        PoseMeasurement { estimate, mode, held }
    }
}
