//! Per-frame tracking pipeline.
//!
//! [`Tracker`] owns every piece of mutable state: smoother history, the
//! calibration, the gaze baseline and the last valid estimates. Each
//! subject or camera gets its own instance. A frame never fails as a whole;
//! stages that cannot produce a fresh value keep their previous one and
//! report a [`FrameIssue`].

use crate::{
    constants::{DEFAULT_FRAME_HEIGHT, DEFAULT_FRAME_WIDTH, DEFAULT_LANDMARK_ALPHA, MIN_IRIS_POINTS},
    distance::{CalibrationState, DistanceEstimator, DistanceSettings, FrameSize},
    error::ErrorKind,
    filters::{create_filter, landmark::LandmarkSmoother, PoseFilter},
    gaze::{GazeBaseline, GazeOffset, GazeTracker},
    landmarks::{BodyPose, FaceFrame, FaceMesh, PoseFrame},
    pose_estimation::{HeadPoseEstimate, HeadPoseEstimator, PoseMode},
    stability::StabilityMonitor,
    Error, Result,
};
use log::{debug, info};
use serde::Serialize;

/// Landmarks delivered for one frame
#[derive(Debug, Clone)]
pub struct FrameInput {
    /// Face-mesh landmarks
    pub face: FaceFrame,
    /// Body-pose landmarks, if the detector produced them
    pub pose: Option<PoseFrame>,
    /// Frame dimensions in pixels
    pub frame_size: FrameSize,
}

/// Pipeline stage that reported a problem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Landmark smoothing
    Landmarks,
    /// Head pose estimation
    HeadPose,
    /// Distance estimation
    Distance,
    /// Gaze tracking
    Gaze,
}

/// Soft failure of one stage for one frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameIssue {
    /// Stage that held its previous value
    pub stage: Stage,
    /// Failure classification
    pub kind: ErrorKind,
    /// Human-readable detail
    pub message: String,
}

impl FrameIssue {
    fn new(stage: Stage, error: &Error) -> Self {
        Self {
            stage,
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

/// Estimates emitted for one processed frame
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrackingOutput {
    /// Number of frames processed by this tracker, starting at 1
    pub sequence: u64,
    /// Smoothed head pose
    pub head_pose: HeadPoseEstimate,
    /// Formulation that produced the pose this frame, `None` if held
    pub pose_mode: Option<PoseMode>,
    /// Smoothed distance, `None` until the first valid measurement
    pub distance_cm: Option<f64>,
    /// Gaze offset, `None` until the first valid measurement
    pub gaze: Option<GazeOffset>,
    /// Stability indicator radius, when enabled
    pub stability_radius: Option<f64>,
    /// Soft failures reported this frame
    pub issues: Vec<FrameIssue>,
}

impl TrackingOutput {
    /// Whether every stage produced a fresh value
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Stability indicator tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StabilitySettings {
    /// Radius at maximal rotation
    pub min_radius: f64,
    /// Radius for a neutral head
    pub max_radius: f64,
    /// Weight of the previous radius
    pub alpha: f64,
}

/// Tracker construction parameters
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerSettings {
    /// Weight of the previous frame in landmark smoothing
    pub landmark_alpha: f64,
    /// Pose filter description, see [`create_filter`]
    pub pose_filter: String,
    /// Use the face-only pose when no body landmarks arrive
    pub face_only_fallback: bool,
    /// Distance estimator tuning
    pub distance: DistanceSettings,
    /// Minimum iris ring points per eye
    pub min_iris_points: usize,
    /// Stability indicator, `None` to disable
    pub stability: Option<StabilitySettings>,
    /// Frame size assumed when a source does not report one
    pub default_frame_size: FrameSize,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            landmark_alpha: DEFAULT_LANDMARK_ALPHA,
            pose_filter: "exponential".to_string(),
            face_only_fallback: true,
            distance: DistanceSettings::default(),
            min_iris_points: MIN_IRIS_POINTS,
            stability: None,
            default_frame_size: FrameSize::new(DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT),
        }
    }
}

/// Landmark-to-estimate pipeline for one subject
pub struct Tracker {
    face_smoother: LandmarkSmoother<FaceMesh>,
    pose_smoother: LandmarkSmoother<BodyPose>,
    pose_estimator: HeadPoseEstimator,
    pose_filter: Box<dyn PoseFilter>,
    distance: DistanceEstimator,
    gaze: GazeTracker,
    stability: Option<StabilityMonitor>,
    face_only_fallback: bool,
    default_frame_size: FrameSize,
    head_pose: HeadPoseEstimate,
    stability_reference: Option<HeadPoseEstimate>,
    last_gaze: Option<GazeOffset>,
    sequence: u64,
}

impl Tracker {
    /// Create a tracker
    ///
    /// # Errors
    ///
    /// Returns `FilterError` or `ConfigError` if any setting is out of range
    pub fn new(settings: TrackerSettings) -> Result<Self> {
        let pose_filter = create_filter(&settings.pose_filter)?;
        info!(
            "Initializing Tracker (landmark alpha {}, pose filter {})",
            settings.landmark_alpha,
            pose_filter.name()
        );

        let stability = settings
            .stability
            .map(|s| StabilityMonitor::new(s.min_radius, s.max_radius, s.alpha))
            .transpose()?;

        Ok(Self {
            face_smoother: LandmarkSmoother::try_new(settings.landmark_alpha)?,
            pose_smoother: LandmarkSmoother::try_new(settings.landmark_alpha)?,
            pose_estimator: HeadPoseEstimator::new(),
            pose_filter,
            distance: DistanceEstimator::new(settings.distance)?,
            gaze: GazeTracker::new(settings.min_iris_points),
            stability,
            face_only_fallback: settings.face_only_fallback,
            default_frame_size: settings.default_frame_size,
            head_pose: HeadPoseEstimate::default(),
            stability_reference: None,
            last_gaze: None,
            sequence: 0,
        })
    }

    /// Frame size assumed when a source does not report one
    #[must_use]
    pub const fn default_frame_size(&self) -> FrameSize {
        self.default_frame_size
    }

    /// Current calibration
    #[must_use]
    pub const fn calibration(&self) -> CalibrationState {
        self.distance.calibration()
    }

    /// Current gaze baseline
    #[must_use]
    pub fn gaze_baseline(&self) -> GazeBaseline {
        self.gaze.baseline()
    }

    /// Last smoothed head pose
    #[must_use]
    pub const fn head_pose(&self) -> HeadPoseEstimate {
        self.head_pose
    }

    /// Number of frames processed
    #[must_use]
    pub const fn frames_processed(&self) -> u64 {
        self.sequence
    }

    /// Set the real face width used for distance
    ///
    /// # Errors
    ///
    /// Returns `InvalidCalibration` if the width is outside [10, 20] cm; no
    /// state changes in that case
    pub fn calibrate(&mut self, reference_width_cm: f64) -> Result<()> {
        self.distance.calibrate(reference_width_cm)
    }

    /// Derive the face width from a frame captured at a known distance
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks`, `DegenerateGeometry` or
    /// `InvalidCalibration`; no state changes on error
    pub fn calibrate_from_distance(&mut self, known_distance_cm: f64, input: &FrameInput) -> Result<f64> {
        self.distance
            .calibrate_from_distance(known_distance_cm, &input.face, input.frame_size)
    }

    /// Clear the gaze baseline; the next valid frame captures a new one
    pub fn reset_gaze_baseline(&mut self) {
        self.gaze.reset_baseline();
        self.last_gaze = None;
    }

    /// Clear all history and held estimates, keeping calibration
    pub fn reset(&mut self) {
        info!("Resetting tracker state");
        self.face_smoother.reset();
        self.pose_smoother.reset();
        self.pose_estimator.reset();
        self.pose_filter.reset();
        self.distance.reset();
        self.reset_gaze_baseline();
        if let Some(stability) = &mut self.stability {
            stability.reset();
        }
        self.head_pose = HeadPoseEstimate::default();
        self.stability_reference = None;
    }

    /// Process one frame
    pub fn process(&mut self, input: FrameInput) -> TrackingOutput {
        self.sequence += 1;
        let frame_size = input.frame_size;
        let mut issues = Vec::new();

        if let Err(e) = self.face_smoother.check_shape(&input.face) {
            issues.push(FrameIssue::new(Stage::Landmarks, &e));
        }
        let face = self.face_smoother.smooth(input.face);
        let pose = input.pose.map(|p| {
            if let Err(e) = self.pose_smoother.check_shape(&p) {
                issues.push(FrameIssue::new(Stage::Landmarks, &e));
            }
            self.pose_smoother.smooth(p)
        });

        let pose_mode = self.update_head_pose(pose.as_ref(), &face, &mut issues);

        // Roll compensation needs the body-relative pose of this frame
        let head_roll = match self.pose_estimator.mode() {
            Some(PoseMode::BodyRelative) if pose.is_some() => self.pose_estimator.last().roll,
            _ => 0.0,
        };

        let distance_cm = match self.distance.estimate(&face, frame_size) {
            Ok(reading) => Some(reading.distance_cm),
            Err(e) => {
                issues.push(FrameIssue::new(Stage::Distance, &e));
                self.distance.last_distance_cm()
            }
        };

        match self.gaze.update_from_face(&face, head_roll, frame_size) {
            Ok(offset) => self.last_gaze = Some(offset),
            Err(e) => issues.push(FrameIssue::new(Stage::Gaze, &e)),
        }

        let stability_radius = match &mut self.stability {
            Some(monitor) => {
                let reference = *self.stability_reference.get_or_insert(self.head_pose);
                Some(monitor.update(&self.head_pose.relative_to(reference)))
            }
            None => None,
        };

        if !issues.is_empty() {
            debug!("Frame {}: {} issue(s) reported", self.sequence, issues.len());
        }

        TrackingOutput {
            sequence: self.sequence,
            head_pose: self.head_pose,
            pose_mode,
            distance_cm,
            gaze: self.last_gaze,
            stability_radius,
            issues,
        }
    }

    fn update_head_pose(
        &mut self,
        pose: Option<&PoseFrame>,
        face: &FaceFrame,
        issues: &mut Vec<FrameIssue>,
    ) -> Option<PoseMode> {
        let previous_mode = self.pose_estimator.mode();
        let measured = match pose {
            Some(pose) => self.pose_estimator.estimate(pose, face),
            None if self.face_only_fallback => self.pose_estimator.estimate_face_only(face),
            None => Err(Error::InsufficientLandmarks(
                "no body landmarks and face-only fallback disabled".to_string(),
            )),
        };

        match measured {
            Ok(m) => {
                if m.held.any() {
                    issues.push(FrameIssue::new(
                        Stage::HeadPose,
                        &Error::DegenerateGeometry(format!("held {}", m.held.names().join(", "))),
                    ));
                }
                if previous_mode.is_some_and(|previous| previous != m.mode) {
                    // The two formulations measure different angles
                    self.pose_filter.reset();
                    self.stability_reference = None;
                }
                self.head_pose = self.pose_filter.apply(m.estimate);
                Some(m.mode)
            }
            Err(e) => {
                issues.push(FrameIssue::new(Stage::HeadPose, &e));
                None
            }
        }
    }
}
