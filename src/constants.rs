//! Constants used throughout the library

/// Face-mesh landmark count without iris refinement
pub const FACE_MESH_LANDMARKS: usize = 468;

/// Face-mesh landmark count with iris refinement (5 points per eye)
pub const FACE_MESH_REFINED_LANDMARKS: usize = 478;

/// Body-pose landmark count
pub const POSE_LANDMARKS: usize = 33;

/// Default landmark smoothing factor (weight of the previous frame)
pub const DEFAULT_LANDMARK_ALPHA: f64 = 0.7;

/// Default angle smoothing factor (weight of the previous angle)
pub const DEFAULT_ANGLE_ALPHA: f64 = 0.92;

/// Population-average face width in centimetres
pub const DEFAULT_REFERENCE_WIDTH_CM: f64 = 14.0;

/// Plausible human face width range in centimetres
pub const MIN_REFERENCE_WIDTH_CM: f64 = 10.0;
pub const MAX_REFERENCE_WIDTH_CM: f64 = 20.0;

/// Default distance lag filter weight (weight of the previous distance)
pub const DEFAULT_DISTANCE_BETA: f64 = 0.8;

/// Distance changes larger than this are treated as detection glitches
pub const DEFAULT_DISTANCE_JUMP_CM: f64 = 30.0;

/// Consecutive rejected jumps before the distance filter re-seeds
pub const DEFAULT_MAX_REJECTED_JUMPS: u32 = 5;

/// Pixel widths below this are treated as degenerate
pub const MIN_WIDTH_PX: f64 = 1e-3;

/// Minimum iris ring points per eye
pub const MIN_IRIS_POINTS: usize = 4;

/// Default stability indicator radii and smoothing
pub const DEFAULT_STABILITY_MIN_RADIUS: f64 = 20.0;
pub const DEFAULT_STABILITY_MAX_RADIUS: f64 = 60.0;
pub const DEFAULT_STABILITY_ALPHA: f64 = 0.9;

/// Default frame dimensions in pixels
pub const DEFAULT_FRAME_WIDTH: u32 = 640;
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Scale applied to normalized coordinates by the face-only pose fallback
pub const FACE_ONLY_SCALE: f64 = 100.0;

/// Pitch offset of the face-only pose fallback
pub const FACE_ONLY_PITCH_OFFSET: f64 = 50.0;

/// Numeric precision epsilon for reference vectors in normalized units
pub const EPSILON: f64 = 1e-9;
