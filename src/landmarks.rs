//! Landmark types and the semantic landmark catalogue.
//!
//! Frames are indexed by typed IDs rather than raw numbers. Two landmark
//! sets exist, the face mesh and the body pose, and a frame of one set can
//! never be queried with IDs of the other.
//!
//! Left and right follow the image side of a mirrored (selfie) view, so
//! `LeftEyeOuter` is the corner nearest the left edge of the frame.

use crate::{
    constants::{FACE_MESH_REFINED_LANDMARKS, POSE_LANDMARKS},
    Error, Result,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::marker::PhantomData;

/// A single detected point: x,y normalized to the frame, z relative depth
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position in [0, 1]
    pub x: f64,
    /// Vertical position in [0, 1]
    pub y: f64,
    /// Relative depth, no fixed unit
    #[serde(default)]
    pub z: f64,
}

impl Landmark {
    /// Create a landmark from its coordinates
    #[must_use]
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Coordinates as a vector
    #[must_use]
    pub fn to_vector(self) -> Vector3<f64> {
        Vector3::new(self.x, self.y, self.z)
    }

    /// Landmark from a coordinate vector
    #[must_use]
    pub fn from_vector(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }

    /// Midpoint of two landmarks
    #[must_use]
    pub fn midpoint(self, other: Self) -> Self {
        Self::from_vector((self.to_vector() + other.to_vector()) * 0.5)
    }

    /// Whether all coordinates are finite
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// A family of landmarks sharing one index space
pub trait LandmarkSet: Debug + Clone + Copy + PartialEq + Send + Sync + 'static {
    /// Semantic identifier type for this set
    type Id: Copy + Debug;

    /// Human-readable set name used in error messages
    const NAME: &'static str;

    /// Landmark count produced by the detector for this set
    const EXPECTED_LEN: usize;

    /// Array slot of a semantic identifier
    fn index(id: Self::Id) -> usize;
}

/// Marker for the face-mesh landmark set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceMesh {}

/// Marker for the body-pose landmark set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyPose {}

/// Named face-mesh landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaceLandmark {
    /// Tip of the nose
    NoseTip,
    /// Outer corner of the left eye
    LeftEyeOuter,
    /// Inner corner of the left eye
    LeftEyeInner,
    /// Inner corner of the right eye
    RightEyeInner,
    /// Outer corner of the right eye
    RightEyeOuter,
    /// Left face edge at temple height
    LeftTemple,
    /// Right face edge at temple height
    RightTemple,
    /// Centre of the left iris
    LeftIrisCenter,
    /// Left iris ring point (0..4)
    LeftIrisRing(u8),
    /// Centre of the right iris
    RightIrisCenter,
    /// Right iris ring point (0..4)
    RightIrisRing(u8),
}

impl FaceLandmark {
    /// Face-mesh slot of this landmark
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::NoseTip => 1,
            Self::LeftEyeOuter => 33,
            Self::LeftEyeInner => 133,
            Self::RightEyeInner => 362,
            Self::RightEyeOuter => 263,
            Self::LeftTemple => 234,
            Self::RightTemple => 454,
            Self::LeftIrisCenter => 468,
            Self::LeftIrisRing(i) => 469 + i as usize,
            Self::RightIrisCenter => 473,
            Self::RightIrisRing(i) => 474 + i as usize,
        }
    }
}

/// Named body-pose landmarks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PoseLandmark {
    /// Nose
    Nose,
    /// Left shoulder joint
    LeftShoulder,
    /// Right shoulder joint
    RightShoulder,
}

impl PoseLandmark {
    /// Pose slot of this landmark
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Self::Nose => 0,
            Self::LeftShoulder => 11,
            Self::RightShoulder => 12,
        }
    }
}

impl LandmarkSet for FaceMesh {
    type Id = FaceLandmark;
    const NAME: &'static str = "face mesh";
    const EXPECTED_LEN: usize = FACE_MESH_REFINED_LANDMARKS;

    fn index(id: FaceLandmark) -> usize {
        id.index()
    }
}

impl LandmarkSet for BodyPose {
    type Id = PoseLandmark;
    const NAME: &'static str = "body pose";
    const EXPECTED_LEN: usize = POSE_LANDMARKS;

    fn index(id: PoseLandmark) -> usize {
        id.index()
    }
}

/// Which eye, by image side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EyeSide {
    /// Eye nearest the left edge of the frame
    Left,
    /// Eye nearest the right edge of the frame
    Right,
}

impl EyeSide {
    /// Outer and inner corner landmarks of this eye
    #[must_use]
    pub const fn corners(self) -> [FaceLandmark; 2] {
        match self {
            Self::Left => [FaceLandmark::LeftEyeOuter, FaceLandmark::LeftEyeInner],
            Self::Right => [FaceLandmark::RightEyeInner, FaceLandmark::RightEyeOuter],
        }
    }

    /// Iris ring landmarks of this eye
    #[must_use]
    pub const fn iris_ring(self) -> [FaceLandmark; 4] {
        match self {
            Self::Left => [
                FaceLandmark::LeftIrisRing(0),
                FaceLandmark::LeftIrisRing(1),
                FaceLandmark::LeftIrisRing(2),
                FaceLandmark::LeftIrisRing(3),
            ],
            Self::Right => [
                FaceLandmark::RightIrisRing(0),
                FaceLandmark::RightIrisRing(1),
                FaceLandmark::RightIrisRing(2),
                FaceLandmark::RightIrisRing(3),
            ],
        }
    }
}

/// An ordered, ID-indexed set of landmarks for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct LandmarkFrame<S: LandmarkSet> {
    points: Vec<Landmark>,
    _set: PhantomData<S>,
}

/// Face-mesh frame
pub type FaceFrame = LandmarkFrame<FaceMesh>;

/// Body-pose frame
pub type PoseFrame = LandmarkFrame<BodyPose>;

impl<S: LandmarkSet> LandmarkFrame<S> {
    /// Ingest a detector frame, rejecting non-finite coordinates
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if any coordinate is NaN or infinite
    pub fn from_points(points: Vec<Landmark>) -> Result<Self> {
        if let Some(i) = points.iter().position(|p| !p.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "{} landmark {i} has non-finite coordinates",
                S::NAME
            )));
        }
        Ok(Self::from_trusted(points))
    }

    pub(crate) fn from_trusted(points: Vec<Landmark>) -> Self {
        Self {
            points,
            _set: PhantomData,
        }
    }

    /// Number of landmarks in the frame
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the frame holds no landmarks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether the frame carries every landmark the detector produces
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.points.len() >= S::EXPECTED_LEN
    }

    /// All landmarks in index order
    #[must_use]
    pub fn points(&self) -> &[Landmark] {
        &self.points
    }

    /// Consume the frame, returning its landmarks
    #[must_use]
    pub fn into_points(self) -> Vec<Landmark> {
        self.points
    }

    /// Look up a landmark by semantic ID
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` if the frame is too short to contain it
    pub fn get(&self, id: S::Id) -> Result<Landmark> {
        let index = S::index(id);
        self.points.get(index).copied().ok_or_else(|| {
            Error::InsufficientLandmarks(format!(
                "{} landmark {id:?} (index {index}) missing from frame of {}",
                S::NAME,
                self.points.len()
            ))
        })
    }

    /// Look up several landmarks, failing on the first missing one
    ///
    /// # Errors
    ///
    /// Returns `InsufficientLandmarks` if any ID is out of range
    pub fn get_all<const N: usize>(&self, ids: [S::Id; N]) -> Result<[Landmark; N]> {
        let mut out = [Landmark::default(); N];
        for (slot, id) in out.iter_mut().zip(ids) {
            *slot = self.get(id)?;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame_of(len: usize) -> FaceFrame {
        FaceFrame::from_points(vec![Landmark::new(0.5, 0.5, 0.0); len]).unwrap()
    }

    #[test]
    fn test_face_indices_match_mesh_layout() {
        assert_eq!(FaceLandmark::NoseTip.index(), 1);
        assert_eq!(FaceLandmark::LeftIrisRing(0).index(), 469);
        assert_eq!(FaceLandmark::LeftIrisRing(3).index(), 472);
        assert_eq!(FaceLandmark::RightIrisRing(3).index(), 477);
        assert!(FaceLandmark::RightIrisRing(3).index() < FACE_MESH_REFINED_LANDMARKS);
        assert_eq!(PoseLandmark::RightShoulder.index(), 12);
    }

    #[test]
    fn test_get_out_of_range() {
        let frame = frame_of(10);
        assert!(frame.get(FaceLandmark::NoseTip).is_ok());
        assert!(matches!(
            frame.get(FaceLandmark::LeftTemple),
            Err(Error::InsufficientLandmarks(_))
        ));
        assert!(!frame.is_complete());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut points = vec![Landmark::new(0.5, 0.5, 0.0); 5];
        points[3].y = f64::NAN;
        assert!(matches!(FaceFrame::from_points(points), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_midpoint() {
        let m = Landmark::new(0.0, 0.2, -1.0).midpoint(Landmark::new(1.0, 0.4, 1.0));
        assert!((m.x - 0.5).abs() < 1e-12);
        assert!((m.y - 0.3).abs() < 1e-12);
        assert!(m.z.abs() < 1e-12);
    }

    #[test]
    fn test_landmark_deserializes_without_depth() {
        let p: Landmark = serde_json::from_str(r#"{"x":0.25,"y":0.75}"#).unwrap();
        assert_eq!(p, Landmark::new(0.25, 0.75, 0.0));
    }
}
