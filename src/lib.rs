//! Landmark-based head tracking library.
//!
//! Turns per-frame face-mesh and body-pose landmarks (`MediaPipe` layout,
//! normalized image coordinates) into smoothed estimates:
//! - head pose (pitch, yaw, roll) relative to the body, with a face-only fallback
//! - camera distance from a calibrated face width
//! - gaze offset of each iris against a one-time baseline
//! - an optional stability radius for visual feedback
//!
//! Landmark detection, capture and rendering happen elsewhere. A
//! [`pipeline::Tracker`] owns all mutable state for one subject; it can run
//! inline or behind a [`frame_queue::FrameSlot`] that always keeps the newest
//! frame.
//!
//! # Examples
//!
//! ## Smoothing angles across the ±180° seam
//!
//! ```
//! use landmark_tracker::filters::angle::smooth_angle;
//!
//! let smoothed = smooth_angle(-179.0, 179.0, 0.92);
//! assert!((smoothed - 179.16).abs() < 1e-9);
//! ```
//!
//! ## Running the pipeline
//!
//! ```no_run
//! use landmark_tracker::{
//!     distance::FrameSize,
//!     landmarks::{FaceFrame, Landmark},
//!     pipeline::{FrameInput, Tracker, TrackerSettings},
//! };
//!
//! # fn main() -> landmark_tracker::Result<()> {
//! let mut tracker = Tracker::new(TrackerSettings::default())?;
//! tracker.calibrate(15.0)?;
//!
//! let face = FaceFrame::from_points(vec![Landmark::default(); 478])?;
//! let output = tracker.process(FrameInput {
//!     face,
//!     pose: None,
//!     frame_size: FrameSize::new(640, 480),
//! });
//! println!("yaw {:.1}, distance {:?}", output.head_pose.yaw, output.distance_cm);
//! for issue in &output.issues {
//!     println!("{:?} held: {}", issue.stage, issue.message);
//! }
//! # Ok(())
//! # }
//! ```

/// Landmark types, named indices and typed frames
pub mod landmarks;

/// Landmark, angle and distance smoothing filters
pub mod filters;

/// Head pose estimation from body and face landmarks
pub mod pose_estimation;

/// Pinhole-camera distance estimation and calibration
pub mod distance;

/// Iris-based gaze offset tracking
pub mod gaze;

/// Stability indicator from head pose magnitude
pub mod stability;

/// Per-frame tracking pipeline
pub mod pipeline;

/// Drop-oldest frame hand-off to a worker thread
pub mod frame_queue;

/// Error types and result handling
pub mod error;

/// Recorded-stream replay application
pub mod app;

/// Constants used throughout the library
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
