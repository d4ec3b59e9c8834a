//! Replay application: feeds a recorded landmark stream through the tracker.

use crate::{
    distance::FrameSize,
    error::Result,
    frame_queue::{spawn_worker, FrameSlot},
    landmarks::{FaceFrame, Landmark, PoseFrame},
    pipeline::{FrameInput, Tracker, TrackingOutput},
    Error,
};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    io::{self, BufRead, BufReader, Write},
    path::PathBuf,
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Where recorded frames come from
    pub input: InputSource,
    /// Feed rate in frames per second; `None` processes every frame in order
    pub fps: Option<f64>,
    /// How estimates are printed
    pub output_format: OutputFormat,
    /// Face width in centimetres applied before replay
    pub calibrate_cm: Option<f64>,
}

/// Recorded stream location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    /// Standard input
    Stdin,
    /// JSON Lines file
    File(PathBuf),
}

impl InputSource {
    /// Parse a command-line value, `-` meaning standard input
    #[must_use]
    pub fn from_arg(arg: &str) -> Self {
        if arg == "-" {
            Self::Stdin
        } else {
            Self::File(PathBuf::from(arg))
        }
    }

    fn open(&self) -> Result<Box<dyn BufRead>> {
        match self {
            Self::Stdin => {
                info!("Reading landmarks from stdin");
                Ok(Box::new(BufReader::new(io::stdin())))
            }
            Self::File(path) => {
                info!("Opening recording: {}", path.display());
                Ok(Box::new(BufReader::new(File::open(path)?)))
            }
        }
    }
}

/// Output format for per-frame estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One human-readable line per frame
    Text,
    /// One JSON object per frame
    Json,
}

/// One line of a recorded landmark stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordedFrame {
    /// Frame width in pixels, if the recorder knew it
    #[serde(default)]
    pub frame_width: Option<u32>,
    /// Frame height in pixels, if the recorder knew it
    #[serde(default)]
    pub frame_height: Option<u32>,
    /// Face-mesh landmarks
    #[serde(default)]
    pub face: Vec<Landmark>,
    /// Body-pose landmarks
    #[serde(default)]
    pub pose: Option<Vec<Landmark>>,
}

impl RecordedFrame {
    /// Parse one JSON line
    ///
    /// # Errors
    ///
    /// Returns `Recording` with the 1-based line number if the line is not a valid frame
    pub fn parse(line: &str, line_number: usize) -> Result<Self> {
        serde_json::from_str(line).map_err(|e| Error::Recording {
            line: line_number,
            message: e.to_string(),
        })
    }

    /// Convert into pipeline input, filling in a missing frame size
    ///
    /// # Errors
    ///
    /// Returns `Recording` if any landmark is non-finite
    pub fn into_input(self, default_size: FrameSize, line_number: usize) -> Result<FrameInput> {
        let recording_error = |e: Error| Error::Recording {
            line: line_number,
            message: e.to_string(),
        };

        let frame_size = FrameSize::new(
            self.frame_width.unwrap_or(default_size.width),
            self.frame_height.unwrap_or(default_size.height),
        );
        let face = FaceFrame::from_points(self.face).map_err(recording_error)?;
        let pose = self
            .pose
            .map(PoseFrame::from_points)
            .transpose()
            .map_err(recording_error)?;

        Ok(FrameInput { face, pose, frame_size })
    }
}

/// Totals reported when a replay finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RunSummary {
    /// Non-blank lines read
    pub lines: u64,
    /// Frames the tracker processed
    pub processed: u64,
    /// Frames overwritten before the worker reached them
    pub dropped: u64,
    /// Lines that could not be turned into a frame
    pub skipped: u64,
}

/// Main application struct
pub struct TrackerApp {
    config: AppConfig,
    tracker: Tracker,
}

impl TrackerApp {
    /// Create a new replay application
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for a non-positive feed rate or
    /// `InvalidCalibration` for an implausible face width
    pub fn new(config: AppConfig, mut tracker: Tracker) -> Result<Self> {
        info!("Initializing landmark replay");

        if let Some(fps) = config.fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(Error::InvalidInput(format!("Feed rate must be positive, got {fps}")));
            }
            info!("Feeding frames at {fps} fps through the worker");
        }

        if let Some(width) = config.calibrate_cm {
            tracker.calibrate(width)?;
            info!("Calibrated face width: {width} cm");
        }

        Ok(Self { config, tracker })
    }

    /// Replay the configured input to stdout
    ///
    /// # Errors
    ///
    /// Returns `Io` if the input cannot be read or output cannot be written
    pub fn run(self) -> Result<RunSummary> {
        let reader = self.config.input.open()?;
        let stdout = io::stdout();
        let mut out = stdout.lock();
        self.run_with(reader, &mut out)
    }

    /// Replay `reader` and write estimates to `out`
    ///
    /// # Errors
    ///
    /// Returns `Io` on read or write failure, or `Worker` if the tracking
    /// thread panics
    pub fn run_with<R: BufRead, W: Write>(self, reader: R, out: &mut W) -> Result<RunSummary> {
        let format = self.config.output_format;
        let start = Instant::now();

        let summary = match self.config.fps {
            Some(fps) => Self::run_paced(self.tracker, reader, out, format, fps)?,
            None => Self::run_sequential(self.tracker, reader, out, format)?,
        };

        info!(
            "Replay finished in {:.2}s: {} processed, {} dropped, {} skipped",
            start.elapsed().as_secs_f64(),
            summary.processed,
            summary.dropped,
            summary.skipped
        );
        write_summary(out, &summary, format)?;
        Ok(summary)
    }

    fn run_sequential<R: BufRead, W: Write>(
        mut tracker: Tracker,
        reader: R,
        out: &mut W,
        format: OutputFormat,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let default_size = tracker.default_frame_size();

        for_each_frame(reader, default_size, &mut summary, |input| {
            let output = tracker.process(input);
            write_output(out, &output, format)
        })?;

        summary.processed = tracker.frames_processed();
        Ok(summary)
    }

    fn run_paced<R: BufRead, W: Write>(
        tracker: Tracker,
        reader: R,
        out: &mut W,
        format: OutputFormat,
        fps: f64,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let default_size = tracker.default_frame_size();
        let interval = Duration::from_secs_f64(1.0 / fps);

        let slot = FrameSlot::new();
        let (tx, rx) = mpsc::channel();
        let worker = spawn_worker(tracker, slot.clone(), tx);

        let fed = for_each_frame(reader, default_size, &mut summary, |input| {
            let frame_start = Instant::now();
            if slot.push(input) {
                debug!("Worker busy, replaced pending frame");
            }
            for output in rx.try_iter() {
                write_output(out, &output, format)?;
            }
            if let Some(remaining) = interval.checked_sub(frame_start.elapsed()) {
                thread::sleep(remaining);
            }
            Ok(())
        });

        slot.close();
        let tracker = worker
            .join()
            .map_err(|_| Error::Worker("tracking worker panicked".to_string()))?;
        fed?;

        for output in rx {
            write_output(out, &output, format)?;
        }

        summary.processed = tracker.frames_processed();
        summary.dropped = slot.dropped();
        Ok(summary)
    }
}

/// Parse each line and hand valid frames to `handle`; malformed lines are skipped
fn for_each_frame<R, F>(reader: R, default_size: FrameSize, summary: &mut RunSummary, mut handle: F) -> Result<()>
where
    R: BufRead,
    F: FnMut(FrameInput) -> Result<()>,
{
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        summary.lines += 1;

        let line_number = index + 1;
        match RecordedFrame::parse(&line, line_number).and_then(|f| f.into_input(default_size, line_number)) {
            Ok(input) => handle(input)?,
            Err(e) => {
                warn!("Skipping frame: {e}");
                summary.skipped += 1;
            }
        }
    }
    Ok(())
}

/// Render one output as a text line
#[must_use]
pub fn format_output(output: &TrackingOutput) -> String {
    let pose = output.head_pose;
    let mut line = format!(
        "#{:<5} pitch {:>7.2} yaw {:>7.2} roll {:>7.2}",
        output.sequence, pose.pitch, pose.yaw, pose.roll
    );

    match output.distance_cm {
        Some(d) => line.push_str(&format!(" | dist {d:>6.1} cm")),
        None => line.push_str(" | dist    --"),
    }

    match output.gaze {
        Some(g) => line.push_str(&format!(
            " | gaze {:>+7.2} (L {:+.2} R {:+.2})",
            g.average_delta, g.left_delta, g.right_delta
        )),
        None => line.push_str(" | gaze      --"),
    }

    if let Some(r) = output.stability_radius {
        line.push_str(&format!(" | radius {r:.1}"));
    }

    if !output.issues.is_empty() {
        let held: Vec<String> = output.issues.iter().map(|i| format!("{:?}", i.stage)).collect();
        line.push_str(&format!(" | held: {}", held.join(", ")));
    }

    line
}

fn write_output<W: Write>(out: &mut W, output: &TrackingOutput, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{}", format_output(output))?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, output).map_err(io::Error::from)?;
            writeln!(out)?;
        }
    }
    Ok(())
}

fn write_summary<W: Write>(out: &mut W, summary: &RunSummary, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(
            out,
            "Processed {} frames ({} dropped, {} skipped)",
            summary.processed, summary.dropped, summary.skipped
        )?,
        OutputFormat::Json => {
            serde_json::to_writer(&mut *out, &serde_json::json!({ "summary": summary })).map_err(io::Error::from)?;
            writeln!(out)?;
        }
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::TrackerSettings;
    use std::io::Cursor;

    fn recorded_line() -> String {
        let frame = RecordedFrame {
            frame_width: Some(640),
            frame_height: None,
            face: vec![Landmark::new(0.5, 0.5, 0.0); 478],
            pose: None,
        };
        serde_json::to_string(&frame).unwrap()
    }

    fn app(fps: Option<f64>, output_format: OutputFormat) -> TrackerApp {
        let config = AppConfig {
            input: InputSource::Stdin,
            fps,
            output_format,
            calibrate_cm: None,
        };
        TrackerApp::new(config, Tracker::new(TrackerSettings::default()).unwrap()).unwrap()
    }

    #[test]
    fn test_input_source_from_arg() {
        assert_eq!(InputSource::from_arg("-"), InputSource::Stdin);
        assert_eq!(
            InputSource::from_arg("run.jsonl"),
            InputSource::File(PathBuf::from("run.jsonl"))
        );
    }

    #[test]
    fn test_parse_reports_line_number() {
        let err = RecordedFrame::parse("{not json", 7).unwrap_err();
        assert!(matches!(err, Error::Recording { line: 7, .. }));
    }

    #[test]
    fn test_into_input_fills_frame_size() {
        let frame = RecordedFrame::parse(&recorded_line(), 1).unwrap();
        let input = frame.into_input(FrameSize::new(320, 240), 1).unwrap();
        assert_eq!(input.frame_size, FrameSize::new(640, 240));
        assert!(input.pose.is_none());
        assert_eq!(input.face.len(), 478);
    }

    #[test]
    fn test_sequential_replay_skips_bad_lines() {
        let line = recorded_line();
        let text = format!("{line}\n\n garbage\n{line}\n");
        let mut out = Vec::new();
        let summary = app(None, OutputFormat::Text)
            .run_with(Cursor::new(text), &mut out)
            .unwrap();

        assert_eq!(summary.lines, 3);
        assert_eq!(summary.processed, 2);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.dropped, 0);

        let printed = String::from_utf8(out).unwrap();
        assert!(printed.starts_with("#1"));
        assert!(printed.contains("Processed 2 frames"));
    }

    #[test]
    fn test_paced_replay_accounts_for_every_frame() {
        let line = recorded_line();
        let text = format!("{line}\n").repeat(20);
        let mut out = Vec::new();
        let summary = app(Some(1000.0), OutputFormat::Json)
            .run_with(Cursor::new(text), &mut out)
            .unwrap();

        assert_eq!(summary.lines, 20);
        assert_eq!(summary.processed + summary.dropped, 20);

        let printed = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = printed.lines().collect();
        assert_eq!(lines.len() as u64, summary.processed + 1);
        let last: serde_json::Value = serde_json::from_str(lines[lines.len() - 1]).unwrap();
        assert_eq!(last["summary"]["processed"], summary.processed);
    }

    #[test]
    fn test_invalid_fps_rejected() {
        let config = AppConfig {
            input: InputSource::Stdin,
            fps: Some(0.0),
            output_format: OutputFormat::Text,
            calibrate_cm: None,
        };
        let tracker = Tracker::new(TrackerSettings::default()).unwrap();
        assert!(TrackerApp::new(config, tracker).is_err());
    }
}
