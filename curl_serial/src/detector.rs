//! Landmark frames: from a detector subprocess, a replay file, or (with
//! the `leap` feature) a LeapMotion controller.
//!
//! The public interface is [`FrameEvent`] delivered over a `mpsc` channel.
//! The session never learns where frames came from.
//!
//! ## JSON-lines frame format
//!
//! One object per line, one line per camera frame (MediaPipe hand
//! landmarker layout):
//!
//! ```json
//! {"hands":[{"handedness":"Left","score":0.93,"landmarks":[{"x":0.41,"y":0.72,"z":0.0}, ...]}]}
//! ```
//!
//! `handedness`, `score` and `error` are optional.  A frame carrying an
//! `error` is treated as a frame with no hands.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use anyhow::{bail, Context};
use serde::Deserialize;
use tracing::{debug, info, warn};

use hand_curl::{Handedness, Landmark};

// ════════════════════════════════════════════════════════════════════════════
// DetectedHand / FrameEvent
// ════════════════════════════════════════════════════════════════════════════

/// One hand as reported by the detector, not yet validated.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectedHand {
    pub points:     Vec<Landmark>,
    pub handedness: Option<Handedness>,
    /// Detector confidence, when reported.
    pub score:      Option<f32>,
}

impl DetectedHand {
    pub fn new(points: Vec<Landmark>) -> Self {
        DetectedHand { points, handedness: None, score: None }
    }
}

/// What a frame source delivers.
#[derive(Clone, Debug, PartialEq)]
pub enum FrameEvent {
    /// A processed camera frame: zero or more hands.
    Frame(Vec<DetectedHand>),
    /// The source is exhausted (end of replay, detector exited).
    End,
}

// ════════════════════════════════════════════════════════════════════════════
// FrameSource trait: unified interface for every detector
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`FrameEvent`]s over a channel.
pub trait FrameSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>);
}

/// Spawn a frame source on its own thread and return the receiving end.
pub fn spawn_frame_source<F: FrameSource>(source: F) -> Receiver<FrameEvent> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

// ════════════════════════════════════════════════════════════════════════════
// JSON frame parsing
// ════════════════════════════════════════════════════════════════════════════

#[derive(Deserialize, Debug)]
struct HandJson {
    #[serde(default)]
    handedness: Option<String>,
    #[serde(default)]
    score:      Option<f32>,
    landmarks:  Vec<Landmark>,
}

#[derive(Deserialize, Debug)]
struct FrameJson {
    #[serde(default)]
    hands: Vec<HandJson>,
    #[serde(default)]
    error: Option<String>,
}

/// Parse one detector line.  Blank lines yield `Ok(None)`.
pub fn parse_frame(line: &str) -> Result<Option<Vec<DetectedHand>>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let frame: FrameJson = serde_json::from_str(line)?;
    if let Some(error) = frame.error {
        warn!("detector error: {}", error);
        return Ok(Some(Vec::new()));
    }
    let hands = frame
        .hands
        .into_iter()
        .map(|h| DetectedHand {
            points:     h.landmarks,
            handedness: h.handedness.as_deref().and_then(Handedness::from_label),
            score:      h.score,
        })
        .collect();
    Ok(Some(hands))
}

// ════════════════════════════════════════════════════════════════════════════
// JsonLinesSource: any line-oriented reader
// ════════════════════════════════════════════════════════════════════════════

/// Frames read from JSON lines, optionally paced to a fixed interval.
pub struct JsonLinesSource<R> {
    reader: R,
    pace:   Option<Duration>,
    name:   String,
}

impl<R: BufRead + Send + 'static> JsonLinesSource<R> {
    pub fn new(reader: R, name: impl Into<String>) -> Self {
        JsonLinesSource { reader, pace: None, name: name.into() }
    }

    /// Sleep `interval` after each frame (replaying a recording in real time).
    pub fn paced(mut self, interval: Duration) -> Self {
        self.pace = Some(interval);
        self
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Replay a recorded session file.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let file = File::open(path)
            .with_context(|| format!("cannot open replay file {}", path.display()))?;
        Ok(JsonLinesSource::new(BufReader::new(file), path.display().to_string()))
    }
}

impl<R: BufRead + Send + 'static> FrameSource for JsonLinesSource<R> {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
        let JsonLinesSource { reader, pace, name } = *self;
        for (n, line) in reader.lines().enumerate() {
            let line = match line {
                Ok(l)  => l,
                Err(e) => {
                    warn!(source = %name, "read failed: {}", e);
                    break;
                }
            };
            let hands = match parse_frame(&line) {
                Ok(Some(h)) => h,
                Ok(None)    => continue,
                Err(e)      => {
                    warn!(source = %name, line = n + 1, "unparseable frame skipped: {}", e);
                    continue;
                }
            };
            if tx.send(FrameEvent::Frame(hands)).is_err() { return; }
            if let Some(p) = pace { thread::sleep(p); }
        }
        debug!(source = %name, "frame source exhausted");
        let _ = tx.send(FrameEvent::End);
    }
}

// ════════════════════════════════════════════════════════════════════════════
// DetectorProcess: external landmark detector on a pipe
// ════════════════════════════════════════════════════════════════════════════

/// A running detector subprocess.  The process is killed when this guard
/// drops.
pub struct DetectorProcess {
    child: Child,
}

impl DetectorProcess {
    /// Start `command` (program + args).  Its stdout must carry JSON-lines
    /// frames; its stderr is inherited.
    pub fn spawn(command: &[String]) -> anyhow::Result<(Self, JsonLinesSource<BufReader<ChildStdout>>)> {
        let Some((program, args)) = command.split_first() else {
            bail!("empty detector command");
        };
        info!("starting detector: {}", command.join(" "));
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start detector `{}`", program))?;
        let stdout = child.stdout.take().context("detector stdout unavailable")?;
        let source = JsonLinesSource::new(BufReader::new(stdout), program.clone());
        Ok((DetectorProcess { child }, source))
    }
}

impl Drop for DetectorProcess {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn hand_json(handedness: &str, score: f32) -> String {
        let pts: Vec<String> = (0..21)
            .map(|i| format!(r#"{{"x":{},"y":0.5,"z":0.0}}"#, i as f32 * 0.01))
            .collect();
        format!(
            r#"{{"handedness":"{}","score":{},"landmarks":[{}]}}"#,
            handedness, score, pts.join(",")
        )
    }

    #[test]
    fn parse_two_hands() {
        let line = format!(r#"{{"hands":[{},{}]}}"#, hand_json("Left", 0.9), hand_json("Right", 0.4));
        let hands = parse_frame(&line).unwrap().unwrap();
        assert_eq!(hands.len(), 2);
        assert_eq!(hands[0].points.len(), 21);
        assert_eq!(hands[0].handedness, Some(Handedness::Left));
        assert_eq!(hands[1].score, Some(0.4));
        assert!((hands[0].points[3].x - 0.03).abs() < 1e-6);
    }

    #[test]
    fn parse_empty_and_error_frames() {
        assert_eq!(parse_frame("   ").unwrap(), None);
        assert_eq!(parse_frame(r#"{"hands":[]}"#).unwrap(), Some(vec![]));
        assert_eq!(parse_frame(r#"{"error":"camera busy"}"#).unwrap(), Some(vec![]));
    }

    #[test]
    fn parse_keeps_short_hands_for_validation_later() {
        let line = r#"{"hands":[{"landmarks":[{"x":0,"y":0,"z":0}]}]}"#;
        let hands = parse_frame(line).unwrap().unwrap();
        assert_eq!(hands[0].points.len(), 1);
        assert_eq!(hands[0].handedness, None);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!(parse_frame("{oops").is_err());
    }

    #[test]
    fn json_lines_source_skips_bad_lines_and_ends() {
        let first = format!(r#"{{"hands":[{}]}}"#, hand_json("Left", 0.8));
        let text = format!("{}\nnot json\n\n{}\n", first, r#"{"hands":[]}"#);
        let rx = spawn_frame_source(JsonLinesSource::new(Cursor::new(text.into_bytes()), "test"));
        let events: Vec<FrameEvent> = rx.iter().collect();
        assert_eq!(events.len(), 3);
        assert!(matches!(&events[0], FrameEvent::Frame(h) if h.len() == 1));
        assert_eq!(events[1], FrameEvent::Frame(vec![]));
        assert_eq!(events[2], FrameEvent::End);
    }

    #[test]
    fn empty_detector_command_rejected() {
        assert!(DetectorProcess::spawn(&[]).is_err());
    }
}
