//! The session controller.
//!
//! `Session` owns the [`CalibrationSet`] and the message sink.  It processes
//! one frame at a time and applies [`Command`]s between frames; nothing else
//! touches the calibration, so a capture can never observe a half-finished
//! frame pass.

use std::path::PathBuf;

use tracing::{debug, info, warn};

use hand_curl::{
    curl_metrics, read_metrics, BoundKind, CalibrationSet, CurlError, HandLandmarks, RawMetrics,
    Reading,
};

use crate::command::Command;
use crate::detector::DetectedHand;
use crate::transport::MessageSink;

// ════════════════════════════════════════════════════════════════════════════
// SessionConfig
// ════════════════════════════════════════════════════════════════════════════

/// Which detected hands produce messages.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum HandPolicy {
    /// One message per valid hand.
    All,
    /// Only the first valid hand drives the actuator.
    Primary,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub calibration_path: PathBuf,
    pub hand_policy:      HandPolicy,
    /// Hands scored below this are treated as not detected.
    pub min_confidence:   f32,
    /// Frames discarded at start while the camera settles.
    pub warmup_frames:    usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            calibration_path: PathBuf::from("calibration.json"),
            hand_policy:      HandPolicy::All,
            min_confidence:   0.5,
            warmup_frames:    10,
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Outcomes / stats
// ════════════════════════════════════════════════════════════════════════════

/// One hand's output for one frame.
#[derive(Clone, Debug, PartialEq)]
pub struct HandOutput {
    /// `Left` / `Right`, or `Hand <n>` when the detector gave no label.
    pub label:   String,
    pub reading: Reading,
}

/// Result of a capture command.
#[derive(Clone, Debug, PartialEq)]
pub enum CaptureOutcome {
    Recorded { bound: BoundKind, raw: RawMetrics },
    /// No hand in the latest frame; calibration untouched.
    NoHand,
}

/// What a command did, so any control surface can report it.
#[derive(Clone, Debug, PartialEq)]
pub enum CommandOutcome {
    Captured(CaptureOutcome),
    Saved,
    /// Save failed; the session keeps running with the calibration in memory.
    SaveFailed(String),
    Reset,
    Quit,
}

impl CommandOutcome {
    /// True when the run loop should stop.
    pub fn is_quit(&self) -> bool {
        matches!(self, CommandOutcome::Quit)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames:           usize,
    pub warmup_frames:    usize,
    /// Frames with no usable hand.
    pub empty_frames:     usize,
    /// Hands dropped for malformed landmarks.
    pub rejected_hands:   usize,
    pub messages:         usize,
    pub send_failures:    usize,
}

// ════════════════════════════════════════════════════════════════════════════
// Session
// ════════════════════════════════════════════════════════════════════════════

pub struct Session<S> {
    config:      SessionConfig,
    calibration: CalibrationSet,
    sink:        S,
    /// Metrics of the first valid hand in the most recent frame, for
    /// capture commands.
    latest:      Option<RawMetrics>,
    warmup_left: usize,
    stats:       SessionStats,
}

impl<S: MessageSink> Session<S> {
    pub fn new(config: SessionConfig, calibration: CalibrationSet, sink: S) -> Self {
        let warmup_left = config.warmup_frames;
        Session {
            config,
            calibration,
            sink,
            latest: None,
            warmup_left,
            stats: SessionStats::default(),
        }
    }

    /// Load the calibration file named in `config` (empty if absent or bad).
    pub fn load(config: SessionConfig, sink: S) -> Self {
        let calibration = CalibrationSet::load_file(&config.calibration_path);
        Self::new(config, calibration, sink)
    }

    // ── per frame ─────────────────────────────────────────────────────────

    /// Process one frame: every usable hand is measured, normalised and
    /// emitted (subject to [`HandPolicy`]).  A frame with no hands emits
    /// nothing.  Malformed hands are logged and skipped.
    pub fn process_frame(&mut self, hands: &[DetectedHand]) -> Vec<HandOutput> {
        self.stats.frames += 1;
        if self.warmup_left > 0 {
            self.warmup_left -= 1;
            self.stats.warmup_frames += 1;
            return Vec::new();
        }

        let valid = self.validate(hands);
        self.latest = valid.first().map(|&(_, raw)| raw);
        if valid.is_empty() {
            self.stats.empty_frames += 1;
            return Vec::new();
        }

        let take = match self.config.hand_policy {
            HandPolicy::All     => valid.len(),
            HandPolicy::Primary => 1,
        };

        let mut outputs = Vec::with_capacity(take);
        for (label, raw) in valid.into_iter().take(take) {
            let reading = read_metrics(raw, &self.calibration);
            debug!("{} curls (0=open,1=closed): {}", label, reading.normalized.summary());
            match self.sink.emit(reading.message) {
                Ok(())  => self.stats.messages += 1,
                Err(e)  => {
                    self.stats.send_failures += 1;
                    warn!("message not sent: {}", e);
                }
            }
            outputs.push(HandOutput { label, reading });
        }
        outputs
    }

    /// Confidence-gate, validate and measure each detected hand, keeping
    /// labels.
    fn validate(&mut self, hands: &[DetectedHand]) -> Vec<(String, RawMetrics)> {
        let mut valid = Vec::new();
        for (i, hand) in hands.iter().enumerate() {
            if hand.score.is_some_and(|s| s < self.config.min_confidence) {
                continue;
            }
            match HandLandmarks::from_points(&hand.points).and_then(|lm| curl_metrics(&lm)) {
                Ok(raw) => {
                    let label = hand
                        .handedness
                        .map(|h| h.as_str().to_string())
                        .unwrap_or_else(|| format!("Hand {}", i));
                    valid.push((label, raw));
                }
                Err(e) => {
                    self.stats.rejected_hands += 1;
                    warn!("hand {} skipped: {}", i, e);
                }
            }
        }
        valid
    }

    // ── calibration lifecycle ─────────────────────────────────────────────

    /// Record the latest frame's first hand as the open (`Min`) or closed
    /// (`Max`) pose for every channel.
    pub fn capture(&mut self, bound: BoundKind) -> CaptureOutcome {
        let Some(raw) = self.latest else {
            warn!("capture {}: no hand in frame, nothing recorded", bound.pose());
            return CaptureOutcome::NoHand;
        };
        self.calibration.record_all(bound, &raw);
        info!("{} hand recorded: {}", bound.pose(), raw.summary());
        info!("calibration: {}", self.calibration.summary());
        CaptureOutcome::Recorded { bound, raw }
    }

    /// Persist the calibration to the configured path.
    pub fn save(&self) -> Result<(), CurlError> {
        self.calibration.save_file(&self.config.calibration_path)
    }

    /// Forget all bounds.
    pub fn recalibrate(&mut self) {
        self.calibration.reset();
        info!("calibration reset; capture open and closed poses again");
    }

    /// Apply one user command.
    pub fn handle_command(&mut self, command: Command) -> CommandOutcome {
        match command {
            Command::CaptureOpen   => CommandOutcome::Captured(self.capture(BoundKind::Min)),
            Command::CaptureClosed => CommandOutcome::Captured(self.capture(BoundKind::Max)),
            Command::Save          => match self.save() {
                Ok(())  => CommandOutcome::Saved,
                Err(e)  => {
                    warn!("save failed: {}", e);
                    CommandOutcome::SaveFailed(e.to_string())
                }
            },
            Command::Recalibrate   => {
                self.recalibrate();
                CommandOutcome::Reset
            }
            Command::Quit          => CommandOutcome::Quit,
        }
    }

    // ── accessors ─────────────────────────────────────────────────────────

    pub fn calibration(&self) -> &CalibrationSet { &self.calibration }
    pub fn stats(&self)       -> SessionStats    { self.stats }
    pub fn sink(&self)        -> &S              { &self.sink }
    pub fn into_sink(self)    -> S               { self.sink }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
