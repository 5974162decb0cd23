//! Per-channel open/closed calibration.
//!
//! Each channel walks its own little state machine:
//!
//! ```text
//! Uncalibrated ──record──▶ PartiallyCalibrated ──record──▶ Calibrated
//!       ▲                                                      │
//!       └──────────────────────── reset ───────────────────────┘
//! ```
//!
//! Once both bounds are present `min ≤ max` always holds: a closed-hand
//! sample that comes out numerically smaller than the open-hand sample is
//! swapped in place.
//!
//! The persisted form is pretty-printed JSON keyed by channel name:
//!
//! ```json
//! {
//!   "index": { "min": 0.8, "max": 2.1 },
//!   "thumb": { "min": 0.4 },
//!   ...
//! }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::channel::{Channel, ChannelValues, RawMetrics};
use crate::error::{CurlError, Result};

// ════════════════════════════════════════════════════════════════════════════
// BoundKind / CalibrationState
// ════════════════════════════════════════════════════════════════════════════

/// Which end of a range a sample fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundKind {
    /// Open hand.
    Min,
    /// Closed hand.
    Max,
}

impl BoundKind {
    pub fn pose(self) -> &'static str {
        match self {
            BoundKind::Min => "open",
            BoundKind::Max => "closed",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalibrationState {
    Uncalibrated,
    PartiallyCalibrated,
    Calibrated,
}

impl fmt::Display for CalibrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            CalibrationState::Uncalibrated => "uncalibrated",
            CalibrationState::PartiallyCalibrated => "partial",
            CalibrationState::Calibrated => "calibrated",
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CalibrationRange
// ════════════════════════════════════════════════════════════════════════════

/// Observed raw-metric bounds for one channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CalibrationRange {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    min: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max: Option<f32>,
}

impl CalibrationRange {
    /// A range with whichever bounds are given; inverted bounds are swapped.
    pub fn new(min: Option<f32>, max: Option<f32>) -> Self {
        let mut range = CalibrationRange { min, max };
        range.fix_order();
        range
    }

    pub fn min(&self) -> Option<f32> {
        self.min
    }

    pub fn max(&self) -> Option<f32> {
        self.max
    }

    /// Both bounds, when present.
    pub fn bounds(&self) -> Option<(f32, f32)> {
        self.min.zip(self.max)
    }

    pub fn state(&self) -> CalibrationState {
        match (self.min, self.max) {
            (None, None) => CalibrationState::Uncalibrated,
            (Some(_), Some(_)) => CalibrationState::Calibrated,
            _ => CalibrationState::PartiallyCalibrated,
        }
    }

    /// Set one bound, then restore `min ≤ max`.
    pub fn record(&mut self, bound: BoundKind, value: f32) {
        match bound {
            BoundKind::Min => self.min = Some(value),
            BoundKind::Max => self.max = Some(value),
        }
        if self.fix_order() {
            debug!(min = ?self.min, max = ?self.max, "inverted calibration swapped");
        }
    }

    fn fix_order(&mut self) -> bool {
        match (self.min, self.max) {
            (Some(lo), Some(hi)) if lo > hi => {
                self.min = Some(hi);
                self.max = Some(lo);
                true
            }
            _ => false,
        }
    }

    /// Drop bounds that cannot be a curl metric (negative or non-finite).
    fn sanitized(self) -> Self {
        let keep = |v: Option<f32>| v.filter(|x| x.is_finite() && *x >= 0.0);
        CalibrationRange::new(keep(self.min), keep(self.max))
    }
}

impl fmt::Display for CalibrationRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let show = |v: Option<f32>| v.map_or_else(|| "-".to_string(), |x| format!("{:.3}", x));
        write!(f, "[{}, {}]", show(self.min), show(self.max))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// CalibrationSet
// ════════════════════════════════════════════════════════════════════════════

/// Calibration ranges for all six channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationSet {
    ranges: ChannelValues<CalibrationRange>,
}

impl CalibrationSet {
    /// Every channel uncalibrated.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn range(&self, channel: Channel) -> &CalibrationRange {
        &self.ranges[channel]
    }

    pub fn record(&mut self, channel: Channel, bound: BoundKind, value: f32) {
        self.ranges[channel].record(bound, value);
    }

    /// Record one bound for every channel from a single hand's metrics.
    pub fn record_all(&mut self, bound: BoundKind, metrics: &RawMetrics) {
        for (channel, value) in metrics.iter() {
            self.record(channel, bound, value);
        }
    }

    /// Back to all-uncalibrated.
    pub fn reset(&mut self) {
        self.ranges = ChannelValues::default();
    }

    pub fn state(&self, channel: Channel) -> CalibrationState {
        self.ranges[channel].state()
    }

    /// True when no channel has any bound.
    pub fn is_empty(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| self.state(c) == CalibrationState::Uncalibrated)
    }

    /// True when every channel has both bounds.
    pub fn is_complete(&self) -> bool {
        Channel::ALL
            .iter()
            .all(|&c| self.state(c) == CalibrationState::Calibrated)
    }

    /// One-line per-channel overview for logs, e.g.
    /// `T=[0.400, 1.200] calibrated I=[0.300, -] partial ...`.
    pub fn summary(&self) -> String {
        self.ranges
            .iter()
            .map(|(c, r)| format!("{}={} {}", c.tag(), r, r.state()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    // ── persistence ───────────────────────────────────────────────────────

    /// Serialise every channel as pretty JSON, keys sorted by name.
    pub fn persist(&self) -> Result<String> {
        let file: BTreeMap<&'static str, CalibrationRange> = self
            .ranges
            .iter()
            .map(|(c, r)| (c.name(), r))
            .collect();
        let mut text = serde_json::to_string_pretty(&file)?;
        text.push('\n');
        Ok(text)
    }

    /// Parse persisted JSON strictly.  Unknown channel keys are ignored with
    /// a warning; bad bounds are dropped.
    pub fn parse(text: &str) -> Result<Self> {
        let file: BTreeMap<String, CalibrationRange> = serde_json::from_str(text)?;
        let mut set = CalibrationSet::new();
        for (key, range) in file {
            match key.parse::<Channel>() {
                Ok(channel) => set.ranges[channel] = range.sanitized(),
                Err(_) => warn!(key = %key, "ignoring unknown calibration channel"),
            }
        }
        Ok(set)
    }

    /// Lenient load: an absent or malformed source yields an empty set.
    pub fn load(source: Option<&str>) -> Self {
        let Some(text) = source else {
            return CalibrationSet::new();
        };
        match Self::parse(text) {
            Ok(set) => set,
            Err(e) => {
                warn!("calibration unreadable ({}), starting uncalibrated", e);
                CalibrationSet::new()
            }
        }
    }

    /// [`CalibrationSet::load`] from a file.  A missing file is the normal
    /// first-run case and is not warned about.
    pub fn load_file(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => {
                let set = Self::load(Some(&text));
                info!(path = %path.display(), "calibration loaded: {}", set.summary());
                set
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no calibration file, starting uncalibrated");
                CalibrationSet::new()
            }
            Err(e) => {
                warn!(path = %path.display(), "cannot read calibration ({}), starting uncalibrated", e);
                CalibrationSet::new()
            }
        }
    }

    /// Write [`CalibrationSet::persist`] output to `path`, creating parent
    /// directories as needed.
    pub fn save_file(&self, path: &Path) -> Result<()> {
        let text = self.persist()?;
        let persistence = |source: io::Error| CurlError::Persistence { path: path.to_path_buf(), source };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(persistence)?;
        }
        fs::write(path, text).map_err(persistence)?;
        info!(path = %path.display(), "calibration saved");
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
