//! Command line and the resolved bridge configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use clap::Parser;

use crate::session::{HandPolicy, SessionConfig};

// ════════════════════════════════════════════════════════════════════════════
// Cli
// ════════════════════════════════════════════════════════════════════════════

#[derive(Parser, Debug)]
#[command(
    name = "curl_serial",
    version,
    about = "Drive a robotic hand from camera hand landmarks over a serial line"
)]
pub struct Cli {
    /// Calibration file, loaded at start and written on save
    #[arg(long, default_value = "calibration.json")]
    pub calibration: PathBuf,

    /// Serial device to write channel levels to (default: stdout)
    #[arg(long, conflicts_with = "dry_run")]
    pub port: Option<PathBuf>,

    /// Compute everything but send nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Replay JSON-lines landmark frames from a file
    #[arg(long, conflicts_with = "detector")]
    pub replay: Option<PathBuf>,

    /// Detector command line emitting JSON-lines frames on stdout,
    /// e.g. "python3 hand_detect.py"
    #[arg(long)]
    pub detector: Option<String>,

    /// Use a LeapMotion controller
    #[cfg(feature = "leap")]
    #[arg(long, conflicts_with_all = ["replay", "detector"])]
    pub leap: bool,

    /// Which detected hands produce messages
    #[arg(long, value_enum, default_value_t = HandPolicy::All)]
    pub hands: HandPolicy,

    /// Ignore hands the detector scores below this
    #[arg(long, default_value_t = 0.5)]
    pub min_confidence: f32,

    /// Frames skipped at start while the camera settles
    #[arg(long, default_value_t = 10)]
    pub warmup_frames: usize,

    /// Replay pacing in milliseconds per frame
    #[arg(long, default_value_t = 33)]
    pub frame_interval_ms: u64,

    /// Debug logging (per-frame readings)
    #[arg(short, long)]
    pub verbose: bool,
}

// ════════════════════════════════════════════════════════════════════════════
// BridgeConfig
// ════════════════════════════════════════════════════════════════════════════

/// Where landmark frames come from.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceKind {
    Replay(PathBuf),
    /// Program and arguments.
    Detector(Vec<String>),
    #[cfg(feature = "leap")]
    Leap,
}

/// Where outbound messages go.
#[derive(Clone, Debug, PartialEq)]
pub enum OutputKind {
    Serial(PathBuf),
    Stdout,
    Null,
}

/// Configuration for the full bridge.
#[derive(Clone, Debug)]
pub struct BridgeConfig {
    pub session:        SessionConfig,
    pub source:         SourceKind,
    pub output:         OutputKind,
    pub frame_interval: Duration,
    pub verbose:        bool,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        BridgeConfig {
            session:        SessionConfig::default(),
            source:         SourceKind::Detector(vec!["python3".into(), "hand_detect.py".into()]),
            output:         OutputKind::Stdout,
            frame_interval: Duration::from_millis(33),
            verbose:        false,
        }
    }
}

impl BridgeConfig {
    /// `RUST_LOG` fallback for this configuration.
    pub fn log_filter(&self) -> &'static str {
        if self.verbose {
            "curl_serial=debug,hand_curl=debug"
        } else {
            "curl_serial=info,hand_curl=info"
        }
    }
}

impl Cli {
    /// Resolve flags into a [`BridgeConfig`].  Exactly one frame source must
    /// be named.
    pub fn into_config(self) -> anyhow::Result<BridgeConfig> {
        #[cfg(feature = "leap")]
        let leap = self.leap;
        #[cfg(not(feature = "leap"))]
        let leap = false;

        let source = match (self.replay, self.detector, leap) {
            (Some(path), None, false) => SourceKind::Replay(path),
            (None, Some(cmd), false) => {
                let argv: Vec<String> = cmd.split_whitespace().map(str::to_string).collect();
                if argv.is_empty() {
                    bail!("--detector needs a command");
                }
                SourceKind::Detector(argv)
            }
            #[cfg(feature = "leap")]
            (None, None, true) => SourceKind::Leap,
            (None, None, _) => bail!("no landmark source: pass --replay or --detector"),
            _ => bail!("choose exactly one landmark source"),
        };

        if !(0.0..=1.0).contains(&self.min_confidence) {
            bail!("--min-confidence must be within 0..1");
        }

        let output = match (self.port, self.dry_run) {
            (Some(port), _) => OutputKind::Serial(port),
            (None, true) => OutputKind::Null,
            (None, false) => OutputKind::Stdout,
        };

        Ok(BridgeConfig {
            session: SessionConfig {
                calibration_path: self.calibration,
                hand_policy:      self.hands,
                min_confidence:   self.min_confidence,
                warmup_frames:    self.warmup_frames,
            },
            source,
            output,
            frame_interval: Duration::from_millis(self.frame_interval_ms),
            verbose: self.verbose,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<BridgeConfig> {
        let cli = Cli::try_parse_from(std::iter::once("curl_serial").chain(args.iter().copied()))?;
        cli.into_config()
    }

    #[test]
    fn replay_to_stdout_defaults() {
        let cfg = parse(&["--replay", "frames.jsonl"]).unwrap();
        assert_eq!(cfg.source, SourceKind::Replay("frames.jsonl".into()));
        assert_eq!(cfg.output, OutputKind::Stdout);
        assert_eq!(cfg.session.calibration_path, PathBuf::from("calibration.json"));
        assert_eq!(cfg.session.hand_policy, HandPolicy::All);
        assert_eq!(cfg.session.warmup_frames, 10);
        assert_eq!(cfg.frame_interval, Duration::from_millis(33));
    }

    #[test]
    fn detector_command_split() {
        let cfg = parse(&["--detector", "python3 hand_detect.py --max-hands 2", "--port", "/dev/ttyUSB0"])
            .unwrap();
        assert_eq!(
            cfg.source,
            SourceKind::Detector(vec![
                "python3".into(),
                "hand_detect.py".into(),
                "--max-hands".into(),
                "2".into()
            ])
        );
        assert_eq!(cfg.output, OutputKind::Serial("/dev/ttyUSB0".into()));
    }

    #[test]
    fn primary_policy_and_dry_run() {
        let cfg = parse(&["--replay", "f", "--hands", "primary", "--dry-run", "-v"]).unwrap();
        assert_eq!(cfg.session.hand_policy, HandPolicy::Primary);
        assert_eq!(cfg.output, OutputKind::Null);
        assert_eq!(cfg.log_filter(), "curl_serial=debug,hand_curl=debug");
    }

    #[test]
    fn source_required() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["--detector", "   "]).is_err());
    }

    #[test]
    fn conflicting_sources_rejected() {
        assert!(parse(&["--replay", "f", "--detector", "x"]).is_err());
    }

    #[test]
    fn confidence_bounds() {
        assert!(parse(&["--replay", "f", "--min-confidence", "1.5"]).is_err());
    }
}
