//! The run loop.
//!
//! Frames and commands each arrive on their own channel.  Every iteration
//! first drains pending commands, then processes at most one frame, so a
//! capture always sees a complete frame and never a half-updated
//! calibration.

use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;

use anyhow::Context;
use tracing::{debug, info};

use crate::command::{spawn_command_source, Command, LineCommands};
use crate::config::{BridgeConfig, OutputKind, SourceKind};
use crate::detector::{spawn_frame_source, DetectorProcess, FrameEvent, JsonLinesSource};
use crate::session::{Session, SessionStats};
use crate::transport::{LineOut, MessageSink, NullOut, SerialOut, StdoutOut, TransportWriter};

/// How long the loop waits for a frame before re-checking commands.
const COMMAND_POLL: Duration = Duration::from_millis(20);

/// Why [`drive`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Quit,
    SourceEnded,
}

/// Run until the user quits or the landmark source ends.
pub fn drive<S: MessageSink>(
    session:  &mut Session<S>,
    frames:   &Receiver<FrameEvent>,
    commands: &Receiver<Command>,
) -> StopReason {
    loop {
        // 1. Apply pending commands
        loop {
            match commands.try_recv() {
                Ok(cmd) => {
                    let outcome = session.handle_command(cmd);
                    debug!(?cmd, ?outcome, "command applied");
                    if outcome.is_quit() {
                        return StopReason::Quit;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        // 2. One frame
        match frames.recv_timeout(COMMAND_POLL) {
            Ok(FrameEvent::Frame(hands)) => {
                session.process_frame(&hands);
            }
            Ok(FrameEvent::End) | Err(RecvTimeoutError::Disconnected) => {
                return StopReason::SourceEnded;
            }
            Err(RecvTimeoutError::Timeout) => {}
        }
    }
}

fn open_output(output: &OutputKind) -> anyhow::Result<Box<dyn LineOut>> {
    let out: Box<dyn LineOut> = match output {
        OutputKind::Serial(path) => Box::new(SerialOut::open(path)?),
        OutputKind::Stdout => Box::new(StdoutOut),
        OutputKind::Null => Box::new(NullOut),
    };
    Ok(out)
}

/// Start the configured frame source.  The returned guard (if any) keeps
/// the detector process alive.
fn open_source(cfg: &BridgeConfig) -> anyhow::Result<(Receiver<FrameEvent>, Option<DetectorProcess>)> {
    Ok(match &cfg.source {
        SourceKind::Replay(path) => {
            let source = JsonLinesSource::open(path)?.paced(cfg.frame_interval);
            (spawn_frame_source(source), None)
        }
        SourceKind::Detector(argv) => {
            let (process, source) = DetectorProcess::spawn(argv)?;
            (spawn_frame_source(source), Some(process))
        }
        #[cfg(feature = "leap")]
        SourceKind::Leap => (spawn_frame_source(crate::leap::LeapFrameSource), None),
    })
}

/// Run the full bridge.
///
/// This is the entry point called from `main.rs`.  It opens the transport
/// and the landmark source, loads the calibration, and drives the loop
/// with commands read from stdin.
pub fn run(cfg: BridgeConfig) -> anyhow::Result<SessionStats> {
    let out = open_output(&cfg.output).context("opening output")?;
    let writer = TransportWriter::spawn(out);

    let (frames, _detector) = open_source(&cfg).context("starting landmark source")?;
    let commands = spawn_command_source(LineCommands::stdin());

    let mut session = Session::load(cfg.session.clone(), writer);
    info!("commands: {}", Command::HELP);

    let reason = drive(&mut session, &frames, &commands);
    let stats = session.stats();
    let transport = session.into_sink().close();

    info!(
        ?reason,
        frames = stats.frames,
        empty = stats.empty_frames,
        rejected = stats.rejected_hands,
        sent = transport.written,
        failed = transport.failures,
        dropped = transport.dropped,
        "session finished"
    );
    Ok(stats)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::DetectedHand;
    use crate::session::SessionConfig;
    use hand_curl::{CalibrationSet, HandLandmark, Landmark, OutboundMessage, LANDMARK_COUNT};
    use std::sync::mpsc;

    fn hand() -> DetectedHand {
        let mut pts = vec![Landmark::default(); LANDMARK_COUNT];
        pts[HandLandmark::IndexMcp.index()] = Landmark::new(0.0, 0.5, 0.0);
        pts[HandLandmark::PinkyMcp.index()] = Landmark::new(0.5, 0.5, 0.0);
        DetectedHand::new(pts)
    }

    fn session() -> Session<Vec<OutboundMessage>> {
        let cfg = SessionConfig { warmup_frames: 0, ..SessionConfig::default() };
        Session::new(cfg, CalibrationSet::new(), Vec::new())
    }

    #[test]
    fn runs_until_source_ends() {
        let (ftx, frx) = mpsc::channel();
        let (_ctx, crx) = mpsc::channel::<Command>();
        ftx.send(FrameEvent::Frame(vec![hand()])).unwrap();
        ftx.send(FrameEvent::Frame(vec![])).unwrap();
        ftx.send(FrameEvent::Frame(vec![hand(), hand()])).unwrap();
        ftx.send(FrameEvent::End).unwrap();

        let mut s = session();
        assert_eq!(drive(&mut s, &frx, &crx), StopReason::SourceEnded);
        assert_eq!(s.stats().frames, 3);
        assert_eq!(s.sink().len(), 3);
        assert_eq!(s.sink()[0].to_string(), "0,0,0,0,0,0\n");
    }

    #[test]
    fn quit_stops_before_frames() {
        let (ftx, frx) = mpsc::channel();
        let (ctx, crx) = mpsc::channel();
        ftx.send(FrameEvent::Frame(vec![hand()])).unwrap();
        ctx.send(Command::Quit).unwrap();

        let mut s = session();
        assert_eq!(drive(&mut s, &frx, &crx), StopReason::Quit);
        assert_eq!(s.stats().frames, 0);
    }

    #[test]
    fn capture_with_no_prior_frame_leaves_calibration() {
        let (ftx, frx) = mpsc::channel();
        let (ctx, crx) = mpsc::channel();
        ctx.send(Command::CaptureClosed).unwrap();
        drop(ctx);
        ftx.send(FrameEvent::End).unwrap();

        let mut s = session();
        assert_eq!(drive(&mut s, &frx, &crx), StopReason::SourceEnded);
        assert!(s.calibration().is_empty());
    }

    #[test]
    fn dropped_source_ends_session() {
        let (ftx, frx) = mpsc::channel::<FrameEvent>();
        let (_ctx, crx) = mpsc::channel::<Command>();
        drop(ftx);
        let mut s = session();
        assert_eq!(drive(&mut s, &frx, &crx), StopReason::SourceEnded);
    }

    #[test]
    fn demo_recording_replays() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../demos/open_close.jsonl");
        let frx = spawn_frame_source(JsonLinesSource::open(&path).unwrap());
        let (_ctx, crx) = mpsc::channel::<Command>();

        let mut s = session();
        assert_eq!(drive(&mut s, &frx, &crx), StopReason::SourceEnded);
        assert_eq!(s.stats().frames, 22);
        assert_eq!(s.stats().empty_frames, 13);
        assert_eq!(s.sink().len(), 9);
        for msg in s.sink() {
            assert_eq!(msg.to_string().trim_end().split(',').count(), 6);
        }
    }

    #[test]
    fn replay_file_missing_is_startup_error() {
        let cfg = BridgeConfig {
            source: SourceKind::Replay("/nonexistent/curl_serial/frames.jsonl".into()),
            output: OutputKind::Null,
            ..BridgeConfig::default()
        };
        assert!(open_source(&cfg).is_err());
    }
}
