//! Outbound message transport.
//!
//! Messages are handed to a writer thread over a short bounded queue, so
//! the frame loop never blocks on a slow serial line.  When the line falls
//! behind, new messages are dropped instead of queued, which keeps the hand
//! within a few frames of live input.  Drops and write failures are logged
//! and counted; they never stop the session.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use hand_curl::OutboundMessage;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport writer has shut down")]
    Closed,

    #[error("cannot open serial device {path:?}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

// ════════════════════════════════════════════════════════════════════════════
// LineOut: abstraction over serial / stdout / null
// ════════════════════════════════════════════════════════════════════════════

/// A byte sink that accepts one complete message line at a time.
pub trait LineOut: Send {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()>;
    fn describe(&self) -> String;
}

// ── serial device ─────────────────────────────────────────────────────────

/// A serial device node opened for writing.  Line settings (baud rate,
/// framing) are whatever the device is configured with, e.g. via `stty`.
pub struct SerialOut {
    file: File,
    path: PathBuf,
}

impl SerialOut {
    pub fn open(path: &Path) -> Result<Self, TransportError> {
        let file = OpenOptions::new()
            .write(true)
            .open(path)
            .map_err(|source| TransportError::Open { path: path.to_path_buf(), source })?;
        Ok(SerialOut { file, path: path.to_path_buf() })
    }
}

impl LineOut for SerialOut {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        self.file.write_all(line)?;
        self.file.flush()
    }
    fn describe(&self) -> String {
        format!("serial {}", self.path.display())
    }
}

// ── stdout ────────────────────────────────────────────────────────────────

pub struct StdoutOut;

impl LineOut for StdoutOut {
    fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(line)?;
        out.flush()
    }
    fn describe(&self) -> String {
        "stdout".to_string()
    }
}

// ── null (dry run) ────────────────────────────────────────────────────────

pub struct NullOut;

impl LineOut for NullOut {
    fn write_line(&mut self, _line: &[u8]) -> io::Result<()> { Ok(()) }
    fn describe(&self) -> String { "null".to_string() }
}

// ════════════════════════════════════════════════════════════════════════════
// MessageSink: what the session emits into
// ════════════════════════════════════════════════════════════════════════════

/// Destination for outbound messages.  `emit` must not block on the wire.
pub trait MessageSink {
    fn emit(&mut self, message: OutboundMessage) -> Result<(), TransportError>;
}

/// In-memory sink, handy for tests and offline tools.
impl MessageSink for Vec<OutboundMessage> {
    fn emit(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        self.push(message);
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// TransportWriter: the writer thread
// ════════════════════════════════════════════════════════════════════════════

/// Messages allowed to wait for the wire.
pub const QUEUE_DEPTH: usize = 4;

/// Totals reported when the writer shuts down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TransportStats {
    pub written:  usize,
    /// Write errors reported by the line.
    pub failures: usize,
    /// Messages discarded because the queue was full.
    pub dropped:  usize,
}

/// Handle to the transport writer thread.
pub struct TransportWriter {
    tx:       Option<SyncSender<OutboundMessage>>,
    written:  Arc<AtomicUsize>,
    failures: Arc<AtomicUsize>,
    dropped:  AtomicUsize,
    handle:   Option<JoinHandle<()>>,
}

impl TransportWriter {
    /// Spawn the writer thread; it owns `out` until [`TransportWriter::close`].
    pub fn spawn(mut out: Box<dyn LineOut>) -> Self {
        let (tx, rx) = mpsc::sync_channel::<OutboundMessage>(QUEUE_DEPTH);
        let written  = Arc::new(AtomicUsize::new(0));
        let failures = Arc::new(AtomicUsize::new(0));
        let (w, f) = (Arc::clone(&written), Arc::clone(&failures));

        info!("transport: {}", out.describe());
        let handle = thread::spawn(move || {
            for message in rx {
                match out.write_line(&message.to_bytes()) {
                    Ok(())  => { w.fetch_add(1, Ordering::Relaxed); }
                    Err(e)  => {
                        let n = f.fetch_add(1, Ordering::Relaxed) + 1;
                        warn!("transport write failed ({} so far): {}", n, e);
                    }
                }
            }
            debug!("transport writer drained");
        });

        TransportWriter {
            tx: Some(tx),
            written,
            failures,
            dropped: AtomicUsize::new(0),
            handle: Some(handle),
        }
    }

    pub fn stats(&self) -> TransportStats {
        TransportStats {
            written:  self.written.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            dropped:  self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Stop accepting messages, let the thread drain, and report totals.
    pub fn close(mut self) -> TransportStats {
        self.shutdown();
        self.stats()
    }

    fn shutdown(&mut self) {
        self.tx.take();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl MessageSink for TransportWriter {
    /// Queue a message without waiting.  A full queue drops the message and
    /// counts it; only a dead writer is an error.
    fn emit(&mut self, message: OutboundMessage) -> Result<(), TransportError> {
        let Some(tx) = &self.tx else {
            return Err(TransportError::Closed);
        };
        match tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                let n = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("transport busy, message dropped ({} so far)", n);
                Ok(())
            }
            Err(TrySendError::Disconnected(_)) => Err(TransportError::Closed),
        }
    }
}

impl Drop for TransportWriter {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use hand_curl::NormalizedValues;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Records lines into shared memory; fails every call when `broken`.
    struct Capture {
        lines:  Arc<Mutex<Vec<String>>>,
        broken: bool,
    }

    impl LineOut for Capture {
        fn write_line(&mut self, line: &[u8]) -> io::Result<()> {
            if self.broken {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "unplugged"));
            }
            self.lines.lock().unwrap().push(String::from_utf8_lossy(line).into_owned());
            Ok(())
        }
        fn describe(&self) -> String { "capture".into() }
    }

    fn msg(v: f32) -> OutboundMessage {
        OutboundMessage::from_normalized(&NormalizedValues::splat(v))
    }

    #[test]
    fn writer_delivers_lines_in_order() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut w = TransportWriter::spawn(Box::new(Capture { lines: lines.clone(), broken: false }));
        w.emit(msg(0.0)).unwrap();
        w.emit(msg(1.0)).unwrap();
        let stats = w.close();
        assert_eq!(stats, TransportStats { written: 2, failures: 0, dropped: 0 });
        assert_eq!(
            *lines.lock().unwrap(),
            vec!["0,0,0,0,0,0\n".to_string(), "255,255,255,255,255,255\n".to_string()]
        );
    }

    #[test]
    fn write_failures_counted_not_fatal() {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let mut w = TransportWriter::spawn(Box::new(Capture { lines, broken: true }));
        assert!(w.emit(msg(0.5)).is_ok());
        assert!(w.emit(msg(0.5)).is_ok());
        assert_eq!(w.close(), TransportStats { written: 0, failures: 2, dropped: 0 });
    }

    /// Takes `delay` per line, like a serial port at low baud.
    struct SlowLine {
        delay:   Duration,
        written: Arc<AtomicUsize>,
    }

    impl LineOut for SlowLine {
        fn write_line(&mut self, _line: &[u8]) -> io::Result<()> {
            thread::sleep(self.delay);
            self.written.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
        fn describe(&self) -> String { "slow".into() }
    }

    #[test]
    fn slow_line_drops_instead_of_queueing() {
        let written = Arc::new(AtomicUsize::new(0));
        let mut w = TransportWriter::spawn(Box::new(SlowLine {
            delay:   Duration::from_millis(25),
            written: written.clone(),
        }));
        for _ in 0..40 {
            assert!(w.emit(msg(0.5)).is_ok());
        }
        let stats = w.close();
        assert_eq!(stats.written + stats.dropped, 40);
        assert!(stats.dropped > 0);
        // roughly one line on the wire plus a full queue, not the whole burst
        assert!(stats.written < 20, "backlog of {}", stats.written);
        assert_eq!(written.load(Ordering::Relaxed), stats.written);
    }

    #[test]
    fn emit_after_writer_gone_is_closed() {
        let mut w = TransportWriter::spawn(Box::new(NullOut));
        w.shutdown();
        assert!(matches!(w.emit(msg(0.0)), Err(TransportError::Closed)));
    }

    #[test]
    fn serial_open_missing_device_fails() {
        let path = std::env::temp_dir().join("curl_serial_no_such_dir").join("ttyUSB9");
        assert!(matches!(SerialOut::open(&path), Err(TransportError::Open { .. })));
    }

    #[test]
    fn serial_out_writes_to_device_file() {
        let path = std::env::temp_dir().join(format!("curl_serial_tty_{}", std::process::id()));
        std::fs::write(&path, b"").unwrap();
        let mut out = SerialOut::open(&path).unwrap();
        out.write_line(&msg(1.0).to_bytes()).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "255,255,255,255,255,255\n");
        let _ = std::fs::remove_file(&path);
    }
}
