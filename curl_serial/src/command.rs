//! User commands: typed on stdin, or injected by any other control surface.
//!
//! Like frames, commands arrive over a `mpsc` channel, so the run loop only
//! ever sees [`Command`] values and can apply them between frames.

use std::io::{self, BufRead};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use tracing::warn;

/// A calibration-lifecycle or control command.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    /// Record the current hand as fully open (range minimum).
    CaptureOpen,
    /// Record the current hand as fully closed (range maximum).
    CaptureClosed,
    /// Write the calibration file.
    Save,
    /// Forget every calibration bound.
    Recalibrate,
    Quit,
}

impl Command {
    /// Parse a typed command: a single key or its long name.
    pub fn parse(input: &str) -> Option<Command> {
        match input.trim().to_ascii_lowercase().as_str() {
            "o" | "open"                    => Some(Command::CaptureOpen),
            "c" | "closed" | "close"        => Some(Command::CaptureClosed),
            "s" | "save"                    => Some(Command::Save),
            "r" | "recalibrate" | "reset"   => Some(Command::Recalibrate),
            "q" | "quit" | "exit"           => Some(Command::Quit),
            _                               => None,
        }
    }

    /// Key reminder printed at startup.
    pub const HELP: &'static str =
        "o=capture open  c=capture closed  s=save  r=recalibrate  q=quit";
}

// ════════════════════════════════════════════════════════════════════════════
// CommandSource trait
// ════════════════════════════════════════════════════════════════════════════

/// Anything that can deliver [`Command`]s over a channel.
pub trait CommandSource: Send + 'static {
    fn run(self: Box<Self>, tx: Sender<Command>);
}

/// Spawn a command source on its own thread and return the receiving end.
pub fn spawn_command_source<C: CommandSource>(source: C) -> Receiver<Command> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || Box::new(source).run(tx));
    rx
}

/// Line-oriented commands from any reader (stdin in the binary).
pub struct LineCommands<R> {
    reader: R,
}

impl LineCommands<io::BufReader<io::Stdin>> {
    pub fn stdin() -> Self {
        LineCommands { reader: io::BufReader::new(io::stdin()) }
    }
}

impl<R: BufRead + Send + 'static> LineCommands<R> {
    pub fn new(reader: R) -> Self {
        LineCommands { reader }
    }
}

impl<R: BufRead + Send + 'static> CommandSource for LineCommands<R> {
    fn run(self: Box<Self>, tx: Sender<Command>) {
        for line in self.reader.lines() {
            let Ok(line) = line else { return };
            if line.trim().is_empty() { continue; }
            match Command::parse(&line) {
                Some(cmd) => {
                    if tx.send(cmd).is_err() { return; }
                    if cmd == Command::Quit { return; }
                }
                None => warn!("unknown command {:?} ({})", line.trim(), Command::HELP),
            }
        }
    }
}
