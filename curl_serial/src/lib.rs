//! # curl_serial
//!
//! Live bridge from a hand-landmark detector to a robotic hand.  Each
//! camera frame's hands are turned into six PWM-like levels by
//! [`hand_curl`] and written as `T,I,M,R,P,TR\n` lines to a serial device.
//!
//! ## Data flow
//!
//! ```text
//! detector ──FrameEvent──▶ Session ──OutboundMessage──▶ TransportWriter ──▶ /dev/tty*
//!                             ▲
//! stdin ─────Command──────────┘
//! ```
//!
//! ## Commands
//!
//! | Key | Command | Action |
//! |---|---|---|
//! | `o` | capture open | latest hand → every channel's minimum |
//! | `c` | capture closed | latest hand → every channel's maximum |
//! | `s` | save | write the calibration file |
//! | `r` | recalibrate | forget every bound |
//! | `q` | quit | stop the loop |
//!
//! ## Feature flags
//!
//! * (default): JSON-lines frames from a detector subprocess (`--detector`)
//!   or a recording (`--replay`).
//! * `leap`: **Hardware mode**: polls a real LeapMotion controller via LeapC.

pub mod app;
pub mod command;
pub mod config;
pub mod detector;
#[cfg(feature = "leap")]
pub mod leap;
pub mod session;
pub mod transport;
