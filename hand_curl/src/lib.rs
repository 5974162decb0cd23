//! # hand_curl
//!
//! The numeric core of a camera-driven robotic hand: 21 hand landmarks in,
//! six PWM-like levels out.
//!
//! ```text
//! landmarks ──▶ curl_metrics ──▶ normalize_all ──▶ OutboundMessage
//!                  (raw)          (CalibrationSet)     "T,I,M,R,P,TR\n"
//! ```
//!
//! ## Channels
//!
//! | Channel | Metric | 0.0 | 1.0 |
//! |---|---|---|---|
//! | thumb | thumb tip ↔ thumb CMC | open | curled |
//! | index | index tip ↔ wrist | open | curled |
//! | middle | middle tip ↔ wrist | open | curled |
//! | ring | ring tip ↔ wrist | open | curled |
//! | pinky | pinky tip ↔ wrist | open | curled |
//! | thumb_rotation | thumb tip ↔ pinky MCP | open | rotated |
//!
//! All metrics are divided by palm width (index MCP ↔ pinky MCP).
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use hand_curl::{BoundKind, CalibrationSet, HandLandmarks, Landmark, read_hand};
//!
//! let points = vec![Landmark::default(); 21]; // from the detector
//! let hand = HandLandmarks::from_points(&points).unwrap();
//!
//! let mut calibration = CalibrationSet::load_file("calibration.json".as_ref());
//! let reading = read_hand(&hand, &calibration).unwrap();
//! calibration.record_all(BoundKind::Min, &reading.raw); // "this is open"
//!
//! print!("{}", reading.message); // e.g. "0,0,0,0,0,0\n"
//! ```

pub mod calibration;
pub mod channel;
pub mod error;
pub mod landmark;
pub mod metrics;
pub mod normalize;
pub mod output;

pub use calibration::{BoundKind, CalibrationRange, CalibrationSet, CalibrationState};
pub use channel::{Channel, ChannelValues, NormalizedValues, RawMetrics, CHANNEL_COUNT};
pub use error::{CurlError, Result};
pub use landmark::{HandLandmark, HandLandmarks, Handedness, Landmark, LANDMARK_COUNT};
pub use metrics::{curl_metrics, palm_width};
pub use normalize::{normalize, normalize_all};
pub use output::{to_output, OutboundMessage};

/// Everything one hand produces in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Reading {
    pub raw: RawMetrics,
    pub normalized: NormalizedValues,
    pub message: OutboundMessage,
}

/// Run one validated hand through metrics, normalisation and mapping.
///
/// Fails with [`CurlError::InvalidInput`] when a metric is not finite.
pub fn read_hand(hand: &HandLandmarks, calibration: &CalibrationSet) -> Result<Reading> {
    Ok(read_metrics(curl_metrics(hand)?, calibration))
}

/// Normalise and map metrics that were already computed.
pub fn read_metrics(raw: RawMetrics, calibration: &CalibrationSet) -> Reading {
    let normalized = normalize_all(&raw, calibration);
    let message = OutboundMessage::from_normalized(&normalized);
    Reading { raw, normalized, message }
}
