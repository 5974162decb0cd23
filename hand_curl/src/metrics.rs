//! Distance-based curl metrics.
//!
//! Every metric is a landmark-to-landmark distance divided by palm width,
//! which makes the numbers roughly independent of how far the hand is from
//! the camera.
//!
//! | Channel | From | To |
//! |---|---|---|
//! | thumb | thumb tip | thumb CMC |
//! | index | index tip | wrist |
//! | middle | middle tip | wrist |
//! | ring | ring tip | wrist |
//! | pinky | pinky tip | wrist |
//! | thumb_rotation | thumb tip | pinky MCP |
//!
//! The thumb is measured against its own base joint; measured against the
//! wrist it barely moves between open and closed.

use crate::channel::{Channel, RawMetrics};
use crate::error::{CurlError, Result};
use crate::landmark::{HandLandmark, HandLandmarks, Landmark};

/// Added to palm width so coincident MCP joints never divide by zero.
pub const PALM_EPSILON: f32 = 1e-6;

/// Distance between index and pinky MCP joints, plus [`PALM_EPSILON`].
pub fn palm_width(hand: &HandLandmarks) -> f32 {
    hand.distance(HandLandmark::IndexMcp, HandLandmark::PinkyMcp) + PALM_EPSILON
}

/// The `(tip, reference)` landmark pair a channel is measured between.
pub fn measured_pair(channel: Channel) -> (HandLandmark, HandLandmark) {
    use HandLandmark::*;
    match channel {
        Channel::Thumb => (ThumbTip, ThumbCmc),
        Channel::Index => (IndexTip, Wrist),
        Channel::Middle => (MiddleTip, Wrist),
        Channel::Ring => (RingTip, Wrist),
        Channel::Pinky => (PinkyTip, Wrist),
        Channel::ThumbRotation => (ThumbTip, PinkyMcp),
    }
}

/// Raw metrics for all six channels of one validated hand.
///
/// Coordinates near the edge of the `f32` range can still produce an
/// infinite distance; such a hand is rejected as
/// [`CurlError::InvalidInput`] rather than yielding NaN.
pub fn curl_metrics(hand: &HandLandmarks) -> Result<RawMetrics> {
    let palm = palm_width(hand);
    let metrics = RawMetrics::from_fn(|channel| {
        let (tip, reference) = measured_pair(channel);
        hand.distance(tip, reference) / palm
    });
    let non_finite = metrics.iter().find(|(_, v)| !v.is_finite());
    match non_finite {
        Some((channel, value)) => Err(CurlError::InvalidInput {
            reason: format!("{} metric is {} (palm width {})", channel, value, palm),
        }),
        None => Ok(metrics),
    }
}

/// Validate a detector point list and compute its metrics in one step.
pub fn curl_metrics_from_points(points: &[Landmark]) -> Result<RawMetrics> {
    let hand = HandLandmarks::from_points(points)?;
    curl_metrics(&hand)
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
