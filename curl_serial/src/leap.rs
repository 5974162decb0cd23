//! LeapMotion hardware frame source (feature = "leap").
//!
//! Leap reports bones rather than MediaPipe landmarks, so each frame is
//! mapped onto the 21-point vocabulary:
//!
//! | Landmark | Leap joint |
//! |---|---|
//! | wrist | middle metacarpal base |
//! | thumb CMC / MCP / IP / tip | thumb proximal base / intermediate base / distal base / distal tip |
//! | finger MCP / PIP / DIP / tip | proximal base / intermediate base / distal base / distal tip |
//!
//! Coordinates stay in millimetres; every metric is a ratio to palm width.

use std::sync::mpsc::Sender;

use leaprs::*;
use tracing::{error, warn};

use hand_curl::{HandLandmark, Handedness, Landmark, LANDMARK_COUNT};

use crate::detector::{DetectedHand, FrameEvent, FrameSource};

/// Frame source backed by a real LeapMotion controller.
///
/// Requires the `leap` feature flag and the LeapC shared library installed.
pub struct LeapFrameSource;

impl FrameSource for LeapFrameSource {
    fn run(self: Box<Self>, tx: Sender<FrameEvent>) {
        let mut connection = match Connection::create(ConnectionConfig::default()) {
            Ok(c)  => c,
            Err(e) => {
                error!("failed to create LeapC connection: {:?}", e);
                let _ = tx.send(FrameEvent::End);
                return;
            }
        };
        if let Err(e) = connection.open() {
            error!("failed to open LeapMotion device: {:?}", e);
            let _ = tx.send(FrameEvent::End);
            return;
        }

        loop {
            let msg = match connection.poll(100) {
                Ok(m)  => m,
                Err(_) => continue,
            };

            if let Event::Tracking(frame) = msg.event() {
                let hands: Vec<DetectedHand> = frame
                    .hands()
                    .filter_map(|h| {
                        let hand = leap_hand(&h);
                        if hand.is_none() {
                            warn!("leap hand with missing digits skipped");
                        }
                        hand
                    })
                    .collect();
                if tx.send(FrameEvent::Frame(hands)).is_err() { return; }
            }
        }
    }
}

/// Map one Leap hand onto the landmark vocabulary.
fn leap_hand(hand: &Hand) -> Option<DetectedHand> {
    let digits: Vec<_> = hand.digits().collect();
    if digits.len() < 5 { return None; }

    macro_rules! point {
        ($joint:expr) => {{
            let v = $joint;
            Landmark::new(v.x, v.y, v.z)
        }};
    }
    let mut pts = [Landmark::default(); LANDMARK_COUNT];

    pts[HandLandmark::Wrist.index()] = point!(digits[2].metacarpal().prev_joint());

    // Four landmarks per digit, thumb first, in vocabulary order.
    for (d, digit) in digits.iter().take(5).enumerate() {
        let base = 1 + d * 4;
        pts[base]     = point!(digit.proximal().prev_joint());
        pts[base + 1] = point!(digit.intermediate().prev_joint());
        pts[base + 2] = point!(digit.distal().prev_joint());
        pts[base + 3] = point!(digit.distal().next_joint());
    }

    let handedness = if hand.hand_type() == HandType::Left {
        Handedness::Left
    } else {
        Handedness::Right
    };

    Some(DetectedHand { points: pts.to_vec(), handedness: Some(handedness), score: None })
}
