//! Normalised values → PWM-like levels → the outbound text line.
//!
//! Wire format, one line per hand per frame:
//!
//! ```text
//! T,I,M,R,P,TR\n
//! ```
//!
//! Six decimal integers 0–255 in channel order.  Every message carries all
//! six fields.

use std::fmt;

use crate::channel::{ChannelValues, NormalizedValues};

/// Largest output level.
pub const LEVEL_MAX: u8 = 255;

/// `floor(normalized × 255)`.  Inputs outside `[0, 1]` (or NaN) are clamped
/// first, so the result is always a valid level.
pub fn to_output(normalized: f32) -> u8 {
    let n = if normalized.is_nan() { 0.0 } else { normalized.clamp(0.0, 1.0) };
    (n * LEVEL_MAX as f32).floor() as u8
}

/// Six output levels in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutboundMessage {
    levels: ChannelValues<u8>,
}

impl OutboundMessage {
    pub fn from_normalized(values: &NormalizedValues) -> Self {
        OutboundMessage { levels: values.map(|_, v| to_output(v)) }
    }

    pub fn from_levels(levels: ChannelValues<u8>) -> Self {
        OutboundMessage { levels }
    }

    pub fn levels(&self) -> &ChannelValues<u8> {
        &self.levels
    }

    /// The exact bytes written to the transport, newline included.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.to_string().into_bytes()
    }
}

impl fmt::Display for OutboundMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [t, i, m, r, p, tr] = *self.levels.as_array();
        writeln!(f, "{},{},{},{},{},{}", t, i, m, r, p, tr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::Channel;
    use proptest::prelude::*;

    #[test]
    fn level_scaling_truncates() {
        assert_eq!(to_output(0.0), 0);
        assert_eq!(to_output(0.5), 127);
        assert_eq!(to_output(0.999), 254);
        assert_eq!(to_output(1.0), 255);
    }

    #[test]
    fn all_open_line() {
        let msg = OutboundMessage::from_normalized(&NormalizedValues::splat(0.0));
        assert_eq!(msg.to_string(), "0,0,0,0,0,0\n");
    }

    #[test]
    fn all_closed_line() {
        let msg = OutboundMessage::from_normalized(&NormalizedValues::splat(1.0));
        assert_eq!(msg.to_bytes(), b"255,255,255,255,255,255\n".to_vec());
    }

    #[test]
    fn field_order_follows_channels() {
        let mut levels = ChannelValues::splat(0u8);
        levels[Channel::Thumb] = 1;
        levels[Channel::ThumbRotation] = 6;
        levels[Channel::Ring] = 4;
        assert_eq!(OutboundMessage::from_levels(levels).to_string(), "1,0,0,4,0,6\n");
    }

    proptest! {
        #[test]
        fn levels_monotonic(x in -1.0f32..2.0, dx in 0.0f32..1.0) {
            prop_assert!(to_output(x) <= to_output(x + dx));
        }
    }
}
