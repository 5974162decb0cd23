//! The six actuator channels and a fixed-order per-channel container.

use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::CurlError;

/// One controllable output of the hand.  Declaration order is wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Channel {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
    ThumbRotation,
}

pub const CHANNEL_COUNT: usize = 6;

impl Channel {
    /// All channels in wire order.
    pub const ALL: [Channel; CHANNEL_COUNT] = [
        Channel::Thumb,
        Channel::Index,
        Channel::Middle,
        Channel::Ring,
        Channel::Pinky,
        Channel::ThumbRotation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Key used in the calibration file.
    pub fn name(self) -> &'static str {
        match self {
            Channel::Thumb => "thumb",
            Channel::Index => "index",
            Channel::Middle => "middle",
            Channel::Ring => "ring",
            Channel::Pinky => "pinky",
            Channel::ThumbRotation => "thumb_rotation",
        }
    }

    /// Short console tag (`T`, `I`, ..., `TR`).
    pub fn tag(self) -> &'static str {
        match self {
            Channel::Thumb => "T",
            Channel::Index => "I",
            Channel::Middle => "M",
            Channel::Ring => "R",
            Channel::Pinky => "P",
            Channel::ThumbRotation => "TR",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Channel {
    type Err = CurlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.name() == s)
            .ok_or_else(|| CurlError::UnknownChannel(s.to_string()))
    }
}

// ════════════════════════════════════════════════════════════════════════════
// ChannelValues: one value per channel, always all six
// ════════════════════════════════════════════════════════════════════════════

/// A value for every channel, stored in wire order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChannelValues<T>([T; CHANNEL_COUNT]);

impl<T: Copy> ChannelValues<T> {
    pub fn splat(value: T) -> Self {
        ChannelValues([value; CHANNEL_COUNT])
    }

    pub fn from_fn(mut f: impl FnMut(Channel) -> T) -> Self {
        ChannelValues(Channel::ALL.map(&mut f))
    }

    /// Apply `f` channel by channel.
    pub fn map<U: Copy>(&self, mut f: impl FnMut(Channel, T) -> U) -> ChannelValues<U> {
        ChannelValues::from_fn(|c| f(c, self.0[c.index()]))
    }

    /// `(channel, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (Channel, T)> + '_ {
        Channel::ALL.iter().map(move |&c| (c, self.0[c.index()]))
    }

    pub fn as_array(&self) -> &[T; CHANNEL_COUNT] {
        &self.0
    }
}

impl<T> From<[T; CHANNEL_COUNT]> for ChannelValues<T> {
    fn from(values: [T; CHANNEL_COUNT]) -> Self {
        ChannelValues(values)
    }
}

impl<T> Index<Channel> for ChannelValues<T> {
    type Output = T;
    fn index(&self, channel: Channel) -> &T {
        &self.0[channel.index()]
    }
}

impl<T> IndexMut<Channel> for ChannelValues<T> {
    fn index_mut(&mut self, channel: Channel) -> &mut T {
        &mut self.0[channel.index()]
    }
}

/// Per-channel raw curl metrics (palm-width units, ≥ 0).
pub type RawMetrics = ChannelValues<f32>;

/// Per-channel normalised values in `[0, 1]`.
pub type NormalizedValues = ChannelValues<f32>;

impl NormalizedValues {
    /// `T:0.50 I:0.25 M:0.00 R:1.00 P:0.75 TR:0.10`
    pub fn summary(&self) -> String {
        self.iter()
            .map(|(c, v)| format!("{}:{:.2}", c.tag(), v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
