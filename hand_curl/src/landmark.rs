//! The 21-point hand landmark vocabulary and a validated landmark set.
//!
//! Indices follow the MediaPipe hand landmarker convention: wrist first,
//! then four joints per finger from the palm outward, thumb to pinky.

use serde::{Deserialize, Serialize};

use crate::error::{CurlError, Result};

// ════════════════════════════════════════════════════════════════════════════
// HandLandmark: the closed vocabulary
// ════════════════════════════════════════════════════════════════════════════

/// Named hand-anatomy positions reported by the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HandLandmark {
    Wrist,
    ThumbCmc,
    ThumbMcp,
    ThumbIp,
    ThumbTip,
    IndexMcp,
    IndexPip,
    IndexDip,
    IndexTip,
    MiddleMcp,
    MiddlePip,
    MiddleDip,
    MiddleTip,
    RingMcp,
    RingPip,
    RingDip,
    RingTip,
    PinkyMcp,
    PinkyPip,
    PinkyDip,
    PinkyTip,
}

/// Landmarks per hand.
pub const LANDMARK_COUNT: usize = 21;

impl HandLandmark {
    /// Every landmark, in detector order.
    pub const ALL: [HandLandmark; LANDMARK_COUNT] = [
        Self::Wrist,
        Self::ThumbCmc,
        Self::ThumbMcp,
        Self::ThumbIp,
        Self::ThumbTip,
        Self::IndexMcp,
        Self::IndexPip,
        Self::IndexDip,
        Self::IndexTip,
        Self::MiddleMcp,
        Self::MiddlePip,
        Self::MiddleDip,
        Self::MiddleTip,
        Self::RingMcp,
        Self::RingPip,
        Self::RingDip,
        Self::RingTip,
        Self::PinkyMcp,
        Self::PinkyPip,
        Self::PinkyDip,
        Self::PinkyTip,
    ];

    /// Position of this landmark in a detector's output (0–20).
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Wrist => "wrist",
            Self::ThumbCmc => "thumb-cmc",
            Self::ThumbMcp => "thumb-mcp",
            Self::ThumbIp => "thumb-ip",
            Self::ThumbTip => "thumb-tip",
            Self::IndexMcp => "index-mcp",
            Self::IndexPip => "index-pip",
            Self::IndexDip => "index-dip",
            Self::IndexTip => "index-tip",
            Self::MiddleMcp => "middle-mcp",
            Self::MiddlePip => "middle-pip",
            Self::MiddleDip => "middle-dip",
            Self::MiddleTip => "middle-tip",
            Self::RingMcp => "ring-mcp",
            Self::RingPip => "ring-pip",
            Self::RingDip => "ring-dip",
            Self::RingTip => "ring-tip",
            Self::PinkyMcp => "pinky-mcp",
            Self::PinkyPip => "pinky-pip",
            Self::PinkyDip => "pinky-dip",
            Self::PinkyTip => "pinky-tip",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Landmark: one 3D point
// ════════════════════════════════════════════════════════════════════════════

/// A single landmark position.  Units are whatever the detector reports;
/// every metric divides by palm width, so only ratios matter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Landmark { x, y, z }
    }

    /// Euclidean distance in full 3D, accumulated in `f64` so large but
    /// finite coordinates do not overflow the squares.
    pub fn distance(&self, other: &Landmark) -> f32 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        let dz = f64::from(self.z) - f64::from(other.z);
        (dx * dx + dy * dy + dz * dz).sqrt() as f32
    }

    fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Handedness: display metadata only
// ════════════════════════════════════════════════════════════════════════════

/// Left/right classification, when the detector provides one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Parse a detector label ("Left", "right", ...).  Unknown labels → `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Handedness::Left),
            "right" => Some(Handedness::Right),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
        }
    }
}

// ════════════════════════════════════════════════════════════════════════════
// HandLandmarks: a complete, checked set for one hand
// ════════════════════════════════════════════════════════════════════════════

/// All 21 landmarks of one hand, every coordinate finite.
///
/// The only way to build one is [`HandLandmarks::from_points`] (or
/// [`HandLandmarks::from_array`]), so the metrics stage never sees a short
/// or NaN-laden set.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [Landmark; LANDMARK_COUNT],
}

impl HandLandmarks {
    /// Validate a detector's point list.
    pub fn from_points(points: &[Landmark]) -> Result<Self> {
        if points.len() != LANDMARK_COUNT {
            return Err(CurlError::LandmarkCount {
                expected: LANDMARK_COUNT,
                actual: points.len(),
            });
        }
        let mut array = [Landmark::default(); LANDMARK_COUNT];
        array.copy_from_slice(points);
        Self::from_array(array)
    }

    pub fn from_array(points: [Landmark; LANDMARK_COUNT]) -> Result<Self> {
        if let Some(bad) = HandLandmark::ALL
            .iter()
            .find(|lm| !points[lm.index()].is_finite())
        {
            return Err(CurlError::NonFinite { landmark: bad.as_str() });
        }
        Ok(HandLandmarks { points })
    }

    pub fn get(&self, landmark: HandLandmark) -> &Landmark {
        &self.points[landmark.index()]
    }

    /// Distance between two named landmarks.
    pub fn distance(&self, a: HandLandmark, b: HandLandmark) -> f32 {
        self.get(a).distance(self.get(b))
    }

    pub fn points(&self) -> &[Landmark; LANDMARK_COUNT] {
        &self.points
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vocabulary_order() {
        assert_eq!(HandLandmark::Wrist.index(), 0);
        assert_eq!(HandLandmark::ThumbTip.index(), 4);
        assert_eq!(HandLandmark::IndexMcp.index(), 5);
        assert_eq!(HandLandmark::IndexTip.index(), 8);
        assert_eq!(HandLandmark::PinkyMcp.index(), 17);
        assert_eq!(HandLandmark::PinkyTip.index(), 20);
        for (i, lm) in HandLandmark::ALL.iter().enumerate() {
            assert_eq!(lm.index(), i);
        }
    }

    #[test]
    fn distance_is_3d() {
        let a = Landmark::new(0.0, 0.0, 0.0);
        let b = Landmark::new(1.0, 2.0, 2.0);
        assert!((a.distance(&b) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn distance_survives_large_coordinates() {
        let a = Landmark::new(3e19, 0.0, 0.0);
        let d = a.distance(&Landmark::default());
        assert!(d.is_finite());
        assert!((d / 3e19 - 1.0).abs() < 1e-6);
    }

    #[test]
    fn short_point_list_rejected() {
        let pts = vec![Landmark::default(); 20];
        match HandLandmarks::from_points(&pts) {
            Err(CurlError::LandmarkCount { expected: 21, actual: 20 }) => {}
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn nan_coordinate_rejected() {
        let mut pts = vec![Landmark::default(); LANDMARK_COUNT];
        pts[HandLandmark::RingTip.index()].y = f32::NAN;
        let err = HandLandmarks::from_points(&pts).unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("ring-tip"));
    }

    #[test]
    fn handedness_labels() {
        assert_eq!(Handedness::from_label("Left"), Some(Handedness::Left));
        assert_eq!(Handedness::from_label(" right "), Some(Handedness::Right));
        assert_eq!(Handedness::from_label("both"), None);
    }
}
