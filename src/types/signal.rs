//! Border signal colors

use serde::{Deserialize, Serialize};
use crate::types::{Hsv, Rgb};

/// Decoded border signal of a camera frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Signal {
    /// Peer is showing a letter
    Green,
    /// Peer is done, our turn
    Red,
    /// Peer is listening
    Cyan,
    /// No color reached the minimum ratio
    None,
}

impl Signal {
    /// Candidate colors in tie-break priority order
    pub const CANDIDATES: [Signal; 3] = [Signal::Green, Signal::Red, Signal::Cyan];

    pub fn is_none(&self) -> bool {
        *self == Signal::None
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Signal::Green => "GREEN",
            Signal::Red => "RED",
            Signal::Cyan => "CYAN",
            Signal::None => "NONE",
        };
        write!(f, "{}", name)
    }
}

/// Color an agent renders around its screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorderColor {
    Green,
    Red,
    Cyan,
    /// Idle / startup
    Gray,
}

impl BorderColor {
    pub fn rgb(&self) -> Rgb {
        match self {
            BorderColor::Green => Rgb(0, 255, 0),
            BorderColor::Red => Rgb(255, 0, 0),
            BorderColor::Cyan => Rgb(0, 255, 255),
            BorderColor::Gray => Rgb(128, 128, 128),
        }
    }

    /// Signal a peer should decode from this border
    pub fn signal(&self) -> Signal {
        match self {
            BorderColor::Green => Signal::Green,
            BorderColor::Red => Signal::Red,
            BorderColor::Cyan => Signal::Cyan,
            BorderColor::Gray => Signal::None,
        }
    }
}

impl std::fmt::Display for BorderColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BorderColor::Green => "GREEN",
            BorderColor::Red => "RED",
            BorderColor::Cyan => "CYAN",
            BorderColor::Gray => "GRAY",
        };
        write!(f, "{}", name)
    }
}

/// Inclusive HSV box, OpenCV `inRange` semantics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(bounds: ([u8; 3], [u8; 3])) -> Self {
        Self { lower: bounds.0, upper: bounds.1 }
    }

    pub fn contains(&self, hsv: Hsv) -> bool {
        let value = [hsv.h, hsv.s, hsv.v];
        (0..3).all(|i| self.lower[i] <= value[i] && value[i] <= self.upper[i])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HSV_GREEN;

    #[test]
    fn test_border_colors_round_trip_to_signals() {
        assert_eq!(BorderColor::Green.signal(), Signal::Green);
        assert_eq!(BorderColor::Gray.signal(), Signal::None);
    }

    #[test]
    fn test_range_is_inclusive() {
        let range = HsvRange::new(HSV_GREEN);
        assert!(range.contains(Hsv { h: 35, s: 100, v: 100 }));
        assert!(range.contains(Hsv { h: 85, s: 255, v: 255 }));
        assert!(!range.contains(Hsv { h: 86, s: 255, v: 255 }));
        assert!(!range.contains(Hsv { h: 60, s: 99, v: 255 }));
    }
}
