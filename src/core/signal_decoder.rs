//! Signal decoder: reads the peer's border color from a camera frame
//!
//! Samples the outer margin on all four edges, converts to HSV and takes a
//! pixel-count vote per candidate color. Ties go to the earlier candidate in
//! `Signal::CANDIDATES` (GREEN, RED, CYAN).

use crate::config::SignalConfig;
use crate::types::{Frame, Signal};

/// Per-color share of sampled border pixels
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BorderRatios {
    pub green: f64,
    pub red: f64,
    pub cyan: f64,
    /// Number of pixels sampled
    pub samples: usize,
}

impl BorderRatios {
    pub fn get(&self, signal: Signal) -> f64 {
        match signal {
            Signal::Green => self.green,
            Signal::Red => self.red,
            Signal::Cyan => self.cyan,
            Signal::None => 0.0,
        }
    }
}

/// Border color decoder
#[derive(Debug, Clone)]
pub struct SignalDecoder {
    config: SignalConfig,
}

impl Default for SignalDecoder {
    fn default() -> Self {
        Self::new(SignalConfig::default())
    }
}

impl SignalDecoder {
    pub fn new(config: SignalConfig) -> Self {
        Self { config }
    }

    /// Decode the border signal of a frame
    pub fn decode(&self, frame: &Frame) -> Signal {
        let ratios = self.ratios(frame);
        if ratios.samples == 0 {
            return Signal::None;
        }

        let mut best = Signal::None;
        let mut best_ratio = 0.0;
        for candidate in Signal::CANDIDATES {
            let ratio = ratios.get(candidate);
            // Strictly greater keeps the earlier candidate on ties
            if best.is_none() || ratio > best_ratio {
                best = candidate;
                best_ratio = ratio;
            }
        }

        if best_ratio >= self.config.min_ratio {
            best
        } else {
            Signal::None
        }
    }

    /// Share of sampled border pixels inside each color's ranges
    pub fn ratios(&self, frame: &Frame) -> BorderRatios {
        let (height, width) = (frame.height(), frame.width());
        let margin = (height.min(width) as f64 * self.config.margin_fraction) as usize;
        if margin == 0 {
            return BorderRatios::default();
        }

        let stride = self.config.sample_stride.max(1);
        let mut counts = [0usize; 3];
        let mut samples = 0usize;

        // Top and bottom bands span full rows, left and right bands span full
        // columns; corner pixels are sampled by both.
        let bands = [
            (0, margin, 0, width),
            (height - margin, height, 0, width),
            (0, height, 0, margin),
            (0, height, width - margin, width),
        ];

        for (top, bottom, left, right) in bands {
            for row in (top..bottom).step_by(stride) {
                for col in (left..right).step_by(stride) {
                    let hsv = frame.pixel(row, col).to_hsv();
                    samples += 1;
                    for (i, candidate) in Signal::CANDIDATES.iter().enumerate() {
                        if self.config.ranges(*candidate).iter().any(|r| r.contains(hsv)) {
                            counts[i] += 1;
                        }
                    }
                }
            }
        }

        if samples == 0 {
            return BorderRatios::default();
        }
        let total = samples as f64;
        BorderRatios {
            green: counts[0] as f64 / total,
            red: counts[1] as f64 / total,
            cyan: counts[2] as f64 / total,
            samples,
        }
    }
}
