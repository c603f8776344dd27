//! Symbol accumulator: confirm-on-repeat filter over per-poll classifications
//!
//! A symbol is confirmed once it has been seen `required_frames` times in a
//! row. Up to `max_gap` empty polls are tolerated inside a run. After a
//! confirmation the run starts over, so a doubled letter needs two runs.

use crate::config::AccumulatorConfig;

#[derive(Debug, Clone)]
pub struct SymbolAccumulator {
    required_frames: u32,
    max_gap: u32,
    candidate: Option<char>,
    count: u32,
    gap: u32,
}

impl Default for SymbolAccumulator {
    fn default() -> Self {
        Self::new(AccumulatorConfig::default())
    }
}

impl SymbolAccumulator {
    pub fn new(config: AccumulatorConfig) -> Self {
        Self {
            required_frames: config.required_frames.max(1),
            max_gap: config.max_gap,
            candidate: None,
            count: 0,
            gap: 0,
        }
    }

    /// Feed one classifier poll; returns the symbol when a run completes
    pub fn update(&mut self, input: Option<char>) -> Option<char> {
        let Some(symbol) = input else {
            self.gap += 1;
            if self.gap > self.max_gap {
                self.candidate = None;
                self.count = 0;
            }
            return None;
        };

        self.gap = 0;
        if self.candidate == Some(symbol) {
            self.count += 1;
        } else {
            self.candidate = Some(symbol);
            self.count = 1;
        }

        if self.count >= self.required_frames {
            self.candidate = None;
            self.count = 0;
            return Some(symbol);
        }
        None
    }

    pub fn reset(&mut self) {
        self.candidate = None;
        self.count = 0;
        self.gap = 0;
    }

    /// Symbol of the run in progress
    pub fn candidate(&self) -> Option<char> {
        self.candidate
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn gap(&self) -> u32 {
        self.gap
    }

    pub fn required_frames(&self) -> u32 {
        self.required_frames
    }
}
