//! Message assembler: confirmed letters + hand-presence gaps → delimited text
//!
//! A gap of `space_gap_frames` polls without a hand inserts one space. The
//! same letter confirmed twice in a row is appended once. A message is
//! complete on an explicit signal or after `sentence_timeout` of silence.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::AssemblerConfig;

#[derive(Debug, Clone)]
pub struct MessageAssembler {
    space_gap_frames: u32,
    sentence_timeout: Duration,
    buffer: String,
    /// Consecutive polls without a hand
    absent_run: u32,
    /// A space was already inserted for the current gap
    space_inserted: bool,
    last_confirmed_at: Option<Instant>,
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new(AssemblerConfig::default())
    }
}

impl MessageAssembler {
    pub fn new(config: AssemblerConfig) -> Self {
        Self {
            space_gap_frames: config.space_gap_frames.max(1),
            sentence_timeout: config.sentence_timeout(),
            buffer: String::new(),
            absent_run: 0,
            space_inserted: false,
            last_confirmed_at: None,
        }
    }

    /// Feed one classifier poll
    pub fn observe(&mut self, confirmed: Option<char>, hand_present: bool, now: Instant) {
        if hand_present {
            self.absent_run = 0;
            self.space_inserted = false;
        } else {
            self.absent_run += 1;
        }

        if self.absent_run >= self.space_gap_frames
            && !self.space_inserted
            && !self.buffer.is_empty()
            && !self.buffer.ends_with(' ')
        {
            self.buffer.push(' ');
            self.space_inserted = true;
            debug!(buffer = %self.buffer, "word gap, space inserted");
        }

        if let Some(symbol) = confirmed {
            if self.buffer.chars().last() != Some(symbol) {
                self.buffer.push(symbol);
                debug!(%symbol, buffer = %self.buffer, "letter appended");
            } else {
                debug!(%symbol, "duplicate letter suppressed");
            }
            self.last_confirmed_at = Some(now);
        }
    }

    /// Silence since the last confirmed letter exceeded the timeout
    pub fn is_done(&self, now: Instant) -> bool {
        if self.buffer.is_empty() {
            return false;
        }
        match self.last_confirmed_at {
            Some(at) => now.saturating_duration_since(at) > self.sentence_timeout,
            None => false,
        }
    }

    /// Take the message, trimmed of spaces, and reset for the next one
    pub fn finalize(&mut self) -> String {
        let text = self.buffer.trim_matches(' ').to_string();
        self.clear();
        text
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.absent_run = 0;
        self.space_inserted = false;
        self.last_confirmed_at = None;
    }

    /// Message so far, untrimmed
    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}
