//! Runtime configuration
//!
//! Every threshold and duration the core uses comes from here and is passed
//! into constructors. Defaults mirror the constants in the crate root.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::{HsvRange, Signal};
use crate::{
    ACCUMULATION_FRAMES, ALPHABET, BORDER_MARGIN_FRACTION, BORDER_MIN_RATIO,
    CLASSIFY_HEADROOM_FRAMES, CLASSIFY_HZ, DONE_DURATION_SECS, FALLBACK_MESSAGE, HSV_CYAN,
    HSV_GREEN, HSV_RED_HIGH, HSV_RED_LOW, LETTER_HOLD_SECS, LETTER_PAUSE_SECS, MAX_GAP_FRAMES,
    MAX_ROUNDS, MAX_WORD_LEN, MESSAGE_HOLD_SECS, POLL_INTERVAL_MS, RECEIVED_HOLD_SECS,
    RESPONDER_TIMEOUT_SECS, SENTENCE_TIMEOUT_SECS, SPACE_GAP_FRAMES, WORD_GAP_SECS,
};

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub accumulator: AccumulatorConfig,
    pub assembler: AssemblerConfig,
    pub signal: SignalConfig,
    pub turn: TurnConfig,
    pub timing: TimingConfig,
    pub conversation: ConversationConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccumulatorConfig {
    pub required_frames: u32,
    pub max_gap: u32,
}

impl Default for AccumulatorConfig {
    fn default() -> Self {
        Self {
            required_frames: ACCUMULATION_FRAMES,
            max_gap: MAX_GAP_FRAMES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssemblerConfig {
    pub space_gap_frames: u32,
    pub sentence_timeout_seconds: f64,
}

impl AssemblerConfig {
    pub fn sentence_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.sentence_timeout_seconds)
    }
}

impl Default for AssemblerConfig {
    fn default() -> Self {
        Self {
            space_gap_frames: SPACE_GAP_FRAMES,
            sentence_timeout_seconds: SENTENCE_TIMEOUT_SECS,
        }
    }
}

/// Border decoding: sampled margin, acceptance ratio and color ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub margin_fraction: f64,
    pub min_ratio: f64,
    /// Sample every n-th pixel along rows and columns of the margin
    pub sample_stride: usize,
    pub green: Vec<HsvRange>,
    /// Two ranges, hue wraps through zero
    pub red: Vec<HsvRange>,
    pub cyan: Vec<HsvRange>,
}

impl SignalConfig {
    pub fn ranges(&self, signal: Signal) -> &[HsvRange] {
        match signal {
            Signal::Green => &self.green,
            Signal::Red => &self.red,
            Signal::Cyan => &self.cyan,
            Signal::None => &[],
        }
    }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            margin_fraction: BORDER_MARGIN_FRACTION,
            min_ratio: BORDER_MIN_RATIO,
            sample_stride: 1,
            green: vec![HsvRange::new(HSV_GREEN)],
            red: vec![HsvRange::new(HSV_RED_LOW), HsvRange::new(HSV_RED_HIGH)],
            cyan: vec![HsvRange::new(HSV_CYAN)],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TurnConfig {
    pub done_duration_seconds: f64,
    /// A starting speaker waits for the peer's cyan border before speaking
    pub handshake: bool,
}

impl TurnConfig {
    pub fn done_duration(&self) -> Duration {
        Duration::from_secs_f64(self.done_duration_seconds)
    }
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            done_duration_seconds: DONE_DURATION_SECS,
            handshake: false,
        }
    }
}

/// Hold and pause durations of the orchestrator loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub letter_hold_seconds: f64,
    pub letter_pause_seconds: f64,
    pub word_gap_seconds: f64,
    pub message_hold_seconds: f64,
    pub received_hold_seconds: f64,
    pub classify_hz: f64,
    pub poll_interval_ms: u64,
    pub responder_timeout_seconds: f64,
}

impl TimingConfig {
    pub fn letter_hold(&self) -> Duration {
        Duration::from_secs_f64(self.letter_hold_seconds)
    }

    pub fn letter_pause(&self) -> Duration {
        Duration::from_secs_f64(self.letter_pause_seconds)
    }

    pub fn word_gap(&self) -> Duration {
        Duration::from_secs_f64(self.word_gap_seconds)
    }

    pub fn message_hold(&self) -> Duration {
        Duration::from_secs_f64(self.message_hold_seconds)
    }

    pub fn received_hold(&self) -> Duration {
        Duration::from_secs_f64(self.received_hold_seconds)
    }

    pub fn classify_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.classify_hz)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn responder_timeout(&self) -> Duration {
        Duration::from_secs_f64(self.responder_timeout_seconds)
    }

    /// Classifications that fit in one letter hold
    pub fn samples_per_letter(&self) -> f64 {
        self.letter_hold_seconds * self.classify_hz
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            letter_hold_seconds: LETTER_HOLD_SECS,
            letter_pause_seconds: LETTER_PAUSE_SECS,
            word_gap_seconds: WORD_GAP_SECS,
            message_hold_seconds: MESSAGE_HOLD_SECS,
            received_hold_seconds: RECEIVED_HOLD_SECS,
            classify_hz: CLASSIFY_HZ,
            poll_interval_ms: POLL_INTERVAL_MS,
            responder_timeout_seconds: RESPONDER_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversationConfig {
    pub max_rounds: u32,
    /// Letters that can be spelled; others are skipped when speaking
    pub alphabet: String,
    pub fallback_message: String,
    pub max_word_len: usize,
}

impl ConversationConfig {
    pub fn is_spellable(&self, c: char) -> bool {
        self.alphabet.contains(c)
    }
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            max_rounds: MAX_ROUNDS,
            alphabet: ALPHABET.to_string(),
            fallback_message: FALLBACK_MESSAGE.to_string(),
            max_word_len: MAX_WORD_LEN,
        }
    }
}

impl Config {
    /// Load from a TOML file; missing sections fall back to defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Same protocol with every duration multiplied by `factor`
    ///
    /// The classification rate is divided by `factor` so the number of
    /// classifications per letter stays the same.
    pub fn scaled(&self, factor: f64) -> Config {
        let mut config = self.clone();
        let timing = &mut config.timing;
        timing.letter_hold_seconds *= factor;
        timing.letter_pause_seconds *= factor;
        timing.word_gap_seconds *= factor;
        timing.message_hold_seconds *= factor;
        timing.received_hold_seconds *= factor;
        timing.responder_timeout_seconds *= factor;
        timing.classify_hz /= factor;
        timing.poll_interval_ms = ((timing.poll_interval_ms as f64 * factor).round() as u64).max(1);
        config.turn.done_duration_seconds *= factor;
        config.assembler.sentence_timeout_seconds *= factor;
        config
    }

    /// Reject values the core cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.accumulator.required_frames == 0 {
            return Err(ConfigError::invalid("accumulator.required_frames", "must be at least 1"));
        }
        if self.assembler.space_gap_frames == 0 {
            return Err(ConfigError::invalid("assembler.space_gap_frames", "must be at least 1"));
        }
        if !(self.signal.min_ratio > 0.0 && self.signal.min_ratio <= 1.0) {
            return Err(ConfigError::invalid("signal.min_ratio", "must be in (0, 1]"));
        }
        if !(self.signal.margin_fraction > 0.0 && self.signal.margin_fraction <= 0.5) {
            return Err(ConfigError::invalid("signal.margin_fraction", "must be in (0, 0.5]"));
        }
        if self.signal.sample_stride == 0 {
            return Err(ConfigError::invalid("signal.sample_stride", "must be at least 1"));
        }
        for (field, ranges) in [
            ("signal.green", &self.signal.green),
            ("signal.red", &self.signal.red),
            ("signal.cyan", &self.signal.cyan),
        ] {
            if ranges.is_empty() {
                return Err(ConfigError::invalid(field, "needs at least one range"));
            }
        }

        let durations = [
            ("assembler.sentence_timeout_seconds", self.assembler.sentence_timeout_seconds),
            ("turn.done_duration_seconds", self.turn.done_duration_seconds),
            ("timing.letter_hold_seconds", self.timing.letter_hold_seconds),
            ("timing.word_gap_seconds", self.timing.word_gap_seconds),
            ("timing.classify_hz", self.timing.classify_hz),
            ("timing.responder_timeout_seconds", self.timing.responder_timeout_seconds),
        ];
        for (field, value) in durations {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::invalid(field, "must be positive"));
            }
        }
        for (field, value) in [
            ("timing.letter_pause_seconds", self.timing.letter_pause_seconds),
            ("timing.message_hold_seconds", self.timing.message_hold_seconds),
            ("timing.received_hold_seconds", self.timing.received_hold_seconds),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::invalid(field, "must not be negative"));
            }
        }
        if self.timing.received_hold_seconds < self.turn.done_duration_seconds {
            return Err(ConfigError::invalid(
                "timing.received_hold_seconds",
                "must be at least turn.done_duration_seconds",
            ));
        }
        if self.timing.poll_interval_ms == 0 {
            return Err(ConfigError::invalid("timing.poll_interval_ms", "must be at least 1"));
        }
        let needed = self.accumulator.required_frames.saturating_add(CLASSIFY_HEADROOM_FRAMES);
        if self.timing.samples_per_letter() + 1e-6 < needed as f64 {
            return Err(ConfigError::invalid(
                "timing.letter_hold_seconds",
                format!(
                    "letter_hold_seconds * classify_hz must be at least {} (required_frames + {})",
                    needed, CLASSIFY_HEADROOM_FRAMES
                ),
            ));
        }

        if self.conversation.alphabet.is_empty() {
            return Err(ConfigError::invalid("conversation.alphabet", "must not be empty"));
        }
        if self.conversation.max_word_len == 0 {
            return Err(ConfigError::invalid("conversation.max_word_len", "must be at least 1"));
        }
        Ok(())
    }
}
