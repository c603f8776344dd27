//! signchat: turn-based letter chat between two agents over a shared visual channel
//!
//! One agent's screen is the other's camera. Turn-taking is signaled with a
//! colored border, letters are confirmed by run-length over noisy per-frame
//! classifications, and confirmed letters are assembled into messages.

pub mod config;
pub mod core;
pub mod error;
pub mod types;

// =============================================================================
// ACCUMULATION
// =============================================================================

/// Consecutive matching classifications required to confirm a letter
pub const ACCUMULATION_FRAMES: u32 = 8;

/// Classifications without a symbol tolerated before a run is abandoned
pub const MAX_GAP_FRAMES: u32 = 3;

// =============================================================================
// MESSAGE ASSEMBLY
// =============================================================================

/// Classifications without a hand before a word space is inserted
pub const SPACE_GAP_FRAMES: u32 = 10;

/// Silence after the last confirmed letter that completes a message (seconds)
pub const SENTENCE_TIMEOUT_SECS: f64 = 8.0;

// =============================================================================
// BORDER SIGNAL [OpenCV HSV scale: H 0-180, S/V 0-255]
// =============================================================================

/// Fraction of the short side sampled along each edge
pub const BORDER_MARGIN_FRACTION: f64 = 0.15;

/// Minimum ratio of border pixels matching a color to count as detected
pub const BORDER_MIN_RATIO: f64 = 0.3;

pub const HSV_GREEN: ([u8; 3], [u8; 3]) = ([35, 100, 100], [85, 255, 255]);
pub const HSV_RED_LOW: ([u8; 3], [u8; 3]) = ([0, 100, 100], [10, 255, 255]);
pub const HSV_RED_HIGH: ([u8; 3], [u8; 3]) = ([170, 100, 100], [180, 255, 255]);
pub const HSV_CYAN: ([u8; 3], [u8; 3]) = ([80, 100, 100], [100, 255, 255]);

// =============================================================================
// TIMING (seconds unless noted)
// =============================================================================

/// How long the red border is shown before switching to listening
pub const DONE_DURATION_SECS: f64 = 2.0;

/// How long each letter is shown; over 12 classifications at the default rate
pub const LETTER_HOLD_SECS: f64 = 2.5;

/// Blank pause between letters
pub const LETTER_PAUSE_SECS: f64 = 0.5;

/// Blank hold that encodes a space between words
pub const WORD_GAP_SECS: f64 = 3.0;

/// How long the finished message is shown as text
pub const MESSAGE_HOLD_SECS: f64 = 1.0;

/// How long a received message is shown back; at least the peer's done hold
pub const RECEIVED_HOLD_SECS: f64 = 2.5;

/// Classification rate, independent of frame rate
pub const CLASSIFY_HZ: f64 = 5.0;

/// Classifications per letter hold beyond `ACCUMULATION_FRAMES` that config
/// validation insists on, so a failed read or two does not lose the letter
pub const CLASSIFY_HEADROOM_FRAMES: u32 = 2;

/// Poll tick of every wait loop (milliseconds)
pub const POLL_INTERVAL_MS: u64 = 50;

/// Upper bound on waiting for the responder
pub const RESPONDER_TIMEOUT_SECS: f64 = 30.0;

// =============================================================================
// CONVERSATION
// =============================================================================

/// 24 static letters; J and Z require motion
pub const ALPHABET: &str = "ABCDEFGHIKLMNOPQRSTUVWXY";

pub const MAX_ROUNDS: u32 = 10;

/// Sent when the responder fails or has nothing usable
pub const FALLBACK_MESSAGE: &str = "HI";

/// Maximum letters per outgoing word
pub const MAX_WORD_LEN: usize = 8;

// =============================================================================
// VERSION
// =============================================================================

pub const VERSION: &str = "0.1.0";
