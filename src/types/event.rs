//! Events emitted by turn transitions

use serde::{Deserialize, Serialize};

/// Significant turn-protocol event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnEvent {
    /// Red border shown long enough, now listening
    DoneTimeout,
    /// Peer is showing a letter
    LetterIncoming,
    /// Peer handed the turn over, now speaking
    TurnReceived,
}

impl TurnEvent {
    /// Get the event string (for logging)
    pub fn code(&self) -> &'static str {
        match self {
            Self::DoneTimeout => "done_timeout",
            Self::LetterIncoming => "letter_incoming",
            Self::TurnReceived => "turn_received",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::DoneTimeout => "Done signal held, switching to listening",
            Self::LetterIncoming => "Peer is showing a letter",
            Self::TurnReceived => "Peer finished, taking the turn",
        }
    }
}

impl std::fmt::Display for TurnEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code(), self.description())
    }
}
