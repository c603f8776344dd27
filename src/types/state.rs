//! Turn state definitions

use serde::{Deserialize, Serialize};
use crate::types::BorderColor;

/// The five states of one agent's turn protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TurnState {
    /// Before the conversation starts
    Idle,
    /// Showing letters with a green border
    Speaking,
    /// Red border, signaling the turn is over
    DoneSpeaking,
    /// Cyan border, reading the peer's screen
    Listening,
    /// Waiting for the peer to show cyan before speaking
    WaitingForTurn,
}

impl TurnState {
    /// Border this agent should currently be rendering
    pub fn border_color(&self) -> BorderColor {
        match self {
            TurnState::Speaking => BorderColor::Green,
            TurnState::DoneSpeaking => BorderColor::Red,
            TurnState::Listening => BorderColor::Cyan,
            TurnState::Idle | TurnState::WaitingForTurn => BorderColor::Gray,
        }
    }
}

impl std::fmt::Display for TurnState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            TurnState::Idle => "IDLE",
            TurnState::Speaking => "SPEAKING",
            TurnState::DoneSpeaking => "DONE_SPEAKING",
            TurnState::Listening => "LISTENING",
            TurnState::WaitingForTurn => "WAITING_FOR_TURN",
        };
        write!(f, "{}", name)
    }
}

/// Starting role of an agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Speaker,
    Listener,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Speaker => write!(f, "speaker"),
            Role::Listener => write!(f, "listener"),
        }
    }
}
