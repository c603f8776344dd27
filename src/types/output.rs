//! Session report produced at shutdown

use colored::Colorize;
use serde::{Deserialize, Serialize};
use crate::types::{ConversationHistory, Direction, Role};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOutcome {
    /// Responder had nothing more to say
    Completed,
    /// Maximum number of rounds reached
    RoundLimit,
    /// User cancelled
    Cancelled,
}

impl std::fmt::Display for SessionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionOutcome::Completed => write!(f, "completed"),
            SessionOutcome::RoundLimit => write!(f, "round limit"),
            SessionOutcome::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Everything a session leaves behind
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub role: Role,
    pub outcome: SessionOutcome,
    /// Speaking turns taken
    pub rounds: u32,
    pub history: ConversationHistory,
}

impl SessionReport {
    /// Conversation log for terminal display (with colors)
    pub fn to_terminal_lines(&self) -> Vec<String> {
        self.history
            .exchanges()
            .iter()
            .map(|e| match e.direction {
                Direction::Sent => format!("  >>> SENT       {}", e.text).green().to_string(),
                Direction::Received => format!("  <<< RECEIVED   {}", e.text).cyan().to_string(),
            })
            .collect()
    }

    /// Conversation log for parseable output (no colors)
    pub fn to_parseable_lines(&self) -> Vec<String> {
        self.history
            .exchanges()
            .iter()
            .map(|e| format!("{}={}", e.direction, e.text))
            .collect()
    }
}
