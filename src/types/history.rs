//! Conversation history
//!
//! - Exchange = one completed send or receive
//! - History = append-only log of exchanges for one session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which way a message travelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Sent => write!(f, "sent"),
            Direction::Received => write!(f, "received"),
        }
    }
}

/// A single completed message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exchange {
    pub direction: Direction,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

impl Exchange {
    /// Create a new exchange with current timestamp
    pub fn new(direction: Direction, text: impl Into<String>) -> Self {
        Self {
            direction,
            text: text.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Append-only conversation log
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistory {
    exchanges: Vec<Exchange>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&mut self, text: impl Into<String>) {
        self.exchanges.push(Exchange::new(Direction::Sent, text));
    }

    pub fn record_received(&mut self, text: impl Into<String>) {
        self.exchanges.push(Exchange::new(Direction::Received, text));
    }

    /// All exchanges (oldest first)
    pub fn exchanges(&self) -> &[Exchange] {
        &self.exchanges
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }

    /// Texts travelling in one direction, in order
    pub fn texts(&self, direction: Direction) -> Vec<&str> {
        self.exchanges
            .iter()
            .filter(|e| e.direction == direction)
            .map(|e| e.text.as_str())
            .collect()
    }

    /// Text of the latest exchange if it was received
    pub fn last_received(&self) -> Option<&str> {
        match self.exchanges.last() {
            Some(e) if e.direction == Direction::Received => Some(e.text.as_str()),
            _ => None,
        }
    }

    /// `(direction, text)` pairs, the shape handed to responders
    pub fn pairs(&self) -> Vec<(Direction, String)> {
        self.exchanges
            .iter()
            .map(|e| (e.direction, e.text.clone()))
            .collect()
    }
}
