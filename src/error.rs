//! Error types
//!
//! None of these end a session: the orchestrator turns collaborator errors
//! into "no progress this tick" or a fallback message.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config value `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid { field, reason: reason.into() }
    }
}

/// A classifier back-end failed on one frame
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("frame is empty")]
    EmptyFrame,

    #[error("classifier back-end failed: {0}")]
    Backend(String),
}

/// Mailbox transport failures
#[derive(Debug, Error)]
pub enum MailboxError {
    #[error("mailbox closed")]
    Closed,

    #[error("mailbox I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode prompt: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Producing an outgoing message failed
#[derive(Debug, Error)]
pub enum ResponderError {
    #[error("responder timed out after {0:?}")]
    Timeout(Duration),

    #[error("responder unavailable: {0}")]
    Unavailable(String),

    #[error("responder returned nothing usable")]
    Empty,

    #[error(transparent)]
    Mailbox(#[from] MailboxError),

    #[error("responder I/O error: {0}")]
    Io(#[from] std::io::Error),
}
