//! Mailbox: asynchronous hand-off to an external decision process
//!
//! `put` delivers a prompt, `get` waits (optionally bounded) for the reply.
//! Two transports: an in-process channel and a pair of files polled on disk.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::MailboxError;
use crate::types::Direction;

/// What a responder is asked to answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    /// Text just received, if the peer's last message was non-empty
    pub received: Option<String>,
    /// Conversation so far, oldest first
    pub history: Vec<(Direction, String)>,
    /// Nothing has been said yet
    pub opening: bool,
}

#[async_trait]
pub trait Mailbox: Send {
    async fn put(&mut self, prompt: &Prompt) -> Result<(), MailboxError>;

    /// Next reply; `Ok(None)` when `timeout` elapsed first
    async fn get(&mut self, timeout: Option<Duration>) -> Result<Option<String>, MailboxError>;

    /// Tell the other side the conversation is over
    async fn close(&mut self) -> Result<(), MailboxError> {
        Ok(())
    }
}

// =============================================================================
// CHANNEL MAILBOX
// =============================================================================

/// In-process mailbox backed by tokio channels
#[derive(Debug)]
pub struct ChannelMailbox {
    prompts: mpsc::UnboundedSender<Prompt>,
    replies: mpsc::UnboundedReceiver<String>,
}

/// The decision-process end of a `ChannelMailbox`
#[derive(Debug)]
pub struct MailboxPeer {
    prompts: mpsc::UnboundedReceiver<Prompt>,
    replies: mpsc::UnboundedSender<String>,
}

impl ChannelMailbox {
    pub fn pair() -> (ChannelMailbox, MailboxPeer) {
        let (prompt_tx, prompt_rx) = mpsc::unbounded_channel();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        (
            ChannelMailbox { prompts: prompt_tx, replies: reply_rx },
            MailboxPeer { prompts: prompt_rx, replies: reply_tx },
        )
    }
}

impl MailboxPeer {
    /// Next prompt; `None` once the mailbox is dropped
    pub async fn next_prompt(&mut self) -> Option<Prompt> {
        self.prompts.recv().await
    }

    pub fn reply(&self, text: impl Into<String>) -> Result<(), MailboxError> {
        self.replies.send(text.into()).map_err(|_| MailboxError::Closed)
    }
}

#[async_trait]
impl Mailbox for ChannelMailbox {
    async fn put(&mut self, prompt: &Prompt) -> Result<(), MailboxError> {
        self.prompts.send(prompt.clone()).map_err(|_| MailboxError::Closed)
    }

    async fn get(&mut self, timeout: Option<Duration>) -> Result<Option<String>, MailboxError> {
        let reply = match timeout {
            Some(limit) => match tokio::time::timeout(limit, self.replies.recv()).await {
                Ok(reply) => reply,
                Err(_) => return Ok(None),
            },
            None => self.replies.recv().await,
        };
        reply.map(Some).ok_or(MailboxError::Closed)
    }
}

// =============================================================================
// FILE MAILBOX
// =============================================================================

/// Written to the input file by `close`
pub const QUIT_MESSAGE: &str = "QUIT";

/// Mailbox over two files: prompts are written as JSON to `input`, replies
/// are read (and removed) from `response`.
#[derive(Debug, Clone)]
pub struct FileMailbox {
    input: PathBuf,
    response: PathBuf,
    poll_interval: Duration,
}

impl FileMailbox {
    pub fn new(input: impl Into<PathBuf>, response: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            response: response.into(),
            poll_interval: Duration::from_millis(100),
        }
    }

    /// `<name>_prompt.json` and `<name>_reply.txt` inside `dir`
    pub fn in_dir(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref();
        Self::new(
            dir.join(format!("{}_prompt.json", name)),
            dir.join(format!("{}_reply.txt", name)),
        )
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn input_path(&self) -> &Path {
        &self.input
    }

    pub fn response_path(&self) -> &Path {
        &self.response
    }

    /// Remove both files, ignoring ones that do not exist
    pub async fn cleanup(&self) -> Result<(), MailboxError> {
        for path in [&self.input, &self.response] {
            match tokio::fs::remove_file(path).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }

    /// A blank file is left alone: the writer may not have filled it yet
    async fn take_response(&self) -> Result<Option<String>, MailboxError> {
        match tokio::fs::read_to_string(&self.response).await {
            Ok(text) if text.trim().is_empty() => Ok(None),
            Ok(text) => {
                tokio::fs::remove_file(&self.response).await?;
                Ok(Some(text.trim().to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl Mailbox for FileMailbox {
    async fn put(&mut self, prompt: &Prompt) -> Result<(), MailboxError> {
        let json = serde_json::to_string(prompt)?;
        tokio::fs::write(&self.input, json).await?;
        debug!(path = %self.input.display(), "prompt written");
        Ok(())
    }

    async fn get(&mut self, timeout: Option<Duration>) -> Result<Option<String>, MailboxError> {
        let start = Instant::now();
        loop {
            if let Some(text) = self.take_response().await? {
                return Ok(Some(text));
            }
            if let Some(limit) = timeout {
                if start.elapsed() >= limit {
                    return Ok(None);
                }
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn close(&mut self) -> Result<(), MailboxError> {
        tokio::fs::write(&self.input, QUIT_MESSAGE).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(received: Option<&str>) -> Prompt {
        Prompt {
            received: received.map(str::to_string),
            history: Vec::new(),
            opening: received.is_none(),
        }
    }

    #[tokio::test]
    async fn test_channel_round_trip() {
        let (mut mailbox, mut peer) = ChannelMailbox::pair();
        mailbox.put(&prompt(Some("HI"))).await.unwrap();

        let received = peer.next_prompt().await.unwrap();
        assert_eq!(received.received.as_deref(), Some("HI"));
        peer.reply("HELLO").unwrap();

        let reply = mailbox.get(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("HELLO"));
    }

    #[tokio::test]
    async fn test_channel_timeout_is_none() {
        let (mut mailbox, _peer) = ChannelMailbox::pair();
        let reply = mailbox.get(Some(Duration::from_millis(20))).await.unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_channel_closed_peer() {
        let (mut mailbox, peer) = ChannelMailbox::pair();
        drop(peer);
        assert!(matches!(mailbox.get(None).await, Err(MailboxError::Closed)));
        assert!(matches!(mailbox.put(&prompt(None)).await, Err(MailboxError::Closed)));
    }

    #[tokio::test]
    async fn test_file_mailbox_consumes_response() {
        let dir = tempfile::tempdir().unwrap();
        let mut mailbox = FileMailbox::new(dir.path().join("input"), dir.path().join("response"))
            .with_poll_interval(Duration::from_millis(5));

        mailbox.put(&prompt(Some("HOW"))).await.unwrap();
        let written = std::fs::read_to_string(mailbox.input_path()).unwrap();
        assert!(written.contains("\"HOW\""));

        std::fs::write(mailbox.response_path(), "good\n").unwrap();
        let reply = mailbox.get(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("good"));
        assert!(!mailbox.response_path().exists());
    }

    #[tokio::test]
    async fn test_file_mailbox_waits_for_blank_reply_to_fill() {
        let dir = tempfile::tempdir().unwrap();
        let mut mailbox = FileMailbox::in_dir(dir.path(), "b").with_poll_interval(Duration::from_millis(5));
        assert_eq!(mailbox.response_path(), dir.path().join("b_reply.txt"));

        // Created but not yet written
        std::fs::write(mailbox.response_path(), "").unwrap();
        let reply = mailbox.get(Some(Duration::from_millis(30))).await.unwrap();
        assert_eq!(reply, None);
        assert!(mailbox.response_path().exists());

        std::fs::write(mailbox.response_path(), "fine").unwrap();
        let reply = mailbox.get(Some(Duration::from_secs(1))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("fine"));
    }

    #[tokio::test]
    async fn test_file_mailbox_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let mut mailbox = FileMailbox::new(dir.path().join("input"), dir.path().join("response"))
            .with_poll_interval(Duration::from_millis(5));
        let reply = mailbox.get(Some(Duration::from_millis(30))).await.unwrap();
        assert_eq!(reply, None);
    }

    #[tokio::test]
    async fn test_file_mailbox_close_and_cleanup() {
        let dir = tempfile::tempdir().unwrap();
        let mut mailbox = FileMailbox::new(dir.path().join("input"), dir.path().join("response"));
        mailbox.close().await.unwrap();
        assert_eq!(std::fs::read_to_string(mailbox.input_path()).unwrap(), QUIT_MESSAGE);

        mailbox.cleanup().await.unwrap();
        assert!(!mailbox.input_path().exists());
        // Second cleanup is a no-op
        mailbox.cleanup().await.unwrap();
    }
}
