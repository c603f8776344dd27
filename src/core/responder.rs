//! Responders: decide what to say next
//!
//! A responder sees the text just received plus the history and returns the
//! next message, or `None` when it has nothing more to say. Whatever comes
//! back is passed through `sanitize_message` before it is spelled.

use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info};

use crate::config::ConversationConfig;
use crate::core::mailbox::{Mailbox, Prompt};
use crate::error::ResponderError;
use crate::types::Direction;

lazy_static! {
    // Anything that is not an uppercase letter or whitespace
    static ref RE_NON_LETTER: Regex = Regex::new(r"[^A-Z\s]").unwrap();

    // Canned replies for the built-in vocabulary
    static ref RESPONSES: HashMap<&'static str, &'static str> = [
        ("HI", "HELLO"),
        ("HELLO", "HI"),
        ("HEY", "HI"),
        ("HOW", "GOOD"),
        ("GOOD", "THANKS"),
        ("THANKS", "WELCOME"),
        ("WELCOME", "BYE"),
        ("BYE", "BYE"),
        ("YES", "OK"),
        ("NO", "OK"),
        ("OK", "COOL"),
        ("COOL", "NICE"),
        ("NICE", "THANKS"),
        ("WHAT", "NOTHING"),
        ("WHO", "ME"),
        ("NAME", "GRETCHEN"),
    ]
    .into_iter()
    .collect();
}

/// Opening line of the vocabulary responder
pub const GREETING: &str = "HI";

/// Reply when nothing else fits
pub const ACKNOWLEDGEMENT: &str = "OK";

#[async_trait]
pub trait Responder: Send {
    /// Next message to spell; `Ok(None)` ends the conversation
    async fn respond(&mut self, prompt: &Prompt) -> Result<Option<String>, ResponderError>;

    fn name(&self) -> &'static str;

    /// Session is over
    async fn close(&mut self) -> Result<(), ResponderError> {
        Ok(())
    }
}

/// Uppercase, keep spellable letters, cap word length
///
/// Returns `None` when nothing spellable is left.
pub fn sanitize_message(raw: &str, config: &ConversationConfig) -> Option<String> {
    let upper = raw.to_uppercase();
    let letters = RE_NON_LETTER.replace_all(&upper, "");
    let words: Vec<String> = letters
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| config.is_spellable(*c))
                .take(config.max_word_len)
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect();

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

// =============================================================================
// VOCABULARY
// =============================================================================

/// Looks the received words up in a small table of canned replies
#[derive(Debug, Clone, Default)]
pub struct VocabularyResponder {
    conversation: ConversationConfig,
}

impl VocabularyResponder {
    pub fn new(conversation: ConversationConfig) -> Self {
        Self { conversation }
    }

    /// Reply to one received message
    pub fn reply_to(&self, received: &str) -> String {
        let words: Vec<&str> = received.split_whitespace().collect();
        if let Some(reply) = words.iter().find_map(|w| RESPONSES.get(w)) {
            return reply.to_string();
        }
        // Unknown word: echo what can be spelled of it
        sanitize_message(received, &self.conversation)
            .unwrap_or_else(|| ACKNOWLEDGEMENT.to_string())
    }
}

#[async_trait]
impl Responder for VocabularyResponder {
    async fn respond(&mut self, prompt: &Prompt) -> Result<Option<String>, ResponderError> {
        let reply = match prompt.received.as_deref() {
            Some(received) => self.reply_to(received),
            None => GREETING.to_string(),
        };
        Ok(Some(reply))
    }

    fn name(&self) -> &'static str {
        "vocabulary"
    }
}

// =============================================================================
// SCRIPT
// =============================================================================

/// Speaks a fixed list of messages, one per turn, then stops
#[derive(Debug, Clone)]
pub struct ScriptResponder {
    lines: Vec<String>,
    next: usize,
}

impl ScriptResponder {
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            lines: lines.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }

    /// Parse a comma separated script
    pub fn parse(script: &str) -> Self {
        Self::new(script.split(',').map(str::trim).filter(|line| !line.is_empty()))
    }

    /// Demo script for the first agent
    pub fn demo_a() -> Self {
        Self::new(["HELLO", "HOW", "GOOD", "BYE"])
    }

    /// Demo script for the second agent
    pub fn demo_b() -> Self {
        Self::new(["HI", "GOOD", "THANKS", "BYE"])
    }

    pub fn remaining(&self) -> usize {
        self.lines.len().saturating_sub(self.next)
    }
}

#[async_trait]
impl Responder for ScriptResponder {
    async fn respond(&mut self, _prompt: &Prompt) -> Result<Option<String>, ResponderError> {
        let line = self.lines.get(self.next).cloned();
        if line.is_some() {
            self.next += 1;
        } else {
            info!("script exhausted");
        }
        Ok(line)
    }

    fn name(&self) -> &'static str {
        "script"
    }
}

// =============================================================================
// MAILBOX
// =============================================================================

/// Hands each prompt to an external process through a mailbox
#[derive(Debug)]
pub struct MailboxResponder<M: Mailbox> {
    mailbox: M,
    wait: Option<Duration>,
}

impl<M: Mailbox> MailboxResponder<M> {
    /// `wait` bounds each `get`; `None` waits until the reply or cancellation
    pub fn new(mailbox: M, wait: Option<Duration>) -> Self {
        Self { mailbox, wait }
    }

    pub fn mailbox(&self) -> &M {
        &self.mailbox
    }
}

#[async_trait]
impl<M: Mailbox> Responder for MailboxResponder<M> {
    async fn respond(&mut self, prompt: &Prompt) -> Result<Option<String>, ResponderError> {
        self.mailbox.put(prompt).await?;
        match self.mailbox.get(self.wait).await? {
            Some(reply) if reply.trim().is_empty() => Err(ResponderError::Empty),
            Some(reply) => Ok(Some(reply)),
            None => Err(ResponderError::Timeout(self.wait.unwrap_or_default())),
        }
    }

    fn name(&self) -> &'static str {
        "mailbox"
    }

    async fn close(&mut self) -> Result<(), ResponderError> {
        self.mailbox.close().await?;
        Ok(())
    }
}

// =============================================================================
// COMMAND
// =============================================================================

/// Runs an external command per turn with the rendered prompt as its last
/// argument; stdout is the reply.
#[derive(Debug, Clone)]
pub struct CommandResponder {
    program: String,
    args: Vec<String>,
    conversation: ConversationConfig,
}

impl CommandResponder {
    pub fn new(program: impl Into<String>, args: Vec<String>, conversation: ConversationConfig) -> Self {
        Self {
            program: program.into(),
            args,
            conversation,
        }
    }

    /// Parse `"program arg1 arg2"`
    pub fn from_command_line(line: &str, conversation: ConversationConfig) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self::new(program, parts.collect(), conversation))
    }
}

/// Plain-text instruction for a language model behind a command
pub fn render_prompt(prompt: &Prompt, conversation: &ConversationConfig) -> String {
    let mut text = format!(
        "You are chatting by spelling words letter by letter. Reply with one short word \
         of at most {} letters, using only these letters: {}. Reply with the word only.\n",
        conversation.max_word_len, conversation.alphabet
    );
    if !prompt.history.is_empty() {
        text.push_str("\nConversation so far:\n");
        for (direction, message) in &prompt.history {
            let who = match direction {
                Direction::Sent => "YOU",
                Direction::Received => "THEM",
            };
            text.push_str(&format!("{}: {}\n", who, message));
        }
    }
    match &prompt.received {
        Some(received) => text.push_str(&format!("\nThey just said: {}\n", received)),
        None => text.push_str("\nStart the conversation.\n"),
    }
    text
}

#[async_trait]
impl Responder for CommandResponder {
    async fn respond(&mut self, prompt: &Prompt) -> Result<Option<String>, ResponderError> {
        let rendered = render_prompt(prompt, &self.conversation);
        debug!(program = %self.program, "running responder command");

        let output = tokio::process::Command::new(&self.program)
            .args(&self.args)
            .arg(rendered)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ResponderError::Unavailable(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let reply = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if reply.is_empty() {
            return Err(ResponderError::Empty);
        }
        Ok(Some(reply))
    }

    fn name(&self) -> &'static str {
        "command"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mailbox::{ChannelMailbox, FileMailbox};
    use pretty_assertions::assert_eq;

    fn prompt(received: Option<&str>) -> Prompt {
        Prompt {
            received: received.map(str::to_string),
            history: Vec::new(),
            opening: received.is_none(),
        }
    }

    #[test]
    fn test_sanitize_strips_and_uppercases() {
        let config = ConversationConfig::default();
        assert_eq!(sanitize_message("hello!", &config), Some("HELLO".to_string()));
        assert_eq!(sanitize_message("  I'm   fine. ", &config), Some("IM FINE".to_string()));
    }

    #[test]
    fn test_sanitize_drops_motion_letters_and_caps_length() {
        let config = ConversationConfig::default();
        // J and Z cannot be spelled
        assert_eq!(sanitize_message("jazz", &config), Some("A".to_string()));
        assert_eq!(
            sanitize_message("wonderfully", &config),
            Some("WONDERFU".to_string())
        );
    }

    #[test]
    fn test_sanitize_nothing_spellable() {
        let config = ConversationConfig::default();
        assert_eq!(sanitize_message("123 ?!", &config), None);
        assert_eq!(sanitize_message("", &config), None);
        assert_eq!(sanitize_message("zzz", &config), None);
    }

    #[tokio::test]
    async fn test_vocabulary_opens_and_replies() {
        let mut responder = VocabularyResponder::default();
        let opening = responder.respond(&prompt(None)).await.unwrap();
        assert_eq!(opening.as_deref(), Some("HI"));

        let reply = responder.respond(&prompt(Some("HOW"))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("GOOD"));
    }

    #[test]
    fn test_vocabulary_unknown_word_is_echoed() {
        let responder = VocabularyResponder::default();
        assert_eq!(responder.reply_to("CAT"), "CAT");
        assert_eq!(responder.reply_to("SAY HI"), "HELLO");
        assert_eq!(responder.reply_to(""), "OK");
    }

    #[tokio::test]
    async fn test_script_runs_out() {
        let mut responder = ScriptResponder::parse("HELLO, BYE,");
        assert_eq!(responder.remaining(), 2);
        assert_eq!(responder.respond(&prompt(None)).await.unwrap().as_deref(), Some("HELLO"));
        assert_eq!(responder.respond(&prompt(Some("HI"))).await.unwrap().as_deref(), Some("BYE"));
        assert_eq!(responder.respond(&prompt(Some("BYE"))).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mailbox_responder_round_trip() {
        let (mailbox, mut peer) = ChannelMailbox::pair();
        let mut responder = MailboxResponder::new(mailbox, Some(Duration::from_secs(1)));

        let answer = tokio::spawn(async move {
            let prompt = peer.next_prompt().await.unwrap();
            assert_eq!(prompt.received.as_deref(), Some("HI"));
            peer.reply("hello").unwrap();
            peer
        });

        let reply = responder.respond(&prompt(Some("HI"))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("hello"));
        answer.await.unwrap();
    }

    #[tokio::test]
    async fn test_mailbox_responder_timeout() {
        let (mailbox, _peer) = ChannelMailbox::pair();
        let mut responder = MailboxResponder::new(mailbox, Some(Duration::from_millis(20)));
        let err = responder.respond(&prompt(None)).await.unwrap_err();
        assert!(matches!(err, ResponderError::Timeout(_)));
    }

    #[test]
    fn test_render_prompt_lists_history() {
        let config = ConversationConfig::default();
        let prompt = Prompt {
            received: Some("GOOD".to_string()),
            history: vec![
                (Direction::Sent, "HOW".to_string()),
                (Direction::Received, "GOOD".to_string()),
            ],
            opening: false,
        };
        let text = render_prompt(&prompt, &config);
        assert!(text.contains("YOU: HOW"));
        assert!(text.contains("THEM: GOOD"));
        assert!(text.contains("They just said: GOOD"));
        assert!(text.contains(&config.alphabet));
    }

    #[tokio::test]
    async fn test_command_responder_missing_program() {
        let mut responder = CommandResponder::new(
            "signchat-no-such-program",
            Vec::new(),
            ConversationConfig::default(),
        );
        let err = responder.respond(&prompt(None)).await.unwrap_err();
        assert!(matches!(err, ResponderError::Io(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_responder_failing_program() {
        let mut responder = CommandResponder::new(
            "sh",
            vec!["-c".to_string(), "exit 3".to_string()],
            ConversationConfig::default(),
        );
        let err = responder.respond(&prompt(None)).await.unwrap_err();
        assert!(matches!(err, ResponderError::Unavailable(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_command_responder_reads_stdout() {
        let mut responder = CommandResponder::new(
            "sh",
            vec!["-c".to_string(), "echo good".to_string()],
            ConversationConfig::default(),
        );
        let reply = responder.respond(&prompt(Some("HOW"))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("good"));
    }

    #[tokio::test]
    async fn test_mailbox_responder_over_files() {
        let dir = tempfile::tempdir().unwrap();
        let mailbox = FileMailbox::in_dir(dir.path(), "a").with_poll_interval(Duration::from_millis(5));
        let prompt_path = mailbox.input_path().to_path_buf();
        let reply_path = mailbox.response_path().to_path_buf();
        let mut responder = MailboxResponder::new(mailbox, Some(Duration::from_secs(2)));

        // An outside decider answers once the prompt file shows up
        let decider = tokio::spawn(async move {
            loop {
                let text = tokio::fs::read_to_string(&prompt_path).await.unwrap_or_default();
                if let Ok(prompt) = serde_json::from_str::<Prompt>(&text) {
                    tokio::fs::write(&reply_path, "thanks\n").await.unwrap();
                    return prompt;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        let reply = responder.respond(&prompt(Some("GOOD"))).await.unwrap();
        assert_eq!(reply.as_deref(), Some("thanks"));
        let seen = decider.await.unwrap();
        assert_eq!(seen.received.as_deref(), Some("GOOD"));

        responder.close().await.unwrap();
        let quit = std::fs::read_to_string(dir.path().join("a_prompt.json")).unwrap();
        assert_eq!(quit, crate::core::mailbox::QUIT_MESSAGE);
    }
}
