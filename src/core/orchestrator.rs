//! Conversation orchestrator: one agent's session loop
//!
//! Drives the turn machine from camera frames, spells outgoing messages on
//! the display and assembles incoming ones from classifier output. Every
//! wait is a poll loop that checks cancellation once per tick; collaborator
//! failures cost a tick, never the session.

use std::time::{Duration, Instant};

use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::error::ConfigError;
use crate::core::accumulator::SymbolAccumulator;
use crate::core::assembler::MessageAssembler;
use crate::core::collaborators::{
    Camera, CancelHandle, Cancellation, Classification, Classifier, Display,
};
use crate::core::mailbox::Prompt;
use crate::core::responder::{sanitize_message, Responder};
use crate::core::signal_decoder::SignalDecoder;
use crate::core::turn::TurnStateMachine;
use crate::types::{
    ConversationHistory, Frame, Role, SessionOutcome, SessionReport, Signal, TurnEvent, TurnState,
};

/// Shown while the responder is thinking
const THINKING_TEXT: &str = "...";

/// Session was cancelled; unwinds every wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cancelled;

/// The external pieces an agent runs with
pub struct Collaborators {
    pub camera: Box<dyn Camera>,
    pub display: Box<dyn Display>,
    pub classifier: Box<dyn Classifier>,
    pub responder: Box<dyn Responder>,
}

/// Camera and display of a running session, released when dropped
///
/// Dropping the session future mid-turn still releases both.
struct Devices {
    camera: Box<dyn Camera>,
    display: Box<dyn Display>,
}

impl Drop for Devices {
    fn drop(&mut self) {
        self.camera.release();
        self.display.release();
        debug!("camera and display released");
    }
}

pub struct ConversationOrchestrator {
    config: Config,
    role: Role,
    devices: Devices,
    classifier: Box<dyn Classifier>,
    responder: Box<dyn Responder>,
    cancel: Cancellation,
    decoder: SignalDecoder,
    accumulator: SymbolAccumulator,
    assembler: MessageAssembler,
    turn: TurnStateMachine,
    history: ConversationHistory,
    rounds: u32,
}

impl ConversationOrchestrator {
    /// Build an agent; the configuration is validated first
    pub fn new(
        config: Config,
        role: Role,
        collaborators: Collaborators,
        cancel: Cancellation,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            decoder: SignalDecoder::new(config.signal.clone()),
            accumulator: SymbolAccumulator::new(config.accumulator.clone()),
            assembler: MessageAssembler::new(config.assembler.clone()),
            turn: TurnStateMachine::new(&config.turn),
            history: ConversationHistory::new(),
            rounds: 0,
            devices: Devices {
                camera: collaborators.camera,
                display: collaborators.display,
            },
            classifier: collaborators.classifier,
            responder: collaborators.responder,
            cancel,
            config,
            role,
        })
    }

    /// Run the session to its end and release the camera and display
    pub async fn run(mut self) -> SessionReport {
        info!(
            role = %self.role,
            classifier = self.classifier.name(),
            responder = self.responder.name(),
            max_rounds = self.config.conversation.max_rounds,
            "session starting"
        );

        let outcome = match self.drive().await {
            Ok(outcome) => outcome,
            Err(Cancelled) => SessionOutcome::Cancelled,
        };

        if let Err(e) = self.responder.close().await {
            warn!(error = %e, "failed to close responder");
        }
        drop(self.devices);

        info!(role = %self.role, %outcome, rounds = self.rounds, "session ended");
        SessionReport {
            role: self.role,
            outcome,
            rounds: self.rounds,
            history: self.history,
        }
    }

    async fn drive(&mut self) -> Result<SessionOutcome, Cancelled> {
        self.turn.begin(self.role, self.config.turn.handshake);
        self.devices.display.render_blank(self.turn.border_color());

        loop {
            self.check_cancel()?;
            if self.rounds >= self.config.conversation.max_rounds {
                info!(rounds = self.rounds, "round limit reached");
                return Ok(SessionOutcome::RoundLimit);
            }

            match self.turn.state() {
                TurnState::Speaking => {
                    if !self.speak_turn().await? {
                        return Ok(SessionOutcome::Completed);
                    }
                }
                TurnState::DoneSpeaking => self.hold_done().await?,
                TurnState::Listening => self.listen_turn().await?,
                TurnState::WaitingForTurn => self.wait_for_turn().await?,
                TurnState::Idle => {
                    self.turn.begin(self.role, self.config.turn.handshake);
                }
            }
        }
    }

    fn check_cancel(&mut self) -> Result<(), Cancelled> {
        if self.cancel.is_cancelled() || self.devices.display.poll_cancel() {
            debug!("cancel requested");
            return Err(Cancelled);
        }
        Ok(())
    }

    /// Sleep for `duration` in poll ticks
    async fn hold(&mut self, duration: Duration) -> Result<(), Cancelled> {
        let poll = self.config.timing.poll_interval();
        let start = Instant::now();
        loop {
            self.check_cancel()?;
            let elapsed = start.elapsed();
            if elapsed >= duration {
                return Ok(());
            }
            tokio::time::sleep(poll.min(duration - elapsed)).await;
        }
    }

    // =========================================================================
    // SPEAKING
    // =========================================================================

    /// One speaking turn; `false` when the responder is finished
    async fn speak_turn(&mut self) -> Result<bool, Cancelled> {
        let Some(message) = self.compose().await? else {
            info!("responder has nothing more to say");
            return Ok(false);
        };

        self.rounds += 1;
        info!(round = self.rounds, %message, "sending");
        self.spell(&message).await?;
        self.history.record_sent(message);

        self.turn.finish_speaking(Instant::now());
        self.devices.display.render_blank(self.turn.border_color());
        self.hold_done().await?;
        Ok(true)
    }

    /// Ask the responder, bounded by the responder timeout
    ///
    /// Failures, timeouts and unspellable replies fall back to the
    /// configured message.
    async fn compose(&mut self) -> Result<Option<String>, Cancelled> {
        let prompt = Prompt {
            received: self.history.last_received().map(str::to_string),
            history: self.history.pairs(),
            opening: self.history.is_empty(),
        };
        self.devices.display.render_text(THINKING_TEXT, self.turn.border_color());

        let limit = self.config.timing.responder_timeout();
        let poll = self.config.timing.poll_interval();
        let fallback = self.config.conversation.fallback_message.clone();

        let result = {
            let reply = tokio::time::timeout(limit, self.responder.respond(&prompt));
            tokio::pin!(reply);
            let mut ticker = tokio::time::interval(poll);
            loop {
                tokio::select! {
                    result = &mut reply => break result,
                    _ = ticker.tick() => {
                        if self.cancel.is_cancelled() || self.devices.display.poll_cancel() {
                            return Err(Cancelled);
                        }
                    }
                }
            }
        };

        let message = match result {
            Ok(Ok(Some(raw))) => match sanitize_message(&raw, &self.config.conversation) {
                Some(message) => message,
                None => {
                    warn!(%raw, "reply has nothing spellable, using fallback");
                    fallback
                }
            },
            Ok(Ok(None)) => return Ok(None),
            Ok(Err(e)) => {
                warn!(error = %e, "responder failed, using fallback");
                fallback
            }
            Err(_) => {
                warn!(timeout = ?limit, "responder timed out, using fallback");
                fallback
            }
        };
        Ok(Some(message))
    }

    /// Show each letter, then the whole message
    async fn spell(&mut self, message: &str) -> Result<(), Cancelled> {
        let timing = self.config.timing.clone();
        let border = self.turn.border_color();

        for symbol in message.chars() {
            if symbol == ' ' {
                self.devices.display.render_blank(border);
                self.hold(timing.word_gap()).await?;
                continue;
            }
            if !self.config.conversation.is_spellable(symbol) {
                debug!(%symbol, "not in alphabet, skipped");
                continue;
            }
            trace!(%symbol, "showing letter");
            self.devices.display.render_symbol(symbol, border);
            self.hold(timing.letter_hold()).await?;
            self.devices.display.render_blank(border);
            self.hold(timing.letter_pause()).await?;
        }

        self.devices.display.render_text(message, border);
        self.hold(timing.message_hold()).await
    }

    /// Keep the done signal up until the turn machine moves to LISTENING
    async fn hold_done(&mut self) -> Result<(), Cancelled> {
        let poll = self.config.timing.poll_interval();
        while self.turn.state() == TurnState::DoneSpeaking {
            self.check_cancel()?;
            if let Some(TurnEvent::DoneTimeout) = self.turn.update(Signal::None, Instant::now()) {
                self.devices.display.render_blank(self.turn.border_color());
                return Ok(());
            }
            tokio::time::sleep(poll).await;
        }
        Ok(())
    }

    // =========================================================================
    // LISTENING
    // =========================================================================

    /// Wait until the peer shows it is ready to listen
    async fn wait_for_turn(&mut self) -> Result<(), Cancelled> {
        let poll = self.config.timing.poll_interval();
        info!("waiting for peer to listen");
        while self.turn.state() == TurnState::WaitingForTurn {
            self.check_cancel()?;
            if let Some(frame) = self.devices.camera.read_frame() {
                let signal = self.decoder.decode(&frame);
                if self.turn.update(signal, Instant::now()) == Some(TurnEvent::TurnReceived) {
                    info!("peer is listening");
                    return Ok(());
                }
            } else {
                trace!("frame read failed");
            }
            tokio::time::sleep(poll).await;
        }
        Ok(())
    }

    /// One listening phase, until the peer hands over or goes silent
    async fn listen_turn(&mut self) -> Result<(), Cancelled> {
        let poll = self.config.timing.poll_interval();
        let classify_interval = self.config.timing.classify_interval();

        self.accumulator.reset();
        self.assembler.clear();
        self.devices.display.render_blank(self.turn.border_color());

        // Letters are read only once the peer has shown GREEN this phase
        let mut reading = false;
        let mut next_classification: Option<Instant> = None;

        loop {
            self.check_cancel()?;
            let now = Instant::now();

            match self.devices.camera.read_frame() {
                Some(frame) => {
                    let signal = self.decoder.decode(&frame);
                    match self.turn.update(signal, now) {
                        Some(TurnEvent::TurnReceived) => {
                            let message = self.assembler.finalize();
                            return self.accept(message).await;
                        }
                        Some(TurnEvent::LetterIncoming) if !reading => {
                            debug!("peer started spelling");
                            reading = true;
                        }
                        _ => {}
                    }

                    let due = next_classification.map_or(true, |at| now >= at);
                    if reading && due {
                        let scheduled = next_classification.unwrap_or(now);
                        next_classification =
                            Some(next_classification_after(scheduled, now, classify_interval));
                        self.classify(&frame, now);
                    }
                }
                None => trace!("frame read failed"),
            }

            if self.assembler.is_done(now) {
                info!("message ended by silence");
                let message = self.assembler.finalize();
                self.turn.claim_turn();
                return self.accept(message).await;
            }

            tokio::time::sleep(poll).await;
        }
    }

    /// Classify one frame and feed the result forward
    fn classify(&mut self, frame: &Frame, now: Instant) {
        let classification = match self.classifier.classify(frame) {
            Ok(classification) => classification,
            Err(e) => {
                debug!(error = %e, "classification failed, treated as no symbol");
                Classification::empty()
            }
        };

        let confirmed = self.accumulator.update(classification.symbol);
        if let Some(symbol) = confirmed {
            debug!(%symbol, confidence = classification.confidence, "letter confirmed");
        }
        self.assembler.observe(confirmed, classification.hand_present, now);
    }

    /// Record and show back a received message
    async fn accept(&mut self, message: String) -> Result<(), Cancelled> {
        if message.is_empty() {
            warn!("turn handed over without a readable message");
            return Ok(());
        }

        info!(%message, "received");
        self.devices.display
            .render_text(&format!("GOT: {}", message), self.turn.border_color());
        self.history.record_received(message);
        self.hold(self.config.timing.received_hold()).await
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn state(&self) -> TurnState {
        self.turn.state()
    }

    pub fn history(&self) -> &ConversationHistory {
        &self.history
    }
}

/// Next classification time on a fixed grid
///
/// The grid advances by `interval` from the slot just served, so a late tick
/// (a failed frame read, a slow poll) is made up on the next one. A tick more
/// than one interval late restarts the grid at `now`.
fn next_classification_after(scheduled: Instant, now: Instant, interval: Duration) -> Instant {
    let next = scheduled + interval;
    if now >= next + interval {
        now
    } else {
        next
    }
}

/// Run two agents side by side until both sessions end
///
/// Both agents must hold a `Cancellation` from `stop`. When one session
/// ends the other is stopped, since it would otherwise wait for a peer that
/// is gone.
pub async fn run_pair(
    first: ConversationOrchestrator,
    second: ConversationOrchestrator,
    stop: CancelHandle,
) -> (SessionReport, SessionReport) {
    let stop_second = stop.clone();
    tokio::join!(
        async move {
            let report = first.run().await;
            stop_second.cancel();
            report
        },
        async move {
            let report = second.run().await;
            stop.cancel();
            report
        },
    )
}
