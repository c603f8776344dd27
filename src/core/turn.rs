//! Turn state machine: half-duplex protocol over border colors
//!
//! State transitions:
//! - SPEAKING → DONE_SPEAKING: caller finished sending
//! - DONE_SPEAKING → LISTENING: done signal held for `done_duration`
//! - LISTENING + GREEN: stays, peer is showing a letter
//! - LISTENING + RED → SPEAKING: peer finished (GREEN need not have been seen)
//! - WAITING_FOR_TURN + CYAN → SPEAKING: peer is ready to listen
//!
//! A NONE signal never changes state.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::config::TurnConfig;
use crate::types::{BorderColor, Role, Signal, TurnEvent, TurnState};

/// Pure transition function
///
/// `done_elapsed` is the time spent in DONE_SPEAKING so far; it is ignored in
/// every other state.
pub fn transition(
    state: TurnState,
    signal: Signal,
    done_elapsed: Duration,
    done_duration: Duration,
) -> (TurnState, Option<TurnEvent>) {
    match state {
        TurnState::DoneSpeaking => {
            if done_elapsed >= done_duration {
                (TurnState::Listening, Some(TurnEvent::DoneTimeout))
            } else {
                (TurnState::DoneSpeaking, None)
            }
        }

        TurnState::Listening => match signal {
            Signal::Green => (TurnState::Listening, Some(TurnEvent::LetterIncoming)),
            Signal::Red => (TurnState::Speaking, Some(TurnEvent::TurnReceived)),
            _ => (TurnState::Listening, None),
        },

        TurnState::WaitingForTurn => match signal {
            Signal::Cyan => (TurnState::Speaking, Some(TurnEvent::TurnReceived)),
            _ => (TurnState::WaitingForTurn, None),
        },

        TurnState::Idle | TurnState::Speaking => (state, None),
    }
}

/// Turn state machine for one agent
#[derive(Debug, Clone)]
pub struct TurnStateMachine {
    state: TurnState,
    done_since: Option<Instant>,
    done_duration: Duration,
}

impl Default for TurnStateMachine {
    fn default() -> Self {
        Self::new(&TurnConfig::default())
    }
}

impl TurnStateMachine {
    /// Create a machine in IDLE
    pub fn new(config: &TurnConfig) -> Self {
        Self {
            state: TurnState::Idle,
            done_since: None,
            done_duration: config.done_duration(),
        }
    }

    /// Leave IDLE for the role's starting state
    ///
    /// A speaker with `handshake` waits for the peer's cyan border first.
    pub fn begin(&mut self, role: Role, handshake: bool) -> TurnState {
        let next = match role {
            Role::Speaker if handshake => TurnState::WaitingForTurn,
            Role::Speaker => TurnState::Speaking,
            Role::Listener => TurnState::Listening,
        };
        self.enter(next);
        next
    }

    /// Caller finished sending; start showing the done signal
    pub fn finish_speaking(&mut self, now: Instant) {
        self.enter(TurnState::DoneSpeaking);
        self.done_since = Some(now);
    }

    /// Take the turn without a signal (message ended by silence)
    pub fn claim_turn(&mut self) {
        self.enter(TurnState::Speaking);
    }

    /// Advance with the decoded peer signal
    pub fn update(&mut self, signal: Signal, now: Instant) -> Option<TurnEvent> {
        let done_elapsed = self
            .done_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();

        let (next, event) = transition(self.state, signal, done_elapsed, self.done_duration);
        if next != self.state {
            if let Some(event) = event {
                debug!(%event, %signal, "turn event");
            }
            self.enter(next);
        }
        event
    }

    fn enter(&mut self, next: TurnState) {
        if next != self.state {
            info!(from = %self.state, to = %next, "turn transition");
        }
        self.state = next;
        if next != TurnState::DoneSpeaking {
            self.done_since = None;
        }
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    /// Border this agent should currently render
    pub fn border_color(&self) -> BorderColor {
        self.state.border_color()
    }

    pub fn is_speaking(&self) -> bool {
        self.state == TurnState::Speaking
    }

    pub fn is_listening(&self) -> bool {
        self.state == TurnState::Listening
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(done_secs: f64) -> TurnStateMachine {
        TurnStateMachine::new(&TurnConfig {
            done_duration_seconds: done_secs,
            handshake: false,
        })
    }

    #[test]
    fn test_initial_state_is_idle() {
        let turn = machine(2.0);
        assert_eq!(turn.state(), TurnState::Idle);
        assert_eq!(turn.border_color(), BorderColor::Gray);
    }

    #[test]
    fn test_begin_by_role() {
        let mut turn = machine(2.0);
        assert_eq!(turn.begin(Role::Speaker, false), TurnState::Speaking);

        let mut turn = machine(2.0);
        assert_eq!(turn.begin(Role::Listener, false), TurnState::Listening);

        let mut turn = machine(2.0);
        assert_eq!(turn.begin(Role::Speaker, true), TurnState::WaitingForTurn);
    }

    #[test]
    fn test_done_speaking_times_out_to_listening() {
        let mut turn = machine(2.0);
        turn.begin(Role::Speaker, false);

        let t0 = Instant::now();
        turn.finish_speaking(t0);
        assert_eq!(turn.border_color(), BorderColor::Red);

        assert_eq!(turn.update(Signal::None, t0 + Duration::from_millis(1999)), None);
        assert_eq!(turn.state(), TurnState::DoneSpeaking);

        let event = turn.update(Signal::None, t0 + Duration::from_secs(2));
        assert_eq!(event, Some(TurnEvent::DoneTimeout));
        assert_eq!(turn.state(), TurnState::Listening);
    }

    #[test]
    fn test_done_speaking_ignores_peer_signals() {
        let mut turn = machine(2.0);
        turn.begin(Role::Speaker, false);
        let t0 = Instant::now();
        turn.finish_speaking(t0);
        assert_eq!(turn.update(Signal::Red, t0), None);
        assert_eq!(turn.state(), TurnState::DoneSpeaking);
    }

    #[test]
    fn test_green_while_listening_is_letter_incoming() {
        let mut turn = machine(2.0);
        turn.begin(Role::Listener, false);
        let event = turn.update(Signal::Green, Instant::now());
        assert_eq!(event, Some(TurnEvent::LetterIncoming));
        assert_eq!(turn.state(), TurnState::Listening);
    }

    #[test]
    fn test_red_without_green_takes_turn() {
        let mut turn = machine(2.0);
        turn.begin(Role::Listener, false);
        let event = turn.update(Signal::Red, Instant::now());
        assert_eq!(event, Some(TurnEvent::TurnReceived));
        assert_eq!(turn.state(), TurnState::Speaking);
    }

    #[test]
    fn test_none_holds_state() {
        let mut turn = machine(2.0);
        turn.begin(Role::Listener, false);
        assert_eq!(turn.update(Signal::None, Instant::now()), None);
        assert_eq!(turn.update(Signal::Cyan, Instant::now()), None);
        assert_eq!(turn.state(), TurnState::Listening);
    }

    #[test]
    fn test_waiting_for_turn_needs_cyan() {
        let mut turn = machine(2.0);
        turn.begin(Role::Speaker, true);
        assert_eq!(turn.update(Signal::Red, Instant::now()), None);
        assert_eq!(turn.update(Signal::Green, Instant::now()), None);
        let event = turn.update(Signal::Cyan, Instant::now());
        assert_eq!(event, Some(TurnEvent::TurnReceived));
        assert!(turn.is_speaking());
    }

    #[test]
    fn test_pure_transition_speaking_is_stable() {
        let (state, event) = transition(
            TurnState::Speaking,
            Signal::Red,
            Duration::ZERO,
            Duration::from_secs(2),
        );
        assert_eq!(state, TurnState::Speaking);
        assert_eq!(event, None);
    }

    #[test]
    fn test_claim_turn() {
        let mut turn = machine(2.0);
        turn.begin(Role::Listener, false);
        turn.claim_turn();
        assert!(turn.is_speaking());
        assert_eq!(turn.border_color(), BorderColor::Green);
    }
}
