//! Integration tests for the signal path
//!
//! Rendered screens → border decoding → turn state machine:
//! - Every state's border is decoded back to its own signal
//! - A partly occluded border is still read; a mostly occluded one is not
//! - A full exchange of turns driven only by decoded frames

use pretty_assertions::assert_eq;
use signchat::config::TurnConfig;
use signchat::core::loopback::{glyph_color, render_frame, SCREEN_HEIGHT, SCREEN_WIDTH};
use signchat::core::{SignalDecoder, TurnStateMachine};
use signchat::types::{BorderColor, Frame, Rgb, Role, Signal, TurnEvent, TurnState};
use std::time::{Duration, Instant};

fn screen(border: BorderColor) -> Frame {
    render_frame(SCREEN_WIDTH, SCREEN_HEIGHT, border, Rgb::BLACK)
}

fn letter_screen(border: BorderColor, letter: char) -> Frame {
    render_frame(SCREEN_WIDTH, SCREEN_HEIGHT, border, glyph_color(letter))
}

// =============================================================================
// STATE ↔ SIGNAL MAPPING
// =============================================================================

#[test]
fn test_each_state_border_decodes_to_its_signal() {
    let decoder = SignalDecoder::default();
    let cases = [
        (TurnState::Speaking, Signal::Green),
        (TurnState::DoneSpeaking, Signal::Red),
        (TurnState::Listening, Signal::Cyan),
        (TurnState::Idle, Signal::None),
        (TurnState::WaitingForTurn, Signal::None),
    ];
    for (state, expected) in cases {
        let frame = screen(state.border_color());
        assert_eq!(decoder.decode(&frame), expected, "state {}", state);
    }
}

#[test]
fn test_letter_content_does_not_change_signal() {
    let decoder = SignalDecoder::default();
    for letter in "AKY".chars() {
        assert_eq!(decoder.decode(&letter_screen(BorderColor::Green, letter)), Signal::Green);
    }
    let text = render_frame(SCREEN_WIDTH, SCREEN_HEIGHT, BorderColor::Red, Rgb::WHITE);
    assert_eq!(decoder.decode(&text), Signal::Red);
}

// =============================================================================
// OCCLUSION
// =============================================================================

#[test]
fn test_half_occluded_border_still_detected() {
    let decoder = SignalDecoder::default();
    let mut frame = screen(BorderColor::Green);
    // Something dark covers the top half of the screen
    frame.fill_rect(0, 0, SCREEN_HEIGHT / 2, SCREEN_WIDTH, Rgb::BLACK);

    let ratios = decoder.ratios(&frame);
    assert!(ratios.green < 0.9);
    assert!(ratios.green >= 0.3);
    assert_eq!(decoder.decode(&frame), Signal::Green);
}

#[test]
fn test_mostly_occluded_border_is_none() {
    let decoder = SignalDecoder::default();
    let mut frame = screen(BorderColor::Red);
    frame.fill_rect(0, 0, SCREEN_HEIGHT - 2, SCREEN_WIDTH, Rgb::BLACK);

    assert!(decoder.ratios(&frame).red < 0.3);
    assert_eq!(decoder.decode(&frame), Signal::None);
}

#[test]
fn test_dim_border_is_none() {
    let decoder = SignalDecoder::default();
    // Too dark: value below the range floor
    let frame = Frame::filled(SCREEN_WIDTH, SCREEN_HEIGHT, Rgb(0, 60, 0));
    assert_eq!(decoder.decode(&frame), Signal::None);
}

// =============================================================================
// TURN EXCHANGE FROM FRAMES
// =============================================================================

#[test]
fn test_turn_exchange_driven_by_frames() {
    let decoder = SignalDecoder::default();
    let config = TurnConfig {
        done_duration_seconds: 2.0,
        handshake: false,
    };
    let mut speaker = TurnStateMachine::new(&config);
    let mut listener = TurnStateMachine::new(&config);
    speaker.begin(Role::Speaker, false);
    listener.begin(Role::Listener, false);

    let t0 = Instant::now();

    // Speaker shows a letter; listener notices incoming letters
    let seen = decoder.decode(&letter_screen(speaker.border_color(), 'H'));
    assert_eq!(listener.update(seen, t0), Some(TurnEvent::LetterIncoming));

    // Speaker finishes; listener takes the turn on RED
    speaker.finish_speaking(t0);
    let seen = decoder.decode(&screen(speaker.border_color()));
    assert_eq!(seen, Signal::Red);
    assert_eq!(listener.update(seen, t0), Some(TurnEvent::TurnReceived));
    assert_eq!(listener.state(), TurnState::Speaking);

    // Former speaker listens once the done hold is over
    let later = t0 + Duration::from_secs(2);
    let seen = decoder.decode(&screen(listener.border_color()));
    assert_eq!(speaker.update(seen, later), Some(TurnEvent::DoneTimeout));
    assert_eq!(speaker.state(), TurnState::Listening);

    // And now sees the new speaker's GREEN
    let seen = decoder.decode(&letter_screen(listener.border_color(), 'I'));
    assert_eq!(speaker.update(seen, later), Some(TurnEvent::LetterIncoming));
}

#[test]
fn test_handshake_speaker_waits_for_cyan_screen() {
    let decoder = SignalDecoder::default();
    let mut speaker = TurnStateMachine::new(&TurnConfig {
        done_duration_seconds: 2.0,
        handshake: true,
    });
    assert_eq!(speaker.begin(Role::Speaker, true), TurnState::WaitingForTurn);

    let now = Instant::now();
    let idle = decoder.decode(&screen(BorderColor::Gray));
    assert_eq!(speaker.update(idle, now), None);

    let listening = decoder.decode(&screen(BorderColor::Cyan));
    assert_eq!(speaker.update(listening, now), Some(TurnEvent::TurnReceived));
    assert!(speaker.is_speaking());
}
