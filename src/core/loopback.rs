//! Optical loopback: a simulated screen-to-camera link
//!
//! `screen_link` returns a display and the camera pointed at it. Frames are
//! synthetic: a solid border in the agent's signal color around a black
//! field, with a square center patch that carries the content.
//!
//! Center patch encoding:
//! - letter: gray `(c, c, c)` where `c` is the letter's ASCII code
//! - text: white
//! - blank: black (same as the field)
//!
//! `GlyphClassifier` reads the patch back; `NoisyClassifier` wraps any
//! classifier with seeded misses and substitutions.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::watch;
use tracing::trace;

use crate::core::collaborators::{Camera, Classification, Classifier, Display};
use crate::error::ClassifierError;
use crate::types::{BorderColor, Frame, Rgb};

pub const SCREEN_WIDTH: usize = 64;
pub const SCREEN_HEIGHT: usize = 48;

/// Border thickness as a fraction of the short side
const BORDER_FRACTION: f64 = 0.2;

/// Center patch side as a fraction of the short side
const PATCH_FRACTION: f64 = 0.25;

/// A display and the camera that sees it
pub fn screen_link(width: usize, height: usize) -> (LoopbackDisplay, LoopbackCamera) {
    let initial = render_frame(width, height, BorderColor::Gray, Rgb::BLACK);
    let (tx, rx) = watch::channel(initial);
    (
        LoopbackDisplay { tx, width, height, renders: 0 },
        LoopbackCamera { rx, fail_every: None, reads: 0 },
    )
}

/// Draw one synthetic screen
pub fn render_frame(width: usize, height: usize, border: BorderColor, center: Rgb) -> Frame {
    let mut frame = Frame::filled(width, height, border.rgb());
    let short = width.min(height);

    let thickness = ((short as f64 * BORDER_FRACTION).ceil() as usize).min(short / 2);
    frame.fill_rect(thickness, thickness, height - thickness, width - thickness, Rgb::BLACK);

    let side = ((short as f64 * PATCH_FRACTION) as usize).max(1);
    let top = (height - side) / 2;
    let left = (width - side) / 2;
    frame.fill_rect(top, left, top + side, left + side, center);
    frame
}

/// Center patch color that encodes `symbol`
pub fn glyph_color(symbol: char) -> Rgb {
    let code = if symbol.is_ascii() { symbol as u8 } else { 0 };
    Rgb(code, code, code)
}

#[derive(Debug)]
pub struct LoopbackDisplay {
    tx: watch::Sender<Frame>,
    width: usize,
    height: usize,
    renders: usize,
}

impl LoopbackDisplay {
    fn show(&mut self, border: BorderColor, center: Rgb) {
        let frame = render_frame(self.width, self.height, border, center);
        self.tx.send_replace(frame);
        self.renders += 1;
    }

    /// Screens drawn so far
    pub fn renders(&self) -> usize {
        self.renders
    }
}

impl Display for LoopbackDisplay {
    fn render_symbol(&mut self, symbol: char, border: BorderColor) {
        self.show(border, glyph_color(symbol));
    }

    fn render_blank(&mut self, border: BorderColor) {
        self.show(border, Rgb::BLACK);
    }

    fn render_text(&mut self, text: &str, border: BorderColor) {
        trace!(%text, "loopback text screen");
        self.show(border, Rgb::WHITE);
    }

    fn release(&mut self) {
        self.show(BorderColor::Gray, Rgb::BLACK);
    }
}

#[derive(Debug)]
pub struct LoopbackCamera {
    rx: watch::Receiver<Frame>,
    fail_every: Option<u32>,
    reads: u32,
}

impl LoopbackCamera {
    /// Every `n`-th read fails
    pub fn with_failures(mut self, n: u32) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }
}

impl Camera for LoopbackCamera {
    fn read_frame(&mut self) -> Option<Frame> {
        self.reads = self.reads.wrapping_add(1);
        if let Some(n) = self.fail_every {
            if self.reads % n == 0 {
                return None;
            }
        }
        Some(self.rx.borrow().clone())
    }
}

/// Reads the center patch of a loopback frame
#[derive(Debug, Clone, Default)]
pub struct GlyphClassifier;

impl Classifier for GlyphClassifier {
    fn classify(&mut self, frame: &Frame) -> Result<Classification, ClassifierError> {
        if frame.is_empty() {
            return Err(ClassifierError::EmptyFrame);
        }
        let Rgb(r, g, b) = frame.pixel(frame.height() / 2, frame.width() / 2);
        if r == g && g == b && r.is_ascii_uppercase() {
            Ok(Classification::symbol(r as char, 1.0))
        } else {
            Ok(Classification::empty())
        }
    }

    fn name(&self) -> &'static str {
        "glyph"
    }
}

/// Clamp a rate to `[0, 1]`; NaN counts as never
fn probability(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(0.0, 1.0)
    }
}

/// Wraps a classifier with seeded noise
///
/// A miss keeps the hand present but drops the symbol. A substitution
/// replaces it with a random letter from `alphabet`. With `with_faults`,
/// every n-th call fails outright like a crashed back-end.
#[derive(Debug)]
pub struct NoisyClassifier<C> {
    inner: C,
    miss_rate: f64,
    substitute_rate: f64,
    alphabet: Vec<char>,
    rng: StdRng,
    fault_every: Option<u32>,
    calls: u32,
}

impl<C: Classifier> NoisyClassifier<C> {
    pub fn new(inner: C, miss_rate: f64, substitute_rate: f64, alphabet: &str, seed: u64) -> Self {
        Self {
            inner,
            miss_rate: probability(miss_rate),
            substitute_rate: probability(substitute_rate),
            alphabet: alphabet.chars().collect(),
            rng: StdRng::seed_from_u64(seed),
            fault_every: None,
            calls: 0,
        }
    }

    /// Every `n`-th classification fails with a back-end error
    pub fn with_faults(mut self, n: u32) -> Self {
        self.fault_every = (n > 0).then_some(n);
        self
    }
}

impl<C: Classifier> Classifier for NoisyClassifier<C> {
    fn classify(&mut self, frame: &Frame) -> Result<Classification, ClassifierError> {
        self.calls = self.calls.wrapping_add(1);
        if let Some(n) = self.fault_every {
            if self.calls % n == 0 {
                let reason = format!("simulated fault on call {}", self.calls);
                return Err(ClassifierError::Backend(reason));
            }
        }

        let mut result = self.inner.classify(frame)?;
        if result.symbol.is_none() {
            return Ok(result);
        }
        if self.rng.gen_bool(self.miss_rate) {
            result.symbol = None;
            result.confidence = 0.0;
        } else if !self.alphabet.is_empty() && self.rng.gen_bool(self.substitute_rate) {
            let index = self.rng.gen_range(0..self.alphabet.len());
            result.symbol = Some(self.alphabet[index]);
            result.confidence *= 0.5;
        }
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "noisy"
    }
}
