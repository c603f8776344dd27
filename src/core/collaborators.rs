//! External collaborators: camera, display, classifier, cancellation
//!
//! The core only sees these traits. Real capture devices, renderers and
//! recognition models plug in behind them.

use std::sync::Arc;

use tokio::sync::watch;

use crate::error::ClassifierError;
use crate::types::{BorderColor, Frame};

/// Frame source
pub trait Camera: Send {
    /// Next frame, or `None` when the read failed this tick
    fn read_frame(&mut self) -> Option<Frame>;

    /// Release the device; called once on every session exit path
    fn release(&mut self) {}
}

/// Screen the peer's camera is pointed at
pub trait Display: Send {
    fn render_symbol(&mut self, symbol: char, border: BorderColor);

    fn render_blank(&mut self, border: BorderColor);

    fn render_text(&mut self, text: &str, border: BorderColor);

    /// Whether the user pressed a cancel key since the last poll
    fn poll_cancel(&mut self) -> bool {
        false
    }

    fn release(&mut self) {}
}

/// Result of classifying one frame
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub symbol: Option<char>,
    pub confidence: f32,
    /// A hand (or other signing surface) was seen, recognized or not
    pub hand_present: bool,
    /// Back-end overlay for diagnostics
    pub annotated: Option<Frame>,
}

impl Classification {
    /// Nothing seen
    pub fn empty() -> Self {
        Self {
            symbol: None,
            confidence: 0.0,
            hand_present: false,
            annotated: None,
        }
    }

    /// A symbol guess; presence follows the symbol
    pub fn symbol(symbol: char, confidence: f32) -> Self {
        Self {
            symbol: Some(symbol),
            confidence,
            hand_present: true,
            annotated: None,
        }
    }
}

/// Per-frame symbol oracle
///
/// Low-confidence guesses are passed through; the accumulator decides.
pub trait Classifier: Send {
    fn classify(&mut self, frame: &Frame) -> Result<Classification, ClassifierError>;

    fn name(&self) -> &'static str;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn classify(&mut self, frame: &Frame) -> Result<Classification, ClassifierError> {
        (**self).classify(frame)
    }

    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Sender side of a cancellation flag
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiver side, checked on every tick of every wait
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: watch::Receiver<bool>,
    /// Sender owned by a token that can never be cancelled
    _never: Option<Arc<watch::Sender<bool>>>,
}

impl Cancellation {
    pub fn channel() -> (CancelHandle, Cancellation) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx: Arc::new(tx) }, Cancellation { rx, _never: None })
    }

    /// A token that is never cancelled
    pub fn never() -> Cancellation {
        let (tx, rx) = watch::channel(false);
        Cancellation { rx, _never: Some(Arc::new(tx)) }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once cancelled; pending forever if the handle is dropped first
    pub async fn cancelled(&mut self) {
        loop {
            if *self.rx.borrow_and_update() {
                return;
            }
            if self.rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_flag() {
        let (handle, token) = Cancellation::channel();
        assert!(!token.is_cancelled());
        handle.cancel();
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_cancelled_resolves() {
        let (handle, mut token) = Cancellation::channel();
        let waiter = tokio::spawn(async move {
            token.cancelled().await;
            true
        });
        handle.cancel();
        assert!(waiter.await.unwrap());
    }

    #[test]
    fn test_symbol_classification_implies_presence() {
        let c = Classification::symbol('A', 0.3);
        assert!(c.hand_present);
        assert!(!Classification::empty().hand_present);
    }
}
