//! Core types for signchat

mod frame;
mod signal;
mod state;
mod event;
mod history;
mod output;

pub use frame::{Frame, Hsv, Rgb};
pub use signal::{BorderColor, HsvRange, Signal};
pub use state::{Role, TurnState};
pub use event::TurnEvent;
pub use history::{ConversationHistory, Direction, Exchange};
pub use output::{SessionOutcome, SessionReport};
