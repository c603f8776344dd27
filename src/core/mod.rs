//! Core modules for signchat

pub mod accumulator;
pub mod assembler;
pub mod collaborators;
pub mod loopback;
pub mod mailbox;
pub mod orchestrator;
pub mod responder;
pub mod signal_decoder;
pub mod turn;

pub use accumulator::SymbolAccumulator;
pub use assembler::MessageAssembler;
pub use collaborators::{Camera, CancelHandle, Cancellation, Classification, Classifier, Display};
pub use loopback::{screen_link, GlyphClassifier, LoopbackCamera, LoopbackDisplay, NoisyClassifier};
pub use mailbox::{ChannelMailbox, FileMailbox, Mailbox, MailboxPeer, Prompt};
pub use orchestrator::{run_pair, Collaborators, ConversationOrchestrator};
pub use responder::{
    sanitize_message, CommandResponder, MailboxResponder, Responder, ScriptResponder,
    VocabularyResponder,
};
pub use signal_decoder::{BorderRatios, SignalDecoder};
pub use turn::{transition, TurnStateMachine};
