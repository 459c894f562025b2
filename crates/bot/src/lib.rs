//! Perplexo's dispatch core.
//!
//! Everything between a chat transport and the answering backend lives
//! here: per-user preferences, menu-selection state, the command router,
//! the four modality flows, and answer formatting. Transports plug in
//! through the [`message::ChatOutbound`] and [`message::InboundSink`]
//! seams and stay free of bot semantics.

pub mod catalog;
pub mod command;
pub mod engine;
pub mod format;
pub mod message;
pub mod prefs;
pub mod session;

pub use {
    engine::Engine,
    message::{ChatOutbound, InboundMessage, InboundPayload, InboundSink},
    prefs::PrefsStore,
    session::{MenuState, SessionMap},
};
