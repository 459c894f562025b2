//! WhatsApp transport for Perplexo.
//!
//! Talks to a Baileys sidecar process over a WebSocket: the sidecar owns
//! the WhatsApp Web session and credentials, this crate owns reconnection,
//! message normalization, and delivery into the bot engine.

pub mod config;
pub mod error;
pub mod outbound;
pub mod session;
pub mod sidecar;
pub mod types;

pub use {
    config::SessionConfig,
    error::{Error, Result},
    outbound::{SharedHandle, WaOutbound, shared_handle},
    sidecar::SidecarHandle,
};
