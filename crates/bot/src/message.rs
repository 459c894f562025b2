//! Normalized inbound messages and the transport seams.

use {anyhow::Result, async_trait::async_trait};

/// Payload of one inbound chat message, classified by the transport.
///
/// Media variants carry the downloaded bytes; the transport resolves them
/// before dispatch so handlers never touch the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundPayload {
    Text { body: String },
    Image { data: Vec<u8>, caption: Option<String> },
    Document { data: Vec<u8>, file_name: String },
    Audio { data: Vec<u8> },
    /// Anything without a handler (stickers, video, contacts, ...).
    Unsupported { kind: String },
}

/// One normalized inbound message.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    /// Chat the reply goes to (a JID on WhatsApp).
    pub chat_id: String,
    /// Stable numeric identity used for preferences and rate accounting.
    pub user_id: u64,
    /// True when the frame echoes a message this bot sent itself.
    pub from_me: bool,
    pub payload: InboundPayload,
}

/// Outbound half of a chat transport.
#[async_trait]
pub trait ChatOutbound: Send + Sync {
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Send an image by URL with a caption.
    async fn send_image_url(&self, to: &str, url: &str, caption: &str) -> Result<()>;
}

/// Consumer of normalized inbound messages.
#[async_trait]
pub trait InboundSink: Send + Sync {
    async fn dispatch(&self, message: InboundMessage) -> Result<()>;
}
