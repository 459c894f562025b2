//! Wire protocol spoken with the Baileys sidecar.
//!
//! Frames are JSON text over a single WebSocket, discriminated by a `type`
//! tag. Commands that expect an ack carry a `request_id` echoed back in the
//! matching `send_result` or `media_payload` frame.

use serde::{Deserialize, Serialize};

/// Commands sent to the sidecar.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayCommand {
    /// Open (or resume) the named credential session.
    Login { session: String },
    SendText { request_id: String, to: String, text: String },
    SendImage { request_id: String, to: String, url: String, caption: String },
    DownloadMedia { request_id: String, message_id: String },
}

/// Frames the sidecar pushes to us.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SidecarEvent {
    /// Pairing QR payload; the operator scans it from the sidecar terminal.
    Qr { qr: String },
    Connected {
        #[serde(default)]
        phone_number: Option<String>,
    },
    /// Transient drop; the session loop reconnects.
    Disconnected {
        #[serde(default)]
        reason: Option<String>,
    },
    /// Credentials were invalidated; reconnecting is pointless.
    LoggedOut,
    Message(MessageFrame),
    SendResult {
        request_id: String,
        success: bool,
        #[serde(default)]
        error: Option<String>,
    },
    MediaPayload {
        request_id: String,
        success: bool,
        #[serde(default)]
        data_base64: Option<String>,
        #[serde(default)]
        error: Option<String>,
    },
    Error { message: String },
}

/// One inbound chat message as the sidecar saw it.
///
/// `kind` classifies the message (`text`, `image`, `document`, `audio`,
/// `ptt`, or anything else Baileys knows about); media frames carry a
/// `message_id` used to fetch the bytes.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageFrame {
    pub chat_jid: String,
    #[serde(default)]
    pub sender_name: Option<String>,
    #[serde(default)]
    pub from_me: bool,
    pub kind: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub caption: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub message_id: Option<String>,
}
