//! WebSocket client for the Baileys sidecar.
//!
//! One socket carries everything: lifecycle events and inbound messages
//! stream to the session loop, while acked commands (`send_text`,
//! `send_image`, `download_media`) wait on a pending map keyed by
//! `request_id`.

use {
    crate::{
        error::{Error, Result},
        types::{GatewayCommand, SidecarEvent},
    },
    base64::{Engine as _, engine::general_purpose::STANDARD},
    futures::{
        SinkExt, StreamExt,
        stream::{SplitSink, SplitStream},
    },
    std::{
        collections::HashMap,
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::{
        net::TcpStream,
        sync::{mpsc, oneshot},
    },
    tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message},
    tracing::{debug, warn},
};

/// Ack wait for text and image sends.
const SEND_ACK_TIMEOUT: Duration = Duration::from_secs(30);
/// Ack wait for media downloads; payloads cross the socket as base64.
const MEDIA_ACK_TIMEOUT: Duration = Duration::from_secs(60);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<SidecarEvent>>>>;

/// Cheap handle to a live sidecar connection.
///
/// Clones share the writer channel and the pending-ack map. The handle
/// outlives the socket; commands after the socket dies fail fast.
#[derive(Clone)]
pub struct SidecarHandle {
    write_tx: mpsc::UnboundedSender<String>,
    pending: PendingMap,
}

/// Connect to the sidecar. Returns the command handle and the stream of
/// lifecycle and message events; ack frames are routed internally and never
/// appear on the stream.
pub async fn connect(url: &str) -> Result<(SidecarHandle, mpsc::UnboundedReceiver<SidecarEvent>)> {
    let (ws_stream, _response) = connect_async(url).await?;
    let (ws_sink, ws_reader) = ws_stream.split();

    let (write_tx, write_rx) = mpsc::unbounded_channel::<String>();
    let (event_tx, event_rx) = mpsc::unbounded_channel::<SidecarEvent>();
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));

    tokio::spawn(run_socket(ws_sink, ws_reader, write_rx, event_tx, Arc::clone(&pending)));

    Ok((SidecarHandle { write_tx, pending }, event_rx))
}

impl SidecarHandle {
    /// Ask the sidecar to open the named credential session.
    pub fn login(&self, session: &str) -> Result<()> {
        self.send_command(&GatewayCommand::Login { session: session.to_string() })
    }

    /// Send a text message and wait for the sidecar's ack.
    pub async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let command = GatewayCommand::SendText {
            request_id: request_id.clone(),
            to: to.to_string(),
            text: text.to_string(),
        };
        match self.request(request_id, &command, SEND_ACK_TIMEOUT).await? {
            SidecarEvent::SendResult { success: true, .. } => Ok(()),
            SidecarEvent::SendResult { error, .. } => Err(Error::Rejected {
                operation: "send_text",
                message: error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            _ => Err(Error::Protocol("unexpected ack frame".to_string())),
        }
    }

    /// Send an image by URL and wait for the sidecar's ack.
    pub async fn send_image(&self, to: &str, url: &str, caption: &str) -> Result<()> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let command = GatewayCommand::SendImage {
            request_id: request_id.clone(),
            to: to.to_string(),
            url: url.to_string(),
            caption: caption.to_string(),
        };
        match self.request(request_id, &command, SEND_ACK_TIMEOUT).await? {
            SidecarEvent::SendResult { success: true, .. } => Ok(()),
            SidecarEvent::SendResult { error, .. } => Err(Error::Rejected {
                operation: "send_image",
                message: error.unwrap_or_else(|| "unknown error".to_string()),
            }),
            _ => Err(Error::Protocol("unexpected ack frame".to_string())),
        }
    }

    /// Fetch the decrypted bytes of a media message.
    pub async fn download_media(&self, message_id: &str) -> Result<Vec<u8>> {
        let request_id = uuid::Uuid::new_v4().to_string();
        let command = GatewayCommand::DownloadMedia {
            request_id: request_id.clone(),
            message_id: message_id.to_string(),
        };
        match self.request(request_id, &command, MEDIA_ACK_TIMEOUT).await? {
            SidecarEvent::MediaPayload { success: true, data_base64: Some(data), .. } => {
                Ok(STANDARD.decode(data)?)
            },
            SidecarEvent::MediaPayload { error, .. } => Err(Error::Rejected {
                operation: "download_media",
                message: error.unwrap_or_else(|| "media unavailable".to_string()),
            }),
            _ => Err(Error::Protocol("unexpected ack frame".to_string())),
        }
    }

    fn send_command(&self, command: &GatewayCommand) -> Result<()> {
        let json = serde_json::to_string(command)?;
        self.write_tx.send(json).map_err(|_| Error::NotConnected)
    }

    /// Register an ack waiter, send the command, and wait for the routed
    /// response within `timeout`.
    async fn request(
        &self,
        request_id: String,
        command: &GatewayCommand,
        timeout: Duration,
    ) -> Result<SidecarEvent> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.lock_pending().insert(request_id.clone(), ack_tx);

        if let Err(error) = self.send_command(command) {
            self.lock_pending().remove(&request_id);
            return Err(error);
        }

        match tokio::time::timeout(timeout, ack_rx).await {
            Ok(Ok(event)) => Ok(event),
            // Waiter dropped: the socket task exited.
            Ok(Err(_)) => Err(Error::Connection("connection lost before ack".to_string())),
            Err(_) => {
                self.lock_pending().remove(&request_id);
                Err(Error::AckTimeout)
            },
        }
    }

    fn lock_pending(
        &self,
    ) -> std::sync::MutexGuard<'_, HashMap<String, oneshot::Sender<SidecarEvent>>> {
        self.pending.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Pump the socket until it closes: outgoing commands from the writer
/// channel, incoming frames parsed and routed.
async fn run_socket(
    mut ws_sink: SplitSink<WsStream, Message>,
    mut ws_reader: SplitStream<WsStream>,
    mut write_rx: mpsc::UnboundedReceiver<String>,
    event_tx: mpsc::UnboundedSender<SidecarEvent>,
    pending: PendingMap,
) {
    loop {
        tokio::select! {
            frame = ws_reader.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SidecarEvent>(&text) {
                            Ok(event) => route_event(event, &pending, &event_tx),
                            Err(error) => {
                                warn!(%error, "unparseable sidecar frame");
                            },
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("sidecar closed the socket");
                        break;
                    },
                    Some(Ok(Message::Ping(data))) => {
                        if ws_sink.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    },
                    Some(Ok(_)) => {}, // Ignore binary, pong, etc.
                    Some(Err(error)) => {
                        warn!(%error, "sidecar socket error");
                        break;
                    },
                }
            },
            json = write_rx.recv() => {
                match json {
                    Some(text) => {
                        if ws_sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    },
                    None => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    },
                }
            },
        }
    }

    // Dropping the waiters fails outstanding requests immediately.
    pending.lock().unwrap_or_else(|e| e.into_inner()).clear();
}

/// Acks resolve their pending waiter; everything else goes to the event
/// stream for the session loop.
fn route_event(
    event: SidecarEvent,
    pending: &PendingMap,
    event_tx: &mpsc::UnboundedSender<SidecarEvent>,
) {
    let request_id = match &event {
        SidecarEvent::SendResult { request_id, .. }
        | SidecarEvent::MediaPayload { request_id, .. } => Some(request_id.clone()),
        _ => None,
    };

    match request_id {
        Some(id) => {
            let waiter = pending.lock().unwrap_or_else(|e| e.into_inner()).remove(&id);
            match waiter {
                Some(ack_tx) => {
                    let _ = ack_tx.send(event);
                },
                None => debug!(request_id = %id, "ack frame with no pending waiter"),
            }
        },
        None => {
            let _ = event_tx.send(event);
        },
    }
}
