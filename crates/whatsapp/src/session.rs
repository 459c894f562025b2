//! Session loop: connect to the sidecar, log in, pump events, reconnect.
//!
//! Reconnects use a bounded exponential backoff. The loop only ends when
//! the sidecar reports an explicit logout, which means the credentials are
//! gone and a human has to re-pair the device.

use {
    std::{sync::Arc, time::Duration},
    tracing::{debug, error, info, warn},
};

use perplexo_bot::{InboundMessage, InboundPayload, InboundSink};

use crate::{
    config::SessionConfig,
    error::{Error, Result},
    outbound::SharedHandle,
    sidecar::{self, SidecarHandle},
    types::{MessageFrame, SidecarEvent},
};

/// Maximum reconnect backoff delay.
const MAX_BACKOFF: Duration = Duration::from_secs(5);

/// Message sent to the admin whenever the session comes up.
const STARTUP_NOTICE: &str = "🤖 Perplexo Bot iniciado e conectado!";

/// Why the event pump stopped.
enum PumpExit {
    /// Transport dropped; reconnect.
    Disconnected,
    /// Credentials invalidated; stop for good.
    LoggedOut,
}

/// Run the session until the account is logged out.
///
/// Every other exit (socket loss, sidecar restart, explicit disconnect
/// frame) reconnects after the backoff delay. The shared handle slot is
/// filled while a connection is live and cleared the moment it dies, so
/// outbound sends fail fast in the gaps.
pub async fn run(config: SessionConfig, shared: SharedHandle, sink: Arc<dyn InboundSink>) {
    let mut backoff = Duration::from_secs(1);

    loop {
        info!(url = %config.sidecar_url, session = %config.session, "connecting to sidecar");

        let outcome = connect_and_pump(&config, &shared, Arc::clone(&sink)).await;

        {
            let mut slot = shared.write().unwrap_or_else(|e| e.into_inner());
            *slot = None;
        }

        match outcome {
            Ok(PumpExit::LoggedOut) => {
                info!("whatsapp session logged out, stopping");
                return;
            },
            Ok(PumpExit::Disconnected) => {
                warn!("sidecar connection lost");
            },
            Err(error) => {
                error!(%error, "sidecar connection failed");
            },
        }

        info!(delay_ms = backoff.as_millis(), "reconnecting after delay");
        tokio::time::sleep(backoff).await;
        backoff = next_backoff(backoff);
    }
}

fn next_backoff(current: Duration) -> Duration {
    (current * 2).min(MAX_BACKOFF)
}

/// One connection attempt: connect, log in, publish the handle, then pump
/// events until the stream ends.
async fn connect_and_pump(
    config: &SessionConfig,
    shared: &SharedHandle,
    sink: Arc<dyn InboundSink>,
) -> Result<PumpExit> {
    let (handle, mut events) = sidecar::connect(&config.sidecar_url).await?;
    handle.login(&config.session)?;

    {
        let mut slot = shared.write().unwrap_or_else(|e| e.into_inner());
        *slot = Some(handle.clone());
    }

    while let Some(event) = events.recv().await {
        match event {
            SidecarEvent::Qr { qr } => {
                info!(qr_len = qr.len(), "pairing QR received, scan it from the sidecar terminal");
            },
            SidecarEvent::Connected { phone_number } => {
                info!(phone_number = ?phone_number, "whatsapp connected");
                announce_startup(config, &handle).await;
            },
            SidecarEvent::Disconnected { reason } => {
                warn!(reason = ?reason, "whatsapp disconnected");
                return Ok(PumpExit::Disconnected);
            },
            SidecarEvent::LoggedOut => return Ok(PumpExit::LoggedOut),
            SidecarEvent::Message(frame) => {
                spawn_dispatch(frame, handle.clone(), Arc::clone(&sink));
            },
            SidecarEvent::Error { message } => {
                warn!(message = %message, "sidecar reported an error");
            },
            SidecarEvent::SendResult { .. } | SidecarEvent::MediaPayload { .. } => {
                debug!("stray ack frame on the event stream");
            },
        }
    }

    Ok(PumpExit::Disconnected)
}

/// Notify the admin that the session is up. Skipped when no admin number is
/// configured; failures are logged and swallowed.
async fn announce_startup(config: &SessionConfig, handle: &SidecarHandle) {
    let Some(jid) = config.admin_jid() else { return };
    if let Err(error) = handle.send_text(&jid, STARTUP_NOTICE).await {
        warn!(%error, "admin startup notification failed");
    }
}

/// Handle one inbound frame off the pump: normalization and dispatch run in
/// their own task so a slow media download never blocks the event stream.
fn spawn_dispatch(frame: MessageFrame, handle: SidecarHandle, sink: Arc<dyn InboundSink>) {
    tokio::spawn(async move {
        let chat_jid = frame.chat_jid.clone();
        let message = match normalize(frame, &handle).await {
            Ok(message) => message,
            Err(error) => {
                warn!(chat = %chat_jid, %error, "dropping message, media fetch failed");
                return;
            },
        };
        if let Err(error) = sink.dispatch(message).await {
            error!(chat = %chat_jid, %error, "message handler failed");
        }
    });
}

/// Map a wire frame onto the closed payload model, fetching media bytes
/// where the payload needs them.
async fn normalize(frame: MessageFrame, handle: &SidecarHandle) -> Result<InboundMessage> {
    let user_id = derive_user_id(&frame.chat_jid);
    let payload = match frame.kind.as_str() {
        "text" => InboundPayload::Text { body: frame.body.unwrap_or_default() },
        "image" => InboundPayload::Image {
            data: fetch_media(handle, frame.message_id.as_deref()).await?,
            caption: frame.caption,
        },
        "document" => InboundPayload::Document {
            data: fetch_media(handle, frame.message_id.as_deref()).await?,
            file_name: frame.file_name.unwrap_or_else(|| "document".to_string()),
        },
        "audio" | "ptt" => InboundPayload::Audio {
            data: fetch_media(handle, frame.message_id.as_deref()).await?,
        },
        other => InboundPayload::Unsupported { kind: other.to_string() },
    };
    Ok(InboundMessage { chat_id: frame.chat_jid, user_id, from_me: frame.from_me, payload })
}

async fn fetch_media(handle: &SidecarHandle, message_id: Option<&str>) -> Result<Vec<u8>> {
    let id = message_id
        .ok_or_else(|| Error::Protocol("media frame without a message_id".to_string()))?;
    handle.download_media(id).await
}

/// Stable numeric identity for a chat JID: the first ten digits, `0` when
/// there are none.
#[must_use]
pub fn derive_user_id(jid: &str) -> u64 {
    let digits: String = jid.chars().filter(char::is_ascii_digit).take(10).collect();
    digits.parse().unwrap_or(0)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::outbound::shared_handle,
        async_trait::async_trait,
        base64::{Engine as _, engine::general_purpose::STANDARD},
        futures::{SinkExt, StreamExt},
        serde_json::json,
        tokio::sync::mpsc,
        tokio_tungstenite::tungstenite::Message,
    };

    #[test]
    fn user_id_takes_the_first_ten_digits() {
        assert_eq!(derive_user_id("5511999999999@s.whatsapp.net"), 5_511_999_999);
        assert_eq!(derive_user_id("123@g.us"), 123);
        assert_eq!(derive_user_id("no-digits@broadcast"), 0);
        assert_eq!(derive_user_id(""), 0);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let mut delay = Duration::from_secs(1);
        let mut seen = Vec::new();
        for _ in 0..4 {
            delay = next_backoff(delay);
            seen.push(delay.as_secs());
        }
        assert_eq!(seen, [2, 4, 5, 5]);
    }

    struct ForwardingSink(mpsc::UnboundedSender<InboundMessage>);

    #[async_trait]
    impl InboundSink for ForwardingSink {
        async fn dispatch(&self, message: InboundMessage) -> anyhow::Result<()> {
            let _ = self.0.send(message);
            Ok(())
        }
    }

    // Scripted sidecar stub. Accepts one connection per script; after the
    // login command it plays that script's frames, and it acks every send
    // and media download on its own.
    async fn spawn_gateway_stub(
        scripts: Vec<Vec<String>>,
    ) -> (String, mpsc::UnboundedReceiver<serde_json::Value>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (seen_tx, seen_rx) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            for script in scripts {
                let Ok((stream, _)) = listener.accept().await else { return };
                let Ok(ws) = tokio_tungstenite::accept_async(stream).await else { return };
                let (mut sink, mut reader) = ws.split();

                while let Some(Ok(frame)) = reader.next().await {
                    let Message::Text(text) = frame else { continue };
                    let Ok(value) = serde_json::from_str::<serde_json::Value>(&text) else {
                        continue;
                    };
                    let _ = seen_tx.send(value.clone());

                    match value["type"].as_str() {
                        Some("login") => {
                            for line in &script {
                                let _ = sink.send(Message::Text(line.clone().into())).await;
                            }
                        },
                        Some("send_text" | "send_image") => {
                            let ack = json!({
                                "type": "send_result",
                                "request_id": value["request_id"],
                                "success": true,
                            });
                            let _ = sink.send(Message::Text(ack.to_string().into())).await;
                        },
                        Some("download_media") => {
                            let payload = json!({
                                "type": "media_payload",
                                "request_id": value["request_id"],
                                "success": true,
                                "data_base64": STANDARD.encode([7u8, 7]),
                            });
                            let _ = sink.send(Message::Text(payload.to_string().into())).await;
                        },
                        _ => {},
                    }
                }
            }
        });

        (format!("ws://{addr}"), seen_rx)
    }

    fn config_for(url: &str, admin: Option<&str>) -> SessionConfig {
        SessionConfig {
            sidecar_url: url.to_string(),
            session: "perplexo-session".to_string(),
            admin_number: admin.map(String::from),
        }
    }

    #[tokio::test]
    async fn connect_notifies_admin_and_dispatches_messages() {
        let script = vec![
            json!({ "type": "connected", "phone_number": "5511988887777" }).to_string(),
            json!({
                "type": "message",
                "chat_jid": "5511999999999@s.whatsapp.net",
                "kind": "text",
                "body": "!menu",
            })
            .to_string(),
            json!({
                "type": "message",
                "chat_jid": "5511999999999@s.whatsapp.net",
                "kind": "image",
                "caption": "o que é?",
                "message_id": "IMG1",
            })
            .to_string(),
        ];
        let (url, mut seen) = spawn_gateway_stub(vec![script]).await;

        let (message_tx, mut messages) = mpsc::unbounded_channel();
        let shared = shared_handle();
        let run_task = tokio::spawn(run(
            config_for(&url, Some("5511988887777")),
            Arc::clone(&shared),
            Arc::new(ForwardingSink(message_tx)),
        ));

        let login = seen.recv().await.unwrap();
        assert_eq!(login["type"], "login");
        assert_eq!(login["session"], "perplexo-session");

        // The startup notice goes to the configured admin.
        let notice = seen.recv().await.unwrap();
        assert_eq!(notice["type"], "send_text");
        assert_eq!(notice["to"], "5511988887777@s.whatsapp.net");
        assert_eq!(notice["text"], STARTUP_NOTICE);

        // Dispatches run in their own tasks, so arrival order is not fixed.
        let mut payloads = vec![messages.recv().await.unwrap(), messages.recv().await.unwrap()];
        payloads.sort_by_key(|m| matches!(m.payload, InboundPayload::Image { .. }));

        assert_eq!(payloads[0].user_id, 5_511_999_999);
        assert!(!payloads[0].from_me);
        assert_eq!(payloads[0].payload, InboundPayload::Text { body: "!menu".to_string() });
        assert_eq!(
            payloads[1].payload,
            InboundPayload::Image { data: vec![7, 7], caption: Some("o que é?".to_string()) }
        );

        // The slot is filled while connected.
        assert!(shared.read().unwrap().is_some());
        run_task.abort();
    }

    #[tokio::test]
    async fn logged_out_terminates_the_loop() {
        let script = vec![json!({ "type": "logged_out" }).to_string()];
        let (url, _seen) = spawn_gateway_stub(vec![script]).await;

        let (message_tx, _messages) = mpsc::unbounded_channel();
        let shared = shared_handle();
        let run_future = run(
            config_for(&url, None),
            Arc::clone(&shared),
            Arc::new(ForwardingSink(message_tx)),
        );

        tokio::time::timeout(Duration::from_secs(5), run_future).await.unwrap();
        assert!(shared.read().unwrap().is_none());
    }

    #[tokio::test]
    async fn disconnect_frames_trigger_a_reconnect() {
        let first = vec![json!({ "type": "disconnected", "reason": "restart" }).to_string()];
        let second = vec![json!({ "type": "logged_out" }).to_string()];
        let (url, mut seen) = spawn_gateway_stub(vec![first, second]).await;

        let (message_tx, _messages) = mpsc::unbounded_channel();
        let run_future = run(
            config_for(&url, None),
            shared_handle(),
            Arc::new(ForwardingSink(message_tx)),
        );

        tokio::time::timeout(Duration::from_secs(10), run_future).await.unwrap();

        let mut logins = 0;
        while let Ok(value) = seen.try_recv() {
            if value["type"] == "login" {
                logins += 1;
            }
        }
        assert_eq!(logins, 2);
    }

    #[tokio::test]
    async fn unsupported_kinds_still_reach_the_sink() {
        let script = vec![
            json!({
                "type": "message",
                "chat_jid": "10@s.whatsapp.net",
                "kind": "sticker",
            })
            .to_string(),
        ];
        let (url, _seen) = spawn_gateway_stub(vec![script]).await;

        let (message_tx, mut messages) = mpsc::unbounded_channel();
        let run_task = tokio::spawn(run(
            config_for(&url, None),
            shared_handle(),
            Arc::new(ForwardingSink(message_tx)),
        ));

        let message = messages.recv().await.unwrap();
        assert_eq!(message.payload, InboundPayload::Unsupported { kind: "sticker".to_string() });
        run_task.abort();
    }
}
