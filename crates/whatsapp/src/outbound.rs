//! `ChatOutbound` implementation over the live sidecar connection.

use {
    anyhow::Result,
    async_trait::async_trait,
    std::sync::{Arc, RwLock},
};

use {crate::sidecar::SidecarHandle, perplexo_bot::ChatOutbound};

/// Shared slot holding the current sidecar connection.
///
/// Empty until the first connect and while reconnecting; the session loop
/// owns the writes.
pub type SharedHandle = Arc<RwLock<Option<SidecarHandle>>>;

/// A fresh, unconnected handle slot.
#[must_use]
pub fn shared_handle() -> SharedHandle {
    Arc::new(RwLock::new(None))
}

/// Outbound sender backed by whichever sidecar connection is currently live.
#[derive(Clone)]
pub struct WaOutbound {
    handle: SharedHandle,
}

impl WaOutbound {
    #[must_use]
    pub fn new(handle: SharedHandle) -> Self {
        Self { handle }
    }

    fn current(&self) -> Result<SidecarHandle> {
        self.handle
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| anyhow::anyhow!("whatsapp session not connected"))
    }
}

#[async_trait]
impl ChatOutbound for WaOutbound {
    async fn send_text(&self, to: &str, text: &str) -> Result<()> {
        self.current()?.send_text(to, text).await?;
        Ok(())
    }

    async fn send_image_url(&self, to: &str, url: &str, caption: &str) -> Result<()> {
        self.current()?.send_image(to, url, caption).await?;
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sends_fail_fast_while_disconnected() {
        let outbound = WaOutbound::new(shared_handle());

        let err = outbound.send_text("55@s.whatsapp.net", "oi").await.unwrap_err();
        assert!(err.to_string().contains("not connected"));

        let err = outbound.send_image_url("55@s.whatsapp.net", "u", "c").await.unwrap_err();
        assert!(err.to_string().contains("not connected"));
    }
}
