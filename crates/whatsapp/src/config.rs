//! Session configuration.

/// Settings for one WhatsApp session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// WebSocket URL of the Baileys sidecar.
    pub sidecar_url: String,
    /// Name of the sidecar's credential session.
    pub session: String,
    /// Bare phone number notified whenever the session connects.
    pub admin_number: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            sidecar_url: "ws://127.0.0.1:3001".to_string(),
            session: "perplexo-session".to_string(),
            admin_number: None,
        }
    }
}

impl SessionConfig {
    /// Admin JID for startup notifications, when one is configured.
    #[must_use]
    pub fn admin_jid(&self) -> Option<String> {
        self.admin_number
            .as_deref()
            .filter(|number| !number.is_empty())
            .map(|number| format!("{number}@s.whatsapp.net"))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_jid_appends_the_server_suffix() {
        let config = SessionConfig {
            admin_number: Some("5511988887777".to_string()),
            ..SessionConfig::default()
        };
        assert_eq!(config.admin_jid().as_deref(), Some("5511988887777@s.whatsapp.net"));
    }

    #[test]
    fn blank_admin_numbers_disable_the_notification() {
        assert_eq!(SessionConfig::default().admin_jid(), None);

        let config = SessionConfig {
            admin_number: Some(String::new()),
            ..SessionConfig::default()
        };
        assert_eq!(config.admin_jid(), None);
    }
}
