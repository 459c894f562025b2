//! Read-through cache of per-user preferences over the remote config store.

use {
    perplexo_backend::{ApiClient, UserPrefs},
    std::{
        collections::HashMap,
        sync::{Arc, RwLock},
    },
    tracing::warn,
};

/// Per-user preference store.
///
/// Reads hit the in-memory cache first and fall back to the backend. A
/// failed fetch yields the defaults without caching them, so the next read
/// retries the backend. Writes land in the cache before the remote persist,
/// which keeps the session responsive when the config service is down.
#[derive(Clone)]
pub struct PrefsStore {
    api: Arc<ApiClient>,
    cache: Arc<RwLock<HashMap<u64, UserPrefs>>>,
}

impl PrefsStore {
    #[must_use]
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api, cache: Arc::new(RwLock::new(HashMap::new())) }
    }

    /// Current preferences for `user_id`.
    pub async fn get(&self, user_id: u64) -> UserPrefs {
        if let Some(prefs) = self.cached(user_id) {
            return prefs;
        }
        match self.api.fetch_prefs(user_id).await {
            Ok(prefs) => {
                self.cache
                    .write()
                    .unwrap_or_else(|e| e.into_inner())
                    .insert(user_id, prefs.clone());
                prefs
            },
            Err(error) => {
                warn!(user_id, %error, "config fetch failed, using defaults");
                UserPrefs::default()
            },
        }
    }

    /// Cache `prefs` and push them to the backend.
    ///
    /// The cache is updated even when the remote persist fails; the error is
    /// returned for the caller to log.
    pub async fn set(&self, user_id: u64, prefs: UserPrefs) -> perplexo_backend::Result<()> {
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(user_id, prefs.clone());
        self.api.persist_prefs(user_id, &prefs).await
    }

    fn cached(&self, user_id: u64) -> Option<UserPrefs> {
        self.cache.read().unwrap_or_else(|e| e.into_inner()).get(&user_id).cloned()
    }
}
