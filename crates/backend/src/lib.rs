//! HTTP client for the Perplexo answering backend.
//!
//! The backend exposes search, vision, and transcription endpoints plus a
//! per-user preference store keyed by `(user_id, platform)`. Wire shapes
//! live in [`types`]; [`client::ApiClient`] is the typed entry point.

pub mod client;
pub mod error;
pub mod types;

pub use {
    client::ApiClient,
    error::{Error, Result},
    types::{
        Citation, HealthResponse, SearchRequest, SearchResponse, TranscribeRequest,
        TranscribeResponse, UserPrefs, VisionRequest,
    },
};
