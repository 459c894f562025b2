//! Wire types for the answering backend.

use serde::{Deserialize, Serialize};

/// Per-user bot preferences. The backend is the system of record; the bot
/// caches these and writes changes back through `/config/{user_id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserPrefs {
    pub model: String,
    pub focus: String,
    /// `"busca"` answers via search, `"normal"` is casual chat.
    pub mode: String,
    pub reasoning: bool,
    pub return_citations: bool,
    pub return_images: bool,
}

impl Default for UserPrefs {
    fn default() -> Self {
        Self {
            model: "sonar".into(),
            focus: "web".into(),
            mode: "busca".into(),
            reasoning: false,
            return_citations: true,
            return_images: false,
        }
    }
}

/// Body for `POST /search`. Also used for document summarization, which is a
/// search with a summary prompt and writing focus.
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub model: String,
    pub focus: String,
    pub enable_reasoning: bool,
    pub return_citations: bool,
    pub return_images: bool,
    pub user_id: u64,
}

/// Body for `POST /vision`.
#[derive(Debug, Clone, Serialize)]
pub struct VisionRequest {
    pub query: String,
    pub image_base64: String,
    pub model: String,
    pub user_id: u64,
}

/// Body for `POST /transcribe`.
#[derive(Debug, Clone, Serialize)]
pub struct TranscribeRequest {
    pub audio_base64: String,
    pub language: String,
    pub user_id: u64,
}

/// Response from `/search` and `/vision`. The backend answers in `answer`
/// or `text` depending on the path, so both are optional here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub answer: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub citations: Vec<Citation>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub focus_mode: Option<String>,
}

impl SearchResponse {
    /// Answer text with the `answer` field taking precedence over `text`.
    /// Empty strings count as absent.
    #[must_use]
    pub fn answer_text(&self) -> Option<&str> {
        [self.answer.as_deref(), self.text.as_deref()]
            .into_iter()
            .flatten()
            .find(|s| !s.is_empty())
    }
}

/// One citation entry from a search response.
#[derive(Debug, Clone, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
}

/// Response from `POST /transcribe`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TranscribeResponse {
    #[serde(default)]
    pub text: Option<String>,
}

/// Response from `GET /health`.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub scraper_available: Option<bool>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_prefs_defaults() {
        let prefs = UserPrefs::default();
        assert_eq!(prefs.model, "sonar");
        assert_eq!(prefs.focus, "web");
        assert_eq!(prefs.mode, "busca");
        assert!(!prefs.reasoning);
        assert!(prefs.return_citations);
        assert!(!prefs.return_images);
    }

    #[test]
    fn user_prefs_missing_fields_fall_back_to_defaults() {
        let prefs: UserPrefs = serde_json::from_str(r#"{"model": "sonar-pro"}"#).unwrap();
        assert_eq!(prefs.model, "sonar-pro");
        assert_eq!(prefs.focus, "web");
        assert!(prefs.return_citations);
    }

    #[test]
    fn user_prefs_round_trips() {
        let prefs = UserPrefs {
            model: "deep-research".into(),
            focus: "academic".into(),
            mode: "normal".into(),
            reasoning: true,
            return_citations: false,
            return_images: true,
        };
        let json = serde_json::to_string(&prefs).unwrap();
        let back: UserPrefs = serde_json::from_str(&json).unwrap();
        assert_eq!(back, prefs);
    }

    #[test]
    fn search_response_answer_precedes_text() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"answer": "a", "text": "t"}"#).unwrap();
        assert_eq!(response.answer_text(), Some("a"));

        let text_only: SearchResponse = serde_json::from_str(r#"{"text": "t"}"#).unwrap();
        assert_eq!(text_only.answer_text(), Some("t"));

        let empty: SearchResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(empty.answer_text(), None);
    }

    #[test]
    fn search_response_skips_empty_answer_fields() {
        let response: SearchResponse =
            serde_json::from_str(r#"{"answer": "", "text": "t"}"#).unwrap();
        assert_eq!(response.answer_text(), Some("t"));

        let blank: SearchResponse = serde_json::from_str(r#"{"answer": "", "text": ""}"#).unwrap();
        assert_eq!(blank.answer_text(), None);
    }

    #[test]
    fn search_response_tolerates_unknown_fields() {
        let json = r#"{
            "answer": "ok",
            "citations": [{"title": "Doc", "url": "https://example.com"}],
            "images": ["https://example.com/a.png"],
            "model_used": "sonar",
            "focus_mode": "web",
            "response_time_ms": 321,
            "timestamp": "2026-01-01T00:00:00Z"
        }"#;
        let response: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.citations.len(), 1);
        assert_eq!(response.citations[0].title.as_deref(), Some("Doc"));
        assert_eq!(response.images.len(), 1);
        assert_eq!(response.model_used.as_deref(), Some("sonar"));
    }
}
