//! Typed client for the Perplexo answering backend.

use {
    reqwest::{Client, Response, StatusCode},
    serde::{Serialize, de::DeserializeOwned},
    std::time::Duration,
};

use crate::{
    error::{Error, Result},
    types::{
        HealthResponse, SearchRequest, SearchResponse, TranscribeRequest, TranscribeResponse,
        UserPrefs, VisionRequest,
    },
};

/// Quota reported to the user when a 429 body omits the `limit` field.
const DEFAULT_RATE_LIMIT: u32 = 20;

/// Timeout for the lightweight config and health endpoints.
const CONFIG_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the answering backend. Cheap to clone; holds the base URL
/// and the platform tag sent with every call.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    platform: String,
}

impl ApiClient {
    /// Create a client for the backend at `base_url`, tagging all traffic
    /// with `platform`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, platform: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
            platform: platform.into(),
        }
    }

    /// The platform tag this client stamps on requests.
    #[must_use]
    pub fn platform(&self) -> &str {
        &self.platform
    }

    /// Probe `GET /health`.
    pub async fn health(&self) -> Result<HealthResponse> {
        let response = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(CONFIG_TIMEOUT)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Fetch the stored preferences for one user.
    pub async fn fetch_prefs(&self, user_id: u64) -> Result<UserPrefs> {
        let response = self
            .client
            .get(format!("{}/config/{user_id}", self.base_url))
            .query(&[("platform", self.platform.as_str())])
            .timeout(CONFIG_TIMEOUT)
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Persist one user's preferences.
    pub async fn persist_prefs(&self, user_id: u64, prefs: &UserPrefs) -> Result<()> {
        let response = self
            .client
            .post(format!("{}/config/{user_id}", self.base_url))
            .query(&[("platform", self.platform.as_str())])
            .timeout(CONFIG_TIMEOUT)
            .json(prefs)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// Run a search query. A 429 status surfaces as [`Error::RateLimited`]
    /// with the limit taken from the response body.
    pub async fn search(
        &self,
        request: &SearchRequest,
        timeout: Duration,
    ) -> Result<SearchResponse> {
        self.post_json("/search", request, timeout).await
    }

    /// Analyze an image.
    pub async fn vision(
        &self,
        request: &VisionRequest,
        timeout: Duration,
    ) -> Result<SearchResponse> {
        self.post_json("/vision", request, timeout).await
    }

    /// Transcribe an audio payload.
    pub async fn transcribe(
        &self,
        request: &TranscribeRequest,
        timeout: Duration,
    ) -> Result<TranscribeResponse> {
        self.post_json("/transcribe", request, timeout).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
        timeout: Duration,
    ) -> Result<T> {
        let response = self
            .client
            .post(format!("{}{path}", self.base_url))
            .timeout(timeout)
            .json(&WithPlatform {
                inner: body,
                platform: &self.platform,
            })
            .send()
            .await?;
        Self::parse(response).await
    }

    /// Map non-success statuses to typed errors, passing the response
    /// through otherwise.
    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            let body: RateLimitBody = response.json().await.unwrap_or_default();
            return Err(Error::RateLimited {
                limit: body.limit.unwrap_or(DEFAULT_RATE_LIMIT),
            });
        }
        let body = response.text().await.unwrap_or_default();
        Err(Error::Status { status, body })
    }

    async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
        let response = Self::check(response).await?;
        Ok(response.json().await?)
    }
}

/// Serialization wrapper stamping the platform tag onto a request body.
#[derive(Serialize)]
struct WithPlatform<'a, T: Serialize> {
    #[serde(flatten)]
    inner: &'a T,
    platform: &'a str,
}

#[derive(Debug, Default, serde::Deserialize)]
struct RateLimitBody {
    #[serde(default)]
    limit: Option<u32>,
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, mockito::Matcher, serde_json::json};

    fn search_request(query: &str) -> SearchRequest {
        SearchRequest {
            query: query.into(),
            model: "sonar".into(),
            focus: "web".into(),
            enable_reasoning: false,
            return_citations: true,
            return_images: false,
            user_id: 42,
        }
    }

    #[tokio::test]
    async fn search_sends_platform_and_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/search")
            .match_body(Matcher::PartialJson(json!({
                "query": "qual a capital do Brasil?",
                "model": "sonar",
                "user_id": 42,
                "platform": "whatsapp",
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "answer": "Brasília.",
                    "citations": [{"title": "Wiki", "url": "https://example.com"}],
                    "images": [],
                    "model_used": "sonar",
                    "focus_mode": "web"
                }"#,
            )
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), "whatsapp");
        let response = client
            .search(
                &search_request("qual a capital do Brasil?"),
                Duration::from_secs(5),
            )
            .await
            .unwrap();

        assert_eq!(response.answer_text(), Some("Brasília."));
        assert_eq!(response.citations.len(), 1);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn rate_limit_surfaces_limit_from_body() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(429)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Rate limit exceeded", "limit": 7, "reset_time": "soon"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), "whatsapp");
        let err = client
            .search(&search_request("hi"), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            Error::RateLimited { limit } => assert_eq!(limit, 7),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn rate_limit_defaults_when_body_is_not_json() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(429)
            .with_body("too many")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), "whatsapp");
        let err = client
            .search(&search_request("hi"), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            Error::RateLimited { limit } => assert_eq!(limit, 20),
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn server_error_maps_to_status_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/search")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), "whatsapp");
        let err = client
            .search(&search_request("hi"), Duration::from_secs(5))
            .await
            .unwrap_err();

        match err {
            Error::Status { status, body } => {
                assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
                assert_eq!(body, "boom");
            },
            other => panic!("expected Status, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn fetch_prefs_scopes_by_platform() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/config/42")
            .match_query(Matcher::UrlEncoded("platform".into(), "whatsapp".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"model": "gpt-5.2", "focus": "academic"}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), "whatsapp");
        let prefs = client.fetch_prefs(42).await.unwrap();

        assert_eq!(prefs.model, "gpt-5.2");
        assert_eq!(prefs.focus, "academic");
        // Unspecified fields come from the defaults.
        assert_eq!(prefs.mode, "busca");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn persist_prefs_posts_full_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/config/42")
            .match_query(Matcher::UrlEncoded("platform".into(), "whatsapp".into()))
            .match_body(Matcher::PartialJson(json!({
                "model": "sonar",
                "mode": "busca",
                "return_citations": true,
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"success": true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(server.url(), "whatsapp");
        client
            .persist_prefs(42, &UserPrefs::default())
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn trailing_slash_in_base_url_is_tolerated() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/health")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"status": "ok", "scraper_available": true}"#)
            .create_async()
            .await;

        let client = ApiClient::new(format!("{}/", server.url()), "whatsapp");
        let health = client.health().await.unwrap();

        assert_eq!(health.status, "ok");
        assert_eq!(health.scraper_available, Some(true));
        mock.assert_async().await;
    }
}
