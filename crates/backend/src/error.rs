use thiserror::Error;

/// Crate-wide result type for backend calls.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed errors for answering-backend calls.
#[derive(Debug, Error)]
pub enum Error {
    /// The backend rejected the call because the per-user hourly quota ran out.
    #[error("rate limit exceeded: {limit} requests per hour")]
    RateLimited { limit: u32 },

    /// Any non-2xx status other than the rate-limit case.
    #[error("backend returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    /// Transport-level failure, including per-request timeouts.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
