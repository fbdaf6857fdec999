//! Transport error type.

/// Errors produced while sending a request or decoding its response.
///
/// The interceptor stages never produce these; only a [`crate::Transport`]
/// or a response decoder can fail.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// The request URL could not be parsed.
    #[error("invalid request URL: {0}")]
    InvalidUrl(String),

    /// A header name or value was rejected by the transport.
    #[error("invalid header `{name}`")]
    InvalidHeader { name: String },

    /// The request did not complete before the transport timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// The underlying HTTP client failed.
    #[error("http request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The browser fetch call failed.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A response body could not be decoded as JSON.
    #[error("response decode failed: {0}")]
    Decode(#[from] serde_json::Error),
}
