//! Verifier error type.

use std::time::Duration;

/// Reasons a scenario (or the harness around it) failed.
///
/// Every variant ends the scenario; nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum E2eError {
    /// The browser or the DevTools connection failed.
    #[error("browser error: {0}")]
    Browser(String),

    /// A request sent by the harness itself failed.
    #[error("http request failed: {0}")]
    Http(#[from] credentials::HttpError),

    /// A bounded wait expired.
    #[error("timed out after {after:?} waiting for {what}")]
    Timeout { what: String, after: Duration },

    /// An observed response carried the wrong status code.
    #[error("{what}: expected status {expected}, got {actual}")]
    UnexpectedStatus {
        what: &'static str,
        expected: u16,
        actual: u16,
    },

    /// A credential artifact outlived logout.
    #[error("local storage still holds `{key}` after logout")]
    CredentialLeft { key: String },

    /// A native dialog fired with text outside the accepted set.
    #[error("dialog text {text:?} does not match /{pattern}/")]
    UnexpectedDialog { text: String, pattern: String },

    /// An authenticated-only element was still visible after logout.
    #[error("{what} still reachable after logout")]
    StillReachable { what: String },

    /// More matching responses arrived than the scenario issued.
    #[error("{count} unexpected extra response(s) from {route}")]
    ExtraResponses { route: String, count: usize },

    /// A response or dialog subscription ended before delivering.
    #[error("observer for {0} closed")]
    ObserverClosed(String),

    /// An injected page script failed or returned something unexpected.
    #[error("page script failed: {0}")]
    Script(String),

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}
