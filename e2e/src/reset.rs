//! Best-effort backend reset before the suite.
//!
//! The reset endpoint is optional test infrastructure. Whatever happens here
//! (any status, a refused connection, a timeout) is logged and the suite
//! carries on.

#[cfg(test)]
#[path = "reset_test.rs"]
mod reset_test;

use credentials::{ApiRequest, HttpClient};

pub const RESET_PATH: &str = "/test/reset";

/// What the reset call came back with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ResetOutcome {
    /// The endpoint answered; any status counts.
    Status(u16),
    /// No answer: connection failure, timeout, bad URL.
    Unreachable(String),
}

#[must_use]
pub fn reset_url(api_base: &str) -> String {
    format!("{}{RESET_PATH}", api_base.trim_end_matches('/'))
}

/// `POST {api_base}/test/reset` through the application client. Never fails.
pub async fn reset_backend(client: &HttpClient, api_base: &str) -> ResetOutcome {
    let url = reset_url(api_base);
    match client.send(ApiRequest::post(&url)).await {
        Ok(response) => {
            tracing::info!(%url, status = response.status, "reset status");
            ResetOutcome::Status(response.status)
        }
        Err(e) => {
            tracing::warn!(%url, error = %e, "reset endpoint unreachable; continuing");
            ResetOutcome::Unreachable(e.to_string())
        }
    }
}
