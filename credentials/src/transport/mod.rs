//! Final pipeline stage: putting the request on the wire.
//!
//! `cookie_jar` is the native transport (reqwest with a shared jar) and
//! `fetch` the browser one (gloo-net, `hydrate` feature). Both honor
//! [`ApiRequest::with_credentials`](crate::ApiRequest) the way a browser
//! does: cookies only travel, and are only kept, when the flag is set.

#[cfg(not(target_arch = "wasm32"))]
pub mod cookie_jar;
#[cfg(all(feature = "hydrate", target_arch = "wasm32"))]
pub mod fetch;

use crate::error::HttpError;
use crate::request::{ApiRequest, ApiResponse};

/// Sends fully intercepted requests.
#[cfg_attr(target_arch = "wasm32", async_trait::async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait::async_trait)]
pub trait Transport: Send + Sync {
    /// Send the request and collect the whole response.
    ///
    /// # Errors
    ///
    /// Returns an [`HttpError`] when the request cannot be built, does not
    /// complete in time, or fails at the network level. Non-2xx statuses are
    /// responses, not errors.
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError>;
}
