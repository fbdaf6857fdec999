//! Outgoing HTTP pipeline that propagates the session cookie.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every request the application issues is described by an [`ApiRequest`],
//! passed through the registered [`Interceptor`] stages of an [`HttpClient`],
//! and only then handed to a [`Transport`]. [`app_client`] registers the
//! [`CredentialsInterceptor`], so no call site has to opt into sending the
//! `accessToken` cookie on its own.
//!
//! Native builds send through [`CookieTransport`] (reqwest + cookie jar);
//! the `hydrate` feature adds [`FetchTransport`] for the browser.

pub mod client;
pub mod error;
pub mod interceptor;
pub mod request;
pub mod transport;

pub use client::{HttpClient, HttpClientBuilder, app_client};
pub use error::HttpError;
pub use interceptor::{CredentialsInterceptor, Interceptor};
pub use request::{ApiRequest, ApiResponse, Method};
pub use transport::Transport;
#[cfg(not(target_arch = "wasm32"))]
pub use transport::cookie_jar::CookieTransport;
#[cfg(all(feature = "hydrate", target_arch = "wasm32"))]
pub use transport::fetch::FetchTransport;

/// Name of the cookie that carries the authenticated session.
pub const SESSION_COOKIE: &str = "accessToken";
