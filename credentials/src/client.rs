//! Interceptor pipeline in front of a transport.
//!
//! SYSTEM CONTEXT
//! ==============
//! Application code builds an [`ApiRequest`] and calls [`HttpClient::send`].
//! The client runs every registered interceptor in registration order and
//! forwards the result to its [`Transport`]. [`app_client`] is the client the
//! application wires up once at startup.

#[cfg(test)]
#[path = "client_test.rs"]
mod client_test;

use std::sync::Arc;

use crate::error::HttpError;
use crate::interceptor::{CredentialsInterceptor, Interceptor};
use crate::request::{ApiRequest, ApiResponse};
use crate::transport::Transport;

/// HTTP client that runs interceptors before handing requests to a transport.
#[derive(Clone)]
pub struct HttpClient {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
    transport: Arc<dyn Transport>,
}

/// Collects interceptors for an [`HttpClient`].
#[derive(Default)]
pub struct HttpClientBuilder {
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl HttpClientBuilder {
    /// Append a stage; stages run in the order they were added.
    #[must_use]
    pub fn with_interceptor(mut self, interceptor: impl Interceptor + 'static) -> Self {
        self.interceptors.push(Arc::new(interceptor));
        self
    }

    #[must_use]
    pub fn build(self, transport: impl Transport + 'static) -> HttpClient {
        HttpClient {
            interceptors: self.interceptors.into(),
            transport: Arc::new(transport),
        }
    }
}

impl HttpClient {
    #[must_use]
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::default()
    }

    /// Number of registered interceptor stages.
    #[must_use]
    pub fn interceptor_count(&self) -> usize {
        self.interceptors.len()
    }

    /// Run the request through every interceptor without sending it.
    #[must_use]
    pub fn prepare(&self, request: ApiRequest) -> ApiRequest {
        self.interceptors
            .iter()
            .fold(request, |req, stage| stage.intercept(req))
    }

    /// Intercept and send a request.
    ///
    /// # Errors
    ///
    /// Returns the transport's [`HttpError`]; interception itself never fails.
    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let request = self.prepare(request);
        self.transport.send(request).await
    }

    /// `GET url` through the pipeline.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn get(&self, url: impl Into<String>) -> Result<ApiResponse, HttpError> {
        self.send(ApiRequest::get(url)).await
    }

    /// `POST url` with a JSON body through the pipeline.
    ///
    /// # Errors
    ///
    /// See [`HttpClient::send`].
    pub async fn post_json(
        &self,
        url: impl Into<String>,
        body: serde_json::Value,
    ) -> Result<ApiResponse, HttpError> {
        self.send(ApiRequest::post(url).json(body)).await
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("interceptors", &self.interceptors.len())
            .finish_non_exhaustive()
    }
}

/// The application's HTTP client: every request carries credentials.
#[must_use]
pub fn app_client(transport: impl Transport + 'static) -> HttpClient {
    HttpClient::builder()
        .with_interceptor(CredentialsInterceptor)
        .build(transport)
}
