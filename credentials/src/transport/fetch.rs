//! Browser transport over the Fetch API (`hydrate` feature).
//!
//! The browser owns the cookie store here. The credentials flag becomes the
//! fetch `credentials` mode: `include` when set, `same-origin` otherwise.

use gloo_net::http::{Request, RequestBuilder};
use web_sys::RequestCredentials;

use super::Transport;
use crate::error::HttpError;
use crate::request::{ApiRequest, ApiResponse, Method};

/// Fetch-backed transport for WASM builds.
#[derive(Clone, Copy, Debug, Default)]
pub struct FetchTransport;

fn builder_for(request: &ApiRequest) -> Result<RequestBuilder, HttpError> {
    let url = request.url.as_str();
    let builder = match request.method {
        Method::GET => Request::get(url),
        Method::POST => Request::post(url),
        Method::PUT => Request::put(url),
        Method::PATCH => Request::patch(url),
        Method::DELETE => Request::delete(url),
        ref other => return Err(HttpError::Fetch(format!("unsupported method {other}"))),
    };
    Ok(builder)
}

fn credentials_mode(with_credentials: bool) -> RequestCredentials {
    if with_credentials {
        RequestCredentials::Include
    } else {
        RequestCredentials::SameOrigin
    }
}

#[async_trait::async_trait(?Send)]
impl Transport for FetchTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let mut builder =
            builder_for(&request)?.credentials(credentials_mode(request.with_credentials));
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        let prepared = match &request.body {
            Some(body) => builder.json(body),
            None => builder.build(),
        }
        .map_err(|e| HttpError::Fetch(e.to_string()))?;

        let response = prepared
            .send()
            .await
            .map_err(|e| HttpError::Fetch(e.to_string()))?;
        let status = response.status();
        let url = response.url();
        let headers = response.headers().entries().collect();
        let body = response
            .binary()
            .await
            .map_err(|e| HttpError::Fetch(e.to_string()))?;

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            with_credentials = request.with_credentials,
            status,
            "fetch sent"
        );

        Ok(ApiResponse {
            status,
            url,
            headers,
            body,
        })
    }
}
