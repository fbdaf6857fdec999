//! Native transport backed by reqwest and an in-process cookie jar.
//!
//! The reqwest client itself never touches cookies. The jar is consulted
//! per request, so a request without `with_credentials` leaves the session
//! invisible to the server even when the jar holds it.

#[cfg(test)]
#[path = "cookie_jar_test.rs"]
mod cookie_jar_test;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Url;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, HeaderName, HeaderValue, SET_COOKIE};

use super::Transport;
use crate::error::HttpError;
use crate::request::{ApiRequest, ApiResponse};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// reqwest transport that stores and replays cookies for credentialed requests.
#[derive(Clone, Debug)]
pub struct CookieTransport {
    client: reqwest::Client,
    jar: Arc<Jar>,
}

impl CookieTransport {
    /// Build a transport with [`DEFAULT_REQUEST_TIMEOUT`] and an empty jar.
    ///
    /// # Errors
    ///
    /// Returns an error if the reqwest client cannot be constructed.
    pub fn new() -> Result<Self, HttpError> {
        Self::with_timeout(DEFAULT_REQUEST_TIMEOUT)
    }

    /// Build a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns an error if the reqwest client cannot be constructed.
    pub fn with_timeout(timeout: Duration) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            jar: Arc::new(Jar::default()),
        })
    }

    /// Whether the jar holds a cookie called `name` that would be sent to `url`.
    #[must_use]
    pub fn has_cookie(&self, url: &str, name: &str) -> bool {
        let Ok(url) = Url::parse(url) else {
            return false;
        };
        self.jar
            .cookies(&url)
            .and_then(|header| header.to_str().map(cookie_header_names).ok())
            .is_some_and(|names| names.iter().any(|n| n == name))
    }

    fn store_cookies(&self, response: &reqwest::Response) {
        let mut set_cookies = response.headers().get_all(SET_COOKIE).iter().peekable();
        if set_cookies.peek().is_some() {
            self.jar.set_cookies(&mut set_cookies, response.url());
        }
    }
}

#[async_trait::async_trait]
impl Transport for CookieTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpError> {
        let url =
            Url::parse(&request.url).map_err(|_| HttpError::InvalidUrl(request.url.clone()))?;

        let mut builder = self.client.request(request.method.clone(), url.clone());
        for (name, value) in &request.headers {
            let invalid = || HttpError::InvalidHeader { name: name.clone() };
            let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|_| invalid())?;
            let header_value = HeaderValue::from_str(value).map_err(|_| invalid())?;
            builder = builder.header(header_name, header_value);
        }
        if request.with_credentials {
            if let Some(cookies) = self.jar.cookies(&url) {
                builder = builder.header(COOKIE, cookies);
            }
        }
        if let Some(body) = &request.body {
            builder = builder.body(serde_json::to_vec(body)?);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HttpError::Timeout {
                    url: request.url.clone(),
                }
            } else {
                HttpError::Transport(e)
            }
        })?;

        if request.with_credentials {
            self.store_cookies(&response);
        }

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_owned(), v.to_owned()))
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            method = %request.method,
            url = %request.url,
            with_credentials = request.with_credentials,
            status,
            "request sent"
        );

        Ok(ApiResponse {
            status,
            url: final_url,
            headers,
            body,
        })
    }
}

fn cookie_header_names(header: &str) -> Vec<String> {
    header
        .split(';')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, _)| name.trim().to_owned())
        .collect()
}
