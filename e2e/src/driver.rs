//! Page driver seam between scenarios and a concrete browser.
//!
//! Scenarios only talk to [`PageDriver`]; `chrome` implements it over the
//! DevTools protocol. Network and dialog events are pushed by the driver
//! into channels owned by [`ResponseObserver`] and [`DialogObserver`], so a
//! scenario subscribes first and consumes later without blocking on events
//! that may never fire.

#[cfg(test)]
#[path = "driver_test.rs"]
mod driver_test;

use std::time::Duration;

use serde::Deserialize;
use tokio::sync::mpsc;

use crate::error::E2eError;
use crate::locator::Target;

/// Where a located element stands right now.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Probe {
    Absent,
    Hidden,
    Visible,
}

/// A response the page received for a watched route.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObservedResponse {
    pub method: String,
    pub url: String,
    pub status: u16,
}

/// Method plus URL glob, e.g. `POST **/api/usuarios/login`.
///
/// The glob is matched against the full URL with query and fragment removed.
#[derive(Clone, Debug)]
pub struct RouteMatcher {
    method: String,
    raw: String,
    pattern: glob::Pattern,
}

impl RouteMatcher {
    /// # Errors
    ///
    /// Returns [`E2eError::Config`] for a malformed glob.
    pub fn new(method: &str, pattern: &str) -> Result<Self, E2eError> {
        let compiled = glob::Pattern::new(pattern)
            .map_err(|e| E2eError::Config(format!("route pattern {pattern:?}: {e}")))?;
        Ok(Self {
            method: method.to_ascii_uppercase(),
            raw: pattern.to_owned(),
            pattern: compiled,
        })
    }

    #[must_use]
    pub fn matches(&self, method: &str, url: &str) -> bool {
        if !method.eq_ignore_ascii_case(&self.method) {
            return false;
        }
        let end = url.find(['?', '#']).unwrap_or(url.len());
        self.pattern.matches(&url[..end])
    }
}

impl std::fmt::Display for RouteMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.method, self.raw)
    }
}

/// Receives the responses a driver observed for one route.
#[derive(Debug)]
pub struct ResponseObserver {
    route: String,
    rx: mpsc::UnboundedReceiver<ObservedResponse>,
}

impl ResponseObserver {
    /// Create an observer and the sender a driver feeds it through.
    #[must_use]
    pub fn channel(route: &RouteMatcher) -> (mpsc::UnboundedSender<ObservedResponse>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            tx,
            Self {
                route: route.to_string(),
                rx,
            },
        )
    }

    /// Wait for the next observed response.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Timeout`] when nothing arrives in time, or
    /// [`E2eError::ObserverClosed`] when the driver stopped listening.
    pub async fn next_within(&mut self, timeout: Duration) -> Result<ObservedResponse, E2eError> {
        match tokio::time::timeout(timeout, self.rx.recv()).await {
            Ok(Some(response)) => Ok(response),
            Ok(None) => Err(E2eError::ObserverClosed(self.route.clone())),
            Err(_) => Err(E2eError::Timeout {
                what: format!("response to {}", self.route),
                after: timeout,
            }),
        }
    }

    /// Fail if responses beyond the ones already consumed were recorded.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::ExtraResponses`] with the number of leftovers.
    pub fn assert_quiet(&mut self) -> Result<(), E2eError> {
        let mut count = 0;
        while self.rx.try_recv().is_ok() {
            count += 1;
        }
        if count == 0 {
            Ok(())
        } else {
            Err(E2eError::ExtraResponses {
                route: self.route.clone(),
                count,
            })
        }
    }
}

/// Collects native dialog texts (alert/confirm/prompt) as they fire.
#[derive(Debug)]
pub struct DialogObserver {
    rx: mpsc::UnboundedReceiver<String>,
}

impl DialogObserver {
    #[must_use]
    pub fn channel() -> (mpsc::UnboundedSender<String>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { rx })
    }

    /// Every dialog text recorded so far; never waits.
    pub fn drain(&mut self) -> Vec<String> {
        let mut texts = Vec::new();
        while let Ok(text) = self.rx.try_recv() {
            texts.push(text);
        }
        texts
    }
}

/// Browser page operations the scenarios need.
#[async_trait::async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to an absolute URL and wait for the load.
    async fn visit(&self, url: &str) -> Result<(), E2eError>;

    /// `window.location.href` of the page.
    async fn current_url(&self) -> Result<String, E2eError>;

    /// Check a target once, without waiting.
    async fn probe(&self, target: &Target) -> Result<Probe, E2eError>;

    /// Click the element the target resolves to.
    async fn click(&self, target: &Target) -> Result<(), E2eError>;

    /// Clear the input the target resolves to and type `text` into it.
    async fn fill(&self, target: &Target, text: &str) -> Result<(), E2eError>;

    /// `localStorage.getItem(key)`.
    async fn local_storage_item(&self, key: &str) -> Result<Option<String>, E2eError>;

    /// Drop every browser cookie plus the local storage of `origin`.
    async fn clear_site_data(&self, origin: &str) -> Result<(), E2eError>;

    /// Start recording responses for `route`.
    async fn observe_responses(&self, route: &RouteMatcher) -> Result<ResponseObserver, E2eError>;

    /// Start recording native dialogs; the driver accepts each one.
    async fn observe_dialogs(&self) -> Result<DialogObserver, E2eError>;
}
