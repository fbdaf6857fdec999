//! Black-box session lifecycle verifier for the storefront SPA.
//!
//! This crate drives a real Chrome against a running application and its
//! real backend: it resets backend state, logs in through the UI, walks the
//! user menu to logout, and checks the rejected-login path. Network
//! responses are observed, never faked.
//!
//! SYSTEM CONTEXT
//! ==============
//! `config` resolves the environment cascade, `locator` finds UI elements
//! through prioritized strategies, `driver` is the page seam implemented by
//! `chrome`, `scenario` holds the two scenarios and `suite` runs them after
//! the best-effort `reset`.

pub mod chrome;
pub mod config;
pub mod driver;
pub mod error;
pub mod locator;
pub mod reset;
pub mod scenario;
pub mod suite;
pub mod wait;

#[cfg(test)]
mod testing;

pub use chrome::{ChromeOptions, ChromePage, ChromeSession};
pub use config::{E2eConfig, LoginCredentials, Timeouts};
pub use driver::{
    DialogObserver, ObservedResponse, PageDriver, Probe, ResponseObserver, RouteMatcher,
};
pub use error::E2eError;
pub use locator::{Locator, Target, TextPattern};
pub use reset::{ResetOutcome, reset_backend};
pub use scenario::Scenario;
pub use suite::{ScenarioReport, SuiteReport, run_suite};
