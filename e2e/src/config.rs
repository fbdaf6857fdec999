//! Verifier configuration resolved from the environment.
//!
//! DESIGN
//! ======
//! Every value goes through the same cascade: the named override, then the
//! named alternates in order, then a literal default. Empty strings count as
//! unset. Unparseable numbers and booleans fall back to the default rather
//! than aborting the run.

#[cfg(test)]
#[path = "config_test.rs"]
mod config_test;

use std::path::PathBuf;
use std::time::Duration;

use crate::error::E2eError;

pub const DEFAULT_APP_URL: &str = "http://localhost:4200";
pub const DEFAULT_EMAIL: &str = "eren@gmail.com";
pub const DEFAULT_PASSWORD: &str = "123456";
pub const INVALID_EMAIL: &str = "wrong@gmail.com";
pub const INVALID_PASSWORD: &str = "wrongpass";
pub const DEFAULT_LOGOUT_ROUTES: &[&str] = &["/login", "/home"];

pub const EMAIL_KEYS: &[&str] = &["USER_EMAIL", "CYPRESS_USER_EMAIL"];
pub const PASSWORD_KEYS: &[&str] = &["USER_PASS", "CYPRESS_USER_PASS"];
pub const APP_URL_KEYS: &[&str] = &["BASE_URL", "CYPRESS_BASE_URL"];
pub const API_BASE_KEYS: &[&str] = &["API_BASE", "CYPRESS_API_BASE"];

/// Email/password pair typed into the login form.
#[derive(Clone, PartialEq, Eq)]
pub struct LoginCredentials {
    pub email: String,
    pub password: String,
}

impl LoginCredentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Bounds for every wait the verifier performs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Timeouts {
    /// Element presence/visibility.
    pub element: Duration,
    /// URL transitions.
    pub navigation: Duration,
    /// Successful login response.
    pub login_response: Duration,
    /// Rejected login response.
    pub rejected_login_response: Duration,
    /// Reset endpoint request.
    pub reset: Duration,
    /// Interval between polls inside a bounded wait.
    pub poll: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            element: Duration::from_secs(10),
            navigation: Duration::from_secs(10),
            login_response: Duration::from_secs(20),
            rejected_login_response: Duration::from_secs(15),
            reset: Duration::from_secs(10),
            poll: Duration::from_millis(100),
        }
    }
}

/// Runtime configuration for a verifier run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct E2eConfig {
    /// Base URL of the running application (e.g. `"http://localhost:4200"`).
    pub app_url: String,
    /// Base URL the reset endpoint lives under.
    pub api_base: String,
    pub valid: LoginCredentials,
    pub invalid: LoginCredentials,
    pub timeouts: Timeouts,
    pub headless: bool,
    pub no_sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    /// Routes accepted as the destination after logout.
    pub logout_routes: Vec<String>,
}

impl E2eConfig {
    /// Load config from the process environment.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load config from an arbitrary key lookup.
    ///
    /// - `USER_EMAIL` / `CYPRESS_USER_EMAIL`, default `eren@gmail.com`
    /// - `USER_PASS` / `CYPRESS_USER_PASS`, default `123456`
    /// - `BASE_URL` / `CYPRESS_BASE_URL`, default `http://localhost:4200`
    /// - `API_BASE` / `CYPRESS_API_BASE`, default the app URL
    /// - `E2E_HEADLESS` (default true), `E2E_NO_SANDBOX` (default false)
    /// - `CHROME_PATH`
    /// - `E2E_ELEMENT_TIMEOUT_SECS` (10), `E2E_NAVIGATION_TIMEOUT_SECS` (10),
    ///   `E2E_LOGIN_TIMEOUT_SECS` (20), `E2E_REJECTED_LOGIN_TIMEOUT_SECS` (15),
    ///   `E2E_RESET_TIMEOUT_SECS` (10)
    /// - `E2E_LOGOUT_ROUTES`, comma separated, default `/login,/home`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let app_url = resolve_or(&lookup, APP_URL_KEYS, DEFAULT_APP_URL);
        let api_base = resolve_or(&lookup, API_BASE_KEYS, &app_url);
        let valid = LoginCredentials::new(
            resolve_or(&lookup, EMAIL_KEYS, DEFAULT_EMAIL),
            resolve_or(&lookup, PASSWORD_KEYS, DEFAULT_PASSWORD),
        );

        let defaults = Timeouts::default();
        let secs = |key: &str, default: Duration| {
            resolve(&lookup, &[key])
                .and_then(|raw| raw.trim().parse::<u64>().ok())
                .map_or(default, Duration::from_secs)
        };
        let timeouts = Timeouts {
            element: secs("E2E_ELEMENT_TIMEOUT_SECS", defaults.element),
            navigation: secs("E2E_NAVIGATION_TIMEOUT_SECS", defaults.navigation),
            login_response: secs("E2E_LOGIN_TIMEOUT_SECS", defaults.login_response),
            rejected_login_response: secs(
                "E2E_REJECTED_LOGIN_TIMEOUT_SECS",
                defaults.rejected_login_response,
            ),
            reset: secs("E2E_RESET_TIMEOUT_SECS", defaults.reset),
            poll: defaults.poll,
        };

        let headless = resolve(&lookup, &["E2E_HEADLESS"])
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(true);
        let no_sandbox = resolve(&lookup, &["E2E_NO_SANDBOX"])
            .and_then(|raw| parse_bool(&raw))
            .unwrap_or(false);
        let chrome_path = resolve(&lookup, &["CHROME_PATH"]).map(PathBuf::from);
        let logout_routes = resolve(&lookup, &["E2E_LOGOUT_ROUTES"])
            .map(|raw| parse_routes(&raw))
            .filter(|routes| !routes.is_empty())
            .unwrap_or_else(|| DEFAULT_LOGOUT_ROUTES.iter().map(|r| (*r).to_owned()).collect());

        Self {
            app_url: trim_base(&app_url),
            api_base: trim_base(&api_base),
            valid,
            invalid: LoginCredentials::new(INVALID_EMAIL, INVALID_PASSWORD),
            timeouts,
            headless,
            no_sandbox,
            chrome_path,
            logout_routes,
        }
    }

    /// Absolute URL of an application route.
    #[must_use]
    pub fn app_route(&self, route: &str) -> String {
        format!("{}{route}", self.app_url)
    }

    /// Scheme, host and port of the application, as used for site data.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Config`] when the app URL cannot be parsed.
    pub fn app_origin(&self) -> Result<String, E2eError> {
        let url = url::Url::parse(&self.app_url)
            .map_err(|e| E2eError::Config(format!("app URL {:?}: {e}", self.app_url)))?;
        Ok(url.origin().ascii_serialization())
    }
}

/// First non-empty value among `keys`.
pub fn resolve(lookup: &impl Fn(&str) -> Option<String>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| lookup(key))
        .find(|value| !value.trim().is_empty())
}

/// [`resolve`] with a literal fallback.
pub fn resolve_or(
    lookup: &impl Fn(&str) -> Option<String>,
    keys: &[&str],
    default: &str,
) -> String {
    resolve(lookup, keys).unwrap_or_else(|| default.to_owned())
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_routes(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|route| !route.is_empty())
        .map(|route| {
            if route.starts_with('/') {
                route.to_owned()
            } else {
                format!("/{route}")
            }
        })
        .collect()
}

fn trim_base(url: &str) -> String {
    url.trim().trim_end_matches('/').to_owned()
}
