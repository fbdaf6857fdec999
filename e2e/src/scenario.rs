//! Login/logout and rejected-login scenarios.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each scenario starts from [`prepare`] (clean site data, fresh login page)
//! and talks to the page only through [`PageDriver`]. The login call is
//! observed on the wire, so the backend's real status is what gets asserted.

#[cfg(test)]
#[path = "scenario_test.rs"]
mod scenario_test;

use std::time::Duration;

use crate::config::{E2eConfig, LoginCredentials};
use crate::driver::{ObservedResponse, PageDriver, RouteMatcher};
use crate::error::E2eError;
use crate::locator::{self, TextPattern};
use crate::wait::{wait_for_url, wait_until};

pub const LOGIN_ROUTE: &str = "/login";
pub const HOME_ROUTE: &str = "/home";
pub const LOGIN_API: &str = "**/api/usuarios/login";

/// Local storage keys that may hold the session token, in lookup order.
pub const CREDENTIAL_KEYS: &[&str] = &["authToken", "token", "accessToken"];

/// Texts a rejected login may show in a native alert.
#[must_use]
pub fn rejection_alert() -> TextPattern {
    TextPattern::regex_ci(
        "El mail ingresado no se encuentra registrado|Credenciales incorrectas|error",
    )
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// Valid login, menu → account → logout, token gone.
    LoginLogout,
    /// Unregistered email is answered with 404 and the page stays on login.
    InvalidCredentials,
}

impl Scenario {
    pub const ALL: [Self; 2] = [Self::LoginLogout, Self::InvalidCredentials];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::LoginLogout => "login-logout",
            Self::InvalidCredentials => "invalid-credentials",
        }
    }

    /// Run the scenario body; the page must already be on the login route.
    ///
    /// # Errors
    ///
    /// Returns the first failed expectation or driver error.
    pub async fn run(self, page: &dyn PageDriver, config: &E2eConfig) -> Result<(), E2eError> {
        match self {
            Self::LoginLogout => login_and_logout(page, config).await,
            Self::InvalidCredentials => invalid_credentials_rejected(page, config).await,
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Scenario {
    type Err = E2eError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.name() == s)
            .ok_or_else(|| E2eError::Config(format!("unknown scenario {s:?}")))
    }
}

/// Route matcher for the login call.
///
/// # Errors
///
/// Never in practice; the pattern is a constant.
pub fn login_route() -> Result<RouteMatcher, E2eError> {
    RouteMatcher::new("POST", LOGIN_API)
}

/// Clear cookies/local storage for the app origin and open the login page.
///
/// # Errors
///
/// Returns a config error for an unparseable app URL, or a driver error.
pub async fn prepare(page: &dyn PageDriver, config: &E2eConfig) -> Result<(), E2eError> {
    page.clear_site_data(&config.app_origin()?).await?;
    page.visit(&config.app_route(LOGIN_ROUTE)).await
}

/// Valid login, navigation through the user menu, logout.
///
/// # Errors
///
/// Returns the first failed expectation.
pub async fn login_and_logout(page: &dyn PageDriver, config: &E2eConfig) -> Result<(), E2eError> {
    let t = &config.timeouts;
    let mut login_calls = page.observe_responses(&login_route()?).await?;

    submit_login(page, config, &config.valid).await?;

    let response = login_calls.next_within(t.login_response).await?;
    expect_status("login", 200, &response)?;
    wait_for_url(page, "URL to include /home", t.navigation, t.poll, |url| {
        url.contains(HOME_ROUTE)
    })
    .await?;
    login_calls.assert_quiet()?;
    locator::landing_marker()
        .resolve(page, t.element, t.poll)
        .await?;

    click(page, config, &locator::user_menu()).await?;
    click(page, config, &locator::account_entry()).await?;
    click(page, config, &locator::logout_action()).await?;

    let routes = &config.logout_routes;
    let description = format!("URL to include one of {}", routes.join(", "));
    let landed = wait_for_url(page, &description, t.navigation, t.poll, |url| {
        routes.iter().any(|route| url.contains(route.as_str()))
    })
    .await?;
    tracing::debug!(url = %landed, "logged out");

    locator::user_menu()
        .wait_unreachable(page, t.element, t.poll)
        .await?;
    wait_credentials_cleared(page, t.element, t.poll).await
}

/// Unregistered email: 404 from the backend, page stays on login, any alert
/// carries an accepted message.
///
/// # Errors
///
/// Returns the first failed expectation.
pub async fn invalid_credentials_rejected(
    page: &dyn PageDriver,
    config: &E2eConfig,
) -> Result<(), E2eError> {
    let t = &config.timeouts;
    let mut login_calls = page.observe_responses(&login_route()?).await?;
    let mut dialogs = page.observe_dialogs().await?;

    submit_login(page, config, &config.invalid).await?;

    let response = login_calls.next_within(t.rejected_login_response).await?;
    expect_status("rejected login", 404, &response)?;
    wait_for_url(page, "URL to include /login", t.navigation, t.poll, |url| {
        url.contains(LOGIN_ROUTE)
    })
    .await?;
    login_calls.assert_quiet()?;

    let accepted = rejection_alert();
    for text in dialogs.drain() {
        if !accepted.is_match(&text) {
            return Err(E2eError::UnexpectedDialog {
                text,
                pattern: accepted.source,
            });
        }
        tracing::debug!(%text, "rejection alert");
    }
    Ok(())
}

/// None of [`CREDENTIAL_KEYS`] may be present in local storage.
///
/// # Errors
///
/// Returns [`E2eError::CredentialLeft`] naming the first key found.
pub async fn assert_credentials_cleared(page: &dyn PageDriver) -> Result<(), E2eError> {
    match first_credential_key(page).await? {
        Some(key) => Err(E2eError::CredentialLeft {
            key: key.to_owned(),
        }),
        None => Ok(()),
    }
}

/// Poll until [`CREDENTIAL_KEYS`] are gone; logout may clear storage after
/// the route change.
///
/// # Errors
///
/// Returns [`E2eError::CredentialLeft`] for a key still present after
/// `timeout`.
pub async fn wait_credentials_cleared(
    page: &dyn PageDriver,
    timeout: Duration,
    poll: Duration,
) -> Result<(), E2eError> {
    let cleared = wait_until(
        "session token to leave local storage",
        timeout,
        poll,
        || async move { Ok(first_credential_key(page).await?.is_none().then_some(())) },
    )
    .await;
    match cleared {
        Err(E2eError::Timeout { .. }) => assert_credentials_cleared(page).await,
        other => other,
    }
}

async fn first_credential_key(page: &dyn PageDriver) -> Result<Option<&'static str>, E2eError> {
    for key in CREDENTIAL_KEYS {
        if page.local_storage_item(key).await?.is_some() {
            return Ok(Some(*key));
        }
    }
    Ok(None)
}

async fn submit_login(
    page: &dyn PageDriver,
    config: &E2eConfig,
    credentials: &LoginCredentials,
) -> Result<(), E2eError> {
    let t = &config.timeouts;
    let email = locator::email_input().resolve(page, t.element, t.poll).await?;
    page.fill(&email, &credentials.email).await?;
    let password = locator::password_input()
        .resolve(page, t.element, t.poll)
        .await?;
    page.fill(&password, &credentials.password).await?;
    click(page, config, &locator::submit_button()).await
}

async fn click(
    page: &dyn PageDriver,
    config: &E2eConfig,
    locator: &locator::Locator,
) -> Result<(), E2eError> {
    let target = locator
        .resolve(page, config.timeouts.element, config.timeouts.poll)
        .await?;
    page.click(&target).await
}

fn expect_status(
    what: &'static str,
    expected: u16,
    response: &ObservedResponse,
) -> Result<(), E2eError> {
    if response.status == expected {
        Ok(())
    } else {
        Err(E2eError::UnexpectedStatus {
            what,
            expected,
            actual: response.status,
        })
    }
}
