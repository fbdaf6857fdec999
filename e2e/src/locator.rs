//! UI locators with prioritized resolution strategies.
//!
//! DESIGN
//! ======
//! A [`Locator`] is an ordered list of [`Target`]s. Test hooks (`data-cy`)
//! come first because they survive markup and copy changes; text or CSS
//! matches come last as the fallback. Every strategy except the last is
//! probed once without waiting, the first one present wins. When none is
//! present the last strategy is waited on up to the element timeout.

#[cfg(test)]
#[path = "locator_test.rs"]
mod locator_test;

use std::time::Duration;

use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::driver::{PageDriver, Probe};
use crate::error::E2eError;
use crate::wait::wait_until;

pub const HOOK_USER_MENU: &str = "menu-ac";
pub const HOOK_ACCOUNT: &str = "menu-cuenta";
pub const HOOK_LOGOUT: &str = "logout";

/// Regex source plus case-insensitivity, usable from Rust and from page JS.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextPattern {
    pub source: String,
    pub case_insensitive: bool,
}

impl TextPattern {
    /// Case-sensitive substring match.
    #[must_use]
    pub fn literal(text: &str) -> Self {
        Self {
            source: regex::escape(text),
            case_insensitive: false,
        }
    }

    #[must_use]
    pub fn regex(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            case_insensitive: false,
        }
    }

    /// Case-insensitive regex, the `/.../i` form.
    #[must_use]
    pub fn regex_ci(source: &str) -> Self {
        Self {
            source: source.to_owned(),
            case_insensitive: true,
        }
    }

    /// # Errors
    ///
    /// Returns [`E2eError::Config`] when the source is not a valid regex.
    pub fn compile(&self) -> Result<Regex, E2eError> {
        RegexBuilder::new(&self.source)
            .case_insensitive(self.case_insensitive)
            .build()
            .map_err(|e| E2eError::Config(format!("text pattern /{}/: {e}", self.source)))
    }

    /// Whether `text` matches; an invalid pattern matches nothing.
    #[must_use]
    pub fn is_match(&self, text: &str) -> bool {
        self.compile().is_ok_and(|re| re.is_match(text))
    }
}

impl std::fmt::Display for TextPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let flags = if self.case_insensitive { "i" } else { "" };
        write!(f, "/{}/{flags}", self.source)
    }
}

/// One way of finding an element.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Target {
    /// `[data-cy="name"]`.
    TestHook { name: String },
    /// First element matching a CSS selector list.
    Css { selector: String },
    /// Deepest element, optionally of `tag`, whose trimmed text matches.
    Text {
        tag: Option<String>,
        pattern: TextPattern,
    },
}

impl Target {
    #[must_use]
    pub fn hook(name: &str) -> Self {
        Self::TestHook {
            name: name.to_owned(),
        }
    }

    #[must_use]
    pub fn css(selector: &str) -> Self {
        Self::Css {
            selector: selector.to_owned(),
        }
    }

    #[must_use]
    pub fn text(pattern: TextPattern) -> Self {
        Self::Text { tag: None, pattern }
    }

    #[must_use]
    pub fn tagged_text(tag: &str, pattern: TextPattern) -> Self {
        Self::Text {
            tag: Some(tag.to_owned()),
            pattern,
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TestHook { name } => write!(f, "[data-cy={name}]"),
            Self::Css { selector } => f.write_str(selector),
            Self::Text { tag: Some(tag), pattern } => write!(f, "{tag} containing {pattern}"),
            Self::Text { tag: None, pattern } => write!(f, "text {pattern}"),
        }
    }
}

/// A named UI element with fallback strategies.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locator {
    name: &'static str,
    strategies: Vec<Target>,
}

impl Locator {
    #[must_use]
    pub fn new(name: &'static str, first: Target) -> Self {
        Self {
            name,
            strategies: vec![first],
        }
    }

    /// Append a lower-priority strategy.
    #[must_use]
    pub fn or(mut self, fallback: Target) -> Self {
        self.strategies.push(fallback);
        self
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn strategies(&self) -> &[Target] {
        &self.strategies
    }

    /// Pick a strategy and wait for its element to be visible.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Timeout`] when the chosen element never becomes
    /// visible, or a driver error.
    pub async fn resolve(
        &self,
        page: &dyn PageDriver,
        timeout: Duration,
        poll: Duration,
    ) -> Result<Target, E2eError> {
        let Some((last, preferred)) = self.strategies.split_last() else {
            return Err(E2eError::Config(format!("locator {} has no strategies", self.name)));
        };

        let mut chosen = last;
        for target in preferred {
            if page.probe(target).await? != Probe::Absent {
                chosen = target;
                break;
            }
        }
        tracing::debug!(locator = self.name, target = %chosen, "resolving element");

        let what = format!("{} ({chosen}) to be visible", self.name);
        wait_until(&what, timeout, poll, || async move {
            Ok((page.probe(chosen).await? == Probe::Visible).then_some(()))
        })
        .await?;
        Ok(chosen.clone())
    }

    /// Wait until no strategy resolves to a visible element.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::StillReachable`] when an element stays visible
    /// past `timeout`, or a driver error.
    pub async fn wait_unreachable(
        &self,
        page: &dyn PageDriver,
        timeout: Duration,
        poll: Duration,
    ) -> Result<(), E2eError> {
        let strategies = &self.strategies;
        let result = wait_until(self.name, timeout, poll, || async move {
            for target in strategies {
                if page.probe(target).await? == Probe::Visible {
                    return Ok(None);
                }
            }
            Ok(Some(()))
        })
        .await;
        match result {
            Err(E2eError::Timeout { .. }) => Err(E2eError::StillReachable {
                what: self.name.to_owned(),
            }),
            other => other,
        }
    }
}

#[must_use]
pub fn email_input() -> Locator {
    Locator::new(
        "email input",
        Target::css(r#"input[name="email"], input[placeholder="Email"]"#),
    )
}

#[must_use]
pub fn password_input() -> Locator {
    Locator::new(
        "password input",
        Target::css(
            r#"input[name="password"], input[placeholder="Contraseña"], input[name="pwd"]"#,
        ),
    )
}

#[must_use]
pub fn submit_button() -> Locator {
    Locator::new(
        "login submit",
        Target::text(TextPattern::regex_ci("Iniciar Sesión|Log in")),
    )
}

/// Content that identifies the post-login landing page.
#[must_use]
pub fn landing_marker() -> Locator {
    Locator::new("landing page", Target::text(TextPattern::literal("Alma Criolla")))
}

#[must_use]
pub fn user_menu() -> Locator {
    Locator::new("user menu", Target::hook(HOOK_USER_MENU))
        .or(Target::tagged_text("button", TextPattern::regex("^AC$")))
}

#[must_use]
pub fn account_entry() -> Locator {
    Locator::new("account entry", Target::hook(HOOK_ACCOUNT))
        .or(Target::text(TextPattern::regex_ci("Cuenta")))
}

#[must_use]
pub fn logout_action() -> Locator {
    Locator::new("logout action", Target::hook(HOOK_LOGOUT))
        .or(Target::text(TextPattern::regex_ci("Cerrar Sesión|Logout")))
}
