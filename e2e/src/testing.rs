//! In-memory stand-in for the storefront login flow, used by unit tests.
//!
//! `ScriptedApp` renders a tiny fake DOM per route and reacts to clicks the
//! way the real application does: the login call reports its status to any
//! response observer, a rejected login can raise an alert, and logout
//! clears (or, when told to, forgets to clear) the stored token.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::mpsc;

use crate::driver::{
    DialogObserver, ObservedResponse, PageDriver, Probe, ResponseObserver, RouteMatcher,
};
use crate::error::E2eError;
use crate::locator::{HOOK_ACCOUNT, HOOK_LOGOUT, HOOK_USER_MENU, Target};

pub(crate) const APP_URL: &str = "http://app.test";

/// Knobs for how the fake application behaves.
#[derive(Clone, Debug)]
pub(crate) struct Behavior {
    pub hooks: bool,
    pub login_status: u16,
    pub rejected_status: u16,
    pub rejection_dialog: Option<String>,
    pub logout_route: &'static str,
    pub logout_clears_storage: bool,
    pub logout_hides_menu: bool,
    pub duplicate_login_call: bool,
    pub submit_input: bool,
    /// Storage reads that still see the token after logout.
    pub stale_token_reads: u32,
}

impl Default for Behavior {
    fn default() -> Self {
        Self {
            hooks: true,
            login_status: 200,
            rejected_status: 404,
            rejection_dialog: None,
            logout_route: "/login",
            logout_clears_storage: true,
            logout_hides_menu: true,
            duplicate_login_call: false,
            submit_input: false,
            stale_token_reads: 0,
        }
    }
}

#[derive(Default)]
struct State {
    url: String,
    email: String,
    password: String,
    logged_in: bool,
    menu_open: bool,
    account_open: bool,
    storage: HashMap<String, String>,
    observers: Vec<(RouteMatcher, mpsc::UnboundedSender<ObservedResponse>)>,
    dialogs: Vec<mpsc::UnboundedSender<String>>,
    visits: Vec<String>,
    cleared: Vec<String>,
    clicks: Vec<&'static str>,
    stale_reads_left: u32,
}

struct Element {
    id: &'static str,
    tag: &'static str,
    hook: Option<&'static str>,
    selectors: &'static [&'static str],
    text: &'static str,
}

impl Element {
    fn matches(&self, target: &Target) -> bool {
        match target {
            Target::TestHook { name } => self.hook == Some(name.as_str()),
            Target::Css { selector } => selector
                .split(',')
                .any(|part| self.selectors.contains(&part.trim())),
            Target::Text { tag, pattern } => {
                tag.as_deref().is_none_or(|t| t == self.tag)
                    && !self.text.is_empty()
                    && pattern.is_match(self.text)
            }
        }
    }

    /// Text lookups prefer submit inputs, buttons, links and labels, in that
    /// order, over any other element.
    fn text_rank(&self) -> u8 {
        match self.tag {
            "input" => 0,
            "button" => 1,
            "a" => 2,
            "label" => 3,
            _ => 4,
        }
    }
}

pub(crate) struct ScriptedApp {
    behavior: Behavior,
    state: Mutex<State>,
}

impl ScriptedApp {
    pub(crate) fn new(behavior: Behavior) -> Self {
        Self {
            behavior,
            state: Mutex::new(State {
                url: "about:blank".to_owned(),
                ..State::default()
            }),
        }
    }

    pub(crate) fn visits(&self) -> Vec<String> {
        self.state.lock().unwrap().visits.clone()
    }

    pub(crate) fn cleared_origins(&self) -> Vec<String> {
        self.state.lock().unwrap().cleared.clone()
    }

    pub(crate) fn clicks(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub(crate) fn typed(&self) -> (String, String) {
        let state = self.state.lock().unwrap();
        (state.email.clone(), state.password.clone())
    }

    pub(crate) fn set_storage(&self, key: &str, value: &str) {
        self.state
            .lock()
            .unwrap()
            .storage
            .insert(key.to_owned(), value.to_owned());
    }

    fn route(url: &str) -> &str {
        url.strip_prefix(APP_URL).unwrap_or(url)
    }

    fn elements(&self, state: &State) -> Vec<Element> {
        let hook = |name: &'static str| self.behavior.hooks.then_some(name);
        let mut elements = Vec::new();
        match Self::route(&state.url) {
            "/login" => {
                elements.push(Element {
                    id: "title",
                    tag: "h2",
                    hook: None,
                    selectors: &[],
                    text: "Iniciar Sesión",
                });
                elements.push(Element {
                    id: "email",
                    tag: "input",
                    hook: None,
                    selectors: &[r#"input[name="email"]"#],
                    text: "",
                });
                elements.push(Element {
                    id: "password",
                    tag: "input",
                    hook: None,
                    selectors: &[r#"input[placeholder="Contraseña"]"#],
                    text: "",
                });
                elements.push(Element {
                    id: "submit",
                    tag: if self.behavior.submit_input { "input" } else { "button" },
                    hook: None,
                    selectors: &[],
                    text: "Iniciar Sesión",
                });
            }
            "/home" => {
                elements.push(Element {
                    id: "brand",
                    tag: "h1",
                    hook: None,
                    selectors: &[],
                    text: "Alma Criolla",
                });
            }
            "/cuenta" => {
                elements.push(Element {
                    id: "account-title",
                    tag: "h1",
                    hook: None,
                    selectors: &[],
                    text: "Mi Cuenta",
                });
                elements.push(Element {
                    id: "logout-hint",
                    tag: "p",
                    hook: None,
                    selectors: &[],
                    text: "¿Querés cerrar sesión en este dispositivo?",
                });
            }
            _ => {}
        }
        let menu_visible = state.logged_in || !self.behavior.logout_hides_menu;
        if menu_visible && Self::route(&state.url) != "/login" {
            elements.push(Element {
                id: "menu",
                tag: "button",
                hook: hook(HOOK_USER_MENU),
                selectors: &[],
                text: "AC",
            });
        }
        if state.logged_in && state.menu_open {
            elements.push(Element {
                id: "account",
                tag: "a",
                hook: hook(HOOK_ACCOUNT),
                selectors: &[],
                text: "Mi Cuenta",
            });
        }
        if state.logged_in && state.account_open {
            elements.push(Element {
                id: "logout",
                tag: "button",
                hook: hook(HOOK_LOGOUT),
                selectors: &[],
                text: "Cerrar sesión",
            });
        }
        elements
    }

    fn find(&self, state: &State, target: &Target) -> Option<&'static str> {
        let mut found = self
            .elements(state)
            .into_iter()
            .filter(|el| el.matches(target));
        match target {
            Target::Text { .. } => found.min_by_key(Element::text_rank),
            _ => found.next(),
        }
        .map(|el| el.id)
    }

    fn notify_login(state: &mut State, status: u16) {
        let url = format!("{APP_URL}/api/usuarios/login");
        for (route, tx) in &state.observers {
            if route.matches("POST", &url) {
                let _ = tx.send(ObservedResponse {
                    method: "POST".to_owned(),
                    url: url.clone(),
                    status,
                });
            }
        }
    }

    fn submit(&self, state: &mut State) {
        let accepted = state.email == "eren@gmail.com" && state.password == "123456";
        let status = if accepted {
            self.behavior.login_status
        } else {
            self.behavior.rejected_status
        };
        Self::notify_login(state, status);
        if self.behavior.duplicate_login_call {
            Self::notify_login(state, status);
        }

        if accepted && status == 200 {
            state.logged_in = true;
            state.storage.insert("authToken".to_owned(), "tok-123".to_owned());
            state.url = format!("{APP_URL}/home");
        } else if let Some(text) = &self.behavior.rejection_dialog {
            for tx in &state.dialogs {
                let _ = tx.send(text.clone());
            }
        }
    }

    fn logout(&self, state: &mut State) {
        state.logged_in = false;
        state.menu_open = false;
        state.account_open = false;
        if self.behavior.logout_clears_storage {
            if self.behavior.stale_token_reads == 0 {
                state.storage.clear();
            } else {
                state.stale_reads_left = self.behavior.stale_token_reads;
            }
        }
        state.url = format!("{APP_URL}{}", self.behavior.logout_route);
    }
}

#[async_trait::async_trait]
impl PageDriver for ScriptedApp {
    async fn visit(&self, url: &str) -> Result<(), E2eError> {
        let mut state = self.state.lock().unwrap();
        state.url = url.to_owned();
        state.menu_open = false;
        state.account_open = false;
        state.visits.push(url.to_owned());
        Ok(())
    }

    async fn current_url(&self) -> Result<String, E2eError> {
        Ok(self.state.lock().unwrap().url.clone())
    }

    async fn probe(&self, target: &Target) -> Result<Probe, E2eError> {
        let state = self.state.lock().unwrap();
        Ok(match self.find(&state, target) {
            Some(_) => Probe::Visible,
            None => Probe::Absent,
        })
    }

    async fn click(&self, target: &Target) -> Result<(), E2eError> {
        let mut state = self.state.lock().unwrap();
        let Some(id) = self.find(&state, target) else {
            return Err(E2eError::Script(format!("{target} not found")));
        };
        state.clicks.push(id);
        match id {
            "submit" => self.submit(&mut state),
            "menu" => state.menu_open = true,
            "account" => {
                state.account_open = true;
                state.url = format!("{APP_URL}/cuenta");
            }
            "logout" => self.logout(&mut state),
            _ => {}
        }
        Ok(())
    }

    async fn fill(&self, target: &Target, text: &str) -> Result<(), E2eError> {
        let mut state = self.state.lock().unwrap();
        match self.find(&state, target) {
            Some("email") => state.email = text.to_owned(),
            Some("password") => state.password = text.to_owned(),
            _ => return Err(E2eError::Script(format!("{target} is not an input"))),
        }
        Ok(())
    }

    async fn local_storage_item(&self, key: &str) -> Result<Option<String>, E2eError> {
        let mut state = self.state.lock().unwrap();
        let value = state.storage.get(key).cloned();
        if state.stale_reads_left > 0 {
            state.stale_reads_left -= 1;
            if state.stale_reads_left == 0 {
                state.storage.clear();
            }
        }
        Ok(value)
    }

    async fn clear_site_data(&self, origin: &str) -> Result<(), E2eError> {
        let mut state = self.state.lock().unwrap();
        state.storage.clear();
        state.logged_in = false;
        state.cleared.push(origin.to_owned());
        Ok(())
    }

    async fn observe_responses(&self, route: &RouteMatcher) -> Result<ResponseObserver, E2eError> {
        let (tx, observer) = ResponseObserver::channel(route);
        self.state.lock().unwrap().observers.push((route.clone(), tx));
        Ok(observer)
    }

    async fn observe_dialogs(&self) -> Result<DialogObserver, E2eError> {
        let (tx, observer) = DialogObserver::channel();
        self.state.lock().unwrap().dialogs.push(tx);
        Ok(observer)
    }
}
