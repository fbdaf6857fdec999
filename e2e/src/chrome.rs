//! [`PageDriver`] over the Chrome DevTools protocol.
//!
//! Lookups run an injected script that finds the element for a [`Target`],
//! tags it with `data-e2e-pick` and reports whether it is visible; clicks
//! and typing then go through the tagged element. Network responses come
//! from `Network.responseReceived`, correlated with the request method.
//! Native dialogs are accepted as soon as they open so the page never
//! blocks on them.

#[cfg(test)]
#[path = "chrome_test.rs"]
mod chrome_test;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chromiumoxide::cdp::browser_protocol::network::{
    self, ClearBrowserCookiesParams, EventRequestWillBeSent, EventResponseReceived,
};
use chromiumoxide::cdp::browser_protocol::page::{
    self as cdp_page, EventJavascriptDialogOpening, HandleJavaScriptDialogParams,
};
use chromiumoxide::cdp::browser_protocol::storage::ClearDataForOriginParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::{Stream, StreamExt};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::config::E2eConfig;
use crate::driver::{
    DialogObserver, ObservedResponse, PageDriver, Probe, ResponseObserver, RouteMatcher,
};
use crate::error::E2eError;
use crate::locator::Target;

pub const DEFAULT_WINDOW_SIZE: (u32, u32) = (1280, 800);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const PICK_ATTR: &str = "data-e2e-pick";
const SITE_DATA_TYPES: &str = "cookies,local_storage";

impl From<CdpError> for E2eError {
    fn from(e: CdpError) -> Self {
        Self::Browser(e.to_string())
    }
}

/// How to launch the browser.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChromeOptions {
    pub headless: bool,
    pub no_sandbox: bool,
    pub chrome_path: Option<PathBuf>,
    pub window_size: (u32, u32),
    pub request_timeout: Duration,
}

impl From<&E2eConfig> for ChromeOptions {
    fn from(config: &E2eConfig) -> Self {
        Self {
            headless: config.headless,
            no_sandbox: config.no_sandbox,
            chrome_path: config.chrome_path.clone(),
            window_size: DEFAULT_WINDOW_SIZE,
            request_timeout: config.timeouts.navigation.max(DEFAULT_REQUEST_TIMEOUT),
        }
    }
}

impl ChromeOptions {
    fn browser_config(&self) -> Result<BrowserConfig, E2eError> {
        let mut builder = BrowserConfig::builder()
            .window_size(self.window_size.0, self.window_size.1)
            .request_timeout(self.request_timeout);
        if !self.headless {
            builder = builder.with_head();
        }
        if self.no_sandbox {
            builder = builder.no_sandbox();
        }
        if let Some(path) = &self.chrome_path {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(E2eError::Browser)
    }
}

/// A launched browser with the single page the suite drives.
pub struct ChromeSession {
    browser: Browser,
    handler: JoinHandle<()>,
    page: ChromePage,
}

impl ChromeSession {
    /// Launch Chrome and open a blank page.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Browser`] when Chrome cannot be started or the
    /// page cannot be opened.
    pub async fn launch(options: &ChromeOptions) -> Result<Self, E2eError> {
        let (browser, mut handler) = Browser::launch(options.browser_config()?).await?;
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "devtools handler event");
                }
            }
        });
        tracing::info!(headless = options.headless, "browser launched");

        let page = browser.new_page("about:blank").await?;
        let page = ChromePage::attach(page).await?;
        Ok(Self {
            browser,
            handler,
            page,
        })
    }

    #[must_use]
    pub fn page(&self) -> &ChromePage {
        &self.page
    }

    /// Close the browser and stop the protocol handler.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Browser`] when Chrome does not shut down cleanly.
    pub async fn close(mut self) -> Result<(), E2eError> {
        self.page.dialog_pump.abort();
        self.browser.close().await?;
        self.browser
            .wait()
            .await
            .map_err(|e| E2eError::Browser(e.to_string()))?;
        self.handler.abort();
        Ok(())
    }
}

type DialogSinks = Arc<Mutex<Vec<mpsc::UnboundedSender<String>>>>;

pub struct ChromePage {
    page: Page,
    pick_seq: AtomicU64,
    dialogs: DialogSinks,
    dialog_pump: JoinHandle<()>,
}

impl ChromePage {
    /// Enable the protocol domains the driver listens on and start accepting
    /// dialogs.
    ///
    /// # Errors
    ///
    /// Returns [`E2eError::Browser`] when a domain cannot be enabled.
    pub async fn attach(page: Page) -> Result<Self, E2eError> {
        page.execute(network::EnableParams::default()).await?;
        page.execute(cdp_page::EnableParams::default()).await?;

        let dialogs: DialogSinks = Arc::default();
        let mut opened = page.event_listener::<EventJavascriptDialogOpening>().await?;
        let sinks = Arc::clone(&dialogs);
        let acceptor = page.clone();
        let dialog_pump = tokio::spawn(async move {
            while let Some(event) = opened.next().await {
                tracing::debug!(message = %event.message, "dialog opened");
                sinks
                    .lock()
                    .await
                    .retain(|tx| tx.send(event.message.clone()).is_ok());
                if let Err(e) = acceptor.execute(HandleJavaScriptDialogParams::new(true)).await {
                    tracing::warn!(error = %e, "failed to accept dialog");
                }
            }
        });

        Ok(Self {
            page,
            pick_seq: AtomicU64::new(0),
            dialogs,
            dialog_pump,
        })
    }

    async fn evaluate_string(&self, script: String) -> Result<String, E2eError> {
        self.page
            .evaluate(script)
            .await?
            .into_value::<String>()
            .map_err(|e| E2eError::Script(e.to_string()))
    }

    /// Tag the element for `target` and report its state.
    async fn pick(&self, target: &Target) -> Result<(Probe, String), E2eError> {
        let id = self.pick_seq.fetch_add(1, Ordering::Relaxed).to_string();
        let state = self.evaluate_string(pick_script(target, &id)?).await?;
        let probe = serde_json::from_value(serde_json::Value::String(state))
            .map_err(|e| E2eError::Script(format!("pick result for {target}: {e}")))?;
        Ok((probe, pick_selector(&id)))
    }

    async fn picked(&self, target: &Target) -> Result<String, E2eError> {
        match self.pick(target).await? {
            (Probe::Absent, _) => Err(E2eError::Script(format!("{target} not found"))),
            (_, selector) => Ok(selector),
        }
    }
}

#[async_trait::async_trait]
impl PageDriver for ChromePage {
    async fn visit(&self, url: &str) -> Result<(), E2eError> {
        tracing::debug!(%url, "visit");
        self.page.goto(url).await?;
        Ok(())
    }

    async fn current_url(&self) -> Result<String, E2eError> {
        self.evaluate_string("window.location.href".to_owned()).await
    }

    async fn probe(&self, target: &Target) -> Result<Probe, E2eError> {
        Ok(self.pick(target).await?.0)
    }

    async fn click(&self, target: &Target) -> Result<(), E2eError> {
        let selector = self.picked(target).await?;
        tracing::debug!(%target, "click");
        self.page.find_element(selector).await?.click().await?;
        Ok(())
    }

    async fn fill(&self, target: &Target, text: &str) -> Result<(), E2eError> {
        let selector = self.picked(target).await?;
        self.page.evaluate(clear_input_script(&selector)?).await?;
        let element = self.page.find_element(selector).await?;
        element.click().await?;
        element.type_str(text).await?;
        Ok(())
    }

    async fn local_storage_item(&self, key: &str) -> Result<Option<String>, E2eError> {
        let raw = self.evaluate_string(local_storage_script(key)?).await?;
        serde_json::from_str(&raw).map_err(|e| E2eError::Script(e.to_string()))
    }

    async fn clear_site_data(&self, origin: &str) -> Result<(), E2eError> {
        tracing::debug!(%origin, "clearing site data");
        let (cookies, origin_data) = site_data_commands(origin);
        self.page.execute(cookies).await?;
        self.page.execute(origin_data).await?;
        Ok(())
    }

    async fn observe_responses(&self, route: &RouteMatcher) -> Result<ResponseObserver, E2eError> {
        let requests = self.page.event_listener::<EventRequestWillBeSent>().await?;
        let responses = self.page.event_listener::<EventResponseReceived>().await?;
        let (tx, observer) = ResponseObserver::channel(route);
        let route = route.clone();

        let requests =
            requests.map(|event| (event.request_id.inner().clone(), event.request.method.clone()));
        let responses = responses.map(|event| WireResponse {
            request_id: event.request_id.inner().clone(),
            url: event.response.url.clone(),
            status: u16::try_from(event.response.status).unwrap_or(0),
        });
        tokio::spawn(pump_responses(requests, responses, route, tx));

        Ok(observer)
    }

    async fn observe_dialogs(&self) -> Result<DialogObserver, E2eError> {
        let (tx, observer) = DialogObserver::channel();
        self.dialogs.lock().await.push(tx);
        Ok(observer)
    }
}

/// A `Network.responseReceived` event reduced to what matching needs.
#[derive(Clone, Debug)]
pub(crate) struct WireResponse {
    pub request_id: String,
    pub url: String,
    pub status: u16,
}

/// Forward responses matching `route` to `tx` until the observer is dropped.
///
/// Responses only carry a request id, so the method comes from the request
/// event seen earlier. Requests are always drained first: the browser emits
/// a request before its response, and handling a buffered response before
/// its request would lose the method.
pub(crate) async fn pump_responses<Rq, Rs>(
    requests: Rq,
    responses: Rs,
    route: RouteMatcher,
    tx: mpsc::UnboundedSender<ObservedResponse>,
) where
    Rq: Stream<Item = (String, String)>,
    Rs: Stream<Item = WireResponse>,
{
    let mut requests = std::pin::pin!(requests);
    let mut responses = std::pin::pin!(responses);
    let mut methods: HashMap<String, String> = HashMap::new();
    loop {
        tokio::select! {
            biased;
            Some((request_id, method)) = requests.next() => {
                methods.insert(request_id, method);
            }
            Some(response) = responses.next() => {
                let method = methods.remove(&response.request_id).unwrap_or_default();
                if !route.matches(&method, &response.url) {
                    continue;
                }
                tracing::debug!(%route, status = response.status, "observed response");
                let observed = ObservedResponse {
                    method,
                    url: response.url,
                    status: response.status,
                };
                if tx.send(observed).is_err() {
                    break;
                }
            }
            () = tx.closed() => break,
        }
    }
}

pub(crate) fn pick_selector(id: &str) -> String {
    format!("[{PICK_ATTR}=\"{id}\"]")
}

const PICK_SCRIPT: &str = r#"((target, pick) => {
  const shown = (el) => {
    const style = window.getComputedStyle(el);
    const rect = el.getBoundingClientRect();
    return style.visibility !== 'hidden' && style.display !== 'none'
      && rect.width > 0 && rect.height > 0;
  };
  let found;
  if (target.kind === 'test_hook') {
    found = [...document.querySelectorAll(`[data-cy="${CSS.escape(target.name)}"]`)];
  } else if (target.kind === 'css') {
    found = [...document.querySelectorAll(target.selector)];
  } else {
    const re = new RegExp(target.pattern.source, target.pattern.case_insensitive ? 'i' : '');
    const text = (el) => {
      if (el.matches('input[type=submit], input[type=button]')) return (el.value || '').trim();
      if (el.tagName === 'INPUT') return '';
      return (el.innerText || el.textContent || '').trim();
    };
    const preferred = ['input[type=submit]', 'button', 'a', 'label'];
    const rank = (el) => {
      const i = preferred.findIndex((selector) => el.matches(selector));
      return i < 0 ? preferred.length : i;
    };
    found = [...document.querySelectorAll(target.tag || 'body *')]
      .filter((el) => re.test(text(el)));
    found = found.filter((el) => !found.some((other) => other !== el && el.contains(other)));
    found = [...new Set(found.map((el) => el.closest(preferred.join(', ')) || el))];
    found.sort((a, b) => rank(a) - rank(b));
  }
  if (found.length === 0) return 'absent';
  const el = found.find(shown) || found[0];
  document.querySelectorAll('[__ATTR__]').forEach((old) => old.removeAttribute('__ATTR__'));
  el.setAttribute('__ATTR__', pick);
  return shown(el) ? 'visible' : 'hidden';
})"#;

/// Every cookie in the browser (the API may live on another host), plus the
/// app origin's cookies and local storage.
pub(crate) fn site_data_commands(
    origin: &str,
) -> (ClearBrowserCookiesParams, ClearDataForOriginParams) {
    (
        ClearBrowserCookiesParams::default(),
        ClearDataForOriginParams::new(origin, SITE_DATA_TYPES),
    )
}

/// Script that tags the element for `target` with `id` and evaluates to
/// `"absent"`, `"hidden"` or `"visible"`.
pub(crate) fn pick_script(target: &Target, id: &str) -> Result<String, E2eError> {
    let target = serde_json::to_string(target).map_err(|e| E2eError::Script(e.to_string()))?;
    let id = serde_json::to_string(id).map_err(|e| E2eError::Script(e.to_string()))?;
    Ok(format!(
        "{}({target}, {id})",
        PICK_SCRIPT.replace("__ATTR__", PICK_ATTR)
    ))
}

pub(crate) fn clear_input_script(selector: &str) -> Result<String, E2eError> {
    let selector = serde_json::to_string(selector).map_err(|e| E2eError::Script(e.to_string()))?;
    Ok(format!(
        "(() => {{ const el = document.querySelector({selector}); \
         if (el) {{ el.value = ''; \
         el.dispatchEvent(new Event('input', {{ bubbles: true }})); }} }})()"
    ))
}

/// Evaluates to the JSON encoding of `localStorage.getItem(key)`.
pub(crate) fn local_storage_script(key: &str) -> Result<String, E2eError> {
    let key = serde_json::to_string(key).map_err(|e| E2eError::Script(e.to_string()))?;
    Ok(format!("JSON.stringify(window.localStorage.getItem({key}))"))
}
