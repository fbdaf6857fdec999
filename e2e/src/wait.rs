//! Bounded polling waits.
//!
//! Every wait has a deadline; expiry is a scenario failure and is never
//! retried. Errors raised by the check itself end the wait immediately.

#[cfg(test)]
#[path = "wait_test.rs"]
mod wait_test;

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

use crate::driver::PageDriver;
use crate::error::E2eError;

/// Poll `check` until it yields `Some`, or fail after `timeout`.
///
/// `check` runs at least once, even with a zero timeout.
///
/// # Errors
///
/// Returns [`E2eError::Timeout`] naming `what`, or the first error `check`
/// returns.
pub async fn wait_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    poll: Duration,
    mut check: F,
) -> Result<T, E2eError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, E2eError>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = check().await? {
            return Ok(value);
        }
        let now = Instant::now();
        if now >= deadline {
            return Err(E2eError::Timeout {
                what: what.to_owned(),
                after: timeout,
            });
        }
        tokio::time::sleep(poll.min(deadline - now)).await;
    }
}

/// Wait until the page URL satisfies `accept`; returns that URL.
///
/// # Errors
///
/// Returns [`E2eError::Timeout`] with `description`, or a driver error.
pub async fn wait_for_url(
    page: &dyn PageDriver,
    description: &str,
    timeout: Duration,
    poll: Duration,
    accept: impl Fn(&str) -> bool,
) -> Result<String, E2eError> {
    let accept = &accept;
    wait_until(description, timeout, poll, || async move {
        let url = page.current_url().await?;
        Ok(accept(&url).then_some(url))
    })
    .await
}
