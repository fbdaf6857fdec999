//! Sequential suite runner.
//!
//! One backend reset up front, then each scenario from a clean login page.
//! A failed scenario is recorded and the next one still runs.

#[cfg(test)]
#[path = "suite_test.rs"]
mod suite_test;

use std::time::{Duration, Instant};

use credentials::HttpClient;

use crate::config::E2eConfig;
use crate::driver::PageDriver;
use crate::error::E2eError;
use crate::reset::{ResetOutcome, reset_backend};
use crate::scenario::{Scenario, prepare};

/// Result of one scenario.
#[derive(Debug)]
pub struct ScenarioReport {
    pub scenario: Scenario,
    pub elapsed: Duration,
    pub outcome: Result<(), E2eError>,
}

impl ScenarioReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug)]
pub struct SuiteReport {
    pub reset: ResetOutcome,
    pub scenarios: Vec<ScenarioReport>,
}

impl SuiteReport {
    /// True when every scenario passed. The reset outcome never counts.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.scenarios.iter().all(ScenarioReport::passed)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ScenarioReport> {
        self.scenarios.iter().filter(|report| !report.passed())
    }
}

/// Reset the backend once, then run `scenarios` in order on `page`.
pub async fn run_suite(
    config: &E2eConfig,
    client: &HttpClient,
    page: &dyn PageDriver,
    scenarios: &[Scenario],
) -> SuiteReport {
    let reset = reset_backend(client, &config.api_base).await;

    let mut reports = Vec::with_capacity(scenarios.len());
    for &scenario in scenarios {
        tracing::info!(%scenario, "scenario started");
        let started = Instant::now();
        let outcome = run_one(scenario, page, config).await;
        let elapsed = started.elapsed();
        match &outcome {
            Ok(()) => tracing::info!(%scenario, ?elapsed, "scenario passed"),
            Err(e) => tracing::warn!(%scenario, ?elapsed, error = %e, "scenario failed"),
        }
        reports.push(ScenarioReport {
            scenario,
            elapsed,
            outcome,
        });
    }

    SuiteReport {
        reset,
        scenarios: reports,
    }
}

async fn run_one(
    scenario: Scenario,
    page: &dyn PageDriver,
    config: &E2eConfig,
) -> Result<(), E2eError> {
    prepare(page, config).await?;
    scenario.run(page, config).await
}
