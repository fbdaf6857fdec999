use std::collections::HashMap;

use clap::{Args, Parser, Subcommand};
use credentials::{CookieTransport, SESSION_COOKIE, app_client};
use e2e::reset::reset_url;
use e2e::{ChromeOptions, ChromeSession, E2eConfig, ResetOutcome, Scenario, SuiteReport};
use tracing_subscriber::EnvFilter;


const LOGIN_PATH: &str = "/api/usuarios/login";

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("http request failed: {0}")]
    Http(#[from] credentials::HttpError),
    #[error(transparent)]
    E2e(#[from] e2e::E2eError),
    #[error("{failed} of {total} scenario(s) failed")]
    SuiteFailed { failed: usize, total: usize },
    #[error("login rejected with HTTP {status}")]
    LoginRejected { status: u16 },
}

#[derive(Parser, Debug)]
#[command(
    name = "criolla-e2e",
    about = "Session lifecycle checks for the Alma Criolla storefront"
)]
struct Cli {
    /// Storefront URL; overrides BASE_URL / CYPRESS_BASE_URL.
    #[arg(long, global = true)]
    app_url: Option<String>,

    /// Backend URL for reset and login; overrides API_BASE / CYPRESS_API_BASE.
    #[arg(long, global = true)]
    api_base: Option<String>,

    /// Overrides USER_EMAIL / CYPRESS_USER_EMAIL.
    #[arg(long, global = true)]
    email: Option<String>,

    /// Overrides USER_PASS / CYPRESS_USER_PASS.
    #[arg(long, global = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reset the backend, then run the browser scenarios.
    Run(RunArgs),
    /// Only call the reset endpoint.
    Reset,
    /// Log in through the API with the configured credentials.
    Login,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Scenario to run; repeat to pick several. Default: all.
    #[arg(long = "scenario", value_parser = parse_scenario)]
    scenarios: Vec<Scenario>,

    /// Show the browser window.
    #[arg(long, default_value_t = false)]
    headed: bool,
}

fn parse_scenario(raw: &str) -> Result<Scenario, String> {
    raw.parse().map_err(|e: e2e::E2eError| e.to_string())
}

impl Cli {
    /// Flags as environment keys, taking precedence over the process
    /// environment.
    fn overrides(&self) -> HashMap<&'static str, String> {
        let mut overrides = HashMap::new();
        let flags = [
            ("BASE_URL", &self.app_url),
            ("API_BASE", &self.api_base),
            ("USER_EMAIL", &self.email),
            ("USER_PASS", &self.password),
        ];
        for (key, value) in flags {
            if let Some(value) = value {
                overrides.insert(key, value.clone());
            }
        }
        if let Command::Run(RunArgs { headed: true, .. }) = self.command {
            overrides.insert("E2E_HEADLESS", "false".to_owned());
        }
        overrides
    }

    fn config_with(&self, env: impl Fn(&str) -> Option<String>) -> E2eConfig {
        let overrides = self.overrides();
        E2eConfig::from_lookup(|key| overrides.get(key).cloned().or_else(|| env(key)))
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config_with(|key| std::env::var(key).ok());
    tracing::debug!(app_url = %config.app_url, api_base = %config.api_base, "config resolved");

    match cli.command {
        Command::Run(args) => run_suite(&config, &args).await,
        Command::Reset => run_reset(&config).await,
        Command::Login => run_login(&config).await,
    }
}

async fn run_suite(config: &E2eConfig, args: &RunArgs) -> Result<(), CliError> {
    let scenarios = if args.scenarios.is_empty() {
        Scenario::ALL.to_vec()
    } else {
        args.scenarios.clone()
    };
    let client = app_client(CookieTransport::with_timeout(config.timeouts.reset)?);

    let session = ChromeSession::launch(&ChromeOptions::from(config)).await?;
    let report = e2e::run_suite(config, &client, session.page(), &scenarios).await;
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "browser did not shut down cleanly");
    }

    print_report(&report);
    let failed = report.failures().count();
    if failed > 0 {
        return Err(CliError::SuiteFailed {
            failed,
            total: report.scenarios.len(),
        });
    }
    Ok(())
}

fn print_report(report: &SuiteReport) {
    match &report.reset {
        ResetOutcome::Status(status) => println!("reset: HTTP {status}"),
        ResetOutcome::Unreachable(reason) => println!("reset: unreachable ({reason})"),
    }
    for scenario in &report.scenarios {
        let elapsed = scenario.elapsed.as_secs_f64();
        match &scenario.outcome {
            Ok(()) => println!("PASS {} ({elapsed:.1}s)", scenario.scenario),
            Err(e) => println!("FAIL {} ({elapsed:.1}s): {e}", scenario.scenario),
        }
    }
}

async fn run_reset(config: &E2eConfig) -> Result<(), CliError> {
    let client = app_client(CookieTransport::with_timeout(config.timeouts.reset)?);
    match e2e::reset_backend(&client, &config.api_base).await {
        ResetOutcome::Status(status) => {
            println!("{} -> HTTP {status}", reset_url(&config.api_base));
        }
        ResetOutcome::Unreachable(reason) => {
            println!("{} -> unreachable: {reason}", reset_url(&config.api_base));
        }
    }
    Ok(())
}

async fn run_login(config: &E2eConfig) -> Result<(), CliError> {
    let transport = CookieTransport::with_timeout(config.timeouts.login_response)?;
    let client = app_client(transport.clone());
    let url = format!("{}{LOGIN_PATH}", config.api_base);

    let response = client
        .post_json(
            url.as_str(),
            serde_json::json!({
                "email": config.valid.email,
                "password": config.valid.password,
            }),
        )
        .await?;

    let captured = transport.has_cookie(&config.api_base, SESSION_COOKIE);
    println!("POST {url} -> HTTP {}", response.status);
    println!("{SESSION_COOKIE} cookie captured: {captured}");
    if !response.ok() {
        return Err(CliError::LoginRejected {
            status: response.status,
        });
    }
    Ok(())
}
