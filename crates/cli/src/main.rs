// crates/cli/src/main.rs
//! Skyview command-line client.
//!
//! Runs privileged operator actions (fills, dome, shutdown, actor restarts)
//! as background jobs on the observatory API server and waits for them.

mod spinner;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use skyview_core::{DashboardConfig, JobId, NoopNotifier, Notifier, ObservatoryAction, TracingNotifier};
use skyview_tasks::{HttpJobService, JobService, SubmitRequest, TaskRunner};
use tracing_subscriber::EnvFilter;

use crate::spinner::SpinnerNotifier;

#[derive(Parser, Debug)]
#[command(name = "skyview", version)]
#[command(about = "Run observatory operator tasks against the API server")]
struct Cli {
    /// Config file (default: <config dir>/skyview/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API server base URL, overrides config and SKYVIEW_API_URL
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Give up after this many seconds (0 = wait forever)
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Suppress task notifications
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run an operator action: abort-fill, manual-fill, open-dome,
    /// close-dome, force-close-dome, shutdown, restart:<actor>
    Action { action: ObservatoryAction },

    /// Run an arbitrary job route
    Run {
        route: String,

        /// Label used in notifications and errors
        #[arg(long)]
        label: Option<String>,

        #[arg(long, default_value = "GET")]
        method: String,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Extra request header, repeatable
        #[arg(long = "header", value_name = "NAME:VALUE")]
        headers: Vec<String>,
    },

    /// Check whether a job is ready
    Status { job_id: String },
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "warn,skyview_core=info,skyview_tasks=info,skyview=info",
        _ => "info,skyview_core=debug,skyview_tasks=debug,skyview=debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("invalid header {raw:?}, expected NAME:VALUE");
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("invalid header {raw:?}, empty name");
    }
    Ok((name.to_string(), value.trim().to_string()))
}

fn submit_request(method: &str, body: Option<&str>, headers: &[String]) -> Result<SubmitRequest> {
    let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method {method:?}"))?;
    let body = body
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("--body is not valid JSON")?;
    let headers = headers.iter().map(|h| parse_header(h)).collect::<Result<Vec<_>>>()?;
    Ok(SubmitRequest {
        method,
        body,
        headers,
    })
}

/// Command-line flags win over the config file and environment.
fn apply_flags(config: &mut DashboardConfig, api_url: Option<String>, timeout: Option<u64>, quiet: bool) {
    if let Some(url) = api_url {
        config.api_url = url;
    }
    if let Some(secs) = timeout {
        config.timeout_secs = secs;
    }
    if quiet {
        config.show_notifications = false;
    }
}

fn notifier(quiet: bool) -> Arc<dyn Notifier> {
    if quiet {
        Arc::new(NoopNotifier::default())
    } else if std::io::stderr().is_terminal() {
        Arc::new(SpinnerNotifier::new())
    } else {
        Arc::new(TracingNotifier::new())
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = DashboardConfig::load_with(cli.config.as_deref(), |config| {
        apply_flags(config, cli.api_url.clone(), cli.timeout, cli.quiet)
    })
    .context("failed to load config")?;
    tracing::debug!(api_url = %config.api_url, "using API server");

    let service = Arc::new(HttpJobService::with_timeout(
        config.api_url.clone(),
        config.request_timeout(),
    )?);

    let (label, route, request) = match cli.command {
        Command::Status { job_id } => {
            let ready = service.is_ready(&JobId::new(job_id)).await?;
            println!("{}", if ready { "ready" } else { "pending" });
            return Ok(());
        }
        Command::Action { action } => (action.label(), action.route(), SubmitRequest::default()),
        Command::Run {
            route,
            label,
            method,
            body,
            headers,
        } => {
            let request = submit_request(&method, body.as_deref(), &headers)?;
            (label.unwrap_or_else(|| route.clone()), route, request)
        }
    };

    let runner = TaskRunner::new(service, config.task_config(label)).with_notifier(notifier(cli.quiet));
    tracing::debug!(label = %runner.config().label, route = %route, "running task");
    let value: serde_json::Value = runner.run_with(&route, request).await?;
    if !value.is_null() {
        println!("{}", serde_json::to_string_pretty(&value)?);
    }
    Ok(())
}
