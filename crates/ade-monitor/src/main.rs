//! `ade-expiry-monitor` — one pass of the Azure Deployment Environments
//! expiration monitor.
//!
//! Reads `ade-monitor.toml` (or the path given with `--config`) layered under
//! `ADE_*` environment variables, lists every environment in the
//! subscription, notifies owners of environments that are expired or about to
//! expire, and posts a digest to the monitoring channel. Intended to be run
//! daily by a scheduler.
//!
//! ```sh
//! ADE_SUBSCRIPTION_ID=… ADE_SLACK_CHANNEL_ID=C0123 ade-expiry-monitor --simulate
//! ```

mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use ade_core::run::{Monitor, RunStatus};
use ade_devcenter::DevCenterSource;
use ade_slack::SlackMessenger;
use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use settings::{PolicyKind, Settings};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Azure Deployment Environments expiration monitor")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "ade-monitor.toml")]
  config: PathBuf,

  /// Log Slack payloads instead of sending them.
  #[arg(long)]
  simulate: bool,

  /// Classification policy.
  #[arg(long, value_enum)]
  policy: Option<PolicyKind>,

  /// Warning window in days for the `window` policy.
  #[arg(long)]
  warn_days: Option<u32>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut settings = Settings::load(&cli.config).context("failed to read configuration")?;
  if cli.simulate {
    settings.simulate_send = true;
  }
  if let Some(policy) = cli.policy {
    settings.policy = policy;
  }
  if let Some(days) = cli.warn_days {
    settings.warn_days = days;
  }

  let monitor_config = settings.monitor_config().context("invalid configuration")?;
  let slack_config = settings.slack_config().context("invalid configuration")?;

  let client = reqwest::Client::builder()
    .timeout(Duration::from_secs(settings.request_timeout_secs))
    .build()
    .context("failed to build HTTP client")?;

  let credentials = Arc::new(settings.credentials(client.clone()));
  let source = DevCenterSource::new(client.clone(), credentials, settings.devcenter_config());
  let messenger = SlackMessenger::new(client, slack_config);

  if settings.simulate_send {
    tracing::info!("simulate mode: Slack messages will be logged, not sent");
  }

  let monitor = Monitor::new(source.clone(), source, messenger, monitor_config);
  let report = monitor.run(Utc::now()).await;

  tracing::info!(
    run_id = %report.run_id,
    status = ?report.status,
    fetched = report.fetched,
    attention = report.attention,
    owners_sent = report.owners.sent,
    owners_failed = report.owners.failed,
    owners_skipped = report.owners.skipped,
    digest_sent = report.digest_sent,
    "run finished"
  );
  for (group, count) in &report.counts {
    tracing::debug!(group = %group, count, "group size");
  }

  match (report.status, report.error) {
    (RunStatus::Failed, Some(error)) => Err(error).context("monitor run failed"),
    (RunStatus::Failed, None) => anyhow::bail!("monitor run failed"),
    _ => Ok(()),
  }
}
