//! The run orchestrator.
//!
//! One call to [`Monitor::run`] is one pass:
//! fetch → enrich → classify → compose → dispatch personal notices →
//! dispatch digest → report. Nothing is retried within a run and nothing
//! carries over between runs.

use std::collections::{HashMap, hash_map::Entry};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::Instrument as _;
use uuid::Uuid;

use crate::{
  classify::{self, Category, Policy},
  compose::{self, Content, Digest, OwnerMessage},
  environment::{EnvironmentRecord, RawEnvironment, Tags},
  error::{DispatchError, SourceError},
  event::{Events, RunEvent},
  source::{EnvironmentSource, Messenger, Recipient, TagLookup},
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MonitorConfig {
  /// Where the digest and error notices go.
  pub channel: Recipient,
  pub policy:  Policy,
}

// ─── Report ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
  Succeeded,
  SucceededWithWarnings,
  Failed,
}

/// Outcome counts for personal notices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OwnerTally {
  pub sent:    usize,
  pub failed:  usize,
  /// Owners the messenger had no recipient for.
  pub skipped: usize,
}

#[derive(Debug)]
pub struct RunReport {
  pub run_id:      Uuid,
  pub status:      RunStatus,
  /// Set when the run failed before classification.
  pub error:       Option<SourceError>,
  pub fetched:     usize,
  /// Group label → size, in report order.
  pub counts:      Vec<(String, usize)>,
  pub attention:   usize,
  pub owners:      OwnerTally,
  pub digest_sent: bool,
  pub events:      Vec<RunEvent>,
}

// ─── Monitor ─────────────────────────────────────────────────────────────────

pub struct Monitor<S, T, M> {
  source:    S,
  tags:      T,
  messenger: M,
  config:    MonitorConfig,
}

enum Lookup {
  Found(Recipient),
  Missing,
  Failed(String),
}

impl<S, T, M> Monitor<S, T, M>
where
  S: EnvironmentSource,
  T: TagLookup,
  M: Messenger,
{
  pub fn new(source: S, tags: T, messenger: M, config: MonitorConfig) -> Self {
    Self { source, tags, messenger, config }
  }

  pub fn messenger(&self) -> &M { &self.messenger }

  /// Execute one end-to-end pass. Never returns an error: fatal problems are
  /// reported as [`RunStatus::Failed`].
  pub async fn run(&self, now: DateTime<Utc>) -> RunReport {
    let run_id = Uuid::new_v4();
    let span = tracing::info_span!("run", %run_id);
    self.run_inner(run_id, now).instrument(span).await
  }

  async fn run_inner(&self, run_id: Uuid, now: DateTime<Utc>) -> RunReport {
    tracing::info!(policy = ?self.config.policy, "ADE expiration monitor started");
    let mut events = Events::default();

    let inventory = match self.source.fetch_environments().await {
      Ok(inventory) => inventory,
      Err(error) => {
        tracing::error!(%error, "fetching environments failed; aborting run");
        self.send_error_notice(&error, &mut events).await;
        return RunReport {
          run_id,
          status: RunStatus::Failed,
          error: Some(error),
          fetched: 0,
          counts: Vec::new(),
          attention: 0,
          owners: OwnerTally::default(),
          digest_sent: false,
          events: events.into_vec(),
        };
      }
    };

    for failure in inventory.failures {
      events.emit(RunEvent::UpstreamFailed(failure));
    }
    let fetched = inventory.environments.len();
    let records = self.enrich(inventory.environments).await;

    let (messages, digest, counts) = match self.config.policy {
      Policy::Tiered => {
        let map = classify::classify(&records, now, &mut events);
        tracing::info!(
          "Summary: {} expired, {} tomorrow, {} in 3 days, {} in 7 days",
          map.get(Category::Expired).len(),
          map.get(Category::Tomorrow).len(),
          map.get(Category::ThreeDays).len(),
          map.get(Category::SevenDays).len(),
        );
        let counts = map
          .iter()
          .map(|(category, records)| (category.as_str().to_string(), records.len()))
          .collect::<Vec<_>>();
        (
          compose::compose_owner_messages(&map, &mut events),
          compose::compose_digest(&map, now),
          counts,
        )
      }
      Policy::Window { days } => {
        let map = classify::classify_window(&records, now, days, &mut events);
        tracing::info!(
          "Summary: {} expired, {} expiring within {} day(s)",
          map.expired.len(),
          map.expiring.len(),
          days,
        );
        let counts = vec![
          ("expired".to_string(), map.expired.len()),
          ("expiring".to_string(), map.expiring.len()),
          ("beyond".to_string(), map.beyond),
        ];
        (
          compose::compose_window_owner_messages(&map, &mut events),
          compose::compose_window_digest(&map, now),
          counts,
        )
      }
    };

    let attention = match &digest {
      Digest::AllHealthy => 0,
      Digest::Attention(body) => body.total,
    };
    tracing::info!(attention, "found environment(s) requiring attention");

    let owners = self.notify_owners(&messages, &mut events).await;
    let digest_sent = self.send_digest(digest, &mut events).await;

    let status = if events.has_warnings() {
      tracing::warn!("monitor completed with warnings");
      RunStatus::SucceededWithWarnings
    } else {
      tracing::info!("monitor completed successfully");
      RunStatus::Succeeded
    };

    RunReport {
      run_id,
      status,
      error: None,
      fetched,
      counts,
      attention,
      owners,
      digest_sent,
      events: events.into_vec(),
    }
  }

  /// Attach resource-group names and tags.
  async fn enrich(&self, environments: Vec<RawEnvironment>) -> Vec<EnvironmentRecord> {
    let mut records = Vec::with_capacity(environments.len());
    for raw in environments {
      let resource_group = raw.resource_group_name();
      let tags = match &resource_group {
        Some(name) => self.tags.fetch_tags(name).await,
        None => Tags::new(),
      };
      records.push(EnvironmentRecord::enrich(raw, resource_group, tags));
    }
    records
  }

  async fn notify_owners(&self, messages: &[OwnerMessage], events: &mut Events) -> OwnerTally {
    let mut tally = OwnerTally::default();
    let mut directory: HashMap<String, Lookup> = HashMap::new();

    for message in messages {
      let lookup = match directory.entry(message.owner.to_lowercase()) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => {
          let found = match self.messenger.find_recipient(&message.owner).await {
            Ok(Some(recipient)) => Lookup::Found(recipient),
            Ok(None) => Lookup::Missing,
            Err(error) => Lookup::Failed(error.to_string()),
          };
          entry.insert(found)
        }
      };

      let recipient = match lookup {
        Lookup::Found(recipient) => recipient,
        Lookup::Missing => {
          tally.skipped += 1;
          events.emit(RunEvent::RecipientNotFound {
            owner:       message.owner.clone(),
            environment: message.environment.clone(),
          });
          continue;
        }
        Lookup::Failed(reason) => {
          tally.failed += 1;
          events.emit(RunEvent::DispatchFailed(DispatchError::new(&message.owner, reason)));
          continue;
        }
      };

      let content = Content::Text(message.text.clone());
      match self.messenger.send(recipient, &content).await {
        Ok(()) => {
          tally.sent += 1;
          events.emit(RunEvent::OwnerNotified {
            owner:       message.owner.clone(),
            environment: message.environment.clone(),
          });
        }
        Err(error) => {
          tally.failed += 1;
          events.emit(RunEvent::DispatchFailed(DispatchError::new(&message.owner, error)));
        }
      }
    }
    tally
  }

  async fn send_digest(&self, digest: Digest, events: &mut Events) -> bool {
    match self.messenger.send(&self.config.channel, &Content::Digest(digest)).await {
      Ok(()) => {
        events.emit(RunEvent::DigestSent);
        true
      }
      Err(error) => {
        events.emit(RunEvent::DispatchFailed(DispatchError::new(
          self.config.channel.as_str(),
          error,
        )));
        false
      }
    }
  }

  async fn send_error_notice(&self, error: &SourceError, events: &mut Events) {
    let notice = Content::Text(format!(
      "❌ ADE Expiration Monitor encountered an error: {error}"
    ));
    if let Err(e) = self.messenger.send(&self.config.channel, &notice).await {
      events.emit(RunEvent::DispatchFailed(DispatchError::new(
        self.config.channel.as_str(),
        e,
      )));
    }
  }
}
