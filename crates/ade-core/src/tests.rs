//! End-to-end runs of the orchestrator against in-memory collaborators.

use std::{
  collections::{HashMap, HashSet},
  sync::Mutex,
};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};

use crate::{
  ConfigurationError, SourceError, UpstreamError,
  classify::Policy,
  compose::{ALL_HEALTHY, Content, Digest},
  date::{RawExpiration, Unavailable},
  environment::{RawEnvironment, Tags},
  event::RunEvent,
  run::{Monitor, MonitorConfig, RunStatus},
  source::{EnvironmentSource, Inventory, Messenger, Recipient, TagLookup},
};

// ─── Fakes ───────────────────────────────────────────────────────────────────

struct FakeSource(Result<Inventory, SourceError>);

impl EnvironmentSource for FakeSource {
  async fn fetch_environments(&self) -> Result<Inventory, SourceError> { self.0.clone() }
}

#[derive(Default)]
struct FakeTags(HashMap<String, Tags>);

impl TagLookup for FakeTags {
  async fn fetch_tags(&self, resource_group: &str) -> Tags {
    self.0.get(resource_group).cloned().unwrap_or_default()
  }
}

#[derive(Debug, thiserror::Error)]
#[error("fake messenger: {0}")]
struct FakeError(String);

/// Resolves `name@…` to recipient `U-name`, except for addresses in
/// `unknown`; sends to recipients in `broken` fail.
#[derive(Default)]
struct FakeMessenger {
  unknown: HashSet<String>,
  broken:  HashSet<String>,
  lookups: Mutex<Vec<String>>,
  sent:    Mutex<Vec<(Recipient, Content)>>,
}

impl FakeMessenger {
  fn sent(&self) -> Vec<(Recipient, Content)> { self.sent.lock().unwrap().clone() }

  fn sent_to(&self) -> Vec<String> {
    self.sent().into_iter().map(|(r, _)| r.0).collect()
  }
}

impl Messenger for FakeMessenger {
  type Error = FakeError;

  async fn find_recipient(&self, email: &str) -> Result<Option<Recipient>, FakeError> {
    self.lookups.lock().unwrap().push(email.to_string());
    if self.unknown.contains(email) {
      return Ok(None);
    }
    let user = email.split('@').next().unwrap_or(email);
    Ok(Some(Recipient::new(format!("U-{user}"))))
  }

  async fn send(&self, recipient: &Recipient, content: &Content) -> Result<(), FakeError> {
    if self.broken.contains(recipient.as_str()) {
      return Err(FakeError(format!("cannot reach {recipient}")));
    }
    self.sent.lock().unwrap().push((recipient.clone(), content.clone()));
    Ok(())
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn now() -> DateTime<Utc> { Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap() }

fn env(name: &str, user: Option<&str>, expires_in_hours: Option<i64>) -> RawEnvironment {
  RawEnvironment {
    name: name.into(),
    project_name: "portal".into(),
    resource_group_id: Some(format!("/subscriptions/s/resourceGroups/rg-{name}")),
    expiration: expires_in_hours
      .map(|h| RawExpiration::Timestamp(now() + TimeDelta::hours(h))),
    user: user.map(str::to_string),
    ..Default::default()
  }
}

fn inventory(environments: Vec<RawEnvironment>) -> FakeSource {
  FakeSource(Ok(Inventory { environments, failures: Vec::new() }))
}

fn monitor(
  source: FakeSource,
  tags: FakeTags,
  messenger: FakeMessenger,
) -> Monitor<FakeSource, FakeTags, FakeMessenger> {
  Monitor::new(
    source,
    tags,
    messenger,
    MonitorConfig { channel: Recipient::new("C-monitor"), policy: Policy::Tiered },
  )
}

// ─── Scenarios ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn healthy_run_sends_only_the_all_clear() {
  let m = monitor(
    inventory(vec![env("far", Some("a@x.com"), Some(24 * 30))]),
    FakeTags::default(),
    FakeMessenger::default(),
  );
  let report = m.run(now()).await;

  assert_eq!(report.status, RunStatus::Succeeded);
  assert_eq!(report.attention, 0);
  assert!(report.digest_sent);
  let sent = m.messenger().sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, Recipient::new("C-monitor"));
  assert_eq!(sent[0].1, Content::Digest(Digest::AllHealthy));
  assert_eq!(sent[0].1.to_string(), ALL_HEALTHY);
}

#[tokio::test]
async fn second_owner_failing_does_not_stop_the_third() {
  let messenger = FakeMessenger {
    broken: HashSet::from(["U-bob".to_string()]),
    ..Default::default()
  };
  let m = monitor(
    inventory(vec![
      env("one", Some("alice@x.com"), Some(-5)),
      env("two", Some("bob@x.com"), Some(-4)),
      env("three", Some("carol@x.com"), Some(-3)),
    ]),
    FakeTags::default(),
    messenger,
  );
  let report = m.run(now()).await;

  assert_eq!(report.status, RunStatus::SucceededWithWarnings);
  assert_eq!(report.owners.sent, 2);
  assert_eq!(report.owners.failed, 1);
  assert_eq!(m.messenger().sent_to(), ["U-alice", "U-carol", "C-monitor"]);
  assert!(report.events.iter().any(|e| matches!(
    e,
    RunEvent::DispatchFailed(err) if err.target == "bob@x.com"
  )));
}

#[tokio::test]
async fn configuration_error_fails_and_notifies_channel() {
  let m = monitor(
    FakeSource(Err(ConfigurationError::Missing("subscription_id").into())),
    FakeTags::default(),
    FakeMessenger::default(),
  );
  let report = m.run(now()).await;

  assert_eq!(report.status, RunStatus::Failed);
  assert!(matches!(report.error, Some(SourceError::Configuration(_))));
  assert!(!report.digest_sent);
  let sent = m.messenger().sent();
  assert_eq!(sent.len(), 1);
  assert_eq!(sent[0].0, Recipient::new("C-monitor"));
  assert!(
    sent[0]
      .1
      .to_string()
      .starts_with("❌ ADE Expiration Monitor encountered an error:")
  );
  assert!(sent[0].1.to_string().contains("subscription_id"));
}

#[tokio::test]
async fn failed_error_notice_is_recorded() {
  let messenger = FakeMessenger {
    broken: HashSet::from(["C-monitor".to_string()]),
    ..Default::default()
  };
  let m = monitor(
    FakeSource(Err(UpstreamError::new("devcenters", "403 Forbidden").into())),
    FakeTags::default(),
    messenger,
  );
  let report = m.run(now()).await;
  assert_eq!(report.status, RunStatus::Failed);
  assert!(matches!(report.events.as_slice(), [RunEvent::DispatchFailed(_)]));
}

#[tokio::test]
async fn partial_upstream_failure_is_a_warning() {
  let m = monitor(
    FakeSource(Ok(Inventory {
      environments: vec![env("far", None, Some(24 * 30))],
      failures:     vec![UpstreamError::new("projects/other environments", "timeout")],
    })),
    FakeTags::default(),
    FakeMessenger::default(),
  );
  let report = m.run(now()).await;
  assert_eq!(report.status, RunStatus::SucceededWithWarnings);
  assert!(report.digest_sent);
  assert_eq!(report.fetched, 1);
}

#[tokio::test]
async fn owner_tags_outrank_the_account_id() {
  let tags = FakeTags(HashMap::from([(
    "rg-tagged".to_string(),
    Tags::from([("Created-By".to_string(), "dana@x.com".to_string())]),
  )]));
  let m = monitor(
    inventory(vec![env("tagged", Some("object-id-1"), Some(10))]),
    tags,
    FakeMessenger::default(),
  );
  let report = m.run(now()).await;
  assert_eq!(report.owners.sent, 1);
  assert_eq!(m.messenger().sent_to(), ["U-dana", "C-monitor"]);
  match &m.messenger().sent()[0].1 {
    Content::Text(text) => assert!(text.contains("Resource Group: rg-tagged")),
    other => panic!("expected text notice, got {other:?}"),
  }
}

#[tokio::test]
async fn unknown_recipients_are_skipped_without_warning() {
  let messenger = FakeMessenger {
    unknown: HashSet::from(["ghost@x.com".to_string()]),
    ..Default::default()
  };
  let m = monitor(
    inventory(vec![
      env("haunted", Some("ghost@x.com"), Some(-1)),
      env("orphan", None, Some(-1)),
      env("undated", Some("eve@x.com"), None),
    ]),
    FakeTags::default(),
    messenger,
  );
  let report = m.run(now()).await;

  assert_eq!(report.status, RunStatus::Succeeded);
  assert_eq!(report.owners.skipped, 1);
  assert_eq!(report.owners.sent, 0);
  assert_eq!(report.attention, 2);
  assert_eq!(report.counts[0], ("expired".to_string(), 2));
  assert_eq!(m.messenger().sent_to(), ["C-monitor"]);
  assert!(report.events.iter().any(|e| matches!(e, RunEvent::OwnerUnresolved { environment, .. } if environment == "orphan")));
  assert!(report.events.iter().any(|e| matches!(e, RunEvent::RecordDropped { environment, .. } if environment == "undated")));
  assert!(report.events.iter().any(|e| matches!(e, RunEvent::RecipientNotFound { owner, .. } if owner == "ghost@x.com")));
}

#[tokio::test]
async fn malformed_expiration_is_a_warning() {
  let mut garbled = env("garbled", Some("a@x.com"), None);
  garbled.expiration = Some(RawExpiration::from("not-a-date"));
  let m = monitor(
    inventory(vec![garbled, env("far", Some("b@x.com"), Some(24 * 30))]),
    FakeTags::default(),
    FakeMessenger::default(),
  );
  let report = m.run(now()).await;

  assert_eq!(report.status, RunStatus::SucceededWithWarnings);
  assert!(report.digest_sent);
  assert!(report.events.iter().any(|e| matches!(
    e,
    RunEvent::RecordDropped { environment, reason: Unavailable::Malformed { .. }, .. }
      if environment == "garbled"
  )));
}

#[tokio::test]
async fn each_owner_is_looked_up_once() {
  let m = monitor(
    inventory(vec![
      env("first", Some("frank@x.com"), Some(20)),
      env("second", Some("Frank@x.com"), Some(30)),
    ]),
    FakeTags::default(),
    FakeMessenger::default(),
  );
  let report = m.run(now()).await;
  assert_eq!(report.owners.sent, 2);
  assert_eq!(m.messenger().lookups.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn digest_failure_is_a_warning() {
  let messenger = FakeMessenger {
    broken: HashSet::from(["C-monitor".to_string()]),
    ..Default::default()
  };
  let m = monitor(inventory(vec![env("one", Some("a@x.com"), Some(-2))]), FakeTags::default(), messenger);
  let report = m.run(now()).await;
  assert_eq!(report.status, RunStatus::SucceededWithWarnings);
  assert!(!report.digest_sent);
  assert_eq!(report.owners.sent, 1);
}

#[tokio::test]
async fn window_policy_reports_its_own_groups() {
  let m = Monitor::new(
    inventory(vec![
      env("gone", Some("a@x.com"), Some(-30)),
      env("soon", Some("b@x.com"), Some(40)),
      env("later", Some("c@x.com"), Some(24 * 5)),
    ]),
    FakeTags::default(),
    FakeMessenger::default(),
    MonitorConfig { channel: Recipient::new("C-monitor"), policy: Policy::Window { days: 3 } },
  );
  let report = m.run(now()).await;
  assert_eq!(report.status, RunStatus::Succeeded);
  assert_eq!(
    report.counts,
    [("expired".to_string(), 1), ("expiring".to_string(), 1), ("beyond".to_string(), 1)]
  );
  assert_eq!(m.messenger().sent_to(), ["U-a", "U-b", "C-monitor"]);
}
