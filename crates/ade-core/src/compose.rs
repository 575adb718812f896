//! Notification composition.
//!
//! Turns a classification into personal notices (one per owner and
//! environment) and a digest for the monitoring channel. The digest is a
//! structured document; messengers decide how to render it. Its `Display`
//! form is the plain-text rendering.

use std::{collections::HashSet, fmt};

use chrono::{DateTime, NaiveDate, Utc};

use crate::{
  classify::{CategorizedRecord, Category, CategoryMap, WindowMap},
  event::{Events, RunEvent},
};

pub const ALL_HEALTHY: &str =
  "✅ All Azure Deployment Environments are healthy - no expiration warnings.";

const WINDOW_DIGEST_LIMIT: usize = 10;

// ─── Content ─────────────────────────────────────────────────────────────────

/// What a messenger is asked to deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
  Text(String),
  Digest(Digest),
}

impl fmt::Display for Content {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Text(text) => f.write_str(text),
      Self::Digest(digest) => digest.fmt(f),
    }
  }
}

/// A personal notice about one environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerMessage {
  /// Resolved owner identity, normally an email address.
  pub owner:       String,
  pub project:     String,
  pub environment: String,
  pub text:        String,
}

// ─── Digest ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Digest {
  /// Nothing needs attention.
  AllHealthy,
  Attention(DigestBody),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestBody {
  pub generated_at: DateTime<Utc>,
  /// Number of environments needing attention.
  pub total:        usize,
  pub any_expired:  bool,
  pub summary:      Vec<SummaryLine>,
  pub sections:     Vec<DigestSection>,
}

impl DigestBody {
  pub fn marker(&self) -> &'static str { if self.any_expired { "🚨" } else { "⚠️" } }

  pub fn title(&self) -> String { format!("{} ADE Expiration Alert", self.marker()) }

  pub fn summary_text(&self) -> String {
    let mut text = format!("*Summary:* {} environment(s) need attention\n", self.total);
    for line in &self.summary {
      text.push_str(&format!("\n{} {} {}", line.marker, line.count, line.label));
    }
    text
  }

  pub fn footer(&self) -> String {
    format!(
      "🤖 _ADE Expiration Monitor | {}_",
      self.generated_at.format("%Y-%m-%d %H:%M UTC")
    )
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryLine {
  pub marker: &'static str,
  pub count:  usize,
  pub label:  String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestSection {
  pub marker:  &'static str,
  pub title:   String,
  /// Size of the whole group, including entries left out.
  pub total:   usize,
  pub entries: Vec<DigestEntry>,
  pub omitted: usize,
}

impl DigestSection {
  pub fn heading(&self) -> String { format!("*{} {} ({})*", self.marker, self.title, self.total) }

  pub fn omitted_note(&self) -> Option<String> {
    (self.omitted > 0).then(|| format!("_…and {} more_", self.omitted))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigestEntry {
  pub name:   String,
  pub owner:  String,
  pub detail: EntryDetail,
}

impl fmt::Display for DigestEntry {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "• `{}`\n  Owner: {}\n  {}", self.name, self.owner, self.detail)
  }
}

/// The one-line status shown for a digest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDetail {
  ExpiredDaysAgo(i64),
  ExpiresOn(NaiveDate),
  DaysLeft(i64),
  ExpiresToday,
  ExpiresTomorrow,
  ExpiresInDays(i64),
}

impl fmt::Display for EntryDetail {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::ExpiredDaysAgo(days) => write!(f, "Expired: {days} day(s) ago"),
      Self::ExpiresOn(date) => write!(f, "Expires: {}", date.format("%Y-%m-%d")),
      Self::DaysLeft(days) => write!(f, "Days left: {days}"),
      Self::ExpiresToday => f.write_str("Expires today"),
      Self::ExpiresTomorrow => f.write_str("Expires tomorrow"),
      Self::ExpiresInDays(days) => write!(f, "Expires in {days} days"),
    }
  }
}

impl fmt::Display for Digest {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let body = match self {
      Self::AllHealthy => return f.write_str(ALL_HEALTHY),
      Self::Attention(body) => body,
    };
    writeln!(f, "{}", body.title())?;
    writeln!(f, "{}", body.summary_text())?;
    for section in &body.sections {
      writeln!(f, "\n{}", section.heading())?;
      for entry in &section.entries {
        writeln!(f, "{entry}")?;
      }
      if let Some(note) = section.omitted_note() {
        writeln!(f, "{note}")?;
      }
    }
    write!(f, "\n{}", body.footer())
  }
}

// ─── Tiered policy ───────────────────────────────────────────────────────────

struct Tier {
  category: Category,
  marker:   &'static str,
  title:    &'static str,
  summary:  &'static str,
  limit:    usize,
}

const TIERS: [Tier; 4] = [
  Tier {
    category: Category::Expired,
    marker:   "❌",
    title:    "EXPIRED",
    summary:  "already expired",
    limit:    5,
  },
  Tier {
    category: Category::Tomorrow,
    marker:   "🚨",
    title:    "TOMORROW",
    summary:  "expire tomorrow",
    limit:    5,
  },
  Tier {
    category: Category::ThreeDays,
    marker:   "⚠️",
    title:    "3 DAYS",
    summary:  "expire in 3 days",
    limit:    3,
  },
  Tier {
    category: Category::SevenDays,
    marker:   "⏰",
    title:    "7 DAYS",
    summary:  "expire in 7 days",
    limit:    3,
  },
];

fn section<'a>(
  marker: &'static str,
  title: String,
  records: impl ExactSizeIterator<Item = &'a CategorizedRecord>,
  limit: usize,
  detail: impl Fn(&CategorizedRecord) -> EntryDetail,
) -> DigestSection {
  let total = records.len();
  let entries = records
    .take(limit)
    .map(|record| DigestEntry {
      name:   record.environment.name.clone(),
      owner:  record.owner.to_string(),
      detail: detail(record),
    })
    .collect::<Vec<_>>();
  DigestSection {
    marker,
    title,
    total,
    omitted: total - entries.len(),
    entries,
  }
}

fn tier_detail(record: &CategorizedRecord) -> EntryDetail {
  match record.category {
    Category::Expired => EntryDetail::ExpiredDaysAgo(record.days_until_expiration.abs()),
    Category::Tomorrow => EntryDetail::ExpiresOn(record.expiration.date_naive()),
    _ => EntryDetail::DaysLeft(record.days_until_expiration),
  }
}

/// Build the monitoring-channel digest for the four-tier policy.
pub fn compose_digest(map: &CategoryMap, generated_at: DateTime<Utc>) -> Digest {
  let total = map.attention_count();
  if total == 0 {
    return Digest::AllHealthy;
  }

  let summary = TIERS
    .iter()
    .map(|tier| SummaryLine {
      marker: tier.marker,
      count:  map.get(tier.category).len(),
      label:  tier.summary.to_string(),
    })
    .collect();

  let sections = TIERS
    .iter()
    .filter(|tier| !map.get(tier.category).is_empty())
    .map(|tier| {
      section(
        tier.marker,
        tier.title.to_string(),
        map.get(tier.category).iter(),
        tier.limit,
        tier_detail,
      )
    })
    .collect();

  Digest::Attention(DigestBody {
    generated_at,
    total,
    any_expired: !map.get(Category::Expired).is_empty(),
    summary,
    sections,
  })
}

// ─── Window policy ───────────────────────────────────────────────────────────

fn window_detail(record: &CategorizedRecord) -> EntryDetail {
  match record.days_until_expiration {
    _ if record.category == Category::Expired => {
      EntryDetail::ExpiredDaysAgo(record.days_until_expiration.abs())
    }
    0 => EntryDetail::ExpiresToday,
    1 => EntryDetail::ExpiresTomorrow,
    days => EntryDetail::ExpiresInDays(days),
  }
}

/// Build the monitoring-channel digest for the single-threshold policy.
pub fn compose_window_digest(map: &WindowMap, generated_at: DateTime<Utc>) -> Digest {
  let total = map.attention_count();
  if total == 0 {
    return Digest::AllHealthy;
  }

  let summary = vec![
    SummaryLine {
      marker: "❌",
      count:  map.expired.len(),
      label:  "already expired".to_string(),
    },
    SummaryLine {
      marker: "⏰",
      count:  map.expiring.len(),
      label:  format!("expiring within {} day(s)", map.days),
    },
  ];
  let sections = vec![section(
    "⏰",
    format!("EXPIRING WITHIN {} DAY(S)", map.days),
    map.expired.iter().chain(map.expiring.iter()).collect::<Vec<_>>().into_iter(),
    WINDOW_DIGEST_LIMIT,
    window_detail,
  )];

  Digest::Attention(DigestBody {
    generated_at,
    total,
    any_expired: !map.expired.is_empty(),
    summary,
    sections,
  })
}

// ─── Personal notices ────────────────────────────────────────────────────────

fn or_na(value: &Option<String>) -> &str { value.as_deref().unwrap_or("N/A") }

/// The text of a personal notice about one environment.
pub fn owner_message_text(record: &CategorizedRecord) -> String {
  let env = &record.environment;
  let date = record.expiration.format("%Y-%m-%d");
  let when = if record.days_until_expiration < 0 {
    format!(
      "expired on *{date}* (*{}* day(s) ago)",
      record.days_until_expiration.abs()
    )
  } else {
    format!(
      "is set to expire on *{date}* (in *{}* days)",
      record.days_until_expiration
    )
  };
  format!(
    "Hello! Your Azure Deployment Environment *{name}* {when}.\n\
     Please take necessary action to extend or decommission it.\n\n\
     Project: {project}\n\
     Resource Group: {resource_group}\n\
     Environment Definition: {definition}\n\
     Catalog: {catalog}\n\
     Provisioning State: {state}\n\
     Resource ID: {resource_id}",
    name = env.name,
    project = env.project_name,
    resource_group = or_na(&env.resource_group),
    definition = or_na(&env.environment_definition_name),
    catalog = or_na(&env.catalog_name),
    state = or_na(&env.provisioning_state),
    resource_id = or_na(&env.resource_group_id),
  )
}

fn owner_messages<'a>(
  records: impl Iterator<Item = &'a CategorizedRecord>,
  events: &mut Events,
) -> Vec<OwnerMessage> {
  let mut seen = HashSet::new();
  let mut messages = Vec::new();

  for record in records {
    let env = &record.environment;
    let Some(owner) = record.owner.identity() else {
      events.emit(RunEvent::OwnerUnresolved {
        project:     env.project_name.clone(),
        environment: env.name.clone(),
      });
      continue;
    };
    if !seen.insert((owner.to_lowercase(), env.project_name.as_str(), env.name.as_str())) {
      events.emit(RunEvent::DuplicateSuppressed {
        owner:       owner.to_string(),
        project:     env.project_name.clone(),
        environment: env.name.clone(),
      });
      continue;
    }
    messages.push(OwnerMessage {
      owner:       owner.to_string(),
      project:     env.project_name.clone(),
      environment: env.name.clone(),
      text:        owner_message_text(record),
    });
  }
  messages
}

/// One notice per resolved owner and environment across every category but
/// `future`, in classification order.
pub fn compose_owner_messages(map: &CategoryMap, events: &mut Events) -> Vec<OwnerMessage> {
  owner_messages(map.attention_records(), events)
}

/// Like [`compose_owner_messages`], for the single-threshold policy.
pub fn compose_window_owner_messages(map: &WindowMap, events: &mut Events) -> Vec<OwnerMessage> {
  owner_messages(map.attention_records(), events)
}
