//! Expiration classification.
//!
//! [`classify`] implements the four-tier policy (expired, tomorrow, 3 days,
//! 7 days, future). [`classify_window`] implements the single-threshold
//! policy, which only distinguishes expired from expiring within a window.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use strum::{EnumIter, IntoEnumIterator, IntoStaticStr};

use crate::{
  date::{self, Expiration},
  environment::EnvironmentRecord,
  event::{Events, RunEvent},
  owner::{self, Owner},
};

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Which grouping a run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum Policy {
  /// Fixed 1/3/7-day tiers.
  #[default]
  Tiered,
  /// A single warning window of `days` days.
  Window { days: u32 },
}

// ─── Category ────────────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, IntoStaticStr,
)]
pub enum Category {
  #[serde(rename = "expired")]
  #[strum(serialize = "expired")]
  Expired,
  #[serde(rename = "tomorrow")]
  #[strum(serialize = "tomorrow")]
  Tomorrow,
  #[serde(rename = "3_days")]
  #[strum(serialize = "3_days")]
  ThreeDays,
  #[serde(rename = "7_days")]
  #[strum(serialize = "7_days")]
  SevenDays,
  #[serde(rename = "future")]
  #[strum(serialize = "future")]
  Future,
}

impl Category {
  /// Every category except [`Category::Future`], in digest order.
  pub const ATTENTION: [Category; 4] =
    [Self::Expired, Self::Tomorrow, Self::ThreeDays, Self::SevenDays];

  pub fn as_str(self) -> &'static str { self.into() }

  fn index(self) -> usize {
    match self {
      Self::Expired => 0,
      Self::Tomorrow => 1,
      Self::ThreeDays => 2,
      Self::SevenDays => 3,
      Self::Future => 4,
    }
  }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// An environment with a resolved expiration, owner and category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategorizedRecord {
  pub environment:           EnvironmentRecord,
  pub owner:                 Owner,
  pub expiration:            DateTime<Utc>,
  /// Whole days until expiration, rounded towards negative infinity.
  pub days_until_expiration: i64,
  pub category:              Category,
}

/// Category → records, in source order. Every category is always present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryMap {
  buckets: [Vec<CategorizedRecord>; 5],
}

impl CategoryMap {
  pub fn get(&self, category: Category) -> &[CategorizedRecord] {
    &self.buckets[category.index()]
  }

  /// All categories in order, including empty ones.
  pub fn iter(&self) -> impl Iterator<Item = (Category, &[CategorizedRecord])> {
    Category::iter().map(|category| (category, self.get(category)))
  }

  /// Records in every category but `future`, category by category.
  pub fn attention_records(&self) -> impl Iterator<Item = &CategorizedRecord> {
    Category::ATTENTION
      .into_iter()
      .flat_map(|category| self.get(category))
  }

  /// Sum of the expired, tomorrow, 3-day and 7-day buckets.
  pub fn attention_count(&self) -> usize {
    Category::ATTENTION
      .iter()
      .map(|category| self.get(*category).len())
      .sum()
  }

  fn push(&mut self, record: CategorizedRecord) {
    self.buckets[record.category.index()].push(record);
  }
}

// ─── Thresholds ──────────────────────────────────────────────────────────────

/// Tier boundaries derived from a single `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
  pub now:        DateTime<Utc>,
  pub tomorrow:   DateTime<Utc>,
  pub three_days: DateTime<Utc>,
  pub seven_days: DateTime<Utc>,
}

impl Thresholds {
  pub fn at(now: DateTime<Utc>) -> Self {
    Self {
      now,
      tomorrow: now + TimeDelta::days(1),
      three_days: now + TimeDelta::days(3),
      seven_days: now + TimeDelta::days(7),
    }
  }

  /// Only strictly-past expirations are expired; every other boundary is
  /// inclusive.
  pub fn category_of(&self, expiration: DateTime<Utc>) -> Category {
    if expiration < self.now {
      Category::Expired
    } else if expiration <= self.tomorrow {
      Category::Tomorrow
    } else if expiration <= self.three_days {
      Category::ThreeDays
    } else if expiration <= self.seven_days {
      Category::SevenDays
    } else {
      Category::Future
    }
  }
}

/// Whole days from `now` to `expiration`, floored: six hours ago is `-1`.
pub fn days_until(expiration: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  let delta = expiration - now;
  let days = delta.num_days();
  if delta < TimeDelta::days(days) { days - 1 } else { days }
}

// ─── Classification ──────────────────────────────────────────────────────────

fn categorize(
  record: &EnvironmentRecord,
  thresholds: &Thresholds,
  events: &mut Events,
) -> Option<CategorizedRecord> {
  let expiration = match date::normalize(record.expiration_raw.as_ref()) {
    Expiration::At(ts) => ts,
    Expiration::NotAvailable(reason) => {
      events.emit(RunEvent::RecordDropped {
        project: record.project_name.clone(),
        environment: record.name.clone(),
        reason,
      });
      return None;
    }
  };

  let owner = owner::resolve(
    &record.owner_hint.tags,
    record.owner_hint.fallback_id.as_deref(),
  );
  let days_until_expiration = days_until(expiration, thresholds.now);
  let category = thresholds.category_of(expiration);

  tracing::debug!(
    environment = %record.name,
    %expiration,
    days_until_expiration,
    category = category.as_str(),
    "categorized environment"
  );

  Some(CategorizedRecord {
    environment: record.clone(),
    owner,
    expiration,
    days_until_expiration,
    category,
  })
}

/// Bucket `records` under the four-tier policy.
///
/// Records without a usable expiration are dropped and reported through
/// `events`. Relative order within each category follows `records`.
pub fn classify(
  records: &[EnvironmentRecord],
  now: DateTime<Utc>,
  events: &mut Events,
) -> CategoryMap {
  let thresholds = Thresholds::at(now);
  tracing::debug!(?thresholds, total = records.len(), "classifying environments");

  let mut map = CategoryMap::default();
  for record in records {
    if let Some(categorized) = categorize(record, &thresholds, events) {
      map.push(categorized);
    }
  }
  map
}

/// Grouping produced by [`classify_window`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WindowMap {
  pub days:     u32,
  pub expired:  Vec<CategorizedRecord>,
  /// Not yet expired, but expiring on or before `now + days`.
  pub expiring: Vec<CategorizedRecord>,
  /// Number of records beyond the window.
  pub beyond:   usize,
}

impl WindowMap {
  pub fn attention_count(&self) -> usize { self.expired.len() + self.expiring.len() }

  /// Expired records first, then expiring ones, each in source order.
  pub fn attention_records(&self) -> impl Iterator<Item = &CategorizedRecord> {
    self.expired.iter().chain(self.expiring.iter())
  }
}

/// Bucket `records` under the single-threshold policy.
pub fn classify_window(
  records: &[EnvironmentRecord],
  now: DateTime<Utc>,
  days: u32,
  events: &mut Events,
) -> WindowMap {
  let thresholds = Thresholds::at(now);
  let limit = now
    .checked_add_signed(TimeDelta::days(i64::from(days)))
    .unwrap_or(DateTime::<Utc>::MAX_UTC);

  let mut map = WindowMap { days, ..WindowMap::default() };
  for record in records {
    let Some(categorized) = categorize(record, &thresholds, events) else {
      continue;
    };
    if categorized.expiration < now {
      map.expired.push(categorized);
    } else if categorized.expiration <= limit {
      map.expiring.push(categorized);
    } else {
      map.beyond += 1;
    }
  }
  map
}
