//! Date normalisation.
//!
//! Upstream sources disagree on whether an expiration is a full instant or a
//! bare calendar date, and on whether instants carry a timezone. Everything
//! here funnels into `DateTime<Utc>`; nothing here ever returns an error to
//! the caller.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

// ─── Input ───────────────────────────────────────────────────────────────────

/// An expiration value as received from a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawExpiration {
  /// Already a structured timestamp.
  Timestamp(DateTime<Utc>),
  /// A textual date or date-time in one of several ISO-8601 shapes.
  Text(String),
}

impl RawExpiration {
  /// Convert a JSON field into a raw expiration. `null` means absent; numbers
  /// and other non-string values are kept as text so they are reported as
  /// malformed rather than silently discarded.
  pub fn from_json(value: serde_json::Value) -> Option<Self> {
    match value {
      serde_json::Value::Null => None,
      serde_json::Value::String(s) => Some(Self::Text(s)),
      other => Some(Self::Text(other.to_string())),
    }
  }
}

impl From<DateTime<Utc>> for RawExpiration {
  fn from(value: DateTime<Utc>) -> Self { Self::Timestamp(value) }
}

impl From<&str> for RawExpiration {
  fn from(value: &str) -> Self { Self::Text(value.to_string()) }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Why an expiration could not be resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Unavailable {
  /// No value, or an empty string.
  Absent,
  /// A value was present but matched none of the accepted formats.
  Malformed { raw: String, reason: String },
}

/// Result of [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expiration {
  At(DateTime<Utc>),
  NotAvailable(Unavailable),
}

impl Expiration {
  pub fn at(&self) -> Option<DateTime<Utc>> {
    match self {
      Self::At(ts) => Some(*ts),
      Self::NotAvailable(_) => None,
    }
  }
}

// ─── Normalisation ───────────────────────────────────────────────────────────

/// Resolve a raw expiration into a UTC timestamp.
///
/// - `…Z` strings are read as UTC.
/// - strings with a `T` separator are read as date-times; a missing offset
///   means UTC.
/// - bare `YYYY-MM-DD` dates are anchored to midnight UTC.
///
/// Parse failures are logged and returned as [`Unavailable::Malformed`].
pub fn normalize(raw: Option<&RawExpiration>) -> Expiration {
  let text = match raw {
    None => return Expiration::NotAvailable(Unavailable::Absent),
    Some(RawExpiration::Timestamp(ts)) => return Expiration::At(*ts),
    Some(RawExpiration::Text(text)) => text.trim(),
  };
  if text.is_empty() {
    return Expiration::NotAvailable(Unavailable::Absent);
  }

  let parsed = if let Some(head) = text.strip_suffix('Z') {
    parse_date_time(&format!("{head}+00:00"))
  } else if text.contains('T') {
    parse_date_time(text)
  } else {
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
      .map_err(|e| e.to_string())
      .and_then(|date| {
        date
          .and_hms_opt(0, 0, 0)
          .map(|midnight| midnight.and_utc())
          .ok_or_else(|| "date has no midnight".to_string())
      })
  };

  match parsed {
    Ok(ts) => Expiration::At(ts),
    Err(reason) => {
      tracing::warn!(raw = text, %reason, "failed to parse expiration date");
      Expiration::NotAvailable(Unavailable::Malformed {
        raw: text.to_string(),
        reason,
      })
    }
  }
}

/// Parse an ISO-8601 date-time with or without an offset.
fn parse_date_time(text: &str) -> Result<DateTime<Utc>, String> {
  if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
    return Ok(ts.with_timezone(&Utc));
  }
  // RFC 3339 insists on seconds; ISO-8601 does not.
  if let Ok(ts) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%:z") {
    return Ok(ts.with_timezone(&Utc));
  }
  for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
      return Ok(naive.and_utc());
    }
  }
  Err(format!("unrecognised date-time {text:?}"))
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  fn text(s: &str) -> Expiration { normalize(Some(&RawExpiration::from(s))) }

  fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
  }

  #[test]
  fn absent_and_empty_are_not_available() {
    assert_eq!(normalize(None), Expiration::NotAvailable(Unavailable::Absent));
    assert_eq!(text(""), Expiration::NotAvailable(Unavailable::Absent));
    assert_eq!(text("   "), Expiration::NotAvailable(Unavailable::Absent));
  }

  #[test]
  fn zulu_suffix_is_utc() {
    assert_eq!(text("2024-01-10T12:00:00Z"), Expiration::At(utc(2024, 1, 10, 12, 0, 0)));
  }

  #[test]
  fn zulu_with_seven_fractional_digits() {
    let parsed = text("2024-01-10T12:00:00.1234567Z").at().unwrap();
    assert_eq!(parsed.timestamp(), utc(2024, 1, 10, 12, 0, 0).timestamp());
  }

  #[test]
  fn explicit_offset_is_converted() {
    assert_eq!(
      text("2024-01-10T12:00:00+02:00"),
      Expiration::At(utc(2024, 1, 10, 10, 0, 0))
    );
  }

  #[test]
  fn naive_date_time_is_assumed_utc() {
    assert_eq!(text("2024-01-10T08:30:00"), Expiration::At(utc(2024, 1, 10, 8, 30, 0)));
    assert_eq!(text("2024-01-10T08:30"), Expiration::At(utc(2024, 1, 10, 8, 30, 0)));
  }

  #[test]
  fn date_only_is_midnight_utc() {
    assert_eq!(text("2024-01-13"), Expiration::At(utc(2024, 1, 13, 0, 0, 0)));
  }

  #[test]
  fn garbage_is_malformed_not_a_panic() {
    for bad in ["tomorrow", "2024-13-45", "2024-01-10T99:00:00Z", "12/01/2024"] {
      match text(bad) {
        Expiration::NotAvailable(Unavailable::Malformed { raw, .. }) => {
          assert_eq!(raw, bad)
        }
        other => panic!("{bad:?} parsed as {other:?}"),
      }
    }
  }

  #[test]
  fn structured_timestamp_is_returned_unchanged() {
    let ts = utc(2030, 6, 1, 0, 0, 0);
    assert_eq!(normalize(Some(&RawExpiration::from(ts))), Expiration::At(ts));
  }

  #[test]
  fn normalising_a_normalised_value_is_idempotent() {
    let once = text("2024-01-10T12:00:00+05:00").at().unwrap();
    let twice = normalize(Some(&RawExpiration::Timestamp(once))).at().unwrap();
    assert_eq!(once, twice);
  }

  #[test]
  fn json_values_map_onto_raw_expirations() {
    assert_eq!(RawExpiration::from_json(serde_json::Value::Null), None);
    assert_eq!(
      RawExpiration::from_json(serde_json::json!("2024-01-10")),
      Some(RawExpiration::from("2024-01-10"))
    );
    let number = RawExpiration::from_json(serde_json::json!(1704844800));
    assert!(matches!(
      normalize(number.as_ref()),
      Expiration::NotAvailable(Unavailable::Malformed { .. })
    ));
  }
}
