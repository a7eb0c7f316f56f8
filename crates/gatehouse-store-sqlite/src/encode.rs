//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 UTC strings with a fixed nine-digit
//! fraction and a `Z` suffix, so SQL string comparison matches time order.
//! Enums are stored as their lowercase / snake_case names. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use gatehouse_core::{
  content::{ContentGateMetadata, ContentItem, ScheduledRelease, Zone, ZoneSetting},
  subscription::{Subscription, SubscriptionStatus},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc>
// ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

fn decode_opt_dt(s: Option<&str>) -> Result<Option<DateTime<Utc>>> {
  s.map(decode_dt).transpose()
}

// ─── Zone
// ─────────────────────────────────────────────────────────────────────

pub fn encode_zone(z: Zone) -> &'static str {
  match z {
    Zone::Read => "read",
    Zone::Coach => "coach",
    Zone::Player => "player",
    Zone::Parent => "parent",
  }
}

pub fn decode_zone(s: &str) -> Result<Zone> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "zone",
    value:  s.to_owned(),
  })
}

// ─── SubscriptionStatus
// ───────────────────────────────────────────────────────

pub fn encode_status(s: SubscriptionStatus) -> &'static str {
  match s {
    SubscriptionStatus::Active => "active",
    SubscriptionStatus::Canceled => "canceled",
    SubscriptionStatus::PastDue => "past_due",
    SubscriptionStatus::Trialing => "trialing",
    SubscriptionStatus::Incomplete => "incomplete",
  }
}

pub fn decode_status(s: &str) -> Result<SubscriptionStatus> {
  s.parse().map_err(|_| Error::UnknownValue {
    column: "status",
    value:  s.to_owned(),
  })
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw values read directly from a `content_items` row.
pub struct RawContent {
  pub content_id:           String,
  pub title:                String,
  pub is_premium:           bool,
  pub premium_release_date: Option<String>,
  pub is_permanent_premium: bool,
  pub released_at:          Option<String>,
}

impl RawContent {
  pub const COLUMNS: &'static str = "content_id, title, is_premium, \
     premium_release_date, is_permanent_premium, released_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      content_id:           row.get(0)?,
      title:                row.get(1)?,
      is_premium:           row.get(2)?,
      premium_release_date: row.get(3)?,
      is_permanent_premium: row.get(4)?,
      released_at:          row.get(5)?,
    })
  }

  pub fn into_item(self, zones: Vec<RawZone>) -> Result<ContentItem> {
    let gate = ContentGateMetadata {
      content_id:           decode_uuid(&self.content_id)?,
      is_premium:           self.is_premium,
      premium_release_date: decode_opt_dt(self.premium_release_date.as_deref())?,
      is_permanent_premium: self.is_permanent_premium,
      released_at:          decode_opt_dt(self.released_at.as_deref())?,
      zone_settings:        zones
        .into_iter()
        .map(RawZone::into_setting)
        .collect::<Result<_>>()?,
    };
    Ok(ContentItem { title: self.title, gate })
  }
}

/// Raw values read directly from a `zone_settings` row.
pub struct RawZone {
  pub zone:                  String,
  pub visible:               bool,
  pub requires_subscription: bool,
  pub free_after_date:       Option<String>,
}

impl RawZone {
  pub fn into_setting(self) -> Result<ZoneSetting> {
    Ok(ZoneSetting {
      zone:                  decode_zone(&self.zone)?,
      visible:               self.visible,
      requires_subscription: self.requires_subscription,
      free_after_date:       decode_opt_dt(self.free_after_date.as_deref())?,
    })
  }
}

/// Raw values for the scheduled-release view.
pub struct RawScheduled {
  pub content_id:    String,
  pub scheduled_for: String,
  pub released_at:   Option<String>,
}

impl RawScheduled {
  pub fn into_release(self) -> Result<ScheduledRelease> {
    let released_at = decode_opt_dt(self.released_at.as_deref())?;
    Ok(ScheduledRelease {
      content_id: decode_uuid(&self.content_id)?,
      scheduled_for: decode_dt(&self.scheduled_for)?,
      released: released_at.is_some(),
      released_at,
    })
  }
}

/// Raw values read directly from a `subscriptions` row.
pub struct RawSubscription {
  pub subscription_id:      String,
  pub user_id:              String,
  pub plan_id:              String,
  pub status:               String,
  pub current_period_start: String,
  pub current_period_end:   String,
  pub cancel_at_period_end: bool,
}

impl RawSubscription {
  pub fn into_subscription(self) -> Result<Subscription> {
    Ok(Subscription {
      subscription_id:      decode_uuid(&self.subscription_id)?,
      user_id:              decode_uuid(&self.user_id)?,
      plan_id:              self.plan_id,
      status:               decode_status(&self.status)?,
      current_period_start: decode_dt(&self.current_period_start)?,
      current_period_end:   decode_dt(&self.current_period_end)?,
      cancel_at_period_end: self.cancel_at_period_end,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;

  #[test]
  fn encoded_timestamps_sort_chronologically() {
    let base = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
    let later = [
      base + Duration::nanoseconds(1),
      base + Duration::milliseconds(500),
      base + Duration::seconds(1),
      base + Duration::days(400),
    ];
    let mut prev = encode_dt(base);
    for dt in later {
      let next = encode_dt(dt);
      assert!(prev < next, "{prev} !< {next}");
      prev = next;
    }
  }

  #[test]
  fn timestamps_round_trip_exactly() {
    let now = Utc::now();
    assert_eq!(decode_dt(&encode_dt(now)).unwrap(), now);
  }

  #[test]
  fn enum_encodings_match_strum_names() {
    for z in [Zone::Read, Zone::Coach, Zone::Player, Zone::Parent] {
      assert_eq!(decode_zone(encode_zone(z)).unwrap(), z);
    }
    for s in [
      SubscriptionStatus::Active,
      SubscriptionStatus::Canceled,
      SubscriptionStatus::PastDue,
      SubscriptionStatus::Trialing,
      SubscriptionStatus::Incomplete,
    ] {
      assert_eq!(decode_status(encode_status(s)).unwrap(), s);
    }
  }

  #[test]
  fn unknown_zone_is_reported() {
    assert!(matches!(
      decode_zone("bench"),
      Err(Error::UnknownValue { column: "zone", .. })
    ));
  }
}
