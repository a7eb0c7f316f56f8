//! Subscriptions and viewers.
//!
//! Subscriptions are owned by the billing subsystem; this crate only reads them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Subscription ────────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SubscriptionStatus {
  Active,
  Canceled,
  PastDue,
  Trialing,
  Incomplete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
  pub subscription_id:      Uuid,
  pub user_id:              Uuid,
  pub plan_id:              String,
  pub status:               SubscriptionStatus,
  pub current_period_start: DateTime<Utc>,
  pub current_period_end:   DateTime<Utc>,
  pub cancel_at_period_end: bool,
}

impl Subscription {
  /// `true` while the status is active or trialing and `now` lies inside the
  /// current billing period (both ends inclusive).
  pub fn grants_access_at(&self, now: DateTime<Utc>) -> bool {
    matches!(
      self.status,
      SubscriptionStatus::Active | SubscriptionStatus::Trialing
    ) && self.current_period_start <= now
      && now <= self.current_period_end
  }

  pub fn is_trial(&self) -> bool { self.status == SubscriptionStatus::Trialing }
}

// ─── Viewer ──────────────────────────────────────────────────────────────────

/// The role a caller presents. Roles never grant access on their own unless
/// listed in [`AccessConfig::role_bypass`](crate::access::AccessConfig).
#[derive(
  Debug,
  Clone,
  Copy,
  Default,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
  #[default]
  Free,
  Subscriber,
  Player,
  Parent,
  Coach,
  Admin,
}

/// Whoever is asking to read content. Anonymous viewers have no id.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewer {
  pub id:   Option<Uuid>,
  #[serde(default)]
  pub role: Role,
}

impl Viewer {
  pub fn anonymous() -> Self { Self::default() }

  pub fn user(id: Uuid, role: Role) -> Self { Self { id: Some(id), role } }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;

  fn subscription(status: SubscriptionStatus) -> Subscription {
    let now = Utc::now();
    Subscription {
      subscription_id:      Uuid::new_v4(),
      user_id:              Uuid::new_v4(),
      plan_id:              "monthly".into(),
      status,
      current_period_start: now - Duration::days(10),
      current_period_end:   now + Duration::days(20),
      cancel_at_period_end: false,
    }
  }

  #[test]
  fn active_and_trialing_grant_access() {
    let now = Utc::now();
    assert!(subscription(SubscriptionStatus::Active).grants_access_at(now));
    assert!(subscription(SubscriptionStatus::Trialing).grants_access_at(now));
  }

  #[test]
  fn other_statuses_do_not() {
    let now = Utc::now();
    for status in [
      SubscriptionStatus::Canceled,
      SubscriptionStatus::PastDue,
      SubscriptionStatus::Incomplete,
    ] {
      assert!(!subscription(status).grants_access_at(now), "{status}");
    }
  }

  #[test]
  fn period_bounds_are_inclusive() {
    let sub = subscription(SubscriptionStatus::Active);
    assert!(sub.grants_access_at(sub.current_period_start));
    assert!(sub.grants_access_at(sub.current_period_end));
    assert!(!sub.grants_access_at(sub.current_period_end + Duration::seconds(1)));
    assert!(!sub.grants_access_at(sub.current_period_start - Duration::seconds(1)));
  }

  #[test]
  fn cancel_at_period_end_still_grants_until_end() {
    let mut sub = subscription(SubscriptionStatus::Active);
    sub.cancel_at_period_end = true;
    assert!(sub.grants_access_at(Utc::now()));
  }

  #[test]
  fn status_round_trips_through_strings() {
    assert_eq!(SubscriptionStatus::PastDue.as_ref(), "past_due");
    assert_eq!(
      "trialing".parse::<SubscriptionStatus>().unwrap(),
      SubscriptionStatus::Trialing
    );
  }

  #[test]
  fn anonymous_viewer_is_free() {
    let viewer = Viewer::anonymous();
    assert!(viewer.id.is_none());
    assert_eq!(viewer.role, Role::Free);
  }
}
