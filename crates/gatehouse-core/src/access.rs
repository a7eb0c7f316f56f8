//! The access evaluator: a pure decision over gate metadata, a viewer, the
//! viewer's subscription and the current time.
//!
//! Rules are applied in a fixed order and the first match wins:
//!
//! 0. A requested zone that is missing or hidden is never served.
//! 1. Nothing gated → [`AccessReason::FreeContent`].
//! 2. Permanent premium items skip every release date.
//! 3. Every gate carries a release date and the latest one has passed →
//!    [`AccessReason::FreeContent`].
//! 4. The viewer's role is listed in [`AccessConfig::role_bypass`] →
//!    [`AccessReason::RoleBypass`].
//! 5. An active or trialing subscription covering `now` →
//!    [`AccessReason::Subscription`] or [`AccessReason::Trial`].
//! 6. Otherwise denied, with the release date echoed when there is one.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  content::{ContentGateMetadata, Zone},
  subscription::{Role, Subscription, Viewer},
};

const MILLIS_PER_DAY: i64 = 86_400_000;

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessConfig {
  /// Roles that pass every gate without a subscription. Empty by default.
  #[serde(default)]
  pub role_bypass: HashSet<Role>,
}

// ─── Decision ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccessReason {
  FreeContent,
  Subscription,
  /// Denied for now, but the item graduates to free on `release_date`.
  PremiumUntil,
  Trial,
  RoleBypass,
  None,
}

/// Computed fresh on every check and never stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessDecision {
  pub has_access:       bool,
  pub reason:           AccessReason,
  pub requires_upgrade: bool,
  pub release_date:     Option<DateTime<Utc>>,
  pub trial_days_left:  Option<i64>,
}

impl AccessDecision {
  fn granted(reason: AccessReason) -> Self {
    Self {
      has_access: true,
      reason,
      requires_upgrade: false,
      release_date: None,
      trial_days_left: None,
    }
  }

  fn denied(release_date: Option<DateTime<Utc>>) -> Self {
    Self {
      has_access: false,
      reason: if release_date.is_some() {
        AccessReason::PremiumUntil
      } else {
        AccessReason::None
      },
      requires_upgrade: true,
      release_date,
      trial_days_left: None,
    }
  }

  /// The zone does not exist for this item or is hidden; a subscription
  /// would not change that.
  fn hidden() -> Self {
    Self {
      has_access: false,
      reason: AccessReason::None,
      requires_upgrade: false,
      release_date: None,
      trial_days_left: None,
    }
  }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

/// Decide whether `viewer` may read the item described by `meta`.
///
/// `subscription` is whatever the subscription store returned for the viewer;
/// `None` is a valid "no subscription" state.
///
/// Dates release an item only when every active gate carries one, and then
/// the latest applies. A zone's `free_after_date` alone never frees a premium
/// item that has no `premium_release_date` of its own.
pub fn evaluate(
  meta: &ContentGateMetadata,
  zone: Option<Zone>,
  viewer: &Viewer,
  subscription: Option<&Subscription>,
  now: DateTime<Utc>,
  config: &AccessConfig,
) -> AccessDecision {
  let zone_setting = match zone {
    Some(zone) => match meta.zone(zone).filter(|s| s.visible) {
      Some(setting) => Some(setting),
      None => return AccessDecision::hidden(),
    },
    None => None,
  };

  // Each active gate, paired with the date that lifts it.
  let mut gates: Vec<Option<DateTime<Utc>>> = Vec::with_capacity(2);
  if meta.is_premium {
    gates.push(meta.premium_release_date);
  }
  if let Some(setting) = zone_setting
    && setting.requires_subscription
  {
    gates.push(setting.free_after_date);
  }

  if gates.is_empty() {
    return AccessDecision::granted(AccessReason::FreeContent);
  }

  let release_date = if meta.is_permanent_premium {
    None
  } else {
    gates
      .into_iter()
      .collect::<Option<Vec<_>>>()
      .and_then(|dates| dates.into_iter().max())
  };

  if let Some(date) = release_date
    && now >= date
  {
    return AccessDecision {
      release_date: Some(date),
      ..AccessDecision::granted(AccessReason::FreeContent)
    };
  }

  if config.role_bypass.contains(&viewer.role) {
    return AccessDecision::granted(AccessReason::RoleBypass);
  }

  if let Some(sub) = subscription
    && sub.grants_access_at(now)
  {
    return if sub.is_trial() {
      AccessDecision {
        trial_days_left: Some(days_left(sub.current_period_end, now)),
        ..AccessDecision::granted(AccessReason::Trial)
      }
    } else {
      AccessDecision::granted(AccessReason::Subscription)
    };
  }

  AccessDecision::denied(release_date)
}

/// Whole days until `end`, rounded up; zero once `end` has passed.
fn days_left(end: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
  let millis = (end - now).num_milliseconds();
  if millis <= 0 {
    0
  } else {
    (millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
  }
}
