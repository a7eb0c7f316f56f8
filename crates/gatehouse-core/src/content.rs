//! Content items and the gating facts attached to them.
//!
//! Content bodies are owned by the authoring subsystem. This module only models
//! the fields that decide who may read an item and when it graduates to free.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Zones ───────────────────────────────────────────────────────────────────

/// A named content surface that may override content-level gating.
#[derive(
  Debug,
  Clone,
  Copy,
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
pub enum Zone {
  Read,
  Coach,
  Player,
  Parent,
}

/// Per-zone gating override for one content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ZoneSetting {
  pub zone:                  Zone,
  /// Hidden zones are never served, whatever the viewer's subscription.
  pub visible:               bool,
  pub requires_subscription: bool,
  /// When set and past, the zone no longer requires a subscription.
  pub free_after_date:       Option<DateTime<Utc>>,
}

impl ZoneSetting {
  pub fn new(zone: Zone) -> Self {
    Self {
      zone,
      visible: true,
      requires_subscription: false,
      free_after_date: None,
    }
  }
}

// ─── Gate metadata ───────────────────────────────────────────────────────────

/// The minimal gating facts needed to make an access decision for one item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentGateMetadata {
  pub content_id:           Uuid,
  pub is_premium:           bool,
  /// The moment the item is scheduled to become free.
  pub premium_release_date: Option<DateTime<Utc>>,
  /// Overrides any release date; the item never graduates automatically.
  pub is_permanent_premium: bool,
  /// Set by the release processor when the item was flipped to free.
  pub released_at:          Option<DateTime<Utc>>,
  /// Ordered as authored.
  pub zone_settings:        Vec<ZoneSetting>,
}

impl ContentGateMetadata {
  /// A free, zone-less item.
  pub fn new(content_id: Uuid) -> Self {
    Self {
      content_id,
      is_premium: false,
      premium_release_date: None,
      is_permanent_premium: false,
      released_at: None,
      zone_settings: Vec::new(),
    }
  }

  /// Look up a zone setting regardless of visibility.
  pub fn zone(&self, zone: Zone) -> Option<&ZoneSetting> {
    self.zone_settings.iter().find(|z| z.zone == zone)
  }

  /// Zone settings that may be shown to anyone.
  pub fn visible_zones(&self) -> impl Iterator<Item = &ZoneSetting> {
    self.zone_settings.iter().filter(|z| z.visible)
  }

  /// `true` if the item itself or any of its zones requires a subscription.
  pub fn is_gated(&self) -> bool {
    self.is_premium || self.zone_settings.iter().any(|z| z.requires_subscription)
  }

  pub fn gating_state(&self) -> GatingState {
    if !self.is_gated() {
      GatingState::Free
    } else if self.is_permanent_premium {
      GatingState::GatedPermanent
    } else if self.premium_release_date.is_some() {
      GatingState::GatedScheduled
    } else {
      GatingState::GatedNoSchedule
    }
  }
}

/// Where an item sits in the premium → free lifecycle.
///
/// `Free` is terminal for the automatic path; only an author re-gates content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GatingState {
  GatedScheduled,
  GatedPermanent,
  GatedNoSchedule,
  Free,
}

// ─── Content item ────────────────────────────────────────────────────────────

/// A content item as the store holds it, minus the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentItem {
  pub title: String,
  #[serde(flatten)]
  pub gate:  ContentGateMetadata,
}

impl ContentItem {
  pub fn content_id(&self) -> Uuid { self.gate.content_id }

  pub fn gate_metadata(&self) -> &ContentGateMetadata { &self.gate }
}

// ─── Scheduled releases ──────────────────────────────────────────────────────

/// A derived view over a content item's release date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRelease {
  pub content_id:    Uuid,
  pub scheduled_for: DateTime<Utc>,
  pub released:      bool,
  pub released_at:   Option<DateTime<Utc>>,
}
