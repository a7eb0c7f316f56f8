//! The `ContentStore` and `SubscriptionStore` repository traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `gatehouse-store-sqlite`). The evaluator, schedulers and processor depend
//! on these abstractions, not on any concrete database client.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  content::{ContentGateMetadata, ContentItem, ScheduledRelease},
  subscription::Subscription,
};

// ─── Content ─────────────────────────────────────────────────────────────────

/// Read and write access to the gating fields of content items.
///
/// Only the release scheduler and the release processor write through this
/// trait. All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait ContentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Gating facts for one item. Returns `None` if the item does not exist.
  fn get_gate_metadata(
    &self,
    content_id: Uuid,
  ) -> impl Future<Output = Result<Option<ContentGateMetadata>, Self::Error>> + Send + '_;

  /// The full body of an item. Returns `None` if the item does not exist.
  fn get_full_content(
    &self,
    content_id: Uuid,
  ) -> impl Future<Output = Result<Option<String>, Self::Error>> + Send + '_;

  /// Overwrite (or clear, with `None`) an item's release date.
  ///
  /// Returns `false` if the item does not exist. No history is kept.
  fn set_release_date(
    &self,
    content_id: Uuid,
    release_date: Option<DateTime<Utc>>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Non-permanent items whose release date is after `now`, soonest first.
  fn list_scheduled(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ScheduledRelease>, Self::Error>> + Send + '_;

  /// Items eligible for release at `now`, soonest release date first.
  ///
  /// An item is eligible when it is not permanent premium, its release date
  /// is at or before `now`, and it is still gated: either `is_premium`, or a
  /// zone that requires a subscription has a `free_after_date` at or before
  /// `now`.
  fn list_due_for_release(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> impl Future<Output = Result<Vec<ContentItem>, Self::Error>> + Send + '_;

  /// Atomically flip one item to free: clear `is_premium`, clear
  /// `requires_subscription` on zones whose `free_after_date` has passed, and
  /// stamp `released_at`. The release date is retained.
  ///
  /// The write re-checks eligibility, so returns `false` (and changes
  /// nothing) when the item is missing or already released.
  fn apply_release_transition(
    &self,
    content_id: Uuid,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;
}

// ─── Subscriptions ───────────────────────────────────────────────────────────

/// Read-only view of the billing subsystem.
pub trait SubscriptionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// The user's current subscription record, if any.
  ///
  /// Prefers an active or trialing record whose period covers the current
  /// time, then any other active or trialing record, then the one with the
  /// latest period end. Whether it actually grants access is the evaluator's
  /// call.
  fn get_active_subscription(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Subscription>, Self::Error>> + Send + '_;
}
