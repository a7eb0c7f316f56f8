//! The periodic job that graduates due premium content to free.
//!
//! Invoked by an external trigger (cron, operator, HTTP call); nothing here
//! schedules itself. Runs may overlap: the store re-checks eligibility inside
//! each item's write, so an item is flipped, and counted, once.

use std::{
  collections::HashSet,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  schedule::ReleaseConfig,
  store::ContentStore,
};

/// One item that could not be released on this run. It stays gated and is
/// retried on the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseFailure {
  pub content_id: Uuid,
  pub message:    String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseReport {
  pub released_count: usize,
  pub errors:         Vec<ReleaseFailure>,
}

pub struct ReleaseProcessor<S> {
  store:    Arc<S>,
  config:   ReleaseConfig,
  /// Ids whose transition failed on the previous run. They are retried only
  /// after fresh due items so they cannot fill every batch.
  deferred: Mutex<HashSet<Uuid>>,
}

impl<S: ContentStore> ReleaseProcessor<S> {
  pub fn new(store: Arc<S>, config: ReleaseConfig) -> Self {
    Self { store, config, deferred: Mutex::new(HashSet::new()) }
  }

  /// Release every item due at `now`, up to `limit` items (clamped into
  /// `1..=max_process`; `None` means the maximum).
  ///
  /// Only a failure to list due items is returned as `Err`. Per-item failures
  /// land in [`ReleaseReport::errors`]. Items beyond the limit are picked up
  /// by the next run. Items that failed on the previous run go to the back of
  /// the batch.
  pub async fn process_due(
    &self,
    now: DateTime<Utc>,
    limit: Option<usize>,
  ) -> Result<ReleaseReport> {
    let max = self.config.max_process.max(1);
    let limit = limit.unwrap_or(max).clamp(1, max);

    let deferred = self
      .deferred
      .lock()
      .unwrap_or_else(PoisonError::into_inner)
      .clone();

    // Over-fetch by the deferred count so `limit` fresh items always fit.
    let fetched = self
      .store
      .list_due_for_release(now, limit + deferred.len())
      .await
      .map_err(Error::store)?;

    let (retries, fresh): (Vec<_>, Vec<_>) = fetched
      .into_iter()
      .partition(|item| deferred.contains(&item.content_id()));
    let due: Vec<_> = fresh.into_iter().chain(retries).take(limit).collect();

    let mut report = ReleaseReport::default();
    for item in &due {
      let content_id = item.content_id();
      match self.store.apply_release_transition(content_id, now).await {
        Ok(true) => {
          debug!(%content_id, title = %item.title, "content released");
          report.released_count += 1;
        }
        // Another run got there first.
        Ok(false) => debug!(%content_id, "content already released"),
        Err(e) => {
          warn!(%content_id, error = %e, "release transition failed");
          report.errors.push(ReleaseFailure {
            content_id,
            message: e.to_string(),
          });
        }
      }
    }

    *self.deferred.lock().unwrap_or_else(PoisonError::into_inner) =
      report.errors.iter().map(|f| f.content_id).collect();

    info!(
      due = due.len(),
      released = report.released_count,
      failed = report.errors.len(),
      "release run finished"
    );
    Ok(report)
  }
}

#[cfg(test)]
mod tests {
  use chrono::Duration;

  use super::*;
  use crate::content::{ContentGateMetadata, ContentItem, ScheduledRelease};

  #[derive(Debug, thiserror::Error)]
  #[error("disk on fire")]
  struct Fire;

  /// Holds items in memory; transitions for `poisoned` ids always fail.
  struct FakeStore {
    items:    Mutex<Vec<ContentItem>>,
    poisoned: HashSet<Uuid>,
  }

  impl FakeStore {
    fn is_due(item: &ContentItem, now: DateTime<Utc>) -> bool {
      let gate = &item.gate;
      !gate.is_permanent_premium
        && gate.premium_release_date.is_some_and(|d| d <= now)
        && gate.is_premium
    }
  }

  impl ContentStore for FakeStore {
    type Error = Fire;
    async fn get_gate_metadata(&self, _: Uuid) -> Result<Option<ContentGateMetadata>, Fire> { unimplemented!() }
    async fn get_full_content(&self, _: Uuid) -> Result<Option<String>, Fire> { unimplemented!() }
    async fn set_release_date(&self, _: Uuid, _: Option<DateTime<Utc>>) -> Result<bool, Fire> { unimplemented!() }
    async fn list_scheduled(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<ScheduledRelease>, Fire> { unimplemented!() }

    async fn list_due_for_release(
      &self,
      now: DateTime<Utc>,
      limit: usize,
    ) -> Result<Vec<ContentItem>, Fire> {
      let items = self.items.lock().unwrap();
      Ok(items.iter().filter(|i| Self::is_due(i, now)).take(limit).cloned().collect())
    }

    async fn apply_release_transition(
      &self,
      content_id: Uuid,
      now: DateTime<Utc>,
    ) -> Result<bool, Fire> {
      if self.poisoned.contains(&content_id) {
        return Err(Fire);
      }
      let mut items = self.items.lock().unwrap();
      let Some(item) = items.iter_mut().find(|i| i.content_id() == content_id) else {
        return Ok(false);
      };
      if !Self::is_due(item, now) {
        return Ok(false);
      }
      item.gate.is_premium = false;
      item.gate.released_at = Some(now);
      Ok(true)
    }
  }

  fn due_item(now: DateTime<Utc>) -> ContentItem {
    ContentItem {
      title: "Drills".into(),
      gate:  ContentGateMetadata {
        is_premium: true,
        premium_release_date: Some(now - Duration::days(1)),
        ..ContentGateMetadata::new(Uuid::new_v4())
      },
    }
  }

  fn processor(items: Vec<ContentItem>, poisoned: &[Uuid]) -> ReleaseProcessor<FakeStore> {
    ReleaseProcessor::new(
      Arc::new(FakeStore {
        items:    Mutex::new(items),
        poisoned: poisoned.iter().copied().collect(),
      }),
      ReleaseConfig { max_process: 10, ..ReleaseConfig::default() },
    )
  }

  #[tokio::test]
  async fn one_failure_does_not_block_the_rest() {
    let now = Utc::now();
    let items: Vec<ContentItem> = (0..3).map(|_| due_item(now)).collect();
    let bad = items[1].content_id();
    let p = processor(items, &[bad]);

    let report = p.process_due(now, None).await.unwrap();
    assert_eq!(report.released_count, 2);
    assert_eq!(report.errors.len(), 1);
    assert_eq!(report.errors[0].content_id, bad);
    assert_eq!(report.errors[0].message, "disk on fire");
  }

  #[tokio::test]
  async fn second_run_releases_nothing() {
    let now = Utc::now();
    let p = processor(vec![due_item(now), due_item(now)], &[]);

    assert_eq!(p.process_due(now, None).await.unwrap().released_count, 2);
    let again = p.process_due(now, None).await.unwrap();
    assert_eq!(again.released_count, 0);
    assert!(again.errors.is_empty());
  }

  #[tokio::test]
  async fn limit_bounds_work_per_run() {
    let now = Utc::now();
    let p = processor((0..5).map(|_| due_item(now)).collect(), &[]);

    assert_eq!(p.process_due(now, Some(2)).await.unwrap().released_count, 2);
    assert_eq!(p.process_due(now, Some(2)).await.unwrap().released_count, 2);
    assert_eq!(p.process_due(now, Some(2)).await.unwrap().released_count, 1);
  }

  #[tokio::test]
  async fn zero_limit_is_clamped_to_one() {
    let now = Utc::now();
    let p = processor(vec![due_item(now), due_item(now)], &[]);
    assert_eq!(p.process_due(now, Some(0)).await.unwrap().released_count, 1);
  }

  #[tokio::test]
  async fn failing_items_do_not_starve_later_ones() {
    let now = Utc::now();
    let mut items: Vec<ContentItem> = (0..4).map(|_| due_item(now)).collect();
    // The failing pair is due soonest, so it heads a soonest-first listing.
    items[0].gate.premium_release_date = Some(now - Duration::days(3));
    items[1].gate.premium_release_date = Some(now - Duration::days(2));
    let bad = [items[0].content_id(), items[1].content_id()];
    let p = processor(items, &bad);

    let first = p.process_due(now, Some(2)).await.unwrap();
    assert_eq!(first.released_count, 0);
    assert_eq!(first.errors.len(), 2);

    let second = p.process_due(now, Some(2)).await.unwrap();
    assert_eq!(second.released_count, 2);
    assert!(second.errors.is_empty());

    // Nothing fresh is left, so the failing pair is retried.
    let third = p.process_due(now, Some(2)).await.unwrap();
    assert_eq!(third.released_count, 0);
    assert_eq!(third.errors.len(), 2);
  }
}
