//! Release scheduling: set, clear, and list future premium → free transitions.
//!
//! Scheduling only records a date. The flip itself is done later by
//! [`ReleaseProcessor`](crate::processor::ReleaseProcessor).

use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  content::ScheduledRelease,
  store::ContentStore,
};

// ─── Configuration ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReleaseConfig {
  /// Upper bound for [`ReleaseScheduler::list_pending`].
  #[serde(default = "default_max_pending")]
  pub max_pending: usize,
  /// Largest accepted id list for [`ReleaseScheduler::schedule_batch`].
  #[serde(default = "default_max_batch")]
  pub max_batch:   usize,
  /// Upper bound on items flipped per processor run.
  #[serde(default = "default_max_process")]
  pub max_process: usize,
}

fn default_max_pending() -> usize { 100 }

fn default_max_batch() -> usize { 100 }

fn default_max_process() -> usize { 500 }

impl Default for ReleaseConfig {
  fn default() -> Self {
    Self {
      max_pending: default_max_pending(),
      max_batch:   default_max_batch(),
      max_process: default_max_process(),
    }
  }
}

// ─── Date validation ─────────────────────────────────────────────────────────

/// Parse an RFC 3339 timestamp or a bare `YYYY-MM-DD` date (midnight UTC).
pub fn parse_release_date(raw: &str) -> Result<DateTime<Utc>> {
  let raw = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
    return Ok(dt.with_timezone(&Utc));
  }
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .and_then(|d| d.and_hms_opt(0, 0, 0))
    .map(|dt| dt.and_utc())
    .ok_or_else(|| Error::InvalidReleaseDate(format!("cannot parse {raw:?}")))
}

/// Reject dates that are not strictly after `now`.
pub fn ensure_future(release_date: DateTime<Utc>, now: DateTime<Utc>) -> Result<()> {
  if release_date <= now {
    return Err(Error::InvalidReleaseDate(format!(
      "{} is not in the future",
      release_date.to_rfc3339()
    )));
  }
  Ok(())
}

// ─── Batch outcome ───────────────────────────────────────────────────────────

/// Result of a best-effort batch: how many ids were scheduled, and which were
/// not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchOutcome {
  pub success_count: usize,
  pub failed:        Vec<Uuid>,
}

// ─── Scheduler ───────────────────────────────────────────────────────────────

pub struct ReleaseScheduler<S> {
  store:  Arc<S>,
  config: ReleaseConfig,
}

impl<S: ContentStore> ReleaseScheduler<S> {
  pub fn new(store: Arc<S>, config: ReleaseConfig) -> Self { Self { store, config } }

  /// Parse `release_date` and schedule `content_id` for it.
  pub async fn schedule(
    &self,
    content_id: Uuid,
    release_date: &str,
  ) -> Result<ScheduledRelease> {
    let release_date = parse_release_date(release_date)?;
    self.schedule_at(content_id, release_date).await
  }

  /// Schedule `content_id` to become free at `release_date`, overwriting any
  /// earlier date.
  ///
  /// Permanent-premium items accept the date but it has no effect until the
  /// flag is cleared.
  pub async fn schedule_at(
    &self,
    content_id: Uuid,
    release_date: DateTime<Utc>,
  ) -> Result<ScheduledRelease> {
    ensure_future(release_date, Utc::now())?;
    self.write(content_id, release_date).await
  }

  /// Clear the release date, leaving the item gated with no schedule.
  pub async fn unschedule(&self, content_id: Uuid) -> Result<()> {
    let found = self
      .store
      .set_release_date(content_id, None)
      .await
      .map_err(Error::store)?;
    if !found {
      return Err(Error::NotFound(content_id));
    }
    info!(%content_id, "release unscheduled");
    Ok(())
  }

  /// Pending releases, soonest first. `limit` is clamped into
  /// `1..=max_pending`.
  pub async fn list_pending(&self, limit: usize) -> Result<Vec<ScheduledRelease>> {
    let limit = limit.clamp(1, self.config.max_pending.max(1));
    self
      .store
      .list_scheduled(Utc::now(), limit)
      .await
      .map_err(Error::store)
  }

  /// Schedule every id in `content_ids` for the same date.
  ///
  /// The date and the id list are validated once; after that each id is
  /// scheduled independently and failures are collected rather than aborting
  /// the batch. Duplicate ids are scheduled once.
  pub async fn schedule_batch(
    &self,
    content_ids: &[Uuid],
    release_date: &str,
  ) -> Result<BatchOutcome> {
    let release_date = parse_release_date(release_date)?;
    ensure_future(release_date, Utc::now())?;

    let mut seen = HashSet::with_capacity(content_ids.len());
    let ids: Vec<Uuid> =
      content_ids.iter().copied().filter(|id| seen.insert(*id)).collect();

    if ids.is_empty() {
      return Err(Error::Validation("content_ids must not be empty".into()));
    }
    if ids.len() > self.config.max_batch {
      return Err(Error::Validation(format!(
        "batch of {} exceeds the maximum of {}",
        ids.len(),
        self.config.max_batch
      )));
    }

    let mut outcome = BatchOutcome::default();
    for content_id in ids {
      match self.write(content_id, release_date).await {
        Ok(_) => outcome.success_count += 1,
        Err(e) => {
          warn!(%content_id, error = %e, "batch schedule failed for item");
          outcome.failed.push(content_id);
        }
      }
    }

    info!(
      succeeded = outcome.success_count,
      failed = outcome.failed.len(),
      %release_date,
      "batch schedule finished"
    );
    Ok(outcome)
  }

  async fn write(
    &self,
    content_id: Uuid,
    release_date: DateTime<Utc>,
  ) -> Result<ScheduledRelease> {
    let meta = self
      .store
      .get_gate_metadata(content_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(content_id))?;

    if meta.is_permanent_premium {
      warn!(
        %content_id,
        "scheduled a permanent-premium item; the date is ignored until the flag is cleared"
      );
    }

    // The item may have been deleted between the read and the write.
    let found = self
      .store
      .set_release_date(content_id, Some(release_date))
      .await
      .map_err(Error::store)?;
    if !found {
      return Err(Error::NotFound(content_id));
    }

    info!(%content_id, %release_date, "release scheduled");
    Ok(ScheduledRelease {
      content_id,
      scheduled_for: release_date,
      released: false,
      released_at: None,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::{Duration, TimeZone};

  use super::*;
  use crate::content::{ContentGateMetadata, ContentItem};

  // A store that must never be reached: validation fails first.
  struct UnreachableStore;

  impl ContentStore for UnreachableStore {
    type Error = std::convert::Infallible;
    async fn get_gate_metadata(&self, _: Uuid) -> Result<Option<ContentGateMetadata>, Self::Error> { unreachable!() }
    async fn get_full_content(&self, _: Uuid) -> Result<Option<String>, Self::Error> { unreachable!() }
    async fn set_release_date(&self, _: Uuid, _: Option<DateTime<Utc>>) -> Result<bool, Self::Error> { unreachable!() }
    async fn list_scheduled(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<ScheduledRelease>, Self::Error> { unreachable!() }
    async fn list_due_for_release(&self, _: DateTime<Utc>, _: usize) -> Result<Vec<ContentItem>, Self::Error> { unreachable!() }
    async fn apply_release_transition(&self, _: Uuid, _: DateTime<Utc>) -> Result<bool, Self::Error> { unreachable!() }
  }

  fn scheduler() -> ReleaseScheduler<UnreachableStore> {
    ReleaseScheduler::new(
      Arc::new(UnreachableStore),
      ReleaseConfig { max_batch: 3, ..ReleaseConfig::default() },
    )
  }

  fn tomorrow() -> String { (Utc::now() + Duration::days(1)).to_rfc3339() }

  #[test]
  fn parses_rfc3339_with_offset() {
    let dt = parse_release_date("2030-06-01T12:00:00+02:00").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2030, 6, 1, 10, 0, 0).unwrap());
  }

  #[test]
  fn parses_bare_date_as_midnight_utc() {
    let dt = parse_release_date(" 2030-06-01 ").unwrap();
    assert_eq!(dt, Utc.with_ymd_and_hms(2030, 6, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn rejects_garbage() {
    for raw in ["", "tomorrow", "2030-13-01", "01/06/2030"] {
      assert!(
        matches!(parse_release_date(raw), Err(Error::InvalidReleaseDate(_))),
        "{raw:?}"
      );
    }
  }

  #[test]
  fn rejects_past_and_present() {
    let now = Utc::now();
    assert!(ensure_future(now - Duration::seconds(1), now).is_err());
    assert!(ensure_future(now, now).is_err());
    assert!(ensure_future(now + Duration::seconds(1), now).is_ok());
  }

  #[tokio::test]
  async fn schedule_rejects_past_date_before_touching_store() {
    let err = scheduler()
      .schedule(Uuid::new_v4(), "2001-01-01")
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidReleaseDate(_)));
  }

  #[tokio::test]
  async fn schedule_rejects_unparseable_date() {
    let err = scheduler()
      .schedule(Uuid::new_v4(), "next tuesday")
      .await
      .unwrap_err();
    assert!(matches!(err, Error::InvalidReleaseDate(_)));
  }

  #[tokio::test]
  async fn empty_batch_is_a_validation_error() {
    let err = scheduler().schedule_batch(&[], &tomorrow()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn oversized_batch_is_a_validation_error() {
    let ids: Vec<Uuid> = (0..4).map(|_| Uuid::new_v4()).collect();
    let err = scheduler().schedule_batch(&ids, &tomorrow()).await.unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
  }

  #[tokio::test]
  async fn batch_date_is_validated_once_up_front() {
    let ids = [Uuid::new_v4()];
    let err = scheduler().schedule_batch(&ids, "2001-01-01").await.unwrap_err();
    assert!(matches!(err, Error::InvalidReleaseDate(_)));
  }
}
