//! Handlers for the release schedule.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/content/:id/release` | Body: `{"release_date":"2030-01-01"}` |
//! | `DELETE` | `/content/:id/release` | 204 on success |
//! | `POST`   | `/releases/batch` | Body: `{"content_ids":[..],"release_date":".."}` |
//! | `POST`   | `/releases/process` | Body optional: `{"limit":50}` |
//! | `GET`    | `/releases/pending` | Optional `?limit=` (clamped, negatives too) |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use chrono::Utc;
use gatehouse_core::{
  content::ScheduledRelease,
  processor::ReleaseReport,
  schedule::BatchOutcome,
  store::{ContentStore, SubscriptionStore},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

const DEFAULT_PENDING_LIMIT: usize = 50;

// ─── Schedule ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ScheduleBody {
  pub release_date: String,
}

/// `POST /content/:id/release`
pub async fn schedule<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Json(body): Json<ScheduleBody>,
) -> Result<Json<ScheduledRelease>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  let scheduled = state.scheduler.schedule(id, &body.release_date).await?;
  Ok(Json(scheduled))
}

/// `DELETE /content/:id/release`
pub async fn unschedule<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  state.scheduler.unschedule(id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Batch ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BatchBody {
  pub content_ids:  Vec<Uuid>,
  pub release_date: String,
}

/// `POST /releases/batch`
pub async fn schedule_batch<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<BatchBody>,
) -> Result<Json<BatchOutcome>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  let outcome = state
    .scheduler
    .schedule_batch(&body.content_ids, &body.release_date)
    .await?;
  Ok(Json(outcome))
}

// ─── Process ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ProcessBody {
  #[serde(default)]
  pub limit: Option<usize>,
}

/// `POST /releases/process`
///
/// A bare POST with no body (e.g. from cron) processes up to the maximum.
pub async fn process<S>(
  State(state): State<ApiState<S>>,
  body: Option<Json<ProcessBody>>,
) -> Result<Json<ReleaseReport>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  let limit = body.and_then(|Json(b)| b.limit);
  let report = state.processor.process_due(Utc::now(), limit).await?;
  Ok(Json(report))
}

// ─── Pending ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct PendingParams {
  pub limit: Option<i64>,
}

/// `GET /releases/pending[?limit=<n>]`
pub async fn pending<S>(
  State(state): State<ApiState<S>>,
  Query(params): Query<PendingParams>,
) -> Result<Json<Vec<ScheduledRelease>>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  // Out-of-range values are clamped by the scheduler, not rejected.
  let limit = params
    .limit
    .map_or(DEFAULT_PENDING_LIMIT, |l| usize::try_from(l).unwrap_or(0));
  let pending = state.scheduler.list_pending(limit).await?;
  Ok(Json(pending))
}
