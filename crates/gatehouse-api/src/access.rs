//! Handlers for viewer-facing access checks.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/content/:id/access` | `?viewer_id=&role=&zone=`, all optional |
//! | `GET`  | `/content/:id/preview` | Same query; 409 if the viewer has access |
//! | `POST` | `/access` | Body: `{"content_ids":[..],"viewer_id":..,"role":..,"zone":..}` |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use gatehouse_core::{
  access::AccessDecision,
  content::Zone,
  preview::Preview,
  store::{ContentStore, SubscriptionStore},
  subscription::{Role, Viewer},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{ApiState, error::ApiError};

/// Upper bound on ids per batch access check.
pub const MAX_BATCH_CHECK: usize = 100;

#[derive(Debug, Default, Deserialize)]
pub struct ViewerParams {
  pub viewer_id: Option<Uuid>,
  pub role:      Option<Role>,
  pub zone:      Option<Zone>,
}

impl ViewerParams {
  fn viewer(&self) -> Viewer {
    Viewer {
      id:   self.viewer_id,
      role: self.role.unwrap_or_default(),
    }
  }
}

// ─── Single check ────────────────────────────────────────────────────────────

/// `GET /content/:id/access`
pub async fn check_one<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ViewerParams>,
) -> Result<Json<AccessDecision>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  let decision = state
    .checker
    .check(id, params.zone, &params.viewer())
    .await?;
  Ok(Json(decision))
}

// ─── Batch check ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct BatchCheckBody {
  pub content_ids: Vec<Uuid>,
  #[serde(flatten)]
  pub viewer:      ViewerParams,
}

/// One entry of a batch check: either a decision or the reason there is none.
#[derive(Debug, Serialize)]
pub struct BatchCheckEntry {
  pub content_id: Uuid,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub decision:   Option<AccessDecision>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error:      Option<String>,
}

/// `POST /access`
///
/// Entries come back in request order. An unknown id yields an entry with
/// `error` set rather than failing the whole request.
pub async fn check_many<S>(
  State(state): State<ApiState<S>>,
  Json(body): Json<BatchCheckBody>,
) -> Result<Json<Vec<BatchCheckEntry>>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  if body.content_ids.len() > MAX_BATCH_CHECK {
    return Err(ApiError::BadRequest(format!(
      "at most {MAX_BATCH_CHECK} content ids per request"
    )));
  }

  let results = state
    .checker
    .check_many(&body.content_ids, body.viewer.zone, &body.viewer.viewer())
    .await;

  let entries = results
    .into_iter()
    .map(|(content_id, result)| match result {
      Ok(decision) => BatchCheckEntry {
        content_id,
        decision: Some(decision),
        error: None,
      },
      Err(e) => BatchCheckEntry {
        content_id,
        decision: None,
        error: Some(e.to_string()),
      },
    })
    .collect();
  Ok(Json(entries))
}

// ─── Preview ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct PreviewResponse {
  pub decision: AccessDecision,
  pub preview:  Preview,
}

/// `GET /content/:id/preview`
pub async fn preview<S>(
  State(state): State<ApiState<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<ViewerParams>,
) -> Result<Json<PreviewResponse>, ApiError>
where
  S: ContentStore + SubscriptionStore,
{
  let (decision, preview) = state
    .checker
    .preview(id, params.zone, &params.viewer())
    .await?
    .ok_or_else(|| ApiError::Conflict(format!("viewer already has access to {id}")))?;
  Ok(Json(PreviewResponse { decision, preview }))
}
