//! JSON REST API for Gatehouse.
//!
//! Exposes two axum [`Router`]s backed by any store implementing both
//! [`ContentStore`] and [`SubscriptionStore`]:
//!
//! - [`public_router`]: viewer-facing access checks and previews.
//! - [`admin_router`]: release scheduling and processing. Callers must put
//!   their own authentication in front of it.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let state = ApiState::new(store, access, preview, releases);
//! Router::new().nest(
//!   "/api",
//!   public_router(state.clone()).merge(admin_router(state).layer(auth)),
//! )
//! ```

pub mod access;
pub mod error;
pub mod releases;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use gatehouse_core::{
  access::AccessConfig,
  checker::AccessChecker,
  preview::PreviewConfig,
  processor::ReleaseProcessor,
  schedule::{ReleaseConfig, ReleaseScheduler},
  store::{ContentStore, SubscriptionStore},
};

pub use error::ApiError;

/// The services every handler draws on, each built once over the same store.
pub struct ApiState<S> {
  pub checker:   Arc<AccessChecker<S, S>>,
  pub scheduler: Arc<ReleaseScheduler<S>>,
  pub processor: Arc<ReleaseProcessor<S>>,
}

// Manual impl: deriving would require `S: Clone`.
impl<S> Clone for ApiState<S> {
  fn clone(&self) -> Self {
    Self {
      checker:   self.checker.clone(),
      scheduler: self.scheduler.clone(),
      processor: self.processor.clone(),
    }
  }
}

impl<S> ApiState<S>
where
  S: ContentStore + SubscriptionStore,
{
  pub fn new(
    store: Arc<S>,
    access: AccessConfig,
    preview: PreviewConfig,
    releases: ReleaseConfig,
  ) -> Self {
    Self {
      checker:   Arc::new(AccessChecker::new(store.clone(), store.clone(), access, preview)),
      scheduler: Arc::new(ReleaseScheduler::new(store.clone(), releases.clone())),
      processor: Arc::new(ReleaseProcessor::new(store, releases)),
    }
  }
}

/// Viewer-facing routes. Safe to expose without authentication.
pub fn public_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ContentStore + SubscriptionStore + Send + Sync + 'static,
{
  Router::new()
    .route("/content/{id}/access", get(access::check_one::<S>))
    .route("/content/{id}/preview", get(access::preview::<S>))
    .route("/access", post(access::check_many::<S>))
    .with_state(state)
}

/// Administrative routes for the release schedule.
pub fn admin_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ContentStore + SubscriptionStore + Send + Sync + 'static,
{
  Router::new()
    .route(
      "/content/{id}/release",
      post(releases::schedule::<S>).delete(releases::unschedule::<S>),
    )
    .route("/releases/batch", post(releases::schedule_batch::<S>))
    .route("/releases/process", post(releases::process::<S>))
    .route("/releases/pending", get(releases::pending::<S>))
    .with_state(state)
}
