//! HTTP server for Gatehouse.
//!
//! Mounts the [`gatehouse_api`] routers under `/api`, guarding the admin
//! routes with HTTP Basic auth, and adds request tracing.

pub mod auth;
pub mod error;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, middleware, routing::get};
use gatehouse_api::{ApiState, admin_router, public_router};
use gatehouse_core::{
  access::AccessConfig,
  preview::PreviewConfig,
  schedule::ReleaseConfig,
  store::{ContentStore, SubscriptionStore},
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use auth::{AuthConfig, require_admin};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` layered with
/// `GATEHOUSE_*` environment variables.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  pub store_path:          PathBuf,
  pub admin_username:      String,
  pub admin_password_hash: String,
  #[serde(default)]
  pub access:              AccessConfig,
  #[serde(default)]
  pub preview:             PreviewConfig,
  #[serde(default)]
  pub releases:            ReleaseConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

// ─── Application state ────────────────────────────────────────────────────────

/// Everything the router is built from.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthConfig>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self {
      store:  self.store.clone(),
      config: self.config.clone(),
      auth:   self.auth.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ContentStore + SubscriptionStore + Send + Sync + 'static,
{
  let api = ApiState::new(
    state.store.clone(),
    state.config.access.clone(),
    state.config.preview.clone(),
    state.config.releases.clone(),
  );

  let admin = admin_router(api.clone())
    .layer(middleware::from_fn_with_state(state.auth.clone(), require_admin));

  Router::new()
    .route("/health", get(|| async { "ok" }))
    .nest("/api", public_router(api).merge(admin))
    .layer(TraceLayer::new_for_http())
}
