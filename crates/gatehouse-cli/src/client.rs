//! Async HTTP client wrapping the gatehouse JSON API.

use anyhow::{Context, Result, anyhow};
use gatehouse_core::{
  access::AccessDecision,
  content::{ScheduledRelease, Zone},
  processor::ReleaseReport,
  schedule::BatchOutcome,
  subscription::Role,
};
use reqwest::{Client, Response};
use serde_json::{Value, json};
use std::time::Duration;
use uuid::Uuid;

/// Connection settings for the gatehouse API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Async HTTP client for the gatehouse JSON REST API.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(60))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    api_url(&self.config.base_url, path)
  }

  fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  // ── Releases ──────────────────────────────────────────────────────────────

  /// `POST /api/releases/process`
  pub async fn process_releases(&self, limit: Option<usize>) -> Result<ReleaseReport> {
    let resp = self
      .auth(self.client.post(self.url("/releases/process")))
      .json(&json!({ "limit": limit }))
      .send()
      .await
      .context("POST /releases/process failed")?;
    let resp = ensure_success(resp, "POST /releases/process").await?;
    resp.json().await.context("deserialising release report")
  }

  /// `POST /api/content/<id>/release`
  pub async fn schedule(&self, content_id: Uuid, release_date: &str) -> Result<ScheduledRelease> {
    let path = format!("/content/{content_id}/release");
    let resp = self
      .auth(self.client.post(self.url(&path)))
      .json(&json!({ "release_date": release_date }))
      .send()
      .await
      .with_context(|| format!("POST {path} failed"))?;
    let resp = ensure_success(resp, &format!("POST {path}")).await?;
    resp.json().await.context("deserialising scheduled release")
  }

  /// `DELETE /api/content/<id>/release`
  pub async fn unschedule(&self, content_id: Uuid) -> Result<()> {
    let path = format!("/content/{content_id}/release");
    let resp = self
      .auth(self.client.delete(self.url(&path)))
      .send()
      .await
      .with_context(|| format!("DELETE {path} failed"))?;
    ensure_success(resp, &format!("DELETE {path}")).await?;
    Ok(())
  }

  /// `POST /api/releases/batch`
  pub async fn schedule_batch(
    &self,
    content_ids: &[Uuid],
    release_date: &str,
  ) -> Result<BatchOutcome> {
    let resp = self
      .auth(self.client.post(self.url("/releases/batch")))
      .json(&json!({ "content_ids": content_ids, "release_date": release_date }))
      .send()
      .await
      .context("POST /releases/batch failed")?;
    let resp = ensure_success(resp, "POST /releases/batch").await?;
    resp.json().await.context("deserialising batch outcome")
  }

  /// `GET /api/releases/pending?limit=<n>`
  pub async fn pending(&self, limit: usize) -> Result<Vec<ScheduledRelease>> {
    let resp = self
      .auth(self.client.get(self.url("/releases/pending")))
      .query(&[("limit", limit.to_string())])
      .send()
      .await
      .context("GET /releases/pending failed")?;
    let resp = ensure_success(resp, "GET /releases/pending").await?;
    resp.json().await.context("deserialising pending releases")
  }

  // ── Access ────────────────────────────────────────────────────────────────

  /// `GET /api/content/<id>/access`
  pub async fn access(
    &self,
    content_id: Uuid,
    viewer_id: Option<Uuid>,
    role: Option<Role>,
    zone: Option<Zone>,
  ) -> Result<AccessDecision> {
    let path = format!("/content/{content_id}/access");
    let mut query = Vec::new();
    if let Some(id) = viewer_id {
      query.push(("viewer_id", id.to_string()));
    }
    if let Some(role) = role {
      query.push(("role", role.to_string()));
    }
    if let Some(zone) = zone {
      query.push(("zone", zone.to_string()));
    }

    let resp = self
      .client
      .get(self.url(&path))
      .query(&query)
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    let resp = ensure_success(resp, &format!("GET {path}")).await?;
    resp.json().await.context("deserialising access decision")
  }
}

fn api_url(base_url: &str, path: &str) -> String {
  format!("{}/api{}", base_url.trim_end_matches('/'), path)
}

/// Turn a non-2xx response into an error carrying the server's message.
async fn ensure_success(resp: Response, what: &str) -> Result<Response> {
  let status = resp.status();
  if status.is_success() {
    return Ok(resp);
  }
  let message = resp
    .json::<Value>()
    .await
    .ok()
    .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_owned))
    .unwrap_or_default();
  if message.is_empty() {
    Err(anyhow!("{what} → {status}"))
  } else {
    Err(anyhow!("{what} → {status}: {message}"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn url_joins_without_double_slash() {
    assert_eq!(
      api_url("http://localhost:8080/", "/releases/pending"),
      "http://localhost:8080/api/releases/pending"
    );
    assert_eq!(
      api_url("https://gate.example", "/access"),
      "https://gate.example/api/access"
    );
  }
}
