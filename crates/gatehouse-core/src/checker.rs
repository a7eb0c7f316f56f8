//! The viewer-facing read path: load gate metadata and the viewer's
//! subscription, then hand both to the pure evaluator.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use uuid::Uuid;

use crate::{
  Error, Result,
  access::{AccessConfig, AccessDecision, evaluate},
  content::Zone,
  preview::{Preview, PreviewConfig, preview},
  store::{ContentStore, SubscriptionStore},
  subscription::{Subscription, Viewer},
};

pub struct AccessChecker<C, U> {
  content:       Arc<C>,
  subscriptions: Arc<U>,
  access:        AccessConfig,
  preview:       PreviewConfig,
}

impl<C, U> AccessChecker<C, U>
where
  C: ContentStore,
  U: SubscriptionStore,
{
  pub fn new(
    content: Arc<C>,
    subscriptions: Arc<U>,
    access: AccessConfig,
    preview: PreviewConfig,
  ) -> Self {
    Self { content, subscriptions, access, preview }
  }

  /// Decide access to one item.
  ///
  /// Fails with [`Error::NotFound`] only when the content id is unknown; a
  /// viewer without a subscription is an ordinary denial.
  pub async fn check(
    &self,
    content_id: Uuid,
    zone: Option<Zone>,
    viewer: &Viewer,
  ) -> Result<AccessDecision> {
    let meta = self
      .content
      .get_gate_metadata(content_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(content_id))?;

    let subscription = self.subscription_for(viewer).await?;
    Ok(evaluate(
      &meta,
      zone,
      viewer,
      subscription.as_ref(),
      Utc::now(),
      &self.access,
    ))
  }

  /// Decide access to many items for one viewer, e.g. for a list page.
  ///
  /// The checks run concurrently; results come back in input order.
  pub async fn check_many(
    &self,
    content_ids: &[Uuid],
    zone: Option<Zone>,
    viewer: &Viewer,
  ) -> Vec<(Uuid, Result<AccessDecision>)> {
    let checks = content_ids.iter().map(|&id| async move {
      (id, self.check(id, zone, viewer).await)
    });
    join_all(checks).await
  }

  /// Build a preview of `content_id` for `viewer`.
  ///
  /// Returns `Ok(None)` when the viewer already has access.
  pub async fn preview(
    &self,
    content_id: Uuid,
    zone: Option<Zone>,
    viewer: &Viewer,
  ) -> Result<Option<(AccessDecision, Preview)>> {
    let decision = self.check(content_id, zone, viewer).await?;
    if decision.has_access {
      return Ok(None);
    }

    let body = self
      .content
      .get_full_content(content_id)
      .await
      .map_err(Error::store)?
      .ok_or(Error::NotFound(content_id))?;

    Ok(preview(&body, &decision, &self.preview).map(|p| (decision, p)))
  }

  async fn subscription_for(&self, viewer: &Viewer) -> Result<Option<Subscription>> {
    let Some(user_id) = viewer.id else {
      return Ok(None);
    };
    self
      .subscriptions
      .get_active_subscription(user_id)
      .await
      .map_err(Error::store)
  }
}
