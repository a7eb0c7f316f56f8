//! [`SqliteStore`] — the SQLite implementation of [`ContentStore`] and
//! [`SubscriptionStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gatehouse_core::{
  content::{ContentGateMetadata, ContentItem, ScheduledRelease},
  store::{ContentStore, SubscriptionStore},
  subscription::Subscription,
};

use crate::{
  Result,
  encode::{
    RawContent, RawScheduled, RawSubscription, RawZone, encode_dt, encode_status,
    encode_uuid, encode_zone,
  },
  schema::{DUE_PREDICATE, GATED_PREDICATE, SCHEMA},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Content gating and subscription records backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Authoring / billing side ──────────────────────────────────────────────

  /// Insert or replace a content item, its zone settings and its body.
  ///
  /// This is the authoring subsystem's write path; the engine itself only
  /// touches gating columns.
  pub async fn put_content(&self, item: &ContentItem, body: &str) -> Result<()> {
    let gate         = &item.gate;
    let id_str       = encode_uuid(gate.content_id);
    let title        = item.title.clone();
    let body         = body.to_owned();
    let is_premium   = gate.is_premium;
    let release_str  = gate.premium_release_date.map(encode_dt);
    let permanent    = gate.is_permanent_premium;
    let released_str = gate.released_at.map(encode_dt);
    let zones: Vec<_> = gate
      .zone_settings
      .iter()
      .map(|z| {
        (
          encode_zone(z.zone),
          z.visible,
          z.requires_subscription,
          z.free_after_date.map(encode_dt),
        )
      })
      .collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO content_items (
             content_id, title, body, is_premium,
             premium_release_date, is_permanent_premium, released_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
           ON CONFLICT(content_id) DO UPDATE SET
             title                = excluded.title,
             body                 = excluded.body,
             is_premium           = excluded.is_premium,
             premium_release_date = excluded.premium_release_date,
             is_permanent_premium = excluded.is_permanent_premium,
             released_at          = excluded.released_at",
          rusqlite::params![
            id_str,
            title,
            body,
            is_premium,
            release_str,
            permanent,
            released_str,
          ],
        )?;
        tx.execute(
          "DELETE FROM zone_settings WHERE content_id = ?1",
          rusqlite::params![id_str],
        )?;
        for (position, (zone, visible, requires, free_after)) in zones.iter().enumerate() {
          tx.execute(
            "INSERT INTO zone_settings (
               content_id, zone, position, visible, requires_subscription, free_after_date
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id_str, zone, position as i64, visible, requires, free_after],
          )?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Remove a content item and its zone settings.
  pub async fn delete_content(&self, content_id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(content_id);
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM content_items WHERE content_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  /// Insert or replace a subscription mirrored from billing.
  pub async fn put_subscription(&self, sub: &Subscription) -> Result<()> {
    let id_str     = encode_uuid(sub.subscription_id);
    let user_str   = encode_uuid(sub.user_id);
    let plan_id    = sub.plan_id.clone();
    let status_str = encode_status(sub.status);
    let start_str  = encode_dt(sub.current_period_start);
    let end_str    = encode_dt(sub.current_period_end);
    let cancel     = sub.cancel_at_period_end;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO subscriptions (
             subscription_id, user_id, plan_id, status,
             current_period_start, current_period_end, cancel_at_period_end
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str, user_str, plan_id, status_str, start_str, end_str, cancel,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Read a full item (gate metadata plus title). `None` if missing.
  pub async fn get_content(&self, content_id: Uuid) -> Result<Option<ContentItem>> {
    let id_str = encode_uuid(content_id);

    let raw: Option<(RawContent, Vec<RawZone>)> = self
      .conn
      .call(move |conn| {
        let content = conn
          .query_row(
            &format!("SELECT {} FROM content_items WHERE content_id = ?1", RawContent::COLUMNS),
            rusqlite::params![id_str],
            RawContent::from_row,
          )
          .optional()?;
        match content {
          Some(c) => {
            let zones = load_zones(conn, &id_str)?;
            Ok(Some((c, zones)))
          }
          None => Ok(None),
        }
      })
      .await?;

    raw.map(|(c, z)| c.into_item(z)).transpose()
  }
}

/// Zone settings for one item, in authored order.
fn load_zones(
  conn: &rusqlite::Connection,
  content_id: &str,
) -> rusqlite::Result<Vec<RawZone>> {
  let mut stmt = conn.prepare_cached(
    "SELECT zone, visible, requires_subscription, free_after_date
     FROM zone_settings
     WHERE content_id = ?1
     ORDER BY position",
  )?;
  stmt
    .query_map(rusqlite::params![content_id], |row| {
      Ok(RawZone {
        zone:                  row.get(0)?,
        visible:               row.get(1)?,
        requires_subscription: row.get(2)?,
        free_after_date:       row.get(3)?,
      })
    })?
    .collect()
}

// ─── ContentStore impl ───────────────────────────────────────────────────────

impl ContentStore for SqliteStore {
  type Error = crate::Error;

  async fn get_gate_metadata(&self, content_id: Uuid) -> Result<Option<ContentGateMetadata>> {
    Ok(self.get_content(content_id).await?.map(|item| item.gate))
  }

  async fn get_full_content(&self, content_id: Uuid) -> Result<Option<String>> {
    let id_str = encode_uuid(content_id);
    let body: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT body FROM content_items WHERE content_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?)
      })
      .await?;
    Ok(body)
  }

  async fn set_release_date(
    &self,
    content_id: Uuid,
    release_date: Option<DateTime<Utc>>,
  ) -> Result<bool> {
    let id_str      = encode_uuid(content_id);
    let release_str = release_date.map(encode_dt);

    // A new date starts a new cycle, so any earlier release marker goes.
    let changed: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE content_items
           SET premium_release_date = ?1, released_at = NULL
           WHERE content_id = ?2",
          rusqlite::params![release_str, id_str],
        )?)
      })
      .await?;
    Ok(changed > 0)
  }

  async fn list_scheduled(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<ScheduledRelease>> {
    let now_str   = encode_dt(now);
    let limit_val = limit as i64;

    let raws: Vec<RawScheduled> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT content_id, premium_release_date, released_at
           FROM content_items
           WHERE is_permanent_premium = 0
             AND premium_release_date IS NOT NULL
             AND premium_release_date > ?1
             AND {GATED_PREDICATE}
           ORDER BY premium_release_date ASC
           LIMIT ?2"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![now_str, limit_val], |row| {
            Ok(RawScheduled {
              content_id:    row.get(0)?,
              scheduled_for: row.get(1)?,
              released_at:   row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawScheduled::into_release).collect()
  }

  async fn list_due_for_release(
    &self,
    now: DateTime<Utc>,
    limit: usize,
  ) -> Result<Vec<ContentItem>> {
    let now_str   = encode_dt(now);
    let limit_val = limit as i64;

    let raws: Vec<(RawContent, Vec<RawZone>)> = self
      .conn
      .call(move |conn| {
        let contents = {
          let mut stmt = conn.prepare(&format!(
            "SELECT {}
             FROM content_items
             WHERE {DUE_PREDICATE}
             ORDER BY premium_release_date ASC
             LIMIT ?2",
            RawContent::COLUMNS
          ))?;
          stmt
            .query_map(rusqlite::params![now_str, limit_val], RawContent::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };

        let mut rows = Vec::with_capacity(contents.len());
        for content in contents {
          let zones = load_zones(conn, &content.content_id)?;
          rows.push((content, zones));
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(|(c, z)| c.into_item(z)).collect()
  }

  async fn apply_release_transition(
    &self,
    content_id: Uuid,
    now: DateTime<Utc>,
  ) -> Result<bool> {
    let id_str  = encode_uuid(content_id);
    let now_str = encode_dt(now);

    let released: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          &format!(
            "UPDATE content_items
             SET is_premium = 0, released_at = ?1
             WHERE content_id = ?2 AND {DUE_PREDICATE}"
          ),
          rusqlite::params![now_str, id_str],
        )?;
        if changed > 0 {
          tx.execute(
            "UPDATE zone_settings
             SET requires_subscription = 0
             WHERE content_id = ?2
               AND requires_subscription = 1
               AND free_after_date IS NOT NULL
               AND free_after_date <= ?1",
            rusqlite::params![now_str, id_str],
          )?;
        }
        tx.commit()?;
        Ok(changed > 0)
      })
      .await?;
    Ok(released)
  }
}

// ─── SubscriptionStore impl ──────────────────────────────────────────────────

impl SubscriptionStore for SqliteStore {
  type Error = crate::Error;

  async fn get_active_subscription(&self, user_id: Uuid) -> Result<Option<Subscription>> {
    let user_str = encode_uuid(user_id);
    let now_str  = encode_dt(Utc::now());

    // A record whose period covers now wins over a renewal that has not
    // started yet or one that has lapsed.
    let raw: Option<RawSubscription> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT subscription_id, user_id, plan_id, status,
                    current_period_start, current_period_end, cancel_at_period_end
             FROM subscriptions
             WHERE user_id = ?1
             ORDER BY CASE
                        WHEN status IN ('active', 'trialing')
                             AND current_period_start <= ?2
                             AND current_period_end >= ?2 THEN 0
                        WHEN status IN ('active', 'trialing') THEN 1
                        ELSE 2
                      END,
                      current_period_end DESC
             LIMIT 1",
            rusqlite::params![user_str, now_str],
            |row| {
              Ok(RawSubscription {
                subscription_id:      row.get(0)?,
                user_id:              row.get(1)?,
                plan_id:              row.get(2)?,
                status:               row.get(3)?,
                current_period_start: row.get(4)?,
                current_period_end:   row.get(5)?,
                cancel_at_period_end: row.get(6)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSubscription::into_subscription).transpose()
  }
}
