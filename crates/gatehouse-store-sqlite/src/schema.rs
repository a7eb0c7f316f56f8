//! SQL schema for the Gatehouse SQLite store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Content bodies are written by the authoring subsystem. The gating columns
-- are written only by the release scheduler and processor.
CREATE TABLE IF NOT EXISTS content_items (
    content_id           TEXT PRIMARY KEY,
    title                TEXT NOT NULL,
    body                 TEXT NOT NULL DEFAULT '',
    is_premium           INTEGER NOT NULL DEFAULT 0,
    premium_release_date TEXT,             -- RFC 3339 UTC, fixed width
    is_permanent_premium INTEGER NOT NULL DEFAULT 0,
    released_at          TEXT              -- set when flipped to free
);

CREATE TABLE IF NOT EXISTS zone_settings (
    content_id            TEXT NOT NULL
                          REFERENCES content_items(content_id) ON DELETE CASCADE,
    zone                  TEXT NOT NULL,   -- 'read' | 'coach' | 'player' | 'parent'
    position              INTEGER NOT NULL,
    visible               INTEGER NOT NULL DEFAULT 1,
    requires_subscription INTEGER NOT NULL DEFAULT 0,
    free_after_date       TEXT,
    PRIMARY KEY (content_id, zone)
);

-- Mirrored from the billing subsystem; read-only to the engine.
CREATE TABLE IF NOT EXISTS subscriptions (
    subscription_id      TEXT PRIMARY KEY,
    user_id              TEXT NOT NULL,
    plan_id              TEXT NOT NULL,
    status               TEXT NOT NULL,
    current_period_start TEXT NOT NULL,
    current_period_end   TEXT NOT NULL,
    cancel_at_period_end INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS content_release_idx    ON content_items(premium_release_date);
CREATE INDEX IF NOT EXISTS zone_settings_free_idx ON zone_settings(free_after_date);
CREATE INDEX IF NOT EXISTS subscriptions_user_idx ON subscriptions(user_id);

PRAGMA user_version = 1;
";

/// Rows still gated and due for release at `?1`.
///
/// Shared by the due-item query and the guarded transition UPDATE, so an item
/// is flipped only while it still matches.
pub const DUE_PREDICATE: &str = "
    content_items.is_permanent_premium = 0
    AND content_items.premium_release_date IS NOT NULL
    AND content_items.premium_release_date <= ?1
    AND (
      content_items.is_premium = 1
      OR EXISTS (
        SELECT 1 FROM zone_settings z
        WHERE z.content_id = content_items.content_id
          AND z.requires_subscription = 1
          AND z.free_after_date IS NOT NULL
          AND z.free_after_date <= ?1
      )
    )";

/// Rows that are gated at all, ignoring dates.
pub const GATED_PREDICATE: &str = "
    (
      content_items.is_premium = 1
      OR EXISTS (
        SELECT 1 FROM zone_settings z
        WHERE z.content_id = content_items.content_id
          AND z.requires_subscription = 1
      )
    )";
