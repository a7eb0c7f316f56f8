//! `gatehouse` — operator tool for the gatehouse server.
//!
//! Triggers release processing (e.g. from cron) and manages the release
//! schedule over the server's HTTP API.
//!
//! # Usage
//!
//! ```
//! gatehouse --url http://localhost:8080 --user admin --password secret process-releases
//! gatehouse --config ~/.config/gatehouse/cli.toml schedule <ID> 2030-01-01
//! ```

mod client;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use gatehouse_core::{
  content::{ScheduledRelease, Zone},
  subscription::Role,
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

const DEFAULT_URL: &str = "http://localhost:8080";

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "gatehouse", about = "Operator tool for the gatehouse server")]
struct Args {
  /// Path to a TOML config file (url, username, password).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the gatehouse server (default: http://localhost:8080).
  #[arg(long, env = "GATEHOUSE_URL")]
  url: Option<String>,

  /// Admin username.
  #[arg(long, env = "GATEHOUSE_USER")]
  user: Option<String>,

  /// Admin password (plaintext).
  #[arg(long, env = "GATEHOUSE_PASSWORD")]
  password: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Release every item whose date has passed.
  ProcessReleases {
    /// Maximum number of items to release in this run.
    #[arg(long)]
    limit: Option<usize>,
  },

  /// Schedule one item to become free on a date (RFC 3339 or YYYY-MM-DD).
  Schedule {
    content_id:   Uuid,
    release_date: String,
  },

  /// Schedule several items for the same date.
  ScheduleBatch {
    #[arg(long)]
    release_date: String,
    #[arg(required = true)]
    content_ids:  Vec<Uuid>,
  },

  /// Clear an item's release date.
  Unschedule { content_id: Uuid },

  /// List upcoming releases, soonest first.
  Pending {
    #[arg(long, default_value_t = 20)]
    limit: usize,
  },

  /// Show the access decision for one item.
  Access {
    content_id: Uuid,
    #[arg(long)]
    viewer_id:  Option<Uuid>,
    #[arg(long)]
    role:       Option<Role>,
    #[arg(long)]
    zone:       Option<Zone>,
  },
}

// ─── Config file ──────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default, Debug)]
struct ConfigFile {
  #[serde(default)]
  url:      String,
  #[serde(default)]
  username: String,
  #[serde(default)]
  password: String,
}

/// CLI flags override the config file, which overrides defaults.
fn resolve(
  url: Option<String>,
  user: Option<String>,
  password: Option<String>,
  file: ConfigFile,
) -> ApiConfig {
  let non_empty = |s: String| (!s.is_empty()).then_some(s);
  ApiConfig {
    base_url: url
      .or_else(|| non_empty(file.url))
      .unwrap_or_else(|| DEFAULT_URL.to_string()),
    username: user.or_else(|| non_empty(file.username)).unwrap_or_default(),
    password: password.or_else(|| non_empty(file.password)).unwrap_or_default(),
  }
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  let api_config = resolve(args.url, args.user, args.password, file_cfg);
  tracing::debug!(url = %api_config.base_url, "using server");
  let client = ApiClient::new(api_config)?;

  match args.command {
    Command::ProcessReleases { limit } => {
      let report = client.process_releases(limit).await?;
      println!("released {} item(s)", report.released_count);
      for failure in &report.errors {
        println!("  failed {}: {}", failure.content_id, failure.message);
      }
      if !report.errors.is_empty() {
        tracing::warn!(failed = report.errors.len(), "some releases failed");
      }
    }
    Command::Schedule { content_id, release_date } => {
      let scheduled = client.schedule(content_id, &release_date).await?;
      println!("{}", format_release(&scheduled));
    }
    Command::ScheduleBatch { release_date, content_ids } => {
      let outcome = client.schedule_batch(&content_ids, &release_date).await?;
      println!("scheduled {} item(s)", outcome.success_count);
      for id in &outcome.failed {
        println!("  failed {id}");
      }
    }
    Command::Unschedule { content_id } => {
      client.unschedule(content_id).await?;
      println!("unscheduled {content_id}");
    }
    Command::Pending { limit } => {
      let pending = client.pending(limit).await?;
      if pending.is_empty() {
        println!("no pending releases");
      }
      for release in &pending {
        println!("{}", format_release(release));
      }
    }
    Command::Access { content_id, viewer_id, role, zone } => {
      let decision = client.access(content_id, viewer_id, role, zone).await?;
      println!(
        "{}",
        serde_json::to_string_pretty(&decision).context("serialising decision")?
      );
    }
  }

  Ok(())
}

fn format_release(release: &ScheduledRelease) -> String {
  let state = match release.released_at {
    Some(at) => format!("released {}", at.format("%Y-%m-%d %H:%M UTC")),
    None => "pending".to_string(),
  };
  format!(
    "{}  {}  {}",
    release.content_id,
    release.scheduled_for.format("%Y-%m-%d %H:%M UTC"),
    state
  )
}
