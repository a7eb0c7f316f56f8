//! Error types for `gatehouse-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("content not found: {0}")]
  NotFound(Uuid),

  #[error("invalid release date: {0}")]
  InvalidReleaseDate(String),

  #[error("validation error: {0}")]
  Validation(String),

  /// The backing store failed while serving a single request or item.
  #[error("store unavailable: {0}")]
  TransientStore(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error as [`Error::TransientStore`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::TransientStore(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
