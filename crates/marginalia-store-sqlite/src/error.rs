//! Error type for `marginalia-store-sqlite`.

use marginalia_core::{record::UserId, store::StoreError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] marginalia_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// The partial unique index on active likes rejected an insert.
  #[error("user {user_id} already has an active like on {stored_key:?}")]
  DuplicateLike { user_id: UserId, stored_key: String },
}

impl StoreError for Error {
  fn is_unique_violation(&self) -> bool {
    matches!(self, Error::DuplicateLike { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
