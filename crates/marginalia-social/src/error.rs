//! Error type for `marginalia-social`.

use marginalia_core::store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The book resolved to the unknown key; nothing may be written for it.
  #[error("book identity could not be resolved")]
  InvalidIdentity,

  #[error("caller is not authenticated")]
  NotAuthenticated,

  #[error("comment content is empty")]
  EmptyComment,

  /// A query or mutation failed in transport or in the backend. The primary
  /// operation did not take effect.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E: StoreError>(err: E) -> Self {
    Self::StoreUnavailable(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
