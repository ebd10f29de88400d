//! `POST /identity`: resolve a book without touching the store.

use axum::Json;
use marginalia_core::{BookIdentity, BookLike, CandidateSet, CanonicalKey, expand_book};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct IdentityResponse {
  pub key:        CanonicalKey,
  pub identity:   BookIdentity,
  /// Every stored-key spelling this book's rows may live under.
  pub candidates: CandidateSet,
}

/// `POST /identity`, body: a book object
pub async fn handler(Json(book): Json<BookLike>) -> Json<IdentityResponse> {
  let identity = BookIdentity::from_book(&book);
  Json(IdentityResponse {
    key: identity.canonical_key(),
    identity,
    candidates: expand_book(&book),
  })
}
