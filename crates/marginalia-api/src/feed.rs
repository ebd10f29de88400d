//! Read-only views of the denormalized rows.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/feed` | The caller's own feed events, newest first |
//! | `GET`  | `/books?key=<canonical key>` | Cached book metadata; 404 if absent |

use axum::{
  Json,
  extract::{Query, State},
};
use marginalia_core::{
  CanonicalKey,
  record::{BookCacheEntry, FeedEvent},
  store::SocialStore,
};
use serde::Deserialize;

use crate::{AppState, caller::Caller, error::ApiError};

/// `GET /feed`
pub async fn own_events<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
) -> Result<Json<Vec<FeedEvent>>, ApiError> {
  let user = user.ok_or(ApiError::Unauthorized)?;
  let events = state
    .store
    .feed_events_for_user(user)
    .await
    .map_err(|e| ApiError::Unavailable(Box::new(e)))?;
  Ok(Json(events))
}

#[derive(Debug, Deserialize)]
pub struct BookParams {
  pub key: CanonicalKey,
}

/// `GET /books?key=<key>`
pub async fn cached_book<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  Query(params): Query<BookParams>,
) -> Result<Json<BookCacheEntry>, ApiError> {
  let key = params.key;
  let entry = state
    .store
    .get_book_cache(key.clone())
    .await
    .map_err(|e| ApiError::Unavailable(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("no cached book for {key}")))?;
  Ok(Json(entry))
}
