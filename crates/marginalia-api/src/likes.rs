//! Handlers for `/likes` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/likes/toggle` | Flip the caller's like |
//! | `POST` | `/likes` | Like; no-op if already liked |
//! | `POST` | `/likes/remove` | Unlike; no-op if not liked |
//!
//! Every body is a book object; every response is `{"key","state","delta"}`.

use axum::{Json, extract::State};
use marginalia_core::{BookLike, store::SocialStore};
use marginalia_social::{LikeIntent, ToggleOutcome};

use crate::{AppState, caller::Caller, error::ApiError};

async fn apply<S: SocialStore + 'static>(
  state: AppState<S>,
  caller: Caller,
  book: BookLike,
  intent: LikeIntent,
) -> Result<Json<ToggleOutcome>, ApiError> {
  let outcome = state.ledger.likes.apply(caller.0, &book, intent).await?;
  Ok(Json(outcome))
}

/// `POST /likes/toggle`
pub async fn toggle<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(book): Json<BookLike>,
) -> Result<Json<ToggleOutcome>, ApiError> {
  apply(state, caller, book, LikeIntent::Toggle).await
}

/// `POST /likes`
pub async fn like<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(book): Json<BookLike>,
) -> Result<Json<ToggleOutcome>, ApiError> {
  apply(state, caller, book, LikeIntent::Like).await
}

/// `POST /likes/remove`
pub async fn unlike<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  caller: Caller,
  Json(book): Json<BookLike>,
) -> Result<Json<ToggleOutcome>, ApiError> {
  apply(state, caller, book, LikeIntent::Unlike).await
}
