//! Handlers for `/comments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/comments` | Body: `{"book":{…},"content":"…"}`; 201 |
//! | `GET`  | `/comments?key=<canonical key>` | Newest first |

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use marginalia_core::{BookLike, CanonicalKey, record::CommentRecord, store::SocialStore};
use serde::Deserialize;

use crate::{AppState, caller::Caller, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub book:    BookLike,
  pub content: String,
}

/// `POST /comments`
pub async fn create<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let comment = state
    .ledger
    .comments
    .add(user, &body.book, &body.content)
    .await?;
  Ok((StatusCode::CREATED, Json(comment)))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub key: CanonicalKey,
}

/// `GET /comments?key=<key>`
pub async fn list<S: SocialStore + 'static>(
  State(state): State<AppState<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CommentRecord>>, ApiError> {
  Ok(Json(state.ledger.comments.list(&params.key).await?))
}
