//! `POST /counts`: batch engagement counts.

use std::collections::HashMap;

use axum::{Json, extract::State};
use marginalia_core::{CanonicalKey, store::SocialStore};
use marginalia_social::SocialCounts;
use serde::Deserialize;

use crate::{AppState, caller::Caller};

#[derive(Debug, Deserialize)]
pub struct CountsBody {
  pub keys: Vec<CanonicalKey>,
}

/// `POST /counts`, body: `{"keys":["isbn:9780141439518", …]}`
///
/// Never fails: a store outage yields an empty object.
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Caller(user): Caller,
  Json(body): Json<CountsBody>,
) -> Json<HashMap<CanonicalKey, SocialCounts>>
where
  S: SocialStore + 'static,
{
  Json(state.ledger.counts.aggregate(&body.keys, user).await)
}
