//! The `x-user-id` header extractor.
//!
//! Authentication happens upstream; the gateway forwards the authenticated
//! user's id in [`USER_ID_HEADER`]. A missing or malformed header yields an
//! anonymous caller, and operations that need a user reject it.

use std::convert::Infallible;

use axum::{extract::FromRequestParts, http::request::Parts};
use marginalia_core::record::UserId;

pub const USER_ID_HEADER: &str = "x-user-id";

/// The caller's user id, if the request carried a valid one.
#[derive(Debug, Clone, Copy)]
pub struct Caller(pub Option<UserId>);

impl<S: Send + Sync> FromRequestParts<S> for Caller {
  type Rejection = Infallible;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    let Some(value) = parts.headers.get(USER_ID_HEADER) else {
      return Ok(Caller(None));
    };
    let user = value.to_str().ok().and_then(|v| v.parse::<UserId>().ok());
    if user.is_none() {
      tracing::debug!("ignoring malformed {USER_ID_HEADER} header");
    }
    Ok(Caller(user))
  }
}
