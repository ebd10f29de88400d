//! JSON REST API for Marginalia.
//!
//! Exposes an axum [`Router`] backed by any
//! [`marginalia_core::store::SocialStore`]. Authentication happens upstream;
//! the caller's id arrives in the `x-user-id` header.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", marginalia_api::api_router(state))
//! ```

pub mod caller;
pub mod comments;
pub mod counts;
pub mod error;
pub mod feed;
pub mod identity;
pub mod likes;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use marginalia_core::store::SocialStore;
use marginalia_social::Ledger;

pub use caller::{Caller, USER_ID_HEADER};
pub use error::ApiError;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub store:  Arc<S>,
  pub ledger: Arc<Ledger<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self {
    Self { store: self.store.clone(), ledger: self.ledger.clone() }
  }
}

impl<S: SocialStore + 'static> AppState<S> {
  pub fn new(store: Arc<S>, ledger: Ledger<S>) -> Self {
    Self { store, ledger: Arc::new(ledger) }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: AppState<S>) -> Router<()>
where
  S: SocialStore + 'static,
{
  Router::new()
    .route("/identity", post(identity::handler))
    .route("/counts", post(counts::handler::<S>))
    // Likes
    .route("/likes", post(likes::like::<S>))
    .route("/likes/toggle", post(likes::toggle::<S>))
    .route("/likes/remove", post(likes::unlike::<S>))
    // Comments
    .route("/comments", get(comments::list::<S>).post(comments::create::<S>))
    // Denormalized reads
    .route("/feed", get(feed::own_events::<S>))
    .route("/books", get(feed::cached_book::<S>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
