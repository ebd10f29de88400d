//! The `SocialStore` trait.
//!
//! The trait is implemented by storage backends (e.g.
//! `marginalia-store-sqlite`). The aggregation and toggle engines depend on
//! this abstraction, not on any concrete backend.
//!
//! Key filters take the full candidate list; backends must match stored keys
//! against it at least exactly, and may match ASCII case-insensitively.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::{
  CanonicalKey,
  record::{
    BookCacheEntry, CommentRecord, EngagementAction, FeedEvent, LikeRecord,
    NewComment, NewFeedEvent, UserId,
  },
};

/// Errors a backend can report, with the one distinction the toggle engine
/// branches on.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// `true` when a write was rejected because an equivalent active row
  /// already exists.
  fn is_unique_violation(&self) -> bool;
}

/// Abstraction over the hosted tables the ledger reads and writes.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes and from spawned background tasks.
pub trait SocialStore: Send + Sync {
  type Error: StoreError;

  // ── Likes ─────────────────────────────────────────────────────────────

  /// Active likes whose stored key is in `keys`.
  fn active_likes(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<Vec<LikeRecord>, Self::Error>> + Send + '_;

  /// Active likes by `user` whose stored key is in `keys`.
  fn active_likes_for_user(
    &self,
    user: UserId,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<Vec<LikeRecord>, Self::Error>> + Send + '_;

  /// Insert an active like. Must fail with an error whose
  /// [`StoreError::is_unique_violation`] is `true` if `user` already has an
  /// active like under `stored_key`.
  fn insert_like(
    &self,
    user: UserId,
    stored_key: String,
  ) -> impl Future<Output = Result<LikeRecord, Self::Error>> + Send + '_;

  /// Physically remove `user`'s active like rows under `stored_key`.
  /// Returns the number of rows removed.
  fn delete_like(
    &self,
    user: UserId,
    stored_key: String,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Mark `user`'s active like rows under `stored_key` as deleted at `at`.
  /// Returns the number of rows updated.
  fn soft_delete_like(
    &self,
    user: UserId,
    stored_key: String,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Comments ──────────────────────────────────────────────────────────

  /// Comments whose stored key is in `keys`.
  fn comments(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<Vec<CommentRecord>, Self::Error>> + Send + '_;

  fn insert_comment(
    &self,
    input: NewComment,
  ) -> impl Future<Output = Result<CommentRecord, Self::Error>> + Send + '_;

  // ── Denormalized side rows ────────────────────────────────────────────

  /// Insert or refresh the cached metadata row for `entry.key`.
  fn upsert_book_cache(
    &self,
    entry: BookCacheEntry,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn get_book_cache(
    &self,
    key: CanonicalKey,
  ) -> impl Future<Output = Result<Option<BookCacheEntry>, Self::Error>> + Send + '_;

  /// Append a feed event. The store assigns id and timestamp.
  fn insert_feed_event(
    &self,
    input: NewFeedEvent,
  ) -> impl Future<Output = Result<FeedEvent, Self::Error>> + Send + '_;

  /// Remove every feed event for `(user, key, action)`.
  fn delete_feed_events(
    &self,
    user: UserId,
    key: CanonicalKey,
    action: EngagementAction,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Feed events authored by `user`, newest first.
  fn feed_events_for_user(
    &self,
    user: UserId,
  ) -> impl Future<Output = Result<Vec<FeedEvent>, Self::Error>> + Send + '_;
}
