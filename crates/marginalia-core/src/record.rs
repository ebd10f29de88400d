//! Persisted record shapes: likes, comments, and the denormalized rows the
//! like transition maintains on the side.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{BookIdentity, CanonicalKey, Error};

// ─── UserId ──────────────────────────────────────────────────────────────────

/// An authenticated user, as issued by the external auth service.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct UserId(pub Uuid);

impl UserId {
  pub fn new_v4() -> Self { Self(Uuid::new_v4()) }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.hyphenated())
  }
}

impl FromStr for UserId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    Ok(Self(Uuid::parse_str(s.trim())?))
  }
}

// ─── Likes ───────────────────────────────────────────────────────────────────

/// A like row as the store returns it.
///
/// `stored_key` is whatever spelling the writing client used, which is not
/// necessarily canonical for rows written by older clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeRecord {
  /// Row id, when the store exposes one.
  pub like_id:    Option<Uuid>,
  pub user_id:    UserId,
  pub stored_key: String,
  pub created_at: Option<DateTime<Utc>>,
  /// Set when the row was soft-deleted; such rows are inactive.
  pub deleted_at: Option<DateTime<Utc>>,
}

impl LikeRecord {
  pub fn is_active(&self) -> bool { self.deleted_at.is_none() }
}

// ─── Comments ────────────────────────────────────────────────────────────────

/// A comment row. Many per user per book are allowed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommentRecord {
  pub comment_id: Option<Uuid>,
  pub user_id:    UserId,
  pub stored_key: String,
  pub content:    String,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::SocialStore::insert_comment`]. `created_at` is
/// set by the store.
#[derive(Debug, Clone)]
pub struct NewComment {
  pub user_id: UserId,
  pub key:     CanonicalKey,
  pub content: String,
}

// ─── Denormalized side rows ──────────────────────────────────────────────────

/// Book metadata cached next to the ledger so feeds can render a liked book
/// without another catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookCacheEntry {
  pub key:        CanonicalKey,
  pub identity:   BookIdentity,
  pub title:      Option<String>,
  pub author:     Option<String>,
  pub cover_url:  Option<String>,
  pub updated_at: DateTime<Utc>,
}

/// The kind of activity a feed event announces.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
  IntoStaticStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EngagementAction {
  Like,
  Comment,
}

/// Append-only activity row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedEvent {
  pub event_id:   Uuid,
  pub user_id:    UserId,
  pub key:        CanonicalKey,
  pub action:     EngagementAction,
  pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewFeedEvent {
  pub user_id: UserId,
  pub key:     CanonicalKey,
  pub action:  EngagementAction,
}
