//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that lexical order matches chronological order. UUIDs are stored as
//! hyphenated lowercase strings. Book identities are stored as compact JSON.

use chrono::{DateTime, SecondsFormat, Utc};
use marginalia_core::{
  BookIdentity, CanonicalKey,
  record::{
    BookCacheEntry, CommentRecord, EngagementAction, FeedEvent, LikeRecord,
    UserId,
  },
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_user(user: UserId) -> String { encode_uuid(user.0) }

pub fn decode_user(s: &str) -> Result<UserId> { Ok(UserId(decode_uuid(s)?)) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Canonical keys and identities ───────────────────────────────────────────

pub fn decode_key(s: &str) -> Result<CanonicalKey> { Ok(s.parse()?) }

pub fn encode_identity(identity: &BookIdentity) -> Result<String> {
  Ok(serde_json::to_string(identity)?)
}

pub fn decode_identity(s: &str) -> Result<BookIdentity> {
  Ok(serde_json::from_str(s)?)
}

// ─── EngagementAction ─────────────────────────────────────────────────────────

pub fn encode_action(action: EngagementAction) -> &'static str { action.into() }

pub fn decode_action(s: &str) -> Result<EngagementAction> {
  s.parse()
    .map_err(|_| Error::Core(marginalia_core::Error::UnknownAction(s.to_owned())))
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// Columns of a `likes` row as read from SQLite.
pub struct RawLike {
  pub like_id:    String,
  pub user_id:    String,
  pub stored_key: String,
  pub created_at: String,
  pub deleted_at: Option<String>,
}

impl RawLike {
  pub const COLUMNS: &'static str =
    "like_id, user_id, stored_key, created_at, deleted_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      like_id:    row.get(0)?,
      user_id:    row.get(1)?,
      stored_key: row.get(2)?,
      created_at: row.get(3)?,
      deleted_at: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<LikeRecord> {
    Ok(LikeRecord {
      like_id:    Some(decode_uuid(&self.like_id)?),
      user_id:    decode_user(&self.user_id)?,
      stored_key: self.stored_key,
      created_at: Some(decode_dt(&self.created_at)?),
      deleted_at: self.deleted_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Columns of a `comments` row.
pub struct RawComment {
  pub comment_id: String,
  pub user_id:    String,
  pub stored_key: String,
  pub content:    String,
  pub created_at: String,
}

impl RawComment {
  pub const COLUMNS: &'static str =
    "comment_id, user_id, stored_key, content, created_at";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      comment_id: row.get(0)?,
      user_id:    row.get(1)?,
      stored_key: row.get(2)?,
      content:    row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<CommentRecord> {
    Ok(CommentRecord {
      comment_id: Some(decode_uuid(&self.comment_id)?),
      user_id:    decode_user(&self.user_id)?,
      stored_key: self.stored_key,
      content:    self.content,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// Columns of a `book_cache` row.
pub struct RawBookCache {
  pub canonical_key: String,
  pub identity_json: String,
  pub title:         Option<String>,
  pub author:        Option<String>,
  pub cover_url:     Option<String>,
  pub updated_at:    String,
}

impl RawBookCache {
  pub fn into_entry(self) -> Result<BookCacheEntry> {
    Ok(BookCacheEntry {
      key:        decode_key(&self.canonical_key)?,
      identity:   decode_identity(&self.identity_json)?,
      title:      self.title,
      author:     self.author,
      cover_url:  self.cover_url,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

/// Columns of a `feed_events` row.
pub struct RawFeedEvent {
  pub event_id:      String,
  pub user_id:       String,
  pub canonical_key: String,
  pub action:        String,
  pub created_at:    String,
}

impl RawFeedEvent {
  pub fn into_event(self) -> Result<FeedEvent> {
    Ok(FeedEvent {
      event_id:   decode_uuid(&self.event_id)?,
      user_id:    decode_user(&self.user_id)?,
      key:        decode_key(&self.canonical_key)?,
      action:     decode_action(&self.action)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}

/// `?{start}, ?{start + 1}, …` for `count` positional parameters.
pub fn placeholders(start: usize, count: usize) -> String {
  (start..start + count)
    .map(|i| format!("?{i}"))
    .collect::<Vec<_>>()
    .join(", ")
}
