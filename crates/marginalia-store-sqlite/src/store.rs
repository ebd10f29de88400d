//! [`SqliteStore`]: the SQLite implementation of [`SocialStore`].

use std::{collections::HashSet, path::Path};

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use marginalia_core::{
  CanonicalKey,
  record::{
    BookCacheEntry, CommentRecord, EngagementAction, FeedEvent, LikeRecord,
    NewComment, NewFeedEvent, UserId,
  },
  store::SocialStore,
};

use crate::{
  Error, Result,
  encode::{
    RawBookCache, RawComment, RawFeedEvent, RawLike, encode_action, encode_dt,
    encode_identity, encode_user, encode_uuid, placeholders,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Keys bound per `IN (...)` list. Longer filters are split into several
/// statements so no query exceeds SQLite's host-parameter limit.
const MAX_KEYS_PER_QUERY: usize = 500;

/// A Marginalia ledger backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Active likes filtered by `keys`, and by `user` when given.
  async fn query_likes(
    &self,
    user: Option<UserId>,
    keys: Vec<String>,
  ) -> Result<Vec<LikeRecord>> {
    if keys.is_empty() {
      return Ok(Vec::new());
    }
    let user_str = user.map(encode_user);

    let raws: Vec<RawLike> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::new();
        let mut seen = HashSet::new();

        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
          let mut params: Vec<&str> = Vec::with_capacity(chunk.len() + 1);
          let user_clause = match &user_str {
            Some(u) => {
              params.push(u.as_str());
              "AND user_id = ?1"
            }
            None => "",
          };
          let key_list = placeholders(params.len() + 1, chunk.len());
          params.extend(chunk.iter().map(String::as_str));

          let sql = format!(
            "SELECT {} FROM likes
             WHERE deleted_at IS NULL {user_clause}
               AND stored_key IN ({key_list})",
            RawLike::COLUMNS,
          );

          let mut stmt = conn.prepare(&sql)?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(params.iter()), RawLike::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          // Spellings differing only in case can match one row from two chunks.
          rows.extend(found.into_iter().filter(|r| seen.insert(r.like_id.clone())));
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLike::into_record).collect()
  }
}

/// The partial unique index on active likes reports this extended code.
fn is_unique_violation(err: &tokio_rusqlite::Error) -> bool {
  matches!(
    err,
    tokio_rusqlite::Error::Rusqlite(rusqlite::Error::SqliteFailure(e, _))
      if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
  )
}

// ─── SocialStore impl ────────────────────────────────────────────────────────

impl SocialStore for SqliteStore {
  type Error = Error;

  // ── Likes ─────────────────────────────────────────────────────────────────

  async fn active_likes(&self, keys: Vec<String>) -> Result<Vec<LikeRecord>> {
    self.query_likes(None, keys).await
  }

  async fn active_likes_for_user(
    &self,
    user: UserId,
    keys: Vec<String>,
  ) -> Result<Vec<LikeRecord>> {
    self.query_likes(Some(user), keys).await
  }

  async fn insert_like(&self, user: UserId, stored_key: String) -> Result<LikeRecord> {
    let record = LikeRecord {
      like_id:    Some(Uuid::new_v4()),
      user_id:    user,
      stored_key: stored_key.clone(),
      created_at: Some(Utc::now()),
      deleted_at: None,
    };

    let id_str   = record.like_id.map(encode_uuid);
    let user_str = encode_user(user);
    let at_str   = record.created_at.map(encode_dt);

    let inserted = self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO likes (like_id, user_id, stored_key, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, user_str, stored_key, at_str],
        )?;
        Ok(())
      })
      .await;

    match inserted {
      Ok(()) => Ok(record),
      Err(e) if is_unique_violation(&e) => Err(Error::DuplicateLike {
        user_id:    user,
        stored_key: record.stored_key,
      }),
      Err(e) => Err(e.into()),
    }
  }

  async fn delete_like(&self, user: UserId, stored_key: String) -> Result<u64> {
    let user_str = encode_user(user);

    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM likes
           WHERE user_id = ?1 AND stored_key = ?2 AND deleted_at IS NULL",
          rusqlite::params![user_str, stored_key],
        )?;
        Ok(n)
      })
      .await?;

    Ok(removed as u64)
  }

  async fn soft_delete_like(
    &self,
    user:       UserId,
    stored_key: String,
    at:         DateTime<Utc>,
  ) -> Result<u64> {
    let user_str = encode_user(user);
    let at_str   = encode_dt(at);

    let updated = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "UPDATE likes SET deleted_at = ?3
           WHERE user_id = ?1 AND stored_key = ?2 AND deleted_at IS NULL",
          rusqlite::params![user_str, stored_key, at_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(updated as u64)
  }

  // ── Comments ──────────────────────────────────────────────────────────────

  async fn comments(&self, keys: Vec<String>) -> Result<Vec<CommentRecord>> {
    if keys.is_empty() {
      return Ok(Vec::new());
    }

    let raws: Vec<RawComment> = self
      .conn
      .call(move |conn| {
        let mut rows = Vec::new();
        let mut seen = HashSet::new();

        for chunk in keys.chunks(MAX_KEYS_PER_QUERY) {
          let sql = format!(
            "SELECT {} FROM comments
             WHERE stored_key IN ({})
             ORDER BY created_at DESC, rowid DESC",
            RawComment::COLUMNS,
            placeholders(1, chunk.len()),
          );
          let mut stmt = conn.prepare(&sql)?;
          let found = stmt
            .query_map(rusqlite::params_from_iter(chunk.iter()), RawComment::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
          rows.extend(found.into_iter().filter(|r| seen.insert(r.comment_id.clone())));
        }

        // Stable, so per-chunk rowid order survives among equal timestamps.
        rows.sort_by(|a: &RawComment, b: &RawComment| b.created_at.cmp(&a.created_at));
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawComment::into_record).collect()
  }

  async fn insert_comment(&self, input: NewComment) -> Result<CommentRecord> {
    let record = CommentRecord {
      comment_id: Some(Uuid::new_v4()),
      user_id:    input.user_id,
      stored_key: input.key.as_str().to_owned(),
      content:    input.content,
      created_at: Utc::now(),
    };

    let id_str      = record.comment_id.map(encode_uuid);
    let user_str    = encode_user(record.user_id);
    let key_str     = record.stored_key.clone();
    let content_str = record.content.clone();
    let at_str      = encode_dt(record.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO comments (comment_id, user_id, stored_key, content, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, key_str, content_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(record)
  }

  // ── Denormalized side rows ────────────────────────────────────────────────

  async fn upsert_book_cache(&self, entry: BookCacheEntry) -> Result<()> {
    let key_str      = entry.key.as_str().to_owned();
    let identity_str = encode_identity(&entry.identity)?;
    let at_str       = encode_dt(entry.updated_at);

    // Newer non-null titles and authors replace older ones; the first cover
    // recorded for a key is kept.
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO book_cache
             (canonical_key, identity_json, title, author, cover_url, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (canonical_key) DO UPDATE SET
             identity_json = excluded.identity_json,
             title         = COALESCE(excluded.title,  book_cache.title),
             author        = COALESCE(excluded.author, book_cache.author),
             cover_url     = COALESCE(book_cache.cover_url, excluded.cover_url),
             updated_at    = excluded.updated_at",
          rusqlite::params![
            key_str,
            identity_str,
            entry.title,
            entry.author,
            entry.cover_url,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_book_cache(&self, key: CanonicalKey) -> Result<Option<BookCacheEntry>> {
    let key_str = key.as_str().to_owned();

    let raw: Option<RawBookCache> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT canonical_key, identity_json, title, author, cover_url, updated_at
             FROM book_cache WHERE canonical_key = ?1",
            rusqlite::params![key_str],
            |row| {
              Ok(RawBookCache {
                canonical_key: row.get(0)?,
                identity_json: row.get(1)?,
                title:         row.get(2)?,
                author:        row.get(3)?,
                cover_url:     row.get(4)?,
                updated_at:    row.get(5)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawBookCache::into_entry).transpose()
  }

  async fn insert_feed_event(&self, input: NewFeedEvent) -> Result<FeedEvent> {
    let event = FeedEvent {
      event_id:   Uuid::new_v4(),
      user_id:    input.user_id,
      key:        input.key,
      action:     input.action,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(event.event_id);
    let user_str   = encode_user(event.user_id);
    let key_str    = event.key.as_str().to_owned();
    let action_str = encode_action(event.action);
    let at_str     = encode_dt(event.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO feed_events (event_id, user_id, canonical_key, action, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, user_str, key_str, action_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(event)
  }

  async fn delete_feed_events(
    &self,
    user:   UserId,
    key:    CanonicalKey,
    action: EngagementAction,
  ) -> Result<u64> {
    let user_str   = encode_user(user);
    let key_str    = key.as_str().to_owned();
    let action_str = encode_action(action);

    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM feed_events
           WHERE user_id = ?1 AND canonical_key = ?2 AND action = ?3",
          rusqlite::params![user_str, key_str, action_str],
        )?;
        Ok(n)
      })
      .await?;

    Ok(removed as u64)
  }

  async fn feed_events_for_user(&self, user: UserId) -> Result<Vec<FeedEvent>> {
    let user_str = encode_user(user);

    let raws: Vec<RawFeedEvent> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT event_id, user_id, canonical_key, action, created_at
           FROM feed_events
           WHERE user_id = ?1
           ORDER BY created_at DESC, rowid DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawFeedEvent {
              event_id:      row.get(0)?,
              user_id:       row.get(1)?,
              canonical_key: row.get(2)?,
              action:        row.get(3)?,
              created_at:    row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawFeedEvent::into_event).collect()
  }
}
