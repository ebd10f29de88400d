//! SQL schema for the Marginalia SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- stored_key keeps whatever spelling the writer used; NOCASE makes both the
-- IN filters and the active-like uniqueness ignore ASCII case.
CREATE TABLE IF NOT EXISTS likes (
    like_id     TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    stored_key  TEXT NOT NULL COLLATE NOCASE,
    created_at  TEXT NOT NULL,
    deleted_at  TEXT                -- set by soft delete; NULL while active
);

-- At most one active like per (user, stored key).
CREATE UNIQUE INDEX IF NOT EXISTS likes_active_uniq
    ON likes(user_id, stored_key) WHERE deleted_at IS NULL;
CREATE INDEX IF NOT EXISTS likes_key_idx ON likes(stored_key);

CREATE TABLE IF NOT EXISTS comments (
    comment_id  TEXT PRIMARY KEY,
    user_id     TEXT NOT NULL,
    stored_key  TEXT NOT NULL COLLATE NOCASE,
    content     TEXT NOT NULL,
    created_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS comments_key_idx ON comments(stored_key);

-- Denormalized metadata for liked books, keyed by canonical key.
CREATE TABLE IF NOT EXISTS book_cache (
    canonical_key  TEXT PRIMARY KEY,
    identity_json  TEXT NOT NULL,
    title          TEXT,
    author         TEXT,
    cover_url      TEXT,
    updated_at     TEXT NOT NULL
);

-- Append-only activity feed.
CREATE TABLE IF NOT EXISTS feed_events (
    event_id       TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL,
    canonical_key  TEXT NOT NULL,
    action         TEXT NOT NULL,    -- 'like' | 'comment'
    created_at     TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS feed_events_user_idx ON feed_events(user_id);

PRAGMA user_version = 1;
";
