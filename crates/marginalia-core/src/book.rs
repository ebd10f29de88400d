//! [`BookLike`]: the loosely-populated book metadata callers hand us.
//!
//! Book objects reach this subsystem from several catalog sources and from
//! rows written by older clients, so the same identifier has lived under
//! different field names over time. Every historically supported name is an
//! explicit optional field here; the resolver decides which one wins.

use serde::{Deserialize, Serialize};

/// Ephemeral book metadata. Never persisted as-is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookLike {
  // ── Open Library ──────────────────────────────────────────────────────
  pub openlibrary_key: Option<String>,
  pub ol_key:          Option<String>,
  pub work_key:        Option<String>,
  /// Open Library search documents put the work path here.
  pub key:             Option<String>,

  // ── ISBN ──────────────────────────────────────────────────────────────
  pub isbn13:  Option<String>,
  pub isbn_13: Option<String>,
  pub isbn10:  Option<String>,
  pub isbn_10: Option<String>,
  pub isbn:    Option<String>,

  // ── Google Books ──────────────────────────────────────────────────────
  pub google_books_id: Option<String>,
  pub google_id:       Option<String>,
  pub volume_id:       Option<String>,

  // ── Internal row ids ──────────────────────────────────────────────────
  /// The store's own UUID for a book row.
  pub book_uuid: Option<String>,
  pub uuid:      Option<String>,
  /// Generic id; only trusted when it independently validates.
  pub id:        Option<String>,

  // ── Descriptive ───────────────────────────────────────────────────────
  pub title:       Option<String>,
  pub author:      Option<String>,
  pub author_name: Option<String>,
  pub authors:     Vec<String>,
  pub cover_url:   Option<String>,
}

fn present<'a, const N: usize>(
  fields: [&'a Option<String>; N],
) -> impl Iterator<Item = &'a str> {
  fields.into_iter().filter_map(Option::as_deref)
}

impl BookLike {
  /// Fields dedicated to an Open Library work key, in lookup order. The
  /// generic `id` is not among them; see [`BookLike::generic_id`].
  pub fn open_library_fields(&self) -> impl Iterator<Item = &str> {
    present([&self.openlibrary_key, &self.ol_key, &self.work_key, &self.key])
  }

  /// The generic `id` field, which only counts as an Open Library work key
  /// when the whole value is one.
  pub fn generic_id(&self) -> Option<&str> { self.id.as_deref() }

  /// ISBN-13 fields first, then ISBN-10, then the generic `isbn` field.
  pub fn isbn_fields(&self) -> impl Iterator<Item = &str> {
    present([
      &self.isbn13,
      &self.isbn_13,
      &self.isbn10,
      &self.isbn_10,
      &self.isbn,
    ])
  }

  pub fn google_fields(&self) -> impl Iterator<Item = &str> {
    present([&self.google_books_id, &self.google_id, &self.volume_id])
  }

  /// UUID-typed internal id fields, followed by the generic `id`.
  pub fn uuid_fields(&self) -> impl Iterator<Item = &str> {
    present([&self.book_uuid, &self.uuid, &self.id])
  }

  /// The single author name used for the title/author fallback: the first
  /// non-blank of `author`, `author_name`, then the `authors` list.
  pub fn primary_author(&self) -> Option<&str> {
    present([&self.author, &self.author_name])
      .chain(self.authors.iter().map(String::as_str))
      .find(|name| !name.trim().is_empty())
  }
}
