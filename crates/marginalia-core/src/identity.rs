//! Book identity and the canonical key resolver.
//!
//! A [`BookIdentity`] is derived on demand from ephemeral [`BookLike`]
//! metadata and never stored as its own row. Its string form, the
//! [`CanonicalKey`], addresses the like and comment rows that are stored.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
  BookLike, Error,
  normalize::{self, strip_prefix_ignore_case},
};

// ─── BookIdentity ────────────────────────────────────────────────────────────

/// The single identity chosen for a book.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BookIdentity {
  /// Open Library work id, e.g. `OL123W`.
  OpenLibraryWork(String),
  /// Ten or thirteen characters, hyphens removed.
  Isbn(String),
  GoogleBooksId(String),
  /// The store's own row UUID, lower-cased.
  Uuid(String),
  /// Fallback built from folded title and author text. Two spellings of the
  /// same title do not collide.
  TitleAuthor { title: String, author: String },
  /// Nothing usable was present. Never a valid write target.
  Unknown,
}

impl BookIdentity {
  /// Apply the fixed priority order to `book`. Pure and total.
  ///
  /// Curated catalog work keys win over ISBNs (which are sometimes
  /// mistyped), ISBNs over vendor and internal ids, and free text is the
  /// last resort.
  pub fn from_book(book: &BookLike) -> Self {
    if let Some(id) = normalize::first_open_library_work(book.open_library_fields())
      .or_else(|| book.generic_id().and_then(normalize::open_library_work_exact))
    {
      return Self::OpenLibraryWork(id);
    }
    if let Some(isbn) = normalize::first_isbn(book.isbn_fields()) {
      return Self::Isbn(isbn);
    }
    if let Some(id) = normalize::first_google_books_id(book.google_fields()) {
      return Self::GoogleBooksId(id);
    }
    if let Some(id) = normalize::first_uuid(book.uuid_fields()) {
      return Self::Uuid(id);
    }

    let title = book.title.as_deref().map(normalize::text_key).unwrap_or_default();
    let author = book.primary_author().map(normalize::text_key).unwrap_or_default();
    if !title.is_empty() || !author.is_empty() {
      return Self::TitleAuthor { title, author };
    }

    Self::Unknown
  }

  /// Recover an identity from a key string, accepting canonical keys and the
  /// looser legacy spellings found in stored rows. Unrecognised input maps to
  /// [`BookIdentity::Unknown`].
  pub fn parse(raw: &str) -> Self {
    let raw = raw.trim();

    if let Some(rest) = strip_prefix_ignore_case(raw, "t:")
      && let Some((title, author)) = rest.split_once("|a:")
    {
      let title = normalize::text_key(title);
      let author = normalize::text_key(author);
      if title.is_empty() && author.is_empty() {
        return Self::Unknown;
      }
      return Self::TitleAuthor { title, author };
    }
    if raw.eq_ignore_ascii_case("unknown") {
      return Self::Unknown;
    }
    if strip_prefix_ignore_case(raw, "google:").is_some() {
      return normalize::google_books_id(raw)
        .map_or(Self::Unknown, Self::GoogleBooksId);
    }
    if strip_prefix_ignore_case(raw, "uuid:").is_some() {
      return normalize::uuid(raw).map_or(Self::Unknown, Self::Uuid);
    }
    if let Some(isbn) = normalize::isbn(raw) {
      return Self::Isbn(isbn);
    }
    if let Some(id) = normalize::open_library_work(raw) {
      return Self::OpenLibraryWork(id);
    }
    if let Some(id) = normalize::uuid(raw) {
      return Self::Uuid(id);
    }

    Self::Unknown
  }

  pub fn is_unknown(&self) -> bool { matches!(self, Self::Unknown) }

  pub fn canonical_key(&self) -> CanonicalKey { CanonicalKey(self.to_string()) }
}

impl fmt::Display for BookIdentity {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::OpenLibraryWork(id) => write!(f, "ol:/works/{id}"),
      Self::Isbn(isbn) => write!(f, "isbn:{isbn}"),
      Self::GoogleBooksId(id) => write!(f, "google:{id}"),
      Self::Uuid(id) => write!(f, "uuid:{id}"),
      Self::TitleAuthor { title, author } => write!(f, "t:{title}|a:{author}"),
      Self::Unknown => f.write_str("unknown"),
    }
  }
}

// ─── CanonicalKey ────────────────────────────────────────────────────────────

/// The string serialization of a [`BookIdentity`].
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct CanonicalKey(String);

impl CanonicalKey {
  pub fn unknown() -> Self { Self("unknown".to_owned()) }

  pub fn as_str(&self) -> &str { &self.0 }

  pub fn is_unknown(&self) -> bool { self.0 == "unknown" }

  pub fn identity(&self) -> BookIdentity { BookIdentity::parse(&self.0) }
}

/// Resolve `book` to its canonical key.
pub fn resolve(book: &BookLike) -> CanonicalKey {
  BookIdentity::from_book(book).canonical_key()
}

impl fmt::Display for CanonicalKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&BookIdentity> for CanonicalKey {
  fn from(identity: &BookIdentity) -> Self { identity.canonical_key() }
}

/// Parsing re-canonicalizes: `"ISBN:978-0-14-143951-8"` becomes
/// `"isbn:9780141439518"`. Only the literal `"unknown"` may parse to the
/// unknown key.
impl FromStr for CanonicalKey {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let identity = BookIdentity::parse(s);
    if identity.is_unknown() && !s.trim().eq_ignore_ascii_case("unknown") {
      return Err(Error::UnrecognizedKey(s.to_owned()));
    }
    Ok(identity.canonical_key())
  }
}

impl TryFrom<String> for CanonicalKey {
  type Error = Error;

  fn try_from(value: String) -> Result<Self, Self::Error> { value.parse() }
}

impl From<CanonicalKey> for String {
  fn from(key: CanonicalKey) -> Self { key.0 }
}

impl AsRef<str> for CanonicalKey {
  fn as_ref(&self) -> &str { &self.0 }
}
