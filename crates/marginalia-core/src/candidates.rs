//! Candidate key expansion.
//!
//! Rows in the store were written by several generations of clients, each
//! with its own idea of how to spell a book key. A [`CandidateSet`] lists
//! every spelling a row for one canonical key might carry. It is used to
//! build queries and to attribute rows back to keys, never to write.

use std::collections::BTreeSet;

use serde::Serialize;

use crate::{BookIdentity, BookLike, CanonicalKey, normalize, resolve};

/// Every stored-key spelling that may refer to one book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CandidateSet(BTreeSet<String>);

impl CandidateSet {
  pub fn new() -> Self { Self::default() }

  pub fn insert(&mut self, candidate: impl Into<String>) {
    self.0.insert(candidate.into());
  }

  /// Whether `stored_key` is one of the candidates, compared ASCII
  /// case-insensitively (rows exist under `ISBN:` as well as `isbn:`).
  pub fn contains(&self, stored_key: &str) -> bool {
    let stored_key = stored_key.trim();
    self.0.iter().any(|c| c.eq_ignore_ascii_case(stored_key))
  }

  pub fn union_with(&mut self, other: &CandidateSet) {
    self.0.extend(other.0.iter().cloned());
  }

  pub fn iter(&self) -> impl Iterator<Item = &str> {
    self.0.iter().map(String::as_str)
  }

  pub fn len(&self) -> usize { self.0.len() }

  pub fn is_empty(&self) -> bool { self.0.is_empty() }

  pub fn into_vec(self) -> Vec<String> { self.0.into_iter().collect() }

  /// Add every legacy spelling of `identity`, including its canonical form.
  fn add_identity(&mut self, identity: &BookIdentity) {
    self.insert(identity.to_string());
    match identity {
      BookIdentity::OpenLibraryWork(id) => {
        self.insert(format!("OL:/works/{id}"));
        self.insert(format!("ol:works/{id}"));
        self.insert(format!("ol:{id}"));
        self.insert(format!("/works/{id}"));
        self.insert(format!("works/{id}"));
        self.insert(id.clone());
      }
      BookIdentity::Isbn(isbn) => {
        self.insert(format!("ISBN:{isbn}"));
        self.insert(isbn.clone());
      }
      BookIdentity::GoogleBooksId(id) => {
        self.insert(format!("Google:{id}"));
        self.insert(id.clone());
      }
      BookIdentity::Uuid(id) => {
        self.insert(format!("UUID:{id}"));
        self.insert(id.clone());
        self.insert(id.to_ascii_uppercase());
      }
      BookIdentity::TitleAuthor { .. } | BookIdentity::Unknown => {}
    }
  }
}

impl FromIterator<String> for CandidateSet {
  fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
    Self(iter.into_iter().collect())
  }
}

/// Expand a canonical key into every spelling it may have been stored under.
/// The key itself is always a member.
pub fn expand_key(key: &CanonicalKey) -> CandidateSet {
  let mut set = CandidateSet::new();
  set.insert(key.as_str());
  set.add_identity(&key.identity());
  set
}

/// Expand raw book metadata. Unlike [`resolve`], this is permissive: every
/// identifier family present contributes its spellings, not just the winner,
/// and the resolved canonical key is included too.
pub fn expand_book(book: &BookLike) -> CandidateSet {
  let mut set = expand_key(&resolve(book));

  book
    .open_library_fields()
    .filter_map(normalize::open_library_work)
    .chain(book.generic_id().and_then(normalize::open_library_work_exact))
    .for_each(|id| set.add_identity(&BookIdentity::OpenLibraryWork(id)));
  book
    .isbn_fields()
    .filter_map(normalize::isbn)
    .for_each(|isbn| set.add_identity(&BookIdentity::Isbn(isbn)));
  book
    .google_fields()
    .filter_map(normalize::google_books_id)
    .for_each(|id| set.add_identity(&BookIdentity::GoogleBooksId(id)));
  book
    .uuid_fields()
    .filter_map(normalize::uuid)
    .for_each(|id| set.add_identity(&BookIdentity::Uuid(id)));

  set
}
