//! Identifier normalizers.
//!
//! Each normalizer looks at the raw values of every field that has ever
//! carried one identifier family and returns the first one that validates, in
//! its bare canonical shape. Absence is a normal outcome: none of these
//! functions fail.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::{UnicodeNormalization, char::is_combining_mark};

/// Maximum number of characters kept per title/author fallback field.
pub const TEXT_KEY_MAX_CHARS: usize = 50;

static OL_WORK_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"OL(\d+)W").unwrap());

static OL_WORK_EXACT_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(r"^(?i:ol:)?(?:/?works/)?OL(\d+)W$").unwrap()
});

static ISBN_PREFIX_REGEX: Lazy<Regex> =
  Lazy::new(|| Regex::new(r"(?i)^isbn(?:-?1[03])?[:\s]*").unwrap());

static UUID_REGEX: Lazy<Regex> = Lazy::new(|| {
  Regex::new(
    r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[1-5][0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$",
  )
  .unwrap()
});

// ─── Open Library ────────────────────────────────────────────────────────────

/// Find an Open Library work id (`OL<digits>W`) anywhere inside `raw`.
///
/// Accepts `ol:/works/OL1W`, `/works/OL1W`, `works/OL1W` and bare `OL1W`.
/// The `OL` and `W` markers are matched case-sensitively.
pub fn open_library_work(raw: &str) -> Option<String> {
  OL_WORK_REGEX
    .captures(raw)
    .map(|caps| format!("OL{}W", &caps[1]))
}

/// Like [`open_library_work`], but the whole trimmed value must be a work key.
/// Used for generic fields that may hold ids from any source.
pub fn open_library_work_exact(raw: &str) -> Option<String> {
  OL_WORK_EXACT_REGEX
    .captures(raw.trim())
    .map(|caps| format!("OL{}W", &caps[1]))
}

/// First candidate holding a recognisable Open Library work id.
pub fn first_open_library_work<'a>(
  candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
  candidates.into_iter().find_map(open_library_work)
}

// ─── ISBN ────────────────────────────────────────────────────────────────────

/// Strip an optional `isbn:` style prefix, hyphens and whitespace, then accept
/// the value only if exactly 13 digits, or exactly 10 characters of which the
/// first nine are digits and the last is a digit or `X`.
pub fn isbn(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  let body = ISBN_PREFIX_REGEX.replace(trimmed, "");
  let cleaned: String = body
    .chars()
    .filter(|c| *c != '-' && !c.is_whitespace())
    .map(|c| c.to_ascii_uppercase())
    .collect();

  let bytes = cleaned.as_bytes();
  match bytes.len() {
    13 if bytes.iter().all(u8::is_ascii_digit) => Some(cleaned),
    10 if bytes[..9].iter().all(u8::is_ascii_digit)
      && (bytes[9].is_ascii_digit() || bytes[9] == b'X') =>
    {
      Some(cleaned)
    }
    _ => None,
  }
}

/// First candidate that normalizes as an ISBN.
pub fn first_isbn<'a>(
  candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
  candidates.into_iter().find_map(isbn)
}

// ─── Google Books ────────────────────────────────────────────────────────────

/// A Google Books volume id: any trimmed, non-empty value. A leading
/// `google:` scheme is dropped so already-resolved keys round-trip.
pub fn google_books_id(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  let bare = strip_prefix_ignore_case(trimmed, "google:")
    .unwrap_or(trimmed)
    .trim();
  (!bare.is_empty()).then(|| bare.to_owned())
}

/// First candidate holding a non-empty Google Books id.
pub fn first_google_books_id<'a>(
  candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
  candidates.into_iter().find_map(google_books_id)
}

// ─── UUID ────────────────────────────────────────────────────────────────────

/// Validate the 8-4-4-4-12 hyphenated shape with an RFC version nibble (1–5)
/// and variant nibble (8, 9, a, b). Returns the lower-cased UUID.
pub fn uuid(raw: &str) -> Option<String> {
  let trimmed = raw.trim();
  let bare = strip_prefix_ignore_case(trimmed, "uuid:").unwrap_or(trimmed);
  UUID_REGEX
    .is_match(bare)
    .then(|| bare.to_ascii_lowercase())
}

/// First candidate that validates as a UUID.
pub fn first_uuid<'a>(
  candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
  candidates.into_iter().find_map(uuid)
}

// ─── Title / author ──────────────────────────────────────────────────────────

/// Fold free text into a fallback key fragment: lower-case, decompose and drop
/// combining marks, keep alphanumerics only, truncate to
/// [`TEXT_KEY_MAX_CHARS`].
pub fn text_key(raw: &str) -> String {
  raw
    .to_lowercase()
    .nfd()
    .filter(|c| !is_combining_mark(*c))
    .filter(|c| c.is_alphanumeric())
    .take(TEXT_KEY_MAX_CHARS)
    .collect()
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

pub(crate) fn strip_prefix_ignore_case<'a>(
  value: &'a str,
  prefix: &str,
) -> Option<&'a str> {
  let head = value.get(..prefix.len())?;
  head
    .eq_ignore_ascii_case(prefix)
    .then(|| &value[prefix.len()..])
}
