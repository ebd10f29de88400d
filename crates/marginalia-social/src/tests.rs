//! Engine tests against an in-memory SQLite store behind a wrapper that
//! counts calls and injects faults.

use std::sync::{
  Arc, Mutex,
  atomic::{AtomicUsize, Ordering},
};

use chrono::{DateTime, TimeDelta, Utc};
use marginalia_core::{
  BookLike, CanonicalKey,
  record::{
    BookCacheEntry, CommentRecord, EngagementAction, FeedEvent, LikeRecord,
    NewComment, NewFeedEvent, UserId,
  },
  store::{SocialStore, StoreError},
};
use marginalia_store_sqlite::SqliteStore;

use crate::{
  DeleteMode, EngineConfig, Error, Ledger, LikeState, clock::ManualClock,
};

// ─── Fault-injecting store ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default)]
struct Faults {
  /// `active_likes_for_user` reports nothing.
  stale_user_reads: bool,
  fail_reads:       bool,
  fail_like_writes: bool,
  fail_side_rows:   bool,
}

#[derive(Debug, thiserror::Error)]
enum FaultError {
  #[error(transparent)]
  Inner(#[from] marginalia_store_sqlite::Error),
  #[error("injected fault: {0}")]
  Injected(&'static str),
}

impl StoreError for FaultError {
  fn is_unique_violation(&self) -> bool {
    match self {
      Self::Inner(e) => e.is_unique_violation(),
      Self::Injected(_) => false,
    }
  }
}

struct FaultStore {
  inner:  SqliteStore,
  calls:  AtomicUsize,
  faults: Mutex<Faults>,
}

impl FaultStore {
  async fn new() -> Arc<Self> {
    Arc::new(Self {
      inner:  SqliteStore::open_in_memory().await.unwrap(),
      calls:  AtomicUsize::new(0),
      faults: Mutex::new(Faults::default()),
    })
  }

  fn set_faults(&self, faults: Faults) { *self.faults.lock().unwrap() = faults; }

  fn faults(&self) -> Faults {
    self.calls.fetch_add(1, Ordering::SeqCst);
    *self.faults.lock().unwrap()
  }

  fn calls(&self) -> usize { self.calls.load(Ordering::SeqCst) }
}

impl SocialStore for FaultStore {
  type Error = FaultError;

  async fn active_likes(&self, keys: Vec<String>) -> Result<Vec<LikeRecord>, FaultError> {
    if self.faults().fail_reads {
      return Err(FaultError::Injected("active_likes"));
    }
    Ok(self.inner.active_likes(keys).await?)
  }

  async fn active_likes_for_user(
    &self,
    user: UserId,
    keys: Vec<String>,
  ) -> Result<Vec<LikeRecord>, FaultError> {
    let faults = self.faults();
    if faults.fail_reads {
      return Err(FaultError::Injected("active_likes_for_user"));
    }
    if faults.stale_user_reads {
      return Ok(Vec::new());
    }
    Ok(self.inner.active_likes_for_user(user, keys).await?)
  }

  async fn insert_like(&self, user: UserId, stored_key: String) -> Result<LikeRecord, FaultError> {
    if self.faults().fail_like_writes {
      return Err(FaultError::Injected("insert_like"));
    }
    Ok(self.inner.insert_like(user, stored_key).await?)
  }

  async fn delete_like(&self, user: UserId, stored_key: String) -> Result<u64, FaultError> {
    if self.faults().fail_like_writes {
      return Err(FaultError::Injected("delete_like"));
    }
    Ok(self.inner.delete_like(user, stored_key).await?)
  }

  async fn soft_delete_like(
    &self,
    user: UserId,
    stored_key: String,
    at: DateTime<Utc>,
  ) -> Result<u64, FaultError> {
    if self.faults().fail_like_writes {
      return Err(FaultError::Injected("soft_delete_like"));
    }
    Ok(self.inner.soft_delete_like(user, stored_key, at).await?)
  }

  async fn comments(&self, keys: Vec<String>) -> Result<Vec<CommentRecord>, FaultError> {
    if self.faults().fail_reads {
      return Err(FaultError::Injected("comments"));
    }
    Ok(self.inner.comments(keys).await?)
  }

  async fn insert_comment(&self, input: NewComment) -> Result<CommentRecord, FaultError> {
    self.faults();
    Ok(self.inner.insert_comment(input).await?)
  }

  async fn upsert_book_cache(&self, entry: BookCacheEntry) -> Result<(), FaultError> {
    if self.faults().fail_side_rows {
      return Err(FaultError::Injected("upsert_book_cache"));
    }
    Ok(self.inner.upsert_book_cache(entry).await?)
  }

  async fn get_book_cache(
    &self,
    key: CanonicalKey,
  ) -> Result<Option<BookCacheEntry>, FaultError> {
    self.faults();
    Ok(self.inner.get_book_cache(key).await?)
  }

  async fn insert_feed_event(&self, input: NewFeedEvent) -> Result<FeedEvent, FaultError> {
    if self.faults().fail_side_rows {
      return Err(FaultError::Injected("insert_feed_event"));
    }
    Ok(self.inner.insert_feed_event(input).await?)
  }

  async fn delete_feed_events(
    &self,
    user: UserId,
    key: CanonicalKey,
    action: EngagementAction,
  ) -> Result<u64, FaultError> {
    if self.faults().fail_side_rows {
      return Err(FaultError::Injected("delete_feed_events"));
    }
    Ok(self.inner.delete_feed_events(user, key, action).await?)
  }

  async fn feed_events_for_user(&self, user: UserId) -> Result<Vec<FeedEvent>, FaultError> {
    self.faults();
    Ok(self.inner.feed_events_for_user(user).await?)
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

struct Harness {
  store:  Arc<FaultStore>,
  clock:  Arc<ManualClock>,
  ledger: Ledger<FaultStore>,
}

async fn harness_with(delete_mode: DeleteMode) -> Harness {
  let store = FaultStore::new().await;
  let clock = Arc::new(ManualClock::new(Utc::now()));
  let config = EngineConfig { delete_mode, ..EngineConfig::default() };
  let ledger = Ledger::with_clock(store.clone(), &config, clock.clone());
  Harness { store, clock, ledger }
}

async fn harness() -> Harness { harness_with(DeleteMode::Soft).await }

fn jane_eyre() -> BookLike {
  BookLike {
    isbn13: Some("978-0-14-143951-8".into()),
    title: Some("Jane Eyre".into()),
    author: Some("Charlotte Brontë".into()),
    cover_url: Some("https://covers.example/jane.jpg".into()),
    ..BookLike::default()
  }
}

fn jane_key() -> CanonicalKey { "isbn:9780141439518".parse().unwrap() }

fn middlemarch() -> BookLike {
  BookLike { openlibrary_key: Some("/works/OL1W".into()), ..BookLike::default() }
}

fn middlemarch_key() -> CanonicalKey { "ol:/works/OL1W".parse().unwrap() }

async fn seed_like(h: &Harness, user: UserId, stored_key: &str) {
  h.store.inner.insert_like(user, stored_key.to_owned()).await.unwrap();
}

async fn like_count(h: &Harness, key: &CanonicalKey) -> u64 {
  let counts = h.ledger.counts.aggregate(std::slice::from_ref(key), None).await;
  counts[key].likes
}

// ─── Entry guards ────────────────────────────────────────────────────────────

#[tokio::test]
async fn unknown_book_is_rejected_before_any_io() {
  let h = harness().await;
  let book = BookLike { title: Some("   ".into()), ..BookLike::default() };

  let err = h.ledger.likes.toggle(Some(UserId::new_v4()), &book).await.unwrap_err();
  assert!(matches!(err, Error::InvalidIdentity));

  let err = h.ledger.comments.add(Some(UserId::new_v4()), &book, "hi").await.unwrap_err();
  assert!(matches!(err, Error::InvalidIdentity));
  assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn anonymous_caller_is_rejected_before_any_io() {
  let h = harness().await;

  let err = h.ledger.likes.toggle(None, &jane_eyre()).await.unwrap_err();
  assert!(matches!(err, Error::NotAuthenticated));

  let err = h.ledger.comments.add(None, &jane_eyre(), "hi").await.unwrap_err();
  assert!(matches!(err, Error::NotAuthenticated));
  assert_eq!(h.store.calls(), 0);
}

// ─── Toggle ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn toggle_on_unliked_book_adds_one_like() {
  let h = harness().await;
  seed_like(&h, UserId::new_v4(), "isbn:9780141439518").await;
  seed_like(&h, UserId::new_v4(), "9780141439518").await;
  assert_eq!(like_count(&h, &jane_key()).await, 2);

  let user = UserId::new_v4();
  let outcome = h.ledger.likes.toggle(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!(outcome.state, LikeState::Liked);
  assert_eq!(outcome.delta, 1);
  assert_eq!(outcome.key, jane_key());
  assert_eq!(like_count(&h, &jane_key()).await, 3);

  // The new row is written under the canonical key.
  let mine = h
    .store
    .inner
    .active_likes_for_user(user, vec!["isbn:9780141439518".into()])
    .await
    .unwrap();
  assert_eq!(mine.len(), 1);
  assert_eq!(mine[0].stored_key, "isbn:9780141439518");
}

#[tokio::test]
async fn stale_read_duplicate_is_reported_as_liked_without_delta() {
  let h = harness().await;
  let user = UserId::new_v4();
  seed_like(&h, user, "isbn:9780141439518").await;

  h.store.set_faults(Faults { stale_user_reads: true, ..Faults::default() });
  let outcome = h.ledger.likes.toggle(Some(user), &jane_eyre()).await.unwrap();
  h.store.set_faults(Faults::default());

  assert_eq!(outcome.state, LikeState::Liked);
  assert_eq!(outcome.delta, 0);
  assert_eq!(like_count(&h, &jane_key()).await, 1);
}

#[tokio::test]
async fn toggle_twice_returns_to_unliked() {
  let h = harness().await;
  let user = UserId::new_v4();

  h.ledger.likes.toggle(Some(user), &jane_eyre()).await.unwrap();
  let outcome = h.ledger.likes.toggle(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!(outcome.state, LikeState::Unliked);
  assert_eq!(outcome.delta, -1);
  assert_eq!(like_count(&h, &jane_key()).await, 0);
}

#[tokio::test]
async fn unlike_removes_every_legacy_spelling() {
  let h = harness_with(DeleteMode::Hard).await;
  let user = UserId::new_v4();
  seed_like(&h, user, "9780141439518").await;
  seed_like(&h, user, "ISBN:9780141439518").await;

  let outcome = h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!(outcome.state, LikeState::Unliked);
  assert_eq!(outcome.delta, -1);

  let left = h
    .store
    .inner
    .active_likes(vec!["9780141439518".into(), "ISBN:9780141439518".into()])
    .await
    .unwrap();
  assert!(left.is_empty());
}

#[tokio::test]
async fn toggle_agrees_with_counts_for_multi_identifier_book() {
  let h = harness().await;
  let user = UserId::new_v4();
  // An older like under the book's ISBN, which its work key does not cover.
  seed_like(&h, user, "isbn:9780141439518").await;

  let book = BookLike {
    openlibrary_key: Some("/works/OL1W".into()),
    isbn13: Some("9780141439518".into()),
    ..BookLike::default()
  };
  let key = middlemarch_key();
  let before = h.ledger.counts.aggregate(std::slice::from_ref(&key), Some(user)).await;
  assert_eq!(before[&key].likes, 0);
  assert_eq!(before[&key].is_liked_by_user, Some(false));

  let outcome = h.ledger.likes.toggle(Some(user), &book).await.unwrap();
  assert_eq!(outcome.key, key);
  assert_eq!(outcome.state, LikeState::Liked);
  assert_eq!(outcome.delta, 1);

  let after = h.ledger.counts.aggregate(std::slice::from_ref(&key), Some(user)).await;
  assert_eq!(before[&key].likes as i64 + outcome.delta, after[&key].likes as i64);
  assert_eq!(after[&key].is_liked_by_user, Some(true));
  assert_eq!(like_count(&h, &jane_key()).await, 1);
}

#[tokio::test]
async fn explicit_intents_are_idempotent() {
  let h = harness().await;
  let user = UserId::new_v4();

  let first = h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  let again = h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!((first.state, first.delta), (LikeState::Liked, 1));
  assert_eq!((again.state, again.delta), (LikeState::Liked, 0));

  let gone = h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  let still = h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!((gone.state, gone.delta), (LikeState::Unliked, -1));
  assert_eq!((still.state, still.delta), (LikeState::Unliked, 0));
}

#[tokio::test]
async fn soft_delete_keeps_row_and_allows_relike() {
  let h = harness_with(DeleteMode::Soft).await;
  let user = UserId::new_v4();

  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!(like_count(&h, &jane_key()).await, 0);

  let outcome = h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  assert_eq!(outcome.delta, 1);
  assert_eq!(like_count(&h, &jane_key()).await, 1);
}

#[tokio::test]
async fn concurrent_likes_by_one_user_store_one_row() {
  let h = harness().await;
  let user = UserId::new_v4();
  let book = jane_eyre();

  let (a, b) = tokio::join!(
    h.ledger.likes.like(Some(user), &book),
    h.ledger.likes.like(Some(user), &book),
  );
  let (a, b) = (a.unwrap(), b.unwrap());
  assert_eq!(a.state, LikeState::Liked);
  assert_eq!(b.state, LikeState::Liked);
  assert_eq!(a.delta + b.delta, 1);
  assert_eq!(like_count(&h, &jane_key()).await, 1);
}

#[tokio::test]
async fn failed_write_surfaces_and_changes_nothing() {
  let h = harness().await;
  h.store.set_faults(Faults { fail_like_writes: true, ..Faults::default() });

  let err = h.ledger.likes.toggle(Some(UserId::new_v4()), &jane_eyre()).await.unwrap_err();
  assert!(matches!(err, Error::StoreUnavailable(_)));

  h.store.set_faults(Faults::default());
  assert_eq!(like_count(&h, &jane_key()).await, 0);
}

// ─── Side effects ────────────────────────────────────────────────────────────

#[tokio::test]
async fn like_records_feed_event_and_caches_book() {
  let h = harness().await;
  let user = UserId::new_v4();

  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.side_effects().flush().await;

  let events = h.store.inner.feed_events_for_user(user).await.unwrap();
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].action, EngagementAction::Like);
  assert_eq!(events[0].key, jane_key());

  let cached = h.store.inner.get_book_cache(jane_key()).await.unwrap().unwrap();
  assert_eq!(cached.title.as_deref(), Some("Jane Eyre"));
  assert_eq!(cached.author.as_deref(), Some("Charlotte Brontë"));

  h.clock.advance(TimeDelta::seconds(1));
  h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.side_effects().flush().await;
  assert!(h.store.inner.feed_events_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn rapid_relike_is_throttled() {
  let h = harness().await;
  let user = UserId::new_v4();

  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.side_effects().flush().await;

  // First like recorded, unlike retracted it, relike suppressed.
  assert!(h.store.inner.feed_events_for_user(user).await.unwrap().is_empty());
  assert_eq!(like_count(&h, &jane_key()).await, 1);

  h.clock.advance(TimeDelta::milliseconds(500));
  h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.side_effects().flush().await;
  assert_eq!(h.store.inner.feed_events_for_user(user).await.unwrap().len(), 1);
}

#[tokio::test]
async fn unlike_inside_throttle_window_still_retracts_event() {
  let h = harness().await;
  let user = UserId::new_v4();

  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.clock.advance(TimeDelta::milliseconds(50));
  h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  h.clock.advance(TimeDelta::milliseconds(370));
  h.ledger.likes.like(Some(user), &jane_eyre()).await.unwrap();
  h.clock.advance(TimeDelta::milliseconds(10));
  let outcome = h.ledger.likes.unlike(Some(user), &jane_eyre()).await.unwrap();
  h.ledger.side_effects().flush().await;

  assert_eq!(outcome.state, LikeState::Unliked);
  assert!(h.store.inner.feed_events_for_user(user).await.unwrap().is_empty());
}

#[tokio::test]
async fn side_effect_failure_does_not_fail_the_like() {
  let h = harness().await;
  h.store.set_faults(Faults { fail_side_rows: true, ..Faults::default() });

  let outcome = h.ledger.likes.like(Some(UserId::new_v4()), &jane_eyre()).await.unwrap();
  assert_eq!(outcome.state, LikeState::Liked);

  h.ledger.side_effects().flush().await;
  assert_eq!(h.ledger.side_effects().failed_count(), 2);

  h.store.set_faults(Faults::default());
  assert_eq!(like_count(&h, &jane_key()).await, 1);
}

// ─── Aggregation ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn legacy_spellings_are_counted_together() {
  let h = harness().await;
  seed_like(&h, UserId::new_v4(), "ol:OL1W").await;
  seed_like(&h, UserId::new_v4(), "/works/OL1W").await;
  seed_like(&h, UserId::new_v4(), "OL:/works/OL1W").await;
  seed_like(&h, UserId::new_v4(), "OL1W").await;
  // A different work.
  seed_like(&h, UserId::new_v4(), "ol:OL2W").await;

  let counts = h.ledger.counts.aggregate(&[middlemarch_key()], None).await;
  let c = &counts[&middlemarch_key()];
  assert_eq!(c.likes, 4);
  assert_eq!(c.comments, 0);
  assert_eq!(c.is_liked_by_user, None);
}

#[tokio::test]
async fn isbn_spellings_from_three_users_count_three() {
  let h = harness().await;
  seed_like(&h, UserId::new_v4(), "9780141439518").await;
  seed_like(&h, UserId::new_v4(), "isbn:9780141439518").await;
  seed_like(&h, UserId::new_v4(), "ISBN:9780141439518").await;

  let counts = h.ledger.counts.aggregate(&[jane_key()], None).await;
  assert_eq!(counts[&jane_key()].likes, 3);
  assert_eq!(counts[&jane_key()].comments, 0);
}

#[tokio::test]
async fn every_requested_key_gets_an_entry() {
  let h = harness().await;
  let user = UserId::new_v4();
  seed_like(&h, user, "isbn:9780141439518").await;

  let keys = [jane_key(), middlemarch_key(), CanonicalKey::unknown()];
  let counts = h.ledger.counts.aggregate(&keys, Some(user)).await;

  assert_eq!(counts.len(), 3);
  assert_eq!(counts[&jane_key()].likes, 1);
  assert_eq!(counts[&jane_key()].is_liked_by_user, Some(true));
  assert_eq!(counts[&middlemarch_key()].likes, 0);
  assert_eq!(counts[&middlemarch_key()].is_liked_by_user, Some(false));
  assert_eq!(counts[&CanonicalKey::unknown()].likes, 0);
}

#[tokio::test]
async fn overlapping_candidates_attribute_to_first_key() {
  let h = harness().await;
  let id = "3f2504e0-4f89-41d3-9a0c-0305e82c3301";
  seed_like(&h, UserId::new_v4(), id).await;

  let uuid_key: CanonicalKey = format!("uuid:{id}").parse().unwrap();
  let google_key: CanonicalKey = format!("google:{id}").parse().unwrap();
  let counts = h
    .ledger
    .counts
    .aggregate(&[uuid_key.clone(), google_key.clone()], None)
    .await;

  assert_eq!(counts[&uuid_key].likes, 1);
  assert_eq!(counts[&google_key].likes, 0);
}

#[tokio::test]
async fn comments_are_counted_across_spellings() {
  let h = harness().await;
  let user = UserId::new_v4();
  h.ledger.comments.add(Some(user), &middlemarch(), "Dorothea!").await.unwrap();
  h.store
    .inner
    .insert_comment(NewComment {
      user_id: user,
      key:     middlemarch_key(),
      content: "again".into(),
    })
    .await
    .unwrap();

  let counts = h.ledger.counts.aggregate(&[middlemarch_key()], None).await;
  assert_eq!(counts[&middlemarch_key()].comments, 2);
}

#[tokio::test]
async fn aggregation_failure_yields_empty_map() {
  let h = harness().await;
  seed_like(&h, UserId::new_v4(), "isbn:9780141439518").await;
  h.store.set_faults(Faults { fail_reads: true, ..Faults::default() });

  let counts = h.ledger.counts.aggregate(&[jane_key()], None).await;
  assert!(counts.is_empty());
  assert!(matches!(
    h.ledger.counts.try_aggregate(&[jane_key()], None).await,
    Err(Error::StoreUnavailable(_)),
  ));
}

#[tokio::test]
async fn large_batches_are_counted() {
  let h = harness().await;
  seed_like(&h, UserId::new_v4(), "9780141439518").await;

  let mut keys: Vec<CanonicalKey> = (0..5000)
    .map(|i| format!("isbn:978{i:010}").parse().unwrap())
    .collect();
  keys.push(jane_key());

  let counts = h.ledger.counts.try_aggregate(&keys, None).await.unwrap();
  assert_eq!(counts.len(), 5001);
  assert_eq!(counts[&jane_key()].likes, 1);
}

// ─── Comments ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn empty_comment_is_rejected_before_any_io() {
  let h = harness().await;
  let err = h
    .ledger
    .comments
    .add(Some(UserId::new_v4()), &jane_eyre(), "  \n ")
    .await
    .unwrap_err();
  assert!(matches!(err, Error::EmptyComment));
  assert_eq!(h.store.calls(), 0);
}

#[tokio::test]
async fn comments_list_newest_first_and_emit_events() {
  let h = harness().await;
  let user = UserId::new_v4();

  h.ledger.comments.add(Some(user), &jane_eyre(), "  Reader, I married him.  ").await.unwrap();
  h.ledger.comments.add(Some(user), &jane_eyre(), "Second read").await.unwrap();

  let listed = h.ledger.comments.list(&jane_key()).await.unwrap();
  assert_eq!(listed.len(), 2);
  assert_eq!(listed[0].content, "Second read");
  assert_eq!(listed[1].content, "Reader, I married him.");
  assert_eq!(listed[1].stored_key, "isbn:9780141439518");

  h.ledger.side_effects().flush().await;
  let events = h.store.inner.feed_events_for_user(user).await.unwrap();
  assert_eq!(events.len(), 2);
  assert!(events.iter().all(|e| e.action == EngagementAction::Comment));
}

#[tokio::test]
async fn listing_unknown_key_is_empty() {
  let h = harness().await;
  assert!(h.ledger.comments.list(&CanonicalKey::unknown()).await.unwrap().is_empty());
  assert_eq!(h.store.calls(), 0);
}
