//! The like state transition.
//!
//! Current state is re-read from the store on every call rather than taken
//! from the caller, over the same candidate spellings the aggregator counts.
//! Removal sweeps every such spelling the user has an active like under;
//! insertion always writes the canonical key. A duplicate insert means
//! another request got there first and is reported as success.

use std::sync::Arc;

use chrono::Utc;
use marginalia_core::{
  BookIdentity, BookLike, CanonicalKey, expand_key,
  record::{BookCacheEntry, EngagementAction, LikeRecord, NewFeedEvent, UserId},
  store::{SocialStore, StoreError},
};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  clock::Clock,
  side_effects::{SideEffect, SideEffectQueue},
  throttle::Throttle,
};

/// How an unlike removes rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
  /// Physically delete the row.
  Hard,
  /// Stamp `deleted_at` and keep the row.
  #[default]
  Soft,
}

/// What the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeIntent {
  Toggle,
  Like,
  Unlike,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LikeState {
  Unliked,
  Liked,
}

/// Verified result of a like transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleOutcome {
  pub key:   CanonicalKey,
  pub state: LikeState,
  /// Change this call made to the book's like count: -1, 0 or +1.
  pub delta: i64,
}

pub struct LikeEngine<S> {
  store:       Arc<S>,
  clock:       Arc<dyn Clock>,
  throttle:    Throttle,
  effects:     SideEffectQueue,
  delete_mode: DeleteMode,
}

impl<S: SocialStore> LikeEngine<S> {
  pub fn new(
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    throttle: Throttle,
    effects: SideEffectQueue,
    delete_mode: DeleteMode,
  ) -> Self {
    Self { store, clock, throttle, effects, delete_mode }
  }

  pub async fn toggle(
    &self,
    user: Option<UserId>,
    book: &BookLike,
  ) -> Result<ToggleOutcome> {
    self.apply(user, book, LikeIntent::Toggle).await
  }

  pub async fn like(&self, user: Option<UserId>, book: &BookLike) -> Result<ToggleOutcome> {
    self.apply(user, book, LikeIntent::Like).await
  }

  pub async fn unlike(
    &self,
    user: Option<UserId>,
    book: &BookLike,
  ) -> Result<ToggleOutcome> {
    self.apply(user, book, LikeIntent::Unlike).await
  }

  /// Move `user`'s like of `book` toward `intent` and report the verified
  /// resulting state.
  pub async fn apply(
    &self,
    user: Option<UserId>,
    book: &BookLike,
    intent: LikeIntent,
  ) -> Result<ToggleOutcome> {
    let identity = BookIdentity::from_book(book);
    if identity.is_unknown() {
      return Err(Error::InvalidIdentity);
    }
    let user = user.ok_or(Error::NotAuthenticated)?;
    let key = identity.canonical_key();

    let active = self
      .store
      .active_likes_for_user(user, expand_key(&key).into_vec())
      .await
      .map_err(Error::store)?;
    let liked = active.iter().any(LikeRecord::is_active);

    let want_liked = match intent {
      LikeIntent::Toggle => !liked,
      LikeIntent::Like => true,
      LikeIntent::Unlike => false,
    };

    match (liked, want_liked) {
      (true, true) => Ok(outcome(key, LikeState::Liked, 0)),
      (false, false) => Ok(outcome(key, LikeState::Unliked, 0)),
      (true, false) => self.remove(user, key, active).await,
      (false, true) => self.insert(user, key, identity, book).await,
    }
  }

  async fn remove(
    &self,
    user: UserId,
    key: CanonicalKey,
    active: Vec<LikeRecord>,
  ) -> Result<ToggleOutcome> {
    let mut spellings: Vec<String> = Vec::new();
    for like in active.into_iter().filter(LikeRecord::is_active) {
      if !spellings.iter().any(|s| s.eq_ignore_ascii_case(&like.stored_key)) {
        spellings.push(like.stored_key);
      }
    }

    let mut removed = 0;
    for stored_key in spellings {
      removed += match self.delete_mode {
        DeleteMode::Hard => self.store.delete_like(user, stored_key).await,
        DeleteMode::Soft => {
          self
            .store
            .soft_delete_like(user, stored_key, self.clock.now())
            .await
        }
      }
      .map_err(Error::store)?;
    }

    if removed == 0 {
      // A concurrent unlike already cleared it.
      tracing::debug!(%user, %key, "like already removed");
      return Ok(outcome(key, LikeState::Unliked, 0));
    }

    tracing::info!(%user, %key, removed, "like removed");
    // Retractions bypass the throttle.
    self.effects.enqueue(SideEffect::RetractEvents {
      user_id: user,
      key:     key.clone(),
      action:  EngagementAction::Like,
    });
    Ok(outcome(key, LikeState::Unliked, -1))
  }

  async fn insert(
    &self,
    user: UserId,
    key: CanonicalKey,
    identity: BookIdentity,
    book: &BookLike,
  ) -> Result<ToggleOutcome> {
    match self.store.insert_like(user, key.as_str().to_owned()).await {
      Ok(_) => {}
      Err(e) if e.is_unique_violation() => {
        tracing::debug!(%user, %key, "duplicate like absorbed");
        return Ok(outcome(key, LikeState::Liked, 0));
      }
      Err(e) => return Err(Error::store(e)),
    }

    tracing::info!(%user, %key, "like added");
    if self.throttle.try_acquire(&throttle_key(user, &key)) {
      self.effects.enqueue(SideEffect::CacheBook(cache_entry(
        key.clone(),
        identity,
        book,
        self.clock.now(),
      )));
      self.effects.enqueue(SideEffect::RecordEvent(NewFeedEvent {
        user_id: user,
        key:     key.clone(),
        action:  EngagementAction::Like,
      }));
    }
    Ok(outcome(key, LikeState::Liked, 1))
  }
}

fn outcome(key: CanonicalKey, state: LikeState, delta: i64) -> ToggleOutcome {
  ToggleOutcome { key, state, delta }
}

fn throttle_key(user: UserId, key: &CanonicalKey) -> String {
  format!("{user}|{key}|like")
}

fn non_blank(value: Option<&str>) -> Option<String> {
  value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}

pub(crate) fn cache_entry(
  key: CanonicalKey,
  identity: BookIdentity,
  book: &BookLike,
  now: chrono::DateTime<Utc>,
) -> BookCacheEntry {
  BookCacheEntry {
    key,
    identity,
    title: non_blank(book.title.as_deref()),
    author: non_blank(book.primary_author()),
    cover_url: non_blank(book.cover_url.as_deref()),
    updated_at: now,
  }
}
