//! Adding and listing comments.

use std::{collections::HashSet, sync::Arc};

use marginalia_core::{
  BookIdentity, BookLike, CanonicalKey, expand_key,
  record::{CommentRecord, EngagementAction, NewComment, NewFeedEvent, UserId},
  store::SocialStore,
};

use crate::{
  Error, Result,
  clock::Clock,
  side_effects::{SideEffect, SideEffectQueue},
  toggle::cache_entry,
};

pub struct CommentService<S> {
  store:   Arc<S>,
  clock:   Arc<dyn Clock>,
  effects: SideEffectQueue,
}

impl<S: SocialStore> CommentService<S> {
  pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, effects: SideEffectQueue) -> Self {
    Self { store, clock, effects }
  }

  /// Store a comment by `user` on `book` under its canonical key.
  pub async fn add(
    &self,
    user: Option<UserId>,
    book: &BookLike,
    content: &str,
  ) -> Result<CommentRecord> {
    let identity = BookIdentity::from_book(book);
    if identity.is_unknown() {
      return Err(Error::InvalidIdentity);
    }
    let user = user.ok_or(Error::NotAuthenticated)?;
    let content = content.trim();
    if content.is_empty() {
      return Err(Error::EmptyComment);
    }
    let key = identity.canonical_key();

    let comment = self
      .store
      .insert_comment(NewComment {
        user_id: user,
        key:     key.clone(),
        content: content.to_owned(),
      })
      .await
      .map_err(Error::store)?;

    tracing::info!(%user, %key, "comment added");
    self.effects.enqueue(SideEffect::CacheBook(cache_entry(
      key.clone(),
      identity,
      book,
      self.clock.now(),
    )));
    self.effects.enqueue(SideEffect::RecordEvent(NewFeedEvent {
      user_id: user,
      key,
      action: EngagementAction::Comment,
    }));
    Ok(comment)
  }

  /// Every comment on `key` under any of its spellings, newest first.
  pub async fn list(&self, key: &CanonicalKey) -> Result<Vec<CommentRecord>> {
    if key.is_unknown() {
      return Ok(Vec::new());
    }
    let mut comments = self
      .store
      .comments(expand_key(key).into_vec())
      .await
      .map_err(Error::store)?;

    let mut seen = HashSet::new();
    comments.retain(|c| c.comment_id.is_none_or(|id| seen.insert(id)));
    comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(comments)
  }
}
