//! Batch count aggregation across every spelling of every requested book.
//!
//! One request resolves counts for many books with a fixed number of store
//! round-trips: every requested key is expanded into its candidate spellings,
//! the union is queried once per relation, and each returned row is attributed
//! to the first requested key whose candidates contain its stored key.

use std::{
  collections::{HashMap, HashSet},
  sync::Arc,
};

use marginalia_core::{
  CandidateSet, CanonicalKey, expand_key,
  record::{CommentRecord, LikeRecord, UserId},
  store::SocialStore,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{Error, Result};

/// Engagement totals for one book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SocialCounts {
  pub likes:            u64,
  pub comments:         u64,
  /// `None` when the request carried no user.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub is_liked_by_user: Option<bool>,
}

/// Identity used to count a row at most once per relation.
#[derive(Debug, PartialEq, Eq, Hash)]
enum RowIdentity {
  Like(Uuid),
  /// Rows without an id are identified by who liked what.
  LikeBy(UserId, String),
  Comment(Uuid),
}

impl RowIdentity {
  fn of_like(like: &LikeRecord) -> Self {
    match like.like_id {
      Some(id) => Self::Like(id),
      None => Self::LikeBy(like.user_id, like.stored_key.to_ascii_lowercase()),
    }
  }

  fn of_comment(comment: &CommentRecord) -> Option<Self> {
    comment.comment_id.map(Self::Comment)
  }
}

/// Maps a lowercased candidate spelling to the position of the first
/// requested key that claimed it.
struct Attribution {
  owners: HashMap<String, usize>,
}

impl Attribution {
  fn new(requested: &[(CanonicalKey, CandidateSet)]) -> Self {
    let mut owners = HashMap::new();
    for (idx, (_, set)) in requested.iter().enumerate() {
      for candidate in set.iter() {
        owners.entry(candidate.to_ascii_lowercase()).or_insert(idx);
      }
    }
    Self { owners }
  }

  fn owner(&self, stored_key: &str) -> Option<usize> {
    self.owners.get(&stored_key.trim().to_ascii_lowercase()).copied()
  }
}

pub struct Aggregator<S> {
  store: Arc<S>,
}

impl<S: SocialStore> Aggregator<S> {
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// Counts for every key in `keys`.
  ///
  /// Any store failure is logged and yields an empty map, so callers render
  /// zeros rather than an error.
  pub async fn aggregate(
    &self,
    keys: &[CanonicalKey],
    user: Option<UserId>,
  ) -> HashMap<CanonicalKey, SocialCounts> {
    match self.try_aggregate(keys, user).await {
      Ok(counts) => counts,
      Err(e) => {
        tracing::warn!(error = %e, keys = keys.len(), "count aggregation failed");
        HashMap::new()
      }
    }
  }

  /// Like [`Aggregator::aggregate`], but surfaces store failures.
  pub async fn try_aggregate(
    &self,
    keys: &[CanonicalKey],
    user: Option<UserId>,
  ) -> Result<HashMap<CanonicalKey, SocialCounts>> {
    let empty = SocialCounts {
      is_liked_by_user: user.map(|_| false),
      ..SocialCounts::default()
    };
    let mut out: HashMap<CanonicalKey, SocialCounts> =
      keys.iter().map(|k| (k.clone(), empty.clone())).collect();

    let mut requested: Vec<(CanonicalKey, CandidateSet)> = Vec::new();
    let mut universe = CandidateSet::new();
    for key in keys {
      // Unknown books are never stored, so there is nothing to count.
      if key.is_unknown() || requested.iter().any(|(k, _)| k == key) {
        continue;
      }
      let set = expand_key(key);
      universe.union_with(&set);
      requested.push((key.clone(), set));
    }
    if universe.is_empty() {
      return Ok(out);
    }

    let candidates = universe.into_vec();
    let store = self.store.as_ref();
    let likes = store
      .active_likes(candidates.clone())
      .await
      .map_err(Error::store)?;
    let comments = store
      .comments(candidates.clone())
      .await
      .map_err(Error::store)?;
    let mine = match user {
      Some(user) => Some(
        store
          .active_likes_for_user(user, candidates)
          .await
          .map_err(Error::store)?,
      ),
      None => None,
    };

    let attribution = Attribution::new(&requested);
    let mut counted = HashSet::new();

    for like in likes.iter().filter(|l| l.is_active()) {
      if !counted.insert(RowIdentity::of_like(like)) {
        continue;
      }
      if let Some(idx) = attribution.owner(&like.stored_key)
        && let Some(counts) = out.get_mut(&requested[idx].0)
      {
        counts.likes += 1;
      }
    }

    for comment in &comments {
      let Some(identity) = RowIdentity::of_comment(comment) else {
        tracing::debug!(stored_key = %comment.stored_key, "skipping comment without id");
        continue;
      };
      if !counted.insert(identity) {
        continue;
      }
      if let Some(idx) = attribution.owner(&comment.stored_key)
        && let Some(counts) = out.get_mut(&requested[idx].0)
      {
        counts.comments += 1;
      }
    }

    for like in mine.iter().flatten().filter(|l| l.is_active()) {
      if let Some(idx) = attribution.owner(&like.stored_key)
        && let Some(counts) = out.get_mut(&requested[idx].0)
      {
        counts.is_liked_by_user = Some(true);
      }
    }

    Ok(out)
  }
}
