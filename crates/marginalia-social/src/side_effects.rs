//! Fire-and-forget side effects of ledger mutations.
//!
//! Effects are queued on a bounded channel and applied in order by a single
//! background task. A failing effect is logged and counted; it never reaches
//! the caller of the mutation that scheduled it. When the queue is full the
//! effect is dropped.

use std::sync::{
  Arc,
  atomic::{AtomicU64, Ordering},
};

use marginalia_core::{
  CanonicalKey,
  record::{BookCacheEntry, EngagementAction, NewFeedEvent, UserId},
  store::SocialStore,
};
use tokio::sync::{mpsc, oneshot};

/// A denormalized write that follows a successful ledger mutation.
#[derive(Debug, Clone)]
pub enum SideEffect {
  CacheBook(BookCacheEntry),
  RecordEvent(NewFeedEvent),
  RetractEvents {
    user_id: UserId,
    key:     CanonicalKey,
    action:  EngagementAction,
  },
}

impl SideEffect {
  fn describe(&self) -> &'static str {
    match self {
      Self::CacheBook(_) => "cache_book",
      Self::RecordEvent(_) => "record_event",
      Self::RetractEvents { .. } => "retract_events",
    }
  }

  async fn apply<S: SocialStore>(self, store: &S) -> Result<(), S::Error> {
    match self {
      Self::CacheBook(entry) => store.upsert_book_cache(entry).await,
      Self::RecordEvent(event) => store.insert_feed_event(event).await.map(drop),
      Self::RetractEvents { user_id, key, action } => store
        .delete_feed_events(user_id, key, action)
        .await
        .map(drop),
    }
  }
}

enum Job {
  Run(SideEffect),
  Flush(oneshot::Sender<()>),
}

/// Handle to the background side-effect worker. Cheap to clone.
#[derive(Clone)]
pub struct SideEffectQueue {
  tx:       mpsc::Sender<Job>,
  failures: Arc<AtomicU64>,
  dropped:  Arc<AtomicU64>,
}

impl SideEffectQueue {
  /// Spawn the worker on the current Tokio runtime.
  pub fn spawn<S: SocialStore + 'static>(store: Arc<S>, capacity: usize) -> Self {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let failures = Arc::new(AtomicU64::new(0));
    tokio::spawn(run_worker(store, rx, failures.clone()));
    Self { tx, failures, dropped: Arc::new(AtomicU64::new(0)) }
  }

  /// Queue `effect` without waiting.
  pub fn enqueue(&self, effect: SideEffect) {
    let kind = effect.describe();
    if let Err(e) = self.tx.try_send(Job::Run(effect)) {
      self.dropped.fetch_add(1, Ordering::Relaxed);
      let reason = match e {
        mpsc::error::TrySendError::Full(_) => "queue full",
        mpsc::error::TrySendError::Closed(_) => "worker stopped",
      };
      tracing::warn!(effect = kind, reason, "side effect dropped");
    }
  }

  /// Wait until every effect queued before this call has been applied.
  pub async fn flush(&self) {
    let (done_tx, done_rx) = oneshot::channel();
    if self.tx.send(Job::Flush(done_tx)).await.is_err() {
      return;
    }
    let _ = done_rx.await;
  }

  /// Number of effects whose store write failed.
  pub fn failed_count(&self) -> u64 { self.failures.load(Ordering::Relaxed) }

  /// Number of effects discarded before reaching the worker.
  pub fn dropped_count(&self) -> u64 { self.dropped.load(Ordering::Relaxed) }
}

async fn run_worker<S: SocialStore>(
  store: Arc<S>,
  mut rx: mpsc::Receiver<Job>,
  failures: Arc<AtomicU64>,
) {
  while let Some(job) = rx.recv().await {
    match job {
      Job::Run(effect) => {
        let kind = effect.describe();
        if let Err(e) = effect.apply(store.as_ref()).await {
          failures.fetch_add(1, Ordering::Relaxed);
          tracing::warn!(effect = kind, error = %e, "side effect failed");
        }
      }
      Job::Flush(done) => {
        let _ = done.send(());
      }
    }
  }
  tracing::debug!("side effect worker stopped");
}
