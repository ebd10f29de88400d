//! Wiring for the engagement engines over one shared store.

use std::sync::Arc;

use chrono::TimeDelta;
use serde::Deserialize;

use marginalia_core::store::SocialStore;

use crate::{
  aggregate::Aggregator,
  clock::{Clock, SystemClock},
  comments::CommentService,
  side_effects::SideEffectQueue,
  throttle::{DEFAULT_WINDOW_MS, Throttle},
  toggle::{DeleteMode, LikeEngine},
};

const MAX_THROTTLE_MS: u64 = 24 * 60 * 60 * 1000;

/// Tunables for [`Ledger`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  pub delete_mode:                DeleteMode,
  /// Minimum spacing between side effects for the same user, book and
  /// action.
  pub side_effect_throttle_ms:    u64,
  pub side_effect_queue_capacity: usize,
}

impl Default for EngineConfig {
  fn default() -> Self {
    Self {
      delete_mode:                DeleteMode::default(),
      side_effect_throttle_ms:    DEFAULT_WINDOW_MS,
      side_effect_queue_capacity: 256,
    }
  }
}

/// The aggregation, like and comment engines, sharing a store and a
/// side-effect worker.
pub struct Ledger<S> {
  pub counts:   Aggregator<S>,
  pub likes:    LikeEngine<S>,
  pub comments: CommentService<S>,
  effects:      SideEffectQueue,
}

impl<S: SocialStore + 'static> Ledger<S> {
  /// Build the engines and spawn the side-effect worker on the current Tokio
  /// runtime.
  pub fn new(store: Arc<S>, config: &EngineConfig) -> Self {
    Self::with_clock(store, config, Arc::new(SystemClock))
  }

  pub fn with_clock(
    store: Arc<S>,
    config: &EngineConfig,
    clock: Arc<dyn Clock>,
  ) -> Self {
    let effects =
      SideEffectQueue::spawn(store.clone(), config.side_effect_queue_capacity);
    let window =
      TimeDelta::milliseconds(config.side_effect_throttle_ms.min(MAX_THROTTLE_MS) as i64);
    let throttle = Throttle::new(window, clock.clone());

    Self {
      counts:   Aggregator::new(store.clone()),
      likes:    LikeEngine::new(
        store.clone(),
        clock.clone(),
        throttle,
        effects.clone(),
        config.delete_mode,
      ),
      comments: CommentService::new(store, clock, effects.clone()),
      effects,
    }
  }

  pub fn side_effects(&self) -> &SideEffectQueue { &self.effects }
}
