//! Per-key rate limiter for best-effort side effects.
//!
//! A key may fire at most once per window. Entries older than the window are
//! pruned once the map grows past [`PRUNE_THRESHOLD`], so the map stays
//! bounded by the number of distinct keys seen within one window.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, PoisonError},
};

use chrono::{DateTime, TimeDelta, Utc};

use crate::clock::Clock;

/// Default suppression window, in milliseconds, for repeated side effects on
/// the same key.
pub const DEFAULT_WINDOW_MS: u64 = 400;

const PRUNE_THRESHOLD: usize = 1024;

pub struct Throttle {
  window: TimeDelta,
  clock:  Arc<dyn Clock>,
  last:   Mutex<HashMap<String, DateTime<Utc>>>,
}

impl Throttle {
  pub fn new(window: TimeDelta, clock: Arc<dyn Clock>) -> Self {
    Self { window, clock, last: Mutex::new(HashMap::new()) }
  }

  /// Returns `true` and records the attempt if `key` has not fired within
  /// the window; otherwise returns `false` and leaves the record untouched.
  pub fn try_acquire(&self, key: &str) -> bool {
    let now = self.clock.now();
    let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);

    if last.len() >= PRUNE_THRESHOLD {
      let window = self.window;
      last.retain(|_, at| now - *at < window);
    }

    match last.get(key) {
      Some(at) if now - *at < self.window => false,
      _ => {
        last.insert(key.to_owned(), now);
        true
      }
    }
  }

  /// Drop every entry whose window has elapsed. Returns how many were
  /// removed.
  pub fn prune(&self) -> usize {
    let now = self.clock.now();
    let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
    let before = last.len();
    last.retain(|_, at| now - *at < self.window);
    before - last.len()
  }

  pub fn len(&self) -> usize {
    self.last.lock().unwrap_or_else(PoisonError::into_inner).len()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}
