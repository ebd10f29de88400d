//! Optimistic like state for interactive callers.
//!
//! A [`ToggleCommand`] flips the displayed state immediately, then settles
//! against the verified [`ToggleOutcome`]. Every command is tagged with a
//! generation; a response for anything but the latest generation is
//! discarded, so a slow reply can never overwrite a newer one.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::toggle::{LikeState, ToggleOutcome};

/// What the caller currently shows for one book.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LikeView {
  pub liked: bool,
  pub count: u64,
}

impl LikeView {
  fn flipped(self) -> Self {
    if self.liked {
      Self { liked: false, count: self.count.saturating_sub(1) }
    } else {
      Self { liked: true, count: self.count + 1 }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Generation(u64);

/// Monotonic generation counter for one view.
#[derive(Debug, Default)]
pub struct RequestGenerations {
  current: AtomicU64,
}

impl RequestGenerations {
  pub fn new() -> Self { Self::default() }

  /// Start a new generation, superseding every earlier one.
  pub fn begin(&self) -> Generation {
    Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1)
  }

  pub fn is_current(&self, generation: Generation) -> bool {
    self.current.load(Ordering::SeqCst) == generation.0
  }

  /// Supersede all outstanding generations, e.g. when the view goes away.
  pub fn invalidate(&self) { self.current.fetch_add(1, Ordering::SeqCst); }
}

/// How a settled command changed the view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
  /// The server agreed with the speculative state.
  Confirmed,
  /// The server disagreed; the view now shows the verified state.
  Corrected,
  /// The request failed; the view is back where it started.
  RolledBack,
  /// A newer command owns the view; nothing was changed.
  Discarded,
}

#[derive(Debug)]
pub struct ToggleCommand {
  generation:  Generation,
  previous:    LikeView,
  speculative: LikeView,
}

impl ToggleCommand {
  /// Apply the speculative flip to `view`.
  pub fn begin(view: &mut LikeView, generations: &RequestGenerations) -> Self {
    let previous = *view;
    let speculative = previous.flipped();
    *view = speculative;
    Self { generation: generations.begin(), previous, speculative }
  }

  pub fn generation(&self) -> Generation { self.generation }

  /// Reconcile `view` with the server's answer.
  pub fn settle<E>(
    self,
    view: &mut LikeView,
    generations: &RequestGenerations,
    result: &Result<ToggleOutcome, E>,
  ) -> Settlement {
    if !generations.is_current(self.generation) {
      return Settlement::Discarded;
    }

    match result {
      Ok(outcome) => {
        let verified = LikeView {
          liked: outcome.state == LikeState::Liked,
          count: self.previous.count.saturating_add_signed(outcome.delta),
        };
        *view = verified;
        if verified == self.speculative {
          Settlement::Confirmed
        } else {
          Settlement::Corrected
        }
      }
      Err(_) => {
        *view = self.previous;
        Settlement::RolledBack
      }
    }
  }
}
