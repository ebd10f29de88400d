//! Engagement engines for the book ledger: batch count aggregation, the
//! verified like transition, comments, and the best-effort side effects they
//! schedule.
//!
//! Everything here is generic over [`marginalia_core::store::SocialStore`].

pub mod aggregate;
pub mod clock;
pub mod comments;
pub mod error;
pub mod ledger;
pub mod optimistic;
pub mod side_effects;
pub mod throttle;
pub mod toggle;

pub use aggregate::{Aggregator, SocialCounts};
pub use error::{Error, Result};
pub use ledger::{EngineConfig, Ledger};
pub use toggle::{DeleteMode, LikeEngine, LikeIntent, LikeState, ToggleOutcome};

#[cfg(test)]
mod tests;
