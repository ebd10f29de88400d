//! Core types and trait definitions for Marginalia's book identity and social
//! engagement ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies. It owns
//! the identity model (normalizers, resolver, candidate expansion), the
//! persisted record shapes, and the [`store::SocialStore`] abstraction that
//! storage backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod book;
pub mod candidates;
pub mod error;
pub mod identity;
pub mod normalize;
pub mod record;
pub mod store;

pub use book::BookLike;
pub use candidates::{CandidateSet, expand_book, expand_key};
pub use error::{Error, Result};
pub use identity::{BookIdentity, CanonicalKey, resolve};
