//! `calcpw-core` — Deterministic password derivation engine.
//!
//! This crate is the audit target: zero network, zero async, zero storage.
//! A password is a pure function of two secrets, a context string, and an
//! output policy; it is recomputed on demand and never persisted anywhere.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;

pub mod charset;

pub mod stream;

pub mod derive;

pub use charset::{Charset, DEFAULT_CHARACTERSET};
pub use derive::{calcpw, derive, OutputPolicy, DEFAULT_ENFORCE, DEFAULT_LENGTH};
pub use error::DeriveError;
pub use stream::KeyStream;
