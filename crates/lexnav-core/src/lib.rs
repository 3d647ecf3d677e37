//! Core types and trait definitions for the lexnav statute navigation engine.
//!
//! This crate is deliberately free of database and cache dependencies. The
//! SQLite backend, the in-memory cache and the engine services all depend on
//! it; it depends on nothing but serde and chrono.

// Native `async fn` / RPITIT in traits; the `Send` bounds are spelled out on
// the returned futures.
#![allow(async_fn_in_trait)]

/// Declares a transparent integer row id with the conversions every backend
/// needs.
macro_rules! row_id {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash,
      serde::Serialize, serde::Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl std::fmt::Display for $name {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
      }
    }

    impl From<i64> for $name {
      fn from(raw: i64) -> Self { Self(raw) }
    }
  };
}

pub mod cache;
pub mod config;
pub mod error;
pub mod node;
pub mod order;
pub mod statute;
pub mod store;

pub use error::{Error, Result};
