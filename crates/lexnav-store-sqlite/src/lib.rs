//! SQLite backend for the lexnav statute store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Cross-table reads are single
//! `UNION ALL` queries; reindexing runs in one immediate transaction.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
