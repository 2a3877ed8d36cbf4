//! Record store over embedded SQLite.
//!
//! Provides:
//! - [`Store`]: one database file with disposition-aware batch writes
//! - [`RawStoreReader`]: read-only attach of a second store, used to derive
//!   scores from raw observations without write access to them
//! - Filtered reads for observations, scores and gate traffic
//!
//! # Dispositions
//!
//! | Disposition | Effect |
//! |---|---|
//! | `Append` | insert, no duplicate checks |
//! | `ReplaceAll` | drop and recreate the table, then insert |
//! | `UpsertByKey` | insert with the record key unique, last write wins |
//!
//! Every batch is one transaction.

pub mod query;
pub mod record;
pub mod store;

use comfort_common::ComfortError;

pub use query::{ObservationQuery, ScoreQuery};
pub use record::{Column, Disposition, Record, SqliteQuery};
pub use store::{validate_table_name, RawStoreReader, Store};

/// Map a sqlx error into a store error with context.
pub(crate) fn store_err(context: &'static str) -> impl Fn(sqlx::Error) -> ComfortError {
    move |e| ComfortError::Store(format!("{}: {}", context, e))
}
