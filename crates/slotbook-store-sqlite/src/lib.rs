//! SQLite backend for the slotbook ledger and registry.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Each dataset lives in its own database
//! file; [`BookingStore`] and [`SubjectStore`] are the two instantiations.

mod encode;
mod schema;
mod store;

pub mod error;

pub use encode::SqliteRecord;
pub use error::{Error, Result};
pub use store::{BookingStore, SqliteRepository, SubjectStore};
