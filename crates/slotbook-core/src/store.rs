//! The `Repository` trait and the `Record` contract it stores.
//!
//! The trait is implemented by storage backends (e.g.
//! `slotbook-store-sqlite`, or [`crate::memory::MemoryRepository`]). The
//! booking ledger and the subject registry are two independent repositories;
//! nothing links them at the storage level.

use std::future::Future;

/// Store-assigned identity of a record. Unique within one repository.
pub type RecordId = i64;

// ─── Record ──────────────────────────────────────────────────────────────────

/// A row that can live in a [`Repository`].
///
/// `Draft` is the same row before the store has assigned it an identity.
pub trait Record: Clone + Send + Sync + 'static {
  type Draft: Clone + Send + Sync + 'static;

  fn record_id(&self) -> RecordId;

  fn from_draft(record_id: RecordId, draft: Self::Draft) -> Self;
}

/// Identity the store hands out next: one past the largest identity present.
pub fn next_record_id<R: Record>(records: &[R]) -> RecordId {
  records.iter().map(Record::record_id).max().unwrap_or(0) + 1
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over one durable, ordered collection of records.
///
/// `list` returns records in insertion order. Every multi-record write
/// (`put_many`, `delete_many`, `replace_all`) is all-or-nothing: on error the
/// collection is left exactly as it was.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait Repository<R: Record>: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Retrieve a record by identity. Returns `None` if not found.
  fn get(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<Option<R>, Self::Error>> + Send + '_;

  /// The whole collection, in insertion order.
  fn list(&self) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;

  /// Assign an identity to `draft` and append it.
  fn put(
    &self,
    draft: R::Draft,
  ) -> impl Future<Output = Result<R, Self::Error>> + Send + '_;

  /// Append every draft, assigning consecutive identities, or none of them.
  fn put_many(
    &self,
    drafts: Vec<R::Draft>,
  ) -> impl Future<Output = Result<Vec<R>, Self::Error>> + Send + '_;

  /// Remove a record. Returns `false` if it did not exist.
  fn delete(
    &self,
    id: RecordId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  /// Remove every listed record; absent identities are ignored. Returns the
  /// number actually removed.
  fn delete_many(
    &self,
    ids: Vec<RecordId>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  /// Discard the whole collection and install `records` verbatim, identities
  /// and order included.
  fn replace_all(
    &self,
    records: Vec<R>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
