//! [`RegistryManager`]: bulk ingestion, filtered export and keyed deletion
//! of subject records.
//!
//! Ingestion policies differ per operation:
//!
//! | Operation | Malformed row |
//! |-----------|---------------|
//! | [`ingest_append`](RegistryManager::ingest_append) | skipped, warning returned |
//! | [`ingest_filtered`](RegistryManager::ingest_filtered) | skipped, warning returned |
//! | [`ingest_replace`](RegistryManager::ingest_replace) | whole batch refused, registry untouched |

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
  Error, Result,
  store::{Record, Repository},
  subject::{ExternalKeys, NewSubjectRecord, RowDefect, SubjectRecord, SubjectRow},
};

// ─── Outcomes ────────────────────────────────────────────────────────────────

/// Result of a best-effort ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  pub inserted:     usize,
  /// Rows left out because their external identifier was not allowed.
  pub filtered_out: usize,
  /// Rows skipped as malformed.
  pub skipped:      Vec<RowDefect>,
}

/// Result of [`RegistryManager::ingest_filtered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilteredIngest {
  Inserted(IngestReport),
  /// No row qualified; the registry is unchanged.
  NothingMatched(IngestReport),
}

/// Result of [`RegistryManager::export_filtered`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilteredExport {
  Matched(Vec<SubjectRecord>),
  /// The registry has records, but none with an allowed identifier.
  NoMatchingRecords,
  /// There is nothing in the registry at all.
  RegistryEmpty,
}

// ─── Manager ─────────────────────────────────────────────────────────────────

pub struct RegistryManager<S> {
  store: S,
  write: Mutex<()>,
}

impl<S> RegistryManager<S>
where
  S: Repository<SubjectRecord>,
{
  pub fn new(store: S) -> Self { Self { store, write: Mutex::new(()) } }

  /// Insert every well-formed row; malformed rows are skipped and reported.
  pub async fn ingest_append(&self, rows: Vec<SubjectRow>) -> Result<IngestReport> {
    let (valid, skipped) = partition(&rows);
    self.insert(valid, 0, skipped).await
  }

  /// Like [`ingest_append`](Self::ingest_append), keeping only rows whose
  /// external identifier is in `allowed`.
  pub async fn ingest_filtered(
    &self,
    rows:    Vec<SubjectRow>,
    allowed: &ExternalKeys,
  ) -> Result<FilteredIngest> {
    let (valid, skipped) = partition(&rows);
    let before = valid.len();
    let kept: Vec<NewSubjectRecord> = valid
      .into_iter()
      .filter(|r| allowed.contains(&r.external_id))
      .collect();
    let filtered_out = before - kept.len();

    if kept.is_empty() {
      info!(filtered_out, skipped = skipped.len(), "filtered ingest matched nothing");
      return Ok(FilteredIngest::NothingMatched(IngestReport {
        inserted: 0,
        filtered_out,
        skipped,
      }));
    }

    self
      .insert(kept, filtered_out, skipped)
      .await
      .map(FilteredIngest::Inserted)
  }

  /// Replace the whole registry with `rows`.
  ///
  /// All-or-nothing: a single malformed row fails the call with
  /// [`Error::Validation`] naming every defective row, and the registry keeps
  /// its previous contents. Identities restart at 1.
  pub async fn ingest_replace(&self, rows: Vec<SubjectRow>) -> Result<IngestReport> {
    let (valid, skipped) = partition(&rows);
    if !skipped.is_empty() {
      return Err(Error::Validation(skipped.iter().map(ToString::to_string).collect()));
    }

    let records: Vec<SubjectRecord> = valid
      .into_iter()
      .zip(1..)
      .map(|(draft, id)| SubjectRecord::from_draft(id, draft))
      .collect();
    let inserted = records.len();

    let _guard = self.write.lock().await;
    self.store.replace_all(records).await.map_err(Error::store)?;
    warn!(inserted, "subject registry replaced");
    Ok(IngestReport { inserted, ..IngestReport::default() })
  }

  /// Delete every record whose external identifier is in `keys`. Unknown keys
  /// are ignored, so repeating the call changes nothing.
  pub async fn delete_by_keys(&self, keys: &ExternalKeys) -> Result<usize> {
    let _guard = self.write.lock().await;
    let ids: Vec<_> = self
      .store
      .list()
      .await
      .map_err(Error::store)?
      .into_iter()
      .filter(|r| keys.contains(&r.external_id))
      .map(|r| r.record_id)
      .collect();

    if ids.is_empty() {
      return Ok(0);
    }
    let deleted = self.store.delete_many(ids).await.map_err(Error::store)?;
    info!(deleted, "subject records deleted by key");
    Ok(deleted)
  }

  /// Records whose external identifier is in `allowed`.
  pub async fn export_filtered(&self, allowed: &ExternalKeys) -> Result<FilteredExport> {
    let all = self.snapshot().await?;
    if all.is_empty() {
      return Ok(FilteredExport::RegistryEmpty);
    }
    let matched: Vec<_> = all
      .into_iter()
      .filter(|r| allowed.contains(&r.external_id))
      .collect();
    if matched.is_empty() {
      Ok(FilteredExport::NoMatchingRecords)
    } else {
      Ok(FilteredExport::Matched(matched))
    }
  }

  /// The full registry in insertion order.
  pub async fn snapshot(&self) -> Result<Vec<SubjectRecord>> {
    self.store.list().await.map_err(Error::store)
  }

  /// Remove every subject record.
  pub async fn clear(&self) -> Result<usize> {
    let _guard = self.write.lock().await;
    let count = self.store.list().await.map_err(Error::store)?.len();
    self.store.replace_all(Vec::new()).await.map_err(Error::store)?;
    warn!(count, "subject registry cleared");
    Ok(count)
  }

  async fn insert(
    &self,
    valid:        Vec<NewSubjectRecord>,
    filtered_out: usize,
    skipped:      Vec<RowDefect>,
  ) -> Result<IngestReport> {
    for defect in &skipped {
      warn!(%defect, "skipping malformed subject row");
    }

    let inserted = if valid.is_empty() {
      0
    } else {
      let _guard = self.write.lock().await;
      self.store.put_many(valid).await.map_err(Error::store)?.len()
    };

    info!(inserted, skipped = skipped.len(), "subject rows ingested");
    Ok(IngestReport { inserted, filtered_out, skipped })
  }
}

fn partition(rows: &[SubjectRow]) -> (Vec<NewSubjectRecord>, Vec<RowDefect>) {
  let mut valid = Vec::with_capacity(rows.len());
  let mut skipped = Vec::new();
  for row in rows {
    match row.validate() {
      Ok(r)  => valid.push(r),
      Err(d) => skipped.push(d),
    }
  }
  (valid, skipped)
}
