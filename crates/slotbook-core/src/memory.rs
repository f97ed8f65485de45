//! [`MemoryRepository`]: an in-process [`Repository`] for tests and for
//! embedding without a database.

use std::{convert::Infallible, sync::Arc};

use tokio::sync::RwLock;

use crate::store::{Record, RecordId, Repository, next_record_id};

/// A repository held entirely in memory.
///
/// Cloning is cheap and clones share the same rows.
#[derive(Debug)]
pub struct MemoryRepository<R> {
  rows: Arc<RwLock<Vec<R>>>,
}

impl<R> Clone for MemoryRepository<R> {
  fn clone(&self) -> Self { Self { rows: Arc::clone(&self.rows) } }
}

impl<R> Default for MemoryRepository<R> {
  fn default() -> Self { Self { rows: Arc::new(RwLock::new(Vec::new())) } }
}

impl<R: Record> MemoryRepository<R> {
  pub fn new() -> Self { Self::default() }

  /// A repository pre-loaded with `rows`, as if installed by `replace_all`.
  pub fn with_rows(rows: Vec<R>) -> Self { Self { rows: Arc::new(RwLock::new(rows)) } }
}

impl<R: Record> Repository<R> for MemoryRepository<R> {
  type Error = Infallible;

  async fn get(&self, id: RecordId) -> Result<Option<R>, Infallible> {
    let rows = self.rows.read().await;
    Ok(rows.iter().find(|r| r.record_id() == id).cloned())
  }

  async fn list(&self) -> Result<Vec<R>, Infallible> { Ok(self.rows.read().await.clone()) }

  async fn put(&self, draft: R::Draft) -> Result<R, Infallible> {
    let mut rows = self.rows.write().await;
    let record = R::from_draft(next_record_id(&rows), draft);
    rows.push(record.clone());
    Ok(record)
  }

  async fn put_many(&self, drafts: Vec<R::Draft>) -> Result<Vec<R>, Infallible> {
    let mut rows = self.rows.write().await;
    let first = next_record_id(&rows);
    let records: Vec<R> = drafts
      .into_iter()
      .zip(first..)
      .map(|(draft, id)| R::from_draft(id, draft))
      .collect();
    rows.extend(records.iter().cloned());
    Ok(records)
  }

  async fn delete(&self, id: RecordId) -> Result<bool, Infallible> {
    let mut rows = self.rows.write().await;
    let before = rows.len();
    rows.retain(|r| r.record_id() != id);
    Ok(rows.len() != before)
  }

  async fn delete_many(&self, ids: Vec<RecordId>) -> Result<usize, Infallible> {
    let mut rows = self.rows.write().await;
    let before = rows.len();
    rows.retain(|r| !ids.contains(&r.record_id()));
    Ok(before - rows.len())
  }

  async fn replace_all(&self, records: Vec<R>) -> Result<(), Infallible> {
    *self.rows.write().await = records;
    Ok(())
  }
}
