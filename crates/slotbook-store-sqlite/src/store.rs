//! [`SqliteRepository`]: the SQLite implementation of [`Repository`].

use std::{marker::PhantomData, path::Path};

use rusqlite::OptionalExtension as _;
use slotbook_core::{
  booking::Booking,
  store::{RecordId, Repository},
  subject::SubjectRecord,
};
use tracing::debug;

use crate::{Result, encode::SqliteRecord, schema::PRAGMAS};

/// The booking ledger on disk.
pub type BookingStore = SqliteRepository<Booking>;

/// The subject registry on disk.
pub type SubjectStore = SqliteRepository<SubjectRecord>;

// ─── Store ───────────────────────────────────────────────────────────────────

/// One record collection backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
pub struct SqliteRepository<R> {
  conn:    tokio_rusqlite::Connection,
  _record: PhantomData<fn() -> R>,
}

impl<R> Clone for SqliteRepository<R> {
  fn clone(&self) -> Self { Self { conn: self.conn.clone(), _record: PhantomData } }
}

impl<R: SqliteRecord> SqliteRepository<R> {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let path = path.as_ref();
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, _record: PhantomData };
    store.init_schema().await?;
    debug!(path = %path.display(), table = R::TABLE, "sqlite store opened");
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, _record: PhantomData };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(PRAGMAS)?;
        conn.execute_batch(R::SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── SQL ─────────────────────────────────────────────────────────────────────

fn id_column<R: SqliteRecord>() -> &'static str { R::COLUMNS[0] }

fn select_sql<R: SqliteRecord>() -> String {
  format!("SELECT {} FROM {}", R::COLUMNS.join(", "), R::TABLE)
}

fn next_id<R: SqliteRecord>(conn: &rusqlite::Connection) -> rusqlite::Result<RecordId> {
  conn.query_row(
    &format!("SELECT COALESCE(MAX({}), 0) + 1 FROM {}", id_column::<R>(), R::TABLE),
    [],
    |r| r.get(0),
  )
}

fn insert<R: SqliteRecord>(conn: &rusqlite::Connection, record: &R) -> rusqlite::Result<()> {
  let placeholders: Vec<String> = (1..=R::COLUMNS.len()).map(|i| format!("?{i}")).collect();
  let mut stmt = conn.prepare_cached(&format!(
    "INSERT INTO {} ({}) VALUES ({})",
    R::TABLE,
    R::COLUMNS.join(", "),
    placeholders.join(", "),
  ))?;
  stmt.execute(rusqlite::params_from_iter(record.encode()))?;
  Ok(())
}

fn delete_one<R: SqliteRecord>(conn: &rusqlite::Connection, id: RecordId) -> rusqlite::Result<usize> {
  conn.execute(
    &format!("DELETE FROM {} WHERE {} = ?1", R::TABLE, id_column::<R>()),
    [id],
  )
}

// ─── Repository impl ─────────────────────────────────────────────────────────

impl<R: SqliteRecord> Repository<R> for SqliteRepository<R> {
  type Error = crate::Error;

  async fn get(&self, id: RecordId) -> Result<Option<R>> {
    let sql = format!("{} WHERE {} = ?1", select_sql::<R>(), id_column::<R>());
    let raw = self
      .conn
      .call(move |conn| Ok(conn.query_row(&sql, [id], R::read_raw).optional()?))
      .await?;
    raw.map(R::decode).transpose()
  }

  async fn list(&self) -> Result<Vec<R>> {
    let sql = format!("{} ORDER BY seq", select_sql::<R>());
    let raws: Vec<R::Raw> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], R::read_raw)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    raws.into_iter().map(R::decode).collect()
  }

  async fn put(&self, draft: R::Draft) -> Result<R> {
    let record = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let record = R::from_draft(next_id::<R>(&tx)?, draft);
        insert(&tx, &record)?;
        tx.commit()?;
        Ok(record)
      })
      .await?;
    Ok(record)
  }

  async fn put_many(&self, drafts: Vec<R::Draft>) -> Result<Vec<R>> {
    let records = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let first = next_id::<R>(&tx)?;
        let records: Vec<R> = drafts
          .into_iter()
          .zip(first..)
          .map(|(draft, id)| R::from_draft(id, draft))
          .collect();
        for record in &records {
          insert(&tx, record)?;
        }
        tx.commit()?;
        Ok(records)
      })
      .await?;
    Ok(records)
  }

  async fn delete(&self, id: RecordId) -> Result<bool> {
    let changed = self
      .conn
      .call(move |conn| Ok(delete_one::<R>(conn, id)?))
      .await?;
    Ok(changed > 0)
  }

  async fn delete_many(&self, ids: Vec<RecordId>) -> Result<usize> {
    let removed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut removed = 0;
        for id in ids {
          removed += delete_one::<R>(&tx, id)?;
        }
        tx.commit()?;
        Ok(removed)
      })
      .await?;
    Ok(removed)
  }

  async fn replace_all(&self, records: Vec<R>) -> Result<()> {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(&format!("DELETE FROM {}", R::TABLE), [])?;
        for record in &records {
          insert(&tx, record)?;
        }
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
