//! Error type for `slotbook-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A stored value could not be turned back into a domain value.
  #[error("cannot decode {column} {value:?}: {reason}")]
  Decode {
    column: &'static str,
    value:  String,
    reason: String,
  },
}

impl Error {
  pub(crate) fn decode(column: &'static str, value: &str, reason: impl ToString) -> Self {
    Self::Decode { column, value: value.to_owned(), reason: reason.to_string() }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
