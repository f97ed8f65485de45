//! Error types for the slotbook-tabular codec.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// The header row lacks required columns. Nothing was read.
  #[error("missing required columns: {}", .0.join(", "))]
  MissingColumns(Vec<String>),

  /// At least one row could not be read; every bad row is listed.
  #[error("invalid rows: {}", .0.join("; "))]
  InvalidRows(Vec<String>),

  #[error("CSV error: {0}")]
  Csv(#[from] csv::Error),

  #[error("I/O error: {0}")]
  Io(#[from] std::io::Error),

  #[error("workbook error: {0}")]
  Workbook(#[from] rust_xlsxwriter::XlsxError),

  /// Every dataset handed to the workbook writer was empty.
  #[error("no data available to export")]
  EmptyWorkbook,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
