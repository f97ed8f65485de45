//! Error types for `slotbook-core`.

use thiserror::Error;

use crate::admission::Rejection;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input shape. Nothing was persisted; every problem found is
  /// listed.
  #[error("validation failed: {}", .0.join("; "))]
  Validation(Vec<String>),

  /// A business rule refused the booking. The ledger is unchanged.
  #[error("booking rejected: {0}")]
  Rejected(Rejection),

  /// The caller's session has not uploaded subject data yet.
  #[error("subject data must be uploaded before booking a slot")]
  UploadRequired,

  /// Privileged operation attempted with the wrong identity.
  #[error("forbidden")]
  Forbidden,

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub(crate) fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
