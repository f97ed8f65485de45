//! Error types and axum `IntoResponse` implementation.
//!
//! Every error renders as `{"error": kind, "message": text}`. A filtered
//! upload that matched nothing also carries `"skipped"`.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use slotbook_core::registry::IngestReport;
use thiserror::Error;
use tracing::error;

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Core(#[from] slotbook_core::Error),

  #[error(transparent)]
  Tabular(#[from] slotbook_tabular::Error),

  #[error("bad request: {0}")]
  BadRequest(String),

  /// An expected-empty result, told apart by `kind`.
  #[error("{message}")]
  NotFound {
    kind:    &'static str,
    message: String,
  },

  /// A filtered upload in which no row qualified. The rows skipped on the
  /// way are returned in the body.
  #[error("no uploaded row matches the requested keys")]
  NothingMatched(IngestReport),
}

impl Error {
  pub(crate) fn not_found(kind: &'static str, message: impl Into<String>) -> Self {
    Self::NotFound { kind, message: message.into() }
  }

  fn status_and_kind(&self) -> (StatusCode, &'static str) {
    use slotbook_core::Error as Core;
    use slotbook_tabular::Error as Tab;

    match self {
      Error::Core(Core::Validation(_)) => (StatusCode::UNPROCESSABLE_ENTITY, "validation_error"),
      Error::Core(Core::Rejected(r)) => (StatusCode::UNPROCESSABLE_ENTITY, r.code()),
      Error::Core(Core::UploadRequired) => (StatusCode::PRECONDITION_REQUIRED, "upload_required"),
      Error::Core(Core::Forbidden) => (StatusCode::FORBIDDEN, "forbidden"),
      Error::Core(Core::Store(_)) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence_failure"),
      Error::Tabular(Tab::MissingColumns(_) | Tab::InvalidRows(_)) => {
        (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
      }
      Error::Tabular(Tab::Csv(_)) => (StatusCode::BAD_REQUEST, "bad_request"),
      Error::Tabular(Tab::EmptyWorkbook) => (StatusCode::NOT_FOUND, "no_data"),
      Error::Tabular(Tab::Workbook(_) | Tab::Io(_)) => {
        (StatusCode::INTERNAL_SERVER_ERROR, "export_failed")
      }
      Error::BadRequest(_) => (StatusCode::BAD_REQUEST, "bad_request"),
      Error::NotFound { kind, .. } => (StatusCode::NOT_FOUND, *kind),
      Error::NothingMatched(_) => (StatusCode::NOT_FOUND, "no_matching_records"),
    }
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, kind) = self.status_and_kind();
    let message = self.to_string();
    if status.is_server_error() {
      error!(error = %self, "request failed");
    }
    let mut body = json!({ "error": kind, "message": message });
    if let Error::NothingMatched(report) = &self {
      body["filtered_out"] = json!(report.filtered_out);
      body["skipped"] = json!(report.skipped);
    }
    (status, Json(body)).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
