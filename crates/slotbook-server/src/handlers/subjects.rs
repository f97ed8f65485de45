//! Handlers for `/subjects` endpoints.
//!
//! Uploads are CSV bodies. A successful upload marks the caller's session
//! as having uploaded subject data, which booking requires.

use axum::{
  Json,
  extract::{Query, State},
  http::HeaderMap,
  response::Response,
};
use bytes::Bytes;
use serde::Deserialize;
use serde_json::json;
use slotbook_core::{
  booking::Booking,
  registry::{FilteredExport, FilteredIngest, IngestReport},
  store::Repository,
  subject::{ExternalKeys, SubjectRecord, SubjectRow},
};
use slotbook_tabular::{parse_keys, parse_subjects};
use tracing::info;

use super::{csv_file, session_id, utf8};
use crate::{
  AppState,
  error::{Error, Result},
};

#[derive(Debug, Default, Deserialize)]
pub struct UploadParams {
  /// Comma-separated external ids; only matching rows are ingested.
  pub keys: Option<String>,
  /// `session` stamps rows lacking a linking key with the key of the
  /// session's last booking.
  pub link: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
  pub keys: Option<String>,
}

fn key_filter(raw: Option<&str>) -> Result<Option<ExternalKeys>> {
  let Some(raw) = raw else { return Ok(None) };
  let keys = parse_keys(raw);
  if keys.is_empty() {
    return Err(Error::BadRequest("keys filter is empty".to_owned()));
  }
  Ok(Some(keys))
}

async fn rows_for_upload<L, R>(
  state:  &AppState<L, R>,
  sid:    &str,
  link:   Option<&str>,
  body:   &Bytes,
) -> Result<Vec<SubjectRow>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let rows = parse_subjects(body)?;
  match link {
    None => Ok(rows),
    Some("session") => {
      let session = state.sessions.get(sid).await;
      let key = session.last_linking_key.ok_or_else(|| {
        Error::BadRequest("this session has not booked a slot yet".to_owned())
      })?;
      Ok(rows.into_iter().map(|r| r.with_default_linking_key(&key)).collect())
    }
    Some(other) => Err(Error::BadRequest(format!("unknown link mode {other:?}"))),
  }
}

/// `POST /subjects[?keys=…][&link=session]`: append uploaded rows.
pub async fn upload<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Query(params): Query<UploadParams>,
  body: Bytes,
) -> Result<Json<IngestReport>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let sid = session_id(&headers)?;
  let filter = key_filter(params.keys.as_deref())?;
  let rows = rows_for_upload(&state, &sid, params.link.as_deref(), &body).await?;

  let report = match filter {
    None => state.registry.ingest_append(rows).await?,
    Some(keys) => match state.registry.ingest_filtered(rows, &keys).await? {
      FilteredIngest::Inserted(report) => report,
      FilteredIngest::NothingMatched(report) => return Err(Error::NothingMatched(report)),
    },
  };

  state.sessions.record_upload(&sid).await;
  Ok(Json(report))
}

/// `PUT /subjects`: replace the registry; all rows must be valid.
pub async fn replace<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<Json<IngestReport>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let sid = session_id(&headers)?;
  let report = state.registry.ingest_replace(parse_subjects(&body)?).await?;
  state.sessions.record_upload(&sid).await;
  Ok(Json(report))
}

/// `DELETE /subjects`: body: external ids to delete.
pub async fn remove<L, R>(
  State(state): State<AppState<L, R>>,
  body: Bytes,
) -> Result<Json<serde_json::Value>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let keys = parse_keys(utf8(&body)?);
  if keys.is_empty() {
    return Err(Error::BadRequest("no keys given".to_owned()));
  }
  let deleted = state.registry.delete_by_keys(&keys).await?;
  Ok(Json(json!({ "requested": keys.len(), "deleted": deleted })))
}

/// `GET /subjects.csv[?keys=…]`
pub async fn export_csv<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<ExportParams>,
) -> Result<Response>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let records = match key_filter(params.keys.as_deref())? {
    None => state.registry.snapshot().await?,
    Some(keys) => match state.registry.export_filtered(&keys).await? {
      FilteredExport::Matched(records) => records,
      FilteredExport::NoMatchingRecords => {
        return Err(Error::not_found(
          "no_matching_records",
          "no subject record matches the requested keys",
        ));
      }
      FilteredExport::RegistryEmpty => {
        return Err(Error::not_found("registry_empty", "the subject registry is empty"));
      }
    },
  };
  info!(rows = records.len(), "registry exported");
  Ok(csv_file("subjects.csv", slotbook_tabular::subjects_csv(&records)?))
}
