//! Handlers for `/bookings` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderMap, StatusCode},
  response::{IntoResponse, Response},
};
use bytes::Bytes;
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::json;
use slotbook_core::{
  booking::{Booking, NewBooking},
  store::{RecordId, Repository},
  subject::SubjectRecord,
};
use tracing::info;

use super::{REQUESTER_HEADER, csv_file, header_str, session_id};
use crate::{
  AppState,
  error::{Error, Result},
};

// ─── Filters ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  pub date:  Option<NaiveDate>,
  /// `YYYY-MM`.
  pub month: Option<String>,
}

fn parse_month(raw: &str) -> Result<(i32, u32)> {
  NaiveDate::parse_from_str(&format!("{}-01", raw.trim()), "%Y-%m-%d")
    .map(|d| (d.year(), d.month()))
    .map_err(|_| Error::BadRequest(format!("month must be YYYY-MM, got {raw:?}")))
}

async fn filtered<L, R>(state: &AppState<L, R>, params: &ListParams) -> Result<Vec<Booking>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let bookings = match (params.date, params.month.as_deref()) {
    (Some(_), Some(_)) => {
      return Err(Error::BadRequest("use either date or month, not both".to_owned()));
    }
    (Some(date), None) => state.ledger.bookings_on(date).await?,
    (None, Some(month)) => {
      let (y, m) = parse_month(month)?;
      state.ledger.bookings_in_month(y, m).await?
    }
    (None, None) => state.ledger.snapshot().await?,
  };
  Ok(bookings)
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

/// `GET /bookings[?date=|?month=]`
pub async fn list<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Booking>>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  Ok(Json(filtered(&state, &params).await?))
}

/// `POST /bookings`: body: a [`NewBooking`] as JSON.
pub async fn create<L, R>(
  State(state): State<AppState<L, R>>,
  headers: HeaderMap,
  Json(proposal): Json<NewBooking>,
) -> Result<impl IntoResponse>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let sid = session_id(&headers)?;
  let handle = state.sessions.handle(&sid).await;
  let mut session = handle.lock().await;
  let booking = state.ledger.propose(&mut session, proposal).await?;
  Ok((StatusCode::CREATED, Json(booking)))
}

/// `PUT /bookings`: body: ledger CSV, installed verbatim.
pub async fn replace<L, R>(
  State(state): State<AppState<L, R>>,
  body: Bytes,
) -> Result<Json<serde_json::Value>>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let bookings = slotbook_tabular::parse_bookings(&body)?;
  let replaced = state.ledger.replace_all(bookings).await?;
  Ok(Json(json!({ "replaced": replaced })))
}

/// `DELETE /bookings/{id}`: `x-requester` must be the privileged identity.
pub async fn remove<L, R>(
  State(state): State<AppState<L, R>>,
  Path(id): Path<RecordId>,
  headers: HeaderMap,
) -> Result<Response>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let requester = header_str(&headers, REQUESTER_HEADER).unwrap_or_default();
  match state.ledger.delete(id, requester).await? {
    Some(_) => Ok(StatusCode::NO_CONTENT.into_response()),
    None => Err(Error::not_found("booking_not_found", format!("booking {id} not found"))),
  }
}

/// `GET /bookings.csv[?month=]`
pub async fn export_csv<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<ListParams>,
) -> Result<Response>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let bookings = filtered(&state, &params).await?;
  info!(rows = bookings.len(), "ledger exported");
  Ok(csv_file("bookings.csv", slotbook_tabular::bookings_csv(&bookings)?))
}
