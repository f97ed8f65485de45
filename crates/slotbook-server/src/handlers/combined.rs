//! Handlers for the reconciled and multi-sheet exports.

use axum::{
  extract::{Query, State},
  http::HeaderValue,
  response::Response,
};
use serde::Deserialize;
use slotbook_core::{
  booking::Booking,
  reconcile::{CombinedView, JoinStrategy, Reconciliation, reconcile},
  store::Repository,
  subject::SubjectRecord,
};

use super::{csv_file, xlsx_file};
use crate::{
  AppState,
  error::{Error, Result},
};

pub const AUTHORITATIVE_HEADER: &str = "x-reconciliation-authoritative";

#[derive(Debug, Default, Deserialize)]
pub struct CombinedParams {
  #[serde(default)]
  pub strategy: JoinStrategy,
}

async fn combined_view<L, R>(state: &AppState<L, R>, strategy: JoinStrategy) -> Result<CombinedView>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let ledger = state.ledger.snapshot().await?;
  let registry = state.registry.snapshot().await?;

  match reconcile(&ledger, &registry, strategy) {
    Reconciliation::Combined(view) => Ok(view),
    Reconciliation::NoDataToReconcile { ledger_empty, registry_empty } => {
      let missing = match (ledger_empty, registry_empty) {
        (true, true) => "both the ledger and the registry are empty",
        (true, false) => "the booking ledger is empty",
        _ => "the subject registry is empty",
      };
      Err(Error::not_found("no_data_to_reconcile", missing))
    }
    Reconciliation::NoMatchFound => Err(Error::not_found(
      "no_match_found",
      "no booking matches any subject record",
    )),
  }
}

fn flag_authority(mut res: Response, view: &CombinedView) -> Response {
  let value = if view.authoritative { "true" } else { "false" };
  res.headers_mut().insert(AUTHORITATIVE_HEADER, HeaderValue::from_static(value));
  res
}

/// `GET /combined.csv[?strategy=key|heuristic]`
pub async fn csv<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<CombinedParams>,
) -> Result<Response>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let view = combined_view(&state, params.strategy).await?;
  let body = slotbook_tabular::combined_csv(&view)?;
  Ok(flag_authority(csv_file("combined.csv", body), &view))
}

/// `GET /combined.xlsx[?strategy=key|heuristic]`
pub async fn xlsx<L, R>(
  State(state): State<AppState<L, R>>,
  Query(params): Query<CombinedParams>,
) -> Result<Response>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let view = combined_view(&state, params.strategy).await?;
  let body = slotbook_tabular::combined_xlsx(&view)?;
  Ok(flag_authority(xlsx_file("combined.xlsx", body), &view))
}

/// `GET /export.xlsx`: registry and ledger as separate sheets.
pub async fn workbook<L, R>(State(state): State<AppState<L, R>>) -> Result<Response>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  let subjects = state.registry.snapshot().await?;
  let bookings = state.ledger.snapshot().await?;
  let body = slotbook_tabular::datasets_xlsx(&subjects, &bookings)?;
  Ok(xlsx_file("slotbook.xlsx", body))
}
