//! Router tests driven through `tower::ServiceExt::oneshot`.

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
  response::Response,
};
use serde_json::{Value, json};
use slotbook_core::{
  booking::Booking, memory::MemoryRepository, policy::BookingPolicy, subject::SubjectRecord,
};
use slotbook_store_sqlite::{BookingStore, SubjectStore};
use tower::ServiceExt as _;

use super::*;

type MemState = AppState<MemoryRepository<Booking>, MemoryRepository<SubjectRecord>>;

fn make_state() -> MemState {
  AppState::new(
    MemoryRepository::new(),
    MemoryRepository::new(),
    BookingPolicy::new("admin"),
  )
}

const SUBJECTS: &str = "\
external_id,name,contact_number,center_name,uploader_name,verification_type,verification_mode,verification_date
1,Bob,1234567890,Center 1,Uploader,Placement,Call,2099-03-09
2,Dan,0987654321,Center 2,Uploader,Enrollment,G-meet,2099-03-10
3,Eve,5555555555,Center 1,Uploader,Placement,Call,
";

async fn oneshot_raw<L, R>(
  state:   AppState<L, R>,
  method:  &str,
  uri:     &str,
  headers: Vec<(&str, &str)>,
  body:    &str,
) -> Response
where
  L: Repository<Booking> + 'static,
  R: Repository<SubjectRecord> + 'static,
{
  let mut builder = Request::builder().method(method).uri(uri);
  for (k, v) in headers {
    builder = builder.header(k, v);
  }
  let req = builder.body(Body::from(body.to_string())).unwrap();
  router(state).oneshot(req).await.unwrap()
}

async fn body_text(resp: Response) -> String {
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  String::from_utf8(bytes.to_vec()).unwrap()
}

async fn body_json(resp: Response) -> Value { serde_json::from_str(&body_text(resp).await).unwrap() }

fn proposal(date: &str, time_range: &str, counterpart: &str) -> String {
  json!({
    "date": date,
    "time_range": time_range,
    "owner": "Alice",
    "counterpart": counterpart,
    "booked_by": "Carol",
  })
  .to_string()
}

async fn propose<L, R>(state: &AppState<L, R>, session: &str, body: &str) -> Response
where
  L: Repository<Booking> + 'static,
  R: Repository<SubjectRecord> + 'static,
{
  oneshot_raw(
    state.clone(),
    "POST",
    "/bookings",
    vec![(SESSION, session), ("content-type", "application/json")],
    body,
  )
  .await
}

async fn upload<L, R>(state: &AppState<L, R>, session: &str, uri: &str, csv: &str) -> Response
where
  L: Repository<Booking> + 'static,
  R: Repository<SubjectRecord> + 'static,
{
  oneshot_raw(state.clone(), "POST", uri, vec![(SESSION, session)], csv).await
}

const SESSION: &str = handlers::SESSION_HEADER;

// ── Booking admission ─────────────────────────────────────────────────────────

#[tokio::test]
async fn booking_requires_prior_upload() {
  let state = make_state();
  let resp = propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;
  assert_eq!(resp.status(), StatusCode::PRECONDITION_REQUIRED);
  assert_eq!(body_json(resp).await["error"], "upload_required");
}

#[tokio::test]
async fn booking_without_session_header_is_a_bad_request() {
  let state = make_state();
  let resp = oneshot_raw(
    state,
    "POST",
    "/bookings",
    vec![("content-type", "application/json")],
    &proposal("2099-03-09", "10:00-11:00", "Bob"),
  )
  .await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn admit_then_conflict() {
  let state = make_state();
  assert_eq!(upload(&state, "s1", "/subjects", SUBJECTS).await.status(), StatusCode::OK);

  let resp = propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let booking = body_json(resp).await;
  assert_eq!(booking["booking_id"], 1);
  assert!(booking["linking_key"].is_string());

  let resp = propose(&state, "s1", &proposal("2099-03-09", "14:00-15:00", "Bob")).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body_json(resp).await["error"], "slot_conflict");
}

#[tokio::test]
async fn calendar_rejections_carry_their_reason() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;

  for (date, reason) in [("2000-01-03", "past_date"), ("2099-03-08", "rest_day_blocked")] {
    let resp = propose(&state, "s1", &proposal(date, "10:00-11:00", "Bob")).await;
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body_json(resp).await["error"], reason);
  }

  let resp = oneshot_raw(state, "GET", "/bookings", vec![], "").await;
  assert_eq!(body_json(resp).await, json!([]));
}

#[tokio::test]
async fn bookings_filter_by_month() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;
  propose(&state, "s1", &proposal("2099-04-01", "10:00-11:00", "Bob")).await;

  let resp = oneshot_raw(state.clone(), "GET", "/bookings?month=2099-03", vec![], "").await;
  assert_eq!(body_json(resp).await.as_array().unwrap().len(), 1);

  let resp = oneshot_raw(state, "GET", "/bookings?month=March", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// ── Privileged delete ─────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_is_gated_on_the_privileged_identity() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;

  let resp = oneshot_raw(state.clone(), "DELETE", "/bookings/1", vec![("x-requester", "mallory")], "").await;
  assert_eq!(resp.status(), StatusCode::FORBIDDEN);

  let resp = oneshot_raw(state.clone(), "DELETE", "/bookings/1", vec![("x-requester", "admin")], "").await;
  assert_eq!(resp.status(), StatusCode::NO_CONTENT);

  let resp = oneshot_raw(state, "DELETE", "/bookings/1", vec![("x-requester", "admin")], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

// ── Ledger reload ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn ledger_csv_reloads_verbatim() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;
  propose(&state, "s1", &proposal("2099-03-10", "11:00-12:00", "Dan")).await;

  let resp = oneshot_raw(state.clone(), "GET", "/bookings.csv", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(
    resp.headers()[header::CONTENT_TYPE].to_str().unwrap().starts_with("text/csv")
  );
  let csv = body_text(resp).await;
  let before = state.ledger.snapshot().await.unwrap();

  let fresh = make_state();
  let resp = oneshot_raw(fresh.clone(), "PUT", "/bookings", vec![], &csv).await;
  assert_eq!(body_json(resp).await["replaced"], 2);
  assert_eq!(fresh.ledger.snapshot().await.unwrap(), before);
}

#[tokio::test]
async fn malformed_ledger_reload_is_rejected() {
  let state = make_state();
  let csv = "booking_id,date,time_range,owner,counterpart,booked_by\n1,tomorrow,10:00-11:00,A,B,C\n";
  let resp = oneshot_raw(state, "PUT", "/bookings", vec![], csv).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(body_json(resp).await["error"], "validation_error");
}

// ── Subject registry ──────────────────────────────────────────────────────────

#[tokio::test]
async fn upload_reports_skipped_rows() {
  let state = make_state();
  let csv = format!("{SUBJECTS}4,,555,Center,Uploader,Placement,Call,\n");
  let report = body_json(upload(&state, "s1", "/subjects", &csv).await).await;
  assert_eq!(report["inserted"], 3);
  assert_eq!(report["skipped"][0]["line"], 5);
}

#[tokio::test]
async fn upload_with_missing_columns_is_rejected() {
  let state = make_state();
  let resp = upload(&state, "s1", "/subjects", "external_id,name\n1,Bob\n").await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert!(state.registry.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn filtered_export_distinguishes_empty_outcomes() {
  let state = make_state();
  let resp = oneshot_raw(state.clone(), "GET", "/subjects.csv?keys=1", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(resp).await["error"], "registry_empty");

  upload(&state, "s1", "/subjects", SUBJECTS).await;

  let resp = oneshot_raw(state.clone(), "GET", "/subjects.csv?keys=2,5", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  let csv = body_text(resp).await;
  assert_eq!(csv.lines().count(), 2);
  assert!(csv.lines().nth(1).unwrap().starts_with("2,2,Dan,"));

  let resp = oneshot_raw(state, "GET", "/subjects.csv?keys=9", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(resp).await["error"], "no_matching_records");
}

#[tokio::test]
async fn filtered_upload_keeps_only_listed_keys() {
  let state = make_state();
  let report = body_json(upload(&state, "s1", "/subjects?keys=1,3", SUBJECTS).await).await;
  assert_eq!(report["inserted"], 2);
  assert_eq!(report["filtered_out"], 1);

  let resp = upload(&state, "s2", "/subjects?keys=42", SUBJECTS).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  // Nothing was uploaded, so s2 still may not book.
  let resp = propose(&state, "s2", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;
  assert_eq!(resp.status(), StatusCode::PRECONDITION_REQUIRED);
}

#[tokio::test]
async fn filtered_upload_matching_nothing_still_reports_skipped_rows() {
  let state = make_state();
  let csv = format!("{SUBJECTS}4,,555,Center,Uploader,Placement,Call,\n");
  let resp = upload(&state, "s1", "/subjects?keys=42", &csv).await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);

  let body = body_json(resp).await;
  assert_eq!(body["error"], "no_matching_records");
  assert_eq!(body["filtered_out"], 3);
  assert_eq!(body["skipped"][0]["line"], 5);
  assert_eq!(body["skipped"][0]["problems"][0], "missing name");
  assert!(state.registry.snapshot().await.unwrap().is_empty());
}

#[tokio::test]
async fn replace_upload_is_all_or_nothing() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;

  let bad = format!("{SUBJECTS}4,,555,Center,Uploader,Placement,Call,\n");
  let resp = oneshot_raw(state.clone(), "PUT", "/subjects", vec![(SESSION, "s1")], &bad).await;
  assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
  assert_eq!(state.registry.snapshot().await.unwrap().len(), 3);
}

#[tokio::test]
async fn delete_by_keys_is_idempotent() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;

  let resp = oneshot_raw(state.clone(), "DELETE", "/subjects", vec![], "external_id\n1\n3\n").await;
  assert_eq!(body_json(resp).await["deleted"], 2);

  let resp = oneshot_raw(state.clone(), "DELETE", "/subjects", vec![], "1;3").await;
  assert_eq!(body_json(resp).await["deleted"], 0);
  assert_eq!(state.registry.snapshot().await.unwrap().len(), 1);
}

// ── Reconciliation ────────────────────────────────────────────────────────────

#[tokio::test]
async fn combined_export_with_empty_ledger_reports_no_data() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  let resp = oneshot_raw(state, "GET", "/combined.csv", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(resp).await["error"], "no_data_to_reconcile");
}

#[tokio::test]
async fn session_link_joins_on_the_booking_key() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;

  let resp = oneshot_raw(state.clone(), "GET", "/combined.csv", vec![], "").await;
  assert_eq!(body_json(resp).await["error"], "no_match_found");

  let extra = "external_id,name,contact_number,center_name,uploader_name,verification_type,verification_mode\n\
               7,Bob,1234567890,Center 1,Uploader,Placement,Call\n";
  let report = body_json(upload(&state, "s1", "/subjects?link=session", extra).await).await;
  assert_eq!(report["inserted"], 1);

  let resp = oneshot_raw(state.clone(), "GET", "/combined.csv", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[combined::AUTHORITATIVE_HEADER], "true");
  assert_eq!(body_text(resp).await.lines().count(), 2);

  let resp = oneshot_raw(state, "GET", "/combined.xlsx", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn blank_json_linking_key_is_replaced_before_linking() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;

  let mut body: Value = serde_json::from_str(&proposal("2099-03-09", "10:00-11:00", "Bob")).unwrap();
  body["linking_key"] = json!("   ");
  let resp = propose(&state, "s1", &body.to_string()).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let key = body_json(resp).await["linking_key"].as_str().unwrap().to_owned();
  assert!(!key.trim().is_empty());

  let extra = "external_id,name,contact_number,center_name,uploader_name,verification_type,verification_mode\n\
               7,Bob,1234567890,Center 1,Uploader,Placement,Call\n";
  upload(&state, "s1", "/subjects?link=session", extra).await;
  let linked = state.registry.snapshot().await.unwrap();
  let stamped = linked.iter().find(|r| r.external_id == "7").unwrap();
  assert_eq!(stamped.linking_key.as_ref().map(|k| k.as_str()), Some(key.as_str()));

  let resp = oneshot_raw(state, "GET", "/combined.csv", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn link_without_a_booking_is_refused() {
  let state = make_state();
  let resp = upload(&state, "s1", "/subjects?link=session", SUBJECTS).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn heuristic_join_is_flagged_non_authoritative() {
  let state = make_state();
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  propose(&state, "s1", &proposal("2099-03-10", "10:00-11:00", "Dan")).await;

  let resp = oneshot_raw(state, "GET", "/combined.csv?strategy=heuristic", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(resp.headers()[combined::AUTHORITATIVE_HEADER], "false");
  assert_eq!(body_text(resp).await.lines().count(), 2);
}

#[tokio::test]
async fn workbook_export() {
  let state = make_state();
  let resp = oneshot_raw(state.clone(), "GET", "/export.xlsx", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::NOT_FOUND);
  assert_eq!(body_json(resp).await["error"], "no_data");

  upload(&state, "s1", "/subjects", SUBJECTS).await;
  let resp = oneshot_raw(state, "GET", "/export.xlsx", vec![], "").await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert!(body_text_bytes(resp).await.starts_with(b"PK"));
}

async fn body_text_bytes(resp: Response) -> Vec<u8> {
  axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap().to_vec()
}

// ── SQLite-backed state ───────────────────────────────────────────────────────

#[tokio::test]
async fn sqlite_backed_router_admits_bookings() {
  let state = AppState::new(
    BookingStore::open_in_memory().await.unwrap(),
    SubjectStore::open_in_memory().await.unwrap(),
    BookingPolicy::new("admin"),
  );
  upload(&state, "s1", "/subjects", SUBJECTS).await;
  let resp = propose(&state, "s1", &proposal("2099-03-09", "10:00-11:00", "Bob")).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  assert_eq!(state.ledger.snapshot().await.unwrap().len(), 1);
}

// ── Sessions ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn a_session_is_held_for_the_whole_exchange() {
  let sessions = Sessions::default();
  let handle = sessions.handle("s1").await;
  let guard = handle.lock().await;

  let again = sessions.handle("s1").await;
  assert!(Arc::ptr_eq(&handle, &again));
  assert!(again.try_lock().is_err());

  drop(guard);
  again.lock().await.record_upload();
  assert!(sessions.get("s1").await.subjects_uploaded);
}

#[tokio::test]
async fn idle_sessions_are_evicted_when_new_ones_arrive() {
  let sessions = Sessions::with_idle_ttl(std::time::Duration::ZERO);
  sessions.record_upload("old").await;
  let in_use = sessions.handle("busy").await;
  // "old" is past the TTL and goes as soon as "busy" arrives.
  assert_eq!(sessions.tracked().await, 1);

  sessions.record_upload("new").await;
  // "busy" is still held by a request.
  assert_eq!(sessions.tracked().await, 2);
  assert!(!sessions.get("old").await.subjects_uploaded);
  drop(in_use);

  let kept = Sessions::default();
  kept.record_upload("a").await;
  kept.record_upload("b").await;
  assert_eq!(kept.tracked().await, 2);
  assert!(kept.get("a").await.subjects_uploaded);
}
