//! Route handlers, one module per resource.

pub mod bookings;
pub mod combined;
pub mod subjects;

use axum::{
  http::{HeaderMap, HeaderValue, header},
  response::{IntoResponse, Response},
};
use bytes::Bytes;

use crate::error::{Error, Result};

pub const SESSION_HEADER: &str = "x-session-id";
pub const REQUESTER_HEADER: &str = "x-requester";

const CSV: &str = "text/csv; charset=utf-8";
const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
  headers
    .get(name)
    .and_then(|v| v.to_str().ok())
    .map(str::trim)
    .filter(|v| !v.is_empty())
}

/// The caller's session id. Required on every session-bound route.
fn session_id(headers: &HeaderMap) -> Result<String> {
  header_str(headers, SESSION_HEADER)
    .map(str::to_owned)
    .ok_or_else(|| Error::BadRequest(format!("missing {SESSION_HEADER} header")))
}

fn utf8(body: &Bytes) -> Result<&str> {
  std::str::from_utf8(body).map_err(|_| Error::BadRequest("body is not valid UTF-8".to_owned()))
}

fn attachment(content_type: &'static str, filename: &str, body: Vec<u8>) -> Response {
  let mut res = body.into_response();
  let headers = res.headers_mut();
  headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
  if let Ok(v) = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\"")) {
    headers.insert(header::CONTENT_DISPOSITION, v);
  }
  res
}

fn csv_file(filename: &str, body: Vec<u8>) -> Response { attachment(CSV, filename, body) }

fn xlsx_file(filename: &str, body: Vec<u8>) -> Response { attachment(XLSX, filename, body) }
