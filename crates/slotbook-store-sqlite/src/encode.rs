//! Encoding and decoding between slotbook records and SQLite rows.
//!
//! Dates are stored as `YYYY-MM-DD`, time ranges by their canonical label and
//! verification enumerations by their display text.

use chrono::NaiveDate;
use rusqlite::types::Value;
use slotbook_core::{
  booking::{Booking, LinkingKey, TimeRange},
  store::Record,
  subject::{SubjectRecord, VerificationMode, VerificationType},
};

use crate::{Error, Result, schema};

/// A [`Record`] with a table of its own.
///
/// `COLUMNS` lists every stored column except `seq`, identity column first,
/// in the order [`encode`](Self::encode) produces values and
/// [`read_raw`](Self::read_raw) expects them.
pub trait SqliteRecord: Record {
  const TABLE: &'static str;
  const COLUMNS: &'static [&'static str];
  const SCHEMA: &'static str;

  /// Column values exactly as read, before decoding.
  type Raw: Send + 'static;

  fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self::Raw>;

  fn decode(raw: Self::Raw) -> Result<Self>;

  fn encode(&self) -> Vec<Value>;
}

// ─── Scalars ─────────────────────────────────────────────────────────────────

fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

fn decode_date(column: &'static str, s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::decode(column, s, e))
}

fn encode_key(k: &Option<LinkingKey>) -> Value {
  match k {
    Some(k) => Value::Text(k.as_str().to_owned()),
    None => Value::Null,
  }
}

fn text(s: &str) -> Value { Value::Text(s.to_owned()) }

// ─── Booking ─────────────────────────────────────────────────────────────────

pub struct RawBooking {
  pub booking_id:  i64,
  pub date:        String,
  pub time_range:  String,
  pub owner:       String,
  pub counterpart: String,
  pub booked_by:   String,
  pub linking_key: Option<String>,
}

impl SqliteRecord for Booking {
  const TABLE: &'static str = "appointment_bookings";
  const COLUMNS: &'static [&'static str] = &[
    "booking_id",
    "date",
    "time_range",
    "owner",
    "counterpart",
    "booked_by",
    "linking_key",
  ];
  const SCHEMA: &'static str = schema::BOOKINGS;

  type Raw = RawBooking;

  fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawBooking> {
    Ok(RawBooking {
      booking_id:  row.get(0)?,
      date:        row.get(1)?,
      time_range:  row.get(2)?,
      owner:       row.get(3)?,
      counterpart: row.get(4)?,
      booked_by:   row.get(5)?,
      linking_key: row.get(6)?,
    })
  }

  fn decode(raw: RawBooking) -> Result<Self> {
    let time_range: TimeRange = raw
      .time_range
      .parse()
      .map_err(|e| Error::decode("time_range", &raw.time_range, e))?;
    Ok(Booking {
      booking_id: raw.booking_id,
      date: decode_date("date", &raw.date)?,
      time_range,
      owner: raw.owner,
      counterpart: raw.counterpart,
      booked_by: raw.booked_by,
      linking_key: raw.linking_key.and_then(LinkingKey::new),
    })
  }

  fn encode(&self) -> Vec<Value> {
    vec![
      Value::Integer(self.booking_id),
      Value::Text(encode_date(self.date)),
      text(self.time_range.label()),
      text(&self.owner),
      text(&self.counterpart),
      text(&self.booked_by),
      encode_key(&self.linking_key),
    ]
  }
}

// ─── SubjectRecord ───────────────────────────────────────────────────────────

pub struct RawSubject {
  pub record_id:         i64,
  pub external_id:       String,
  pub name:              String,
  pub contact_number:    String,
  pub center_name:       String,
  pub uploader_name:     String,
  pub verification_type: String,
  pub verification_mode: String,
  pub verification_date: Option<String>,
  pub linking_key:       Option<String>,
}

impl SqliteRecord for SubjectRecord {
  const TABLE: &'static str = "subject_records";
  const COLUMNS: &'static [&'static str] = &[
    "record_id",
    "external_id",
    "name",
    "contact_number",
    "center_name",
    "uploader_name",
    "verification_type",
    "verification_mode",
    "verification_date",
    "linking_key",
  ];
  const SCHEMA: &'static str = schema::SUBJECTS;

  type Raw = RawSubject;

  fn read_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawSubject> {
    Ok(RawSubject {
      record_id:         row.get(0)?,
      external_id:       row.get(1)?,
      name:              row.get(2)?,
      contact_number:    row.get(3)?,
      center_name:       row.get(4)?,
      uploader_name:     row.get(5)?,
      verification_type: row.get(6)?,
      verification_mode: row.get(7)?,
      verification_date: row.get(8)?,
      linking_key:       row.get(9)?,
    })
  }

  fn decode(raw: RawSubject) -> Result<Self> {
    let verification_date = raw
      .verification_date
      .as_deref()
      .map(|s| decode_date("verification_date", s))
      .transpose()?;
    Ok(SubjectRecord {
      record_id: raw.record_id,
      external_id: raw.external_id,
      name: raw.name,
      contact_number: raw.contact_number,
      center_name: raw.center_name,
      uploader_name: raw.uploader_name,
      verification_type: VerificationType::parse(&raw.verification_type),
      verification_mode: VerificationMode::parse(&raw.verification_mode),
      verification_date,
      linking_key: raw.linking_key.and_then(LinkingKey::new),
    })
  }

  fn encode(&self) -> Vec<Value> {
    vec![
      Value::Integer(self.record_id),
      text(&self.external_id),
      text(&self.name),
      text(&self.contact_number),
      text(&self.center_name),
      text(&self.uploader_name),
      text(self.verification_type.as_str()),
      text(self.verification_mode.as_str()),
      self
        .verification_date
        .map_or(Value::Null, |d| Value::Text(encode_date(d))),
      encode_key(&self.linking_key),
    ]
  }
}
