//! CSV writers for the ledger, the registry and the combined view.
//!
//! Headers are the record field names and every value is plain text, so a
//! ledger export can be fed straight back into
//! [`parse_bookings`](crate::parse_bookings).

use slotbook_core::{
  booking::{Booking, LinkingKey},
  reconcile::CombinedView,
  subject::SubjectRecord,
};

use crate::{error::Result, parse::BOOKING_COLUMNS};

pub(crate) const SUBJECT_COLUMNS: [&str; 10] = [
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

// ─── Cells ───────────────────────────────────────────────────────────────────

fn key_cell(k: &Option<LinkingKey>) -> String {
  k.as_ref().map(|k| k.as_str().to_owned()).unwrap_or_default()
}

pub(crate) fn booking_cells(b: &Booking) -> Vec<String> {
  vec![
    b.booking_id.to_string(),
    b.date.format("%Y-%m-%d").to_string(),
    b.time_range.label().to_owned(),
    b.owner.clone(),
    b.counterpart.clone(),
    b.booked_by.clone(),
    key_cell(&b.linking_key),
  ]
}

pub(crate) fn subject_cells(s: &SubjectRecord) -> Vec<String> {
  vec![
    s.record_id.to_string(),
    s.external_id.clone(),
    s.name.clone(),
    s.contact_number.clone(),
    s.center_name.clone(),
    s.uploader_name.clone(),
    s.verification_type.to_string(),
    s.verification_mode.to_string(),
    s
      .verification_date
      .map(|d| d.format("%Y-%m-%d").to_string())
      .unwrap_or_default(),
    key_cell(&s.linking_key),
  ]
}

/// Header of the combined view: every booking column, then every subject
/// column. The subject's linking key is renamed to keep names unique.
pub(crate) fn combined_headers() -> Vec<&'static str> {
  BOOKING_COLUMNS
    .iter()
    .copied()
    .chain(SUBJECT_COLUMNS.iter().map(|c| match *c {
      "linking_key" => "subject_linking_key",
      other => other,
    }))
    .collect()
}

pub(crate) fn combined_cells(view: &CombinedView) -> Vec<Vec<String>> {
  view
    .rows
    .iter()
    .map(|row| {
      let mut cells = booking_cells(&row.booking);
      cells.extend(subject_cells(&row.subject));
      cells
    })
    .collect()
}

// ─── CSV ─────────────────────────────────────────────────────────────────────

fn write_csv<H, I>(headers: &[H], rows: I) -> Result<Vec<u8>>
where
  H: AsRef<[u8]>,
  I: IntoIterator<Item = Vec<String>>,
{
  let mut writer = csv::Writer::from_writer(Vec::new());
  writer.write_record(headers)?;
  for row in rows {
    writer.write_record(&row)?;
  }
  writer.flush()?;
  writer.into_inner().map_err(|e| e.into_error().into())
}

pub fn bookings_csv(bookings: &[Booking]) -> Result<Vec<u8>> {
  write_csv(&BOOKING_COLUMNS, bookings.iter().map(booking_cells))
}

pub fn subjects_csv(records: &[SubjectRecord]) -> Result<Vec<u8>> {
  write_csv(&SUBJECT_COLUMNS, records.iter().map(subject_cells))
}

pub fn combined_csv(view: &CombinedView) -> Result<Vec<u8>> {
  write_csv(&combined_headers(), combined_cells(view))
}
