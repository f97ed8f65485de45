//! `.xlsx` exports.
//!
//! One sheet per non-empty dataset, bold header row, and column widths sized
//! to the longest value in the column plus two.

use rust_xlsxwriter::{Format, Workbook};
use slotbook_core::{booking::Booking, reconcile::CombinedView, subject::SubjectRecord};

use crate::{
  error::{Error, Result},
  parse::BOOKING_COLUMNS,
  serialize::{SUBJECT_COLUMNS, booking_cells, combined_cells, combined_headers, subject_cells},
};

pub const SUBJECTS_SHEET: &str = "Subject Records";
pub const BOOKINGS_SHEET: &str = "Bookings";
pub const COMBINED_SHEET: &str = "Combined Data";

struct Sheet<'a> {
  name:    &'a str,
  headers: &'a [&'a str],
  rows:    Vec<Vec<String>>,
}

/// Registry and ledger as two sheets. An empty dataset gets no sheet.
pub fn datasets_xlsx(subjects: &[SubjectRecord], bookings: &[Booking]) -> Result<Vec<u8>> {
  write_workbook(vec![
    Sheet {
      name:    SUBJECTS_SHEET,
      headers: &SUBJECT_COLUMNS,
      rows:    subjects.iter().map(subject_cells).collect(),
    },
    Sheet {
      name:    BOOKINGS_SHEET,
      headers: &BOOKING_COLUMNS,
      rows:    bookings.iter().map(booking_cells).collect(),
    },
  ])
}

/// The combined view as a single sheet.
pub fn combined_xlsx(view: &CombinedView) -> Result<Vec<u8>> {
  let headers = combined_headers();
  write_workbook(vec![Sheet {
    name:    COMBINED_SHEET,
    headers: &headers,
    rows:    combined_cells(view),
  }])
}

fn write_workbook(sheets: Vec<Sheet<'_>>) -> Result<Vec<u8>> {
  let sheets: Vec<_> = sheets.into_iter().filter(|s| !s.rows.is_empty()).collect();
  if sheets.is_empty() {
    return Err(Error::EmptyWorkbook);
  }

  let bold = Format::new().set_bold();
  let mut workbook = Workbook::new();

  for sheet in &sheets {
    let ws = workbook.add_worksheet();
    ws.set_name(sheet.name)?;

    let widths = column_widths(sheet.headers, &sheet.rows);
    for (col, (header, width)) in sheet.headers.iter().zip(widths).enumerate() {
      let col = col as u16;
      ws.write_string_with_format(0, col, *header, &bold)?;
      ws.set_column_width(col, width as f64)?;
    }

    for (i, row) in sheet.rows.iter().enumerate() {
      for (col, value) in row.iter().enumerate() {
        ws.write_string(i as u32 + 1, col as u16, value)?;
      }
    }
  }

  Ok(workbook.save_to_buffer()?)
}

/// Longest value per column, header included, plus two.
fn column_widths(headers: &[&str], rows: &[Vec<String>]) -> Vec<usize> {
  headers
    .iter()
    .enumerate()
    .map(|(col, header)| {
      rows
        .iter()
        .filter_map(|r| r.get(col))
        .map(|v| v.chars().count())
        .fold(header.chars().count(), usize::max)
        + 2
    })
    .collect()
}
