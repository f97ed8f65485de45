//! CSV readers for subject uploads, ledger reloads and key lists.

use chrono::NaiveDate;
use slotbook_core::{
  booking::{Booking, LinkingKey, TimeRange},
  subject::{ExternalKeys, SubjectRow},
};

use crate::error::{Error, Result};

// ─── Header matching ─────────────────────────────────────────────────────────

/// One subject column: canonical name, accepted legacy headers, required.
struct Column {
  name:     &'static str,
  aliases:  &'static [&'static str],
  required: bool,
}

/// In [`SubjectRow`] field order.
const SUBJECT_COLUMNS: [Column; 9] = [
  Column { name: "external_id",       aliases: &["cmis id"],                           required: true },
  Column { name: "name",              aliases: &["student name"],                      required: true },
  Column { name: "contact_number",    aliases: &["cmis ph no(10 number)"],             required: true },
  Column { name: "center_name",       aliases: &["center name"],                       required: true },
  Column { name: "uploader_name",     aliases: &["name of uploder", "name of uploader"], required: true },
  Column { name: "verification_type", aliases: &["verification type"],                 required: true },
  Column { name: "verification_mode", aliases: &["mode of verification"],              required: true },
  Column { name: "verification_date", aliases: &["date of verification"],              required: false },
  Column { name: "linking_key",       aliases: &["booking id"],                        required: false },
];

fn normalize(header: &str) -> String {
  header.trim_start_matches('\u{feff}').trim().to_ascii_lowercase()
}

impl Column {
  fn matches(&self, normalized: &str) -> bool {
    self.name == normalized || self.aliases.contains(&normalized)
  }
}

fn is_key_separator(c: char) -> bool { c == ',' || c == ';' || c.is_whitespace() }

/// `line` without a leading token naming the external-identifier column.
fn strip_id_header(line: &str) -> &str {
  let line = line.trim_start_matches('\u{feff}').trim_start();
  let lower = line.to_ascii_lowercase();
  let id = &SUBJECT_COLUMNS[0];
  for header in std::iter::once(&id.name).chain(id.aliases) {
    if let Some(rest) = lower.strip_prefix(header)
      && rest.chars().next().is_none_or(is_key_separator)
    {
      return &line[header.len()..];
    }
  }
  line
}

// ─── Subjects ────────────────────────────────────────────────────────────────

/// Read an uploaded subject file.
///
/// Fails as a whole only when required columns are missing. Rows are
/// returned unvalidated; short rows read their missing cells as blank, and
/// rows with no content at all are dropped.
pub fn parse_subjects(input: &[u8]) -> Result<Vec<SubjectRow>> {
  let mut reader = csv::ReaderBuilder::new()
    .flexible(true)
    .from_reader(input);

  let headers: Vec<String> = reader.headers()?.iter().map(normalize).collect();
  let positions: Vec<Option<usize>> = SUBJECT_COLUMNS
    .iter()
    .map(|c| headers.iter().position(|h| c.matches(h)))
    .collect();

  let missing: Vec<String> = SUBJECT_COLUMNS
    .iter()
    .zip(&positions)
    .filter(|(c, p)| c.required && p.is_none())
    .map(|(c, _)| c.name.to_owned())
    .collect();
  if !missing.is_empty() {
    return Err(Error::MissingColumns(missing));
  }

  let mut rows = Vec::new();
  for record in reader.records() {
    let record = record?;
    if record.iter().all(|cell| cell.trim().is_empty()) {
      continue;
    }

    let cell = |i: usize| -> Option<String> {
      positions[i]
        .and_then(|p| record.get(p))
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
    };

    rows.push(SubjectRow {
      line:              record.position().map_or(0, |p| p.line() as usize),
      external_id:       cell(0),
      name:              cell(1),
      contact_number:    cell(2),
      center_name:       cell(3),
      uploader_name:     cell(4),
      verification_type: cell(5),
      verification_mode: cell(6),
      verification_date: cell(7),
      linking_key:       cell(8),
    });
  }
  Ok(rows)
}

// ─── Bookings ────────────────────────────────────────────────────────────────

pub(crate) const BOOKING_COLUMNS: [&str; 7] = [
  "booking_id",
  "date",
  "time_range",
  "owner",
  "counterpart",
  "booked_by",
  "linking_key",
];

/// Read a ledger file for a verbatim reload.
///
/// Strict: any row that does not parse fails the whole file, and every bad
/// row is reported. `linking_key` is the only optional column.
pub fn parse_bookings(input: &[u8]) -> Result<Vec<Booking>> {
  let mut reader = csv::ReaderBuilder::new().from_reader(input);

  let headers: Vec<String> = reader.headers()?.iter().map(normalize).collect();
  let position = |name: &str| headers.iter().position(|h| h == name);
  let positions: Vec<Option<usize>> = BOOKING_COLUMNS.iter().map(|c| position(*c)).collect();

  let missing: Vec<String> = BOOKING_COLUMNS[..6]
    .iter()
    .zip(&positions)
    .filter(|(_, p)| p.is_none())
    .map(|(c, _)| (*c).to_owned())
    .collect();
  if !missing.is_empty() {
    return Err(Error::MissingColumns(missing));
  }

  let mut bookings = Vec::new();
  let mut problems = Vec::new();
  for record in reader.records() {
    let record = record?;
    let line = record.position().map_or(0, |p| p.line());
    let cell = |i: usize| positions[i].and_then(|p| record.get(p)).unwrap_or("");

    match booking_from_cells(cell(0), cell(1), cell(2)) {
      Ok((booking_id, date, time_range)) => bookings.push(Booking {
        booking_id,
        date,
        time_range,
        owner: cell(3).to_owned(),
        counterpart: cell(4).to_owned(),
        booked_by: cell(5).to_owned(),
        linking_key: LinkingKey::new(cell(6)),
      }),
      Err(problem) => problems.push(format!("row {line}: {problem}")),
    }
  }

  if problems.is_empty() {
    Ok(bookings)
  } else {
    Err(Error::InvalidRows(problems))
  }
}

fn booking_from_cells(
  id:         &str,
  date:       &str,
  time_range: &str,
) -> Result<(i64, NaiveDate, TimeRange), String> {
  let id = id
    .trim()
    .parse()
    .map_err(|_| format!("invalid booking_id {id:?}"))?;
  let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
    .map_err(|_| format!("invalid date {date:?}"))?;
  let time_range = time_range.parse().map_err(|e| format!("{e}"))?;
  Ok((id, date, time_range))
}

// ─── Key lists ───────────────────────────────────────────────────────────────

/// Read a list of external identifiers.
///
/// Keys may be separated by commas, semicolons, whitespace or newlines. A
/// leading token naming the external-id column is skipped, whether it sits
/// alone on the first line or starts a one-line list.
pub fn parse_keys(input: &str) -> ExternalKeys {
  let mut lines = input.lines().skip_while(|l| l.trim().is_empty());
  let first = lines.next().map(strip_id_header);

  first
    .into_iter()
    .chain(lines)
    .flat_map(|l| l.split(is_key_separator))
    .map(str::trim)
    .filter(|k| !k.is_empty())
    .map(str::to_owned)
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  const LEGACY: &str = "\
CMIS ID,Student Name,CMIS PH No(10 Number),Center Name,Name Of Uploder,Verification Type,Mode Of Verification,Date Of Verification
123,John Doe,1234567890,Center 1,Uploader 1,Placement,G-meet,2024-01-12
124,Jane Roe,0987654321,Center 2,Uploader 2,Enrollment,Call
";

  #[test]
  fn legacy_headers_and_short_rows() {
    let rows = parse_subjects(LEGACY.as_bytes()).unwrap();
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].line, 2);
    assert_eq!(rows[0].external_id.as_deref(), Some("123"));
    assert_eq!(rows[0].verification_mode.as_deref(), Some("G-meet"));
    assert_eq!(rows[0].verification_date.as_deref(), Some("2024-01-12"));

    assert_eq!(rows[1].line, 3);
    assert_eq!(rows[1].verification_date, None);
    assert_eq!(rows[1].linking_key, None);
  }

  #[test]
  fn canonical_headers_in_any_order_and_case() {
    let input = "\u{feff}NAME,external_id,contact_number,center_name,uploader_name,verification_type,verification_mode,linking_key\n\
                 Ann, 7 ,555,C,U,Placement,Call,key-1\n";
    let rows = parse_subjects(input.as_bytes()).unwrap();
    assert_eq!(rows[0].name.as_deref(), Some("Ann"));
    assert_eq!(rows[0].external_id.as_deref(), Some("7"));
    assert_eq!(rows[0].linking_key.as_deref(), Some("key-1"));
  }

  #[test]
  fn missing_columns_are_all_named() {
    let err = parse_subjects(b"external_id,name,center_name\n1,a,c\n").unwrap_err();
    match err {
      Error::MissingColumns(cols) => assert_eq!(
        cols,
        vec!["contact_number", "uploader_name", "verification_type", "verification_mode"]
      ),
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn blank_rows_are_dropped_and_blank_cells_are_none() {
    let input = format!("{LEGACY},,,,,,,\n125,,555,C,U,Placement,Call,\n");
    let rows = parse_subjects(input.as_bytes()).unwrap();
    assert_eq!(rows.len(), 3);
    assert_eq!(rows[2].name, None);
  }

  #[test]
  fn bookings_parse_with_optional_key() {
    let input = "booking_id,date,time_range,owner,counterpart,booked_by,linking_key\n\
                 4,2025-03-10,10:00-11:00,Alice,Bob,Carol,abc\n\
                 2,2025-03-11,2:00 PM - 3:00 PM,Alice,Dan,Carol,\n";
    let bookings = parse_bookings(input.as_bytes()).unwrap();
    assert_eq!(bookings.len(), 2);
    assert_eq!(bookings[0].booking_id, 4);
    assert_eq!(bookings[0].linking_key, LinkingKey::new("abc"));
    assert_eq!(bookings[1].time_range, TimeRange::TwoToThree);
    assert_eq!(bookings[1].linking_key, None);
  }

  #[test]
  fn bookings_without_key_column_are_accepted() {
    let input = "booking_id,date,time_range,owner,counterpart,booked_by\n1,2025-03-10,10:00-11:00,A,B,C\n";
    assert_eq!(parse_bookings(input.as_bytes()).unwrap().len(), 1);
  }

  #[test]
  fn any_bad_booking_row_rejects_the_file() {
    let input = "booking_id,date,time_range,owner,counterpart,booked_by\n\
                 1,2025-03-10,10:00-11:00,A,B,C\n\
                 x,2025-03-10,10:00-11:00,A,B,C\n\
                 3,10/03/2025,13:00-14:00,A,B,C\n";
    match parse_bookings(input.as_bytes()).unwrap_err() {
      Error::InvalidRows(problems) => {
        assert_eq!(problems.len(), 2);
        assert!(problems[0].starts_with("row 3: invalid booking_id"));
        assert!(problems[1].starts_with("row 4: invalid date"));
      }
      other => panic!("unexpected error: {other}"),
    }
  }

  #[test]
  fn keys_accept_mixed_delimiters() {
    let keys = parse_keys("1, 2;3\n4 5\n\n6");
    assert_eq!(keys, ExternalKeys::from(["1", "2", "3", "4", "5", "6"].map(String::from)));
  }

  #[test]
  fn key_list_header_line_is_skipped() {
    assert_eq!(parse_keys("CMIS ID\n10\n11\n").len(), 2);
    assert_eq!(parse_keys("external_id,\n10\n").len(), 1);
    assert!(parse_keys("  \n").is_empty());
  }

  #[test]
  fn key_list_header_token_on_one_line_is_skipped() {
    let keys = parse_keys("external_id,1,2");
    assert_eq!(keys, ExternalKeys::from_iter(["1".to_owned(), "2".to_owned()]));
    assert_eq!(parse_keys("CMIS ID; 7; 8").len(), 2);
    assert_eq!(parse_keys("\u{feff}External_ID 5 6\n7").len(), 3);
  }

  #[test]
  fn key_resembling_a_header_is_kept() {
    let keys = parse_keys("external_idx,1");
    assert!(keys.contains("external_idx"));
    assert_eq!(keys.len(), 2);
  }
}
