//! Subject records: the uploaded people a booking's counterpart calls.
//!
//! Records arrive in bulk as loosely-typed [`SubjectRow`]s straight from an
//! uploaded file. [`SubjectRow::validate`] turns a row into a
//! [`NewSubjectRecord`] or explains everything that is wrong with it.

use std::{collections::BTreeSet, fmt};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{
  booking::LinkingKey,
  store::{Record, RecordId},
};

/// A set of external identifiers, used for filtered ingest, export and
/// deletion.
pub type ExternalKeys = BTreeSet<String>;

// ─── Enumerations ────────────────────────────────────────────────────────────

/// What the subject is being verified for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationType {
  Placement,
  Enrollment,
  Other(String),
}

impl VerificationType {
  pub fn parse(s: &str) -> Self {
    let t = s.trim();
    match t.to_ascii_lowercase().as_str() {
      "placement" => Self::Placement,
      "enrollment" | "enrolment" => Self::Enrollment,
      _ => Self::Other(t.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Placement => "Placement",
      Self::Enrollment => "Enrollment",
      Self::Other(s) => s,
    }
  }
}

/// The channel the verification happened over.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerificationMode {
  Call,
  Video,
  InPerson,
  Other(String),
}

impl VerificationMode {
  pub fn parse(s: &str) -> Self {
    let t = s.trim();
    match t.to_ascii_lowercase().as_str() {
      "call" | "phone" | "phone call" => Self::Call,
      "video" | "g-meet" | "gmeet" | "google meet" => Self::Video,
      "in person" | "in-person" | "visit" => Self::InPerson,
      _ => Self::Other(t.to_owned()),
    }
  }

  pub fn as_str(&self) -> &str {
    match self {
      Self::Call => "Call",
      Self::Video => "Video",
      Self::InPerson => "In Person",
      Self::Other(s) => s,
    }
  }
}

impl fmt::Display for VerificationType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl fmt::Display for VerificationMode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Records ─────────────────────────────────────────────────────────────────

/// A validated subject record, before the store assigns it an identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSubjectRecord {
  /// Business key from the uploading system. Not unique across uploads.
  pub external_id:       String,
  pub name:              String,
  pub contact_number:    String,
  pub center_name:       String,
  pub uploader_name:     String,
  pub verification_type: VerificationType,
  pub verification_mode: VerificationMode,
  pub verification_date: Option<NaiveDate>,
  pub linking_key:       Option<LinkingKey>,
}

/// A subject record as stored in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectRecord {
  pub record_id:         RecordId,
  pub external_id:       String,
  pub name:              String,
  pub contact_number:    String,
  pub center_name:       String,
  pub uploader_name:     String,
  pub verification_type: VerificationType,
  pub verification_mode: VerificationMode,
  pub verification_date: Option<NaiveDate>,
  pub linking_key:       Option<LinkingKey>,
}

impl Record for SubjectRecord {
  type Draft = NewSubjectRecord;

  fn record_id(&self) -> RecordId { self.record_id }

  fn from_draft(record_id: RecordId, d: NewSubjectRecord) -> Self {
    Self {
      record_id,
      external_id: d.external_id,
      name: d.name,
      contact_number: d.contact_number,
      center_name: d.center_name,
      uploader_name: d.uploader_name,
      verification_type: d.verification_type,
      verification_mode: d.verification_mode,
      verification_date: d.verification_date,
      linking_key: d.linking_key,
    }
  }
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// One uploaded row, cell values as text. Blank cells are `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectRow {
  /// 1-based line number in the source file, for warnings.
  pub line:              usize,
  pub external_id:       Option<String>,
  pub name:              Option<String>,
  pub contact_number:    Option<String>,
  pub center_name:       Option<String>,
  pub uploader_name:     Option<String>,
  pub verification_type: Option<String>,
  pub verification_mode: Option<String>,
  pub verification_date: Option<String>,
  pub linking_key:       Option<String>,
}

/// Everything wrong with one row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowDefect {
  pub line:     usize,
  pub problems: Vec<String>,
}

impl fmt::Display for RowDefect {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "row {}: {}", self.line, self.problems.join(", "))
  }
}

impl SubjectRow {
  /// Fill in `key` when the row carries no linking key of its own.
  pub fn with_default_linking_key(mut self, key: &LinkingKey) -> Self {
    if blank(&self.linking_key) {
      self.linking_key = Some(key.as_str().to_owned());
    }
    self
  }

  pub fn validate(&self) -> Result<NewSubjectRecord, RowDefect> {
    let mut problems = Vec::new();

    let mut required = |value: &Option<String>, field: &str| -> String {
      match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => v.to_owned(),
        _ => {
          problems.push(format!("missing {field}"));
          String::new()
        }
      }
    };

    let external_id       = required(&self.external_id, "external id");
    let name              = required(&self.name, "name");
    let contact_number    = required(&self.contact_number, "contact number");
    let center_name       = required(&self.center_name, "center name");
    let uploader_name     = required(&self.uploader_name, "uploader name");
    let verification_type = required(&self.verification_type, "verification type");
    let verification_mode = required(&self.verification_mode, "verification mode");

    let verification_date = match self.verification_date.as_deref().map(str::trim) {
      None | Some("") => None,
      Some(raw) => match parse_date(raw) {
        Some(d) => Some(d),
        None => {
          problems.push(format!("unparsable verification date {raw:?}"));
          None
        }
      },
    };

    if !problems.is_empty() {
      return Err(RowDefect { line: self.line, problems });
    }

    Ok(NewSubjectRecord {
      external_id,
      name,
      contact_number,
      center_name,
      uploader_name,
      verification_type: VerificationType::parse(&verification_type),
      verification_mode: VerificationMode::parse(&verification_mode),
      verification_date,
      linking_key: self.linking_key.clone().and_then(LinkingKey::new),
    })
  }
}

fn blank(v: &Option<String>) -> bool {
  v.as_deref().is_none_or(|s| s.trim().is_empty())
}

/// ISO date, optionally followed by a time component that is dropped.
fn parse_date(raw: &str) -> Option<NaiveDate> {
  NaiveDate::parse_from_str(raw, "%Y-%m-%d")
    .ok()
    .or_else(|| {
      NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
        .ok()
        .map(|dt| dt.date())
    })
    .or_else(|| {
      NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .ok()
        .map(|dt| dt.date())
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn full_row() -> SubjectRow {
    SubjectRow {
      line:              2,
      external_id:       Some("123".into()),
      name:              Some("John Doe".into()),
      contact_number:    Some("1234567890".into()),
      center_name:       Some("Center 1".into()),
      uploader_name:     Some("Uploader 1".into()),
      verification_type: Some("Placement".into()),
      verification_mode: Some("G-meet".into()),
      verification_date: Some("2024-01-12".into()),
      linking_key:       None,
    }
  }

  #[test]
  fn complete_row_validates() {
    let rec = full_row().validate().unwrap();
    assert_eq!(rec.external_id, "123");
    assert_eq!(rec.verification_type, VerificationType::Placement);
    assert_eq!(rec.verification_mode, VerificationMode::Video);
    assert_eq!(rec.verification_date, NaiveDate::from_ymd_opt(2024, 1, 12));
    assert!(rec.linking_key.is_none());
  }

  #[test]
  fn defect_lists_every_problem() {
    let row = SubjectRow {
      name: None,
      contact_number: Some("  ".into()),
      verification_date: Some("12/01/2024".into()),
      ..full_row()
    };
    let defect = row.validate().unwrap_err();
    assert_eq!(defect.line, 2);
    assert_eq!(
      defect.problems,
      vec![
        "missing name".to_string(),
        "missing contact number".to_string(),
        "unparsable verification date \"12/01/2024\"".to_string(),
      ]
    );
    assert_eq!(
      defect.to_string(),
      "row 2: missing name, missing contact number, unparsable verification date \"12/01/2024\""
    );
  }

  #[test]
  fn date_with_time_component_is_truncated() {
    let row = SubjectRow {
      verification_date: Some("2024-01-12 00:00:00".into()),
      ..full_row()
    };
    assert_eq!(
      row.validate().unwrap().verification_date,
      NaiveDate::from_ymd_opt(2024, 1, 12)
    );
  }

  #[test]
  fn default_linking_key_only_fills_blanks() {
    let key = LinkingKey::new("k1").unwrap();
    let filled = full_row().with_default_linking_key(&key);
    assert_eq!(filled.linking_key.as_deref(), Some("k1"));

    let own = SubjectRow { linking_key: Some("mine".into()), ..full_row() }
      .with_default_linking_key(&key);
    assert_eq!(own.linking_key.as_deref(), Some("mine"));
  }

  #[test]
  fn unknown_enumeration_text_is_kept() {
    assert_eq!(
      VerificationType::parse(" Internship "),
      VerificationType::Other("Internship".into())
    );
    assert_eq!(VerificationMode::parse("CALL"), VerificationMode::Call);
  }
}
