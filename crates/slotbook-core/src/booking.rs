//! Booking types: one appointment slot in the ledger.
//!
//! A booking pairs a resource owner with a counterpart on a calendar date
//! inside one of the fixed [`TimeRange`] intervals. Bookings are never
//! updated in place.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::store::{Record, RecordId};

// ─── Time ranges ─────────────────────────────────────────────────────────────

/// The bookable intervals of a day. 13:00-14:00 is never offered.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum TimeRange {
  #[serde(rename = "10:00-11:00")]
  TenToEleven,
  #[serde(rename = "11:00-12:00")]
  ElevenToNoon,
  #[serde(rename = "12:00-13:00")]
  NoonToOne,
  #[serde(rename = "14:00-15:00")]
  TwoToThree,
  #[serde(rename = "15:00-16:00")]
  ThreeToFour,
}

impl TimeRange {
  pub const ALL: [TimeRange; 5] = [
    TimeRange::TenToEleven,
    TimeRange::ElevenToNoon,
    TimeRange::NoonToOne,
    TimeRange::TwoToThree,
    TimeRange::ThreeToFour,
  ];

  /// Canonical 24-hour label, used for storage and exports.
  pub fn label(self) -> &'static str {
    match self {
      TimeRange::TenToEleven  => "10:00-11:00",
      TimeRange::ElevenToNoon => "11:00-12:00",
      TimeRange::NoonToOne    => "12:00-13:00",
      TimeRange::TwoToThree   => "14:00-15:00",
      TimeRange::ThreeToFour  => "15:00-16:00",
    }
  }

  /// 12-hour label as shown to people picking a slot.
  pub fn display_label(self) -> &'static str {
    match self {
      TimeRange::TenToEleven  => "10:00 AM - 11:00 AM",
      TimeRange::ElevenToNoon => "11:00 AM - 12:00 PM",
      TimeRange::NoonToOne    => "12:00 PM - 1:00 PM",
      TimeRange::TwoToThree   => "2:00 PM - 3:00 PM",
      TimeRange::ThreeToFour  => "3:00 PM - 4:00 PM",
    }
  }
}

impl fmt::Display for TimeRange {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown time range: {0:?}")]
pub struct UnknownTimeRange(pub String);

impl FromStr for TimeRange {
  type Err = UnknownTimeRange;

  /// Accepts either label form, ignoring case and surrounding whitespace.
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let wanted = s.trim();
    TimeRange::ALL
      .into_iter()
      .find(|r| {
        r.label().eq_ignore_ascii_case(wanted)
          || r.display_label().eq_ignore_ascii_case(wanted)
      })
      .ok_or_else(|| UnknownTimeRange(s.to_owned()))
  }
}

// ─── Linking key ─────────────────────────────────────────────────────────────

/// Opaque identifier tying subject records to the booking they were uploaded
/// for. Never blank, never padded.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LinkingKey(String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("linking key is blank")]
pub struct BlankLinkingKey;

impl LinkingKey {
  /// Returns `None` for blank input.
  pub fn new(raw: impl Into<String>) -> Option<Self> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
      None
    } else if trimmed.len() == raw.len() {
      Some(Self(raw))
    } else {
      Some(Self(trimmed.to_owned()))
    }
  }

  /// A fresh random key.
  pub fn generate() -> Self { Self(Uuid::new_v4().simple().to_string()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for LinkingKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl TryFrom<String> for LinkingKey {
  type Error = BlankLinkingKey;

  fn try_from(raw: String) -> Result<Self, Self::Error> { Self::new(raw).ok_or(BlankLinkingKey) }
}

impl From<LinkingKey> for String {
  fn from(key: LinkingKey) -> Self { key.0 }
}

/// Optional linking key where a blank string reads as absent.
fn blank_key_as_none<'de, D>(deserializer: D) -> Result<Option<LinkingKey>, D::Error>
where
  D: Deserializer<'de>,
{
  Ok(Option::<String>::deserialize(deserializer)?.and_then(LinkingKey::new))
}

// ─── Bookings ────────────────────────────────────────────────────────────────

/// A proposed booking, before admission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBooking {
  pub date:        NaiveDate,
  pub time_range:  TimeRange,
  /// The resource owner whose calendar the slot belongs to.
  pub owner:       String,
  /// The person being met. At most one booking per counterpart per day.
  pub counterpart: String,
  pub booked_by:   String,
  #[serde(default, deserialize_with = "blank_key_as_none")]
  pub linking_key: Option<LinkingKey>,
}

impl NewBooking {
  pub fn new(
    date: NaiveDate,
    time_range: TimeRange,
    owner: impl Into<String>,
    counterpart: impl Into<String>,
    booked_by: impl Into<String>,
  ) -> Self {
    Self {
      date,
      time_range,
      owner: owner.into(),
      counterpart: counterpart.into(),
      booked_by: booked_by.into(),
      linking_key: None,
    }
  }

  pub fn with_linking_key(mut self, key: LinkingKey) -> Self {
    self.linking_key = Some(key);
    self
  }

  /// Strip surrounding whitespace from the name fields.
  pub fn trimmed(mut self) -> Self {
    for field in [&mut self.owner, &mut self.counterpart, &mut self.booked_by] {
      let t = field.trim();
      if t.len() != field.len() {
        *field = t.to_owned();
      }
    }
    self
  }
}

/// An admitted booking as stored in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
  pub booking_id:  RecordId,
  pub date:        NaiveDate,
  pub time_range:  TimeRange,
  pub owner:       String,
  pub counterpart: String,
  pub booked_by:   String,
  #[serde(default, deserialize_with = "blank_key_as_none")]
  pub linking_key: Option<LinkingKey>,
}

impl Booking {
  /// Whether this booking holds the one slot for `counterpart` on `date`.
  pub fn occupies(&self, date: NaiveDate, counterpart: &str) -> bool {
    self.date == date && self.counterpart == counterpart
  }
}

impl Record for Booking {
  type Draft = NewBooking;

  fn record_id(&self) -> RecordId { self.booking_id }

  fn from_draft(booking_id: RecordId, draft: NewBooking) -> Self {
    Self {
      booking_id,
      date: draft.date,
      time_range: draft.time_range,
      owner: draft.owner,
      counterpart: draft.counterpart,
      booked_by: draft.booked_by,
      linking_key: draft.linking_key,
    }
  }
}
