//! Booking policy: the configurable inputs to admission and the privileged
//! gate.

use std::collections::BTreeSet;

use chrono::{NaiveDate, Weekday};
use serde::Deserialize;

/// Calendar rules and the one identity allowed to delete bookings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BookingPolicy {
  /// Fixed dates on which nothing may be booked.
  #[serde(default)]
  pub holidays:            BTreeSet<NaiveDate>,
  /// The weekly day off.
  #[serde(default = "default_rest_day")]
  pub rest_day:            Weekday,
  /// Exact identity string required for privileged operations.
  pub privileged_identity: String,
}

fn default_rest_day() -> Weekday { Weekday::Sun }

impl BookingPolicy {
  pub fn new(privileged_identity: impl Into<String>) -> Self {
    Self {
      holidays:            BTreeSet::new(),
      rest_day:            default_rest_day(),
      privileged_identity: privileged_identity.into(),
    }
  }

  pub fn with_holidays(mut self, holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
    self.holidays.extend(holidays);
    self
  }

  pub fn with_rest_day(mut self, rest_day: Weekday) -> Self {
    self.rest_day = rest_day;
    self
  }

  pub fn is_holiday(&self, date: NaiveDate) -> bool { self.holidays.contains(&date) }

  /// Exact, case-sensitive comparison.
  pub fn is_privileged(&self, requester: &str) -> bool {
    !self.privileged_identity.is_empty() && requester == self.privileged_identity
  }
}
