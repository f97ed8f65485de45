//! Admission: the pure decision whether a proposed booking may enter the
//! ledger.
//!
//! Rules are checked in a fixed order and the first one that fails decides
//! the rejection reason:
//!
//! 1. the requester name is blank → [`Rejection::MissingRequester`]
//! 2. the date is a configured holiday → [`Rejection::HolidayBlocked`]
//! 3. the date is before today → [`Rejection::PastDate`]
//! 4. the date falls on the rest day → [`Rejection::RestDayBlocked`]
//! 5. the counterpart is already booked that day → [`Rejection::SlotConflict`]

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use thiserror::Error;

use crate::{
  booking::{Booking, NewBooking},
  policy::BookingPolicy,
  store::RecordId,
};

/// Why a booking was refused. Messages are meant for direct display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Rejection {
  #[error("you must provide your name in the \"booked by\" field")]
  MissingRequester,

  #[error("the selected date is a holiday")]
  HolidayBlocked,

  #[error("slots cannot be booked for past dates")]
  PastDate,

  #[error("slots cannot be booked on the weekly rest day")]
  RestDayBlocked,

  #[error("this counterpart is already booked for the selected date")]
  SlotConflict {
    /// The booking already holding the slot.
    existing: RecordId,
  },
}

impl Rejection {
  /// Stable machine-readable name, identical to the serialized `reason` tag.
  pub fn code(&self) -> &'static str {
    match self {
      Rejection::MissingRequester    => "missing_requester",
      Rejection::HolidayBlocked      => "holiday_blocked",
      Rejection::PastDate            => "past_date",
      Rejection::RestDayBlocked      => "rest_day_blocked",
      Rejection::SlotConflict { .. } => "slot_conflict",
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
  Admit,
  Reject(Rejection),
}

/// Evaluate `proposal` against the current `ledger`.
pub fn evaluate(
  proposal: &NewBooking,
  ledger:   &[Booking],
  policy:   &BookingPolicy,
  today:    NaiveDate,
) -> Decision {
  match check(proposal, ledger, policy, today) {
    Ok(())  => Decision::Admit,
    Err(r)  => Decision::Reject(r),
  }
}

fn check(
  proposal: &NewBooking,
  ledger:   &[Booking],
  policy:   &BookingPolicy,
  today:    NaiveDate,
) -> Result<(), Rejection> {
  if proposal.booked_by.trim().is_empty() {
    return Err(Rejection::MissingRequester);
  }
  if policy.is_holiday(proposal.date) {
    return Err(Rejection::HolidayBlocked);
  }
  if proposal.date < today {
    return Err(Rejection::PastDate);
  }
  if proposal.date.weekday() == policy.rest_day {
    return Err(Rejection::RestDayBlocked);
  }
  if let Some(existing) = ledger
    .iter()
    .find(|b| b.occupies(proposal.date, &proposal.counterpart))
  {
    return Err(Rejection::SlotConflict { existing: existing.booking_id });
  }
  Ok(())
}
