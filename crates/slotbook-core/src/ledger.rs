//! [`LedgerManager`]: the booking lifecycle on top of a booking repository.
//!
//! Every ledger write runs under one exclusive lock, so the admission check
//! and the append it guards can never interleave with another writer.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::{
  Error, Result,
  admission::{self, Decision},
  booking::{Booking, LinkingKey, NewBooking},
  clock::{Clock, SystemClock},
  policy::BookingPolicy,
  session::Session,
  store::{RecordId, Repository},
};

pub struct LedgerManager<S, C = SystemClock> {
  store:  S,
  policy: BookingPolicy,
  clock:  C,
  write:  Mutex<()>,
}

impl<S> LedgerManager<S, SystemClock>
where
  S: Repository<Booking>,
{
  pub fn new(store: S, policy: BookingPolicy) -> Self {
    Self::with_clock(store, policy, SystemClock)
  }
}

impl<S, C> LedgerManager<S, C>
where
  S: Repository<Booking>,
  C: Clock,
{
  pub fn with_clock(store: S, policy: BookingPolicy, clock: C) -> Self {
    Self { store, policy, clock, write: Mutex::new(()) }
  }

  pub fn policy(&self) -> &BookingPolicy { &self.policy }

  /// Admit `proposal` into the ledger.
  ///
  /// Name fields are trimmed before anything else, so `"Bob "` and `"Bob"`
  /// are the same counterpart.
  ///
  /// The session must have uploaded subject data first. A booking without a
  /// linking key is given a fresh one, and the session remembers it. On any
  /// rejection the ledger is left untouched and the reason is returned as
  /// [`Error::Rejected`].
  pub async fn propose(&self, session: &mut Session, proposal: NewBooking) -> Result<Booking> {
    let mut proposal = proposal.trimmed();
    if !session.subjects_uploaded {
      return Err(Error::UploadRequired);
    }

    let _guard = self.write.lock().await;
    let ledger = self.store.list().await.map_err(Error::store)?;

    if let Decision::Reject(reason) =
      admission::evaluate(&proposal, &ledger, &self.policy, self.clock.today())
    {
      info!(
        date = %proposal.date,
        counterpart = %proposal.counterpart,
        %reason,
        "booking rejected"
      );
      return Err(Error::Rejected(reason));
    }

    if proposal.linking_key.is_none() {
      proposal.linking_key = Some(LinkingKey::generate());
    }

    let booking = self.store.put(proposal).await.map_err(Error::store)?;
    info!(
      booking_id = booking.booking_id,
      date = %booking.date,
      time_range = %booking.time_range,
      counterpart = %booking.counterpart,
      "booking admitted"
    );

    session.last_linking_key = booking.linking_key.clone();
    Ok(booking)
  }

  /// Delete a booking. Only the configured privileged identity may do this.
  ///
  /// Returns `Ok(None)` when no booking has that identity.
  pub async fn delete(&self, id: RecordId, requester: &str) -> Result<Option<Booking>> {
    if !self.policy.is_privileged(requester) {
      warn!(booking_id = id, "unprivileged delete refused");
      return Err(Error::Forbidden);
    }

    let _guard = self.write.lock().await;
    let Some(existing) = self.store.get(id).await.map_err(Error::store)? else {
      return Ok(None);
    };
    self.store.delete(id).await.map_err(Error::store)?;
    info!(booking_id = id, "booking deleted");
    Ok(Some(existing))
  }

  /// Discard the ledger and install `records` verbatim.
  ///
  /// This is the bulk-reload escape hatch: admission rules are NOT applied,
  /// so a reload may well contain past dates or conflicting pairs. Only
  /// identity uniqueness is checked. Returns the number of rows installed.
  pub async fn replace_all(&self, records: Vec<Booking>) -> Result<usize> {
    let mut seen = HashSet::new();
    let duplicates: Vec<String> = records
      .iter()
      .filter(|b| !seen.insert(b.booking_id))
      .map(|b| format!("duplicate booking id {}", b.booking_id))
      .collect();
    if !duplicates.is_empty() {
      return Err(Error::Validation(duplicates));
    }

    let count = records.len();
    let _guard = self.write.lock().await;
    self.store.replace_all(records).await.map_err(Error::store)?;
    warn!(count, "booking ledger replaced without admission checks");
    Ok(count)
  }

  /// The full ledger in insertion order.
  pub async fn snapshot(&self) -> Result<Vec<Booking>> {
    self.store.list().await.map_err(Error::store)
  }

  /// Bookings on one date, e.g. today's schedule.
  pub async fn bookings_on(&self, date: NaiveDate) -> Result<Vec<Booking>> {
    let mut all = self.snapshot().await?;
    all.retain(|b| b.date == date);
    Ok(all)
  }

  /// Bookings in one calendar month, for monthly exports.
  pub async fn bookings_in_month(&self, year: i32, month: u32) -> Result<Vec<Booking>> {
    let mut all = self.snapshot().await?;
    all.retain(|b| b.date.year() == year && b.date.month() == month);
    Ok(all)
  }
}
