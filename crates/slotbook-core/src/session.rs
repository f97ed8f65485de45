//! Per-caller session state.
//!
//! The presentation layer owns one [`Session`] per interacting user and
//! passes it into the ledger explicitly; nothing here is global.

use serde::Serialize;

use crate::booking::LinkingKey;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Session {
  /// Set once this session has successfully uploaded subject data. Booking
  /// requires it.
  pub subjects_uploaded: bool,
  /// Linking key of the last booking admitted through this session.
  pub last_linking_key:  Option<LinkingKey>,
}

impl Session {
  pub fn new() -> Self { Self::default() }

  /// A session that has already uploaded subject data.
  pub fn uploaded() -> Self {
    Self { subjects_uploaded: true, last_linking_key: None }
  }

  pub fn record_upload(&mut self) { self.subjects_uploaded = true; }
}
