//! Reconciliation: joining the booking ledger with the subject registry.
//!
//! The two datasets are stored and updated independently. This module is a
//! pure function over snapshots of both; it never touches a store.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{booking::Booking, store::RecordId, subject::SubjectRecord};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStrategy {
  /// Equi-join on the linking key. Rows without a key never match.
  #[default]
  Key,
  /// Match on `booking.date == subject.verification_date` and
  /// `booking.counterpart == subject.name`. Best effort only.
  Heuristic,
}

/// One joined pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedRow {
  pub booking: Booking,
  pub subject: SubjectRecord,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedView {
  pub strategy:           JoinStrategy,
  /// `false` for heuristic joins, whose matches may be wrong.
  pub authoritative:      bool,
  pub rows:               Vec<CombinedRow>,
  /// Subjects joined to more than one booking by the heuristic.
  pub ambiguous_subjects: Vec<RecordId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
  Combined(CombinedView),
  NoDataToReconcile { ledger_empty: bool, registry_empty: bool },
  NoMatchFound,
}

/// Join `ledger` and `registry` using `strategy`.
///
/// Rows come out in ledger order, then registry order within one booking.
pub fn reconcile(
  ledger:   &[Booking],
  registry: &[SubjectRecord],
  strategy: JoinStrategy,
) -> Reconciliation {
  if ledger.is_empty() || registry.is_empty() {
    return Reconciliation::NoDataToReconcile {
      ledger_empty:   ledger.is_empty(),
      registry_empty: registry.is_empty(),
    };
  }

  let matches: fn(&Booking, &SubjectRecord) -> bool = match strategy {
    JoinStrategy::Key => |b, s| match (&b.linking_key, &s.linking_key) {
      (Some(bk), Some(sk)) => bk == sk,
      _ => false,
    },
    JoinStrategy::Heuristic => {
      |b, s| s.verification_date == Some(b.date) && b.counterpart == s.name
    }
  };

  let rows: Vec<CombinedRow> = ledger
    .iter()
    .flat_map(|b| {
      registry
        .iter()
        .filter(move |s| matches(b, s))
        .map(move |s| CombinedRow { booking: b.clone(), subject: s.clone() })
    })
    .collect();

  if rows.is_empty() {
    return Reconciliation::NoMatchFound;
  }

  let ambiguous_subjects = match strategy {
    JoinStrategy::Key => Vec::new(),
    JoinStrategy::Heuristic => {
      let mut hits: BTreeMap<RecordId, usize> = BTreeMap::new();
      for row in &rows {
        *hits.entry(row.subject.record_id).or_default() += 1;
      }
      let ambiguous: Vec<RecordId> = hits
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id)
        .collect();
      warn!(
        rows = rows.len(),
        ambiguous = ambiguous.len(),
        "heuristic join on date and name; matches are not authoritative"
      );
      ambiguous
    }
  };

  Reconciliation::Combined(CombinedView {
    strategy,
    authoritative: strategy == JoinStrategy::Key,
    rows,
    ambiguous_subjects,
  })
}
