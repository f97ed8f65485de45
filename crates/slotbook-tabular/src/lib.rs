//! Tabular codec for slotbook: CSV in and out for both datasets, key lists,
//! and `.xlsx` exports.
//!
//! Pure synchronous; no HTTP or database dependencies.
//!
//! # Quick start
//!
//! ```no_run
//! use slotbook_tabular::parse_subjects;
//!
//! let csv = "external_id,name,contact_number,center_name,uploader_name,verification_type,verification_mode\n\
//!            1,Ann,555,Center 1,Uploader,Placement,Call\n";
//! let rows = parse_subjects(csv.as_bytes()).unwrap();
//! assert_eq!(rows.len(), 1);
//! ```

pub mod error;
mod parse;
mod serialize;
mod workbook;

pub use error::{Error, Result};
pub use parse::{parse_bookings, parse_keys, parse_subjects};
pub use serialize::{bookings_csv, combined_csv, subjects_csv};
pub use workbook::{
  BOOKINGS_SHEET, COMBINED_SHEET, SUBJECTS_SHEET, combined_xlsx, datasets_xlsx,
};
