//! SQL schema for the slotbook SQLite stores.
//!
//! Each dataset gets its own database file, so each DDL only creates its own
//! table. `seq` records insertion order; the record identity is a separate
//! unique column because `replace_all` installs identities verbatim.

pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
";

pub const BOOKINGS: &str = "
CREATE TABLE IF NOT EXISTS appointment_bookings (
    seq          INTEGER PRIMARY KEY AUTOINCREMENT,
    booking_id   INTEGER NOT NULL UNIQUE,
    date         TEXT    NOT NULL,   -- YYYY-MM-DD
    time_range   TEXT    NOT NULL,   -- canonical label, e.g. '10:00-11:00'
    owner        TEXT    NOT NULL,
    counterpart  TEXT    NOT NULL,
    booked_by    TEXT    NOT NULL,
    linking_key  TEXT
);

CREATE INDEX IF NOT EXISTS bookings_date_idx ON appointment_bookings(date, counterpart);

PRAGMA user_version = 1;
";

pub const SUBJECTS: &str = "
CREATE TABLE IF NOT EXISTS subject_records (
    seq                INTEGER PRIMARY KEY AUTOINCREMENT,
    record_id          INTEGER NOT NULL UNIQUE,
    external_id        TEXT    NOT NULL,   -- not unique across uploads
    name               TEXT    NOT NULL,
    contact_number     TEXT    NOT NULL,
    center_name        TEXT    NOT NULL,
    uploader_name      TEXT    NOT NULL,
    verification_type  TEXT    NOT NULL,
    verification_mode  TEXT    NOT NULL,
    verification_date  TEXT,
    linking_key        TEXT
);

CREATE INDEX IF NOT EXISTS subjects_external_idx ON subject_records(external_id);
CREATE INDEX IF NOT EXISTS subjects_linking_idx  ON subject_records(linking_key);

PRAGMA user_version = 1;
";
