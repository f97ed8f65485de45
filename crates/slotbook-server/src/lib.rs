//! HTTP presentation layer for slotbook.
//!
//! Exposes an axum [`Router`] over a booking ledger and a subject registry,
//! each backed by any [`Repository`].
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`   | `/bookings` | JSON proposal; `x-session-id` required |
//! | `GET`    | `/bookings` | `?date=YYYY-MM-DD` or `?month=YYYY-MM` |
//! | `PUT`    | `/bookings` | CSV body, verbatim reload |
//! | `DELETE` | `/bookings/{id}` | `x-requester` must be the privileged identity |
//! | `GET`    | `/bookings.csv` | optional `?month=` |
//! | `POST`   | `/subjects` | CSV upload; `?keys=`, `?link=session` |
//! | `PUT`    | `/subjects` | CSV upload replacing the registry |
//! | `DELETE` | `/subjects` | body is a key list |
//! | `GET`    | `/subjects.csv` | optional `?keys=` |
//! | `GET`    | `/combined.csv`, `/combined.xlsx` | `?strategy=key\|heuristic` |
//! | `GET`    | `/export.xlsx` | registry and ledger sheets |

pub mod error;
pub mod handlers;

pub use error::Error;

use std::{
  collections::HashMap,
  path::PathBuf,
  sync::Arc,
  time::{Duration, Instant},
};

use axum::{
  Router,
  routing::{delete, get},
};
use serde::Deserialize;
use slotbook_core::{
  booking::Booking,
  ledger::LedgerManager,
  policy::BookingPolicy,
  registry::RegistryManager,
  session::Session,
  store::Repository,
  subject::SubjectRecord,
};
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::debug;

use handlers::{bookings, combined, subjects};

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `SLOTBOOK_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  pub host:             String,
  pub port:             u16,
  /// SQLite file holding the booking ledger.
  pub ledger_path:      PathBuf,
  /// SQLite file holding the subject registry.
  pub registry_path:    PathBuf,
  /// Seconds a session may sit unused before it is forgotten.
  #[serde(default = "default_session_ttl_secs")]
  pub session_ttl_secs: u64,
  pub policy:           BookingPolicy,
}

fn default_session_ttl_secs() -> u64 { DEFAULT_SESSION_TTL.as_secs() }

// ─── Sessions ─────────────────────────────────────────────────────────────────

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Debug)]
struct SessionEntry {
  session:   Arc<Mutex<Session>>,
  last_seen: Instant,
}

/// Per-caller [`Session`]s, keyed by the `x-session-id` header.
///
/// Each session sits behind its own lock, so a request that reads and then
/// updates a session holds it for the whole exchange. Sessions idle for
/// longer than the TTL are dropped whenever a new one is created, unless a
/// request is still holding them.
#[derive(Debug)]
pub struct Sessions {
  inner:    Mutex<HashMap<String, SessionEntry>>,
  idle_ttl: Duration,
}

impl Default for Sessions {
  fn default() -> Self { Self::with_idle_ttl(DEFAULT_SESSION_TTL) }
}

impl Sessions {
  pub fn with_idle_ttl(idle_ttl: Duration) -> Self {
    Self { inner: Mutex::default(), idle_ttl }
  }

  /// The shared handle for `id`, created fresh if it has never been seen
  /// or has expired.
  pub async fn handle(&self, id: &str) -> Arc<Mutex<Session>> {
    let mut map = self.inner.lock().await;
    let now = Instant::now();

    if !map.contains_key(id) {
      let ttl = self.idle_ttl;
      let before = map.len();
      map.retain(|_, e| {
        Arc::strong_count(&e.session) > 1 || now.duration_since(e.last_seen) < ttl
      });
      if map.len() < before {
        debug!(evicted = before - map.len(), "idle sessions dropped");
      }
    }

    let entry = map.entry(id.to_owned()).or_insert_with(|| SessionEntry {
      session:   Arc::default(),
      last_seen: now,
    });
    entry.last_seen = now;
    Arc::clone(&entry.session)
  }

  /// A copy of the session for `id`.
  pub async fn get(&self, id: &str) -> Session { self.handle(id).await.lock().await.clone() }

  pub async fn record_upload(&self, id: &str) {
    self.handle(id).await.lock().await.record_upload();
  }

  #[cfg(test)]
  pub(crate) async fn tracked(&self) -> usize { self.inner.lock().await.len() }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<L, R> {
  pub ledger:   Arc<LedgerManager<L>>,
  pub registry: Arc<RegistryManager<R>>,
  pub sessions: Arc<Sessions>,
}

impl<L, R> Clone for AppState<L, R> {
  fn clone(&self) -> Self {
    Self {
      ledger:   Arc::clone(&self.ledger),
      registry: Arc::clone(&self.registry),
      sessions: Arc::clone(&self.sessions),
    }
  }
}

impl<L, R> AppState<L, R>
where
  L: Repository<Booking>,
  R: Repository<SubjectRecord>,
{
  pub fn new(ledger: L, registry: R, policy: BookingPolicy) -> Self {
    Self {
      ledger:   Arc::new(LedgerManager::new(ledger, policy)),
      registry: Arc::new(RegistryManager::new(registry)),
      sessions: Arc::new(Sessions::default()),
    }
  }

  /// Replace the session table with one expiring idle sessions after `ttl`.
  pub fn with_session_ttl(mut self, ttl: Duration) -> Self {
    self.sessions = Arc::new(Sessions::with_idle_ttl(ttl));
    self
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the slotbook server.
pub fn router<L, R>(state: AppState<L, R>) -> Router
where
  L: Repository<Booking> + 'static,
  R: Repository<SubjectRecord> + 'static,
{
  Router::new()
    .route(
      "/bookings",
      get(bookings::list::<L, R>)
        .post(bookings::create::<L, R>)
        .put(bookings::replace::<L, R>),
    )
    .route("/bookings/{id}", delete(bookings::remove::<L, R>))
    .route("/bookings.csv",  get(bookings::export_csv::<L, R>))
    .route(
      "/subjects",
      axum::routing::post(subjects::upload::<L, R>)
        .put(subjects::replace::<L, R>)
        .delete(subjects::remove::<L, R>),
    )
    .route("/subjects.csv",  get(subjects::export_csv::<L, R>))
    .route("/combined.csv",  get(combined::csv::<L, R>))
    .route("/combined.xlsx", get(combined::xlsx::<L, R>))
    .route("/export.xlsx",   get(combined::workbook::<L, R>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests;
