//! slotbook server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `SLOTBOOK_*` environment variables, opens one SQLite file per dataset, and
//! serves the booking API over HTTP.
//!
//! Nested keys use a double underscore, e.g.
//! `SLOTBOOK_POLICY__PRIVILEGED_IDENTITY=admin`. Holidays are given as a
//! comma-separated list: `SLOTBOOK_POLICY__HOLIDAYS=2025-01-26,2025-08-15`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use clap::Parser;
use slotbook_server::{AppState, ServerConfig};
use slotbook_store_sqlite::{BookingStore, SubjectStore};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "slotbook appointment server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = load_config(cli.config, environment(None))?;

  if server_cfg.policy.privileged_identity.is_empty() {
    tracing::warn!("policy.privileged_identity is empty; nobody can delete bookings");
  }

  let ledger_path = expand_tilde(&server_cfg.ledger_path);
  let registry_path = expand_tilde(&server_cfg.registry_path);

  let ledger = BookingStore::open(&ledger_path)
    .await
    .with_context(|| format!("failed to open ledger at {ledger_path:?}"))?;
  let registry = SubjectStore::open(&registry_path)
    .await
    .with_context(|| format!("failed to open registry at {registry_path:?}"))?;

  let state = AppState::new(ledger, registry, server_cfg.policy.clone())
    .with_session_ttl(Duration::from_secs(server_cfg.session_ttl_secs));
  let app = slotbook_server::router(state);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// `SLOTBOOK_*` variables; `source` replaces the process environment.
fn environment(source: Option<config::Map<String, String>>) -> config::Environment {
  config::Environment::with_prefix("SLOTBOOK")
    .prefix_separator("_")
    .separator("__")
    .list_separator(",")
    .with_list_parse_key("policy.holidays")
    .source(source)
}

/// Defaults, then the optional TOML file, then the environment.
fn load_config(file: PathBuf, env: config::Environment) -> anyhow::Result<ServerConfig> {
  config::Config::builder()
    .set_default("host", "127.0.0.1")?
    .set_default("port", 8080)?
    .set_default("ledger_path", "slotbook-bookings.db")?
    .set_default("registry_path", "slotbook-subjects.db")?
    .add_source(config::File::from(file).required(false))
    .add_source(env)
    .build()
    .context("failed to read config file")?
    .try_deserialize()
    .context("failed to deserialise ServerConfig")
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
