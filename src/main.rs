//! License Server - device-bound license activation and validation
//!
//! Architecture:
//! - SeaORM for database access (SQLite)
//! - Axum for HTTP API with rate limiting
//! - Tokio for async runtime, long-running services run as supervised plugins

mod audit;
mod engine;
mod entity;
mod error;
mod plugins;
mod prelude;
mod repo;
mod state;
mod sv;
#[cfg(test)]
mod testing;

use tracing_subscriber::{
  EnvFilter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{
  plugins::{App, audit as audit_writer, cron, server},
  prelude::*,
  state::{AppState, Config},
};

const LOG_FILTER: &str = "licensor=debug,tower_http=debug,sea_orm=warn";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  dotenvy::dotenv().ok();

  tracing_subscriber::registry()
    .with(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| LOG_FILTER.into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let config = Config::from_env()?;
  if config.admin_token.is_none() {
    warn!("ADMIN_TOKEN not set, admin endpoints are closed");
  }

  info!("Starting License Server v{}", env!("CARGO_PKG_VERSION"));

  let app = Arc::new(AppState::new(config).await?);

  App::new()
    .register(server::Plugin)
    .register(audit_writer::Plugin)
    .register(cron::Plugin)
    .run(app.clone());

  tokio::signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
  info!("Shutting down...");
  app.shutdown();

  // the audit writer releases the receiver once the queue is drained
  if tokio::time::timeout(Duration::from_secs(10), app.audit_rx.lock())
    .await
    .is_err()
  {
    warn!("Audit queue not drained in time");
  }

  Ok(())
}

#[cfg(test)]
mod tests {
  use tracing_subscriber::filter::LevelFilter;

  use super::*;

  #[test]
  fn test_default_log_filter() {
    let filter = EnvFilter::try_new(LOG_FILTER).unwrap();
    assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
  }
}
