use std::env;

use migration::{Migrator, MigratorTrait};
use tokio::sync::{Mutex, mpsc::UnboundedReceiver, watch};

use crate::{
  audit::{self, Entry},
  engine::Coordinator,
  prelude::*,
  repo::{self, Repo},
  sv,
};

#[derive(Debug, Clone)]
pub struct Config {
  pub database_url: String,
  pub port: u16,
  /// Bearer token of the administrator, admin routes are closed without it
  pub admin_token: Option<String>,
  /// How long an activation may wait on the storage lock
  pub activation_timeout: Duration,
  pub log_retention: Duration,
  pub rate_per_second: u64,
  pub rate_burst: u32,
}

impl Default for Config {
  fn default() -> Self {
    Self {
      database_url: String::from("sqlite:licenses.db?mode=rwc"),
      port: 3000,
      admin_token: None,
      activation_timeout: Duration::from_secs(5),
      log_retention: Duration::from_secs(90 * 24 * 3600),
      rate_per_second: 2,
      rate_burst: 100,
    }
  }
}

impl Config {
  pub fn from_env() -> anyhow::Result<Self> {
    let mut config = Self::default();

    if let Ok(url) = env::var("DATABASE_URL") {
      config.database_url = url;
    }
    if let Ok(port) = env::var("PORT") {
      config.port = port.parse().context("Invalid PORT")?;
    }
    config.admin_token =
      env::var("ADMIN_TOKEN").ok().filter(|token| !token.trim().is_empty());
    if let Ok(timeout) = env::var("ACTIVATION_TIMEOUT") {
      config.activation_timeout = humantime::parse_duration(&timeout)
        .context("Invalid ACTIVATION_TIMEOUT")?;
    }
    if let Ok(retention) = env::var("LOG_RETENTION") {
      config.log_retention = humantime::parse_duration(&retention)
        .context("Invalid LOG_RETENTION")?;
    }
    if let Ok(rate) = env::var("RATE_PER_SECOND") {
      config.rate_per_second = rate.parse().context("Invalid RATE_PER_SECOND")?;
    }
    if let Ok(burst) = env::var("RATE_BURST") {
      config.rate_burst = burst.parse().context("Invalid RATE_BURST")?;
    }

    Ok(config)
  }
}

pub struct Services<'a> {
  pub license: sv::License<'a>,
  pub logs: sv::Logs<'a>,
}

pub struct AppState {
  pub db: DatabaseConnection,
  pub config: Config,
  pub engine: Coordinator,
  /// Drained by the audit plugin
  pub audit_rx: Mutex<UnboundedReceiver<Entry>>,
  stop: watch::Sender<bool>,
}

impl AppState {
  pub async fn new(config: Config) -> anyhow::Result<Self> {
    info!("Connecting to database...");
    let db = Database::connect(&config.database_url)
      .await
      .context("Failed to connect to database")?;

    info!("Running migrations...");
    Migrator::up(&db, None).await.context("Failed to run migrations")?;

    Ok(Self::with_db(db, config))
  }

  pub fn with_db(db: DatabaseConnection, config: Config) -> Self {
    let (channel, audit_rx) = audit::Channel::new();
    let engine = Coordinator::new(
      Arc::new(repo::Sql::new(db.clone())),
      Arc::new(channel),
      config.activation_timeout,
    );

    Self {
      db,
      config,
      engine,
      audit_rx: Mutex::new(audit_rx),
      stop: watch::channel(false).0,
    }
  }

  pub fn sv(&self) -> Services<'_> {
    Services {
      license: sv::License::new(&self.db, self.repo()),
      logs: sv::Logs::new(&self.db),
    }
  }

  pub fn repo(&self) -> &dyn Repo {
    &**self.engine.repo()
  }

  pub fn shutdown(&self) {
    self.stop.send_replace(true);
  }

  pub fn is_stopping(&self) -> bool {
    *self.stop.borrow()
  }

  /// Resolves once [`AppState::shutdown`] was called.
  pub async fn stopped(&self) {
    let mut rx = self.stop.subscribe();
    let _ = rx.wait_for(|stop| *stop).await;
  }
}
