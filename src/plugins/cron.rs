//! Periodic maintenance: activation log retention.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{prelude::*, state::AppState};

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    let retention = TimeDelta::from_std(app.config.log_retention)
      .context("LOG_RETENTION out of range")?;

    let mut interval = tokio::time::interval(Duration::from_secs(3600));
    loop {
      interval.tick().await;

      let cutoff = now() - retention;
      match app.sv().logs.purge_before(cutoff).await {
        Ok(0) => debug!("Log retention: nothing to purge"),
        Ok(purged) => info!("Log retention: purged {purged} entries before {cutoff}"),
        Err(err) => error!("Log retention failed: {err}"),
      }
    }
  }
}
