//! Persists audit entries emitted by the engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{audit::Entry, prelude::*, state::AppState};

pub struct Plugin;

#[async_trait]
impl super::Plugin for Plugin {
  async fn start(&self, app: Arc<AppState>) -> anyhow::Result<()> {
    // held for the plugin lifetime, a restarted writer picks up where it left
    let mut rx = app.audit_rx.lock().await;

    loop {
      tokio::select! {
        entry = rx.recv() => match entry {
          Some(entry) => persist(&app, entry).await,
          None => break,
        },
        _ = app.stopped() => {
          rx.close();
          while let Some(entry) = rx.recv().await {
            persist(&app, entry).await;
          }
          break;
        }
      }
    }

    info!("Audit channel closed, writer done");
    Ok(())
  }
}

async fn persist(app: &AppState, entry: Entry) {
  if let Err(err) = app.sv().logs.append(entry.clone()).await {
    error!("Failed to persist audit entry {entry:?}: {err}");
  }
}
