//! Fire-and-forget audit trail of engine decisions.
//!
//! The engine hands every terminal outcome to an [`Audit`] sink without
//! waiting on storage; the `audit` plugin drains the channel into
//! `activation_logs`.

use tokio::sync::mpsc;

use crate::{
  engine::Reason,
  entity::activation_log::{Action, Outcome},
  prelude::*,
};

#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
  pub license_id: Option<Uuid>,
  pub device_id: Option<Uuid>,
  pub key: String,
  pub hwid: Option<String>,
  pub action: Action,
  pub outcome: Outcome,
  pub ip: Option<String>,
  pub at: DateTime,
}

impl Entry {
  pub fn new(
    action: Action,
    key: &str,
    hwid: Option<&str>,
    ip: Option<&str>,
  ) -> Self {
    Self {
      license_id: None,
      device_id: None,
      key: key.to_string(),
      hwid: hwid.map(String::from),
      action,
      outcome: Outcome::InternalError,
      ip: ip.map(String::from),
      at: now(),
    }
  }

  pub fn outcome<T>(mut self, result: &Result<T, Reason>) -> Self {
    self.outcome = match result {
      Ok(_) => Outcome::Success,
      Err(reason) => (*reason).into(),
    };
    self
  }
}

pub trait Audit: Send + Sync {
  /// Must not block.
  fn record(&self, entry: Entry);
}

pub struct Channel {
  tx: mpsc::UnboundedSender<Entry>,
}

impl Channel {
  pub fn new() -> (Self, mpsc::UnboundedReceiver<Entry>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }
}

impl Audit for Channel {
  fn record(&self, entry: Entry) {
    if let Err(mpsc::error::SendError(entry)) = self.tx.send(entry) {
      error!("Audit writer is gone, entry not persisted: {entry:?}");
    }
  }
}

/// Keeps entries in memory, for tests.
#[cfg(test)]
#[derive(Default)]
pub struct Recorder {
  entries: std::sync::Mutex<Vec<Entry>>,
}

#[cfg(test)]
impl Recorder {
  pub fn entries(&self) -> Vec<Entry> {
    self.entries.lock().unwrap().clone()
  }
}

#[cfg(test)]
impl Audit for Recorder {
  fn record(&self, entry: Entry) {
    self.entries.lock().unwrap().push(entry);
  }
}
