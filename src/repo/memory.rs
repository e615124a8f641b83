//! In-memory repository for tests.
//!
//! A unit holds the writer lock for its whole lifetime and works on a copy,
//! which is published only on commit. Plain reads never wait for a unit.

use std::{
  collections::HashMap,
  sync::{
    RwLock,
    atomic::{AtomicBool, Ordering},
  },
};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use super::{Repo, Unit};
use crate::{
  entity::{device, license},
  prelude::*,
};

#[derive(Debug, Default, Clone)]
pub struct Store {
  pub licenses: HashMap<Uuid, license::Model>,
  pub devices: Vec<device::Model>,
}

impl Store {
  fn by_key(&self, key: &str) -> Option<license::Model> {
    self.licenses.values().find(|license| license.key == key).cloned()
  }

  fn device(&self, license_id: Uuid, hwid: &str) -> Option<device::Model> {
    self
      .devices
      .iter()
      .find(|d| d.license_id == license_id && d.hwid == hwid)
      .cloned()
  }

  pub fn devices_of(&self, license_id: Uuid) -> usize {
    self.devices.iter().filter(|d| d.license_id == license_id).count()
  }
}

#[derive(Default)]
pub struct Memory {
  store: Arc<RwLock<Store>>,
  writer: Arc<Mutex<()>>,
  broken: AtomicBool,
}

impl Memory {
  pub fn with(licenses: impl IntoIterator<Item = license::Model>) -> Self {
    let store = Store {
      licenses: licenses.into_iter().map(|l| (l.id, l)).collect(),
      devices: Vec::new(),
    };
    Self { store: Arc::new(RwLock::new(store)), ..Self::default() }
  }

  /// Makes every following storage call fail.
  pub fn break_storage(&self) {
    self.broken.store(true, Ordering::SeqCst);
  }

  pub fn snapshot(&self) -> Store {
    self.read().clone()
  }

  fn read(&self) -> std::sync::RwLockReadGuard<'_, Store> {
    self.store.read().unwrap_or_else(|poisoned| poisoned.into_inner())
  }

  fn check(&self) -> Result<()> {
    if self.broken.load(Ordering::SeqCst) {
      return Err(Error::Internal("storage unavailable".into()));
    }
    Ok(())
  }
}

#[async_trait]
impl Repo for Memory {
  async fn by_key(&self, key: &str) -> Result<Option<license::Model>> {
    self.check()?;
    Ok(self.read().by_key(key))
  }

  async fn device(
    &self,
    license_id: Uuid,
    hwid: &str,
  ) -> Result<Option<device::Model>> {
    self.check()?;
    Ok(self.read().device(license_id, hwid))
  }

  async fn begin(&self) -> Result<Box<dyn Unit>> {
    self.check()?;
    let guard = self.writer.clone().lock_owned().await;
    let staged = self.read().clone();
    Ok(Box::new(MemoryUnit { _guard: guard, store: self.store.clone(), staged }))
  }
}

struct MemoryUnit {
  _guard: OwnedMutexGuard<()>,
  store: Arc<RwLock<Store>>,
  staged: Store,
}

#[async_trait]
impl Unit for MemoryUnit {
  async fn license(&mut self, id: Uuid) -> Result<Option<license::Model>> {
    Ok(self.staged.licenses.get(&id).cloned())
  }

  async fn device(
    &mut self,
    license_id: Uuid,
    hwid: &str,
  ) -> Result<Option<device::Model>> {
    Ok(self.staged.device(license_id, hwid))
  }

  async fn count_devices(&mut self, license_id: Uuid) -> Result<u64> {
    Ok(self.staged.devices_of(license_id) as u64)
  }

  async fn claim_slot(&mut self, license: &license::Model) -> Result<bool> {
    let Some(stored) = self.staged.licenses.get_mut(&license.id) else {
      return Ok(false);
    };
    if stored.version != license.version || !stored.has_free_slot() {
      return Ok(false);
    }
    stored.usage_count += 1;
    stored.version += 1;
    Ok(true)
  }

  async fn insert_device(
    &mut self,
    device: device::Model,
  ) -> Result<Option<device::Model>> {
    if self.staged.device(device.license_id, &device.hwid).is_some() {
      return Ok(None);
    }
    self.staged.devices.push(device.clone());
    Ok(Some(device))
  }

  async fn save(&mut self, license: &license::Model) -> Result<bool> {
    let Some(stored) = self.staged.licenses.get_mut(&license.id) else {
      return Ok(false);
    };
    if stored.version != license.version {
      return Ok(false);
    }
    stored.active = license.active;
    stored.expires_at = license.expires_at;
    stored.version += 1;
    Ok(true)
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    let MemoryUnit { _guard, store, staged } = *self;
    *store.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = staged;
    Ok(())
  }

  async fn rollback(self: Box<Self>) -> Result<()> {
    Ok(())
  }
}
