//! Storage seam of the engine.
//!
//! A [`Repo`] hands out read-only lookups and [`Unit`]s. A unit is one atomic
//! unit of work: everything done through it commits together or not at all,
//! and dropping it without [`Unit::commit`] rolls it back. Usage counters are
//! only ever moved by [`Unit::claim_slot`], a conditional update evaluated by
//! the store itself, so correctness never depends on a process-local lock.

#[cfg(test)]
pub mod memory;
pub mod sql;

use async_trait::async_trait;

#[cfg(test)]
pub use memory::Memory;
pub use sql::Sql;

use crate::{
  entity::{device, license},
  prelude::*,
};

#[async_trait]
pub trait Repo: Send + Sync {
  async fn by_key(&self, key: &str) -> Result<Option<license::Model>>;

  async fn device(
    &self,
    license_id: Uuid,
    hwid: &str,
  ) -> Result<Option<device::Model>>;

  async fn begin(&self) -> Result<Box<dyn Unit>>;
}

#[async_trait]
pub trait Unit: Send {
  /// Locks the license for writing until the unit ends, then reads it.
  async fn license(&mut self, id: Uuid) -> Result<Option<license::Model>>;

  async fn device(
    &mut self,
    license_id: Uuid,
    hwid: &str,
  ) -> Result<Option<device::Model>>;

  async fn count_devices(&mut self, license_id: Uuid) -> Result<u64>;

  /// Consumes one usage slot if `license` is still at the observed version
  /// and below its limit. Returns `false` when another writer got there first
  /// or no slot is left.
  async fn claim_slot(&mut self, license: &license::Model) -> Result<bool>;

  /// Returns `None` when the `(license, hwid)` pair is already bound.
  async fn insert_device(
    &mut self,
    device: device::Model,
  ) -> Result<Option<device::Model>>;

  /// Writes `active` and `expires_at` if `license.version` is still current.
  async fn save(&mut self, license: &license::Model) -> Result<bool>;

  async fn commit(self: Box<Self>) -> Result<()>;

  async fn rollback(self: Box<Self>) -> Result<()>;
}
