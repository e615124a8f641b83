//! Administrative license operations and dashboard counters.
//!
//! Writes go through the same repository units as activation, with a version
//! check, so an admin change never clobbers a concurrent usage increment.

use serde::Serialize;

use crate::{
  entity::{activation_log, device, license},
  prelude::*,
  repo::Repo,
};

const MAX_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stats {
  pub licenses: u64,
  pub active: u64,
  pub devices: u64,
  pub activations_24h: u64,
}

pub struct License<'a> {
  db: &'a DatabaseConnection,
  repo: &'a dyn Repo,
}

impl<'a> License<'a> {
  pub fn new(db: &'a DatabaseConnection, repo: &'a dyn Repo) -> Self {
    Self { db, repo }
  }

  pub async fn set_active(
    &self,
    key: &str,
    active: bool,
  ) -> Result<license::Model> {
    self.update(key, |license| license.active = active).await
  }

  /// Pushes expiry out by `days`, counting from now if already expired.
  /// Non-expiring licenses stay non-expiring.
  pub async fn extend(&self, key: &str, days: i64) -> Result<license::Model> {
    let now = now();
    self
      .update(key, |license| {
        license.expires_at = license
          .expires_at
          .map(|exp| exp.max(now) + TimeDelta::days(days));
      })
      .await
  }

  async fn update<F>(&self, key: &str, apply: F) -> Result<license::Model>
  where
    F: Fn(&mut license::Model) + Send + Sync,
  {
    let id = self.repo.by_key(key).await?.ok_or(Error::LicenseNotFound)?.id;

    for _ in 0..MAX_ATTEMPTS {
      let mut unit = self.repo.begin().await?;
      let Some(mut license) = unit.license(id).await? else {
        unit.rollback().await?;
        return Err(Error::LicenseNotFound);
      };

      apply(&mut license);
      if unit.save(&license).await? {
        unit.commit().await?;
        license.version += 1;
        info!(key, active = license.active, expires_at = ?license.expires_at, "License updated");
        return Ok(license);
      }
      unit.rollback().await?;
    }

    Err(Error::Contention(MAX_ATTEMPTS))
  }

  pub async fn stats(&self) -> Result<Stats> {
    let now = now();

    let licenses = license::Entity::find().count(self.db).await?;
    let active = license::Entity::find()
      .filter(license::Column::Active.eq(true))
      .filter(
        sea_orm::Condition::any()
          .add(license::Column::ExpiresAt.is_null())
          .add(license::Column::ExpiresAt.gt(now)),
      )
      .count(self.db)
      .await?;
    let devices = device::Entity::find().count(self.db).await?;
    let activations_24h = activation_log::Entity::find()
      .filter(activation_log::Column::Action.eq(activation_log::Action::Activate))
      .filter(activation_log::Column::Outcome.eq(activation_log::Outcome::Success))
      .filter(activation_log::Column::CreatedAt.gt(now - TimeDelta::hours(24)))
      .count(self.db)
      .await?;

    Ok(Stats { licenses, active, devices, activations_24h })
  }
}
