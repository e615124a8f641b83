//! Activation and validation entry points.
//!
//! `activate` resolves the key, fails fast on inactive or expired licenses,
//! then re-reads the license inside a storage unit, resolves the device
//! binding there and claims a usage slot with a conditional update. Losing a
//! race rolls the unit back and starts over from fresh state.

use tokio::time;

use super::{
  Reason, Verdict,
  binding::{self, Binding},
  validator::{self, Probe},
};
use crate::{
  audit::{Audit, Entry},
  entity::{activation_log::Action, device, license},
  prelude::*,
  repo::Repo,
};

const MAX_ATTEMPTS: usize = 8;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceInfo {
  pub hwid: String,
  pub name: Option<String>,
  pub ip: Option<String>,
  pub mac: Option<String>,
  pub user_id: Option<Uuid>,
  /// Any other reported attributes
  pub extra: Option<json::Value>,
}

impl DeviceInfo {
  fn bind(&self, license_id: Uuid, source_ip: Option<&str>) -> device::Model {
    device::Model {
      id: Uuid::new_v4(),
      license_id,
      hwid: self.hwid.clone(),
      name: self.name.clone(),
      ip: self.ip.clone().or_else(|| source_ip.map(String::from)),
      mac: self.mac.clone(),
      device_info: self.extra.clone(),
      user_id: self.user_id,
      created_at: now(),
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activate {
  pub key: String,
  pub device: DeviceInfo,
  pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Activated {
  /// State right after the activation
  pub license: license::Model,
  pub device: device::Model,
  /// `false` when the device was already bound
  pub fresh: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Check {
  pub key: String,
  pub hwid: Option<String>,
  pub ip: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Validation {
  pub license: Option<license::Model>,
  pub verdict: Verdict,
}

pub struct Coordinator {
  repo: Arc<dyn Repo>,
  audit: Arc<dyn Audit>,
  budget: Duration,
}

fn internal(err: Error) -> Reason {
  error!("License engine storage failure: {err}");
  Reason::InternalError
}

impl Coordinator {
  pub fn new(repo: Arc<dyn Repo>, audit: Arc<dyn Audit>, budget: Duration) -> Self {
    Self { repo, audit, budget }
  }

  pub fn repo(&self) -> &Arc<dyn Repo> {
    &self.repo
  }

  pub async fn activate(&self, cmd: Activate) -> Result<Activated, Reason> {
    let mut entry = Entry::new(
      Action::Activate,
      &cmd.key,
      Some(&cmd.device.hwid),
      cmd.ip.as_deref(),
    );

    let result = self.try_activate(&cmd, &mut entry).await;
    match &result {
      Ok(activated) => {
        debug!(key = %cmd.key, hwid = %cmd.device.hwid, fresh = activated.fresh, "Activated");
      }
      Err(reason) => {
        info!(key = %cmd.key, hwid = %cmd.device.hwid, ?reason, "Activation rejected");
      }
    }

    self.audit.record(entry.outcome(&result));
    result
  }

  async fn try_activate(
    &self,
    cmd: &Activate,
    entry: &mut Entry,
  ) -> Result<Activated, Reason> {
    let found = self.repo.by_key(&cmd.key).await.map_err(internal)?;
    validator::validate(found.as_ref(), Probe::Omitted, now()).check()?;
    let Some(license) = found else {
      return Err(Reason::InvalidKey);
    };
    entry.license_id = Some(license.id);

    let activated = match time::timeout(self.budget, self.bind(license.id, cmd))
      .await
    {
      Ok(Ok(result)) => result?,
      Ok(Err(err)) => return Err(internal(err)),
      Err(_) => return Err(internal(Error::Timeout(self.budget))),
    };

    entry.device_id = Some(activated.device.id);
    Ok(activated)
  }

  async fn bind(
    &self,
    license_id: Uuid,
    cmd: &Activate,
  ) -> Result<Result<Activated, Reason>> {
    for attempt in 1..=MAX_ATTEMPTS {
      let mut unit = self.repo.begin().await?;

      let Some(license) = unit.license(license_id).await? else {
        unit.rollback().await?;
        return Ok(Err(Reason::InvalidKey));
      };

      let binding =
        binding::resolve(&mut *unit, &license, &cmd.device.hwid).await?;
      let probe = match binding {
        Binding::Existing(_) => Probe::Bound,
        _ => Probe::Unbound,
      };
      if let Verdict::Invalid(reason) =
        validator::validate(Some(&license), probe, now())
      {
        unit.rollback().await?;
        return Ok(Err(reason));
      }

      match binding {
        Binding::Existing(device) => {
          unit.rollback().await?;
          return Ok(Ok(Activated { license, device, fresh: false }));
        }
        Binding::LimitExceeded => {
          unit.rollback().await?;
          return Ok(Err(Reason::UsageLimitExceeded));
        }
        Binding::Bindable => {}
      }

      if !unit.claim_slot(&license).await? {
        unit.rollback().await?;
        debug!(%license_id, attempt, "Lost usage slot race, retrying");
        continue;
      }

      let device = cmd.device.bind(license.id, cmd.ip.as_deref());
      let Some(device) = unit.insert_device(device).await? else {
        unit.rollback().await?;
        debug!(%license_id, attempt, "Device bound concurrently, retrying");
        continue;
      };

      unit.commit().await?;

      let license = license::Model {
        usage_count: license.usage_count + 1,
        version: license.version + 1,
        ..license
      };
      return Ok(Ok(Activated { license, device, fresh: true }));
    }

    Err(Error::Contention(MAX_ATTEMPTS))
  }

  /// Read-only: never opens a unit and never binds.
  pub async fn validate_only(&self, cmd: Check) -> Validation {
    let mut entry =
      Entry::new(Action::Validate, &cmd.key, cmd.hwid.as_deref(), cmd.ip.as_deref());

    let validation = match self.try_validate(&cmd, &mut entry).await {
      Ok(validation) => validation,
      Err(err) => Validation {
        license: None,
        verdict: Verdict::Invalid(internal(err)),
      },
    };

    self.audit.record(entry.outcome(&validation.verdict.check()));
    validation
  }

  async fn try_validate(
    &self,
    cmd: &Check,
    entry: &mut Entry,
  ) -> Result<Validation> {
    let license = self.repo.by_key(&cmd.key).await?;

    let probe = match (&license, &cmd.hwid) {
      (Some(license), Some(hwid)) => {
        entry.license_id = Some(license.id);
        match self.repo.device(license.id, hwid).await? {
          Some(device) => {
            entry.device_id = Some(device.id);
            Probe::Bound
          }
          None => Probe::Unbound,
        }
      }
      (Some(license), None) => {
        entry.license_id = Some(license.id);
        Probe::Omitted
      }
      (None, _) => Probe::Omitted,
    };

    let verdict = validator::validate(license.as_ref(), probe, now());
    Ok(Validation { license, verdict })
  }
}
