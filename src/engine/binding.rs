use crate::{
  entity::{device, license},
  prelude::*,
  repo::Unit,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Binding {
  /// Pair already bound, must not consume another slot.
  Existing(device::Model),
  Bindable,
  LimitExceeded,
}

/// Must run inside the same unit that later claims the slot.
pub async fn resolve(
  unit: &mut dyn Unit,
  license: &license::Model,
  hwid: &str,
) -> Result<Binding> {
  if let Some(device) = unit.device(license.id, hwid).await? {
    return Ok(Binding::Existing(device));
  }

  let Some(limit) = license.usage_limit else {
    return Ok(Binding::Bindable);
  };

  let bound = unit.count_devices(license.id).await?;
  if bound < limit.max(0) as u64 {
    Ok(Binding::Bindable)
  } else {
    Ok(Binding::LimitExceeded)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    entity::LicenseType,
    repo::{Memory, Repo},
    testing::{self, device},
  };

  #[tokio::test]
  async fn test_resolve_states() {
    let license = testing::license("ABC-123", Some(1));
    let repo = Memory::with([license.clone()]);

    let mut unit = repo.begin().await.unwrap();
    assert_eq!(
      resolve(&mut *unit, &license, "H1").await.unwrap(),
      Binding::Bindable
    );

    let bound = unit.insert_device(device(&license, "H1")).await.unwrap().unwrap();
    assert_eq!(
      resolve(&mut *unit, &license, "H1").await.unwrap(),
      Binding::Existing(bound)
    );
    assert_eq!(
      resolve(&mut *unit, &license, "H2").await.unwrap(),
      Binding::LimitExceeded
    );
  }

  #[tokio::test]
  async fn test_unlimited_is_always_bindable() {
    let license = license::Model::new("ENT-1", LicenseType::Enterprise, now());
    let repo = Memory::with([license.clone()]);

    let mut unit = repo.begin().await.unwrap();
    for n in 0..10 {
      let hwid = format!("H{n}");
      assert_eq!(
        resolve(&mut *unit, &license, &hwid).await.unwrap(),
        Binding::Bindable
      );
      unit.insert_device(device(&license, &hwid)).await.unwrap();
    }
  }
}
