//! Fixtures shared by unit tests.

use migration::{Migrator, MigratorTrait};

use crate::{
  entity::{LicenseType, device, license},
  prelude::*,
};

pub async fn db() -> DatabaseConnection {
  let db = Database::connect("sqlite::memory:").await.unwrap();
  Migrator::up(&db, None).await.unwrap();
  db
}

/// URL of a database file inside `dir`. Every `Database::connect` on it
/// opens an independent pool, like a separate server process would.
pub fn file_url(dir: &tempfile::TempDir) -> String {
  format!("sqlite://{}?mode=rwc", dir.path().join("licenses.db").display())
}

pub fn license(key: &str, limit: Option<i32>) -> license::Model {
  let mut license = license::Model::new(key, LicenseType::Standard, now());
  license.usage_limit = limit;
  license
}

pub async fn seed(
  db: &DatabaseConnection,
  license: license::Model,
) -> license::Model {
  license::ActiveModel::from(license).insert(db).await.unwrap()
}

pub fn device(license: &license::Model, hwid: &str) -> device::Model {
  device::Model {
    id: Uuid::new_v4(),
    license_id: license.id,
    hwid: hwid.into(),
    name: None,
    ip: None,
    mac: None,
    device_info: None,
    user_id: None,
    created_at: now(),
  }
}
