use async_trait::async_trait;
use sea_orm::{
  Condition, DatabaseTransaction, SqlErr,
  sea_query::Expr,
};

use super::{Repo, Unit};
use crate::{
  entity::{device, license},
  prelude::*,
};

/// Repository backed by any SeaORM connection, one transaction per unit.
pub struct Sql {
  db: DatabaseConnection,
}

impl Sql {
  pub fn new(db: DatabaseConnection) -> Self {
    Self { db }
  }
}

#[async_trait]
impl Repo for Sql {
  async fn by_key(&self, key: &str) -> Result<Option<license::Model>> {
    let license = license::Entity::find()
      .filter(license::Column::Key.eq(key))
      .one(&self.db)
      .await?;
    Ok(license)
  }

  async fn device(
    &self,
    license_id: Uuid,
    hwid: &str,
  ) -> Result<Option<device::Model>> {
    Ok(find_device(license_id, hwid).one(&self.db).await?)
  }

  async fn begin(&self) -> Result<Box<dyn Unit>> {
    Ok(Box::new(SqlUnit { txn: self.db.begin().await? }))
  }
}

fn find_device(license_id: Uuid, hwid: &str) -> sea_orm::Select<device::Entity> {
  device::Entity::find()
    .filter(device::Column::LicenseId.eq(license_id))
    .filter(device::Column::Hwid.eq(hwid))
}

fn below_limit() -> Condition {
  Condition::any()
    .add(license::Column::UsageLimit.is_null())
    .add(
      Expr::col(license::Column::UsageCount)
        .lt(Expr::col(license::Column::UsageLimit)),
    )
}

struct SqlUnit {
  txn: DatabaseTransaction,
}

#[async_trait]
impl Unit for SqlUnit {
  async fn license(&mut self, id: Uuid) -> Result<Option<license::Model>> {
    // no-op write: the unit holds the write lock before its first read, so
    // competing units queue on the busy timeout
    license::Entity::update_many()
      .col_expr(
        license::Column::Version,
        Expr::col(license::Column::Version).add(0),
      )
      .filter(license::Column::Id.eq(id))
      .exec(&self.txn)
      .await?;

    Ok(license::Entity::find_by_id(id).one(&self.txn).await?)
  }

  async fn device(
    &mut self,
    license_id: Uuid,
    hwid: &str,
  ) -> Result<Option<device::Model>> {
    Ok(find_device(license_id, hwid).one(&self.txn).await?)
  }

  async fn count_devices(&mut self, license_id: Uuid) -> Result<u64> {
    let count = device::Entity::find()
      .filter(device::Column::LicenseId.eq(license_id))
      .count(&self.txn)
      .await?;
    Ok(count)
  }

  async fn claim_slot(&mut self, license: &license::Model) -> Result<bool> {
    let res = license::Entity::update_many()
      .col_expr(
        license::Column::UsageCount,
        Expr::col(license::Column::UsageCount).add(1),
      )
      .col_expr(
        license::Column::Version,
        Expr::col(license::Column::Version).add(1),
      )
      .filter(license::Column::Id.eq(license.id))
      .filter(license::Column::Version.eq(license.version))
      .filter(below_limit())
      .exec(&self.txn)
      .await?;

    Ok(res.rows_affected == 1)
  }

  async fn insert_device(
    &mut self,
    device: device::Model,
  ) -> Result<Option<device::Model>> {
    let model = device::ActiveModel::from(device);
    match model.insert(&self.txn).await {
      Ok(device) => Ok(Some(device)),
      Err(err)
        if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) =>
      {
        Ok(None)
      }
      Err(err) => Err(err.into()),
    }
  }

  async fn save(&mut self, license: &license::Model) -> Result<bool> {
    let res = license::Entity::update_many()
      .col_expr(license::Column::Active, Expr::value(license.active))
      .col_expr(license::Column::ExpiresAt, Expr::value(license.expires_at))
      .col_expr(
        license::Column::Version,
        Expr::col(license::Column::Version).add(1),
      )
      .filter(license::Column::Id.eq(license.id))
      .filter(license::Column::Version.eq(license.version))
      .exec(&self.txn)
      .await?;

    Ok(res.rows_affected == 1)
  }

  async fn commit(self: Box<Self>) -> Result<()> {
    Ok(self.txn.commit().await?)
  }

  async fn rollback(self: Box<Self>) -> Result<()> {
    Ok(self.txn.rollback().await?)
  }
}

#[cfg(test)]
mod tests {
  use migration::{Migrator, MigratorTrait};

  use super::*;
  use crate::testing::{self, device};

  async fn seed(db: &DatabaseConnection, limit: Option<i32>) -> license::Model {
    testing::seed(db, testing::license("ABC-123", limit)).await
  }

  #[tokio::test]
  async fn test_claim_slot_respects_limit() {
    let db = testing::db().await;
    let license = seed(&db, Some(1)).await;
    let repo = Sql::new(db);

    let mut unit = repo.begin().await.unwrap();
    assert!(unit.claim_slot(&license).await.unwrap());
    unit.commit().await.unwrap();

    let mut unit = repo.begin().await.unwrap();
    let fresh = unit.license(license.id).await.unwrap().unwrap();
    assert_eq!(fresh.usage_count, 1);
    assert_eq!(fresh.version, 1);
    assert!(!unit.claim_slot(&fresh).await.unwrap());
    unit.rollback().await.unwrap();
  }

  #[tokio::test]
  async fn test_claim_slot_unlimited() {
    let db = testing::db().await;
    let mut license = seed(&db, None).await;
    let repo = Sql::new(db);

    for _ in 0..3 {
      let mut unit = repo.begin().await.unwrap();
      assert!(unit.claim_slot(&license).await.unwrap());
      license = unit.license(license.id).await.unwrap().unwrap();
      unit.commit().await.unwrap();
    }
    assert_eq!(license.usage_count, 3);
  }

  #[tokio::test]
  async fn test_duplicate_device_is_reported() {
    let db = testing::db().await;
    let license = seed(&db, Some(2)).await;
    let repo = Sql::new(db);

    let mut unit = repo.begin().await.unwrap();
    assert!(unit.insert_device(device(&license, "H1")).await.unwrap().is_some());
    assert!(unit.insert_device(device(&license, "H1")).await.unwrap().is_none());
    assert_eq!(unit.count_devices(license.id).await.unwrap(), 1);
    unit.commit().await.unwrap();

    assert!(repo.device(license.id, "H1").await.unwrap().is_some());
  }

  #[tokio::test]
  async fn test_rollback_discards_everything() {
    let db = testing::db().await;
    let license = seed(&db, Some(2)).await;
    let repo = Sql::new(db);

    let mut unit = repo.begin().await.unwrap();
    assert!(unit.claim_slot(&license).await.unwrap());
    unit.insert_device(device(&license, "H1")).await.unwrap();
    unit.rollback().await.unwrap();

    let stored = repo.by_key("ABC-123").await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 0);
    assert!(repo.device(license.id, "H1").await.unwrap().is_none());
  }

  // Two independent connections to one file behave like two server processes.
  #[tokio::test]
  async fn test_stale_snapshot_loses_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let url = testing::file_url(&dir);

    let first = Sql::new(Database::connect(&url).await.unwrap());
    Migrator::up(&first.db, None).await.unwrap();
    let second = Sql::new(Database::connect(&url).await.unwrap());

    let seeded = seed(&first.db, Some(2)).await;
    let stale = second.by_key("ABC-123").await.unwrap().unwrap();

    let mut unit = first.begin().await.unwrap();
    assert!(unit.claim_slot(&seeded).await.unwrap());
    unit.commit().await.unwrap();

    let mut unit = second.begin().await.unwrap();
    assert!(!unit.claim_slot(&stale).await.unwrap());
    let fresh = unit.license(stale.id).await.unwrap().unwrap();
    assert!(unit.claim_slot(&fresh).await.unwrap());
    unit.commit().await.unwrap();

    let stored = first.by_key("ABC-123").await.unwrap().unwrap();
    assert_eq!(stored.usage_count, 2);
  }

  #[tokio::test]
  async fn test_save_is_version_checked() {
    let db = testing::db().await;
    let license = seed(&db, Some(1)).await;
    let repo = Sql::new(db);

    let mut unit = repo.begin().await.unwrap();
    let changed = license::Model { active: false, ..license.clone() };
    assert!(unit.save(&changed).await.unwrap());
    // same snapshot again: version moved on
    assert!(!unit.save(&changed).await.unwrap());
    unit.commit().await.unwrap();

    let stored = repo.by_key("ABC-123").await.unwrap().unwrap();
    assert!(!stored.active);
    assert_eq!(stored.version, 1);
  }
}
