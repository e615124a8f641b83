pub use sea_orm_migration::prelude::*;

mod m20261001_000001_create_licenses;
mod m20261001_000002_create_devices;
mod m20261001_000003_create_activation_logs;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
  fn migrations() -> Vec<Box<dyn MigrationTrait>> {
    vec![
      Box::new(m20261001_000001_create_licenses::Migration),
      Box::new(m20261001_000002_create_devices::Migration),
      Box::new(m20261001_000003_create_activation_logs::Migration),
    ]
  }
}
