use sea_orm_migration::prelude::*;

use super::m20261001_000001_create_licenses::Licenses;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Devices::Table)
          .if_not_exists()
          .col(ColumnDef::new(Devices::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Devices::LicenseId).uuid().not_null())
          .col(ColumnDef::new(Devices::Hwid).string().not_null())
          .col(ColumnDef::new(Devices::Name).string().null())
          .col(ColumnDef::new(Devices::Ip).string().null())
          .col(ColumnDef::new(Devices::Mac).string().null())
          .col(ColumnDef::new(Devices::DeviceInfo).json().null())
          .col(ColumnDef::new(Devices::UserId).uuid().null())
          .col(ColumnDef::new(Devices::CreatedAt).date_time().not_null())
          .foreign_key(
            ForeignKey::create()
              .name("fk_devices_license")
              .from(Devices::Table, Devices::LicenseId)
              .to(Licenses::Table, Licenses::Id)
              .on_delete(ForeignKeyAction::Cascade),
          )
          .to_owned(),
      )
      .await?;

    // one binding per (license, hwid), whatever the application does
    manager
      .create_index(
        Index::create()
          .name("idx_devices_license_hwid")
          .table(Devices::Table)
          .col(Devices::LicenseId)
          .col(Devices::Hwid)
          .unique()
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Devices::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Devices {
  Table,
  Id,
  LicenseId,
  Hwid,
  Name,
  Ip,
  Mac,
  DeviceInfo,
  UserId,
  CreatedAt,
}
