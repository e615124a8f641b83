use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(Licenses::Table)
          .if_not_exists()
          .col(ColumnDef::new(Licenses::Id).uuid().not_null().primary_key())
          .col(ColumnDef::new(Licenses::Key).string().not_null().unique_key())
          .col(
            ColumnDef::new(Licenses::LicenseType)
              .string()
              .not_null()
              .default("standard"),
          )
          .col(
            ColumnDef::new(Licenses::UsageCount).integer().not_null().default(0),
          )
          .col(ColumnDef::new(Licenses::UsageLimit).integer().null())
          .col(ColumnDef::new(Licenses::Active).boolean().not_null().default(true))
          .col(ColumnDef::new(Licenses::ExpiresAt).date_time().null())
          .col(ColumnDef::new(Licenses::OwnerId).uuid().null())
          .col(ColumnDef::new(Licenses::Version).integer().not_null().default(0))
          .col(ColumnDef::new(Licenses::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_licenses_owner")
          .table(Licenses::Table)
          .col(Licenses::OwnerId)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager.drop_table(Table::drop().table(Licenses::Table).to_owned()).await
  }
}

#[derive(DeriveIden)]
pub enum Licenses {
  Table,
  Id,
  Key,
  LicenseType,
  UsageCount,
  UsageLimit,
  Active,
  ExpiresAt,
  OwnerId,
  Version,
  CreatedAt,
}
