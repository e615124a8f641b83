use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
  async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .create_table(
        Table::create()
          .table(ActivationLogs::Table)
          .if_not_exists()
          .col(
            ColumnDef::new(ActivationLogs::Id)
              .big_integer()
              .not_null()
              .auto_increment()
              .primary_key(),
          )
          .col(ColumnDef::new(ActivationLogs::LicenseId).uuid().null())
          .col(ColumnDef::new(ActivationLogs::DeviceId).uuid().null())
          .col(ColumnDef::new(ActivationLogs::Key).string().not_null())
          .col(ColumnDef::new(ActivationLogs::Hwid).string().null())
          .col(ColumnDef::new(ActivationLogs::Action).string().not_null())
          .col(ColumnDef::new(ActivationLogs::Outcome).string().not_null())
          .col(ColumnDef::new(ActivationLogs::Ip).string().null())
          .col(ColumnDef::new(ActivationLogs::CreatedAt).date_time().not_null())
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_activation_logs_license")
          .table(ActivationLogs::Table)
          .col(ActivationLogs::LicenseId)
          .to_owned(),
      )
      .await?;

    manager
      .create_index(
        Index::create()
          .name("idx_activation_logs_created")
          .table(ActivationLogs::Table)
          .col(ActivationLogs::CreatedAt)
          .to_owned(),
      )
      .await
  }

  async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
    manager
      .drop_table(Table::drop().table(ActivationLogs::Table).to_owned())
      .await
  }
}

#[derive(DeriveIden)]
pub enum ActivationLogs {
  Table,
  Id,
  LicenseId,
  DeviceId,
  Key,
  Hwid,
  Action,
  Outcome,
  Ip,
  CreatedAt,
}
