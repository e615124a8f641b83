use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "devices")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  pub license_id: Uuid,
  pub hwid: String,
  pub name: Option<String>,
  pub ip: Option<String>,
  pub mac: Option<String>,
  /// Whatever else the client reported, kept verbatim
  pub device_info: Option<Json>,
  pub user_id: Option<Uuid>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(
    belongs_to = "super::license::Entity",
    from = "Column::LicenseId",
    to = "super::license::Column::Id",
    on_delete = "Cascade"
  )]
  License,
}

impl Related<super::license::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::License.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
