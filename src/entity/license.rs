//! License entity - keys, limits and usage counters

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum LicenseType {
  #[sea_orm(string_value = "trial")]
  Trial,
  #[sea_orm(string_value = "standard")]
  #[default]
  Standard,
  #[sea_orm(string_value = "enterprise")]
  Enterprise,
}

impl LicenseType {
  /// Device slots a freshly provisioned license of this type gets.
  /// `None` is unlimited.
  pub fn default_usage_limit(self) -> Option<i32> {
    match self {
      Self::Trial => Some(1),
      Self::Standard => Some(3),
      Self::Enterprise => None,
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "licenses")]
pub struct Model {
  #[sea_orm(primary_key, auto_increment = false)]
  pub id: Uuid,
  #[sea_orm(unique)]
  pub key: String,
  pub license_type: LicenseType,
  pub usage_count: i32,
  /// `None` means unlimited
  pub usage_limit: Option<i32>,
  pub active: bool,
  pub expires_at: Option<DateTime>,
  pub owner_id: Option<Uuid>,
  /// Bumped on every write, compared on every conditional update.
  pub version: i32,
  pub created_at: DateTime,
}

impl Model {
  pub fn new(key: impl Into<String>, ty: LicenseType, now: DateTime) -> Self {
    Self {
      id: Uuid::new_v4(),
      key: key.into(),
      license_type: ty,
      usage_count: 0,
      usage_limit: ty.default_usage_limit(),
      active: true,
      expires_at: None,
      owner_id: None,
      version: 0,
      created_at: now,
    }
  }

  pub fn is_expired(&self, now: DateTime) -> bool {
    self.expires_at.is_some_and(|exp| now >= exp)
  }

  pub fn has_free_slot(&self) -> bool {
    self.usage_limit.is_none_or(|limit| self.usage_count < limit)
  }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
  #[sea_orm(has_many = "super::device::Entity")]
  Devices,
}

impl Related<super::device::Entity> for Entity {
  fn to() -> RelationDef {
    Relation::Devices.def()
  }
}

impl ActiveModelBehavior for ActiveModel {}
