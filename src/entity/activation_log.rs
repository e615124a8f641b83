//! Append-only trail of activation and validation attempts

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::engine::Reason;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "lowercase")]
pub enum Action {
  #[sea_orm(string_value = "activate")]
  Activate,
  #[sea_orm(string_value = "validate")]
  Validate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[derive(EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
  #[sea_orm(string_value = "SUCCESS")]
  Success,
  #[sea_orm(string_value = "INVALID_KEY")]
  InvalidKey,
  #[sea_orm(string_value = "INACTIVE")]
  Inactive,
  #[sea_orm(string_value = "EXPIRED")]
  Expired,
  #[sea_orm(string_value = "USAGE_LIMIT_EXCEEDED")]
  UsageLimitExceeded,
  #[sea_orm(string_value = "INTERNAL_ERROR")]
  InternalError,
}

impl From<Reason> for Outcome {
  fn from(reason: Reason) -> Self {
    match reason {
      Reason::InvalidKey => Self::InvalidKey,
      Reason::Inactive => Self::Inactive,
      Reason::Expired => Self::Expired,
      Reason::UsageLimitExceeded => Self::UsageLimitExceeded,
      Reason::InternalError => Self::InternalError,
    }
  }
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "activation_logs")]
#[serde(rename_all = "camelCase")]
pub struct Model {
  #[sea_orm(primary_key)]
  pub id: i64,
  /// Unset when the key did not resolve
  pub license_id: Option<Uuid>,
  /// Unset when the attempt failed before a device was resolved
  pub device_id: Option<Uuid>,
  pub key: String,
  pub hwid: Option<String>,
  pub action: Action,
  pub outcome: Outcome,
  pub ip: Option<String>,
  pub created_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
