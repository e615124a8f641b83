use std::{net::SocketAddr, sync::Arc};

use axum::{
  extract::{ConnectInfo, Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use super::extract::{Admin, Caller, Json, Query};
use crate::{
  engine::{Activate, Activated, Check, DeviceInfo, Reason},
  entity::{LicenseType, activation_log, license},
  prelude::*,
  state::AppState,
  sv::{
    license::Stats,
    logs::{DEFAULT_LIMIT, Filter, MAX_LIMIT},
  },
};

const INTERNAL: &str = "Internal server error";

/// Blank values are rejected, present ones pass through exactly as sent.
fn required(value: Option<String>, what: &str) -> Result<String> {
  value
    .filter(|value| !value.trim().is_empty())
    .ok_or_else(|| Error::BadRequest(format!("{what} is required")))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceInfoReq {
  pub hwid: Option<String>,
  pub name: Option<String>,
  pub ip: Option<String>,
  pub mac: Option<String>,
  pub user_id: Option<Uuid>,
  #[serde(flatten)]
  pub extra: json::Map<String, json::Value>,
}

impl DeviceInfoReq {
  fn hwid(&self) -> Option<String> {
    self.hwid.clone().filter(|hwid| !hwid.trim().is_empty())
  }
}

impl TryFrom<DeviceInfoReq> for DeviceInfo {
  type Error = Error;

  fn try_from(req: DeviceInfoReq) -> Result<Self> {
    Ok(DeviceInfo {
      hwid: required(req.hwid, "deviceInfo.hwid")?,
      name: req.name,
      ip: req.ip,
      mac: req.mac,
      user_id: req.user_id,
      extra: (!req.extra.is_empty()).then(|| json::Value::Object(req.extra)),
    })
  }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivateReq {
  pub key: Option<String>,
  pub device_info: Option<DeviceInfoReq>,
  pub ip: Option<String>,
}

impl ActivateReq {
  fn into_command(self, peer: SocketAddr) -> Result<Activate> {
    let key = required(self.key, "key")?;
    let device: DeviceInfo = self
      .device_info
      .ok_or_else(|| Error::BadRequest("deviceInfo.hwid is required".into()))?
      .try_into()?;
    let ip = self
      .ip
      .filter(|ip| !ip.trim().is_empty())
      .unwrap_or_else(|| peer.ip().to_string());

    Ok(Activate { key, device, ip: Some(ip) })
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseView {
  pub id: Uuid,
  pub key: String,
  #[serde(rename = "type")]
  pub license_type: LicenseType,
  pub usage_count: i32,
  pub usage_limit: Option<i32>,
  pub expires_at: Option<DateTime>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub active: Option<bool>,
}

impl LicenseView {
  fn new(license: license::Model) -> Self {
    Self {
      id: license.id,
      key: license.key,
      license_type: license.license_type,
      usage_count: license.usage_count,
      usage_limit: license.usage_limit,
      expires_at: license.expires_at,
      active: None,
    }
  }

  fn with_active(license: license::Model) -> Self {
    let active = license.active;
    Self { active: Some(active), ..Self::new(license) }
  }
}

#[derive(Debug, Serialize)]
pub struct ActivateRes {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license: Option<LicenseView>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<&'static str>,
  pub message: String,
}

impl ActivateRes {
  fn ok(activated: Activated) -> Self {
    let message = if activated.fresh {
      "License activated on this device"
    } else {
      "Device already activated"
    };

    Self {
      success: true,
      license: Some(LicenseView::new(activated.license)),
      reason: None,
      message: message.into(),
    }
  }

  fn rejected(reason: Reason) -> Self {
    Self {
      success: false,
      license: None,
      reason: Some(reason.as_str()),
      message: reason.message().into(),
    }
  }

  fn internal() -> Self {
    Self {
      success: false,
      license: None,
      reason: Some(INTERNAL),
      message: Reason::InternalError.message().into(),
    }
  }
}

pub async fn activate(
  State(app): State<Arc<AppState>>,
  ConnectInfo(peer): ConnectInfo<SocketAddr>,
  Json(req): Json<ActivateReq>,
) -> Result<Response> {
  let cmd = req.into_command(peer)?;

  let response = match app.engine.activate(cmd).await {
    Ok(activated) => (StatusCode::OK, Json(ActivateRes::ok(activated))),
    Err(Reason::InternalError) => {
      (StatusCode::INTERNAL_SERVER_ERROR, Json(ActivateRes::internal()))
    }
    Err(reason) => (StatusCode::BAD_REQUEST, Json(ActivateRes::rejected(reason))),
  };

  Ok(response.into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateReq {
  pub key: Option<String>,
  pub device_info: Option<DeviceInfoReq>,
}

#[derive(Debug, Serialize)]
pub struct ValidateRes {
  pub valid: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub reason: Option<&'static str>,
  /// Omitted on internal errors, `null` when the key is unknown
  #[serde(skip_serializing_if = "Option::is_none")]
  pub license: Option<Option<LicenseView>>,
}

pub async fn validate(
  State(app): State<Arc<AppState>>,
  ConnectInfo(peer): ConnectInfo<SocketAddr>,
  Json(req): Json<ValidateReq>,
) -> Result<Response> {
  let cmd = Check {
    key: required(req.key, "key")?,
    hwid: req.device_info.as_ref().and_then(DeviceInfoReq::hwid),
    ip: Some(peer.ip().to_string()),
  };

  let validation = app.engine.validate_only(cmd).await;

  let response = match validation.verdict.reason() {
    Some(Reason::InternalError) => (
      StatusCode::INTERNAL_SERVER_ERROR,
      Json(ValidateRes { valid: false, reason: Some(INTERNAL), license: None }),
    ),
    reason => (
      StatusCode::OK,
      Json(ValidateRes {
        valid: reason.is_none(),
        reason: reason.map(Reason::as_str),
        license: Some(validation.license.map(LicenseView::with_active)),
      }),
    ),
  };

  Ok(response.into_response())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogsQuery {
  pub license_id: Option<Uuid>,
  pub limit: Option<u64>,
  pub page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct LogsRes {
  pub logs: Vec<activation_log::Model>,
  pub page: u64,
  pub limit: u64,
}

pub async fn logs(
  State(app): State<Arc<AppState>>,
  caller: Caller,
  Query(query): Query<LogsQuery>,
) -> Result<Json<LogsRes>> {
  let filter = Filter { license_id: query.license_id, owner: caller.scope() };
  let page = query.page.unwrap_or(0);
  let limit = query.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

  let logs = app.sv().logs.page(filter, page, limit).await?;
  Ok(Json(LogsRes { logs, page, limit }))
}

#[derive(Debug, Deserialize)]
pub struct SetActiveReq {
  pub active: bool,
}

pub async fn set_active(
  State(app): State<Arc<AppState>>,
  _: Admin,
  Path(key): Path<String>,
  Json(req): Json<SetActiveReq>,
) -> Result<Json<LicenseView>> {
  let license = app.sv().license.set_active(&key, req.active).await?;
  Ok(Json(LicenseView::with_active(license)))
}

#[derive(Debug, Deserialize)]
pub struct ExtendReq {
  pub days: i64,
}

pub async fn extend(
  State(app): State<Arc<AppState>>,
  _: Admin,
  Path(key): Path<String>,
  Json(req): Json<ExtendReq>,
) -> Result<Json<LicenseView>> {
  if !(1..=3650).contains(&req.days) {
    return Err(Error::BadRequest("days must be between 1 and 3650".into()));
  }

  let license = app.sv().license.extend(&key, req.days).await?;
  Ok(Json(LicenseView::with_active(license)))
}

pub async fn stats(
  State(app): State<Arc<AppState>>,
  _: Admin,
) -> Result<Json<Stats>> {
  Ok(Json(app.sv().license.stats().await?))
}

pub async fn health() -> &'static str {
  "OK"
}
