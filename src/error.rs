//! Error types for the license server

use axum::{
  extract::rejection::{JsonRejection, QueryRejection},
  http::StatusCode,
  response::{IntoResponse, Response},
};

use crate::prelude::{Duration, error};

#[derive(Debug, thiserror::Error)]
pub enum Error {
  #[error("Database error: {0}")]
  Db(#[from] sea_orm::DbErr),

  #[error("License not found")]
  LicenseNotFound,

  #[error("Bad request: {0}")]
  BadRequest(String),

  #[error("Unauthorized")]
  Unauthorized,

  #[error("Forbidden")]
  Forbidden,

  #[error("Storage lock not acquired within {0:?}")]
  Timeout(Duration),

  #[error("Gave up after {0} contended attempts")]
  Contention(usize),

  #[error("Internal error: {0}")]
  Internal(String),
}

impl From<JsonRejection> for Error {
  fn from(rejection: JsonRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<QueryRejection> for Error {
  fn from(rejection: QueryRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl IntoResponse for Error {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      Error::LicenseNotFound => {
        (StatusCode::NOT_FOUND, "License not found".to_string())
      }
      Error::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
      Error::Unauthorized => (StatusCode::UNAUTHORIZED, "Unauthorized".into()),
      Error::Forbidden => (StatusCode::FORBIDDEN, "Forbidden".into()),
      Error::Db(_)
      | Error::Timeout(_)
      | Error::Contention(_)
      | Error::Internal(_) => {
        error!("Request failed: {self}");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".into())
      }
    };

    (status, axum::Json(json::json!({ "error": message }))).into_response()
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
