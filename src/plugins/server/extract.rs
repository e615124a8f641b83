//! Extractors that reject with the crate error (JSON bodies) instead of
//! axum's plain-text rejections.

use std::sync::Arc;

use axum::{
  extract::{FromRequest, FromRequestParts, Request},
  http::{header, request::Parts},
  response::{IntoResponse, Response},
};
use serde::{Serialize, de::DeserializeOwned};

use crate::{prelude::*, state::AppState};

#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = Error;

  async fn from_request(req: Request, state: &S) -> Result<Self> {
    let axum::Json(value) = axum::Json::<T>::from_request(req, state).await?;
    Ok(Json(value))
  }
}

impl<T: Serialize> IntoResponse for Json<T> {
  fn into_response(self) -> Response {
    axum::Json(self.0).into_response()
  }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Query<T>(pub T);

impl<S, T> FromRequestParts<S> for Query<T>
where
  S: Send + Sync,
  T: DeserializeOwned,
{
  type Rejection = Error;

  async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
    let axum::extract::Query(value) =
      axum::extract::Query::<T>::from_request_parts(parts, state).await?;
    Ok(Query(value))
  }
}

/// Who is calling. Identity is established upstream: the gateway either
/// forwards the admin bearer token or sets `X-User-Id` for an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Caller {
  Admin,
  Account(Uuid),
}

impl Caller {
  /// Account whose data the caller is limited to, `None` for admins.
  pub fn scope(self) -> Option<Uuid> {
    match self {
      Self::Admin => None,
      Self::Account(id) => Some(id),
    }
  }
}

impl FromRequestParts<Arc<AppState>> for Caller {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    let bearer = parts
      .headers
      .get(header::AUTHORIZATION)
      .and_then(|value| value.to_str().ok())
      .and_then(|value| value.strip_prefix("Bearer "));

    if let Some(token) = bearer {
      return match app.config.admin_token.as_deref() {
        Some(admin) if admin == token.trim() => Ok(Self::Admin),
        _ => Err(Error::Unauthorized),
      };
    }

    parts
      .headers
      .get("x-user-id")
      .and_then(|value| value.to_str().ok())
      .and_then(|value| Uuid::parse_str(value.trim()).ok())
      .map(Self::Account)
      .ok_or(Error::Unauthorized)
  }
}

pub struct Admin;

impl FromRequestParts<Arc<AppState>> for Admin {
  type Rejection = Error;

  async fn from_request_parts(
    parts: &mut Parts,
    app: &Arc<AppState>,
  ) -> Result<Self> {
    match Caller::from_request_parts(parts, app).await? {
      Caller::Admin => Ok(Admin),
      Caller::Account(_) => Err(Error::Forbidden),
    }
  }
}
