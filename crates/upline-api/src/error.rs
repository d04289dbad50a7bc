//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;
use upline_core::error::EngineError;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("conflict: {0}")]
  Conflict(String),

  /// An unmet rank-upgrade requirement, with the shortfall spelled out.
  #[error("{message}")]
  Ineligible {
    message:  String,
    required: u64,
    current:  u64,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<EngineError> for ApiError {
  fn from(e: EngineError) -> Self {
    let message = e.to_string();
    match e {
      EngineError::TransactionNotFound(_) | EngineError::UserNotFound(_) => {
        ApiError::NotFound(message)
      }
      EngineError::AlreadyProcessed(_)
      | EngineError::PackageAlreadyRequested => ApiError::Conflict(message),
      EngineError::InvalidPackageAmount(_)
      | EngineError::NoRankAssigned
      | EngineError::MaximumRankReached => ApiError::BadRequest(message),
      EngineError::InsufficientReferralValue { required, current } => {
        ApiError::Ineligible { message, required, current }
      }
      EngineError::InsufficientTeamCount { required, current, .. } => {
        ApiError::Ineligible {
          message,
          required: required as u64,
          current: current as u64,
        }
      }
      EngineError::Store(inner) => ApiError::Store(inner),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match &self {
      ApiError::NotFound(m) => {
        (StatusCode::NOT_FOUND, Json(json!({ "error": m }))).into_response()
      }
      ApiError::BadRequest(m) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Conflict(m) => {
        (StatusCode::CONFLICT, Json(json!({ "error": m }))).into_response()
      }
      ApiError::Ineligible { message, required, current } => (
        StatusCode::BAD_REQUEST,
        Json(json!({
          "error":    message,
          "required": required,
          "current":  current,
        })),
      )
        .into_response(),
      ApiError::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "error": e.to_string() })),
      )
        .into_response(),
    }
  }
}
