//! Handler for `POST /purchases`.
//!
//! Creates a pending package-purchase transaction. Amounts off the tier grid
//! are refused with 400; a user with an active or pending package gets 409.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use upline_core::{engine::Engine, store::ReferralStore};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id: Uuid,
  pub amount:  u64,
}

/// `POST /purchases` — body: `{"user_id":"…","amount":50000}`
pub async fn create<S>(
  State(engine): State<Engine<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReferralStore + 'static,
{
  let transaction = engine
    .request_package_purchase(body.user_id, body.amount)
    .await?;
  Ok((StatusCode::CREATED, Json(transaction)))
}
