//! Handler for `GET /users/:id/payouts`.

use axum::{
  Json,
  extract::{Path, State},
};
use upline_core::{engine::Engine, payout::Payout, store::ReferralStore};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /users/:id/payouts` — newest first.
pub async fn list_for_user<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Vec<Payout>>, ApiError>
where
  S: ReferralStore + 'static,
{
  let payouts = engine
    .store()
    .payouts_for_user(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok(Json(payouts))
}
