//! Handler for `POST /approvals`.
//!
//! Finalizes a pending purchase. An approval grants the package and runs the
//! commission flow; a rejection only clears the pending flag. Re-processing a
//! finalized transaction gets 409.

use axum::{Json, extract::State};
use serde::Deserialize;
use upline_core::{
  engine::{ApprovalOutcome, Decision, Engine},
  store::ReferralStore,
};
use uuid::Uuid;

use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub transaction_id: Uuid,
  pub approver_id:    Option<Uuid>,
  pub action:         Decision,
}

/// `POST /approvals` — body: `{"transaction_id":"…","action":"approved"}`
pub async fn create<S>(
  State(engine): State<Engine<S>>,
  Json(body): Json<CreateBody>,
) -> Result<Json<ApprovalOutcome>, ApiError>
where
  S: ReferralStore + 'static,
{
  let outcome = engine
    .approve_package(body.transaction_id, body.approver_id, body.action)
    .await?;
  Ok(Json(outcome))
}
