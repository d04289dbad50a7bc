//! Handlers for `/users` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/users` | Body: `{"referred_by":"483920"}` (code optional) |
//! | `GET`  | `/users/:id` | 404 if not found |
//! | `POST` | `/users/:id/rank-upgrade` | 400 with shortfall if ineligible |
//! | `GET`  | `/users/:id/team-stats` | Active members only |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use upline_core::{
  engine::{Engine, RankUpgrade, TeamStatistics},
  store::ReferralStore,
  user::{NewUser, ReferralCode, User},
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub referred_by: Option<ReferralCode>,
}

/// `POST /users` — body: `{"referred_by":"483920"}`
///
/// A supplied referral code must belong to an existing user; signups with a
/// dangling code are refused rather than silently orphaned.
pub async fn create<S>(
  State(engine): State<Engine<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ReferralStore + 'static,
{
  if let Some(code) = &body.referred_by {
    engine
      .store()
      .get_user_by_code(code.clone())
      .await
      .map_err(|e| ApiError::Store(Box::new(e)))?
      .ok_or_else(|| {
        ApiError::BadRequest(format!("referral code {code} does not exist"))
      })?;
  }

  let user = engine
    .store()
    .create_user(NewUser { referred_by: body.referred_by })
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?;
  Ok((StatusCode::CREATED, Json(user)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /users/:id`
pub async fn get_one<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError>
where
  S: ReferralStore + 'static,
{
  let user = engine
    .store()
    .get_user(id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user))
}

// ─── Rank upgrade ─────────────────────────────────────────────────────────────

/// `POST /users/:id/rank-upgrade`
pub async fn upgrade_rank<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RankUpgrade>, ApiError>
where
  S: ReferralStore + 'static,
{
  let upgrade = engine.evaluate_rank_upgrade(id).await?;
  Ok(Json(upgrade))
}

// ─── Team statistics ──────────────────────────────────────────────────────────

/// `GET /users/:id/team-stats`
pub async fn team_stats<S>(
  State(engine): State<Engine<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<TeamStatistics>, ApiError>
where
  S: ReferralStore + 'static,
{
  let stats = engine.team_statistics(id).await?;
  Ok(Json(stats))
}
