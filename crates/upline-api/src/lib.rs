//! JSON REST API for the Upline engine.
//!
//! Exposes an axum [`Router`] backed by any
//! [`upline_core::store::ReferralStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", upline_api::api_router(engine.clone()))
//! ```

pub mod approvals;
pub mod error;
pub mod payouts;
pub mod purchases;
pub mod users;

use axum::{
  Router,
  routing::{get, post},
};
use upline_core::{engine::Engine, store::ReferralStore};

pub use error::ApiError;

/// Build a fully-materialised API router for `engine`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(engine: Engine<S>) -> Router<()>
where
  S: ReferralStore + 'static,
{
  Router::new()
    // Users & the referral graph
    .route("/users", post(users::create::<S>))
    .route("/users/{id}", get(users::get_one::<S>))
    .route("/users/{id}/rank-upgrade", post(users::upgrade_rank::<S>))
    .route("/users/{id}/team-stats", get(users::team_stats::<S>))
    .route("/users/{id}/payouts", get(payouts::list_for_user::<S>))
    // Purchase workflow
    .route("/purchases", post(purchases::create::<S>))
    .route("/approvals", post(approvals::create::<S>))
    .with_state(engine)
}
