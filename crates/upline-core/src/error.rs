//! Error types for `upline-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::rank::Rank;

/// An error returned by an engine operation.
///
/// The ineligibility variants are structured so callers can display the
/// shortfall (required vs. current) to the user; they are expected outcomes,
/// not system failures.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error("transaction not found: {0}")]
  TransactionNotFound(Uuid),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("transaction {0} has already been processed")]
  AlreadyProcessed(Uuid),

  #[error("invalid package amount: {0}")]
  InvalidPackageAmount(u64),

  #[error("package already purchased or pending approval")]
  PackageAlreadyRequested,

  #[error("user has no rank assigned")]
  NoRankAssigned,

  #[error("maximum rank reached")]
  MaximumRankReached,

  #[error(
    "insufficient referral value: required {required}, current {current}"
  )]
  InsufficientReferralValue { required: u64, current: u64 },

  #[error(
    "insufficient team members: required {required} at rank {rank}, current {current}"
  )]
  InsufficientTeamCount {
    rank:     Rank,
    required: usize,
    current:  usize,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
