//! Error type for `upline-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column value is outside the domain (unknown rank, status, or
  /// package tier).
  #[error("column decode error: {0}")]
  Decode(String),

  #[error(transparent)]
  ReferralCode(#[from] upline_core::user::InvalidReferralCode),

  /// Referral-code generation kept colliding; practically unreachable
  /// before the six-digit space is nearly full.
  #[error("could not allocate a unique referral code")]
  ReferralCodeSpaceExhausted,
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
