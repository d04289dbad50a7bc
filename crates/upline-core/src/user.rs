//! User records and the referral-code identity.
//!
//! Users form a forest linked by referral codes: each user carries its own
//! unique six-digit code and, optionally, the code of the user who referred
//! it. Everything commercial (package, rank, referral aggregate) hangs off
//! this one record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::rank::Rank;

// ─── ReferralCode ────────────────────────────────────────────────────────────

/// A validated six-digit referral code.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct ReferralCode(String);

/// Rejected input to [`ReferralCode::parse`].
#[derive(Debug, Clone, Error)]
#[error("invalid referral code: {0:?}")]
pub struct InvalidReferralCode(pub String);

impl ReferralCode {
  /// Validate a candidate code: exactly six ASCII digits.
  pub fn parse(s: impl Into<String>) -> Result<Self, InvalidReferralCode> {
    let s = s.into();
    if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
      Ok(Self(s))
    } else {
      Err(InvalidReferralCode(s))
    }
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl TryFrom<String> for ReferralCode {
  type Error = InvalidReferralCode;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(s) }
}

impl From<ReferralCode> for String {
  fn from(code: ReferralCode) -> String { code.0 }
}

impl std::fmt::Display for ReferralCode {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A node in the referral forest.
///
/// Created at signup with no package and no rank; mutated by its own package
/// approval (package/rank fields), by a referred user's approval (aggregate
/// fields), and by rank upgrades. Never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:               Uuid,
  pub referral_code:         ReferralCode,
  /// Referral code of the user who referred this one, if any.
  pub referred_by:           Option<ReferralCode>,
  pub rank:                  Option<Rank>,
  /// Face value of the active package, if one has been approved.
  pub package_purchased:     Option<u64>,
  pub package_purchase_date: Option<DateTime<Utc>>,
  /// Sum of package face values over recorded direct referrals.
  pub total_referral_value:  u64,
  /// A purchase transaction is awaiting admin approval.
  pub has_pending_package:   bool,
  pub created_at:            DateTime<Utc>,
}

impl User {
  /// Whether the user currently holds an approved package.
  pub fn has_active_package(&self) -> bool {
    self.package_purchased.is_some()
  }
}

/// Input to [`crate::store::ReferralStore::create_user`]. The store assigns
/// the id, the referral code, and the creation timestamp.
#[derive(Debug, Clone, Default)]
pub struct NewUser {
  pub referred_by: Option<ReferralCode>,
}

// ─── DirectReferral ──────────────────────────────────────────────────────────

/// One recorded direct referral with an approved package.
///
/// At most one entry exists per (referrer, referred user); recording is
/// append-if-absent so a retried approval never double-counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectReferral {
  pub referred_user_id: Uuid,
  /// Package face value at the time of approval.
  pub package_value:    u64,
  pub purchase_date:    DateTime<Utc>,
}
