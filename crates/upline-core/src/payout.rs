//! Commission payout records.
//!
//! Payouts are created exclusively by the approval flow, never for a
//! rejected transaction, and never duplicated: at most one payout exists per
//! (source transaction, beneficiary, level). Their own approval status is
//! governed externally.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The kind of commission a payout represents.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum PayoutKind {
  /// Paid to the buyer's immediate referrer.
  DirectPayout,
  /// Cascaded to an ancestor above the direct referrer.
  PassiveIncome,
}

/// Workflow status of a payout, administered outside the engine.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum PayoutStatus {
  Pending,
  Approved,
  Rejected,
}

/// A single commission owed to a beneficiary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payout {
  pub payout_id:             Uuid,
  /// The beneficiary.
  pub user_id:               Uuid,
  pub kind:                  PayoutKind,
  pub amount:                u64,
  pub source_transaction_id: Uuid,
  /// The buyer whose purchase produced this payout.
  pub source_user_id:        Uuid,
  /// The net package amount the percentage was applied to.
  pub package_amount:        u64,
  pub percentage:            u64,
  /// Chain position: always 1 for direct payouts; for passive income, 1 is
  /// the direct referrer's immediate upline, up to 5.
  pub level:                 u8,
  pub status:                PayoutStatus,
  pub created_at:            DateTime<Utc>,
}

/// Input to [`crate::store::ReferralStore::create_payout`]. The store assigns
/// the id, the `Pending` status, and the timestamp.
#[derive(Debug, Clone)]
pub struct NewPayout {
  pub user_id:               Uuid,
  pub kind:                  PayoutKind,
  pub amount:                u64,
  pub source_transaction_id: Uuid,
  pub source_user_id:        Uuid,
  pub package_amount:        u64,
  pub percentage:            u64,
  pub level:                 u8,
}
