//! Package-purchase transactions and the approval workflow.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::package::PackageTier;

/// Workflow status of a purchase transaction. `Pending` transitions exactly
/// once to `Approved` or `Rejected`; both are terminal.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
  Pending,
  Approved,
  Rejected,
}

impl TransactionStatus {
  pub fn is_terminal(self) -> bool { !matches!(self, Self::Pending) }
}

/// A package purchase awaiting (or past) admin approval. Immutable once the
/// status is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
  pub transaction_id: Uuid,
  /// The buyer.
  pub user_id:        Uuid,
  pub tier:           PackageTier,
  /// Tier face value, denormalised for display.
  pub amount:         u64,
  pub delivery_fee:   u64,
  /// Face value minus delivery fee; the base for every payout percentage.
  pub net_amount:     u64,
  pub status:         TransactionStatus,
  pub approved_by:    Option<Uuid>,
  pub approved_at:    Option<DateTime<Utc>>,
  pub description:    String,
  pub created_at:     DateTime<Utc>,
}

/// Input to [`crate::store::ReferralStore::create_transaction`]. The store
/// assigns the id and timestamp and derives the amounts from the tier.
#[derive(Debug, Clone)]
pub struct NewTransaction {
  pub user_id:     Uuid,
  pub tier:        PackageTier,
  pub description: String,
}
