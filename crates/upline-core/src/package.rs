//! Package tiers and their fixed business tables.
//!
//! A tier bundles every constant keyed on the package face value: the
//! delivery fee, the direct-payout percentage, and the rank granted when the
//! purchase is approved. Serialises as the bare face value.

use serde::{Deserialize, Serialize};

use crate::rank::Rank;

/// One of the fixed package face values a user can purchase.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "u64", into = "u64")]
pub enum PackageTier {
  /// ₨20,000 — grants `Assistant`.
  Basic,
  /// ₨50,000 — grants `Manager`.
  Standard,
  /// ₨100,000 — grants `S.Manager`.
  Premium,
}

impl PackageTier {
  pub const ALL: [PackageTier; 3] =
    [Self::Basic, Self::Standard, Self::Premium];

  /// Resolve a tier from its face value. `None` for out-of-domain amounts.
  pub fn from_amount(amount: u64) -> Option<Self> {
    match amount {
      20_000 => Some(Self::Basic),
      50_000 => Some(Self::Standard),
      100_000 => Some(Self::Premium),
      _ => None,
    }
  }

  /// The package face value.
  pub fn face_value(self) -> u64 {
    match self {
      Self::Basic => 20_000,
      Self::Standard => 50_000,
      Self::Premium => 100_000,
    }
  }

  /// The delivery fee deducted before any percentage is applied.
  pub fn delivery_fee(self) -> u64 {
    match self {
      Self::Basic => 1_000,
      Self::Standard => 1_500,
      Self::Premium => 2_000,
    }
  }

  /// Face value minus the delivery fee. Every payout percentage — direct and
  /// passive — is applied to this amount.
  pub fn net_amount(self) -> u64 { self.face_value() - self.delivery_fee() }

  /// The direct-payout percentage awarded to the buyer's immediate referrer.
  pub fn direct_payout_percent(self) -> u64 {
    match self {
      Self::Basic => 30,
      Self::Standard => 35,
      Self::Premium => 40,
    }
  }

  /// The rank granted to the buyer when this tier is approved.
  pub fn granted_rank(self) -> Rank {
    match self {
      Self::Basic => Rank::Assistant,
      Self::Standard => Rank::Manager,
      Self::Premium => Rank::SManager,
    }
  }
}

impl TryFrom<u64> for PackageTier {
  type Error = String;

  fn try_from(amount: u64) -> Result<Self, Self::Error> {
    Self::from_amount(amount)
      .ok_or_else(|| format!("invalid package amount: {amount}"))
  }
}

impl From<PackageTier> for u64 {
  fn from(tier: PackageTier) -> u64 { tier.face_value() }
}
