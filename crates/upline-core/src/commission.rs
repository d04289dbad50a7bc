//! Pure commission computations.
//!
//! Everything here is a fixed business table or a floor division over one —
//! no state, no I/O. The tier-keyed tables (delivery fee, direct percentage)
//! live on [`PackageTier`]; this module adds the rank-and-level passive
//! table and the amount arithmetic.

use crate::{package::PackageTier, rank::Rank};

/// Highest upline level that can receive passive income.
pub const MAX_PASSIVE_LEVEL: u8 = 5;

/// Direct payout for a purchase of `tier`:
/// `floor(net_amount × direct_percent / 100)`.
pub fn direct_payout_amount(tier: PackageTier) -> u64 {
  tier.net_amount() * tier.direct_payout_percent() / 100
}

/// Whether `rank` generates any passive income for the upline at all.
/// `Assistant` and unranked referrers never cascade.
pub fn cascades(rank: Option<Rank>) -> bool {
  matches!(rank, Some(r) if r >= Rank::Manager)
}

/// Passive-income percentage for an ancestor at `level`, keyed by the direct
/// referrer's rank — fixed for the whole cascade, regardless of whose parent
/// is being paid. Zero means no payout row is created.
pub fn passive_percent(referrer_rank: Option<Rank>, level: u8) -> u64 {
  let Some(rank) = referrer_rank else {
    return 0;
  };
  match rank {
    Rank::Assistant => 0,
    Rank::Manager | Rank::SManager => {
      if level <= 2 { 5 } else { 0 }
    }
    Rank::DManager | Rank::GManager | Rank::Director => {
      if level <= 2 {
        5
      } else if level <= MAX_PASSIVE_LEVEL {
        3
      } else {
        0
      }
    }
  }
}

/// `floor(net_amount × percent / 100)`. The same net amount is used at every
/// level of a cascade; it is never re-derived per level.
pub fn passive_amount(net_amount: u64, percent: u64) -> u64 {
  net_amount * percent / 100
}
