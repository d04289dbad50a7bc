//! The rank ladder and its promotion requirements.
//!
//! Ranks form a strict linear ladder. The first two promotions are gated on
//! accumulated referral value; the higher three on the composition of the
//! whole downline. `Director` is terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Rank ────────────────────────────────────────────────────────────────────

/// A promotion tier on the linear rank ladder. Ordering is significant:
/// `Assistant` is the lowest rank, `Director` the highest.
///
/// "No rank" is represented as `Option<Rank>::None` on the user record, not
/// as a variant here.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize,
  Deserialize,
)]
pub enum Rank {
  Assistant,
  Manager,
  #[serde(rename = "S.Manager")]
  SManager,
  #[serde(rename = "D.Manager")]
  DManager,
  #[serde(rename = "G.Manager")]
  GManager,
  Director,
}

impl Rank {
  /// The display label, identical to the serialised form.
  pub fn label(self) -> &'static str {
    match self {
      Self::Assistant => "Assistant",
      Self::Manager => "Manager",
      Self::SManager => "S.Manager",
      Self::DManager => "D.Manager",
      Self::GManager => "G.Manager",
      Self::Director => "Director",
    }
  }

  /// Inverse of [`Rank::label`].
  pub fn from_label(s: &str) -> Option<Self> {
    match s {
      "Assistant" => Some(Self::Assistant),
      "Manager" => Some(Self::Manager),
      "S.Manager" => Some(Self::SManager),
      "D.Manager" => Some(Self::DManager),
      "G.Manager" => Some(Self::GManager),
      "Director" => Some(Self::Director),
      _ => None,
    }
  }

  /// The next rank on the ladder, or `None` for `Director`.
  pub fn next(self) -> Option<Rank> {
    match self {
      Self::Assistant => Some(Self::Manager),
      Self::Manager => Some(Self::SManager),
      Self::SManager => Some(Self::DManager),
      Self::DManager => Some(Self::GManager),
      Self::GManager => Some(Self::Director),
      Self::Director => None,
    }
  }

  /// The requirement gating promotion out of this rank, or `None` for
  /// `Director`.
  pub fn upgrade_requirement(self) -> Option<UpgradeRequirement> {
    match self {
      Self::Assistant => Some(UpgradeRequirement::ReferralValue(50_000)),
      Self::Manager => Some(UpgradeRequirement::ReferralValue(100_000)),
      Self::SManager => Some(UpgradeRequirement::TeamCount {
        rank:  Self::SManager,
        count: 5,
      }),
      Self::DManager => Some(UpgradeRequirement::TeamCount {
        rank:  Self::DManager,
        count: 5,
      }),
      Self::GManager => Some(UpgradeRequirement::TeamCount {
        rank:  Self::GManager,
        count: 4,
      }),
      Self::Director => None,
    }
  }
}

impl fmt::Display for Rank {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.label())
  }
}

// ─── UpgradeRequirement ──────────────────────────────────────────────────────

/// What a user must show to advance from their current rank to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpgradeRequirement {
  /// `total_referral_value` must reach this threshold.
  ReferralValue(u64),
  /// The downline must contain at least `count` members holding `rank`,
  /// at any depth.
  TeamCount { rank: Rank, count: usize },
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn ladder_is_linear_and_terminal() {
    let mut rank = Rank::Assistant;
    let mut steps = 0;
    while let Some(next) = rank.next() {
      assert!(next > rank);
      rank = next;
      steps += 1;
    }
    assert_eq!(rank, Rank::Director);
    assert_eq!(steps, 5);
    assert!(Rank::Director.upgrade_requirement().is_none());
  }

  #[test]
  fn requirements_match_business_table() {
    assert_eq!(
      Rank::Assistant.upgrade_requirement(),
      Some(UpgradeRequirement::ReferralValue(50_000))
    );
    assert_eq!(
      Rank::Manager.upgrade_requirement(),
      Some(UpgradeRequirement::ReferralValue(100_000))
    );
    assert_eq!(
      Rank::SManager.upgrade_requirement(),
      Some(UpgradeRequirement::TeamCount { rank: Rank::SManager, count: 5 })
    );
    assert_eq!(
      Rank::DManager.upgrade_requirement(),
      Some(UpgradeRequirement::TeamCount { rank: Rank::DManager, count: 5 })
    );
    assert_eq!(
      Rank::GManager.upgrade_requirement(),
      Some(UpgradeRequirement::TeamCount { rank: Rank::GManager, count: 4 })
    );
  }

  #[test]
  fn labels_roundtrip() {
    for rank in [
      Rank::Assistant,
      Rank::Manager,
      Rank::SManager,
      Rank::DManager,
      Rank::GManager,
      Rank::Director,
    ] {
      assert_eq!(Rank::from_label(rank.label()), Some(rank));
    }
    assert_eq!(Rank::from_label("Intern"), None);
  }
}
