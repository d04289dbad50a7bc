//! The commission and rank engine.
//!
//! Orchestrates package-purchase approval (buyer grant, direct-referral
//! recording, payout cascade), rank-upgrade evaluation, and team statistics
//! over any [`ReferralStore`] backend.
//!
//! The referral stage of an approval is deliberately best-effort: once the
//! buyer's package grant is durable, a failure while recording referrals or
//! creating payouts is logged and swallowed rather than rolling back the
//! grant. Structural errors (unknown transaction or buyer, already-processed
//! transaction) abort before any write.

use std::{collections::BTreeMap, sync::Arc};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
  commission,
  error::{EngineError, Result},
  graph,
  package::PackageTier,
  payout::{NewPayout, PayoutKind},
  rank::{Rank, UpgradeRequirement},
  store::ReferralStore,
  transaction::{NewTransaction, Transaction, TransactionStatus},
  user::{DirectReferral, User},
};

// ─── Operation inputs & outputs ──────────────────────────────────────────────

/// The admin decision applied to a pending purchase transaction.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
  Approved,
  Rejected,
}

/// Outcome of [`Engine::approve_package`].
#[derive(Debug, Clone, Serialize)]
pub struct ApprovalOutcome {
  pub transaction_id: Uuid,
  pub status:         TransactionStatus,
}

/// Outcome of a successful [`Engine::evaluate_rank_upgrade`].
#[derive(Debug, Clone, Serialize)]
pub struct RankUpgrade {
  pub previous_rank: Rank,
  pub new_rank:      Rank,
}

/// Downline aggregates for the user dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct TeamStatistics {
  /// Downline members holding an active package, any depth.
  pub total_members:    usize,
  /// Direct children holding an active package.
  pub direct_referrals: usize,
  /// The stored referral-value aggregate.
  pub team_volume:      u64,
  pub counts_by_rank:   BTreeMap<Rank, usize>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The engine, generic over any store backend. Cloning is cheap.
pub struct Engine<S> {
  store: Arc<S>,
}

impl<S> Clone for Engine<S> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store) }
  }
}

impl<S> Engine<S>
where
  S: ReferralStore,
{
  pub fn new(store: Arc<S>) -> Self { Self { store } }

  /// The underlying store, for callers that need plain lookups.
  pub fn store(&self) -> &Arc<S> { &self.store }

  fn store_err(e: S::Error) -> EngineError { EngineError::Store(Box::new(e)) }

  // ── Purchase requests ─────────────────────────────────────────────────

  /// Create a pending purchase transaction for `user_id` and flag the user
  /// as awaiting approval. Rejected if the amount is off the tier grid or
  /// the user already holds (or has requested) a package.
  pub async fn request_package_purchase(
    &self,
    user_id: Uuid,
    amount: u64,
  ) -> Result<Transaction> {
    let tier = PackageTier::from_amount(amount)
      .ok_or(EngineError::InvalidPackageAmount(amount))?;

    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(EngineError::UserNotFound(user_id))?;

    if user.has_active_package() || user.has_pending_package {
      return Err(EngineError::PackageAlreadyRequested);
    }

    let transaction = self
      .store
      .create_transaction(NewTransaction {
        user_id,
        tier,
        description: format!("Package purchase - {}", tier.granted_rank()),
      })
      .await
      .map_err(Self::store_err)?;

    self
      .store
      .set_pending_package(user_id, true)
      .await
      .map_err(Self::store_err)?;

    Ok(transaction)
  }

  // ── Approval processing ───────────────────────────────────────────────

  /// Apply an admin decision to a pending purchase transaction.
  ///
  /// On approval, the transaction status and the buyer's grant are committed
  /// first; the referral stage that follows (direct-referral recording and
  /// the payout cascade) is best-effort and never fails the approval. On
  /// rejection, only the status changes and the buyer's pending flag clears.
  pub async fn approve_package(
    &self,
    transaction_id: Uuid,
    approver_id: Option<Uuid>,
    decision: Decision,
  ) -> Result<ApprovalOutcome> {
    let transaction = self
      .store
      .get_transaction(transaction_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(EngineError::TransactionNotFound(transaction_id))?;

    if transaction.status.is_terminal() {
      return Err(EngineError::AlreadyProcessed(transaction_id));
    }

    let buyer = self
      .store
      .get_user(transaction.user_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(EngineError::UserNotFound(transaction.user_id))?;

    let status = match decision {
      Decision::Approved => TransactionStatus::Approved,
      Decision::Rejected => TransactionStatus::Rejected,
    };
    let now = Utc::now();

    self
      .store
      .finalize_transaction(transaction_id, status, approver_id, now)
      .await
      .map_err(Self::store_err)?;

    // The pending flag clears regardless of the decision.
    self
      .store
      .set_pending_package(buyer.user_id, false)
      .await
      .map_err(Self::store_err)?;

    if decision == Decision::Rejected {
      return Ok(ApprovalOutcome { transaction_id, status });
    }

    self
      .store
      .grant_package(
        buyer.user_id,
        transaction.tier.face_value(),
        transaction.tier.granted_rank(),
        now,
      )
      .await
      .map_err(Self::store_err)?;

    // Commissions are secondary to the grant above; a failure here is
    // logged, not surfaced, and the grant stands.
    if let Err(e) = self.process_referral(&transaction, &buyer, now).await {
      warn!(
        transaction_id = %transaction_id,
        buyer_id = %buyer.user_id,
        error = %e,
        "referral processing failed; package grant stands"
      );
    }

    Ok(ApprovalOutcome { transaction_id, status })
  }

  /// Record the direct-referral edge and emit payouts for an approved
  /// purchase. Errors propagate to the caller, which treats them as
  /// non-fatal.
  async fn process_referral(
    &self,
    transaction: &Transaction,
    buyer: &User,
    now: DateTime<Utc>,
  ) -> std::result::Result<(), S::Error> {
    let Some(code) = buyer.referred_by.clone() else {
      return Ok(());
    };
    let Some(referrer) = self.store.get_user_by_code(code).await? else {
      return Ok(());
    };

    // Append-if-absent plus the aggregate increment, one atomic unit per
    // referrer. A retried approval records nothing twice.
    self
      .store
      .record_direct_referral(
        referrer.user_id,
        DirectReferral {
          referred_user_id: buyer.user_id,
          package_value:    transaction.tier.face_value(),
          purchase_date:    now,
        },
      )
      .await?;

    // Commissions flow only while the referrer holds an active package.
    if !referrer.has_active_package() {
      return Ok(());
    }

    let net_amount = transaction.tier.net_amount();
    self
      .store
      .create_payout(NewPayout {
        user_id:               referrer.user_id,
        kind:                  PayoutKind::DirectPayout,
        amount:                commission::direct_payout_amount(transaction.tier),
        source_transaction_id: transaction.transaction_id,
        source_user_id:        buyer.user_id,
        package_amount:        net_amount,
        percentage:            transaction.tier.direct_payout_percent(),
        level:                 1,
      })
      .await?;

    self
      .cascade_passive_income(
        &referrer,
        net_amount,
        transaction.transaction_id,
        buyer.user_id,
      )
      .await
  }

  // ── Passive income cascade ────────────────────────────────────────────

  /// Walk the upline chain above `referrer`, paying each eligible ancestor.
  ///
  /// The percentage is keyed on the direct referrer's rank for the whole
  /// cascade, and every level applies it to the same net amount. The walk
  /// stops at a missing ancestor, an ancestor without an active package, or
  /// after level 5.
  async fn cascade_passive_income(
    &self,
    referrer: &User,
    net_amount: u64,
    source_transaction_id: Uuid,
    source_user_id: Uuid,
  ) -> std::result::Result<(), S::Error> {
    if !commission::cascades(referrer.rank) {
      return Ok(());
    }

    let mut current = referrer.clone();
    let mut level: u8 = 1;

    while level <= commission::MAX_PASSIVE_LEVEL {
      let Some(code) = current.referred_by.clone() else {
        break;
      };
      let Some(upline) = self.store.get_user_by_code(code).await? else {
        break;
      };
      if !upline.has_active_package() {
        break;
      }

      let percentage = commission::passive_percent(referrer.rank, level);
      if percentage > 0 {
        self
          .store
          .create_payout(NewPayout {
            user_id:               upline.user_id,
            kind:                  PayoutKind::PassiveIncome,
            amount:                commission::passive_amount(net_amount, percentage),
            source_transaction_id,
            source_user_id,
            package_amount:        net_amount,
            percentage,
            level,
          })
          .await?;
      }

      current = upline;
      level += 1;
    }

    Ok(())
  }

  // ── Rank upgrades ─────────────────────────────────────────────────────

  /// Check the next-rank requirement for `user_id` and apply the promotion
  /// if it is met. Idempotent and retryable; an unmet requirement is
  /// reported as a structured shortfall, not applied partially.
  pub async fn evaluate_rank_upgrade(
    &self,
    user_id: Uuid,
  ) -> Result<RankUpgrade> {
    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(EngineError::UserNotFound(user_id))?;

    let current = user.rank.ok_or(EngineError::NoRankAssigned)?;
    let next = current.next().ok_or(EngineError::MaximumRankReached)?;
    let requirement = current
      .upgrade_requirement()
      .ok_or(EngineError::MaximumRankReached)?;

    match requirement {
      UpgradeRequirement::ReferralValue(required) => {
        let current_value = self
          .reconciled_referral_value(&user, required)
          .await
          .map_err(Self::store_err)?;
        if current_value < required {
          return Err(EngineError::InsufficientReferralValue {
            required,
            current: current_value,
          });
        }
      }
      UpgradeRequirement::TeamCount { rank, count } => {
        let actual = self
          .count_team_members(&user, rank)
          .await
          .map_err(Self::store_err)?;
        if actual < count {
          return Err(EngineError::InsufficientTeamCount {
            rank,
            required: count,
            current: actual,
          });
        }
      }
    }

    self
      .store
      .set_rank(user.user_id, next)
      .await
      .map_err(Self::store_err)?;

    Ok(RankUpgrade { previous_rank: current, new_rank: next })
  }

  /// The stored referral-value aggregate, falling back to progressively
  /// deeper derivations when it falls short of `required`: first the sum of
  /// the recorded direct-referral entries, then a scan of direct children
  /// holding an active package (backfilling any entries the approval flow
  /// missed). The maximum found is persisted back onto the user.
  async fn reconciled_referral_value(
    &self,
    user: &User,
    required: u64,
  ) -> std::result::Result<u64, S::Error> {
    let mut value = user.total_referral_value;
    if value >= required {
      return Ok(value);
    }

    let entries = self.store.direct_referrals(user.user_id).await?;
    let derived: u64 = entries.iter().map(|r| r.package_value).sum();
    value = value.max(derived);
    if value >= required {
      return Ok(value);
    }

    let children =
      self.store.direct_children(user.referral_code.clone()).await?;
    let mut scanned: u64 = 0;
    for child in &children {
      let (Some(package_value), Some(purchase_date)) =
        (child.package_purchased, child.package_purchase_date)
      else {
        continue;
      };
      scanned += package_value;
      // Idempotent: already-recorded children are skipped by the store.
      self
        .store
        .record_direct_referral(
          user.user_id,
          DirectReferral {
            referred_user_id: child.user_id,
            package_value,
            purchase_date,
          },
        )
        .await?;
    }
    value = value.max(scanned);

    if value > user.total_referral_value {
      self.store.set_total_referral_value(user.user_id, value).await?;
    }

    Ok(value)
  }

  /// Count downline members holding exactly `target` rank, any depth.
  async fn count_team_members(
    &self,
    user: &User,
    target: Rank,
  ) -> std::result::Result<usize, S::Error> {
    let team =
      graph::team_of(self.store.as_ref(), user.referral_code.clone()).await?;
    Ok(team.iter().filter(|m| m.rank == Some(target)).count())
  }

  // ── Team statistics ───────────────────────────────────────────────────

  /// Aggregate downline statistics for the dashboard. Only members holding
  /// an active package are counted.
  pub async fn team_statistics(
    &self,
    user_id: Uuid,
  ) -> Result<TeamStatistics> {
    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(Self::store_err)?
      .ok_or(EngineError::UserNotFound(user_id))?;

    let team =
      graph::team_of(self.store.as_ref(), user.referral_code.clone())
        .await
        .map_err(Self::store_err)?;

    let mut total_members = 0;
    let mut counts_by_rank: BTreeMap<Rank, usize> = BTreeMap::new();
    for member in team.iter().filter(|m| m.has_active_package()) {
      total_members += 1;
      if let Some(rank) = member.rank {
        *counts_by_rank.entry(rank).or_default() += 1;
      }
    }

    let direct_referrals = self
      .store
      .direct_children(user.referral_code.clone())
      .await
      .map_err(Self::store_err)?
      .iter()
      .filter(|c| c.has_active_package())
      .count();

    Ok(TeamStatistics {
      total_members,
      direct_referrals,
      team_volume: user.total_referral_value,
      counts_by_rank,
    })
  }
}
