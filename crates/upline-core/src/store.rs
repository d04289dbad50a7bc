//! The `ReferralStore` trait — the persistence seam of the engine.
//!
//! Implemented by storage backends (e.g. `upline-store-sqlite`). The engine
//! and the API depend on this abstraction, not on any concrete backend.
//!
//! User mutations are deliberately field-level (grant a package, flip the
//! pending flag, set a rank, record one referral) rather than whole-record
//! writes, so concurrent flows touching the same user cannot clobber each
//! other. All methods return `Send` futures so the trait can be used in
//! multi-threaded async runtimes.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  payout::{NewPayout, Payout},
  rank::Rank,
  transaction::{NewTransaction, Transaction, TransactionStatus},
  user::{DirectReferral, NewUser, ReferralCode, User},
};

/// Abstraction over an Upline persistence backend.
pub trait ReferralStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Create and persist a new user with a freshly generated, unique
  /// six-digit referral code and no package or rank.
  fn create_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Retrieve a user by its unique referral code. Returns `None` if not
  /// found.
  fn get_user_by_code(
    &self,
    code: ReferralCode,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Users whose `referred_by` equals `code`.
  fn direct_children(
    &self,
    code: ReferralCode,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;

  // ── Field-level user updates ──────────────────────────────────────────

  /// Set the package face value, the granted rank, and the purchase date.
  fn grant_package(
    &self,
    user_id: Uuid,
    package_value: u64,
    rank: Rank,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Flip the "purchase awaiting approval" flag.
  fn set_pending_package(
    &self,
    user_id: Uuid,
    pending: bool,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite the user's rank (rank upgrades and test fixtures).
  fn set_rank(
    &self,
    user_id: Uuid,
    rank: Rank,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Overwrite the stored referral-value aggregate (reconciliation only;
  /// normal accrual goes through [`ReferralStore::record_direct_referral`]).
  fn set_total_referral_value(
    &self,
    user_id: Uuid,
    value: u64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Direct referrals ──────────────────────────────────────────────────

  /// All recorded direct-referral entries for `referrer_id`.
  fn direct_referrals(
    &self,
    referrer_id: Uuid,
  ) -> impl Future<Output = Result<Vec<DirectReferral>, Self::Error>> + Send + '_;

  /// Append a direct-referral entry if none exists for the referred user,
  /// and add its package value to the referrer's aggregate — one atomic unit
  /// per referrer. Returns whether a new entry was recorded.
  fn record_direct_referral(
    &self,
    referrer_id: Uuid,
    entry: DirectReferral,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Create a pending purchase transaction. The store derives the amount,
  /// delivery fee, and net amount from the tier.
  fn create_transaction(
    &self,
    input: NewTransaction,
  ) -> impl Future<Output = Result<Transaction, Self::Error>> + Send + '_;

  /// Retrieve a transaction by id. Returns `None` if not found.
  fn get_transaction(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Transaction>, Self::Error>> + Send + '_;

  /// Stamp a terminal status, approver, and approval time onto a pending
  /// transaction. A transaction already in a terminal status is untouched.
  fn finalize_transaction(
    &self,
    id: Uuid,
    status: TransactionStatus,
    approved_by: Option<Uuid>,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Payouts ───────────────────────────────────────────────────────────

  /// Create a pending payout. Returns `None` without writing if a payout for
  /// the same (source transaction, beneficiary, level) already exists.
  fn create_payout(
    &self,
    input: NewPayout,
  ) -> impl Future<Output = Result<Option<Payout>, Self::Error>> + Send + '_;

  /// All payouts owed to `user_id`, newest first.
  fn payouts_for_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Payout>, Self::Error>> + Send + '_;

  /// All payouts produced by one transaction's approval.
  fn payouts_for_transaction(
    &self,
    transaction_id: Uuid,
  ) -> impl Future<Output = Result<Vec<Payout>, Self::Error>> + Send + '_;
}
