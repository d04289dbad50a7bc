//! Conversions between domain types and the plain-text/integer
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, enums as their display labels, and money as plain integers.

use chrono::{DateTime, Utc};
use upline_core::{
  package::PackageTier,
  payout::{Payout, PayoutKind, PayoutStatus},
  rank::Rank,
  transaction::{Transaction, TransactionStatus},
  user::{DirectReferral, ReferralCode, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Rank ─────────────────────────────────────────────────────────────────────

pub fn encode_rank(rank: Rank) -> &'static str { rank.label() }

pub fn decode_rank(s: &str) -> Result<Rank> {
  Rank::from_label(s)
    .ok_or_else(|| Error::Decode(format!("unknown rank: {s:?}")))
}

// ─── Statuses & kinds ─────────────────────────────────────────────────────────

pub fn encode_tx_status(status: TransactionStatus) -> &'static str {
  match status {
    TransactionStatus::Pending => "pending",
    TransactionStatus::Approved => "approved",
    TransactionStatus::Rejected => "rejected",
  }
}

pub fn decode_tx_status(s: &str) -> Result<TransactionStatus> {
  match s {
    "pending" => Ok(TransactionStatus::Pending),
    "approved" => Ok(TransactionStatus::Approved),
    "rejected" => Ok(TransactionStatus::Rejected),
    other => {
      Err(Error::Decode(format!("unknown transaction status: {other:?}")))
    }
  }
}

pub fn encode_payout_kind(kind: PayoutKind) -> &'static str {
  match kind {
    PayoutKind::DirectPayout => "direct_payout",
    PayoutKind::PassiveIncome => "passive_income",
  }
}

pub fn decode_payout_kind(s: &str) -> Result<PayoutKind> {
  match s {
    "direct_payout" => Ok(PayoutKind::DirectPayout),
    "passive_income" => Ok(PayoutKind::PassiveIncome),
    other => Err(Error::Decode(format!("unknown payout kind: {other:?}"))),
  }
}

pub fn decode_payout_status(s: &str) -> Result<PayoutStatus> {
  match s {
    "pending" => Ok(PayoutStatus::Pending),
    "approved" => Ok(PayoutStatus::Approved),
    "rejected" => Ok(PayoutStatus::Rejected),
    other => Err(Error::Decode(format!("unknown payout status: {other:?}"))),
  }
}

// ─── Raw row types ────────────────────────────────────────────────────────────

/// A `users` row as read from SQLite, before decoding.
pub struct RawUser {
  pub user_id:               String,
  pub referral_code:         String,
  pub referred_by:           Option<String>,
  pub rank:                  Option<String>,
  pub package_purchased:     Option<i64>,
  pub package_purchase_date: Option<String>,
  pub total_referral_value:  i64,
  pub has_pending_package:   bool,
  pub created_at:            String,
}

impl RawUser {
  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:               decode_uuid(&self.user_id)?,
      referral_code:         ReferralCode::parse(self.referral_code)?,
      referred_by:           self
        .referred_by
        .map(ReferralCode::parse)
        .transpose()?,
      rank:                  self
        .rank
        .as_deref()
        .map(decode_rank)
        .transpose()?,
      package_purchased:     self.package_purchased.map(|v| v as u64),
      package_purchase_date: self
        .package_purchase_date
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      total_referral_value:  self.total_referral_value as u64,
      has_pending_package:   self.has_pending_package,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// A `transactions` row as read from SQLite, before decoding.
pub struct RawTransaction {
  pub transaction_id: String,
  pub user_id:        String,
  pub package_type:   i64,
  pub amount:         i64,
  pub delivery_fee:   i64,
  pub net_amount:     i64,
  pub status:         String,
  pub approved_by:    Option<String>,
  pub approved_at:    Option<String>,
  pub description:    String,
  pub created_at:     String,
}

impl RawTransaction {
  pub fn into_transaction(self) -> Result<Transaction> {
    let tier = PackageTier::from_amount(self.package_type as u64)
      .ok_or_else(|| {
        Error::Decode(format!("unknown package tier: {}", self.package_type))
      })?;
    Ok(Transaction {
      transaction_id: decode_uuid(&self.transaction_id)?,
      user_id:        decode_uuid(&self.user_id)?,
      tier,
      amount:         self.amount as u64,
      delivery_fee:   self.delivery_fee as u64,
      net_amount:     self.net_amount as u64,
      status:         decode_tx_status(&self.status)?,
      approved_by:    self
        .approved_by
        .as_deref()
        .map(decode_uuid)
        .transpose()?,
      approved_at:    self
        .approved_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      description:    self.description,
      created_at:     decode_dt(&self.created_at)?,
    })
  }
}

/// A `payouts` row as read from SQLite, before decoding.
pub struct RawPayout {
  pub payout_id:             String,
  pub user_id:               String,
  pub kind:                  String,
  pub amount:                i64,
  pub source_transaction_id: String,
  pub source_user_id:        String,
  pub package_amount:        i64,
  pub percentage:            i64,
  pub level:                 i64,
  pub status:                String,
  pub created_at:            String,
}

impl RawPayout {
  pub fn into_payout(self) -> Result<Payout> {
    Ok(Payout {
      payout_id:             decode_uuid(&self.payout_id)?,
      user_id:               decode_uuid(&self.user_id)?,
      kind:                  decode_payout_kind(&self.kind)?,
      amount:                self.amount as u64,
      source_transaction_id: decode_uuid(&self.source_transaction_id)?,
      source_user_id:        decode_uuid(&self.source_user_id)?,
      package_amount:        self.package_amount as u64,
      percentage:            self.percentage as u64,
      level:                 self.level as u8,
      status:                decode_payout_status(&self.status)?,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// A `direct_referrals` row as read from SQLite, before decoding.
pub struct RawDirectReferral {
  pub referred_user_id: String,
  pub package_value:    i64,
  pub purchase_date:    String,
}

impl RawDirectReferral {
  pub fn into_entry(self) -> Result<DirectReferral> {
    Ok(DirectReferral {
      referred_user_id: decode_uuid(&self.referred_user_id)?,
      package_value:    self.package_value as u64,
      purchase_date:    decode_dt(&self.purchase_date)?,
    })
  }
}
