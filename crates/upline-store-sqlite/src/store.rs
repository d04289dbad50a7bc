//! [`SqliteStore`] — the SQLite implementation of [`ReferralStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use upline_core::{
  payout::{NewPayout, Payout, PayoutStatus},
  rank::Rank,
  store::ReferralStore,
  transaction::{NewTransaction, Transaction, TransactionStatus},
  user::{DirectReferral, NewUser, ReferralCode, User},
};

use crate::{
  Error, Result,
  encode::{
    RawDirectReferral, RawPayout, RawTransaction, RawUser, encode_dt,
    encode_payout_kind, encode_rank, encode_tx_status, encode_uuid,
  },
  schema::SCHEMA,
};

/// Attempts at finding a free six-digit referral code before giving up.
const CODE_ATTEMPTS: u32 = 32;

const USER_COLUMNS: &str = "user_id, referral_code, referred_by, rank, \
                            package_purchased, package_purchase_date, \
                            total_referral_value, has_pending_package, \
                            created_at";

const TRANSACTION_COLUMNS: &str =
  "transaction_id, user_id, package_type, amount, delivery_fee, net_amount, \
   status, approved_by, approved_at, description, created_at";

const PAYOUT_COLUMNS: &str =
  "payout_id, user_id, kind, amount, source_transaction_id, source_user_id, \
   package_amount, percentage, level, status, created_at";

fn raw_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawUser> {
  Ok(RawUser {
    user_id:               row.get(0)?,
    referral_code:         row.get(1)?,
    referred_by:           row.get(2)?,
    rank:                  row.get(3)?,
    package_purchased:     row.get(4)?,
    package_purchase_date: row.get(5)?,
    total_referral_value:  row.get(6)?,
    has_pending_package:   row.get(7)?,
    created_at:            row.get(8)?,
  })
}

fn raw_transaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawTransaction> {
  Ok(RawTransaction {
    transaction_id: row.get(0)?,
    user_id:        row.get(1)?,
    package_type:   row.get(2)?,
    amount:         row.get(3)?,
    delivery_fee:   row.get(4)?,
    net_amount:     row.get(5)?,
    status:         row.get(6)?,
    approved_by:    row.get(7)?,
    approved_at:    row.get(8)?,
    description:    row.get(9)?,
    created_at:     row.get(10)?,
  })
}

fn raw_payout(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawPayout> {
  Ok(RawPayout {
    payout_id:             row.get(0)?,
    user_id:               row.get(1)?,
    kind:                  row.get(2)?,
    amount:                row.get(3)?,
    source_transaction_id: row.get(4)?,
    source_user_id:        row.get(5)?,
    package_amount:        row.get(6)?,
    percentage:            row.get(7)?,
    level:                 row.get(8)?,
    status:                row.get(9)?,
    created_at:            row.get(10)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// An Upline referral store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn user_where(
    &self,
    condition: &'static str,
    key: String,
  ) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {USER_COLUMNS} FROM users WHERE {condition}"),
              rusqlite::params![key],
              raw_user,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── ReferralStore impl ──────────────────────────────────────────────────────

impl ReferralStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn create_user(&self, input: NewUser) -> Result<User> {
    let user_id = Uuid::new_v4();
    let created_at = Utc::now();
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(created_at);
    let referred_by_str =
      input.referred_by.as_ref().map(|c| c.as_str().to_owned());

    // Codes collide rarely; retry with a fresh random candidate each time.
    // `INSERT OR IGNORE` reports a collision as zero rows changed.
    let code: Option<String> = self
      .conn
      .call(move |conn| {
        use rand::Rng as _;
        let mut rng = rand::thread_rng();
        for _ in 0..CODE_ATTEMPTS {
          let candidate = rng.gen_range(100_000u32..=999_999).to_string();
          let inserted = conn.execute(
            "INSERT OR IGNORE INTO users
               (user_id, referral_code, referred_by, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id_str, candidate, referred_by_str, at_str],
          )?;
          if inserted > 0 {
            return Ok(Some(candidate));
          }
        }
        Ok(None)
      })
      .await?;

    let code = code.ok_or(Error::ReferralCodeSpaceExhausted)?;

    Ok(User {
      user_id,
      referral_code: ReferralCode::parse(code)?,
      referred_by: input.referred_by,
      rank: None,
      package_purchased: None,
      package_purchase_date: None,
      total_referral_value: 0,
      has_pending_package: false,
      created_at,
    })
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self.user_where("user_id = ?1", encode_uuid(id)).await
  }

  async fn get_user_by_code(
    &self,
    code: ReferralCode,
  ) -> Result<Option<User>> {
    self
      .user_where("referral_code = ?1", code.as_str().to_owned())
      .await
  }

  async fn direct_children(&self, code: ReferralCode) -> Result<Vec<User>> {
    let code_str = code.as_str().to_owned();

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {USER_COLUMNS} FROM users WHERE referred_by = ?1"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![code_str], raw_user)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }

  // ── Field-level user updates ──────────────────────────────────────────────

  async fn grant_package(
    &self,
    user_id: Uuid,
    package_value: u64,
    rank: Rank,
    at: DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let rank_str = encode_rank(rank).to_owned();
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users
             SET package_purchased = ?1, rank = ?2, package_purchase_date = ?3
           WHERE user_id = ?4",
          rusqlite::params![package_value as i64, rank_str, at_str, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_pending_package(
    &self,
    user_id: Uuid,
    pending: bool,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET has_pending_package = ?1 WHERE user_id = ?2",
          rusqlite::params![pending, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_rank(&self, user_id: Uuid, rank: Rank) -> Result<()> {
    let id_str = encode_uuid(user_id);
    let rank_str = encode_rank(rank).to_owned();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET rank = ?1 WHERE user_id = ?2",
          rusqlite::params![rank_str, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn set_total_referral_value(
    &self,
    user_id: Uuid,
    value: u64,
  ) -> Result<()> {
    let id_str = encode_uuid(user_id);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE users SET total_referral_value = ?1 WHERE user_id = ?2",
          rusqlite::params![value as i64, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Direct referrals ──────────────────────────────────────────────────────

  async fn direct_referrals(
    &self,
    referrer_id: Uuid,
  ) -> Result<Vec<DirectReferral>> {
    let id_str = encode_uuid(referrer_id);

    let raws: Vec<RawDirectReferral> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT referred_user_id, package_value, purchase_date
           FROM direct_referrals WHERE referrer_id = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], |row| {
            Ok(RawDirectReferral {
              referred_user_id: row.get(0)?,
              package_value:    row.get(1)?,
              purchase_date:    row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDirectReferral::into_entry).collect()
  }

  async fn record_direct_referral(
    &self,
    referrer_id: Uuid,
    entry: DirectReferral,
  ) -> Result<bool> {
    let referrer_str = encode_uuid(referrer_id);
    let referred_str = encode_uuid(entry.referred_user_id);
    let at_str = encode_dt(entry.purchase_date);
    let package_value = entry.package_value as i64;

    // Append-if-absent and the aggregate increment commit together; a
    // concurrent retry observes either both effects or neither.
    let recorded: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let inserted = tx.execute(
          "INSERT OR IGNORE INTO direct_referrals
             (referrer_id, referred_user_id, package_value, purchase_date)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![referrer_str, referred_str, package_value, at_str],
        )?;
        if inserted > 0 {
          tx.execute(
            "UPDATE users
               SET total_referral_value = total_referral_value + ?1
             WHERE user_id = ?2",
            rusqlite::params![package_value, referrer_str],
          )?;
        }
        tx.commit()?;
        Ok(inserted > 0)
      })
      .await?;

    Ok(recorded)
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn create_transaction(
    &self,
    input: NewTransaction,
  ) -> Result<Transaction> {
    let transaction = Transaction {
      transaction_id: Uuid::new_v4(),
      user_id:        input.user_id,
      tier:           input.tier,
      amount:         input.tier.face_value(),
      delivery_fee:   input.tier.delivery_fee(),
      net_amount:     input.tier.net_amount(),
      status:         TransactionStatus::Pending,
      approved_by:    None,
      approved_at:    None,
      description:    input.description,
      created_at:     Utc::now(),
    };

    let id_str = encode_uuid(transaction.transaction_id);
    let user_str = encode_uuid(transaction.user_id);
    let at_str = encode_dt(transaction.created_at);
    let description = transaction.description.clone();
    let (package_type, amount, delivery_fee, net_amount) = (
      transaction.amount as i64,
      transaction.amount as i64,
      transaction.delivery_fee as i64,
      transaction.net_amount as i64,
    );

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO transactions (
             transaction_id, user_id, package_type, amount, delivery_fee,
             net_amount, status, description, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'pending', ?7, ?8)",
          rusqlite::params![
            id_str,
            user_str,
            package_type,
            amount,
            delivery_fee,
            net_amount,
            description,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(transaction)
  }

  async fn get_transaction(&self, id: Uuid) -> Result<Option<Transaction>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTransaction> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions
                 WHERE transaction_id = ?1"
              ),
              rusqlite::params![id_str],
              raw_transaction,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTransaction::into_transaction).transpose()
  }

  async fn finalize_transaction(
    &self,
    id: Uuid,
    status: TransactionStatus,
    approved_by: Option<Uuid>,
    at: DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let status_str = encode_tx_status(status).to_owned();
    let approver_str = approved_by.map(encode_uuid);
    let at_str = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE transactions
             SET status = ?1, approved_by = ?2, approved_at = ?3
           WHERE transaction_id = ?4 AND status = 'pending'",
          rusqlite::params![status_str, approver_str, at_str, id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Payouts ───────────────────────────────────────────────────────────────

  async fn create_payout(&self, input: NewPayout) -> Result<Option<Payout>> {
    let payout = Payout {
      payout_id:             Uuid::new_v4(),
      user_id:               input.user_id,
      kind:                  input.kind,
      amount:                input.amount,
      source_transaction_id: input.source_transaction_id,
      source_user_id:        input.source_user_id,
      package_amount:        input.package_amount,
      percentage:            input.percentage,
      level:                 input.level,
      status:                PayoutStatus::Pending,
      created_at:            Utc::now(),
    };

    let id_str = encode_uuid(payout.payout_id);
    let user_str = encode_uuid(payout.user_id);
    let kind_str = encode_payout_kind(payout.kind).to_owned();
    let source_tx_str = encode_uuid(payout.source_transaction_id);
    let source_user_str = encode_uuid(payout.source_user_id);
    let at_str = encode_dt(payout.created_at);
    let (amount, package_amount, percentage, level) = (
      payout.amount as i64,
      payout.package_amount as i64,
      payout.percentage as i64,
      payout.level as i64,
    );

    // `INSERT OR IGNORE` enforces the one-payout-per-(transaction,
    // beneficiary, level) invariant.
    let inserted: bool = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "INSERT OR IGNORE INTO payouts (
             payout_id, user_id, kind, amount, source_transaction_id,
             source_user_id, package_amount, percentage, level, status,
             created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 'pending', ?10)",
          rusqlite::params![
            id_str,
            user_str,
            kind_str,
            amount,
            source_tx_str,
            source_user_str,
            package_amount,
            percentage,
            level,
            at_str,
          ],
        )?;
        Ok(n > 0)
      })
      .await?;

    Ok(inserted.then_some(payout))
  }

  async fn payouts_for_user(&self, user_id: Uuid) -> Result<Vec<Payout>> {
    let id_str = encode_uuid(user_id);

    let raws: Vec<RawPayout> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PAYOUT_COLUMNS} FROM payouts
           WHERE user_id = ?1 ORDER BY created_at DESC"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_payout)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPayout::into_payout).collect()
  }

  async fn payouts_for_transaction(
    &self,
    transaction_id: Uuid,
  ) -> Result<Vec<Payout>> {
    let id_str = encode_uuid(transaction_id);

    let raws: Vec<RawPayout> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {PAYOUT_COLUMNS} FROM payouts
           WHERE source_transaction_id = ?1 ORDER BY level"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![id_str], raw_payout)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawPayout::into_payout).collect()
  }
}
