//! SQL schema for the Upline SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS users (
    user_id               TEXT PRIMARY KEY,
    referral_code         TEXT NOT NULL UNIQUE,  -- six ASCII digits
    referred_by           TEXT,                  -- referral code of the referrer; unconstrained on purpose
    rank                  TEXT,                  -- 'Assistant' .. 'Director'
    package_purchased     INTEGER,               -- face value; NULL until an approval
    package_purchase_date TEXT,
    total_referral_value  INTEGER NOT NULL DEFAULT 0,
    has_pending_package   INTEGER NOT NULL DEFAULT 0,
    created_at            TEXT NOT NULL
);

-- One row per distinct direct referral with an approved package. The UNIQUE
-- constraint is the idempotency guard for retried approvals.
CREATE TABLE IF NOT EXISTS direct_referrals (
    referrer_id      TEXT NOT NULL REFERENCES users(user_id),
    referred_user_id TEXT NOT NULL REFERENCES users(user_id),
    package_value    INTEGER NOT NULL,
    purchase_date    TEXT NOT NULL,
    UNIQUE (referrer_id, referred_user_id)
);

CREATE TABLE IF NOT EXISTS transactions (
    transaction_id TEXT PRIMARY KEY,
    user_id        TEXT NOT NULL REFERENCES users(user_id),
    package_type   INTEGER NOT NULL,  -- tier face value
    amount         INTEGER NOT NULL,
    delivery_fee   INTEGER NOT NULL,
    net_amount     INTEGER NOT NULL,
    status         TEXT NOT NULL DEFAULT 'pending',
    approved_by    TEXT,
    approved_at    TEXT,
    description    TEXT NOT NULL DEFAULT '',
    created_at     TEXT NOT NULL
);

-- Payouts are written once by the approval flow. The UNIQUE constraint
-- guarantees a re-run cascade cannot duplicate a row.
CREATE TABLE IF NOT EXISTS payouts (
    payout_id             TEXT PRIMARY KEY,
    user_id               TEXT NOT NULL REFERENCES users(user_id),
    kind                  TEXT NOT NULL,  -- 'direct_payout' | 'passive_income'
    amount                INTEGER NOT NULL,
    source_transaction_id TEXT NOT NULL REFERENCES transactions(transaction_id),
    source_user_id        TEXT NOT NULL REFERENCES users(user_id),
    package_amount        INTEGER NOT NULL,
    percentage            INTEGER NOT NULL,
    level                 INTEGER NOT NULL,
    status                TEXT NOT NULL DEFAULT 'pending',
    created_at            TEXT NOT NULL,
    UNIQUE (source_transaction_id, user_id, level)
);

CREATE INDEX IF NOT EXISTS users_referred_by_idx  ON users(referred_by);
CREATE INDEX IF NOT EXISTS referrals_referrer_idx ON direct_referrals(referrer_id);
CREATE INDEX IF NOT EXISTS transactions_user_idx  ON transactions(user_id);
CREATE INDEX IF NOT EXISTS payouts_user_idx       ON payouts(user_id);
CREATE INDEX IF NOT EXISTS payouts_source_idx     ON payouts(source_transaction_id);

PRAGMA user_version = 1;
";
