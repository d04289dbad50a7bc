//! Integration tests for `SqliteStore` and the engine against an in-memory
//! database.

use std::sync::Arc;

use upline_core::{
  engine::{Decision, Engine},
  error::EngineError,
  payout::PayoutKind,
  rank::Rank,
  store::ReferralStore,
  transaction::{Transaction, TransactionStatus},
  user::{DirectReferral, NewUser, User},
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn engine(s: &SqliteStore) -> Engine<SqliteStore> {
  Engine::new(Arc::new(s.clone()))
}

/// Create a user, optionally referred by `sponsor`.
async fn join(s: &SqliteStore, sponsor: Option<&User>) -> User {
  s.create_user(NewUser {
    referred_by: sponsor.map(|u| u.referral_code.clone()),
  })
  .await
  .unwrap()
}

/// Request and approve a package purchase for `user`.
async fn buy(
  e: &Engine<SqliteStore>,
  s: &SqliteStore,
  user: &User,
  amount: u64,
) -> Transaction {
  let tx = e
    .request_package_purchase(user.user_id, amount)
    .await
    .unwrap();
  e.approve_package(tx.transaction_id, None, Decision::Approved)
    .await
    .unwrap();
  s.get_transaction(tx.transaction_id).await.unwrap().unwrap()
}

async fn refresh(s: &SqliteStore, user: &User) -> User {
  s.get_user(user.user_id).await.unwrap().unwrap()
}

// ─── Users ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_user_generates_six_digit_code() {
  let s = store().await;

  let user = join(&s, None).await;
  assert_eq!(user.referral_code.as_str().len(), 6);
  assert!(user.referral_code.as_str().bytes().all(|b| b.is_ascii_digit()));
  assert!(user.rank.is_none());
  assert!(user.package_purchased.is_none());
  assert_eq!(user.total_referral_value, 0);

  let fetched = refresh(&s, &user).await;
  assert_eq!(fetched.referral_code, user.referral_code);
}

#[tokio::test]
async fn get_user_by_code_and_children() {
  let s = store().await;

  let sponsor = join(&s, None).await;
  let a = join(&s, Some(&sponsor)).await;
  let b = join(&s, Some(&sponsor)).await;
  join(&s, None).await; // unrelated

  let found = s
    .get_user_by_code(sponsor.referral_code.clone())
    .await
    .unwrap()
    .unwrap();
  assert_eq!(found.user_id, sponsor.user_id);

  let children = s
    .direct_children(sponsor.referral_code.clone())
    .await
    .unwrap();
  let ids: Vec<_> = children.iter().map(|c| c.user_id).collect();
  assert_eq!(children.len(), 2);
  assert!(ids.contains(&a.user_id) && ids.contains(&b.user_id));
}

// ─── Purchase requests ───────────────────────────────────────────────────────

#[tokio::test]
async fn purchase_request_creates_pending_transaction() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;

  let tx = e
    .request_package_purchase(user.user_id, 50_000)
    .await
    .unwrap();
  assert_eq!(tx.status, TransactionStatus::Pending);
  assert_eq!(tx.amount, 50_000);
  assert_eq!(tx.delivery_fee, 1_500);
  assert_eq!(tx.net_amount, 48_500);

  let user = refresh(&s, &user).await;
  assert!(user.has_pending_package);
  assert!(user.package_purchased.is_none());
}

#[tokio::test]
async fn purchase_request_rejects_off_grid_amount() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;

  let err = e
    .request_package_purchase(user.user_id, 30_000)
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::InvalidPackageAmount(30_000)));
}

#[tokio::test]
async fn purchase_request_conflicts_while_pending_or_active() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;

  e.request_package_purchase(user.user_id, 20_000)
    .await
    .unwrap();
  let err = e
    .request_package_purchase(user.user_id, 20_000)
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::PackageAlreadyRequested));
}

// ─── Approval processing ─────────────────────────────────────────────────────

#[tokio::test]
async fn approval_grants_package_and_rank() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;
  let admin = Uuid::new_v4();

  let tx = e
    .request_package_purchase(user.user_id, 20_000)
    .await
    .unwrap();
  e.approve_package(tx.transaction_id, Some(admin), Decision::Approved)
    .await
    .unwrap();

  let user = refresh(&s, &user).await;
  assert_eq!(user.package_purchased, Some(20_000));
  assert_eq!(user.rank, Some(Rank::Assistant));
  assert!(user.package_purchase_date.is_some());
  assert!(!user.has_pending_package);

  let tx = s.get_transaction(tx.transaction_id).await.unwrap().unwrap();
  assert_eq!(tx.status, TransactionStatus::Approved);
  assert_eq!(tx.approved_by, Some(admin));
  assert!(tx.approved_at.is_some());
}

#[tokio::test]
async fn rejection_leaves_buyer_ungranted() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;
  let user = join(&s, Some(&sponsor)).await;

  let tx = e
    .request_package_purchase(user.user_id, 50_000)
    .await
    .unwrap();
  e.approve_package(tx.transaction_id, None, Decision::Rejected)
    .await
    .unwrap();

  let user = refresh(&s, &user).await;
  assert!(user.package_purchased.is_none());
  assert!(user.rank.is_none());
  assert!(!user.has_pending_package);

  // No referral recording and no payouts for a rejected purchase.
  let sponsor = refresh(&s, &sponsor).await;
  assert_eq!(sponsor.total_referral_value, 0);
  assert!(
    s.payouts_for_transaction(tx.transaction_id)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn approving_unknown_transaction_is_not_found() {
  let s = store().await;
  let e = engine(&s);

  let err = e
    .approve_package(Uuid::new_v4(), None, Decision::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::TransactionNotFound(_)));
}

#[tokio::test]
async fn reapproval_conflicts_and_creates_nothing() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;
  buy(&e, &s, &sponsor, 20_000).await;
  let buyer = join(&s, Some(&sponsor)).await;
  let tx = buy(&e, &s, &buyer, 20_000).await;

  let before = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap()
    .len();

  let err = e
    .approve_package(tx.transaction_id, None, Decision::Approved)
    .await
    .unwrap_err();
  assert!(matches!(err, EngineError::AlreadyProcessed(_)));

  let after = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap()
    .len();
  assert_eq!(before, after);

  let sponsor = refresh(&s, &sponsor).await;
  assert_eq!(sponsor.total_referral_value, 20_000);
}

// ─── Direct payouts ──────────────────────────────────────────────────────────

#[tokio::test]
async fn direct_payout_for_active_referrer() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;
  buy(&e, &s, &sponsor, 20_000).await;

  let buyer = join(&s, Some(&sponsor)).await;
  let tx = buy(&e, &s, &buyer, 20_000).await;

  let payouts = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap();
  assert_eq!(payouts.len(), 1);

  let payout = &payouts[0];
  assert_eq!(payout.kind, PayoutKind::DirectPayout);
  assert_eq!(payout.user_id, sponsor.user_id);
  assert_eq!(payout.source_user_id, buyer.user_id);
  // floor(19,000 × 30 / 100)
  assert_eq!(payout.amount, 5_700);
  assert_eq!(payout.package_amount, 19_000);
  assert_eq!(payout.percentage, 30);
  assert_eq!(payout.level, 1);
}

#[tokio::test]
async fn no_payout_when_referrer_has_no_package() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;
  let buyer = join(&s, Some(&sponsor)).await;
  let tx = buy(&e, &s, &buyer, 50_000).await;

  assert!(
    s.payouts_for_transaction(tx.transaction_id)
      .await
      .unwrap()
      .is_empty()
  );

  // The referral itself is still recorded.
  let sponsor = refresh(&s, &sponsor).await;
  assert_eq!(sponsor.total_referral_value, 50_000);
}

// ─── Passive income cascade ──────────────────────────────────────────────────

/// Build a chain `chain[0] ← chain[1] ← ...` (each referred by the previous)
/// where every member buys and gets approved for a 20k package.
async fn active_chain(
  e: &Engine<SqliteStore>,
  s: &SqliteStore,
  len: usize,
) -> Vec<User> {
  let mut chain: Vec<User> = Vec::with_capacity(len);
  for _ in 0..len {
    let user = join(s, chain.last()).await;
    buy(e, s, &user, 20_000).await;
    chain.push(user);
  }
  chain
}

#[tokio::test]
async fn assistant_referrer_yields_no_passive_income() {
  let s = store().await;
  let e = engine(&s);

  // Three active ancestors above an Assistant-ranked referrer.
  let chain = active_chain(&e, &s, 4).await;
  let referrer = &chain[3];
  assert_eq!(refresh(&s, referrer).await.rank, Some(Rank::Assistant));

  let buyer = join(&s, Some(referrer)).await;
  let tx = buy(&e, &s, &buyer, 20_000).await;

  let payouts = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap();
  assert_eq!(payouts.len(), 1);
  assert_eq!(payouts[0].kind, PayoutKind::DirectPayout);
}

#[tokio::test]
async fn manager_referrer_cascades_two_levels_at_five_percent() {
  let s = store().await;
  let e = engine(&s);

  let chain = active_chain(&e, &s, 5).await;
  let referrer = &chain[4];
  s.set_rank(referrer.user_id, Rank::Manager).await.unwrap();

  let buyer = join(&s, Some(referrer)).await;
  let tx = buy(&e, &s, &buyer, 20_000).await;

  let payouts = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap();
  let passive: Vec<_> = payouts
    .iter()
    .filter(|p| p.kind == PayoutKind::PassiveIncome)
    .collect();
  assert_eq!(passive.len(), 2);
  for payout in &passive {
    assert_eq!(payout.percentage, 5);
    // floor(19,000 × 5 / 100)
    assert_eq!(payout.amount, 950);
  }
  assert_eq!(passive[0].level, 1);
  assert_eq!(passive[0].user_id, chain[3].user_id);
  assert_eq!(passive[1].level, 2);
  assert_eq!(passive[1].user_id, chain[2].user_id);
}

#[tokio::test]
async fn senior_referrer_cascades_five_levels() {
  let s = store().await;
  let e = engine(&s);

  // Six active ancestors; only five can be paid.
  let chain = active_chain(&e, &s, 7).await;
  let referrer = &chain[6];
  s.set_rank(referrer.user_id, Rank::DManager).await.unwrap();

  let buyer = join(&s, Some(referrer)).await;
  let tx = buy(&e, &s, &buyer, 100_000).await;

  let payouts = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap();

  let direct: Vec<_> = payouts
    .iter()
    .filter(|p| p.kind == PayoutKind::DirectPayout)
    .collect();
  assert_eq!(direct.len(), 1);
  // floor(98,000 × 40 / 100)
  assert_eq!(direct[0].amount, 39_200);

  let passive: Vec<_> = payouts
    .iter()
    .filter(|p| p.kind == PayoutKind::PassiveIncome)
    .collect();
  assert_eq!(passive.len(), 5);
  for payout in &passive {
    // Same net amount at every level, never re-derived.
    assert_eq!(payout.package_amount, 98_000);
    if payout.level <= 2 {
      assert_eq!(payout.percentage, 5);
      assert_eq!(payout.amount, 4_900);
    } else {
      assert_eq!(payout.percentage, 3);
      assert_eq!(payout.amount, 2_940);
    }
  }
  // Level n goes to the n-th ancestor above the referrer.
  for (i, payout) in passive.iter().enumerate() {
    assert_eq!(payout.level as usize, i + 1);
    assert_eq!(payout.user_id, chain[5 - i].user_id);
  }
}

#[tokio::test]
async fn cascade_stops_at_inactive_ancestor() {
  let s = store().await;
  let e = engine(&s);

  let grandparent = join(&s, None).await;
  buy(&e, &s, &grandparent, 20_000).await;
  // Parent of the referrer never buys a package: the chain breaks there.
  let inactive = join(&s, Some(&grandparent)).await;
  let parent = join(&s, Some(&inactive)).await;
  buy(&e, &s, &parent, 20_000).await;
  let referrer = join(&s, Some(&parent)).await;
  buy(&e, &s, &referrer, 20_000).await;
  s.set_rank(referrer.user_id, Rank::Director).await.unwrap();

  let buyer = join(&s, Some(&referrer)).await;
  let tx = buy(&e, &s, &buyer, 20_000).await;

  let passive: Vec<_> = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap()
    .into_iter()
    .filter(|p| p.kind == PayoutKind::PassiveIncome)
    .collect();
  assert_eq!(passive.len(), 1);
  assert_eq!(passive[0].user_id, parent.user_id);
}

// ─── Referral aggregates ─────────────────────────────────────────────────────

#[tokio::test]
async fn aggregate_sums_distinct_referrals() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;

  let a = join(&s, Some(&sponsor)).await;
  buy(&e, &s, &a, 20_000).await;
  let b = join(&s, Some(&sponsor)).await;
  buy(&e, &s, &b, 50_000).await;

  let sponsor = refresh(&s, &sponsor).await;
  assert_eq!(sponsor.total_referral_value, 70_000);

  let entries = s.direct_referrals(sponsor.user_id).await.unwrap();
  assert_eq!(entries.len(), 2);
}

#[tokio::test]
async fn recording_same_referral_twice_does_not_double_count() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;
  let buyer = join(&s, Some(&sponsor)).await;
  buy(&e, &s, &buyer, 20_000).await;

  let recorded = s
    .record_direct_referral(
      sponsor.user_id,
      DirectReferral {
        referred_user_id: buyer.user_id,
        package_value:    20_000,
        purchase_date:    chrono::Utc::now(),
      },
    )
    .await
    .unwrap();
  assert!(!recorded);

  let sponsor = refresh(&s, &sponsor).await;
  assert_eq!(sponsor.total_referral_value, 20_000);
  assert_eq!(s.direct_referrals(sponsor.user_id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn duplicate_payout_row_is_ignored() {
  let s = store().await;
  let e = engine(&s);
  let sponsor = join(&s, None).await;
  buy(&e, &s, &sponsor, 20_000).await;
  let buyer = join(&s, Some(&sponsor)).await;
  let tx = buy(&e, &s, &buyer, 20_000).await;

  let payouts = s
    .payouts_for_transaction(tx.transaction_id)
    .await
    .unwrap();
  let first = &payouts[0];

  let dup = s
    .create_payout(upline_core::payout::NewPayout {
      user_id:               first.user_id,
      kind:                  first.kind,
      amount:                first.amount,
      source_transaction_id: first.source_transaction_id,
      source_user_id:        first.source_user_id,
      package_amount:        first.package_amount,
      percentage:            first.percentage,
      level:                 first.level,
    })
    .await
    .unwrap();
  assert!(dup.is_none());
}

// ─── Rank upgrades ───────────────────────────────────────────────────────────

#[tokio::test]
async fn manager_upgrades_on_referral_value() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;
  buy(&e, &s, &user, 50_000).await; // rank Manager
  s.set_total_referral_value(user.user_id, 100_000)
    .await
    .unwrap();

  let upgrade = e.evaluate_rank_upgrade(user.user_id).await.unwrap();
  assert_eq!(upgrade.previous_rank, Rank::Manager);
  assert_eq!(upgrade.new_rank, Rank::SManager);
  assert_eq!(refresh(&s, &user).await.rank, Some(Rank::SManager));
}

#[tokio::test]
async fn manager_one_short_is_refused_with_shortfall() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;
  buy(&e, &s, &user, 50_000).await;
  s.set_total_referral_value(user.user_id, 99_999)
    .await
    .unwrap();

  let err = e.evaluate_rank_upgrade(user.user_id).await.unwrap_err();
  assert!(matches!(
    err,
    EngineError::InsufficientReferralValue { required: 100_000, current: 99_999 }
  ));
  assert_eq!(refresh(&s, &user).await.rank, Some(Rank::Manager));
}

#[tokio::test]
async fn referral_value_is_reconciled_from_children() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;
  buy(&e, &s, &user, 20_000).await; // rank Assistant

  // Three active children granted directly at the store level, bypassing
  // the approval flow — the aggregate was never accrued.
  for _ in 0..3 {
    let child = join(&s, Some(&user)).await;
    s.grant_package(child.user_id, 20_000, Rank::Assistant, chrono::Utc::now())
      .await
      .unwrap();
  }
  assert_eq!(refresh(&s, &user).await.total_referral_value, 0);

  // Assistant → Manager needs 50,000; the fallback scan finds 60,000.
  let upgrade = e.evaluate_rank_upgrade(user.user_id).await.unwrap();
  assert_eq!(upgrade.new_rank, Rank::Manager);

  // The reconciled value and the backfilled entries are persisted.
  let user = refresh(&s, &user).await;
  assert_eq!(user.total_referral_value, 60_000);
  assert_eq!(s.direct_referrals(user.user_id).await.unwrap().len(), 3);
}

#[tokio::test]
async fn smanager_upgrades_on_team_count() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;
  buy(&e, &s, &user, 100_000).await; // rank S.Manager

  // Four S.Managers spread across depths — one short of the requirement.
  let mut parent = user.clone();
  let mut seniors = Vec::new();
  for depth in 0..4 {
    let member = join(&s, Some(&parent)).await;
    buy(&e, &s, &member, 100_000).await;
    seniors.push(member.clone());
    if depth % 2 == 0 {
      parent = member;
    }
  }

  let err = e.evaluate_rank_upgrade(user.user_id).await.unwrap_err();
  assert!(matches!(
    err,
    EngineError::InsufficientTeamCount {
      rank: Rank::SManager,
      required: 5,
      current: 4,
    }
  ));

  // A fifth S.Manager deep in the tree satisfies it.
  let fifth = join(&s, seniors.last()).await;
  buy(&e, &s, &fifth, 100_000).await;

  let upgrade = e.evaluate_rank_upgrade(user.user_id).await.unwrap();
  assert_eq!(upgrade.new_rank, Rank::DManager);
}

#[tokio::test]
async fn unranked_and_terminal_users_cannot_upgrade() {
  let s = store().await;
  let e = engine(&s);

  let unranked = join(&s, None).await;
  let err = e.evaluate_rank_upgrade(unranked.user_id).await.unwrap_err();
  assert!(matches!(err, EngineError::NoRankAssigned));

  let director = join(&s, None).await;
  buy(&e, &s, &director, 20_000).await;
  s.set_rank(director.user_id, Rank::Director).await.unwrap();
  let err = e.evaluate_rank_upgrade(director.user_id).await.unwrap_err();
  assert!(matches!(err, EngineError::MaximumRankReached));
}

// ─── Team statistics & traversal ─────────────────────────────────────────────

#[tokio::test]
async fn team_statistics_counts_active_members_by_rank() {
  let s = store().await;
  let e = engine(&s);
  let user = join(&s, None).await;
  buy(&e, &s, &user, 20_000).await;

  let a = join(&s, Some(&user)).await;
  buy(&e, &s, &a, 20_000).await; // Assistant
  let b = join(&s, Some(&user)).await; // never buys — not counted
  let grandchild = join(&s, Some(&a)).await;
  buy(&e, &s, &grandchild, 50_000).await; // Manager
  let deep = join(&s, Some(&b)).await;
  buy(&e, &s, &deep, 100_000).await; // S.Manager, below an inactive parent

  let stats = e.team_statistics(user.user_id).await.unwrap();
  assert_eq!(stats.total_members, 3);
  assert_eq!(stats.direct_referrals, 1);
  assert_eq!(stats.team_volume, 20_000);
  assert_eq!(stats.counts_by_rank.get(&Rank::Assistant), Some(&1));
  assert_eq!(stats.counts_by_rank.get(&Rank::Manager), Some(&1));
  assert_eq!(stats.counts_by_rank.get(&Rank::SManager), Some(&1));
}

#[tokio::test]
async fn traversal_terminates_on_cyclic_referral_data() {
  let s = store().await;
  let e = engine(&s);

  // A refers B, then A's own referred_by is corrupted to point back at B.
  let a = join(&s, None).await;
  buy(&e, &s, &a, 20_000).await;
  let b = join(&s, Some(&a)).await;
  buy(&e, &s, &b, 20_000).await;

  let a_id = a.user_id.hyphenated().to_string();
  let b_code = b.referral_code.as_str().to_owned();
  s.conn
    .call(move |conn| {
      conn.execute(
        "UPDATE users SET referred_by = ?1 WHERE user_id = ?2",
        rusqlite::params![b_code, a_id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let team =
    upline_core::graph::team_of(&s, a.referral_code.clone()).await.unwrap();
  assert_eq!(team.len(), 1);
  assert_eq!(team[0].user_id, b.user_id);

  let stats = e.team_statistics(b.user_id).await.unwrap();
  assert_eq!(stats.total_members, 1);
}
