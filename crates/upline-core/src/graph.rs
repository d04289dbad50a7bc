//! Read-only traversal of the referral forest.
//!
//! The downline walk uses an explicit work queue and a visited set of
//! referral codes rather than call-stack recursion, so deep trees cannot
//! overflow the stack and malformed data that loops back on itself
//! terminates instead of hanging.

use std::collections::{HashSet, VecDeque};

use crate::{
  store::ReferralStore,
  user::{ReferralCode, User},
};

/// All descendants of `code`, any depth, breadth-first.
///
/// Each referral code is expanded at most once, so the result is finite even
/// on cyclic data; order is not semantically significant. Active-package
/// filtering is left to callers so the walk stays reusable.
pub async fn team_of<S>(
  store: &S,
  code: ReferralCode,
) -> Result<Vec<User>, S::Error>
where
  S: ReferralStore,
{
  let mut members = Vec::new();
  let mut visited: HashSet<ReferralCode> = HashSet::from([code.clone()]);
  let mut queue: VecDeque<ReferralCode> = VecDeque::from([code]);

  while let Some(current) = queue.pop_front() {
    for child in store.direct_children(current).await? {
      // Codes are marked visited on enqueue so a node reachable through two
      // paths is still expanded (and counted) only once.
      if !visited.insert(child.referral_code.clone()) {
        continue;
      }
      queue.push_back(child.referral_code.clone());
      members.push(child);
    }
  }

  Ok(members)
}
