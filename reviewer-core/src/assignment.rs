//! Reviewer selection policy
//!
//! Pure decision logic over in-memory candidate lists. Callers are
//! responsible for narrowing the pool to active teammates of the author;
//! this module only enforces the cap, the exclusion set and uniform
//! random choice.

use std::collections::HashSet;

use rand::seq::{index, SliceRandom};
use rand::Rng;

use crate::models::User;

/// Default cap for reviewers auto-assigned to a new pull request
pub const DEFAULT_MAX_REVIEWERS: usize = 2;

/// Reviewer selection with a configurable cap
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentPolicy {
    max_reviewers: usize,
}

impl Default for AssignmentPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_REVIEWERS)
    }
}

impl AssignmentPolicy {
    /// Create a policy that assigns at most `max_reviewers` on creation
    pub fn new(max_reviewers: usize) -> Self {
        Self { max_reviewers }
    }

    pub fn max_reviewers(&self) -> usize {
        self.max_reviewers
    }

    /// Pick the initial reviewer set for a new pull request
    pub fn select_reviewers(&self, candidates: Vec<User>) -> Vec<User> {
        select_reviewers_with_rng(candidates, self.max_reviewers, &mut rand::thread_rng())
    }

    /// Pick one replacement reviewer outside `exclude_ids`
    pub fn select_replacement(&self, candidates: Vec<User>, exclude_ids: &HashSet<i64>) -> Option<User> {
        select_replacement_with_rng(candidates, exclude_ids, &mut rand::thread_rng())
    }
}

/// Return all candidates when there are at most `max`, otherwise a
/// uniformly random `max`-subset without duplicates.
pub fn select_reviewers_with_rng<R: Rng + ?Sized>(
    candidates: Vec<User>,
    max: usize,
    rng: &mut R,
) -> Vec<User> {
    if candidates.len() <= max {
        return candidates;
    }

    let mut picked: Vec<usize> = index::sample(rng, candidates.len(), max).into_vec();
    picked.sort_unstable();

    let mut slots: Vec<Option<User>> = candidates.into_iter().map(Some).collect();
    picked
        .into_iter()
        .filter_map(|i| slots[i].take())
        .collect()
}

/// Uniformly choose one candidate whose id is not excluded.
///
/// Returns `None` when the filtered pool is empty.
pub fn select_replacement_with_rng<R: Rng + ?Sized>(
    candidates: Vec<User>,
    exclude_ids: &HashSet<i64>,
    rng: &mut R,
) -> Option<User> {
    let pool: Vec<User> = candidates
        .into_iter()
        .filter(|c| !exclude_ids.contains(&c.id))
        .collect();

    pool.choose(rng).cloned()
}
