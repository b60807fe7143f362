//! Referral chain resolution.
//!
//! Walks `referrer_of` pointers upward from the triggering user, one hop per
//! level, with a depth bound and a visited set so a corrupt graph cannot
//! loop.

use std::collections::HashSet;

use serde::Serialize;
use tracing::{debug, warn};

use super::error::CommissionError;
use super::store::ReferralStore;

/// One ancestor of the triggering user. Level 1 is the direct referrer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChainLink {
    pub ancestor_id: String,
    pub level: u32,
}

pub struct ChainResolver<'a, R> {
    store: &'a R,
    max_depth: u32,
}

impl<'a, R: ReferralStore> ChainResolver<'a, R> {
    pub const fn new(store: &'a R, max_depth: u32) -> Self {
        Self { store, max_depth }
    }

    /// Ancestors of `referred_user_id`, nearest first, levels `1..=n`.
    ///
    /// Stops at a root or after `max_depth` links. A node seen twice
    /// (including the starting user) is a `DataIntegrity` error, even when
    /// the repeat is the first hop past the depth limit.
    pub async fn resolve(&self, referred_user_id: &str) -> Result<Vec<ChainLink>, CommissionError> {
        let mut visited = HashSet::from([referred_user_id.to_string()]);
        let mut links = Vec::new();
        let mut next = self
            .store
            .referrer_of(referred_user_id)
            .await
            .map_err(CommissionError::read)?;
        let mut level = 1u32;

        while let Some(ancestor_id) = next {
            if !visited.insert(ancestor_id.clone()) {
                warn!(
                    user_id = %referred_user_id,
                    repeated = %ancestor_id,
                    level,
                    "Referral cycle detected"
                );
                return Err(CommissionError::DataIntegrity(format!(
                    "referral cycle above {referred_user_id}: {ancestor_id} repeats at level {level}"
                )));
            }
            if level > self.max_depth {
                warn!(
                    user_id = %referred_user_id,
                    max_depth = self.max_depth,
                    "Referral chain truncated at maximum depth"
                );
                break;
            }

            next = self
                .store
                .referrer_of(&ancestor_id)
                .await
                .map_err(CommissionError::read)?;
            links.push(ChainLink { ancestor_id, level });
            level += 1;
        }

        debug!(user_id = %referred_user_id, depth = links.len(), "Referral chain resolved");
        Ok(links)
    }
}
