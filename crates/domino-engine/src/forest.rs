//! Arena-indexed, in-memory referral forest.
//!
//! Nodes live in a `Vec` and point at their referrer by index; a `HashMap`
//! maps user IDs to slots. `insert` only accepts referrers that are already
//! present, so a forest built through it cannot contain a cycle.

use std::collections::HashMap;

use crate::commission::ReferralStore;
use crate::storage::DatabaseError;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ForestError {
    #[error("user {0} is already in the forest")]
    Duplicate(String),

    #[error("referrer {referrer} of {user} is not in the forest")]
    UnknownReferrer { user: String, referrer: String },

    #[error("user {0} cannot refer themselves")]
    SelfReferral(String),
}

#[derive(Debug, Clone)]
struct Node {
    id: String,
    parent: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct ReferralForest {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
}

impl ReferralForest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            index: HashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.index.contains_key(user_id)
    }

    /// Add a user under an existing referrer (or as a root).
    pub fn insert(&mut self, user_id: &str, referrer_id: Option<&str>) -> Result<(), ForestError> {
        if self.index.contains_key(user_id) {
            return Err(ForestError::Duplicate(user_id.to_string()));
        }
        let parent = match referrer_id {
            None => None,
            Some(r) if r == user_id => return Err(ForestError::SelfReferral(user_id.to_string())),
            Some(r) => Some(*self.index.get(r).ok_or_else(|| ForestError::UnknownReferrer {
                user: user_id.to_string(),
                referrer: r.to_string(),
            })?),
        };

        let slot = self.nodes.len();
        self.nodes.push(Node {
            id: user_id.to_string(),
            parent,
        });
        self.index.insert(user_id.to_string(), slot);
        Ok(())
    }

    /// Direct referrer of a user; `None` for roots and unknown users.
    pub fn referrer_of(&self, user_id: &str) -> Option<&str> {
        let slot = *self.index.get(user_id)?;
        let parent = self.nodes[slot].parent?;
        Some(self.nodes[parent].id.as_str())
    }

    /// Number of users with no referrer.
    pub fn root_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.parent.is_none()).count()
    }

    /// Re-point a node's parent without any checks. Lets tests build the
    /// corrupt graphs that `insert` refuses to create.
    #[cfg(test)]
    pub(crate) fn relink_unchecked(&mut self, user_id: &str, referrer_id: &str) {
        if let (Some(&slot), Some(&parent)) = (self.index.get(user_id), self.index.get(referrer_id))
        {
            self.nodes[slot].parent = Some(parent);
        }
    }
}

impl ReferralStore for ReferralForest {
    async fn user_exists(&self, user_id: &str) -> Result<bool, DatabaseError> {
        Ok(self.contains(user_id))
    }

    async fn referrer_of(&self, user_id: &str) -> Result<Option<String>, DatabaseError> {
        Ok(Self::referrer_of(self, user_id).map(ToString::to_string))
    }
}
