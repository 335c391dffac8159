//! Vouch ledger carried through the persistence layer
//!
//! The reputation subsystem itself lives outside this crate; these types
//! exist so the snapshot file round-trips the vouch document intact.

use super::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One recorded vouch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchEntry {
    /// Who gave the vouch
    pub from: UserId,
    /// Free-form review text
    pub review: String,
    /// Star rating, 1-5
    pub stars: u8,
    /// When the vouch was recorded
    pub at: DateTime<Utc>,
}

/// Per-user vouch tally
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VouchRecord {
    /// Running vouch count
    pub count: u32,
    /// Individual entries, oldest first
    #[serde(default)]
    pub vouches: Vec<VouchEntry>,
}

/// The full vouch document, keyed by string-encoded user id
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VouchLedger(pub HashMap<UserId, VouchRecord>);

impl VouchLedger {
    /// An empty ledger
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with vouch records
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the ledger holds no records
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
