// src/core/leaderboard/key.rs

use crate::core::RankError;
use std::fmt;

/// Sub-identifier used when a leaderboard is built without one.
pub const DEFAULT_SUB_ID: &str = "default";

const SEPARATOR: &str = ":";
const DATA_SUFFIX: &str = "data";

/// The store key of one leaderboard: `"<base>:<sub_id>"`.
///
/// Keys sharing a base but differing in sub-identifier address independent
/// sorted sets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LeaderboardKey {
    base: String,
    sub_id: String,
    joined: String,
}

impl LeaderboardKey {
    /// Builds the key for `base` with the default sub-identifier.
    pub fn new(base: impl Into<String>) -> Result<Self, RankError> {
        Self::with_sub_id(base, DEFAULT_SUB_ID)
    }

    pub fn with_sub_id(
        base: impl Into<String>,
        sub_id: impl Into<String>,
    ) -> Result<Self, RankError> {
        let base = base.into();
        if base.is_empty() {
            return Err(RankError::EmptyKey);
        }
        let sub_id = sub_id.into();
        let joined = [base.as_str(), sub_id.as_str()].join(SEPARATOR);
        Ok(Self {
            base,
            sub_id,
            joined,
        })
    }

    /// The same base with another sub-identifier.
    pub fn derive(&self, sub_id: impl Into<String>) -> Self {
        let sub_id = sub_id.into();
        let joined = [self.base.as_str(), sub_id.as_str()].join(SEPARATOR);
        Self {
            base: self.base.clone(),
            sub_id,
            joined,
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn sub_id(&self) -> &str {
        &self.sub_id
    }

    pub fn as_str(&self) -> &str {
        &self.joined
    }

    /// Key of the hash holding per-member payloads: `"<base>:<sub_id>:data"`.
    pub fn data_key(&self) -> String {
        [self.joined.as_str(), DATA_SUFFIX].join(SEPARATOR)
    }
}

impl fmt::Display for LeaderboardKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined)
    }
}
