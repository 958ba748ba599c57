// src/core/ordering.rs

use crate::core::RankError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction in which a leaderboard ranks its members.
///
/// `Ascending` puts the lowest score at rank 1 (e.g. fastest lap time),
/// `Descending` puts the highest score at rank 1 (e.g. points).
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Ordering {
    #[serde(rename = "asc")]
    Ascending,
    #[default]
    #[serde(rename = "desc")]
    Descending,
}

impl Ordering {
    pub fn as_str(&self) -> &'static str {
        match self {
            Ordering::Ascending => "asc",
            Ordering::Descending => "desc",
        }
    }

    /// Returns true if `candidate` ranks strictly better than `current`.
    pub fn is_better(&self, candidate: i64, current: i64) -> bool {
        match self {
            Ordering::Ascending => candidate < current,
            Ordering::Descending => candidate > current,
        }
    }
}

impl FromStr for Ordering {
    type Err = RankError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(Ordering::Ascending),
            "desc" => Ok(Ordering::Descending),
            other => Err(RankError::InvalidOrdering(other.to_string())),
        }
    }
}

impl fmt::Display for Ordering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
