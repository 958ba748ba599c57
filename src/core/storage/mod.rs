// src/core/storage/mod.rs

//! The backing ordered-set store consumed by the leaderboard engine.
//!
//! The engine only speaks to [`SortedSetStore`]. Two implementations ship
//! with the crate: [`MemoryStore`] keeps everything in process, and
//! [`RespStore`] forwards each call as one command to a Redis-compatible
//! server.

pub mod memory;
pub mod resp;
pub mod sorted_set;

pub use memory::MemoryStore;
pub use resp::RespStore;
pub use sorted_set::{SortedSet, ZSetEntry};

use crate::core::{Ordering, RankError};
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;
use std::time::Duration;

/// A `(member, score)` pair as the store returns it.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreEntry {
    pub member: String,
    pub score: f64,
}

/// Sorted-set and hash primitives of a Redis-compatible store.
///
/// Every method is a single atomic command on the store side. A key or member
/// that does not exist is reported as `None`, `0` or an empty vector, never
/// as an error. Ranges are inclusive and accept negative indexes counting
/// from the end, exactly like `ZRANGE`/`ZREMRANGEBYRANK`.
#[async_trait]
pub trait SortedSetStore: Debug + Send + Sync {
    /// Adds or updates a member. Returns `true` if it was added or its score
    /// changed.
    async fn add(&self, key: &str, member: &str, score: f64) -> Result<bool, RankError>;

    /// Adds or updates several members. Returns how many were added or
    /// changed.
    async fn add_many(&self, key: &str, entries: &[(String, f64)]) -> Result<u64, RankError>;

    /// Entries whose rank in `order` lies within `[start, end]`.
    async fn range_by_rank(
        &self,
        key: &str,
        start: i64,
        end: i64,
        order: Ordering,
    ) -> Result<Vec<StoreEntry>, RankError>;

    /// 0-based rank of `member` in `order`.
    async fn rank_of(
        &self,
        key: &str,
        member: &str,
        order: Ordering,
    ) -> Result<Option<u64>, RankError>;

    /// Removes members whose ascending rank lies within `[start, end]`.
    async fn remove_range_by_rank(&self, key: &str, start: i64, end: i64)
    -> Result<u64, RankError>;

    async fn remove(&self, key: &str, member: &str) -> Result<u64, RankError>;

    async fn cardinality(&self, key: &str) -> Result<u64, RankError>;

    async fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, RankError>;

    /// Deletes a key of any type. Returns the number of keys removed.
    async fn delete(&self, key: &str) -> Result<u64, RankError>;

    async fn exists(&self, key: &str) -> Result<bool, RankError>;

    /// Sets a time-to-live on an existing key. Returns `false` if the key
    /// does not exist.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, RankError>;

    /// Sets a hash field. Returns `true` if the field is new.
    async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<bool, RankError>;

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>, RankError>;

    async fn hash_remove(&self, key: &str, field: &str) -> Result<u64, RankError>;
}
