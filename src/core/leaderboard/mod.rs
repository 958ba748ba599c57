// src/core/leaderboard/mod.rs

//! The leaderboard engine.
//!
//! A [`Leaderboard`] is a cheap, immutable handle: a store, a key, an
//! ordering and optionally an encoder and a size bound. It holds no ranking
//! data of its own. Every operation translates into one or a few calls on
//! the [`SortedSetStore`], so any number of handles (in any number of
//! processes, for `RespStore`) can share one board.

pub mod builder;
pub mod key;
pub mod payload;
pub mod window;

pub use builder::LeaderboardBuilder;
pub use key::{DEFAULT_SUB_ID, LeaderboardKey};
pub use payload::RankItem;
pub use window::{list_window_end, rank_window_to_store_range};

use crate::core::encoder::{ScoreEncoder, is_precision_safe};
use crate::core::storage::{SortedSetStore, StoreEntry};
use crate::core::{Ordering, RankError};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// How many overflow entries one eviction pass removes at most.
pub const EVICTION_BATCH_SIZE: i64 = 3;

/// One row of a range query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RankEntry {
    pub member: String,
    /// Decoded primary value if the handle has an encoder, the raw stored
    /// score truncated to an integer otherwise.
    pub score: i64,
}

#[derive(Debug, Clone)]
pub struct Leaderboard {
    store: Arc<dyn SortedSetStore>,
    key: LeaderboardKey,
    ordering: Ordering,
    encoder: Option<Arc<dyn ScoreEncoder>>,
    max_members: usize,
}

impl Leaderboard {
    pub fn builder(base_key: impl Into<String>) -> LeaderboardBuilder {
        LeaderboardBuilder::new(base_key)
    }

    pub fn key(&self) -> &LeaderboardKey {
        &self.key
    }

    pub fn ordering(&self) -> Ordering {
        self.ordering
    }

    pub fn encoder(&self) -> Option<&Arc<dyn ScoreEncoder>> {
        self.encoder.as_ref()
    }

    pub fn max_members(&self) -> usize {
        self.max_members
    }

    pub fn store(&self) -> &Arc<dyn SortedSetStore> {
        &self.store
    }

    // --- Derived handles ---

    /// Same configuration, different sub-identifier.
    pub fn with_id(&self, sub_id: impl Into<String>) -> Self {
        Self {
            key: self.key.derive(sub_id),
            ..self.clone()
        }
    }

    pub fn with_ordering(&self, ordering: Ordering) -> Self {
        Self {
            ordering,
            ..self.clone()
        }
    }

    pub fn with_ordering_name(&self, name: &str) -> Result<Self, RankError> {
        Ok(self.with_ordering(name.parse()?))
    }

    pub fn with_encoder(&self, encoder: Arc<dyn ScoreEncoder>) -> Self {
        Self {
            encoder: Some(encoder),
            ..self.clone()
        }
    }

    pub fn without_encoder(&self) -> Self {
        Self {
            encoder: None,
            ..self.clone()
        }
    }

    pub fn with_max_members(&self, max_members: usize) -> Self {
        Self {
            max_members,
            ..self.clone()
        }
    }

    // --- Writes ---

    /// Writes `member`'s score unconditionally. Returns `true` if the member
    /// was added or its stored score changed.
    ///
    /// With a size bound, an eviction pass follows the write. The two steps
    /// are separate store commands: a concurrent reader may briefly observe
    /// more than `max_members` entries. A failed eviction is logged and left
    /// for the next write to finish.
    pub async fn set(&self, member: &str, primary: i64, factor: i64) -> Result<bool, RankError> {
        let changed = self.write_score(member, primary, factor).await?;
        self.evict_after_write().await;
        Ok(changed)
    }

    pub async fn add(&self, member: &str, primary: i64, factor: i64) -> Result<bool, RankError> {
        self.set(member, primary, factor).await
    }

    /// Writes every entry with a single store command. Returns how many
    /// members were added or changed.
    pub async fn add_batch(&self, entries: &[(&str, i64, i64)]) -> Result<u64, RankError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut encoded = Vec::with_capacity(entries.len());
        for &(member, primary, factor) in entries {
            encoded.push((member.to_string(), self.encode_score(primary, factor)?));
        }
        let changed = self.store.add_many(self.key.as_str(), &encoded).await?;
        self.evict_after_write().await;
        Ok(changed)
    }

    /// Writes only if `primary` beats the member's current score for this
    /// board's ordering. Non-positive values are ignored. A stored score of
    /// `0` counts as unranked and is always beaten.
    pub async fn set_if_better(
        &self,
        member: &str,
        primary: i64,
        factor: i64,
    ) -> Result<bool, RankError> {
        if primary <= 0 {
            return Ok(false);
        }
        let current = self
            .store
            .score_of(self.key.as_str(), member)
            .await?
            .map(|raw| self.decode_score(raw));
        if let Some(current) = current
            && current > 0
            && !self.ordering.is_better(primary, current)
        {
            return Ok(false);
        }
        self.set(member, primary, factor).await
    }

    pub async fn delete(&self, member: &str) -> Result<bool, RankError> {
        Ok(self.store.remove(self.key.as_str(), member).await? > 0)
    }

    /// Removes `count` members starting at 1-based `rank`, together with
    /// their payload fields.
    pub async fn delete_by_ranking(&self, rank: i64, count: i64) -> Result<u64, RankError> {
        if rank <= 0 {
            return Err(RankError::InvalidRanking(rank));
        }
        if count < 1 {
            return Ok(0);
        }
        let (start, end) = rank_window_to_store_range(self.ordering, rank, count);
        let key = self.key.as_str();
        let data_key = self.key.data_key();

        // Boards that never stored a payload skip the extra range read.
        let doomed = if self.store.exists(&data_key).await? {
            self.store
                .range_by_rank(key, start, end, Ordering::Ascending)
                .await?
        } else {
            Vec::new()
        };
        let removed = self.store.remove_range_by_rank(key, start, end).await?;

        for entry in doomed {
            // A member re-added between the read and the removal keeps its payload.
            if self.store.score_of(key, &entry.member).await?.is_none() {
                self.store.hash_remove(&data_key, &entry.member).await?;
            }
        }
        Ok(removed)
    }

    /// Trims entries ranked past `max_members`, at most
    /// [`EVICTION_BATCH_SIZE`] per call. No-op without a size bound.
    pub async fn limit_if(&self) -> Result<u64, RankError> {
        if self.max_members == 0 {
            return Ok(0);
        }
        let first_over = i64::try_from(self.max_members)
            .unwrap_or(i64::MAX)
            .saturating_add(1);
        let removed = self
            .delete_by_ranking(first_over, EVICTION_BATCH_SIZE)
            .await?;
        if removed > 0 {
            debug!(
                "Evicted {} member(s) past rank {} from '{}'.",
                removed, self.max_members, self.key
            );
        }
        Ok(removed)
    }

    /// Removes the board and its payload hash.
    pub async fn clear(&self) -> Result<(), RankError> {
        self.store.delete(self.key.as_str()).await?;
        self.store.delete(&self.key.data_key()).await?;
        Ok(())
    }

    /// Expires the board (and its payload hash) after `ttl`. Returns `false`
    /// if the board does not exist.
    pub async fn set_ttl(&self, ttl: Duration) -> Result<bool, RankError> {
        let applied = self.store.expire(self.key.as_str(), ttl).await?;
        self.store.expire(&self.key.data_key(), ttl).await?;
        Ok(applied)
    }

    // --- Reads ---

    /// Current score of `member`, or `0` if absent.
    pub async fn get_score(&self, member: &str) -> Result<i64, RankError> {
        let raw = self.store.score_of(self.key.as_str(), member).await?;
        Ok(raw.map(|raw| self.decode_score(raw)).unwrap_or(0))
    }

    /// 1-based rank of `member`, or `0` if absent.
    pub async fn get_ranking(&self, member: &str) -> Result<u64, RankError> {
        let rank = self
            .store
            .rank_of(self.key.as_str(), member, self.ordering)
            .await?;
        Ok(rank.map_or(0, |r| r + 1))
    }

    /// `count` entries starting at 0-based offset `start`, best first.
    pub async fn get_list(&self, start: i64, count: i64) -> Result<Vec<RankEntry>, RankError> {
        let Some(end) = list_window_end(start, count) else {
            return Err(RankError::InvalidRange {
                start,
                end: start.wrapping_add(count).wrapping_sub(1),
            });
        };
        let entries = self
            .store
            .range_by_rank(self.key.as_str(), start, end, self.ordering)
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| self.to_rank_entry(entry))
            .collect())
    }

    pub async fn get_top(&self, count: i64) -> Result<Vec<RankEntry>, RankError> {
        if count <= 0 {
            return Ok(Vec::new());
        }
        self.get_list(0, count).await
    }

    pub async fn get_members(&self, start: i64, count: i64) -> Result<Vec<String>, RankError> {
        Ok(self
            .get_list(start, count)
            .await?
            .into_iter()
            .map(|entry| entry.member)
            .collect())
    }

    /// Score at 0-based `offset`, or `0` past the end of the board.
    pub async fn get_score_by_ranking(&self, offset: i64) -> Result<i64, RankError> {
        let list = self.get_list(offset, 1).await?;
        Ok(list.first().map_or(0, |entry| entry.score))
    }

    pub async fn contains(&self, member: &str) -> Result<bool, RankError> {
        Ok(self
            .store
            .score_of(self.key.as_str(), member)
            .await?
            .is_some())
    }

    pub async fn size(&self) -> Result<u64, RankError> {
        self.store.cardinality(self.key.as_str()).await
    }

    pub async fn exists(&self) -> Result<bool, RankError> {
        self.store.exists(self.key.as_str()).await
    }

    /// Encodes and stores the score without running eviction.
    async fn write_score(&self, member: &str, primary: i64, factor: i64) -> Result<bool, RankError> {
        let score = self.encode_score(primary, factor)?;
        self.store.add(self.key.as_str(), member, score).await
    }

    // --- Score conversion ---

    fn encode_score(&self, primary: i64, factor: i64) -> Result<f64, RankError> {
        let Some(encoder) = &self.encoder else {
            if !is_precision_safe(primary) {
                warn!(
                    "Score {} for '{}' exceeds the exact range of a double.",
                    primary, self.key
                );
            }
            return Ok(primary as f64);
        };
        let primary_i32 = i32::try_from(primary).map_err(|_| RankError::ScoreOverflow(primary))?;
        let factor_i32 = i32::try_from(factor).map_err(|_| RankError::FactorOverflow(factor))?;
        let encoded = encoder.encode(primary_i32, factor_i32);
        if !is_precision_safe(encoded) {
            warn!(
                "Encoded score {} (primary {}) for '{}' exceeds the exact range of a double; ties may not order correctly.",
                encoded, primary, self.key
            );
        }
        Ok(encoded as f64)
    }

    fn decode_score(&self, raw: f64) -> i64 {
        match &self.encoder {
            Some(encoder) => i64::from(encoder.decode(raw as i64)),
            None => raw as i64,
        }
    }

    fn to_rank_entry(&self, entry: StoreEntry) -> RankEntry {
        RankEntry {
            score: self.decode_score(entry.score),
            member: entry.member,
        }
    }

    async fn evict_after_write(&self) {
        if self.max_members == 0 {
            return;
        }
        if let Err(e) = self.limit_if().await {
            warn!("Eviction on '{}' failed: {}", self.key, e);
        }
    }
}
