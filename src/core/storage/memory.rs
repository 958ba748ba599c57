// src/core/storage/memory.rs

//! An in-process `SortedSetStore` with Redis semantics.
//!
//! Each key lives in a `DashMap` shard, so a single command holds one entry
//! lock for its whole duration and is atomic with respect to other commands
//! on the same key. Expired keys are removed lazily on access.

use super::sorted_set::SortedSet;
use super::{SortedSetStore, StoreEntry};
use crate::core::{Ordering, RankError};
use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;

/// The value held by one key.
#[derive(Debug, Clone)]
enum DataValue {
    SortedSet(SortedSet),
    Hash(HashMap<String, Bytes>),
}

impl DataValue {
    fn is_empty(&self) -> bool {
        match self {
            DataValue::SortedSet(zset) => zset.is_empty(),
            DataValue::Hash(hash) => hash.is_empty(),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredValue {
    data: DataValue,
    expiry: Option<Instant>,
}

impl StoredValue {
    fn new(data: DataValue) -> Self {
        Self { data, expiry: None }
    }

    fn is_expired(&self) -> bool {
        self.expiry.is_some_and(|at| at <= Instant::now())
    }
}

/// A concurrent, non-persistent store for tests and single-process use.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, StoredValue>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Default::default()
    }

    /// Number of live keys.
    pub fn key_count(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    fn purge_if_expired(&self, key: &str) {
        if self.entries.remove_if(key, |_, v| v.is_expired()).is_some() {
            debug!("Lazily expired key '{}'.", key);
        }
    }

    fn drop_if_empty(&self, key: &str) {
        self.entries.remove_if(key, |_, v| v.data.is_empty());
    }

    fn read_zset<R>(
        &self,
        key: &str,
        f: impl FnOnce(&SortedSet) -> R,
    ) -> Result<Option<R>, RankError> {
        self.purge_if_expired(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(value) => match &value.data {
                DataValue::SortedSet(zset) => Ok(Some(f(zset))),
                _ => Err(RankError::WrongType),
            },
        }
    }

    fn update_zset<R>(
        &self,
        key: &str,
        f: impl FnOnce(&mut SortedSet) -> R,
    ) -> Result<Option<R>, RankError> {
        self.purge_if_expired(key);
        let result = match self.entries.get_mut(key) {
            None => return Ok(None),
            Some(mut value) => match &mut value.data {
                DataValue::SortedSet(zset) => f(zset),
                _ => return Err(RankError::WrongType),
            },
        };
        self.drop_if_empty(key);
        Ok(Some(result))
    }

    fn upsert_zset<R>(&self, key: &str, f: impl FnOnce(&mut SortedSet) -> R) -> Result<R, RankError> {
        self.purge_if_expired(key);
        let mut value = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::new(DataValue::SortedSet(SortedSet::new())));
        match &mut value.data {
            DataValue::SortedSet(zset) => Ok(f(zset)),
            _ => Err(RankError::WrongType),
        }
    }

    fn read_hash<R>(
        &self,
        key: &str,
        f: impl FnOnce(&HashMap<String, Bytes>) -> R,
    ) -> Result<Option<R>, RankError> {
        self.purge_if_expired(key);
        match self.entries.get(key) {
            None => Ok(None),
            Some(value) => match &value.data {
                DataValue::Hash(hash) => Ok(Some(f(hash))),
                _ => Err(RankError::WrongType),
            },
        }
    }
}

#[async_trait]
impl SortedSetStore for MemoryStore {
    async fn add(&self, key: &str, member: &str, score: f64) -> Result<bool, RankError> {
        self.upsert_zset(key, |zset| zset.add(score, member))
    }

    async fn add_many(&self, key: &str, entries: &[(String, f64)]) -> Result<u64, RankError> {
        if entries.is_empty() {
            return Ok(0);
        }
        self.upsert_zset(key, |zset| {
            let mut changed = 0;
            for (member, score) in entries {
                if zset.add(*score, member) {
                    changed += 1;
                }
            }
            changed
        })
    }

    async fn range_by_rank(
        &self,
        key: &str,
        start: i64,
        end: i64,
        order: Ordering,
    ) -> Result<Vec<StoreEntry>, RankError> {
        let entries = self.read_zset(key, |zset| match order {
            Ordering::Ascending => zset.get_range(start, end),
            Ordering::Descending => zset.get_rev_range(start, end),
        })?;
        Ok(entries
            .unwrap_or_default()
            .into_iter()
            .map(|e| StoreEntry {
                member: e.member,
                score: e.score.into_inner(),
            })
            .collect())
    }

    async fn rank_of(
        &self,
        key: &str,
        member: &str,
        order: Ordering,
    ) -> Result<Option<u64>, RankError> {
        let rank = self.read_zset(key, |zset| match order {
            Ordering::Ascending => zset.get_rank(member),
            Ordering::Descending => zset.get_rev_rank(member),
        })?;
        Ok(rank.flatten().map(|r| r as u64))
    }

    async fn remove_range_by_rank(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, RankError> {
        let removed = self.update_zset(key, |zset| zset.remove_range_by_rank(start, end))?;
        Ok(removed.unwrap_or(0) as u64)
    }

    async fn remove(&self, key: &str, member: &str) -> Result<u64, RankError> {
        let removed = self.update_zset(key, |zset| zset.remove(member))?;
        Ok(u64::from(removed.unwrap_or(false)))
    }

    async fn cardinality(&self, key: &str) -> Result<u64, RankError> {
        let len = self.read_zset(key, |zset| zset.len())?;
        Ok(len.unwrap_or(0) as u64)
    }

    async fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, RankError> {
        Ok(self.read_zset(key, |zset| zset.get_score(member))?.flatten())
    }

    async fn delete(&self, key: &str) -> Result<u64, RankError> {
        self.purge_if_expired(key);
        Ok(u64::from(self.entries.remove(key).is_some()))
    }

    async fn exists(&self, key: &str) -> Result<bool, RankError> {
        self.purge_if_expired(key);
        Ok(self.entries.contains_key(key))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, RankError> {
        self.purge_if_expired(key);
        match self.entries.get_mut(key) {
            Some(mut value) => {
                value.expiry = Some(Instant::now() + ttl);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<bool, RankError> {
        self.purge_if_expired(key);
        let mut stored = self
            .entries
            .entry(key.to_string())
            .or_insert_with(|| StoredValue::new(DataValue::Hash(HashMap::new())));
        match &mut stored.data {
            DataValue::Hash(hash) => Ok(hash.insert(field.to_string(), value).is_none()),
            _ => Err(RankError::WrongType),
        }
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>, RankError> {
        Ok(self.read_hash(key, |hash| hash.get(field).cloned())?.flatten())
    }

    async fn hash_remove(&self, key: &str, field: &str) -> Result<u64, RankError> {
        self.purge_if_expired(key);
        let removed = match self.entries.get_mut(key) {
            None => return Ok(0),
            Some(mut stored) => match &mut stored.data {
                DataValue::Hash(hash) => hash.remove(field).is_some(),
                _ => return Err(RankError::WrongType),
            },
        };
        self.drop_if_empty(key);
        Ok(u64::from(removed))
    }
}
