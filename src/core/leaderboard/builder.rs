// src/core/leaderboard/builder.rs

use super::Leaderboard;
use super::key::{DEFAULT_SUB_ID, LeaderboardKey};
use crate::core::encoder::ScoreEncoder;
use crate::core::storage::SortedSetStore;
use crate::core::{Ordering, RankError};
use std::sync::Arc;

/// Collects a leaderboard's configuration and validates it once, in
/// [`build`](LeaderboardBuilder::build). The resulting handle is immutable.
#[derive(Debug, Clone, Default)]
pub struct LeaderboardBuilder {
    base_key: String,
    sub_id: Option<String>,
    store: Option<Arc<dyn SortedSetStore>>,
    ordering: Ordering,
    ordering_name: Option<String>,
    encoder: Option<Arc<dyn ScoreEncoder>>,
    max_members: usize,
}

impl LeaderboardBuilder {
    pub fn new(base_key: impl Into<String>) -> Self {
        Self {
            base_key: base_key.into(),
            ..Default::default()
        }
    }

    pub fn store(mut self, store: Arc<dyn SortedSetStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn sub_id(mut self, sub_id: impl Into<String>) -> Self {
        self.sub_id = Some(sub_id.into());
        self
    }

    pub fn ordering(mut self, ordering: Ordering) -> Self {
        self.ordering = ordering;
        self.ordering_name = None;
        self
    }

    /// Selects the ordering by token (`"asc"` or `"desc"`). An unknown token
    /// makes `build` fail.
    pub fn ordering_name(mut self, name: impl Into<String>) -> Self {
        self.ordering_name = Some(name.into());
        self
    }

    pub fn encoder(mut self, encoder: Arc<dyn ScoreEncoder>) -> Self {
        self.encoder = Some(encoder);
        self
    }

    /// Keep at most `max_members` entries. `0` means unbounded.
    pub fn max_members(mut self, max_members: usize) -> Self {
        self.max_members = max_members;
        self
    }

    pub fn build(self) -> Result<Leaderboard, RankError> {
        let key = LeaderboardKey::with_sub_id(
            self.base_key,
            self.sub_id.unwrap_or_else(|| DEFAULT_SUB_ID.to_string()),
        )?;
        let ordering = match self.ordering_name {
            Some(name) => name.parse()?,
            None => self.ordering,
        };
        let store = self.store.ok_or(RankError::MissingStore)?;
        Ok(Leaderboard {
            store,
            key,
            ordering,
            encoder: self.encoder,
            max_members: self.max_members,
        })
    }
}
