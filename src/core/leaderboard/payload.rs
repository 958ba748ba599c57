// src/core/leaderboard/payload.rs

//! Per-member JSON payloads stored next to a board.
//!
//! Payloads live in a hash at `"<key>:data"`, one field per member. The score
//! and the payload are written by separate commands, so a reader can see a
//! member whose payload is not there yet; that reads back as `payload: None`.

use super::Leaderboard;
use crate::core::RankError;
use bytes::Bytes;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::debug;

/// A ranked member together with its decoded payload.
#[derive(Debug, Clone, PartialEq)]
pub struct RankItem<T> {
    pub member: String,
    pub score: i64,
    pub payload: Option<T>,
}

impl Leaderboard {
    /// Writes the score and stores `payload` as JSON under the member's
    /// name, then runs the size bound like [`set`](Leaderboard::set).
    ///
    /// The payload is serialized before anything is written, so a payload
    /// that fails to serialize leaves the board untouched. Eviction runs
    /// after the payload write, so a newcomer that does not make the cut
    /// leaves no payload behind.
    pub async fn set_with_payload<T>(
        &self,
        member: &str,
        primary: i64,
        factor: i64,
        payload: &T,
    ) -> Result<bool, RankError>
    where
        T: Serialize + Sync + ?Sized,
    {
        let body = Bytes::from(serde_json::to_vec(payload)?);
        let changed = self.write_score(member, primary, factor).await?;
        self.store
            .hash_set(&self.key.data_key(), member, body)
            .await?;
        self.evict_after_write().await;
        Ok(changed)
    }

    /// The member's score and payload, or `None` if it has no score.
    pub async fn get_entry<T>(&self, member: &str) -> Result<Option<RankItem<T>>, RankError>
    where
        T: DeserializeOwned,
    {
        let Some(raw) = self.store.score_of(self.key.as_str(), member).await? else {
            return Ok(None);
        };
        let payload = self
            .store
            .hash_get(&self.key.data_key(), member)
            .await?
            .and_then(|body| match serde_json::from_slice(&body) {
                Ok(payload) => Some(payload),
                Err(e) => {
                    debug!("Ignoring undecodable payload of '{}' in '{}': {}", member, self.key, e);
                    None
                }
            });
        Ok(Some(RankItem {
            member: member.to_string(),
            score: self.decode_score(raw),
            payload,
        }))
    }

    /// Like [`get_list`](Leaderboard::get_list), with payloads.
    pub async fn get_entries<T>(&self, start: i64, count: i64) -> Result<Vec<RankItem<T>>, RankError>
    where
        T: DeserializeOwned,
    {
        let members = self.get_members(start, count).await?;
        self.collect_entries(members.iter().map(String::as_str)).await
    }

    pub async fn get_top_entries<T>(&self, count: i64) -> Result<Vec<RankItem<T>>, RankError>
    where
        T: DeserializeOwned,
    {
        if count <= 0 {
            return Ok(Vec::new());
        }
        self.get_entries(0, count).await
    }

    /// Entries for the given members, in the given order. Members without a
    /// score are skipped.
    pub async fn get_entries_by_members<T, M>(
        &self,
        members: &[M],
    ) -> Result<Vec<RankItem<T>>, RankError>
    where
        T: DeserializeOwned,
        M: AsRef<str> + Sync,
    {
        self.collect_entries(members.iter().map(|m| m.as_ref())).await
    }

    /// Removes the member and its payload field.
    pub async fn delete_with_payload(&self, member: &str) -> Result<bool, RankError> {
        let removed = self.delete(member).await?;
        self.store
            .hash_remove(&self.key.data_key(), member)
            .await?;
        Ok(removed)
    }

    async fn collect_entries<'a, T, I>(&self, members: I) -> Result<Vec<RankItem<T>>, RankError>
    where
        T: DeserializeOwned,
        I: IntoIterator<Item = &'a str>,
    {
        let mut items = Vec::new();
        for member in members {
            if let Some(item) = self.get_entry(member).await? {
                items.push(item);
            }
        }
        Ok(items)
    }
}
