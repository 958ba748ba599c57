// src/core/storage/resp.rs

//! A `SortedSetStore` that forwards every call to a Redis-compatible server.

use super::{SortedSetStore, StoreEntry};
use crate::config::RespStoreConfig;
use crate::core::protocol::{RespFrame, RespFrameCodec};
use crate::core::{Ordering, RankError};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

/// A single RESP2 connection shared by every leaderboard handle that holds
/// this store.
///
/// Commands are serialized behind a mutex: each request is written and its
/// reply read before the next request starts. The client never retries. A
/// transport failure (I/O error, timeout, undecodable reply) or a cancelled
/// call leaves the request/reply pairing unknown, so the connection is
/// dropped and every later command fails with `ConnectionClosed`.
#[derive(Debug)]
pub struct RespStore {
    conn: Mutex<Option<Framed<TcpStream, RespFrameCodec>>>,
    addr: String,
    read_timeout: Duration,
}

impl RespStore {
    /// Connects, then authenticates and selects the database if configured.
    pub async fn connect(config: &RespStoreConfig) -> Result<Self, RankError> {
        let addr = format!("{}:{}", config.host, config.port);
        debug!("Connecting to sorted-set store at {}.", addr);
        let socket = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&addr))
            .await??;
        socket.set_nodelay(true)?;

        let store = Self {
            conn: Mutex::new(Some(Framed::new(socket, RespFrameCodec))),
            addr,
            read_timeout: config.read_timeout,
        };

        if let Some(password) = &config.password {
            store
                .execute(vec![Bytes::from_static(b"AUTH"), Bytes::from(password.clone())])
                .await?
                .expect_status("OK")?;
        }
        if config.database != 0 {
            store
                .execute(vec![
                    Bytes::from_static(b"SELECT"),
                    int_arg(config.database as i64),
                ])
                .await?
                .expect_status("OK")?;
        }

        info!("Connected to sorted-set store at {}.", store.addr);
        Ok(store)
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Sends one command and waits for its reply. Error replies are turned
    /// into `RankError`s.
    ///
    /// The connection is taken out of the slot for the duration of the round
    /// trip and only put back once a complete reply has been read. If the
    /// caller drops this future mid-flight, the slot stays empty and the
    /// connection is closed, so an unread reply can never be handed to the
    /// next command.
    pub async fn execute(&self, args: Vec<Bytes>) -> Result<RespFrame, RankError> {
        let mut guard = self.conn.lock().await;
        let mut conn = guard.take().ok_or(RankError::ConnectionClosed)?;
        let result = Self::round_trip(&mut conn, args, self.read_timeout).await;
        let reply = match result {
            Ok(reply) => {
                *guard = Some(conn);
                reply
            }
            Err(e) => {
                warn!("Dropping connection to {} after error: {}", self.addr, e);
                return Err(e);
            }
        };
        match reply {
            RespFrame::Error(msg) if msg.starts_with("WRONGTYPE") => Err(RankError::WrongType),
            RespFrame::Error(msg) => Err(RankError::Store(msg)),
            frame => Ok(frame),
        }
    }

    /// True until a transport failure has dropped the connection.
    pub async fn is_connected(&self) -> bool {
        self.conn.lock().await.is_some()
    }

    async fn round_trip(
        conn: &mut Framed<TcpStream, RespFrameCodec>,
        args: Vec<Bytes>,
        read_timeout: Duration,
    ) -> Result<RespFrame, RankError> {
        conn.send(RespFrame::command(args)).await?;
        match tokio::time::timeout(read_timeout, conn.next()).await {
            Err(_) => Err(RankError::Timeout),
            Ok(None) => Err(RankError::ConnectionClosed),
            Ok(Some(frame)) => frame,
        }
    }

    async fn integer(&self, args: Vec<Bytes>) -> Result<i64, RankError> {
        self.execute(args).await?.into_integer()
    }
}

fn int_arg(value: i64) -> Bytes {
    Bytes::copy_from_slice(itoa::Buffer::new().format(value).as_bytes())
}

fn score_arg(score: f64) -> Bytes {
    if score.is_infinite() {
        let text: &'static [u8] = if score > 0.0 { b"+inf" } else { b"-inf" };
        return Bytes::from_static(text);
    }
    Bytes::copy_from_slice(ryu::Buffer::new().format(score).as_bytes())
}

fn key_arg(key: &str) -> Bytes {
    Bytes::copy_from_slice(key.as_bytes())
}

/// Parses a score as servers print it, including `inf`/`-inf`.
fn parse_score(raw: &[u8]) -> Result<f64, RankError> {
    let text = std::str::from_utf8(raw)
        .map_err(|_| RankError::UnexpectedReply("score is not UTF-8".into()))?;
    match text {
        "inf" | "+inf" => Ok(f64::INFINITY),
        "-inf" => Ok(f64::NEG_INFINITY),
        _ => Ok(text.parse::<f64>()?),
    }
}

fn non_negative(value: i64) -> u64 {
    u64::try_from(value).unwrap_or(0)
}

#[async_trait]
impl SortedSetStore for RespStore {
    async fn add(&self, key: &str, member: &str, score: f64) -> Result<bool, RankError> {
        let changed = self
            .integer(vec![
                Bytes::from_static(b"ZADD"),
                key_arg(key),
                Bytes::from_static(b"CH"),
                score_arg(score),
                key_arg(member),
            ])
            .await?;
        Ok(changed > 0)
    }

    async fn add_many(&self, key: &str, entries: &[(String, f64)]) -> Result<u64, RankError> {
        if entries.is_empty() {
            return Ok(0);
        }
        let mut args = Vec::with_capacity(3 + entries.len() * 2);
        args.push(Bytes::from_static(b"ZADD"));
        args.push(key_arg(key));
        args.push(Bytes::from_static(b"CH"));
        for (member, score) in entries {
            args.push(score_arg(*score));
            args.push(key_arg(member));
        }
        Ok(non_negative(self.integer(args).await?))
    }

    async fn range_by_rank(
        &self,
        key: &str,
        start: i64,
        end: i64,
        order: Ordering,
    ) -> Result<Vec<StoreEntry>, RankError> {
        let command: &'static [u8] = match order {
            Ordering::Ascending => b"ZRANGE",
            Ordering::Descending => b"ZREVRANGE",
        };
        let items = self
            .execute(vec![
                Bytes::from_static(command),
                key_arg(key),
                int_arg(start),
                int_arg(end),
                Bytes::from_static(b"WITHSCORES"),
            ])
            .await?
            .into_array()?;
        if items.len() % 2 != 0 {
            return Err(RankError::UnexpectedReply(format!(
                "WITHSCORES reply has odd length {}",
                items.len()
            )));
        }

        let mut entries = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(member), Some(score)) = (iter.next(), iter.next()) {
            let member = member
                .into_optional_bulk()?
                .ok_or_else(|| RankError::UnexpectedReply("null member in range".into()))?;
            let score = score
                .into_optional_bulk()?
                .ok_or_else(|| RankError::UnexpectedReply("null score in range".into()))?;
            entries.push(StoreEntry {
                member: String::from_utf8_lossy(&member).into_owned(),
                score: parse_score(&score)?,
            });
        }
        Ok(entries)
    }

    async fn rank_of(
        &self,
        key: &str,
        member: &str,
        order: Ordering,
    ) -> Result<Option<u64>, RankError> {
        let command: &'static [u8] = match order {
            Ordering::Ascending => b"ZRANK",
            Ordering::Descending => b"ZREVRANK",
        };
        let rank = self
            .execute(vec![Bytes::from_static(command), key_arg(key), key_arg(member)])
            .await?
            .into_optional_integer()?;
        Ok(rank.map(non_negative))
    }

    async fn remove_range_by_rank(
        &self,
        key: &str,
        start: i64,
        end: i64,
    ) -> Result<u64, RankError> {
        let removed = self
            .integer(vec![
                Bytes::from_static(b"ZREMRANGEBYRANK"),
                key_arg(key),
                int_arg(start),
                int_arg(end),
            ])
            .await?;
        Ok(non_negative(removed))
    }

    async fn remove(&self, key: &str, member: &str) -> Result<u64, RankError> {
        let removed = self
            .integer(vec![Bytes::from_static(b"ZREM"), key_arg(key), key_arg(member)])
            .await?;
        Ok(non_negative(removed))
    }

    async fn cardinality(&self, key: &str) -> Result<u64, RankError> {
        let len = self
            .integer(vec![Bytes::from_static(b"ZCARD"), key_arg(key)])
            .await?;
        Ok(non_negative(len))
    }

    async fn score_of(&self, key: &str, member: &str) -> Result<Option<f64>, RankError> {
        let raw = self
            .execute(vec![Bytes::from_static(b"ZSCORE"), key_arg(key), key_arg(member)])
            .await?
            .into_optional_bulk()?;
        raw.map(|bytes| parse_score(&bytes)).transpose()
    }

    async fn delete(&self, key: &str) -> Result<u64, RankError> {
        let removed = self
            .integer(vec![Bytes::from_static(b"DEL"), key_arg(key)])
            .await?;
        Ok(non_negative(removed))
    }

    async fn exists(&self, key: &str) -> Result<bool, RankError> {
        let count = self
            .integer(vec![Bytes::from_static(b"EXISTS"), key_arg(key)])
            .await?;
        Ok(count > 0)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool, RankError> {
        let millis = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let applied = self
            .integer(vec![
                Bytes::from_static(b"PEXPIRE"),
                key_arg(key),
                int_arg(millis),
            ])
            .await?;
        Ok(applied > 0)
    }

    async fn hash_set(&self, key: &str, field: &str, value: Bytes) -> Result<bool, RankError> {
        let added = self
            .integer(vec![
                Bytes::from_static(b"HSET"),
                key_arg(key),
                key_arg(field),
                value,
            ])
            .await?;
        Ok(added > 0)
    }

    async fn hash_get(&self, key: &str, field: &str) -> Result<Option<Bytes>, RankError> {
        self.execute(vec![Bytes::from_static(b"HGET"), key_arg(key), key_arg(field)])
            .await?
            .into_optional_bulk()
    }

    async fn hash_remove(&self, key: &str, field: &str) -> Result<u64, RankError> {
        let removed = self
            .integer(vec![Bytes::from_static(b"HDEL"), key_arg(key), key_arg(field)])
            .await?;
        Ok(non_negative(removed))
    }
}
