// src/core/mod.rs

//! The central module containing the ranking engine and its building blocks.

pub mod encoder;
pub mod errors;
pub mod leaderboard;
pub mod ordering;
pub mod protocol;
pub mod storage;

pub use encoder::{EncoderKind, FirstInIsBigger, LastInIsBigger, ScoreEncoder};
pub use errors::RankError;
pub use leaderboard::{Leaderboard, LeaderboardBuilder, RankEntry, RankItem};
pub use ordering::Ordering;
pub use storage::{MemoryStore, RespStore, SortedSetStore};
