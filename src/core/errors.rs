// src/core/errors.rs

//! Defines the error type shared by the encoder, the store backends and the
//! leaderboard engine.

use std::num::{ParseFloatError, ParseIntError};
use std::sync::Arc;
use thiserror::Error;

/// Every failure a leaderboard operation can surface.
///
/// Absence (a missing member, an empty range, a key that does not exist) is
/// never represented here: read operations return a zero value instead.
#[derive(Error, Debug)]
pub enum RankError {
    // --- Configuration errors ---
    #[error("leaderboard base key cannot be empty")]
    EmptyKey,

    #[error("invalid ordering \"{0}\", expected \"asc\" or \"desc\"")]
    InvalidOrdering(String),

    #[error("no backing store configured for leaderboard")]
    MissingStore,

    // --- Domain errors ---
    #[error("invalid ranking: {0}")]
    InvalidRanking(i64),

    #[error("invalid range: start({start}) > end({end})")]
    InvalidRange { start: i64, end: i64 },

    #[error("score {0} does not fit in the encoder's 32-bit primary field")]
    ScoreOverflow(i64),

    #[error("factor {0} does not fit in the encoder's 32-bit tie-break field")]
    FactorOverflow(i64),

    #[error("payload serialization error: {0}")]
    Serialization(String),

    // --- Store and transport errors ---
    #[error("IO Error: {0}")]
    Io(Arc<std::io::Error>),

    #[error("Incomplete data in stream")]
    IncompleteData,

    #[error("Syntax error")]
    SyntaxError,

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("timed out waiting for the backing store")]
    Timeout,

    #[error("connection closed by the backing store")]
    ConnectionClosed,

    #[error("WRONGTYPE Operation against a key holding the wrong kind of value")]
    WrongType,

    #[error("backing store error: {0}")]
    Store(String),

    #[error("unexpected reply from backing store: {0}")]
    UnexpectedReply(String),
}

impl RankError {
    /// True for failures of the backing store or its transport, as opposed to
    /// caller mistakes.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RankError::Io(_) | RankError::Timeout | RankError::ConnectionClosed
        )
    }
}

// `std::io::Error` is not cloneable, so it lives behind an Arc.
impl Clone for RankError {
    fn clone(&self) -> Self {
        match self {
            RankError::EmptyKey => RankError::EmptyKey,
            RankError::InvalidOrdering(s) => RankError::InvalidOrdering(s.clone()),
            RankError::MissingStore => RankError::MissingStore,
            RankError::InvalidRanking(r) => RankError::InvalidRanking(*r),
            RankError::InvalidRange { start, end } => RankError::InvalidRange {
                start: *start,
                end: *end,
            },
            RankError::ScoreOverflow(v) => RankError::ScoreOverflow(*v),
            RankError::FactorOverflow(v) => RankError::FactorOverflow(*v),
            RankError::Serialization(s) => RankError::Serialization(s.clone()),
            RankError::Io(e) => RankError::Io(Arc::clone(e)),
            RankError::IncompleteData => RankError::IncompleteData,
            RankError::SyntaxError => RankError::SyntaxError,
            RankError::Protocol(s) => RankError::Protocol(s.clone()),
            RankError::Timeout => RankError::Timeout,
            RankError::ConnectionClosed => RankError::ConnectionClosed,
            RankError::WrongType => RankError::WrongType,
            RankError::Store(s) => RankError::Store(s.clone()),
            RankError::UnexpectedReply(s) => RankError::UnexpectedReply(s.clone()),
        }
    }
}

impl PartialEq for RankError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (RankError::Io(e1), RankError::Io(e2)) => e1.to_string() == e2.to_string(),
            (RankError::InvalidOrdering(s1), RankError::InvalidOrdering(s2)) => s1 == s2,
            (RankError::InvalidRanking(r1), RankError::InvalidRanking(r2)) => r1 == r2,
            (
                RankError::InvalidRange { start: s1, end: e1 },
                RankError::InvalidRange { start: s2, end: e2 },
            ) => s1 == s2 && e1 == e2,
            (RankError::ScoreOverflow(v1), RankError::ScoreOverflow(v2)) => v1 == v2,
            (RankError::FactorOverflow(v1), RankError::FactorOverflow(v2)) => v1 == v2,
            (RankError::Serialization(s1), RankError::Serialization(s2)) => s1 == s2,
            (RankError::Protocol(s1), RankError::Protocol(s2)) => s1 == s2,
            (RankError::Store(s1), RankError::Store(s2)) => s1 == s2,
            (RankError::UnexpectedReply(s1), RankError::UnexpectedReply(s2)) => s1 == s2,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

// --- From trait implementations for easy error conversion ---

impl From<std::io::Error> for RankError {
    fn from(e: std::io::Error) -> Self {
        RankError::Io(Arc::new(e))
    }
}

impl From<tokio::time::error::Elapsed> for RankError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        RankError::Timeout
    }
}

impl From<ParseIntError> for RankError {
    fn from(e: ParseIntError) -> Self {
        RankError::UnexpectedReply(format!("not an integer: {e}"))
    }
}

impl From<ParseFloatError> for RankError {
    fn from(e: ParseFloatError) -> Self {
        RankError::UnexpectedReply(format!("not a valid float: {e}"))
    }
}

impl From<serde_json::Error> for RankError {
    fn from(e: serde_json::Error) -> Self {
        RankError::Serialization(e.to_string())
    }
}
