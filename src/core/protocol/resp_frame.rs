// src/core/protocol/resp_frame.rs

//! RESP2 frames and the `tokio_util` codec `RespStore` speaks over TCP.

use crate::core::RankError;
use bytes::{Buf, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

const CRLF: &[u8] = b"\r\n";
const CRLF_LEN: usize = 2;

// Limits applied to replies, so a misbehaving server cannot make the client
// allocate without bound.
const MAX_FRAME_ELEMENTS: usize = 1_024 * 1_024;
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;
const MAX_RECURSION_DEPTH: usize = 32;

/// A single RESP2 value.
#[derive(Debug, Clone, PartialEq)]
pub enum RespFrame {
    SimpleString(String),
    Error(String),
    Integer(i64),
    BulkString(Bytes),
    Null,
    NullArray,
    Array(Vec<RespFrame>),
}

impl RespFrame {
    /// Builds a command as an array of bulk strings, the form servers accept.
    pub fn command<I, A>(args: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Bytes>,
    {
        RespFrame::Array(
            args.into_iter()
                .map(|a| RespFrame::BulkString(a.into()))
                .collect(),
        )
    }

    /// Reads an integer reply.
    pub fn into_integer(self) -> Result<i64, RankError> {
        match self {
            RespFrame::Integer(i) => Ok(i),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Reads a bulk string reply, mapping the null bulk string to `None`.
    pub fn into_optional_bulk(self) -> Result<Option<Bytes>, RankError> {
        match self {
            RespFrame::BulkString(b) => Ok(Some(b)),
            RespFrame::Null => Ok(None),
            other => Err(unexpected("bulk string", &other)),
        }
    }

    /// Reads an integer reply that may be null (e.g. `ZRANK` on a missing
    /// member).
    pub fn into_optional_integer(self) -> Result<Option<i64>, RankError> {
        match self {
            RespFrame::Integer(i) => Ok(Some(i)),
            RespFrame::Null => Ok(None),
            other => Err(unexpected("integer", &other)),
        }
    }

    /// Reads an array reply. A null array is an empty one.
    pub fn into_array(self) -> Result<Vec<RespFrame>, RankError> {
        match self {
            RespFrame::Array(items) => Ok(items),
            RespFrame::NullArray => Ok(vec![]),
            other => Err(unexpected("array", &other)),
        }
    }

    /// Reads an `OK`-style status reply.
    pub fn expect_status(self, status: &str) -> Result<(), RankError> {
        match self {
            RespFrame::SimpleString(s) if s == status => Ok(()),
            other => Err(unexpected(status, &other)),
        }
    }

    /// Encodes this frame into a fresh byte vector.
    pub fn encode_to_vec(&self) -> Result<Vec<u8>, RankError> {
        let mut buf = BytesMut::new();
        RespFrameCodec.encode(self.clone(), &mut buf)?;
        Ok(buf.to_vec())
    }
}

fn unexpected(expected: &str, got: &RespFrame) -> RankError {
    RankError::UnexpectedReply(format!("expected {expected}, got {got:?}"))
}

/// Encodes and decodes `RespFrame`s on a byte stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct RespFrameCodec;

impl Encoder<RespFrame> for RespFrameCodec {
    type Error = RankError;

    fn encode(&mut self, item: RespFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let mut itoa_buf = itoa::Buffer::new();
        match item {
            RespFrame::SimpleString(s) => {
                dst.extend_from_slice(b"+");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Error(s) => {
                dst.extend_from_slice(b"-");
                dst.extend_from_slice(s.as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Integer(i) => {
                dst.extend_from_slice(b":");
                dst.extend_from_slice(itoa_buf.format(i).as_bytes());
                dst.extend_from_slice(CRLF);
            }
            RespFrame::BulkString(b) => {
                dst.extend_from_slice(b"$");
                dst.extend_from_slice(itoa_buf.format(b.len()).as_bytes());
                dst.extend_from_slice(CRLF);
                dst.extend_from_slice(&b);
                dst.extend_from_slice(CRLF);
            }
            RespFrame::Null => dst.extend_from_slice(b"$-1\r\n"),
            RespFrame::NullArray => dst.extend_from_slice(b"*-1\r\n"),
            RespFrame::Array(items) => {
                dst.extend_from_slice(b"*");
                dst.extend_from_slice(itoa_buf.format(items.len()).as_bytes());
                dst.extend_from_slice(CRLF);
                for frame in items {
                    self.encode(frame, dst)?;
                }
            }
        }
        Ok(())
    }
}

impl Decoder for RespFrameCodec {
    type Item = RespFrame;
    type Error = RankError;

    /// Decodes one complete frame, or returns `Ok(None)` until enough bytes
    /// have arrived. Nothing is consumed from `src` for a partial frame.
    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        let mut rest = &src[..];
        match parse_frame(&mut rest, 0) {
            Ok(frame) => {
                let consumed = src.len() - rest.len();
                src.advance(consumed);
                Ok(Some(frame))
            }
            Err(RankError::IncompleteData) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

fn parse_frame(bytes: &mut &[u8], depth: usize) -> Result<RespFrame, RankError> {
    if depth > MAX_RECURSION_DEPTH {
        return Err(RankError::Protocol("reply nesting too deep".into()));
    }
    let Some((&prefix, _)) = bytes.split_first() else {
        return Err(RankError::IncompleteData);
    };
    *bytes = &bytes[1..];
    match prefix {
        b'+' => Ok(RespFrame::SimpleString(read_text_line(bytes)?)),
        b'-' => Ok(RespFrame::Error(read_text_line(bytes)?)),
        b':' => Ok(RespFrame::Integer(read_length(bytes)?)),
        b'$' => parse_bulk_string(bytes),
        b'*' => parse_array(bytes, depth),
        _ => Err(RankError::SyntaxError),
    }
}

fn parse_bulk_string(bytes: &mut &[u8]) -> Result<RespFrame, RankError> {
    let len = read_length(bytes)?;
    if len == -1 {
        return Ok(RespFrame::Null);
    }
    let len = usize::try_from(len).map_err(|_| RankError::SyntaxError)?;
    if len > MAX_BULK_STRING_SIZE {
        return Err(RankError::Protocol(format!("bulk string of {len} bytes")));
    }
    if bytes.len() < len + CRLF_LEN {
        return Err(RankError::IncompleteData);
    }
    if &bytes[len..len + CRLF_LEN] != CRLF {
        return Err(RankError::SyntaxError);
    }
    let data = Bytes::copy_from_slice(&bytes[..len]);
    *bytes = &bytes[len + CRLF_LEN..];
    Ok(RespFrame::BulkString(data))
}

fn parse_array(bytes: &mut &[u8], depth: usize) -> Result<RespFrame, RankError> {
    let len = read_length(bytes)?;
    if len == -1 {
        return Ok(RespFrame::NullArray);
    }
    let len = usize::try_from(len).map_err(|_| RankError::SyntaxError)?;
    if len > MAX_FRAME_ELEMENTS {
        return Err(RankError::Protocol(format!("array of {len} elements")));
    }
    let mut items = Vec::with_capacity(len.min(1024));
    for _ in 0..len {
        items.push(parse_frame(bytes, depth + 1)?);
    }
    Ok(RespFrame::Array(items))
}

/// Splits off the next CRLF-terminated line.
fn read_line<'a>(bytes: &mut &'a [u8]) -> Result<&'a [u8], RankError> {
    let pos = bytes
        .windows(CRLF_LEN)
        .position(|w| w == CRLF)
        .ok_or(RankError::IncompleteData)?;
    let line = &bytes[..pos];
    *bytes = &bytes[pos + CRLF_LEN..];
    Ok(line)
}

fn read_text_line(bytes: &mut &[u8]) -> Result<String, RankError> {
    Ok(String::from_utf8_lossy(read_line(bytes)?).into_owned())
}

fn read_length(bytes: &mut &[u8]) -> Result<i64, RankError> {
    let line = read_line(bytes)?;
    std::str::from_utf8(line)
        .ok()
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or(RankError::SyntaxError)
}
