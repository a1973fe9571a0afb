//! Request body payloads.
//!
//! The body kind is fixed when the configuration is built. Text and byte
//! payloads are replayable: every retry resends the same bytes from the
//! start. A [`OneShotBody`] wraps a reader that can be drained once; it is
//! only accepted when the retry policy makes a single attempt.

use std::fmt;
use std::io::Read;
use std::sync::{Arc, Mutex, PoisonError};

use bytes::{Buf, Bytes};
use serde::{Deserialize, Serialize};

use crate::Result;

// ============================================================================
// Replayable Body
// ============================================================================

/// An owned buffer plus a read cursor that can be rewound.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct ReplayableBody {
    data: Bytes,
    #[serde(skip)]
    cursor: usize,
}

impl ReplayableBody {
    /// Wraps a buffer, cursor at the start.
    #[must_use]
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            cursor: 0,
        }
    }

    /// Moves the cursor back to the start.
    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    /// The whole payload, independent of the cursor.
    #[must_use]
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Total payload length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` for a zero-length payload.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Buf for ReplayableBody {
    fn remaining(&self) -> usize {
        self.data.len() - self.cursor
    }

    fn chunk(&self) -> &[u8] {
        self.data.get(self.cursor..).unwrap_or_default()
    }

    fn advance(&mut self, cnt: usize) {
        assert!(
            cnt <= self.remaining(),
            "cannot advance past the end of the body"
        );
        self.cursor += cnt;
    }
}

impl PartialEq for ReplayableBody {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl fmt::Debug for ReplayableBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplayableBody")
            .field("len", &self.data.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}

// ============================================================================
// One-Shot Body
// ============================================================================

type BoxedReader = Box<dyn Read + Send>;

/// A reader that can be drained exactly once.
///
/// Clones share the same reader: whichever clone is sent first consumes it.
#[derive(Clone)]
pub struct OneShotBody {
    reader: Arc<Mutex<Option<BoxedReader>>>,
}

impl OneShotBody {
    /// Wraps a reader.
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            reader: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    /// Returns `true` once the reader has been taken.
    #[must_use]
    pub fn is_consumed(&self) -> bool {
        self.reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }

    /// Drain the reader into memory, failing if it yields more than `limit` bytes.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::Io`] if reading fails
    /// - [`crate::ValidationError::BodyTooLarge`] if `limit` is exceeded
    /// - [`crate::ValidationError::BodyConsumed`] on every call after the first
    pub fn read_to_bytes(&self, limit: usize) -> Result<Bytes> {
        let reader = self
            .reader
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(crate::ValidationError::BodyConsumed)?;

        let mut data = Vec::new();
        let read = reader
            .take(u64::try_from(limit).unwrap_or(u64::MAX).saturating_add(1))
            .read_to_end(&mut data)?;
        if read > limit {
            return Err(crate::ValidationError::BodyTooLarge { size: read, max: limit }.into());
        }
        Ok(Bytes::from(data))
    }
}

impl PartialEq for OneShotBody {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.reader, &other.reader)
    }
}

impl fmt::Debug for OneShotBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneShotBody")
            .field("consumed", &self.is_consumed())
            .finish()
    }
}

// ============================================================================
// Body
// ============================================================================

/// A request body.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum Body {
    /// No body.
    #[default]
    Empty,
    /// UTF-8 text (curl's `-d` family).
    Text(String),
    /// Raw bytes.
    Bytes(ReplayableBody),
    /// A reader drained at send time; cannot be retried.
    #[serde(skip)]
    Stream(OneShotBody),
}

impl Body {
    /// Returns `true` for [`Body::Empty`].
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }

    /// Returns `true` for [`Body::Stream`].
    #[must_use]
    pub const fn is_stream(&self) -> bool {
        matches!(self, Self::Stream(_))
    }

    /// Returns `true` if the body can be sent more than once.
    #[must_use]
    pub const fn is_rewindable(&self) -> bool {
        !self.is_stream()
    }

    /// Payload length; `None` for a stream.
    #[must_use]
    pub fn len(&self) -> Option<usize> {
        match self {
            Self::Empty => Some(0),
            Self::Text(text) => Some(text.len()),
            Self::Bytes(bytes) => Some(bytes.len()),
            Self::Stream(_) => None,
        }
    }

    /// Append `data`, joining with `separator` when the body is not empty.
    ///
    /// Text stays text while the appended data is valid UTF-8 and becomes
    /// bytes otherwise. A stream is replaced.
    pub fn append(&mut self, data: &[u8], separator: &str) {
        match self {
            Self::Text(text) => match std::str::from_utf8(data) {
                Ok(data) => {
                    text.push_str(separator);
                    text.push_str(data);
                }
                Err(_) => {
                    let mut joined = std::mem::take(text).into_bytes();
                    joined.extend_from_slice(separator.as_bytes());
                    joined.extend_from_slice(data);
                    *self = Self::Bytes(ReplayableBody::new(joined));
                }
            },
            Self::Bytes(bytes) => {
                let mut joined = bytes.bytes().to_vec();
                joined.extend_from_slice(separator.as_bytes());
                joined.extend_from_slice(data);
                *bytes = ReplayableBody::new(joined);
            }
            Self::Empty | Self::Stream(_) => {
                *self = match String::from_utf8(data.to_vec()) {
                    Ok(text) => Self::Text(text),
                    Err(err) => Self::Bytes(ReplayableBody::new(err.into_bytes())),
                };
            }
        }
    }

    /// The replayable payload, rewound to the start. `None` for a stream.
    #[must_use]
    pub fn replay(&self) -> Option<ReplayableBody> {
        match self {
            Self::Empty => Some(ReplayableBody::default()),
            Self::Text(text) => Some(ReplayableBody::new(text.clone())),
            Self::Bytes(bytes) => {
                let mut bytes = bytes.clone();
                bytes.rewind();
                Some(bytes)
            }
            Self::Stream(_) => None,
        }
    }

    /// Materialize the payload, draining a stream if necessary.
    ///
    /// # Errors
    ///
    /// Propagates [`OneShotBody::read_to_bytes`] failures.
    pub fn to_bytes(&self, limit: usize) -> Result<Bytes> {
        match self {
            Self::Empty => Ok(Bytes::new()),
            Self::Text(text) => Ok(Bytes::from(text.clone())),
            Self::Bytes(bytes) => Ok(bytes.bytes().clone()),
            Self::Stream(stream) => stream.read_to_bytes(limit),
        }
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self::Bytes(ReplayableBody::new(bytes))
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(ReplayableBody::new(bytes))
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn replayable_body_rewinds() {
        let mut body = ReplayableBody::new("hello");
        let first = body.copy_to_bytes(3);
        assert_eq!(first.as_ref(), b"hel");
        assert_eq!(body.remaining(), 2);

        body.rewind();
        assert_eq!(body.remaining(), 5);
        assert_eq!(body.copy_to_bytes(5).as_ref(), b"hello");
    }

    #[test]
    fn replay_always_starts_at_zero() {
        let mut inner = ReplayableBody::new("abc");
        inner.advance(2);
        let body = Body::Bytes(inner);

        for _ in 0..3 {
            let payload = body.replay().expect("replayable");
            assert_eq!(payload.remaining(), 3);
        }
    }

    #[test]
    fn append_joins_with_separator() {
        let mut body = Body::Empty;
        body.append(b"a=1", "&");
        body.append(b"b=2", "&");
        assert_eq!(body, Body::Text("a=1&b=2".to_string()));

        let mut body = Body::from(b"x".to_vec());
        body.append(b"y", "&");
        assert_eq!(body.to_bytes(16).expect("bytes").as_ref(), b"x&y");
    }

    #[test]
    fn append_binary_switches_to_bytes() {
        let mut body = Body::from("a");
        body.append(&[0xff, 0x00], "&");
        assert_eq!(body.to_bytes(16).expect("bytes").as_ref(), b"a&\xff\x00");
        assert!(matches!(body, Body::Bytes(_)));
    }

    #[test]
    fn stream_is_drained_once() {
        let body = Body::Stream(OneShotBody::new(Cursor::new(b"payload".to_vec())));
        assert!(!body.is_rewindable());
        assert!(body.replay().is_none());

        let bytes = body.to_bytes(1024).expect("first read");
        assert_eq!(bytes.as_ref(), b"payload");

        let err = body.to_bytes(1024).expect_err("second read");
        assert!(matches!(
            err.as_validation(),
            Some(crate::ValidationError::BodyConsumed)
        ));
    }

    #[test]
    fn stream_respects_limit() {
        let stream = OneShotBody::new(Cursor::new(vec![0_u8; 10]));
        let err = stream.read_to_bytes(4).expect_err("too large");
        assert!(matches!(
            err.as_validation(),
            Some(crate::ValidationError::BodyTooLarge { max: 4, .. })
        ));
    }

    #[test]
    fn stream_clones_share_the_reader() {
        let stream = OneShotBody::new(Cursor::new(b"x".to_vec()));
        let clone = stream.clone();
        assert_eq!(stream, clone);
        stream.read_to_bytes(8).expect("read");
        assert!(clone.is_consumed());
    }

    #[test]
    fn serde_skips_cursor() {
        let mut inner = ReplayableBody::new("abc");
        inner.advance(1);
        let json = serde_json::to_string(&Body::Bytes(inner.clone())).expect("serialize");
        let back: Body = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, Body::Bytes(inner));
    }
}
