//! The `Body` value: either a complete in-memory buffer or
//! a lazy, finite, non-restartable sequence of byte buffers with an
//! optional known length.

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use std::fmt;

use crate::error::TransportError;

type ByteResult = Result<Bytes, TransportError>;

/// A streaming body's source: boxed so `Body` itself stays a plain enum the
/// rest of the core can pass around without generics leaking everywhere.
pub struct ByteStream {
    inner: BoxStream<'static, ByteResult>,
    length: Option<u64>,
}

impl fmt::Debug for ByteStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ByteStream").field("length", &self.length).finish()
    }
}

impl ByteStream {
    pub fn new(stream: BoxStream<'static, ByteResult>, length: Option<u64>) -> Self {
        Self { inner: stream, length }
    }

    pub fn length(&self) -> Option<u64> {
        self.length
    }

    /// Pull the next buffer from the source, single-pass.
    pub async fn next(&mut self) -> Option<ByteResult> {
        self.inner.next().await
    }
}

/// Either a complete byte buffer or a streaming source.
///
/// Invariant: for `Bytes`, `length()` equals the buffer's length exactly.
/// For `Streaming`, `length()` is whatever the caller declared (and must
/// equal the total the stream actually yields) or `None` when unknown up
/// front.
#[derive(Debug)]
pub enum Body {
    Bytes(Bytes),
    Streaming(ByteStream),
}

impl Body {
    pub fn empty() -> Self {
        Body::Bytes(Bytes::new())
    }

    pub fn from_bytes(bytes: impl Into<Bytes>) -> Self {
        Body::Bytes(bytes.into())
    }

    pub fn streaming(stream: BoxStream<'static, ByteResult>, length: Option<u64>) -> Self {
        Body::Streaming(ByteStream::new(stream, length))
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self, Body::Streaming(_))
    }

    pub fn is_empty_buffer(&self) -> bool {
        matches!(self, Body::Bytes(b) if b.is_empty())
    }

    /// Length, when known.
    pub fn length(&self) -> Option<u64> {
        match self {
            Body::Bytes(b) => Some(b.len() as u64),
            Body::Streaming(s) => s.length(),
        }
    }

    /// Fully-buffered bytes, if this body is already in memory. A streaming
    /// body returns `None` rather than being silently drained; the signer
    /// uses this to decide between `sha256(bytes)` and `UNSIGNED-PAYLOAD`.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Body::Bytes(b) => Some(b),
            Body::Streaming(_) => None,
        }
    }

    /// Consume this body into a single buffer, draining a streaming body to
    /// completion. Response decoding needs the whole payload in hand; the
    /// signer's `as_bytes` above is the one place a partial view is correct.
    pub async fn collect(self) -> Result<Bytes, TransportError> {
        match self {
            Body::Bytes(b) => Ok(b),
            Body::Streaming(mut stream) => {
                let mut buffer = Vec::with_capacity(stream.length().unwrap_or(0) as usize);
                while let Some(chunk) = stream.next().await {
                    buffer.extend_from_slice(&chunk?);
                }
                Ok(Bytes::from(buffer))
            }
        }
    }

    /// Adapt this body into a boxed byte stream: a `Bytes` variant becomes a
    /// one-shot stream yielding its single buffer. The chunked-upload
    /// transport wrapper needs a uniform `Stream` to re-chunk regardless of
    /// how the body arrived.
    pub fn into_stream(self) -> BoxStream<'static, ByteResult> {
        match self {
            Body::Bytes(b) => futures::stream::once(async move { Ok(b) }).boxed(),
            Body::Streaming(s) => s.inner,
        }
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::Bytes(b)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::Bytes(Bytes::from(v))
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::Bytes(Bytes::from(s.into_bytes()))
    }
}
