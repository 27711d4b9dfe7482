//! Stream adapter that frames an in-flight byte stream as `aws-chunked`,
//! signing each chunk as it's produced.
//!
//! Grounded on minio-rs's `AwsChunkedEncoder` poll_next state machine
//! (`examples/other_examples/836a5e23_minio-minio-rs__src-s3-aws_chunked.rs.rs`)
//! for the encoder's state shape, with the actual wire framing produced by
//! `signer::ChunkedSigningData` to match what `src/api/aws_chunked.rs`'s
//! decoder expects on the other end.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::Stream;

use crate::error::TransportError;
use crate::signer::{ChunkedSigningData, CHUNK_SIZE};

enum State {
    Streaming,
    Final,
    Done,
}

/// Wraps a source byte stream, re-chunking it into `CHUNK_SIZE` pieces and
/// signing each one, followed by the terminal zero-length chunk.
pub struct ChunkStream<S> {
    source: S,
    buffer: BytesMut,
    signing_data: ChunkedSigningData,
    state: State,
}

impl<S> ChunkStream<S> {
    pub fn new(source: S, signing_data: ChunkedSigningData) -> Self {
        Self {
            source,
            buffer: BytesMut::new(),
            signing_data,
            state: State::Streaming,
        }
    }

    /// The wire size this stream will produce for a body of `body_length`
    /// bytes, for callers that must set a `Content-Length` header up front.
    pub fn encoded_length(body_length: u64) -> u64 {
        ChunkedSigningData::encoded_content_length(body_length)
    }
}

fn frame(signing_data: &mut ChunkedSigningData, chunk: &[u8]) -> Result<Bytes, TransportError> {
    signing_data
        .frame_chunk(chunk)
        .map(Bytes::from)
        .map_err(|e| TransportError::new(e.to_string()))
}

impl<S> Stream for ChunkStream<S>
where
    S: Stream<Item = Result<Bytes, TransportError>> + Unpin,
{
    type Item = Result<Bytes, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.state {
                State::Done => return Poll::Ready(None),
                State::Streaming if this.buffer.len() >= CHUNK_SIZE => {
                    let chunk = this.buffer.split_to(CHUNK_SIZE).freeze();
                    return Poll::Ready(Some(frame(&mut this.signing_data, &chunk)));
                }
                State::Streaming => match Pin::new(&mut this.source).poll_next(cx) {
                    Poll::Ready(Some(Ok(bytes))) => {
                        this.buffer.extend_from_slice(&bytes);
                    }
                    Poll::Ready(Some(Err(e))) => {
                        this.state = State::Done;
                        return Poll::Ready(Some(Err(e)));
                    }
                    Poll::Ready(None) => {
                        this.state = State::Final;
                    }
                    Poll::Pending => return Poll::Pending,
                },
                State::Final if !this.buffer.is_empty() => {
                    let chunk = this.buffer.split().freeze();
                    return Poll::Ready(Some(frame(&mut this.signing_data, &chunk)));
                }
                State::Final => {
                    this.state = State::Done;
                    return Poll::Ready(Some(
                        this.signing_data
                            .frame_final_chunk()
                            .map(Bytes::from)
                            .map_err(|e| TransportError::new(e.to_string())),
                    ));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credential;
    use futures::stream::{self, StreamExt};

    fn signing_data() -> ChunkedSigningData {
        ChunkedSigningData {
            previous_signature: "0".repeat(64),
            datetime: "20150830T123600Z".to_string(),
            scope: "20150830/us-east-1/s3/aws4_request".to_string(),
            signing_key: vec![0u8; 32],
            credential: Credential::new("AKIDEXAMPLE", "secret", None),
            algorithm_name: "AWS4-HMAC-SHA256",
        }
    }

    #[tokio::test]
    async fn empty_source_produces_only_the_terminal_chunk() {
        let source = stream::iter(Vec::<Result<Bytes, TransportError>>::new());
        let chunked = ChunkStream::new(source, signing_data());
        let frames: Vec<_> = chunked.collect().await;
        assert_eq!(frames.len(), 1);
        let frame = frames[0].as_ref().unwrap();
        assert!(frame.starts_with(b"0;chunk-signature="));
    }

    #[tokio::test]
    async fn source_smaller_than_chunk_size_yields_one_data_chunk_then_terminal() {
        let source = stream::iter(vec![Ok::<_, TransportError>(Bytes::from_static(b"hello"))]);
        let chunked = ChunkStream::new(source, signing_data());
        let frames: Vec<_> = chunked.collect().await;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].as_ref().unwrap().starts_with(b"5;chunk-signature="));
        assert!(frames[1].as_ref().unwrap().starts_with(b"0;chunk-signature="));
    }

    #[tokio::test]
    async fn source_spanning_multiple_polls_accumulates_into_one_chunk() {
        let source = stream::iter(vec![
            Ok::<_, TransportError>(Bytes::from_static(b"ab")),
            Ok(Bytes::from_static(b"cd")),
        ]);
        let chunked = ChunkStream::new(source, signing_data());
        let frames: Vec<_> = chunked.collect().await;
        assert_eq!(frames.len(), 2);
        assert!(frames[0].as_ref().unwrap().starts_with(b"4;chunk-signature="));
    }

    #[tokio::test]
    async fn source_error_is_propagated_and_ends_the_stream() {
        let source = stream::iter(vec![Err(TransportError::new("broken pipe"))]);
        let chunked = ChunkStream::new(source, signing_data());
        let frames: Vec<_> = chunked.collect().await;
        assert_eq!(frames.len(), 1);
        assert!(frames[0].is_err());
    }
}
