//! Adapts an arbitrary byte stream into a signed `aws-chunked` wire stream.

mod chunk_stream;

pub use chunk_stream::ChunkStream;
