//! Protocol-polymorphic request encoding and response decoding. A `Protocol`
//! is matched directly rather than dispatched through trait objects: one
//! concrete enum rather than a per-protocol trait.

mod checksum;
mod decode;
mod encode;
mod json;
mod query;
pub mod xml;

pub use checksum::ChecksumAlgorithm;
pub use decode::{DecodeError, ResponseDecoder};
pub use encode::RequestEncoder;
