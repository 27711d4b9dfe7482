//! SigV4 / SigV4a request signing.

pub mod canonical;
mod chunked;
mod sigv4;
mod sigv4a;

pub use chunked::{ChunkedSigningData, CHUNK_SIZE};
pub use sigv4::{BodyDescriptor, Signer};

use thiserror::Error;

/// Signing is total over well-formed inputs: the only ways it can fail are
/// a malformed URL or, for SigV4a, the astronomically unlikely exhaustion
/// of the deterministic keypair-derivation counter.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SigningError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("failed to derive a SigV4a signing keypair after exhausting the counter range")]
    KeypairDerivationFailed,
}

/// Which signing algorithm a `Signer` uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    SigV4,
    SigV4a,
}

impl Algorithm {
    pub fn name(&self) -> &'static str {
        match self {
            Algorithm::SigV4 => "AWS4-HMAC-SHA256",
            Algorithm::SigV4a => "AWS4-ECDSA-P256-SHA256",
        }
    }
}
