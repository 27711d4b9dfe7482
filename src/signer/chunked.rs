//! Rolling chunk-signing context for `aws-chunked` streaming uploads.
//!
//! Grounded on `src/api/aws_chunked.rs`'s decoder: this mirrors its wire
//! framing in reverse, producing the rolling chunk signatures the decoder
//! there verifies.

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::credentials::Credential;

use super::canonical::sha256_hex;
use super::SigningError;

type HmacSha256 = Hmac<Sha256>;

/// Chunk size for `aws-chunked` bodies.
pub const CHUNK_SIZE: usize = 64 * 1024;

/// Hex length of a SigV4 HMAC-SHA256 chunk signature.
const SIGV4_SIGNATURE_HEX_LEN: u64 = 64;

/// The rolling state threaded from one chunk's signature to the next.
/// Produced by `Signer::start_signing_chunks`.
pub struct ChunkedSigningData {
    pub(crate) previous_signature: String,
    pub(crate) datetime: String,
    pub(crate) scope: String,
    /// SigV4's derived HMAC key. Empty for SigV4a, which re-derives its
    /// ECDSA keypair per chunk from `credential` instead.
    pub(crate) signing_key: Vec<u8>,
    pub(crate) credential: Credential,
    pub(crate) algorithm_name: &'static str,
}

impl ChunkedSigningData {
    /// Sign one chunk's data, threading the result forward as the
    /// `previous_signature` for the next chunk.
    pub fn sign_chunk(&mut self, chunk_data: &[u8]) -> Result<String, SigningError> {
        let string_to_sign = format!(
            "{}-PAYLOAD\n{}\n{}\n{}\n{}\n{}",
            self.algorithm_name,
            self.datetime,
            self.scope,
            self.previous_signature,
            sha256_hex(b""),
            sha256_hex(chunk_data),
        );

        let signature = if self.signing_key.is_empty() {
            super::sigv4a::sign(&self.credential, &string_to_sign)?
        } else {
            let mut mac = HmacSha256::new_from_slice(&self.signing_key)
                .expect("HMAC accepts a key of any length");
            mac.update(string_to_sign.as_bytes());
            hex::encode(mac.finalize().into_bytes())
        };

        self.previous_signature = signature.clone();
        Ok(signature)
    }

    /// Frame one `aws-chunked` chunk on the wire: `<size-hex>;chunk-signature=<sig>\r\n<data>\r\n`.
    pub fn frame_chunk(&mut self, chunk_data: &[u8]) -> Result<Vec<u8>, SigningError> {
        let signature = self.sign_chunk(chunk_data)?;
        let mut framed = Vec::with_capacity(chunk_data.len() + 128);
        framed.extend_from_slice(format!("{:x};chunk-signature={signature}\r\n", chunk_data.len()).as_bytes());
        framed.extend_from_slice(chunk_data);
        framed.extend_from_slice(b"\r\n");
        Ok(framed)
    }

    /// The terminal zero-length chunk that closes the stream.
    pub fn frame_final_chunk(&mut self) -> Result<Vec<u8>, SigningError> {
        self.frame_chunk(&[])
    }

    /// The total wire size of `body_length` bytes of payload framed as
    /// SigV4-signed `aws-chunked` chunks, including the terminal chunk
    ///. Only exact for SigV4: SigV4a's
    /// DER-encoded signatures vary in length chunk to chunk.
    pub fn encoded_content_length(body_length: u64) -> u64 {
        let full_chunks = body_length / CHUNK_SIZE as u64;
        let remainder = body_length % CHUNK_SIZE as u64;

        let mut total = full_chunks * chunk_wire_size(CHUNK_SIZE as u64);
        if remainder > 0 {
            total += chunk_wire_size(remainder);
        }
        total += chunk_wire_size(0);
        total
    }
}

fn chunk_wire_size(data_len: u64) -> u64 {
    let size_hex_len = format!("{data_len:x}").len() as u64;
    let prefix_len = ";chunk-signature=".len() as u64;
    size_hex_len + prefix_len + SIGV4_SIGNATURE_HEX_LEN + 2 + data_len + 2
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_data() -> ChunkedSigningData {
        ChunkedSigningData {
            previous_signature: "0".repeat(64),
            datetime: "20150830T123600Z".to_string(),
            scope: "20150830/us-east-1/s3/aws4_request".to_string(),
            signing_key: vec![0u8; 32],
            credential: Credential::new("AKIDEXAMPLE", "secret", None),
            algorithm_name: "AWS4-HMAC-SHA256",
        }
    }

    #[test]
    fn sign_chunk_updates_previous_signature() {
        let mut data = test_data();
        let first_prev = data.previous_signature.clone();
        let sig1 = data.sign_chunk(b"hello world").unwrap();
        assert_eq!(data.previous_signature, sig1);
        assert_ne!(sig1, first_prev);
        assert_eq!(sig1.len(), 64);

        let sig2 = data.sign_chunk(b"more data").unwrap();
        assert_ne!(sig1, sig2, "chunk chaining must change the signature");
    }

    #[test]
    fn frame_chunk_has_expected_wire_shape() {
        let mut data = test_data();
        let framed = data.frame_chunk(b"abc").unwrap();
        let framed_str = String::from_utf8(framed.clone()).unwrap();
        assert!(framed_str.starts_with("3;chunk-signature="));
        assert!(framed_str.ends_with("abc\r\n"));
        assert!(framed.ends_with(b"\r\n"));
    }

    #[test]
    fn final_chunk_has_zero_size() {
        let mut data = test_data();
        let framed = data.frame_final_chunk().unwrap();
        let framed_str = String::from_utf8(framed).unwrap();
        assert!(framed_str.starts_with("0;chunk-signature="));
    }

    #[test]
    fn encoded_content_length_accounts_for_overhead_and_terminal_chunk() {
        let zero_chunk_len = chunk_wire_size(0);
        assert_eq!(ChunkedSigningData::encoded_content_length(0), zero_chunk_len);

        let one_byte = ChunkedSigningData::encoded_content_length(1);
        assert_eq!(one_byte, chunk_wire_size(1) + zero_chunk_len);

        let exactly_one_chunk = ChunkedSigningData::encoded_content_length(CHUNK_SIZE as u64);
        assert_eq!(exactly_one_chunk, chunk_wire_size(CHUNK_SIZE as u64) + zero_chunk_len);
    }
}
