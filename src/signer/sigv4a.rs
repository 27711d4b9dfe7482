//! SigV4a: deterministic P-256 keypair derivation and ECDSA signing.
//!
//! Built directly from the documented AWS algorithm, cross-checked against
//! `520e2466_foundry-rs-foundry__...sigv4a.rs` (`examples/other_examples/`)
//! for the overall shape of a `Signer`/keypair-derivation split.

use hmac::{Hmac, Mac};
use p256::ecdsa::signature::Signer as EcdsaSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::FieldBytes;
use sha2::Sha256;
use subtle::{Choice, ConstantTimeEq};

use crate::credentials::Credential;

use super::SigningError;

type HmacSha256 = Hmac<Sha256>;

const SIGNING_ALGORITHM: &[u8] = b"AWS4-ECDSA-P256-SHA256";

/// NIST P-256 group order minus 2, big-endian. A derived candidate scalar
/// must be `<= N_MINUS_2` before adding 1, so the resulting private key
/// always lands in `[1, n-1]`.
const N_MINUS_2: [u8; 32] = [
    0xff, 0xff, 0xff, 0xff, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xbc, 0xe6, 0xfa, 0xad, 0xa7, 0x17, 0x9e, 0x84, 0xf3, 0xb9, 0xca, 0xc2, 0xfc, 0x63, 0x25, 0x4f,
];

fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(data);
    mac.finalize().into_bytes().into()
}

/// Constant-time `a <= b` over two big-endian 32-byte values.
fn constant_time_le(a: &[u8; 32], b: &[u8; 32]) -> bool {
    let mut less = Choice::from(0u8);
    let mut equal_so_far = Choice::from(1u8);
    for i in 0..32 {
        let byte_lt = Choice::from((a[i] < b[i]) as u8);
        let byte_eq = a[i].ct_eq(&b[i]);
        less |= equal_so_far & byte_lt;
        equal_so_far &= byte_eq;
    }
    bool::from(less | equal_so_far)
}

/// Add 1 to a big-endian 32-byte value in place.
fn increment(bytes: &mut [u8; 32]) {
    for byte in bytes.iter_mut().rev() {
        if *byte == 0xff {
            *byte = 0;
        } else {
            *byte += 1;
            return;
        }
    }
}

/// Derive the deterministic SigV4a signing keypair for one credential
///: repeatedly HMAC a counter-suffixed context with
/// `"AWS4A" + secret` until the candidate scalar falls within the curve's
/// valid range, bounded by a counter byte from 1 to 254.
fn derive_keypair(secret_access_key: &str, access_key_id: &str) -> Result<SigningKey, SigningError> {
    let kdf_secret = format!("AWS4A{secret_access_key}");

    for counter in 1u8..=254 {
        let mut input = Vec::with_capacity(4 + SIGNING_ALGORITHM.len() + 1 + access_key_id.len() + 1 + 4);
        input.extend_from_slice(&[0, 0, 0, 1]);
        input.extend_from_slice(SIGNING_ALGORITHM);
        input.push(0);
        input.extend_from_slice(access_key_id.as_bytes());
        input.push(counter);
        input.extend_from_slice(&[0, 0, 1, 0]);

        let candidate = hmac_sha256(kdf_secret.as_bytes(), &input);
        if constant_time_le(&candidate, &N_MINUS_2) {
            let mut scalar = candidate;
            increment(&mut scalar);
            let field_bytes = FieldBytes::clone_from_slice(&scalar);
            return SigningKey::from_bytes(&field_bytes).map_err(|_| SigningError::KeypairDerivationFailed);
        }
    }

    Err(SigningError::KeypairDerivationFailed)
}

/// Sign `string_to_sign` with the credential's deterministic SigV4a
/// keypair, returning the lower-case hex DER-encoded ECDSA signature.
pub(super) fn sign(credential: &Credential, string_to_sign: &str) -> Result<String, SigningError> {
    let signing_key = derive_keypair(credential.secret_access_key(), &credential.access_key_id)?;
    let signature: Signature = signing_key.sign(string_to_sign.as_bytes());
    Ok(hex::encode(signature.to_der().as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let a = derive_keypair("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", "AKIDEXAMPLE").unwrap();
        let b = derive_keypair("wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", "AKIDEXAMPLE").unwrap();
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn different_access_keys_derive_different_keypairs() {
        let a = derive_keypair("secret", "AKIDEXAMPLE1").unwrap();
        let b = derive_keypair("secret", "AKIDEXAMPLE2").unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn sign_produces_well_formed_der_hex() {
        let credential = Credential::new("AKIDEXAMPLE", "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY", None);
        let sig = sign(&credential, "hello world").unwrap();
        assert!(sig.chars().all(|c| c.is_ascii_hexdigit()));
        // DER SEQUENCE tag is 0x30.
        assert!(sig.starts_with("30"));
    }

    #[test]
    fn constant_time_le_matches_naive_comparison() {
        let a = [0u8; 32];
        let mut b = [0u8; 32];
        b[31] = 5;
        assert!(constant_time_le(&a, &b));
        assert!(!constant_time_le(&b, &a));
        assert!(constant_time_le(&a, &a));
    }
}
