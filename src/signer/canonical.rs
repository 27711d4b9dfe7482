//! Canonical request construction.
//!
//! Grounded on `src/api/auth.rs` (`uri_encode`, `uri_encode_path`,
//! `percent_decode`, `build_canonical_query_string`), generalized from a
//! verification-time reconstruction into the forward signing direction, and
//! cross-checked against smithy-rs's `canonical_request.rs`
//! (`examples/other_examples/659c747e_...`) for the query/header rules.

use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::http::Headers;

/// Headers excluded from signing regardless of what the caller passed in.
const EXCLUDED_HEADERS: &[&str] = &["authorization", "content-length", "expect", "user-agent"];

/// RFC 3986 unreserved characters: `A-Z a-z 0-9 - _ . ~`.
fn is_unreserved(byte: u8) -> bool {
    matches!(byte, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~')
}

/// Percent-encode `input`, optionally leaving `/` unescaped.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let mut out = String::with_capacity(input.len() * 3);
    for byte in input.bytes() {
        if is_unreserved(byte) || (byte == b'/' && !encode_slash) {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// Percent-decode `input`. Invalid escapes are passed through literally.
pub fn percent_decode(input: &str) -> String {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let Ok(byte) = u8::from_str_radix(&input[i + 1..i + 3], 16) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Canonical URI: for the `s3` signing name the raw path is URI-encoded
/// exactly once; for every other service the path, already percent-encoded
/// by the caller, is encoded a second time.
pub fn canonical_uri_path(path: &str, signing_name: &str) -> String {
    let path = if path.is_empty() { "/" } else { path };
    if signing_name == "s3" {
        uri_encode(&percent_decode(path), false)
    } else {
        uri_encode(path, false)
    }
}

/// Canonical query string: sort by name then value, percent-decode-then-
/// re-encode each pair with the conservative reserved set (slashes
/// included).
pub fn canonical_query_string(query: &str) -> String {
    if query.is_empty() {
        return String::new();
    }

    let mut pairs: Vec<(String, String)> = query
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (uri_encode(&percent_decode(k), true), uri_encode(&percent_decode(v), true)),
            None => (uri_encode(&percent_decode(pair), true), String::new()),
        })
        .collect();

    pairs.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    pairs
        .into_iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&")
}

/// Canonical headers: lower-cased name, trimmed and whitespace-collapsed
/// value, sorted by name, one per line.
///
/// Returns `(canonical_headers_block, signed_headers_semicolon_joined)`.
pub fn canonical_headers(headers_to_sign: &BTreeMap<String, String>) -> (String, String) {
    let filtered: BTreeMap<&String, &String> = headers_to_sign
        .iter()
        .filter(|(name, _)| !EXCLUDED_HEADERS.contains(&name.as_str()))
        .collect();

    let mut block = String::new();
    for (name, value) in &filtered {
        let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");
        block.push_str(name);
        block.push(':');
        block.push_str(&trimmed);
        block.push('\n');
    }

    let signed = filtered.keys().map(|s| s.as_str()).collect::<Vec<_>>().join(";");
    (block, signed)
}

/// Collect the subset of `headers` that should be signed: every header the
/// caller set, lower-cased, deduplicated, with `EXCLUDED_HEADERS` removed
/// up front (signer-added headers like `host`/`x-amz-date` are merged in by
/// the caller before this is invoked).
pub fn headers_to_sign_map(headers: &Headers) -> BTreeMap<String, String> {
    let mut map = BTreeMap::new();
    for name in headers.lower_names() {
        if EXCLUDED_HEADERS.contains(&name) {
            continue;
        }
        if let Some(value) = headers.get(name) {
            map.insert(name.to_string(), value.to_string());
        }
    }
    map
}

pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// SHA-256 of the empty string, used as the default payload hash for an
/// empty body.
pub fn empty_payload_hash() -> String {
    sha256_hex(b"")
}

/// Build the full canonical request string.
#[allow(clippy::too_many_arguments)]
pub fn build_canonical_request(
    method: &str,
    canonical_uri: &str,
    canonical_query: &str,
    canonical_headers_block: &str,
    signed_headers: &str,
    hashed_payload: &str,
) -> String {
    format!(
        "{method}\n{canonical_uri}\n{canonical_query}\n{canonical_headers_block}\n{signed_headers}\n{hashed_payload}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_encode_preserves_unreserved() {
        assert_eq!(uri_encode("hello-world_1.2~3", true), "hello-world_1.2~3");
    }

    #[test]
    fn uri_encode_escapes_space_and_slash_when_requested() {
        assert_eq!(uri_encode("a b/c", true), "a%20b%2Fc");
        assert_eq!(uri_encode("a b/c", false), "a%20b/c");
    }

    #[test]
    fn s3_path_is_single_encoded() {
        // An already-percent-encoded path is decoded once, then re-encoded:
        // net effect is a single encoding pass over the logical path.
        assert_eq!(canonical_uri_path("/bucket/my file.zip", "s3"), "/bucket/my%20file.zip");
        assert_eq!(canonical_uri_path("/bucket/my%20file.zip", "s3"), "/bucket/my%20file.zip");
    }

    #[test]
    fn non_s3_path_is_double_encoded() {
        // The literal '%' in an already-encoded path gets escaped again.
        assert_eq!(canonical_uri_path("/a%20b", "dynamodb"), "/a%2520b");
    }

    #[test]
    fn query_string_sorts_by_name_then_value() {
        assert_eq!(canonical_query_string("b=2&a=1"), "a=1&b=2");
        assert_eq!(canonical_query_string("a=2&a=1"), "a=1&a=2");
    }

    #[test]
    fn query_string_reencodes_decoded_values() {
        assert_eq!(canonical_query_string("delimiter=%2F&prefix="), "delimiter=%2F&prefix=");
    }
}
