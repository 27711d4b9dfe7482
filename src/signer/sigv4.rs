//! SigV4 signing: header signing, presigned URLs, and the HMAC chain shared
//! with SigV4a's scope/date machinery.
//!
//! Grounded on `src/api/auth.rs::derive_signing_key` / `hmac_sha256` (there
//! used to verify a signature; here used to produce one) and cross-checked
//! against the AWS documented signing algorithm.

use std::time::Duration;

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use url::Url;

use crate::credentials::Credential;
use crate::http::Headers;

use super::canonical::{
    build_canonical_request, canonical_headers, canonical_query_string, canonical_uri_path,
    headers_to_sign_map, sha256_hex,
};
use super::chunked::ChunkedSigningData;
use super::{Algorithm, SigningError};

type HmacSha256 = Hmac<Sha256>;

const STREAMING_SHA256_PAYLOAD: &str = "STREAMING-AWS4-HMAC-SHA256-PAYLOAD";
const UNSIGNED_PAYLOAD: &str = "UNSIGNED-PAYLOAD";

/// The body representation the signer hashes into the canonical request.
pub enum BodyDescriptor<'a> {
    Empty,
    StringPayload(&'a str),
    Bytes(&'a [u8]),
    Buffer(&'a [u8]),
    UnsignedPayload,
    S3Chunked,
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts a key of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

/// The SigV4 signing-key chain: `kSigning = HMAC(HMAC(HMAC(
/// HMAC("AWS4"+secret, date), region), service), "aws4_request")`.
pub(super) fn derive_signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_secret = format!("AWS4{secret}");
    let k_date = hmac_sha256(k_secret.as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn parse_url(url: &str) -> Result<Url, SigningError> {
    Url::parse(url).map_err(|e| SigningError::InvalidUrl(format!("{url}: {e}")))
}

fn host_header_value(url: &Url) -> String {
    match url.port() {
        Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
        None => url.host_str().unwrap_or_default().to_string(),
    }
}

fn format_datetime(date: DateTime<Utc>) -> (String, String) {
    let datetime = date.format("%Y%m%dT%H%M%SZ").to_string();
    let day = datetime[..8].to_string();
    (datetime, day)
}

fn payload_hash(body: &BodyDescriptor<'_>, signing_name: &str) -> String {
    match body {
        BodyDescriptor::Empty => {
            if signing_name == "s3" {
                UNSIGNED_PAYLOAD.to_string()
            } else {
                sha256_hex(b"")
            }
        }
        BodyDescriptor::StringPayload(s) => sha256_hex(s.as_bytes()),
        BodyDescriptor::Bytes(b) | BodyDescriptor::Buffer(b) => sha256_hex(b),
        BodyDescriptor::UnsignedPayload => UNSIGNED_PAYLOAD.to_string(),
        BodyDescriptor::S3Chunked => STREAMING_SHA256_PAYLOAD.to_string(),
    }
}

/// Scope string: `date/region/service/aws4_request` (SigV4) or
/// `date/service/aws4_request` (SigV4a, which omits the region).
fn scope(algorithm: Algorithm, date: &str, region: &str, service: &str) -> String {
    match algorithm {
        Algorithm::SigV4 => format!("{date}/{region}/{service}/aws4_request"),
        Algorithm::SigV4a => format!("{date}/{service}/aws4_request"),
    }
}

/// A SigV4 or SigV4a signer bound to one credential, region (or region set),
/// and service signing name.
pub struct Signer {
    pub(super) credential: Credential,
    pub(super) region: String,
    pub(super) region_set: Vec<String>,
    pub(super) service: String,
    pub(super) algorithm: Algorithm,
}

impl Signer {
    pub fn new_v4(credential: Credential, region: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            credential,
            region: region.into(),
            region_set: Vec::new(),
            service: service.into(),
            algorithm: Algorithm::SigV4,
        }
    }

    pub fn new_v4a(
        credential: Credential,
        region_set: Vec<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            credential,
            region: String::new(),
            region_set,
            service: service.into(),
            algorithm: Algorithm::SigV4a,
        }
    }

    fn region_set_header(&self) -> String {
        self.region_set.join(",")
    }

    /// Derive the signing key for the current algorithm. For SigV4a this
    /// delegates to the deterministic ECDSA keypair derivation in
    /// `sigv4a.rs`; the "signing key" there is the private scalar, used
    /// directly by `sign_bytes` below rather than via HMAC.
    fn sign_bytes(&self, string_to_sign: &str, date: &str) -> Result<String, SigningError> {
        match self.algorithm {
            Algorithm::SigV4 => {
                let key = derive_signing_key(
                    self.credential.secret_access_key(),
                    date,
                    &self.region,
                    &self.service,
                );
                Ok(hex::encode(hmac_sha256(&key, string_to_sign.as_bytes())))
            }
            Algorithm::SigV4a => super::sigv4a::sign(&self.credential, string_to_sign),
        }
    }

    /// `sign_headers`.
    pub fn sign_headers(
        &self,
        url: &str,
        method: &str,
        headers: &Headers,
        body: BodyDescriptor<'_>,
        omit_security_token: bool,
        date: DateTime<Utc>,
    ) -> Result<Headers, SigningError> {
        let parsed = parse_url(url)?;
        let (datetime, day) = format_datetime(date);
        let hashed_payload = payload_hash(&body, &self.service);

        let mut out = headers.clone();
        if !out.contains("host") {
            out.insert("host", host_header_value(&parsed));
        }
        out.insert("x-amz-date", datetime.clone());
        if self.algorithm == Algorithm::SigV4a {
            out.insert("x-amz-region-set", self.region_set_header());
        }
        if let (Some(token), false) = (&self.credential.session_token, omit_security_token) {
            out.insert("x-amz-security-token", token.clone());
        }

        if self.credential.is_empty() {
            // Empty credentials produce an unsigned, still well-formed request.
            out.insert("x-amz-content-sha256", hashed_payload.clone());
            return Ok(out);
        }

        // Computed from `out` before `x-amz-content-sha256` is added below: the
        // payload hash travels as a header but is not itself part of the
        // signed set, matching the documented `get-vanilla` signing vector.
        let headers_to_sign = headers_to_sign_map(&out);
        let (canonical_headers_block, signed_headers) = canonical_headers(&headers_to_sign);
        let canonical_uri = canonical_uri_path(parsed.path(), &self.service);
        let canonical_query = canonical_query_string(parsed.query().unwrap_or(""));

        let canonical_request = build_canonical_request(
            method,
            &canonical_uri,
            &canonical_query,
            &canonical_headers_block,
            &signed_headers,
            &hashed_payload,
        );

        let scope = scope(self.algorithm, &day, &self.region, &self.service);
        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            self.algorithm.name(),
            datetime,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );

        let signature = self.sign_bytes(&string_to_sign, &day)?;

        let authorization = format!(
            "{} Credential={}/{},SignedHeaders={},Signature={}",
            self.algorithm.name(),
            self.credential.access_key_id,
            scope,
            signed_headers,
            signature
        );
        out.insert("x-amz-content-sha256", hashed_payload);
        out.insert("authorization", authorization);

        Ok(out)
    }

    /// `sign_url`: a presigned URL whose query string carries
    /// the signature.
    pub fn sign_url(
        &self,
        url: &str,
        method: &str,
        headers: &Headers,
        body: BodyDescriptor<'_>,
        expires: Duration,
        omit_security_token: bool,
        date: DateTime<Utc>,
    ) -> Result<String, SigningError> {
        let mut parsed = parse_url(url)?;
        let (datetime, day) = format_datetime(date);
        let hashed_payload = payload_hash(&body, &self.service);
        let scope = scope(self.algorithm, &day, &self.region, &self.service);

        let mut signing_headers = headers.clone();
        if !signing_headers.contains("host") {
            signing_headers.insert("host", host_header_value(&parsed));
        }
        let headers_to_sign = headers_to_sign_map(&signing_headers);
        let (canonical_headers_block, signed_headers) = canonical_headers(&headers_to_sign);

        // Build the query string the request will actually carry: existing
        // query params plus the X-Amz-* presigning parameters.
        let mut query_pairs: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        query_pairs.push(("X-Amz-Algorithm".to_string(), self.algorithm.name().to_string()));
        query_pairs.push((
            "X-Amz-Credential".to_string(),
            format!("{}/{}", self.credential.access_key_id, scope),
        ));
        query_pairs.push(("X-Amz-Date".to_string(), datetime.clone()));
        query_pairs.push(("X-Amz-Expires".to_string(), expires.as_secs().to_string()));
        query_pairs.push(("X-Amz-SignedHeaders".to_string(), signed_headers.clone()));
        if self.algorithm == Algorithm::SigV4a {
            query_pairs.push(("X-Amz-Region-Set".to_string(), self.region_set_header()));
        }
        if let (Some(token), false) = (&self.credential.session_token, omit_security_token) {
            query_pairs.push(("X-Amz-Security-Token".to_string(), token.clone()));
        }

        let query_string = query_pairs
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let canonical_query = canonical_query_string(&query_string);
        let canonical_uri = canonical_uri_path(parsed.path(), &self.service);

        let canonical_request = build_canonical_request(
            method,
            &canonical_uri,
            &canonical_query,
            &canonical_headers_block,
            &signed_headers,
            &hashed_payload,
        );

        let string_to_sign = format!(
            "{}\n{}\n{}\n{}",
            self.algorithm.name(),
            datetime,
            scope,
            sha256_hex(canonical_request.as_bytes())
        );
        let signature = self.sign_bytes(&string_to_sign, &day)?;

        query_pairs.push(("X-Amz-Signature".to_string(), signature));
        let final_query = query_pairs
            .iter()
            .map(|(k, v)| format!("{}={}", super::canonical::uri_encode(k, true), super::canonical::uri_encode(v, true)))
            .collect::<Vec<_>>()
            .join("&");
        parsed.set_query(Some(&final_query));
        Ok(parsed.to_string())
    }

    /// `start_signing_chunks`: sign the headers for an
    /// `s3_chunked` body and seed the rolling chunk-signing context with the
    /// header signature as the "previous signature" for the first chunk.
    pub fn start_signing_chunks(
        &self,
        url: &str,
        method: &str,
        headers: &Headers,
        date: DateTime<Utc>,
    ) -> Result<(Headers, ChunkedSigningData), SigningError> {
        let signed = self.sign_headers(url, method, headers, BodyDescriptor::S3Chunked, false, date)?;
        let (datetime, day) = format_datetime(date);
        let seed_signature = extract_signature(&signed).unwrap_or_default();
        let signing_key = self.chunk_signing_key(&day)?;
        let scope = scope(self.algorithm, &day, &self.region, &self.service);
        Ok((
            signed,
            ChunkedSigningData {
                previous_signature: seed_signature,
                datetime,
                scope,
                signing_key,
                credential: self.credential.clone(),
                algorithm_name: self.algorithm.name(),
            },
        ))
    }

    /// The key used for chunk signatures. SigV4 reuses the ordinary signing
    /// key; SigV4a's chunk signatures are ECDSA signatures over each
    /// chunk's string-to-sign, so there is no symmetric key to derive.
    /// `ChunkedSigningData` instead carries the credential's access key id
    /// and `sign_chunk` re-derives the keypair per chunk.
    fn chunk_signing_key(&self, day: &str) -> Result<Vec<u8>, SigningError> {
        match self.algorithm {
            Algorithm::SigV4 => Ok(derive_signing_key(
                self.credential.secret_access_key(),
                day,
                &self.region,
                &self.service,
            )),
            Algorithm::SigV4a => Ok(Vec::new()),
        }
    }
}

fn extract_signature(headers: &Headers) -> Option<String> {
    let auth = headers.get("authorization")?;
    auth.split("Signature=").nth(1).map(|s| s.to_string())
}
