//! Wire-level request/response types.
//!
//! These are the core's own types, independent of any HTTP client crate.
//! The `HttpTransport` trait (`transport.rs`) is the only thing that has to
//! know how to turn one of these into bytes on a socket.

use std::collections::BTreeMap;
use std::fmt;

use crate::body::Body;

/// Case-insensitive multi-map that preserves the casing it was inserted
/// with for wire emission.
#[derive(Debug, Clone, Default)]
pub struct Headers {
    // Keyed by lower-cased name; value is the list of (original-case name, value) pairs.
    inner: BTreeMap<String, Vec<(String, String)>>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        self.inner.insert(key, vec![(name, value.into())]);
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let key = name.to_ascii_lowercase();
        self.inner.entry(key).or_default().push((name, value.into()));
    }

    pub fn remove(&mut self, name: &str) {
        self.inner.remove(&name.to_ascii_lowercase());
    }

    /// First value for `name`, if present (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .and_then(|v| v.first())
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.contains_key(&name.to_ascii_lowercase())
    }

    pub fn all(&self, name: &str) -> impl Iterator<Item = &str> {
        self.inner
            .get(&name.to_ascii_lowercase())
            .into_iter()
            .flat_map(|v| v.iter().map(|(_, val)| val.as_str()))
    }

    /// Iterate in wire-emission order: (original-case name, value).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .values()
            .flat_map(|pairs| pairs.iter().map(|(n, v)| (n.as_str(), v.as_str())))
    }

    /// Iterate lower-cased names only, deduplicated; used by the signer to
    /// build canonical headers.
    pub fn lower_names(&self) -> impl Iterator<Item = &str> {
        self.inner.keys().map(|k| k.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
    Head,
    Patch,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Patch => "PATCH",
        }
    }

    pub fn is_get_or_head(&self) -> bool {
        matches!(self, Method::Get | Method::Head)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A fully-formed request, ready to sign or already signed.
///
/// Not `Clone`: a streaming body is consumed exactly once.
#[derive(Debug)]
pub struct HttpRequest {
    pub url: String,
    pub method: Method,
    pub headers: Headers,
    pub body: Body,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method,
            headers: Headers::new(),
            body: Body::empty(),
        }
    }
}

/// A received response.
#[derive(Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Body,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
