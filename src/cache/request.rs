//! Request identity and captured responses
//!
//! A cache entry is keyed by the canonical identity of the request that
//! produced it: upper-cased method plus absolute URL without fragment.
//! Cache-control semantics of the original request are not part of the key.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use url::Url;

/// Canonical identity of a request (method + URL)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestKey {
    /// Upper-cased HTTP method
    pub method: String,
    /// Absolute URL with the fragment removed
    pub url: String,
}

impl RequestKey {
    /// Build the canonical identity for `method` and `url`
    pub fn canonical(method: &str, url: &Url) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            method: method.trim().to_ascii_uppercase(),
            url: url.into(),
        }
    }

    /// Identity of a plain GET for `url`
    pub fn get(url: &Url) -> Self {
        Self::canonical("GET", url)
    }

    /// Only GET identities can be answered from a generation
    pub fn is_get(&self) -> bool {
        self.method == "GET"
    }

    /// Stable, filesystem-safe digest of this identity (SHA256, hex)
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.method.as_bytes());
        hasher.update(b" ");
        hasher.update(self.url.as_bytes());
        let result = hasher.finalize();
        hex::encode(result)
    }
}

impl fmt::Display for RequestKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An outgoing request issued by the page
#[derive(Debug, Clone)]
pub struct AssetRequest {
    /// HTTP method as issued
    pub method: String,
    /// Absolute request URL
    pub url: Url,
    /// Request headers forwarded on a miss
    pub headers: Vec<(String, String)>,
}

impl AssetRequest {
    /// Create a GET request for `url`
    pub fn get(url: Url) -> Self {
        Self {
            method: "GET".to_string(),
            url,
            headers: Vec::new(),
        }
    }

    /// Create a request with an arbitrary method
    pub fn new(method: impl Into<String>, url: Url) -> Self {
        Self {
            method: method.into(),
            url,
            headers: Vec::new(),
        }
    }

    /// Add a request header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Canonical identity used for cache lookups
    pub fn key(&self) -> RequestKey {
        RequestKey::canonical(&self.method, &self.url)
    }
}

/// A response captured from the network, stored byte-for-byte
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedResponse {
    /// HTTP status code
    pub status: u16,
    /// Response headers in the order received
    pub headers: Vec<(String, String)>,
    /// Raw response body
    pub body: Vec<u8>,
}

impl CapturedResponse {
    /// Create a response with no headers
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    /// Add a response header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Whether the status is in the 2xx range
    pub fn is_ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// A (request identity, captured response) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub response: CapturedResponse,
}

impl CacheEntry {
    pub fn new(key: RequestKey, response: CapturedResponse) -> Self {
        Self { key, response }
    }
}
