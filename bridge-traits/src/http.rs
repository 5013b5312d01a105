//! HTTP Client Abstraction
//!
//! Single-shot async HTTP operations against the remote item endpoint.
//! Retry, backoff and per-attempt timeouts are owned by the caller (the
//! prefetch engine decides them per priority), so implementations must not
//! retry on their own.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::time::Duration;

use crate::error::Result;

/// GET request builder
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub url: String,
    pub headers: HashMap<String, String>,
    pub timeout: Option<Duration>,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: HashMap::new(),
            timeout: None,
        }
    }

    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }
}

/// Parsed `Content-Range` header of a 206 response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentRange {
    pub start: u64,
    pub end: u64,
    /// Full length of the resource, `None` when the server sent `*`.
    pub total: Option<u64>,
}

impl ContentRange {
    /// Parses `bytes <start>-<end>/<total|*>`.
    pub fn parse(value: &str) -> Option<Self> {
        let rest = value.trim().strip_prefix("bytes")?.trim_start();
        let (span, total) = rest.split_once('/')?;
        let (start, end) = span.split_once('-')?;
        let start = start.trim().parse().ok()?;
        let end = end.trim().parse().ok()?;
        if end < start {
            return None;
        }
        let total = match total.trim() {
            "*" => None,
            other => Some(other.parse().ok()?),
        };
        Some(Self { start, end, total })
    }

    /// Number of bytes covered by the range (bounds are inclusive).
    ///
    /// `None` when the span does not fit in a `u64`.
    pub fn byte_len(&self) -> Option<u64> {
        (self.end - self.start).checked_add(1)
    }
}

/// HTTP response
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers: HashMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type without parameters (`audio/mpeg; charset=...` -> `audio/mpeg`).
    pub fn content_type(&self) -> Option<&str> {
        self.header("Content-Type")
            .map(|v| v.split(';').next().unwrap_or(v).trim())
            .filter(|v| !v.is_empty())
    }

    pub fn content_range(&self) -> Option<ContentRange> {
        self.header("Content-Range").and_then(ContentRange::parse)
    }

    /// Check if response status is successful (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// 206 Partial Content
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }
}

/// Async HTTP client trait
///
/// # Example
///
/// ```ignore
/// use bridge_traits::http::{HttpClient, HttpRequest};
///
/// async fn fetch(client: &dyn HttpClient) -> Result<bytes::Bytes> {
///     let response = client.execute(HttpRequest::get("https://media.example/a%20b")).await?;
///     Ok(response.body)
/// }
/// ```
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Execute an HTTP request exactly once.
    ///
    /// A non-2xx status is not an error at this layer; it is returned as a
    /// response. Errors are reserved for transport failures (DNS, connect,
    /// reset, TLS) and client-side timeouts.
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_request_builder() {
        let request = HttpRequest::get("https://example.com/item")
            .header("User-Agent", "test")
            .timeout(Duration::from_secs(30));

        assert_eq!(request.url, "https://example.com/item");
        assert_eq!(request.headers.get("User-Agent"), Some(&"test".to_string()));
        assert_eq!(request.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_http_response_status_checks() {
        let response = HttpResponse::new(206, "abc")
            .with_header("content-range", "bytes 0-2/10")
            .with_header("Content-Type", "audio/mpeg; charset=binary");

        assert!(response.is_success());
        assert!(response.is_partial());
        assert_eq!(response.content_type(), Some("audio/mpeg"));
        assert_eq!(
            response.content_range(),
            Some(ContentRange {
                start: 0,
                end: 2,
                total: Some(10)
            })
        );
        assert!(HttpResponse::new(404, "").is_not_found());
    }

    #[test]
    fn test_content_range_parse() {
        assert_eq!(ContentRange::parse("bytes 5-9/*").and_then(|r| r.byte_len()), Some(5));
        assert_eq!(ContentRange::parse("bytes 9-5/10"), None);
        assert_eq!(ContentRange::parse("items 0-1/2"), None);
    }

    #[test]
    fn test_content_range_spanning_u64_has_no_length() {
        let range = ContentRange::parse("bytes 0-18446744073709551615/*").unwrap();
        assert_eq!(range.end, u64::MAX);
        assert_eq!(range.byte_len(), None);
    }
}
