// src/error.rs
// =============================================================================
// Error types for the crawl engine.
//
// There are only two kinds of failure a caller ever sees:
// - SpiderError: the crawl could not start at all (bad seed, no HTTP client)
// - FetchError: one page could not be fetched; it is recorded in the result
//   and the crawl keeps going
//
// Links that cannot be resolved are not errors; they are dropped quietly.
// =============================================================================

use std::time::Duration;

/// Errors that stop a crawl before any worker starts.
#[derive(Debug, thiserror::Error)]
pub enum SpiderError {
    /// The seed URL cannot be used as a crawl root
    #[error("invalid seed URL '{url}': {reason}")]
    SeedInvalid { url: String, reason: String },

    /// The default HTTP client could not be built
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Why a single page fetch failed.
///
/// The display string of this error is what ends up in
/// `CrawlResult::failed_pages`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("received non-OK status code: {0}")]
    Status(u16),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("failed to fetch URL: {0}")]
    Request(String),

    #[error("failed to parse page: {0}")]
    Parse(String),
}

impl FetchError {
    // Sorts a reqwest error into one of our buckets
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            FetchError::Timeout(timeout)
        } else if error.is_connect() {
            FetchError::Connect(error.to_string())
        } else if error.is_decode() || error.is_body() {
            FetchError::Parse(error.to_string())
        } else if let Some(status) = error.status() {
            FetchError::Status(status.as_u16())
        } else {
            FetchError::Request(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_messages() {
        assert_eq!(
            FetchError::Status(404).to_string(),
            "received non-OK status code: 404"
        );
        assert_eq!(
            FetchError::Timeout(Duration::from_secs(2)).to_string(),
            "request timed out after 2s"
        );
    }

    #[test]
    fn test_seed_invalid_message_names_url() {
        let err = SpiderError::SeedInvalid {
            url: "nota url".to_string(),
            reason: "relative URL without a base".to_string(),
        };
        assert!(err.to_string().contains("nota url"));
    }
}
