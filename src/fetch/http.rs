// src/fetch/http.rs
// =============================================================================
// The default Fetcher: downloads a page with reqwest and hands the HTML to
// the html module for cleanup.
//
// Key behaviour:
// - Browser-like headers, since some sites refuse obvious bots
// - Per-request timeout (the engine passes the per-page timeout in)
// - Only HTTP 200 counts as success; anything else is a failed page
// - reqwest errors are sorted into timeout / connection / other
// =============================================================================

use futures::future::BoxFuture;
use reqwest::{header, Client, StatusCode};
use std::time::Duration;
use tracing::debug;

use super::html::{extract_page, CleanupOptions};
use super::{Fetcher, PageContent};
use crate::error::FetchError;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";
const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.5";

/// Fetches pages over HTTP(S) and extracts their main text.
///
/// The underlying client is reused for every request, so connections to the
/// crawled site are pooled across workers.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    cleanup: CleanupOptions,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_options(DEFAULT_USER_AGENT, CleanupOptions::default())
    }

    pub fn with_options(user_agent: &str, cleanup: CleanupOptions) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client, cleanup })
    }

    async fn fetch_page(&self, url: &str, timeout: Duration) -> Result<PageContent, FetchError> {
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .header(header::ACCEPT, ACCEPT)
            .header(header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
            .send()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(FetchError::Status(status.as_u16()));
        }

        let html = response
            .text()
            .await
            .map_err(|e| FetchError::from_reqwest(e, timeout))?;

        debug!(url, bytes = html.len(), "downloaded page");

        // Redirects may have moved us; links still resolve against the
        // requested URL so scope checks stay relative to what was admitted
        Ok(extract_page(&html, url, &self.cleanup))
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<PageContent, FetchError>> {
        Box::pin(self.fetch_page(url, timeout))
    }
}
