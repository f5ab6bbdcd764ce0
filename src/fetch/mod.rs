// src/fetch/mod.rs
// =============================================================================
// This module is the boundary between the crawl engine and the web.
//
// The engine only ever talks to a `Fetcher`: give it a URL and a timeout,
// get back the cleaned page text plus the links found on the page. How the
// page is downloaded and cleaned up is the fetcher's business.
//
// Submodules:
// - http: the default Fetcher, built on reqwest
// - html: HTML cleanup, text rendering and link extraction (scraper)
// =============================================================================

mod html;
mod http;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::FetchError;

pub use html::{extract_page, CleanupOptions};
pub use http::HttpFetcher;

/// A hyperlink as found on a page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub href: String,
    pub text: String,
}

impl LinkRecord {
    pub fn new(href: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            text: text.into(),
        }
    }
}

/// What a fetcher returns for one page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageContent {
    /// Cleaned, readable text of the page
    pub text: String,
    /// Links pointing at the page's own host
    pub internal_links: Vec<LinkRecord>,
    /// Links pointing elsewhere; reported but never followed
    pub external_links: Vec<LinkRecord>,
}

/// Downloads and cleans up a single page.
///
/// Implementations must be shareable between worker tasks. The returned
/// future should give up after `timeout`; the engine also enforces the
/// timeout on its side.
pub trait Fetcher: Send + Sync {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
        timeout: Duration,
    ) -> BoxFuture<'a, Result<PageContent, FetchError>>;
}
