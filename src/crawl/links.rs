// src/crawl/links.rs
// =============================================================================
// Link classification: decides what to do with every link found on a page.
//
// For each link we:
// 1. Trim it and skip empty / fragment-only ("#top") hrefs
// 2. Sanitize absolute URLs (cut off junk stuck to the end, like "...pdf)(")
// 3. Resolve relative links against the page URL
// 4. Drop the #fragment
// 5. Keep it only if it stays on the crawled site (optionally subdomains)
// 6. Sort it into "file" (pdf, images, downloads...) or "crawlable page"
//
// Nothing here does I/O, so classifying the same page twice always gives the
// same answer.
// =============================================================================

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use tracing::trace;
use url::Url;

use crate::config::ClassifierConfig;
use crate::fetch::LinkRecord;

/// The site a crawl is allowed to stay on, taken from the seed URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlScope {
    host: String,
    port: Option<u16>,
    include_subdomains: bool,
}

impl CrawlScope {
    /// Returns `None` when the seed has no host to compare against
    pub fn from_seed(seed: &Url, include_subdomains: bool) -> Option<Self> {
        let host = seed.host_str()?.to_ascii_lowercase();
        Some(Self {
            host,
            port: seed.port(),
            include_subdomains,
        })
    }

    // Same host always matches. With subdomains on, hosts match when one is
    // a dot-suffix of the other once a leading "www." is stripped, so
    // docs.example.com and www.example.com are the same site.
    pub fn contains(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        if url.port() != self.port {
            return false;
        }

        let host = host.to_ascii_lowercase();
        if host == self.host {
            return true;
        }

        if !self.include_subdomains {
            return false;
        }

        let target = host.strip_prefix("www.").unwrap_or(&host);
        let base = self.host.strip_prefix("www.").unwrap_or(&self.host);

        target == base
            || target.ends_with(&format!(".{}", base))
            || base.ends_with(&format!(".{}", target))
    }
}

/// The links from one page that survived scoping, split by kind
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLinks {
    pub crawlable: BTreeSet<String>,
    pub files: BTreeSet<String>,
}

/// Sorts the links of one page into crawlable pages and file downloads.
///
/// Links that cannot be resolved or that leave the crawl scope are
/// dropped without being reported.
pub fn classify_links(
    links: &[LinkRecord],
    page_url: &Url,
    scope: &CrawlScope,
    config: &ClassifierConfig,
) -> ClassifiedLinks {
    let mut classified = ClassifiedLinks::default();

    for link in links {
        let Some(url) = resolve_link(page_url, &link.href) else {
            trace!(href = %link.href, "dropping unresolvable link");
            continue;
        };

        if !scope.contains(&url) {
            continue;
        }

        if is_file_url(&url, config) {
            classified.files.insert(url.to_string());
        } else {
            classified.crawlable.insert(url.to_string());
        }
    }

    classified
}

// Turns an href into an absolute http(s) URL without a fragment
fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let sanitized = sanitize_href(href)?;

    let mut url = match Url::parse(&sanitized) {
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => base.join(&sanitized).ok()?,
        Err(_) => return None,
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}

// Absolute web URLs are cut down to their longest well-formed prefix, which
// strips markup leftovers like a trailing ")" or "\"". Other schemes we can't
// crawl are refused; anything else is a relative reference and passes through.
fn sanitize_href(href: &str) -> Option<String> {
    static ABSOLUTE: OnceLock<Regex> = OnceLock::new();
    let absolute =
        ABSOLUTE.get_or_init(|| Regex::new(r#"^https?://[^\s")'\]}]+"#).expect("static regex"));

    let lower = href.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        // The pattern only knows lowercase schemes; the rest keeps its case
        let scheme_len = if lower.starts_with("https://") { 8 } else { 7 };
        let normalized = format!("{}{}", &lower[..scheme_len], &href[scheme_len..]);
        return absolute.find(&normalized).map(|m| m.as_str().to_string());
    }

    const SKIPPED_SCHEMES: &[&str] = &["mailto:", "tel:", "javascript:", "data:"];
    if SKIPPED_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
        return None;
    }

    Some(href.to_string())
}

fn is_file_url(url: &Url, config: &ClassifierConfig) -> bool {
    let is_download = url.query_pairs().any(|(key, value)| {
        config
            .download_params
            .iter()
            .any(|(k, v)| key == k.as_str() && value == v.as_str())
    });
    if is_download {
        return true;
    }

    let path = url.path().to_lowercase();
    let query = url.query().unwrap_or("").to_lowercase();

    config.file_extensions.iter().any(|ext| path.ends_with(ext.as_str()))
        || config.path_markers.iter().any(|m| path.contains(m.as_str()))
        || config.query_markers.iter().any(|m| query.contains(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn scope(seed: &str, subdomains: bool) -> CrawlScope {
        CrawlScope::from_seed(&Url::parse(seed).unwrap(), subdomains).unwrap()
    }

    fn classify(hrefs: &[&str], subdomains: bool) -> ClassifiedLinks {
        let links: Vec<_> = hrefs.iter().map(|h| LinkRecord::new(*h, "")).collect();
        let page = Url::parse("https://example.com/docs/intro").unwrap();
        classify_links(
            &links,
            &page,
            &scope("https://example.com/", subdomains),
            &ClassifierConfig::default(),
        )
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_skip_empty_and_fragment_links() {
        let links = classify(&["", "   ", "#section"], false);
        assert!(links.crawlable.is_empty());
        assert!(links.files.is_empty());
    }

    #[test]
    fn test_resolve_relative_link() {
        let links = classify(&["/guide", "setup", "../about"], false);
        assert_eq!(
            links.crawlable,
            set(&[
                "https://example.com/guide",
                "https://example.com/docs/setup",
                "https://example.com/about",
            ])
        );
    }

    #[test]
    fn test_fragment_is_stripped_and_deduplicated() {
        let links = classify(
            &["https://example.com/a#one", "https://example.com/a#two", " /a "],
            false,
        );
        assert_eq!(links.crawlable, set(&["https://example.com/a"]));
    }

    #[test]
    fn test_sanitize_drops_trailing_noise() {
        let links = classify(&["https://example.com/file?download=1)(pdf)"], false);
        assert_eq!(links.files, set(&["https://example.com/file?download=1"]));
    }

    #[test]
    fn test_skip_mailto_and_javascript() {
        let links = classify(&["mailto:test@example.com", "javascript:void(0)", "tel:123"], false);
        assert!(links.crawlable.is_empty());
        assert!(links.files.is_empty());
    }

    #[test]
    fn test_exact_host_only_without_subdomains() {
        let links = classify(
            &[
                "https://example.com/ok",
                "https://EXAMPLE.com/upper",
                "https://docs.example.com/no",
                "https://other.org/no",
            ],
            false,
        );
        assert_eq!(
            links.crawlable,
            set(&["https://example.com/ok", "https://example.com/upper"])
        );
    }

    #[test]
    fn test_subdomains_admit_each_other() {
        let from_root = scope("https://example.com/", true);
        assert!(from_root.contains(&Url::parse("https://sub.example.com/x").unwrap()));
        assert!(from_root.contains(&Url::parse("https://www.example.com/x").unwrap()));
        assert!(!from_root.contains(&Url::parse("https://badexample.com/x").unwrap()));

        let from_sub = scope("https://sub.example.com/", true);
        assert!(from_sub.contains(&Url::parse("https://example.com/x").unwrap()));
        assert!(from_sub.contains(&Url::parse("https://www.example.com/x").unwrap()));
        assert!(!from_sub.contains(&Url::parse("https://other.com/x").unwrap()));
    }

    #[test]
    fn test_ports_must_match() {
        let scope = scope("http://127.0.0.1:8080/", false);
        assert!(scope.contains(&Url::parse("http://127.0.0.1:8080/a").unwrap()));
        assert!(!scope.contains(&Url::parse("http://127.0.0.1:9090/a").unwrap()));
    }

    #[test]
    fn test_file_detection() {
        let links = classify(
            &[
                "/report.PDF",
                "/img/logo.png",
                "/get?id=4&download=1",
                "/resource/handbook",
                "/view?item=Form&id=2",
                "/plain-page",
            ],
            false,
        );
        assert_eq!(
            links.files,
            set(&[
                "https://example.com/get?id=4&download=1",
                "https://example.com/img/logo.png",
                "https://example.com/report.PDF",
                "https://example.com/resource/handbook",
                "https://example.com/view?item=Form&id=2",
            ])
        );
        assert_eq!(links.crawlable, set(&["https://example.com/plain-page"]));
    }

    #[test]
    fn test_custom_classifier_config() {
        let config = ClassifierConfig {
            file_extensions: vec![".epub".to_string()],
            download_params: vec![],
            path_markers: vec![],
            query_markers: vec![],
        };
        let page = Url::parse("https://example.com/").unwrap();
        let links = vec![LinkRecord::new("/book.epub", ""), LinkRecord::new("/a.pdf", "")];
        let classified =
            classify_links(&links, &page, &scope("https://example.com/", false), &config);

        assert_eq!(classified.files, set(&["https://example.com/book.epub"]));
        assert_eq!(classified.crawlable, set(&["https://example.com/a.pdf"]));
    }

    proptest! {
        #[test]
        fn prop_classification_is_idempotent(
            paths in proptest::collection::vec("[a-z/#.?=]{0,16}", 0..20),
            subdomains in any::<bool>(),
        ) {
            let links: Vec<_> = paths.iter().map(|p| LinkRecord::new(p.as_str(), "")).collect();
            let page = Url::parse("https://example.com/dir/page").unwrap();
            let scope = scope("https://example.com/", subdomains);
            let config = ClassifierConfig::default();

            let first = classify_links(&links, &page, &scope, &config);
            let second = classify_links(&links, &page, &scope, &config);

            prop_assert_eq!(&first, &second);
            prop_assert!(first.crawlable.is_disjoint(&first.files));
        }
    }
}
