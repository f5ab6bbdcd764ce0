// src/fetch/html.rs
// =============================================================================
// This module turns a raw HTML page into readable text plus its links.
//
// Steps:
// 1. Parse the HTML (scraper, built on html5ever)
// 2. Remove clutter: popups and cookie banners, navigation, header, footer,
//    scripts, ads, comment sections...
// 3. Pick the main content element (<main>, <article>, .content, ... or
//    <body> if nothing better exists)
// 4. Render that element's children to markdown-flavoured text using a
//    table of per-tag render rules
// 5. Collect the links inside the main content and split them into
//    internal (same host as the page) and external
//
// Everything here is synchronous: scraper's Html is not Send, so it must
// never be held across an .await.
// =============================================================================

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};
use std::sync::OnceLock;
use url::Url;

use super::{LinkRecord, PageContent};

/// Which clutter removal passes to run before extracting text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupOptions {
    pub remove_popups: bool,
    pub remove_navigation: bool,
    pub remove_header: bool,
    pub remove_footer: bool,
}

impl Default for CleanupOptions {
    fn default() -> Self {
        Self {
            remove_popups: true,
            remove_navigation: true,
            remove_header: true,
            remove_footer: true,
        }
    }
}

const POPUP_SELECTORS: &[&str] = &[
    // Cookie consent banners
    "[class*='cookie']", "[id*='cookie']",
    "[class*='consent']", "[id*='consent']",
    "[class*='gdpr']", "[id*='gdpr']",
    "[class*='privacy']", "[id*='privacy']",
    // Modal overlays
    "[class*='modal']", "[id*='modal']",
    "[class*='overlay']", "[id*='overlay']",
    "[class*='popup']", "[id*='popup']",
    "[class*='lightbox']", "[id*='lightbox']",
    // Newsletter signups
    "[class*='newsletter']", "[id*='newsletter']",
    "[class*='subscribe']", "[id*='subscribe']",
    "[class*='signup']", "[id*='signup']",
    // Social sharing overlays
    "[class*='share-overlay']", "[id*='share-overlay']",
    "[class*='social-overlay']", "[id*='social-overlay']",
    ".fixed", "[style*='position: fixed']", "[style*='z-index']",
];

const POPUP_KEYWORDS: &[&str] = &[
    "cookie", "consent", "gdpr", "privacy", "modal", "overlay", "popup", "newsletter",
    "subscribe", "signup", "lightbox",
];

const NAVIGATION_SELECTORS: &[&str] = &[
    "nav", "navigation", ".nav", ".navigation", "[role='navigation']",
    "[class*='nav']", "[id*='nav']", ".menu", "[class*='menu']", "[id*='menu']",
    ".sidebar", "[class*='sidebar']", "[id*='sidebar']",
    ".breadcrumb", "[class*='breadcrumb']", "[id*='breadcrumb']",
];

const HEADER_SELECTORS: &[&str] = &[
    "header", ".header", "#header", "[class*='header']", "[id*='header']",
    ".top-bar", ".topbar", "[class*='top-bar']", ".site-header", "[class*='site-header']",
];

const FOOTER_SELECTORS: &[&str] = &[
    "footer", ".footer", "#footer", "[class*='footer']", "[id*='footer']",
    ".site-footer", "[class*='site-footer']", ".bottom", "[class*='bottom']",
];

// Always removed, whatever the options say
const UNWANTED_SELECTORS: &[&str] = &[
    "script", "style", "noscript",
    ".ad", ".ads", "[class*='advertisement']", "[class*='google-ad']", "[class*='adsense']",
    "iframe[src*='doubleclick']", "iframe[src*='googlesyndication']",
    ".social-widget", "[class*='social-share']", ".facebook-widget", ".twitter-widget",
    ".comments", "[class*='comment']", "[id*='comment']", ".disqus", "[class*='disqus']",
    ".related", "[class*='related']", ".recommended", "[class*='recommended']",
    ".suggestions", "[class*='suggestions']",
];

const MAIN_CONTENT_SELECTORS: &[&str] = &[
    "main", "[role='main']", ".main", "#main",
    "article", ".article", "#article",
    ".content", "#content", ".post", "#post",
    ".entry", "#entry", ".page-content",
    "[class*='main-content']", "[class*='page-content']",
];

// How a direct child of the content root is written out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenderRule {
    Heading(usize),
    Paragraph,
    LineBreak,
    ListItem,
    Blockquote,
    InlineCode,
    Preformatted,
    Plain,
}

const RENDER_TABLE: &[(&str, RenderRule)] = &[
    ("h1", RenderRule::Heading(1)),
    ("h2", RenderRule::Heading(2)),
    ("h3", RenderRule::Heading(3)),
    ("h4", RenderRule::Heading(4)),
    ("h5", RenderRule::Heading(5)),
    ("h6", RenderRule::Heading(6)),
    ("p", RenderRule::Paragraph),
    ("br", RenderRule::LineBreak),
    ("li", RenderRule::ListItem),
    ("blockquote", RenderRule::Blockquote),
    ("code", RenderRule::InlineCode),
    ("pre", RenderRule::Preformatted),
];

impl RenderRule {
    fn for_tag(tag: &str) -> Self {
        RENDER_TABLE
            .iter()
            .find(|(name, _)| *name == tag)
            .map(|(_, rule)| *rule)
            .unwrap_or(RenderRule::Plain)
    }

    fn render(self, out: &mut String, text: &str) {
        match self {
            RenderRule::Heading(level) => {
                out.push_str(&format!("\n\n{} {}\n\n", "#".repeat(level), text));
            }
            RenderRule::Paragraph => out.push_str(&format!("\n{}\n", text)),
            RenderRule::LineBreak => out.push('\n'),
            RenderRule::ListItem => out.push_str(&format!("- {}\n", text)),
            RenderRule::Blockquote => out.push_str(&format!("\n> {}\n", text)),
            RenderRule::InlineCode => out.push_str(&format!("`{}`", text)),
            RenderRule::Preformatted => out.push_str(&format!("\n```\n{}\n```\n", text)),
            RenderRule::Plain => {
                if !text.is_empty() {
                    out.push_str(text);
                    out.push(' ');
                }
            }
        }
    }
}

/// Cleans up an HTML page and extracts its text and links.
///
/// `page_url` is used to resolve relative links and to decide which links
/// are internal.
pub fn extract_page(html: &str, page_url: &str, options: &CleanupOptions) -> PageContent {
    let mut document = Html::parse_document(html);
    clean_document(&mut document, options);

    let Some(root) = main_content(&document) else {
        return PageContent::default();
    };

    let (internal_links, external_links) = extract_links(root, page_url);

    PageContent {
        text: render_text(root),
        internal_links,
        external_links,
    }
}

fn clean_document(document: &mut Html, options: &CleanupOptions) {
    if options.remove_popups {
        remove_popups(document);
    }
    if options.remove_navigation {
        remove_matching(document, NAVIGATION_SELECTORS);
    }
    if options.remove_header {
        remove_matching(document, HEADER_SELECTORS);
    }
    if options.remove_footer {
        remove_matching(document, FOOTER_SELECTORS);
    }
    remove_matching(document, UNWANTED_SELECTORS);
}

// Detaches every element matched by any of the selectors
fn remove_matching(document: &mut Html, selectors: &[&str]) {
    let ids: Vec<_> = parse_selectors(selectors)
        .iter()
        .flat_map(|selector| document.select(selector).map(|el| el.id()).collect::<Vec<_>>())
        .collect();

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

// Popup candidates are only removed when they really look like an overlay:
// an inline z-index, or a popup keyword in class, id or text
fn remove_popups(document: &mut Html) {
    let mut ids = Vec::new();

    for selector in parse_selectors(POPUP_SELECTORS) {
        for element in document.select(&selector) {
            let value = element.value();
            let has_z_index = value.attr("style").is_some_and(|s| s.contains("z-index"));

            let class = value.attr("class").unwrap_or("");
            let id = value.attr("id").unwrap_or("");
            let text: String = element.text().collect();

            if has_z_index || is_popup_element(class, id, &text) {
                ids.push(element.id());
            }
        }
    }

    for id in ids {
        if let Some(mut node) = document.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn is_popup_element(class: &str, id: &str, text: &str) -> bool {
    let combined = format!("{} {} {}", class, id, text).to_lowercase();
    POPUP_KEYWORDS.iter().any(|keyword| combined.contains(keyword))
}

// The selector lists are constants; a bad entry is skipped rather than fatal
fn parse_selectors(selectors: &[&str]) -> Vec<Selector> {
    selectors
        .iter()
        .filter_map(|s| Selector::parse(s).ok())
        .collect()
}

fn main_content(document: &Html) -> Option<ElementRef<'_>> {
    for selector in parse_selectors(MAIN_CONTENT_SELECTORS) {
        if let Some(element) = document.select(&selector).next() {
            return Some(element);
        }
    }

    let body = Selector::parse("body").ok()?;
    document.select(&body).next()
}

fn render_text(root: ElementRef<'_>) -> String {
    let mut out = String::new();

    for child in root.children() {
        match child.value() {
            Node::Text(text) => {
                let text = text.trim();
                if !text.is_empty() {
                    out.push_str(text);
                    out.push(' ');
                }
            }
            Node::Element(element) => {
                let Some(child_ref) = ElementRef::wrap(child) else {
                    continue;
                };
                let inner: String = child_ref.text().collect();
                RenderRule::for_tag(element.name()).render(&mut out, inner.trim());
            }
            _ => {}
        }
    }

    collapse_whitespace(&out)
}

// Squeezes runs of spaces, trims around line breaks and caps blank lines at one
fn collapse_whitespace(text: &str) -> String {
    static SPACES: OnceLock<Regex> = OnceLock::new();
    static AROUND_NEWLINE: OnceLock<Regex> = OnceLock::new();
    static BLANK_LINES: OnceLock<Regex> = OnceLock::new();

    let spaces = SPACES.get_or_init(|| Regex::new(r"[ \t\r\f\v\u{a0}]+").expect("static regex"));
    let around_newline =
        AROUND_NEWLINE.get_or_init(|| Regex::new(r" ?\n ?").expect("static regex"));
    let blank_lines = BLANK_LINES.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"));

    let text = spaces.replace_all(text, " ");
    let text = around_newline.replace_all(&text, "\n");
    let text = blank_lines.replace_all(&text, "\n\n");
    text.trim().to_string()
}

fn extract_links(root: ElementRef<'_>, page_url: &str) -> (Vec<LinkRecord>, Vec<LinkRecord>) {
    let mut internal = Vec::new();
    let mut external = Vec::new();

    let Ok(base) = Url::parse(page_url) else {
        return (internal, external);
    };
    let Ok(anchors) = Selector::parse("a[href]") else {
        return (internal, external);
    };

    for anchor in root.select(&anchors) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        if href.trim().is_empty() {
            continue;
        }

        // join() handles both absolute and relative hrefs
        let Ok(resolved) = base.join(href.trim()) else {
            continue;
        };

        let text: String = anchor.text().collect();
        let text = match text.trim() {
            "" => href.to_string(),
            trimmed => trimmed.to_string(),
        };

        let record = LinkRecord::new(resolved.to_string(), text);
        if same_site(resolved.host_str(), base.host_str()) {
            internal.push(record);
        } else {
            external.push(record);
        }
    }

    (internal, external)
}

// Subdomains of the page's site count as internal; the crawl scope decides
// later whether they are actually followed
fn same_site(link_host: Option<&str>, page_host: Option<&str>) -> bool {
    let (Some(link_host), Some(page_host)) = (link_host, page_host) else {
        return false;
    };

    let link_host = link_host.to_ascii_lowercase();
    let page_host = page_host.to_ascii_lowercase();
    let link = link_host.strip_prefix("www.").unwrap_or(&link_host);
    let page = page_host.strip_prefix("www.").unwrap_or(&page_host);

    link == page || link.ends_with(&format!(".{}", page)) || page.ends_with(&format!(".{}", link))
}
