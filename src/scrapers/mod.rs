//! Per-publisher front-page scrapers.
//!
//! Every publisher lays out its front page differently, so each gets a
//! hand-written DOM traversal with its own special cases. The scrapers
//! share one contract:
//!
//! 1. **Ranking**: [`PublisherScraper::top_article_metadata`] walks an
//!    archived front page and returns headline links in prominence order
//! 2. **Scraping**: [`PublisherScraper::scrape_article`] pulls the title
//!    and body paragraphs out of one article's HTML
//!
//! Implementations are pure HTML-in, metadata-out — no I/O — which keeps
//! them testable against fixture strings. They are looked up by name
//! through a registry ([`lookup`]) rather than constructed directly, so
//! adding a publisher means adding a module and one registry line.
//!
//! # Supported Publishers
//!
//! | Name | Module | Notes |
//! |------|--------|-------|
//! | `cnn` | [`cnn`] | Headline ordering reverse-engineered from analytics tags |
//! | `washingtonpost` | [`washingtonpost`] | Ranks headlines by type size |
//! | `abcnews` | [`abcnews`] | Top trio plus sidebar headline list |
//! | `vox` | [`vox`] | Hero placements only |
//!
//! Archived pages link through the archive's replay prefix; hrefs are
//! cleaned back to live-site URLs before they are reported.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use scraper::ElementRef;
use url::Url;

use crate::models::{ArticleScrape, TopArticle};

pub mod abcnews;
pub mod cnn;
pub mod vox;
pub mod washingtonpost;

/// The shared contract for publisher front-page scrapers.
pub trait PublisherScraper: Send + Sync {
    /// The live-site front page URL this scraper understands.
    fn front_page_url(&self) -> &'static str;

    /// Rank the top articles on an archived front page.
    ///
    /// Unparseable sections yield fewer articles, never an error; a page
    /// this scraper cannot read at all yields an empty list.
    fn top_article_metadata(&self, front_page: &str) -> Vec<TopArticle>;

    /// Extract the headline and body paragraphs from one article page.
    ///
    /// Returns `None` when the page does not look like an article this
    /// scraper understands (special sections, galleries, paywalled
    /// shells).
    fn scrape_article(&self, html: &str, url: &str) -> Option<ArticleScrape>;
}

static REGISTRY: Lazy<HashMap<&'static str, Box<dyn PublisherScraper>>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, Box<dyn PublisherScraper>> = HashMap::new();
    m.insert("cnn", Box::new(cnn::CnnScraper));
    m.insert("washingtonpost", Box::new(washingtonpost::WashingtonPostScraper));
    m.insert("abcnews", Box::new(abcnews::AbcNewsScraper));
    m.insert("vox", Box::new(vox::VoxScraper));
    m
});

/// Look a scraper up by its registry name.
pub fn lookup(name: &str) -> Option<&'static dyn PublisherScraper> {
    REGISTRY.get(name).map(|b| b.as_ref())
}

/// All registered scraper names, sorted.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = REGISTRY.keys().copied().collect();
    names.sort_unstable();
    names
}

/// Clean an href lifted from an archived page back into a live-site URL.
///
/// Handles the replay prefixes the archive injects
/// (`https://web.archive.org/web/{TS}/…`), rejects off-domain and
/// javascript links, and optionally drops query parameters (tracking
/// junk, but some publishers key articles on them — hence the flag).
///
/// Returns `None` when the href does not lead back to this publisher.
pub(crate) fn clean_archive_url(
    front_page_url: &str,
    href: &str,
    remove_params: bool,
) -> Option<String> {
    if href == "javascript:void(0);" {
        return None;
    }
    let needle = domain_needle(front_page_url)?;
    if !href.contains(&needle) {
        return None;
    }

    let stripped = href.strip_prefix("https://web.archive.org").unwrap_or(href);
    let start = stripped.find("http")?;
    let clean = &stripped[start..];

    if remove_params {
        let parsed = Url::parse(clean).ok()?;
        Some(format!(
            "{}://{}{}",
            parsed.scheme(),
            parsed.host_str()?,
            parsed.path()
        ))
    } else {
        Some(clean.to_string())
    }
}

/// The publisher's bare domain (`cnn.com`), used to spot off-domain links.
fn domain_needle(front_page_url: &str) -> Option<String> {
    let parsed = Url::parse(front_page_url).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// First element sibling after `el`, skipping text nodes.
pub(crate) fn next_sibling_element<'a>(el: ElementRef<'a>) -> Option<ElementRef<'a>> {
    el.next_siblings().find_map(ElementRef::wrap)
}

/// Whether any ancestor element carries the given class.
pub(crate) fn has_ancestor_class(el: ElementRef<'_>, class: &str) -> bool {
    el.ancestors().filter_map(ElementRef::wrap).any(|a| {
        a.value()
            .attr("class")
            .is_some_and(|c| c.split_whitespace().any(|token| token == class))
    })
}

/// Joined, whitespace-trimmed text of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
