//! Vox front-page scraper.
//!
//! Vox marks its lead placements with `data-analytics-placement="hero…"`
//! attributes; everything else on the page is evergreen or promotional.
//! "The Highlight" is a standalone editorial column linked from the front
//! page and is skipped by URL.

use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{ArticleScrape, TopArticle};
use crate::scrapers::{clean_archive_url, element_text, next_sibling_element, PublisherScraper};

const TOP_K: usize = 10;

pub struct VoxScraper;

impl PublisherScraper for VoxScraper {
    fn front_page_url(&self) -> &'static str {
        "https://vox.com"
    }

    fn top_article_metadata(&self, front_page: &str) -> Vec<TopArticle> {
        let document = Html::parse_document(front_page);
        let hero_selector = Selector::parse(r#"div[data-analytics-placement*="hero"]"#).unwrap();
        let title_selector = Selector::parse(r#"h2[class*="title"]"#).unwrap();
        let link_selector = Selector::parse("a").unwrap();

        let mut articles = Vec::new();
        let mut rank = 1usize;
        for entry in document.select(&hero_selector) {
            if rank > TOP_K {
                break;
            }
            let Some(header) = entry.select(&title_selector).next() else {
                continue;
            };
            let Some(link) = header.select(&link_selector).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = clean_archive_url(self.front_page_url(), href, true) else {
                debug!(%href, "Skipping off-domain Vox link");
                continue;
            };
            if url.contains("/the-highlight/") {
                continue;
            }

            let mut headline = element_text(header);
            if let Some(subheading) = next_sibling_element(header) {
                if subheading.value().name() == "p" {
                    headline.push_str(" \n ");
                    headline.push_str(&element_text(subheading));
                }
            }

            articles.push(TopArticle {
                rank,
                href: href.to_string(),
                url,
                headline,
            });
            rank += 1;
        }
        articles
    }

    fn scrape_article(&self, html: &str, url: &str) -> Option<ArticleScrape> {
        let document = Html::parse_document(html);
        let title_selector = Selector::parse(r#"h1[class*="title"]"#).unwrap();
        let content_selector = Selector::parse(r#"div[class*="entry-content"]"#).unwrap();
        let paragraph_selector = Selector::parse("p").unwrap();

        let header = document.select(&title_selector).next()?;
        let mut title = element_text(header);

        if let Some(subtitle) = next_sibling_element(header) {
            let is_summary = subtitle.value().name() == "p"
                && subtitle
                    .value()
                    .attr("class")
                    .is_some_and(|c| c.contains("summary"));
            if is_summary {
                title.push_str(" \n ");
                title.push_str(&element_text(subtitle));
            }
        }

        let content = document.select(&content_selector).next()?;
        let paragraphs: Vec<String> = content.select(&paragraph_selector).map(element_text).collect();

        debug!(%url, paragraphs = paragraphs.len(), "Scraped Vox article");
        Some(ArticleScrape { title, paragraphs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT_PAGE: &str = r#"
        <html><body>
            <div data-analytics-placement="hero-1">
                <h2 class="c-entry-box--compact__title">
                    <a href="https://web.archive.org/web/20200101000000/https://www.vox.com/policy/2020/1/1/lead-story">Lead</a>
                </h2>
                <p>The dek under the lead.</p>
            </div>
            <div data-analytics-placement="hero-2">
                <h2 class="c-entry-box--compact__title">
                    <a href="/web/20200101000000/https://www.vox.com/the-highlight/2020/1/1/editorial">Highlight piece</a>
                </h2>
            </div>
            <div data-analytics-placement="river">
                <h2 class="c-entry-box--compact__title">
                    <a href="/web/20200101000000/https://www.vox.com/culture/2020/1/1/river-story">River story</a>
                </h2>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_hero_placements_only() {
        let articles = VoxScraper.top_article_metadata(FRONT_PAGE);
        assert_eq!(articles.len(), 1);
        assert!(articles[0].headline.starts_with("Lead"));
        assert!(articles[0].headline.contains("The dek under the lead."));
        assert_eq!(articles[0].url, "https://www.vox.com/policy/2020/1/1/lead-story");
    }

    #[test]
    fn test_scrape_article_with_summary() {
        let html = r#"
            <html><body>
                <h1 class="c-page-title">Vox headline</h1>
                <p class="c-entry-summary">The summary line.</p>
                <div class="c-entry-content">
                    <p>Paragraph one.</p>
                    <p>Paragraph two.</p>
                </div>
            </body></html>
        "#;
        let scrape = VoxScraper
            .scrape_article(html, "https://www.vox.com/policy/2020/1/1/lead-story")
            .unwrap();
        assert!(scrape.title.starts_with("Vox headline"));
        assert!(scrape.title.contains("The summary line."));
        assert_eq!(scrape.paragraphs.len(), 2);
    }

    #[test]
    fn test_scrape_article_without_content_is_none() {
        let html = r#"<html><body><h1 class="c-page-title">Title only</h1></body></html>"#;
        assert!(VoxScraper
            .scrape_article(html, "https://www.vox.com/policy/2020/1/1/x")
            .is_none());
    }
}
