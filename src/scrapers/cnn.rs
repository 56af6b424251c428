//! CNN front-page scraper.
//!
//! CNN's front page does not expose an explicit ranking, but its
//! `data-analytics` tags do: the hierarchical-xs lead article comes
//! first, then the large-vertical placements, then the remaining
//! hierarchical items in document order. Video articles carry different
//! analytics tags and fall out naturally.
//!
//! Opinion pieces live under an `/opinions/` folder (likewise `/style/`
//! and `/interactive/` specials) and are skipped by URL.

use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{ArticleScrape, TopArticle};
use crate::scrapers::{clean_archive_url, element_text, PublisherScraper};

const TOP_K: usize = 10;

const ANALYTICS_TAGS: [&str; 3] = [
    "_list-hierarchical-xs_article_",
    "_list-large-vertical_article_",
    "_list-hierarchical-xs_hyperlink_",
];

pub struct CnnScraper;

impl PublisherScraper for CnnScraper {
    fn front_page_url(&self) -> &'static str {
        "https://www.cnn.com"
    }

    fn top_article_metadata(&self, front_page: &str) -> Vec<TopArticle> {
        let document = Html::parse_document(front_page);
        let headline_selector = Selector::parse("h3.cd__headline").unwrap();
        let link_selector = Selector::parse("a").unwrap();
        let text_selector = Selector::parse("span.cd__headline-text").unwrap();

        let tagged: Vec<_> = document
            .select(&headline_selector)
            .filter(|el| {
                el.value()
                    .attr("data-analytics")
                    .is_some_and(|tag| ANALYTICS_TAGS.contains(&tag))
            })
            .collect();

        // Reconstruct the page's internal rank: the lead article first,
        // then the large-vertical placements, then everything else in
        // document order.
        let mut ordered = Vec::with_capacity(tagged.len());
        let mut rest = Vec::new();
        let mut iter = tagged.into_iter();
        if let Some(first) = iter.next() {
            ordered.push(first);
        }
        for el in iter {
            if el.value().attr("data-analytics") == Some("_list-large-vertical_article_") {
                ordered.push(el);
            } else {
                rest.push(el);
            }
        }
        ordered.extend(rest);

        let mut articles = Vec::new();
        let mut rank = 1usize;
        for headline_el in ordered {
            if rank > TOP_K {
                break;
            }
            let Some(link) = headline_el.select(&link_selector).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = clean_archive_url(self.front_page_url(), href, true) else {
                debug!(%href, "Skipping off-domain CNN link");
                continue;
            };
            if ["/opinions/", "/style/", "/interactive/"]
                .iter()
                .any(|s| url.contains(s))
            {
                continue;
            }

            let headline = headline_el
                .select(&text_selector)
                .next()
                .map(element_text)
                .unwrap_or_else(|| element_text(headline_el));

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
        let body_selector = Selector::parse("article").unwrap();
        let body = document.select(&body_selector).next()?;

        let (title, paragraphs) = if url.contains("live-news") {
            // Live-news pages interleave sub-headlines and quotes with the
            // updates, so keep h2s in the body.
            let h1 = Selector::parse("h1").unwrap();
            let title = element_text(document.select(&h1).next()?);
            let section = Selector::parse("p, blockquote, h2").unwrap();
            let paragraphs: Vec<String> = body.select(&section).map(element_text).collect();
            (title, paragraphs)
        } else {
            let h1 = Selector::parse("h1.pg-headline").unwrap();
            let title = element_text(document.select(&h1).next()?);
            let section = Selector::parse("p, blockquote").unwrap();
            let paragraphs: Vec<String> = body.select(&section).map(element_text).collect();
            if paragraphs
                .first()
                .is_some_and(|p| p.to_lowercase().starts_with("opinion"))
            {
                return None;
            }
            (title, paragraphs)
        };

        // The leading paragraph is the byline/caption block.
        Some(ArticleScrape {
            title,
            paragraphs: paragraphs.into_iter().skip(1).collect(),
        })
    }
}
