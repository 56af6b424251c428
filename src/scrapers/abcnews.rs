//! ABC News front-page scraper.
//!
//! The top of the page is a three-story "trio" of figures, each with a
//! caption link, followed by a sidebar headline list. Article URLs here
//! keep their query parameters — ABC keys stories on `?id=…`, stripping
//! it breaks the link.

use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{ArticleScrape, TopArticle};
use crate::scrapers::{clean_archive_url, element_text, next_sibling_element, PublisherScraper};

const TOP_K: usize = 5;

pub struct AbcNewsScraper;

impl PublisherScraper for AbcNewsScraper {
    fn front_page_url(&self) -> &'static str {
        "https://www.abcnews.go.com/"
    }

    fn top_article_metadata(&self, front_page: &str) -> Vec<TopArticle> {
        let document = Html::parse_document(front_page);
        let trio_selector = Selector::parse("div.hp-trio").unwrap();
        let story_selector = Selector::parse("figure.story").unwrap();
        let headlines_selector = Selector::parse("article.headlines a").unwrap();
        let link_selector = Selector::parse("a").unwrap();

        let Some(top_row) = document.select(&trio_selector).next() else {
            debug!("No hp-trio section on this ABC News front page");
            return Vec::new();
        };

        let mut articles = Vec::new();
        let mut rank = 1usize;

        // The trio: each story figure's caption holds the link.
        for story in top_row.select(&story_selector) {
            let Some(caption) = next_sibling_element(story) else {
                continue;
            };
            let Some(link) = caption.select(&link_selector).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = clean_archive_url(self.front_page_url(), href, false) else {
                continue;
            };
            articles.push(TopArticle {
                rank,
                href: href.to_string(),
                url,
                headline: element_text(link),
            });
            rank += 1;
        }

        // The sidebar headline list fills the remaining slots.
        for link in top_row.select(&headlines_selector) {
            if rank > TOP_K {
                break;
            }
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = clean_archive_url(self.front_page_url(), href, false) else {
                continue;
            };
            articles.push(TopArticle {
                rank,
                href: href.to_string(),
                url,
                headline: element_text(link),
            });
            rank += 1;
        }

        articles
    }

    fn scrape_article(&self, html: &str, url: &str) -> Option<ArticleScrape> {
        let document = Html::parse_document(html);
        let headline_selector = Selector::parse("div.Article__Headline").unwrap();
        let content_selector = Selector::parse(r#"[class*="Article__Content"]"#).unwrap();
        let paragraph_selector = Selector::parse("p").unwrap();

        let header = document.select(&headline_selector).next()?;
        let title = element_text(header);

        let body = document.select(&content_selector).next()?;
        let paragraphs: Vec<String> = body.select(&paragraph_selector).map(element_text).collect();

        debug!(%url, paragraphs = paragraphs.len(), "Scraped ABC News article");
        Some(ArticleScrape { title, paragraphs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT_PAGE: &str = r#"
        <html><body>
            <div class="hp-trio">
                <figure class="story"><img src="x.jpg"></figure>
                <figcaption>
                    <a href="https://web.archive.org/web/20200101000000/https://abcnews.go.com/Politics/lead-story?id=100">Lead trio story</a>
                </figcaption>
                <article class="headlines">
                    <a href="/web/20200101000000/https://abcnews.go.com/US/list-one?id=101">List one</a>
                    <a href="javascript:void(0);">Bogus</a>
                    <a href="/web/20200101000000/https://abcnews.go.com/International/list-two?id=102">List two</a>
                </article>
            </div>
        </body></html>
    "#;

    #[test]
    fn test_trio_then_headline_list() {
        let articles = AbcNewsScraper.top_article_metadata(FRONT_PAGE);
        let headlines: Vec<&str> = articles.iter().map(|a| a.headline.as_str()).collect();
        assert_eq!(headlines, vec!["Lead trio story", "List one", "List two"]);
        // Query parameters survive: ABC keys articles on them.
        assert_eq!(articles[0].url, "https://abcnews.go.com/Politics/lead-story?id=100");
        assert_eq!(articles[1].rank, 2);
    }

    #[test]
    fn test_missing_trio_is_empty_not_error() {
        let articles = AbcNewsScraper.top_article_metadata("<html><body></body></html>");
        assert!(articles.is_empty());
    }

    #[test]
    fn test_scrape_article() {
        let html = r#"
            <html><body>
                <div class="Article__Headline">Headline <span>and dek</span></div>
                <section class="Article__Content story">
                    <p>First.</p>
                    <p>Second.</p>
                </section>
            </body></html>
        "#;
        let scrape = AbcNewsScraper
            .scrape_article(html, "https://abcnews.go.com/Politics/story?id=100")
            .unwrap();
        assert_eq!(scrape.title, "Headline and dek");
        assert_eq!(scrape.paragraphs, vec!["First.", "Second."]);
    }

    #[test]
    fn test_scrape_article_unrecognized_page() {
        assert!(AbcNewsScraper
            .scrape_article("<html><body><p>x</p></body></html>", "https://abcnews.go.com/x")
            .is_none());
    }
}
