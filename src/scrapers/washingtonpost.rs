//! Washington Post front-page scraper.
//!
//! The Post sizes its headline type by prominence, and the size lives in
//! the second class token (`headline x-large`, `font--headline small`, …).
//! Conveniently the size names sort lexically in prominence order
//! (huge < large < medium < small < x-small < xx-small), so a stable
//! sort on that token recovers the page's ranking.
//!
//! Opinion chains, podcasts, magazine pieces, and the standalone
//! coronavirus hub page are skipped; they either are not news or break
//! the archive's redirect resolution.

use scraper::{Html, Selector};
use tracing::debug;

use crate::models::{ArticleScrape, TopArticle};
use crate::scrapers::{clean_archive_url, element_text, has_ancestor_class, PublisherScraper};

const TOP_K: usize = 5;

const SKIP_FOLDERS: [&str; 5] = [
    "/podcasts/",
    "/investigations/",
    "/graphics/",
    "/magazine/",
    "/lifestyle/",
];

pub struct WashingtonPostScraper;

impl PublisherScraper for WashingtonPostScraper {
    fn front_page_url(&self) -> &'static str {
        "https://washingtonpost.com"
    }

    fn top_article_metadata(&self, front_page: &str) -> Vec<TopArticle> {
        let document = Html::parse_document(front_page);
        let headline_selector =
            Selector::parse("h1.headline, h2.headline, h3.headline, h1.font--headline, h2.font--headline, h3.font--headline")
                .unwrap();
        let link_selector = Selector::parse("a").unwrap();

        let mut headlines: Vec<_> = document.select(&headline_selector).collect();
        // Stable sort on the size token keeps document order within a size.
        headlines.sort_by_key(|el| size_token(el.value().attr("class")).to_string());

        let mut articles = Vec::new();
        let mut rank = 1usize;
        for headline_el in headlines {
            if rank > TOP_K {
                break;
            }
            if has_ancestor_class(headline_el, "opinions-chain") {
                continue;
            }
            let Some(link) = headline_el.select(&link_selector).next() else {
                continue;
            };
            let Some(href) = link.value().attr("href") else {
                continue;
            };
            let Some(url) = clean_archive_url(self.front_page_url(), href, true) else {
                debug!(%href, "Skipping off-domain Washington Post link");
                continue;
            };
            if SKIP_FOLDERS.iter().any(|s| url.contains(s)) {
                debug!(%url, "Skipping non-news Washington Post section");
                continue;
            }
            // The pandemic hub was pinned to the front page as if it were
            // an article; it is a section page.
            if url == "https://www.washingtonpost.com/coronavirus/" {
                continue;
            }

            articles.push(TopArticle {
                rank,
                href: href.to_string(),
                url,
                headline: element_text(headline_el),
            });
            rank += 1;
        }
        articles
    }

    fn scrape_article(&self, html: &str, url: &str) -> Option<ArticleScrape> {
        let document = Html::parse_document(html);

        // Headline encoding varies by article vintage and template.
        let qa_headline = Selector::parse(r#"h1[data-qa="headline"]"#).unwrap();
        let itemprop_headline = Selector::parse(r#"h1[itemprop="headline"]"#).unwrap();
        let graphics_headline = Selector::parse("h2.pg-h1.balanced-headline").unwrap();

        let (header, graphics) = match document.select(&qa_headline).next() {
            Some(el) => (el, false),
            None => match document.select(&itemprop_headline).next() {
                Some(el) => (el, false),
                // Entertainment one-offs use the graphics template.
                None => (document.select(&graphics_headline).next()?, true),
            },
        };
        let mut title = element_text(header);

        let subhead_selector = if graphics {
            Selector::parse("h1.pg-intro").unwrap()
        } else {
            Selector::parse(r#"h2[data-qa="subheadline"]"#).unwrap()
        };
        if let Some(subheading) = document.select(&subhead_selector).next() {
            title.push_str(" \n ");
            title.push_str(&element_text(subheading));
        }

        let body_selector = Selector::parse(r#"div[class*="article"]"#).unwrap();
        let body = document.select(&body_selector).next()?;
        let paragraph_selector = Selector::parse("p").unwrap();
        let paragraphs: Vec<String> = body.select(&paragraph_selector).map(element_text).collect();

        debug!(%url, paragraphs = paragraphs.len(), "Scraped Washington Post article");
        Some(ArticleScrape { title, paragraphs })
    }
}

fn size_token(class_attr: Option<&str>) -> &str {
    class_attr
        .and_then(|c| c.split_whitespace().nth(1))
        .unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FRONT_PAGE: &str = r#"
        <html><body>
            <h2 class="headline small">
                <a href="https://web.archive.org/web/20200601000000/https://www.washingtonpost.com/politics/third-story/">Third</a>
            </h2>
            <h1 class="headline huge">
                <a href="/web/20200601000000/https://www.washingtonpost.com/national/lead-story/">Lead</a>
            </h1>
            <h3 class="font--headline large">
                <a href="/web/20200601000000/https://www.washingtonpost.com/world/second-story/">Second</a>
            </h3>
            <div class="opinions-chain">
                <h2 class="headline medium">
                    <a href="/web/20200601000000/https://www.washingtonpost.com/opinions/skipped/">Hot take</a>
                </h2>
            </div>
            <h2 class="headline medium">
                <a href="/web/20200601000000/https://www.washingtonpost.com/podcasts/episode/">Podcast</a>
            </h2>
            <h2 class="headline medium">
                <a href="/web/20200601000000/https://www.washingtonpost.com/coronavirus/">Pandemic hub</a>
            </h2>
        </body></html>
    "#;

    #[test]
    fn test_ranking_by_type_size() {
        let articles = WashingtonPostScraper.top_article_metadata(FRONT_PAGE);
        let headlines: Vec<&str> = articles.iter().map(|a| a.headline.as_str()).collect();
        assert_eq!(headlines, vec!["Lead", "Second", "Third"]);
        assert_eq!(articles[0].url, "https://www.washingtonpost.com/national/lead-story/");
    }

    #[test]
    fn test_opinion_chain_and_sections_skipped() {
        let articles = WashingtonPostScraper.top_article_metadata(FRONT_PAGE);
        assert!(articles.iter().all(|a| !a.headline.contains("Hot take")));
        assert!(articles.iter().all(|a| !a.url.contains("/podcasts/")));
        assert!(articles.iter().all(|a| !a.url.ends_with("/coronavirus/")));
    }

    #[test]
    fn test_scrape_article_with_subheadline() {
        let html = r#"
            <html><body>
                <h1 data-qa="headline">Main headline</h1>
                <h2 data-qa="subheadline">The dek</h2>
                <div class="article-body">
                    <p>First paragraph.</p>
                    <p>Second paragraph.</p>
                </div>
            </body></html>
        "#;
        let scrape = WashingtonPostScraper
            .scrape_article(html, "https://www.washingtonpost.com/national/story/")
            .unwrap();
        assert!(scrape.title.starts_with("Main headline"));
        assert!(scrape.title.contains("The dek"));
        assert_eq!(scrape.paragraphs.len(), 2);
    }

    #[test]
    fn test_scrape_article_itemprop_fallback() {
        let html = r#"
            <html><body>
                <h1 itemprop="headline">Older template</h1>
                <div class="main-article"><p>Body.</p></div>
            </body></html>
        "#;
        let scrape = WashingtonPostScraper
            .scrape_article(html, "https://www.washingtonpost.com/national/story/")
            .unwrap();
        assert_eq!(scrape.title, "Older template");
    }

    #[test]
    fn test_scrape_article_unrecognized_page() {
        let html = "<html><body><p>Not an article.</p></body></html>";
        assert!(WashingtonPostScraper
            .scrape_article(html, "https://www.washingtonpost.com/national/story/")
            .is_none());
    }
}
