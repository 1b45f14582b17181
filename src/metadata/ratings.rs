//! Audience ratings scraped from IMDb and Letterboxd pages.
//!
//! Neither site has a public API, so the ratings are read from fixed places
//! in their HTML. Page layouts change; a scraper that stops finding its
//! element returns an error and the rating stays empty.

use std::time::Duration;

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use scraper::{Html, Selector};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const IMDB_BASE_URL: &str = "https://www.imdb.com";
const IMDB_RATING_SELECTOR: &str = "#__next > main > div > section > section > div:nth-child(4) > section > section > div > div > div > div:nth-child(1) > a > div > div > div > div > span";

const LETTERBOXD_BASE_URL: &str = "https://letterboxd.com";
const LETTERBOXD_SEARCH_RESULT_SELECTOR: &str =
    "#content > div > div > section > ul > li:nth-child(1) > div";
const LETTERBOXD_RATING_SELECTOR: &str = "a.display-rating";

/// A site a film rating can be read from.
#[async_trait]
pub trait RatingScraper: Send + Sync {
    fn name(&self) -> &'static str;

    /// Rating of the film with this IMDb id, as the site displays it.
    async fn rating(&self, imdb_id: &str) -> anyhow::Result<String>;
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e:?}"))
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .context("failed to build HTTP client")
}

async fn fetch_page(client: &reqwest::Client, url: &str) -> anyhow::Result<String> {
    client
        .get(url)
        .send()
        .await
        .with_context(|| format!("request failed: {url}"))?
        .error_for_status()
        .with_context(|| format!("request returned error: {url}"))?
        .text()
        .await
        .with_context(|| format!("unreadable page: {url}"))
}

/// Trimmed text of the first element matching `css`, if any.
pub(crate) fn first_text(html: &str, css: &str) -> anyhow::Result<Option<String>> {
    let selector = selector(css)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string()))
}

/// Value of `attribute` on the first element matching `css`, if any.
pub(crate) fn first_attr(html: &str, css: &str, attribute: &str) -> anyhow::Result<Option<String>> {
    let selector = selector(css)?;
    let document = Html::parse_document(html);
    Ok(document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr(attribute))
        .map(str::to_string))
}

// ---------------------------------------------------------------------------
// IMDb
// ---------------------------------------------------------------------------

/// Reads the rating off the film's IMDb title page.
pub struct ImdbScraper {
    client: reqwest::Client,
    base_url: String,
}

impl ImdbScraper {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: IMDB_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Rating shown on an IMDb title page.
pub fn parse_imdb_rating(html: &str) -> anyhow::Result<Option<String>> {
    first_text(html, IMDB_RATING_SELECTOR)
}

#[async_trait]
impl RatingScraper for ImdbScraper {
    fn name(&self) -> &'static str {
        "imdb"
    }

    async fn rating(&self, imdb_id: &str) -> anyhow::Result<String> {
        let page = fetch_page(&self.client, &format!("{}/title/{}/", self.base_url, imdb_id)).await?;
        parse_imdb_rating(&page)?.ok_or_else(|| anyhow!("no rating on IMDb page of {imdb_id}"))
    }
}

// ---------------------------------------------------------------------------
// Letterboxd
// ---------------------------------------------------------------------------

/// Finds the film through Letterboxd's search, then reads its rating
/// histogram fragment.
pub struct LetterboxdScraper {
    client: reqwest::Client,
    base_url: String,
}

impl LetterboxdScraper {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            client: http_client()?,
            base_url: LETTERBOXD_BASE_URL.to_string(),
        })
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }
}

/// Film link (e.g. `/film/heat-1995/`) of the first search result.
pub fn parse_letterboxd_film_link(html: &str) -> anyhow::Result<Option<String>> {
    first_attr(html, LETTERBOXD_SEARCH_RESULT_SELECTOR, "data-target-link")
}

/// Average rating displayed in a rating histogram fragment.
pub fn parse_letterboxd_rating(html: &str) -> anyhow::Result<Option<String>> {
    first_text(html, LETTERBOXD_RATING_SELECTOR)
}

#[async_trait]
impl RatingScraper for LetterboxdScraper {
    fn name(&self) -> &'static str {
        "letterboxd"
    }

    async fn rating(&self, imdb_id: &str) -> anyhow::Result<String> {
        let search =
            fetch_page(&self.client, &format!("{}/search/films/{}/", self.base_url, imdb_id))
                .await?;
        let link = parse_letterboxd_film_link(&search)?
            .ok_or_else(|| anyhow!("{imdb_id} not found on Letterboxd"))?;

        let histogram = fetch_page(
            &self.client,
            &format!("{}/csi{}rating-histogram/", self.base_url, link),
        )
        .await?;
        parse_letterboxd_rating(&histogram)?
            .ok_or_else(|| anyhow!("no rating on Letterboxd page of {imdb_id}"))
    }
}
