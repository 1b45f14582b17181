//! TMDB ids from film page links.
//!
//! Used to re-link a catalog entry by hand when the automatic match picked
//! the wrong film. Three kinds of links are understood:
//!
//! - `https://www.themoviedb.org/movie/1817` or `/movie/1817-phone-booth`
//! - `https://www.imdb.com/title/tt0183649/`, looked up through the provider
//! - `https://letterboxd.com/film/phone-booth/`, whose page links to TMDB

use std::sync::Arc;

use reqwest::Url;
use starfin_common::{Error, Result};
use tracing::debug;

use super::provider::MetadataProvider;
use super::ratings::first_attr;

const LETTERBOXD_TMDB_LINK_SELECTOR: &str = "a[data-track-action=TMDb]";

fn parse_url(link: &str) -> Result<Url> {
    Url::parse(link.trim()).map_err(|e| Error::invalid_input(format!("bad link {link:?}: {e}")))
}

/// Movie id of a themoviedb.org movie URL.
pub fn tmdb_id_from_tmdb_url(link: &str) -> Result<i64> {
    let url = parse_url(link)?;
    let rest = url
        .path()
        .strip_prefix("/movie/")
        .ok_or_else(|| Error::invalid_input(format!("not a TMDB movie link: {link}")))?;

    let id = rest
        .trim_end_matches('/')
        .split('-')
        .next()
        .unwrap_or_default();
    id.parse::<i64>()
        .map_err(|_| Error::invalid_input(format!("could not parse TMDB link: {link}")))
}

/// IMDb title id (`tt…`) of an imdb.com title URL.
pub fn imdb_id_from_url(link: &str) -> Result<String> {
    let url = parse_url(link)?;
    url.path()
        .strip_prefix("/title/")
        .and_then(|rest| rest.split('/').next())
        .filter(|id| id.starts_with("tt") && id.len() > 2)
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_input(format!("not an IMDb title link: {link}")))
}

/// The TMDB link found on a Letterboxd film page.
pub fn tmdb_link_from_letterboxd_page(html: &str) -> Result<Option<String>> {
    first_attr(html, LETTERBOXD_TMDB_LINK_SELECTOR, "href").map_err(|e| Error::internal(e.to_string()))
}

/// Turns supported film links into TMDB ids.
pub struct LinkResolver {
    provider: Arc<dyn MetadataProvider>,
    client: reqwest::Client,
}

impl LinkResolver {
    pub fn new(provider: Arc<dyn MetadataProvider>) -> Self {
        Self {
            provider,
            client: reqwest::Client::new(),
        }
    }

    /// TMDB id of the film a link points to.
    ///
    /// Unknown hosts and malformed links are `InvalidInput`; network or
    /// provider failures are `Unavailable`; a link to a film the provider
    /// does not know is `NotFound`.
    pub async fn tmdb_id_from_link(&self, link: &str) -> Result<i64> {
        let url = parse_url(link)?;
        let host = url.host_str().unwrap_or_default();
        debug!(host = %host, "Resolving film link");

        match host.trim_start_matches("www.") {
            "themoviedb.org" => tmdb_id_from_tmdb_url(link),
            "imdb.com" | "m.imdb.com" => {
                let imdb_id = imdb_id_from_url(link)?;
                self.provider
                    .find_by_imdb_id(&imdb_id)
                    .await
                    .map_err(|e| Error::unavailable(format!("{e:#}")))?
                    .ok_or_else(|| Error::not_found(format!("no TMDB film for {imdb_id}")))
            }
            "letterboxd.com" => {
                let page = self.fetch(url).await?;
                let tmdb_link = tmdb_link_from_letterboxd_page(&page)?.ok_or_else(|| {
                    Error::not_found(format!("no TMDB link on Letterboxd page {link}"))
                })?;
                tmdb_id_from_tmdb_url(&tmdb_link)
            }
            _ => Err(Error::invalid_input(format!("unsupported link host: {host}"))),
        }
    }

    async fn fetch(&self, url: Url) -> Result<String> {
        let unavailable = |e: reqwest::Error| Error::unavailable(e.to_string());
        self.client
            .get(url)
            .send()
            .await
            .and_then(|resp| resp.error_for_status())
            .map_err(unavailable)?
            .text()
            .await
            .map_err(unavailable)
    }
}
