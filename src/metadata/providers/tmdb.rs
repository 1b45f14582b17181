//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] by querying the TMDB v3 REST API.
//!
//! Features:
//! - Token-bucket rate limiting at 4 requests / second via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support (max 3 retries).
//! - 30-second request timeout.
//! - Configurable base URL, so tests can point it at a local mock server.

use std::num::NonZeroU32;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::TmdbConfig;
use crate::metadata::provider::{
    CastCredit, CountryReleases, CrewCredit, MetadataProvider, MovieCredits, MovieDetails,
    PersonDetails, SearchCandidate,
};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const REQUESTS_PER_SECOND: NonZeroU32 = match NonZeroU32::new(4) {
    Some(n) => n,
    None => NonZeroU32::MIN,
};

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<TmdbMovieSearchResult>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieSearchResult {
    id: i64,
    title: Option<String>,
    popularity: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct TmdbMovieDetail {
    id: i64,
    imdb_id: Option<String>,
    title: Option<String>,
    original_title: Option<String>,
    release_date: Option<String>,
    runtime: Option<u32>,
    tagline: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    genres: Option<Vec<TmdbGenre>>,
    production_countries: Option<Vec<TmdbCountry>>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCountry {
    iso_3166_1: String,
}

#[derive(Debug, Deserialize)]
struct TmdbCredits {
    #[serde(default)]
    cast: Vec<TmdbCast>,
    #[serde(default)]
    crew: Vec<TmdbCrew>,
}

#[derive(Debug, Deserialize)]
struct TmdbCast {
    id: i64,
    character: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbCrew {
    id: i64,
    job: Option<String>,
    department: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbReleaseDatesResponse {
    #[serde(default)]
    results: Vec<TmdbCountryReleases>,
}

#[derive(Debug, Deserialize)]
struct TmdbCountryReleases {
    iso_3166_1: String,
    #[serde(default)]
    release_dates: Vec<TmdbRelease>,
}

#[derive(Debug, Deserialize)]
struct TmdbRelease {
    certification: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbPerson {
    id: i64,
    name: Option<String>,
    profile_path: Option<String>,
    biography: Option<String>,
    birthday: Option<String>,
    deathday: Option<String>,
    imdb_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TmdbFindResponse {
    #[serde(default)]
    movie_results: Vec<TmdbFindMovie>,
}

#[derive(Debug, Deserialize)]
struct TmdbFindMovie {
    id: i64,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// Wraps the TMDB v3 REST API with built-in rate limiting and retry logic.
///
/// # Examples
///
/// ```no_run
/// use starfin::metadata::providers::TmdbProvider;
///
/// let provider = TmdbProvider::new("your-api-key".into(), "en-US".into()).unwrap();
/// ```
pub struct TmdbProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    language: String,
    rate_limiter: governor::RateLimiter<
        governor::state::NotKeyed,
        governor::state::InMemoryState,
        governor::clock::DefaultClock,
    >,
}

impl TmdbProvider {
    /// Create a new TMDB provider with the given API key and language.
    ///
    /// The `language` parameter should be a language tag such as `"en-US"`.
    /// Rate limiting is configured at 4 requests per second.
    pub fn new(api_key: String, language: String) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build TMDB HTTP client")?;

        Ok(Self {
            client,
            base_url: TMDB_BASE_URL.to_string(),
            api_key,
            language,
            rate_limiter: RateLimiter::direct(Quota::per_second(REQUESTS_PER_SECOND)),
        })
    }

    pub fn from_config(config: &TmdbConfig) -> anyhow::Result<Self> {
        Ok(Self::new(config.api_key.clone(), config.language.clone())?
            .with_base_url(&config.base_url))
    }

    /// Point the provider at another API root (no trailing slash needed).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, path: &str, params: &[(&str, &str)]) -> anyhow::Result<reqwest::Response> {
        let url = format!("{}{}", self.base_url, path);
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            let resp = self
                .client
                .get(&url)
                .query(&[
                    ("api_key", self.api_key.as_str()),
                    ("language", self.language.as_str()),
                ])
                .query(params)
                .send()
                .await
                .with_context(|| format!("TMDB request failed: {path}"))?;

            if resp.status() == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    retry = retries,
                    wait_secs = wait,
                    "TMDB returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            let resp = resp
                .error_for_status()
                .with_context(|| format!("TMDB request returned error: {path}"))?;

            return Ok(resp);
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, &str)],
    ) -> anyhow::Result<T> {
        debug!(path = %path, "TMDB request");
        self.get(path, params)
            .await?
            .json()
            .await
            .with_context(|| format!("failed to parse TMDB response: {path}"))
    }
}

impl From<TmdbMovieDetail> for MovieDetails {
    fn from(detail: TmdbMovieDetail) -> Self {
        Self {
            id: detail.id,
            imdb_id: detail.imdb_id.unwrap_or_default(),
            title: detail.title.unwrap_or_default(),
            original_title: detail.original_title.unwrap_or_default(),
            release_date: detail.release_date.unwrap_or_default(),
            runtime: detail.runtime,
            tagline: detail.tagline.unwrap_or_default(),
            overview: detail.overview.unwrap_or_default(),
            poster_path: detail.poster_path.unwrap_or_default(),
            backdrop_path: detail.backdrop_path.unwrap_or_default(),
            genres: detail
                .genres
                .unwrap_or_default()
                .into_iter()
                .map(|g| g.name)
                .collect(),
            production_countries: detail
                .production_countries
                .unwrap_or_default()
                .into_iter()
                .map(|c| c.iso_3166_1)
                .collect(),
        }
    }
}

impl From<TmdbCredits> for MovieCredits {
    fn from(credits: TmdbCredits) -> Self {
        Self {
            cast: credits
                .cast
                .into_iter()
                .map(|c| CastCredit {
                    id: c.id,
                    character: c.character.unwrap_or_default(),
                })
                .collect(),
            crew: credits
                .crew
                .into_iter()
                .map(|c| CrewCredit {
                    id: c.id,
                    job: c.job.unwrap_or_default(),
                    department: c.department.unwrap_or_default(),
                })
                .collect(),
        }
    }
}

impl From<TmdbPerson> for PersonDetails {
    fn from(person: TmdbPerson) -> Self {
        Self {
            id: person.id,
            name: person.name.unwrap_or_default(),
            profile_path: person.profile_path.unwrap_or_default(),
            biography: person.biography.unwrap_or_default(),
            birthday: person.birthday.unwrap_or_default(),
            deathday: person.deathday.unwrap_or_default(),
            imdb_id: person.imdb_id.unwrap_or_default(),
        }
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        "tmdb"
    }

    fn is_available(&self) -> bool {
        !self.api_key.is_empty()
    }

    async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> anyhow::Result<Vec<SearchCandidate>> {
        let year = year.map(|y| y.to_string());
        let mut params = vec![("query", title)];
        if let Some(ref y) = year {
            params.push(("year", y.as_str()));
        }

        let body: TmdbSearchResponse = self.get_json("/search/movie", &params).await?;

        // Provider order matters to candidate selection, keep it.
        Ok(body
            .results
            .into_iter()
            .map(|r| SearchCandidate {
                id: r.id,
                title: r.title.unwrap_or_default(),
                popularity: r.popularity.unwrap_or_default(),
            })
            .collect())
    }

    async fn movie_details(&self, id: i64) -> anyhow::Result<MovieDetails> {
        let detail: TmdbMovieDetail = self.get_json(&format!("/movie/{id}"), &[]).await?;
        Ok(detail.into())
    }

    async fn movie_credits(&self, id: i64) -> anyhow::Result<MovieCredits> {
        let credits: TmdbCredits = self
            .get_json(&format!("/movie/{id}/credits"), &[])
            .await?;
        Ok(credits.into())
    }

    async fn movie_release_dates(&self, id: i64) -> anyhow::Result<Vec<CountryReleases>> {
        let body: TmdbReleaseDatesResponse = self
            .get_json(&format!("/movie/{id}/release_dates"), &[])
            .await?;

        Ok(body
            .results
            .into_iter()
            .map(|country| CountryReleases {
                country: country.iso_3166_1,
                certifications: country
                    .release_dates
                    .into_iter()
                    .map(|r| r.certification.unwrap_or_default())
                    .collect(),
            })
            .collect())
    }

    async fn person_details(&self, id: i64) -> anyhow::Result<PersonDetails> {
        let person: TmdbPerson = self.get_json(&format!("/person/{id}"), &[]).await?;
        Ok(person.into())
    }

    async fn find_by_imdb_id(&self, imdb_id: &str) -> anyhow::Result<Option<i64>> {
        let body: TmdbFindResponse = self
            .get_json(
                &format!("/find/{imdb_id}"),
                &[("external_source", "imdb_id")],
            )
            .await?;
        Ok(body.movie_results.first().map(|m| m.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detail_nulls_become_empty() {
        let detail: TmdbMovieDetail = serde_json::from_str(
            r#"{
                "id": 949,
                "imdb_id": "tt0113277",
                "title": "Heat",
                "original_title": "Heat",
                "release_date": "1995-12-15",
                "runtime": 170,
                "tagline": null,
                "overview": "Obsessive master thief Neil McCauley...",
                "poster_path": "/umSVjVdbVwtx5ryCA2QXL44Durm.jpg",
                "backdrop_path": null,
                "genres": [{"id": 28, "name": "Action"}, {"id": 80, "name": "Crime"}],
                "production_countries": [{"iso_3166_1": "US", "name": "United States of America"}]
            }"#,
        )
        .unwrap();

        let details = MovieDetails::from(detail);
        assert_eq!(details.imdb_id, "tt0113277");
        assert_eq!(details.runtime, Some(170));
        assert_eq!(details.tagline, "");
        assert_eq!(details.backdrop_path, "");
        assert_eq!(details.genres, vec!["Action", "Crime"]);
        assert_eq!(details.production_countries, vec!["US"]);
    }

    #[test]
    fn credits_conversion() {
        let credits: TmdbCredits = serde_json::from_str(
            r#"{
                "id": 949,
                "cast": [{"id": 1158, "character": "Lt. Vincent Hanna"}],
                "crew": [{"id": 638, "job": "Director", "department": "Directing"},
                         {"id": 638, "job": "Screenplay", "department": "Writing"}]
            }"#,
        )
        .unwrap();

        let credits = MovieCredits::from(credits);
        assert_eq!(credits.cast[0].character, "Lt. Vincent Hanna");
        assert_eq!(credits.crew.len(), 2);
        assert_eq!(credits.crew[1].department, "Writing");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = TmdbProvider::new("key".into(), "en-US".into())
            .unwrap()
            .with_base_url("http://localhost:8080/3/");
        assert_eq!(provider.base_url, "http://localhost:8080/3");
    }

    #[test]
    fn provider_is_available() {
        let provider = TmdbProvider::new("test-key".into(), "en-US".into()).unwrap();
        assert!(provider.is_available());

        let empty = TmdbProvider::new(String::new(), "en-US".into()).unwrap();
        assert!(!empty.is_available());
    }

    #[test]
    fn provider_name() {
        let provider = TmdbProvider::new("key".into(), "en-US".into()).unwrap();
        assert_eq!(provider.name(), "tmdb");
    }
}
