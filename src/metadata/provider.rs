//! Trait definition and types for the film metadata provider.
//!
//! The enricher only needs a handful of lookups from the external film
//! database, all keyed by the provider's numeric film or person id.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Search results
// ---------------------------------------------------------------------------

/// One result of a movie search, in the order the provider ranked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchCandidate {
    pub id: i64,
    pub title: String,
    pub popularity: f64,
}

impl SearchCandidate {
    pub fn new(id: i64, title: impl Into<String>, popularity: f64) -> Self {
        Self {
            id,
            title: title.into(),
            popularity,
        }
    }
}

// ---------------------------------------------------------------------------
// Film details
// ---------------------------------------------------------------------------

/// Descriptive details of a movie.
///
/// Fields the provider leaves null come back empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieDetails {
    pub id: i64,
    pub imdb_id: String,
    pub title: String,
    pub original_title: String,
    /// `YYYY-MM-DD`, possibly empty.
    pub release_date: String,
    /// Minutes.
    pub runtime: Option<u32>,
    pub tagline: String,
    pub overview: String,
    /// Image key, relative to the provider's image host.
    pub poster_path: String,
    pub backdrop_path: String,
    pub genres: Vec<String>,
    /// ISO 3166-1 codes.
    pub production_countries: Vec<String>,
}

/// A cast member of a movie.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CastCredit {
    pub id: i64,
    pub character: String,
}

/// A crew member of a movie, listed once per job.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CrewCredit {
    pub id: i64,
    pub job: String,
    pub department: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MovieCredits {
    pub cast: Vec<CastCredit>,
    pub crew: Vec<CrewCredit>,
}

/// Releases of a movie in one country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryReleases {
    /// ISO 3166-1 code.
    pub country: String,
    /// Certification of each release, in provider order (may be empty strings).
    pub certifications: Vec<String>,
}

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonDetails {
    pub id: i64,
    pub name: String,
    pub profile_path: String,
    pub biography: String,
    pub birthday: String,
    pub deathday: String,
    pub imdb_id: String,
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async access to an external film database.
///
/// Implementations handle their own timeouts, rate limiting and retries.
/// Errors are plain `anyhow` errors; callers decide what they mean.
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider has been configured with
    /// credentials and is ready to serve requests.
    fn is_available(&self) -> bool;

    /// Search movies by title, optionally restricted to a release year.
    async fn search_movie(
        &self,
        title: &str,
        year: Option<i32>,
    ) -> anyhow::Result<Vec<SearchCandidate>>;

    async fn movie_details(&self, id: i64) -> anyhow::Result<MovieDetails>;

    async fn movie_credits(&self, id: i64) -> anyhow::Result<MovieCredits>;

    async fn movie_release_dates(&self, id: i64) -> anyhow::Result<Vec<CountryReleases>>;

    async fn person_details(&self, id: i64) -> anyhow::Result<PersonDetails>;

    /// Movie id matching an IMDb title id, `None` when the provider has none.
    async fn find_by_imdb_id(&self, imdb_id: &str) -> anyhow::Result<Option<i64>>;
}
