//! Film metadata: the provider seam, the TMDB client, rating scrapers and
//! the enricher that ties them together.
//!
//! # Module layout
//!
//! - [`provider`] -- Trait definition and shared data types.
//! - [`providers`] -- Concrete provider implementations (TMDB).
//! - [`ratings`] -- IMDb and Letterboxd rating scrapers.
//! - [`links`] -- TMDB ids from TMDB, IMDb and Letterboxd links.
//! - [`enrichment`] -- Entry building, id resolution and detail filling.

pub mod enrichment;
pub mod links;
pub mod provider;
pub mod providers;
pub mod ratings;

pub use enrichment::{pick_best_candidate, Enricher};
pub use links::LinkResolver;
pub use provider::{
    CastCredit, CountryReleases, CrewCredit, MetadataProvider, MovieCredits, MovieDetails,
    PersonDetails, SearchCandidate,
};
pub use providers::TmdbProvider;
pub use ratings::{ImdbScraper, LetterboxdScraper, RatingScraper};
