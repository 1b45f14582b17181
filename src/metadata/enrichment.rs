//! Building catalog entries from files and enriching them with metadata.
//!
//! The [`Enricher`] turns a media path into a [`Film`] (filename guess,
//! technical probe, sidecar subtitles), resolves the film's TMDB id and
//! fills in descriptive details, credits and third-party ratings.
//!
//! Nothing here writes to the catalog. External failures are logged and
//! leave the affected fields blank.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use starfin_common::{Error, Result, VolumeId};
use starfin_db::{CastMember, Film, MediaInfo, Person, VolumeFile};
use tracing::{debug, info, warn};

use super::links::LinkResolver;
use super::provider::{CountryReleases, MetadataProvider, MovieCredits, SearchCandidate};
use super::ratings::RatingScraper;
use crate::probe::MediaProbe;
use crate::scanner::subtitles_for;

/// Pick the film a search most likely refers to.
///
/// Walks the candidates in provider order, keeping the most popular one
/// whose title is within a third of the name's length in edit distance.
/// The first candidate with a positive popularity is always taken, so a
/// popular but dissimilar result can still win when nothing closer is
/// more popular.
pub fn pick_best_candidate(name: &str, candidates: &[SearchCandidate]) -> Option<i64> {
    let threshold = name.chars().count() / 3;
    let mut best = None;
    let mut most_popular = 0.0;

    for candidate in candidates {
        if candidate.popularity > most_popular
            && (strsim::levenshtein(name, &candidate.title) < threshold || best.is_none())
        {
            best = Some(candidate.id);
            most_popular = candidate.popularity;
        }
    }

    best
}

/// Certification of the first US release, empty when there is none.
fn us_classification(releases: &[CountryReleases]) -> String {
    releases
        .iter()
        .find(|country| country.country == "US")
        .and_then(|country| country.certifications.first())
        .cloned()
        .unwrap_or_default()
}

fn apply_credits(film: &mut Film, credits: MovieCredits) {
    film.directors.clear();
    film.writers.clear();

    for crew in &credits.crew {
        if crew.job == "Director" {
            film.directors.push(crew.id);
        }
        if crew.department == "Writing" && !film.writers.contains(&crew.id) {
            film.writers.push(crew.id);
        }
    }

    film.cast = credits
        .cast
        .into_iter()
        .map(|cast| CastMember {
            character: cast.character,
            actor_id: cast.id,
        })
        .collect();
}

/// Builds and enriches catalog entries.
pub struct Enricher {
    provider: Arc<dyn MetadataProvider>,
    probe: Arc<dyn MediaProbe>,
    imdb: Option<Arc<dyn RatingScraper>>,
    letterboxd: Option<Arc<dyn RatingScraper>>,
    links: LinkResolver,
}

impl Enricher {
    /// An enricher that does not scrape ratings.
    pub fn new(provider: Arc<dyn MetadataProvider>, probe: Arc<dyn MediaProbe>) -> Self {
        Self {
            links: LinkResolver::new(provider.clone()),
            provider,
            probe,
            imdb: None,
            letterboxd: None,
        }
    }

    pub fn with_ratings(
        mut self,
        imdb: Arc<dyn RatingScraper>,
        letterboxd: Arc<dyn RatingScraper>,
    ) -> Self {
        self.imdb = Some(imdb);
        self.letterboxd = Some(letterboxd);
        self
    }

    pub fn provider(&self) -> &Arc<dyn MetadataProvider> {
        &self.provider
    }

    /// Build an unenriched entry holding exactly one volume file.
    ///
    /// `subtitle_paths` are candidates; only those belonging to `path` are
    /// attached. A failed probe leaves the technical fields blank.
    pub async fn create_entry(
        &self,
        path: &Path,
        volume_id: VolumeId,
        subtitle_paths: &[PathBuf],
    ) -> Film {
        let mut parsed = starfin_parser::parse_path(path);
        let media_info = self.probe_file(path).await;
        parsed.fill_resolution(&media_info.resolution);

        let mut volume_file = VolumeFile::new(path, volume_id);
        volume_file.subtitles = subtitles_for(path, subtitle_paths);
        volume_file.media_info = media_info;

        let mut film = Film::with_volume_file(volume_file);
        film.name = parsed.name;
        film.release_year = parsed.year;
        film.resolution = parsed.resolution;

        debug!(
            path = %path.display(),
            name = %film.name,
            year = film.release_year,
            resolution = %film.resolution,
            "Built entry from file"
        );
        film
    }

    async fn probe_file(&self, path: &Path) -> MediaInfo {
        let probe = self.probe.clone();
        let owned = path.to_path_buf();
        match tokio::task::spawn_blocking(move || probe.probe(&owned)).await {
            Ok(Ok(info)) => info,
            Ok(Err(e)) => {
                warn!(path = %path.display(), "Could not probe media file: {}", e);
                MediaInfo::default()
            }
            Err(e) => {
                warn!(path = %path.display(), "Media probe task failed: {}", e);
                MediaInfo::default()
            }
        }
    }

    /// Find the film's TMDB id from its guessed name and year.
    pub async fn resolve_external_id(&self, film: &mut Film) -> Result<()> {
        let year = (film.release_year != 0).then_some(film.release_year);
        let candidates = self
            .provider
            .search_movie(&film.name, year)
            .await
            .map_err(|e| {
                Error::unavailable(format!("{} search failed: {:#}", self.provider.name(), e))
            })?;

        if candidates.is_empty() {
            return Err(Error::not_found(format!("film {:?}", film.name)));
        }

        let tmdb_id = pick_best_candidate(&film.name, &candidates).ok_or_else(|| {
            Error::not_found(format!("no popular candidate for film {:?}", film.name))
        })?;

        debug!(name = %film.name, tmdb_id, "Resolved TMDB id");
        film.tmdb_id = Some(tmdb_id);
        Ok(())
    }

    /// Fill descriptive fields, credits and ratings of a resolved film.
    ///
    /// Details, release dates and credits are fetched concurrently and fail
    /// independently; each failure is logged and leaves its fields as they
    /// were.
    pub async fn fill_details(&self, film: &mut Film) {
        let Some(tmdb_id) = film.tmdb_id else {
            warn!(name = %film.name, "Cannot fill details of a film without TMDB id");
            return;
        };

        let (details, releases, credits) = tokio::join!(
            self.provider.movie_details(tmdb_id),
            self.provider.movie_release_dates(tmdb_id),
            self.provider.movie_credits(tmdb_id),
        );

        match details {
            Ok(details) => {
                film.imdb_id = details.imdb_id;
                film.title = details.title;
                film.original_title = details.original_title;
                film.year = details.release_date.chars().take(4).collect();
                film.runtime = details.runtime.map(|r| r.to_string()).unwrap_or_default();
                film.tagline = details.tagline;
                film.overview = details.overview;
                film.poster_path = details.poster_path;
                film.backdrop_path = details.backdrop_path;
                film.genres = details.genres;
                film.countries = details.production_countries;
            }
            Err(e) => warn!(tmdb_id, "Unable to fetch film details: {:#}", e),
        }

        match releases {
            Ok(releases) => film.classification = us_classification(&releases),
            Err(e) => warn!(tmdb_id, "Unable to fetch film release dates: {:#}", e),
        }

        match credits {
            Ok(credits) => apply_credits(film, credits),
            Err(e) => warn!(tmdb_id, "Unable to fetch film credits: {:#}", e),
        }

        if !film.imdb_id.is_empty() {
            let (imdb, letterboxd) = tokio::join!(
                self.scrape(self.imdb.as_deref(), &film.imdb_id),
                self.scrape(self.letterboxd.as_deref(), &film.imdb_id),
            );
            film.imdb_rating = imdb;
            film.letterboxd_rating = letterboxd;
        }
    }

    async fn scrape(&self, scraper: Option<&dyn RatingScraper>, imdb_id: &str) -> String {
        let Some(scraper) = scraper else {
            return String::new();
        };
        match scraper.rating(imdb_id).await {
            Ok(rating) => rating,
            Err(e) => {
                warn!(imdb_id = %imdb_id, source = scraper.name(), "Cannot fetch rating: {:#}", e);
                String::new()
            }
        }
    }

    /// Resolve and fill in one go; an unresolved film is titled after its
    /// guessed name.
    pub async fn enrich(&self, film: &mut Film) {
        match self.resolve_external_id(film).await {
            Ok(()) => self.fill_details(film).await,
            Err(e) => {
                info!(name = %film.name, "Film stays unidentified: {}", e);
                film.title = film.name.clone();
            }
        }
    }

    /// Details of a cast or crew member, or a placeholder holding only the
    /// TMDB id when they cannot be fetched.
    pub async fn person_details(&self, tmdb_id: i64) -> Person {
        match self.provider.person_details(tmdb_id).await {
            Ok(details) => Person {
                tmdb_id,
                name: details.name,
                photo: details.profile_path,
                bio: details.biography,
                birthday: details.birthday,
                deathday: details.deathday,
                imdb_id: details.imdb_id,
                ..Person::placeholder(tmdb_id)
            },
            Err(e) => {
                warn!(tmdb_id, "Unable to fetch person details: {:#}", e);
                Person::placeholder(tmdb_id)
            }
        }
    }

    /// TMDB id of the film a TMDB, IMDb or Letterboxd link points to.
    pub async fn tmdb_id_from_link(&self, link: &str) -> Result<i64> {
        self.links.tmdb_id_from_link(link).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: i64, title: &str, popularity: f64) -> SearchCandidate {
        SearchCandidate::new(id, title, popularity)
    }

    #[test]
    fn closest_popular_title_wins() {
        let candidates = [
            candidate(1, "Heat", 20.0),
            candidate(2, "Heat Wave", 5.0),
            candidate(3, "Heat", 45.5),
        ];
        assert_eq!(pick_best_candidate("Heat", &candidates), Some(3));
    }

    #[test]
    fn first_positive_candidate_taken_even_if_dissimilar() {
        let candidates = [
            candidate(10, "Completely Different", 90.0),
            candidate(11, "The Thing", 30.0),
        ];
        assert_eq!(pick_best_candidate("The Thing", &candidates), Some(10));
    }

    #[test]
    fn similar_candidate_after_dissimilar_one() {
        let candidates = [
            candidate(11, "The Thing", 30.0),
            candidate(10, "Completely Different", 90.0),
        ];
        // Dissimilar title is more popular but no longer first pick.
        assert_eq!(pick_best_candidate("The Thing", &candidates), Some(11));
    }

    #[test]
    fn zero_popularity_never_chosen() {
        let candidates = [candidate(1, "Obscure", 0.0)];
        assert_eq!(pick_best_candidate("Obscure", &candidates), None);
        assert_eq!(pick_best_candidate("Obscure", &[]), None);
    }

    #[test]
    fn classification_from_first_us_release() {
        let releases = vec![
            CountryReleases {
                country: "FR".into(),
                certifications: vec!["12".into()],
            },
            CountryReleases {
                country: "US".into(),
                certifications: vec!["R".into(), "".into()],
            },
        ];
        assert_eq!(us_classification(&releases), "R");
        assert_eq!(us_classification(&releases[..1]), "");
    }

    #[test]
    fn credits_split_into_directors_and_writers() {
        use crate::metadata::provider::{CastCredit, CrewCredit};

        let mut film = Film {
            directors: vec![99],
            ..Default::default()
        };
        let crew = |id: i64, job: &str, department: &str| CrewCredit {
            id,
            job: job.into(),
            department: department.into(),
        };
        apply_credits(
            &mut film,
            MovieCredits {
                cast: vec![CastCredit {
                    id: 1158,
                    character: "Lt. Vincent Hanna".into(),
                }],
                crew: vec![
                    crew(638, "Director", "Directing"),
                    crew(638, "Screenplay", "Writing"),
                    crew(638, "Writer", "Writing"),
                    crew(7, "Novel", "Writing"),
                    crew(8, "Producer", "Production"),
                ],
            },
        );

        assert_eq!(film.directors, vec![638]);
        assert_eq!(film.writers, vec![638, 7]);
        assert_eq!(film.cast[0].actor_id, 1158);
    }
}
