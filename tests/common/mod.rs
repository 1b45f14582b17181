//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which wires an in-memory catalog to a scripted
//! metadata provider and a fake media probe, plus helpers to lay out
//! volumes inside a temporary directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tempfile::TempDir;

use starfin::catalog::Catalog;
use starfin::dispatch::Dispatcher;
use starfin::metadata::{
    CastCredit, CountryReleases, CrewCredit, Enricher, MetadataProvider, MovieCredits,
    MovieDetails, PersonDetails, SearchCandidate,
};
use starfin::probe::MediaProbe;
use starfin::sync::Synchronizer;
use starfin_common::{Error, MediaKind};
use starfin_db::{CatalogStore, Film, MediaInfo, SqliteStore, Volume, VolumeStore};

// ---------------------------------------------------------------------------
// Metadata provider
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct StubMovie {
    pub id: i64,
    pub title: String,
    pub year: i32,
    pub popularity: f64,
    pub genres: Vec<String>,
    pub countries: Vec<String>,
    pub director: Option<i64>,
}

/// A provider answering from a fixed list of movies.
///
/// Searches match titles case-insensitively.
#[derive(Default)]
pub struct StubProvider {
    movies: Mutex<Vec<StubMovie>>,
    failing: AtomicBool,
    pub searches: AtomicUsize,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_movie(self, id: i64, title: &str, year: i32) -> Self {
        self.movies.lock().push(StubMovie {
            id,
            title: title.to_string(),
            year,
            popularity: 10.0,
            genres: vec!["Drama".to_string()],
            countries: vec!["US".to_string()],
            director: None,
        });
        self
    }

    pub fn with(self, movie: StubMovie) -> Self {
        self.movies.lock().push(movie);
        self
    }

    /// Make every call fail, as an unreachable provider would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> anyhow::Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            anyhow::bail!("provider unreachable");
        }
        Ok(())
    }

    fn movie(&self, id: i64) -> anyhow::Result<StubMovie> {
        self.movies
            .lock()
            .iter()
            .find(|movie| movie.id == id)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("404 for movie {id}"))
    }
}

#[async_trait]
impl MetadataProvider for StubProvider {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn search_movie(
        &self,
        title: &str,
        _year: Option<i32>,
    ) -> anyhow::Result<Vec<SearchCandidate>> {
        self.check()?;
        self.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .movies
            .lock()
            .iter()
            .filter(|movie| movie.title.eq_ignore_ascii_case(title))
            .map(|movie| SearchCandidate::new(movie.id, movie.title.clone(), movie.popularity))
            .collect())
    }

    async fn movie_details(&self, id: i64) -> anyhow::Result<MovieDetails> {
        self.check()?;
        let movie = self.movie(id)?;
        Ok(MovieDetails {
            id,
            title: movie.title.clone(),
            original_title: movie.title,
            release_date: format!("{}-06-01", movie.year),
            runtime: Some(120),
            genres: movie.genres,
            production_countries: movie.countries,
            ..Default::default()
        })
    }

    async fn movie_credits(&self, id: i64) -> anyhow::Result<MovieCredits> {
        self.check()?;
        let movie = self.movie(id)?;
        let crew = movie
            .director
            .map(|director| CrewCredit {
                id: director,
                job: "Director".to_string(),
                department: "Directing".to_string(),
            })
            .into_iter()
            .collect();
        Ok(MovieCredits {
            cast: vec![CastCredit {
                id: 1000 + id,
                character: "Lead".to_string(),
            }],
            crew,
        })
    }

    async fn movie_release_dates(&self, id: i64) -> anyhow::Result<Vec<CountryReleases>> {
        self.check()?;
        self.movie(id)?;
        Ok(vec![CountryReleases {
            country: "US".to_string(),
            certifications: vec!["R".to_string()],
        }])
    }

    async fn person_details(&self, id: i64) -> anyhow::Result<PersonDetails> {
        self.check()?;
        Ok(PersonDetails {
            id,
            name: format!("Person {id}"),
            ..Default::default()
        })
    }

    async fn find_by_imdb_id(&self, _imdb_id: &str) -> anyhow::Result<Option<i64>> {
        self.check()?;
        Ok(None)
    }
}

// ---------------------------------------------------------------------------
// Media probe
// ---------------------------------------------------------------------------

/// Reports every file as a 1080p Matroska file.
pub struct StubProbe;

impl MediaProbe for StubProbe {
    fn probe(&self, path: &Path) -> starfin_common::Result<MediaInfo> {
        if !path.exists() {
            return Err(Error::unavailable(format!("{} vanished", path.display())));
        }
        Ok(MediaInfo {
            format: "Matroska".to_string(),
            resolution: "1080p".to_string(),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A catalog over an in-memory store, with volumes living in a temp dir.
pub struct TestHarness {
    pub store: Arc<SqliteStore>,
    pub provider: Arc<StubProvider>,
    pub dispatcher: Arc<Dispatcher>,
    pub dir: TempDir,
}

impl TestHarness {
    pub fn new(provider: StubProvider) -> Self {
        let store = Arc::new(SqliteStore::in_memory().expect("failed to create in-memory store"));
        let provider = Arc::new(provider);
        let enricher = Enricher::new(provider.clone(), Arc::new(StubProbe));
        let catalog = Catalog::new(store.clone(), store.clone(), Arc::new(enricher))
            .expect("failed to build catalog");

        Self {
            store,
            provider,
            dispatcher: Arc::new(Dispatcher::new(Arc::new(catalog))),
            dir: tempfile::tempdir().expect("failed to create temp dir"),
        }
    }

    /// The provider most tests use.
    pub fn with_classics() -> Self {
        Self::new(
            StubProvider::new()
                .with_movie(603, "The Matrix", 1999)
                .with_movie(949, "Heat", 1995)
                .with_movie(62, "2001 A Space Odyssey", 1968),
        )
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        self.dispatcher.catalog()
    }

    pub fn synchronizer(&self) -> Synchronizer {
        Synchronizer::new(self.dispatcher.clone())
    }

    /// Register a recursive movie volume rooted at `<tmp>/<name>`.
    pub fn volume(&self, name: &str) -> Volume {
        self.volume_with(name, true)
    }

    pub fn volume_with(&self, name: &str, recursive: bool) -> Volume {
        let path = self.dir.path().join(name);
        std::fs::create_dir_all(&path).unwrap();
        let volume = Volume::new(name, path, recursive, MediaKind::Movies);
        self.store.add_volume(&volume).unwrap();
        volume
    }

    /// Create an empty file at `<tmp>/<relative>`.
    pub fn touch(&self, relative: &str) -> PathBuf {
        let path = self.dir.path().join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, b"").unwrap();
        path
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn films(&self) -> Vec<Film> {
        let mut films = self.store.list().unwrap();
        films.sort_by(|a, b| a.name.cmp(&b.name));
        films
    }

    pub fn film_at(&self, relative: &str) -> Film {
        self.store.get_by_path(&self.path(relative)).unwrap()
    }
}
