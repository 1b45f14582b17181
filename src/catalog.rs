//! The catalog service: storing enriched entries, merging copies of the
//! same film, creating the people films reference and keeping the filter
//! aggregate current.

use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use starfin_common::{Error, FilmId, Result};
use starfin_db::{CatalogStore, Film, PersonStore};
use tracing::{debug, info, warn};

use crate::filters::CatalogFilters;
use crate::metadata::Enricher;

pub struct Catalog {
    films: Arc<dyn CatalogStore>,
    people: Arc<dyn PersonStore>,
    enricher: Arc<Enricher>,
    filters: RwLock<CatalogFilters>,
}

impl Catalog {
    /// Build the service, computing filters from the stored films.
    pub fn new(
        films: Arc<dyn CatalogStore>,
        people: Arc<dyn PersonStore>,
        enricher: Arc<Enricher>,
    ) -> Result<Self> {
        let filters = CatalogFilters::from_films(&films.list()?);
        Ok(Self {
            films,
            people,
            enricher,
            filters: RwLock::new(filters),
        })
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.films
    }

    pub fn enricher(&self) -> &Arc<Enricher> {
        &self.enricher
    }

    /// Snapshot of the current filter values.
    pub fn filters(&self) -> CatalogFilters {
        self.filters.read().clone()
    }

    /// Recompute the filters from scratch, e.g. after films were deleted.
    pub fn refresh_filters(&self) -> Result<()> {
        let filters = CatalogFilters::from_films(&self.films.list()?);
        *self.filters.write() = filters;
        Ok(())
    }

    /// Store a film.
    ///
    /// A film resolved to a TMDB id already in the catalog only contributes
    /// its volume file to the stored film, unless `update` asks for the
    /// stored record to be overwritten. People the film references are
    /// created on first sight.
    pub async fn add_film(&self, film: &Film, update: bool) -> Result<()> {
        let merged_into = if update {
            self.films.add(film)?;
            None
        } else {
            self.films.add_or_merge(film)?
        };

        if merged_into.is_none() {
            self.filters.write().add_film(film);
            info!(
                film_id = %film.id,
                title = %film.display_title(),
                tmdb_id = ?film.tmdb_id,
                "Added film"
            );
        }

        self.add_people(film).await;
        Ok(())
    }

    /// Create every person `film` references that is not stored yet.
    ///
    /// Failures are logged per person.
    pub async fn add_people(&self, film: &Film) {
        for tmdb_id in film.person_ids() {
            match self.people.is_person_present(tmdb_id) {
                Ok(true) => continue,
                Ok(false) => {}
                Err(e) => {
                    warn!(tmdb_id, "Cannot check person: {}", e);
                    continue;
                }
            }

            let person = self.enricher.person_details(tmdb_id).await;
            if let Err(e) = self.people.add_person(&person) {
                warn!(tmdb_id, "Cannot store person: {}", e);
            }
        }
    }

    /// Point a film at the TMDB film behind `link` and refresh its details.
    ///
    /// When another stored film already has that TMDB id, the volume files
    /// move over to it and the re-linked entry disappears.
    pub async fn relink(&self, film_id: FilmId, link: &str) -> Result<Film> {
        let tmdb_id = self.enricher.tmdb_id_from_link(link).await?;
        let mut film = self.films.get(film_id)?;

        let existing = self
            .films
            .list()?
            .into_iter()
            .find(|other| other.id != film.id && other.tmdb_id == Some(tmdb_id));

        if let Some(existing) = existing {
            debug!(film_id = %film.id, into = %existing.id, tmdb_id, "Merging re-linked film");
            for volume_file in &film.volume_files {
                self.films.delete_volume_file(&volume_file.path)?;
                let mut copy = Film::with_volume_file(volume_file.clone());
                copy.tmdb_id = Some(tmdb_id);
                self.films.add_volume_file_to_existing(&copy)?;
            }
            self.refresh_filters()?;
            return self.films.get(existing.id);
        }

        film.tmdb_id = Some(tmdb_id);
        self.enricher.fill_details(&mut film).await;
        self.films.update(&film)?;
        self.filters.write().add_film(&film);
        self.add_people(&film).await;

        info!(film_id = %film.id, tmdb_id, title = %film.title, "Re-linked film");
        Ok(film)
    }

    /// The film holding the volume file at `path`.
    pub fn film_at(&self, path: &Path) -> Result<Film> {
        self.films.get_by_path(path)
    }

    /// Like [`Catalog::film_at`], treating a missing film as `None`.
    pub fn find_film_at(&self, path: &Path) -> Result<Option<Film>> {
        match self.films.get_by_path(path) {
            Ok(film) => Ok(Some(film)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
