//! Catalog store traits and their SQLite implementation.
//!
//! The synchronizer, the watcher and the catalog service only ever talk to
//! the catalog through these traits, so tests can swap the backing store.
//! All operations are synchronous; async callers keep them short.

use std::path::{Path, PathBuf};

use starfin_common::{Error, FilmId, Result, VolumeId};
use tracing::{debug, info};

use crate::models::{Film, Person, Subtitle, Volume, VolumeFile};
use crate::pool::{get_conn, init_memory_pool, init_pool, DbPool};
use crate::queries::{films, people, volumes};

/// Films, their volume files and their subtitles.
pub trait CatalogStore: Send + Sync {
    /// Whether some volume file has this path.
    fn is_path_present(&self, path: &Path) -> Result<bool>;

    /// Whether some volume file references this subtitle path.
    fn is_subtitle_path_present(&self, path: &Path) -> Result<bool>;

    /// The film owning the volume file at `path`, or `NotFound`.
    fn get_by_path(&self, path: &Path) -> Result<Film>;

    /// Films with at least one volume file on the volume.
    fn get_by_volume(&self, volume_id: VolumeId) -> Result<Vec<Film>>;

    /// Whether a film resolved to `tmdb_id` exists.
    fn is_present(&self, tmdb_id: i64) -> Result<bool>;

    /// Insert `film`, or overwrite the stored film with the same id.
    fn add(&self, film: &Film) -> Result<()>;

    /// Append `film.volume_files[0]` to the stored film with the same TMDB id.
    fn add_volume_file_to_existing(&self, film: &Film) -> Result<()>;

    /// Insert `film`, or merge its volume files into the stored film with
    /// the same TMDB id, atomically. Returns the id of the film merged into.
    fn add_or_merge(&self, film: &Film) -> Result<Option<FilmId>>;

    /// Swap the volume file at `old_path` of `film` for `new_file`, in place.
    fn replace_volume_file(&self, film: &Film, old_path: &Path, new_file: &VolumeFile)
        -> Result<()>;

    /// Remove the volume file at `path`; the film goes with its last file.
    fn delete_volume_file(&self, path: &Path) -> Result<()>;

    /// Attach a subtitle to the volume file at `media_path`.
    fn add_subtitle(&self, media_path: &Path, subtitle: &Subtitle) -> Result<()>;

    /// Detach the subtitle at `subtitle_path` from the volume file at `media_path`.
    fn remove_subtitle(&self, media_path: &Path, subtitle_path: &Path) -> Result<()>;

    /// Volume files currently referencing the subtitle at `subtitle_path`.
    fn media_paths_for_subtitle(&self, subtitle_path: &Path) -> Result<Vec<PathBuf>>;

    fn get(&self, id: FilmId) -> Result<Film>;

    fn list(&self) -> Result<Vec<Film>>;

    /// Overwrite an existing film, `NotFound` if it is not stored.
    fn update(&self, film: &Film) -> Result<()>;
}

/// Registered volumes.
pub trait VolumeStore: Send + Sync {
    fn list_volumes(&self) -> Result<Vec<Volume>>;

    fn get_volume(&self, id: VolumeId) -> Result<Volume>;

    fn add_volume(&self, volume: &Volume) -> Result<()>;

    /// Delete a volume together with the volume files it contributed.
    ///
    /// Returns the number of films left without any file, and so deleted.
    fn delete_volume(&self, id: VolumeId) -> Result<usize>;
}

/// Cast and crew.
pub trait PersonStore: Send + Sync {
    fn is_person_present(&self, tmdb_id: i64) -> Result<bool>;

    /// Store a person; a no-op when the TMDB id is already known.
    fn add_person(&self, person: &Person) -> Result<()>;

    fn get_person(&self, tmdb_id: i64) -> Result<Person>;

    fn list_people(&self) -> Result<Vec<Person>>;
}

/// SQLite-backed store.
#[derive(Clone)]
pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Open (and migrate) the database file at `path`.
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(init_pool(path)?))
    }

    /// A throwaway in-memory store.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(init_memory_pool()?))
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

impl CatalogStore for SqliteStore {
    fn is_path_present(&self, path: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        films::is_path_present(&conn, path)
    }

    fn is_subtitle_path_present(&self, path: &Path) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        films::is_subtitle_path_present(&conn, path)
    }

    fn get_by_path(&self, path: &Path) -> Result<Film> {
        let conn = get_conn(&self.pool)?;
        films::get_film_by_path(&conn, path)?
            .ok_or_else(|| Error::not_found(format!("no film at {}", path.display())))
    }

    fn get_by_volume(&self, volume_id: VolumeId) -> Result<Vec<Film>> {
        let conn = get_conn(&self.pool)?;
        films::films_by_volume(&conn, volume_id)
    }

    fn is_present(&self, tmdb_id: i64) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        Ok(films::film_id_for_tmdb_id(&conn, tmdb_id)?.is_some())
    }

    fn add(&self, film: &Film) -> Result<()> {
        if film.volume_files.is_empty() {
            return Err(Error::invariant(format!(
                "film {} has no volume file",
                film.display_title()
            )));
        }
        let conn = get_conn(&self.pool)?;
        films::save_film(&conn, film)?;
        debug!(film_id = %film.id, name = %film.display_title(), "Stored film");
        Ok(())
    }

    fn add_or_merge(&self, film: &Film) -> Result<Option<FilmId>> {
        if film.volume_files.is_empty() {
            return Err(Error::invariant(format!(
                "film {} has no volume file",
                film.display_title()
            )));
        }
        let conn = get_conn(&self.pool)?;
        let merged_into = films::insert_or_merge(&conn, film)?;
        match merged_into {
            Some(owner) => debug!(film_id = %owner, name = %film.display_title(), "Merged film into existing entry"),
            None => debug!(film_id = %film.id, name = %film.display_title(), "Stored film"),
        }
        Ok(merged_into)
    }

    fn add_volume_file_to_existing(&self, film: &Film) -> Result<()> {
        let tmdb_id = film
            .tmdb_id
            .ok_or_else(|| Error::invariant("film has no TMDB id to merge on"))?;
        let volume_file = film
            .primary_file()
            .ok_or_else(|| Error::invariant("film has no volume file"))?;

        let conn = get_conn(&self.pool)?;
        let owner = films::append_volume_file(&conn, tmdb_id, volume_file)?;
        debug!(
            film_id = %owner,
            path = %volume_file.path.display(),
            "Added volume file to existing film"
        );
        Ok(())
    }

    fn replace_volume_file(
        &self,
        film: &Film,
        old_path: &Path,
        new_file: &VolumeFile,
    ) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        films::replace_volume_file(&conn, film.id, old_path, new_file)
    }

    fn delete_volume_file(&self, path: &Path) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        if films::delete_volume_file(&conn, path)? {
            debug!(path = %path.display(), "Deleted film with its last volume file");
        }
        Ok(())
    }

    fn add_subtitle(&self, media_path: &Path, subtitle: &Subtitle) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        films::add_subtitle(&conn, media_path, subtitle)
    }

    fn remove_subtitle(&self, media_path: &Path, subtitle_path: &Path) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        films::remove_subtitle(&conn, media_path, subtitle_path)
    }

    fn media_paths_for_subtitle(&self, subtitle_path: &Path) -> Result<Vec<PathBuf>> {
        let conn = get_conn(&self.pool)?;
        films::media_paths_for_subtitle(&conn, subtitle_path)
    }

    fn get(&self, id: FilmId) -> Result<Film> {
        let conn = get_conn(&self.pool)?;
        films::get_film(&conn, id)?.ok_or_else(|| Error::not_found(format!("film {}", id)))
    }

    fn list(&self) -> Result<Vec<Film>> {
        let conn = get_conn(&self.pool)?;
        films::list_films(&conn)
    }

    fn update(&self, film: &Film) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        if films::get_film(&conn, film.id)?.is_none() {
            return Err(Error::not_found(format!("film {}", film.id)));
        }
        if film.volume_files.is_empty() {
            return Err(Error::invariant(format!("film {} has no volume file", film.id)));
        }
        films::save_film(&conn, film)
    }
}

impl VolumeStore for SqliteStore {
    fn list_volumes(&self) -> Result<Vec<Volume>> {
        let conn = get_conn(&self.pool)?;
        volumes::list_volumes(&conn)
    }

    fn get_volume(&self, id: VolumeId) -> Result<Volume> {
        let conn = get_conn(&self.pool)?;
        volumes::get_volume(&conn, id)?.ok_or_else(|| Error::not_found(format!("volume {}", id)))
    }

    fn add_volume(&self, volume: &Volume) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        volumes::insert_volume(&conn, volume)?;
        info!(volume_id = %volume.id, name = %volume.name, "Volume added to database");
        Ok(())
    }

    fn delete_volume(&self, id: VolumeId) -> Result<usize> {
        let conn = get_conn(&self.pool)?;
        if volumes::get_volume(&conn, id)?.is_none() {
            return Err(Error::not_found(format!("volume {}", id)));
        }

        let deleted_films = films::delete_volume_files_of_volume(&conn, id)?;
        volumes::delete_volume(&conn, id)?;
        info!(volume_id = %id, deleted_films, "Volume removed from database");
        Ok(deleted_films)
    }
}

impl PersonStore for SqliteStore {
    fn is_person_present(&self, tmdb_id: i64) -> Result<bool> {
        let conn = get_conn(&self.pool)?;
        people::is_person_present(&conn, tmdb_id)
    }

    fn add_person(&self, person: &Person) -> Result<()> {
        let conn = get_conn(&self.pool)?;
        people::insert_person(&conn, person)?;
        Ok(())
    }

    fn get_person(&self, tmdb_id: i64) -> Result<Person> {
        let conn = get_conn(&self.pool)?;
        people::get_person_by_tmdb_id(&conn, tmdb_id)?
            .ok_or_else(|| Error::not_found(format!("person with TMDB id {}", tmdb_id)))
    }

    fn list_people(&self) -> Result<Vec<Person>> {
        let conn = get_conn(&self.pool)?;
        people::list_people(&conn)
    }
}
