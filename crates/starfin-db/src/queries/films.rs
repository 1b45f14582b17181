//! Film database queries.
//!
//! A film row carries the guessed and enriched fields; its volume files live
//! in `volume_files` (ordered by rowid) and their sidecar subtitles in
//! `subtitles`. Functions that touch several tables run in a transaction.

use std::path::{Path, PathBuf};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use starfin_common::{Error, FilmId, Result, VolumeId};

use super::{db_error, is_constraint_violation, json_column, path_text, to_json, uuid_column};
use crate::models::{Film, Subtitle, VolumeFile};

const FILM_COLUMNS: &str = "id, name, release_year, resolution, tmdb_id, imdb_id, title, \
     original_title, year, runtime, tagline, overview, poster_path, backdrop_path, \
     classification, imdb_rating, letterboxd_rating, genres, countries, directors, writers, \
     cast_members";

fn parse_film_row(row: &rusqlite::Row) -> rusqlite::Result<Film> {
    Ok(Film {
        id: FilmId::from(uuid_column(row, 0)?),
        volume_files: Vec::new(),
        name: row.get(1)?,
        release_year: row.get(2)?,
        resolution: row.get(3)?,
        tmdb_id: row.get(4)?,
        imdb_id: row.get(5)?,
        title: row.get(6)?,
        original_title: row.get(7)?,
        year: row.get(8)?,
        runtime: row.get(9)?,
        tagline: row.get(10)?,
        overview: row.get(11)?,
        poster_path: row.get(12)?,
        backdrop_path: row.get(13)?,
        classification: row.get(14)?,
        imdb_rating: row.get(15)?,
        letterboxd_rating: row.get(16)?,
        genres: json_column(row, 17)?,
        countries: json_column(row, 18)?,
        directors: json_column(row, 19)?,
        writers: json_column(row, 20)?,
        cast: json_column(row, 21)?,
    })
}

fn path_conflict(path: &Path) -> Error {
    Error::conflict(format!(
        "{} is already a volume file of another film",
        path.display()
    ))
}

fn upsert_film_row(conn: &Connection, film: &Film) -> Result<()> {
    let now = Utc::now().to_rfc3339();

    conn.execute(
        "INSERT INTO films (
            id, name, release_year, resolution, tmdb_id, imdb_id, title, original_title,
            year, runtime, tagline, overview, poster_path, backdrop_path, classification,
            imdb_rating, letterboxd_rating, genres, countries, directors, writers,
            cast_members, created_at, updated_at
         ) VALUES (
            :id, :name, :release_year, :resolution, :tmdb_id, :imdb_id, :title, :original_title,
            :year, :runtime, :tagline, :overview, :poster_path, :backdrop_path, :classification,
            :imdb_rating, :letterboxd_rating, :genres, :countries, :directors, :writers,
            :cast_members, :now, :now
         )
         ON CONFLICT(id) DO UPDATE SET
            name = :name,
            release_year = :release_year,
            resolution = :resolution,
            tmdb_id = :tmdb_id,
            imdb_id = :imdb_id,
            title = :title,
            original_title = :original_title,
            year = :year,
            runtime = :runtime,
            tagline = :tagline,
            overview = :overview,
            poster_path = :poster_path,
            backdrop_path = :backdrop_path,
            classification = :classification,
            imdb_rating = :imdb_rating,
            letterboxd_rating = :letterboxd_rating,
            genres = :genres,
            countries = :countries,
            directors = :directors,
            writers = :writers,
            cast_members = :cast_members,
            updated_at = :now",
        rusqlite::named_params! {
            ":id": film.id.to_string(),
            ":name": &film.name,
            ":release_year": film.release_year,
            ":resolution": &film.resolution,
            ":tmdb_id": film.tmdb_id,
            ":imdb_id": &film.imdb_id,
            ":title": &film.title,
            ":original_title": &film.original_title,
            ":year": &film.year,
            ":runtime": &film.runtime,
            ":tagline": &film.tagline,
            ":overview": &film.overview,
            ":poster_path": &film.poster_path,
            ":backdrop_path": &film.backdrop_path,
            ":classification": &film.classification,
            ":imdb_rating": &film.imdb_rating,
            ":letterboxd_rating": &film.letterboxd_rating,
            ":genres": to_json(&film.genres)?,
            ":countries": to_json(&film.countries)?,
            ":directors": to_json(&film.directors)?,
            ":writers": to_json(&film.writers)?,
            ":cast_members": to_json(&film.cast)?,
            ":now": now,
        },
    )
    .map_err(db_error)?;

    Ok(())
}

fn insert_subtitle_row(conn: &Connection, volume_file_id: i64, subtitle: &Subtitle) -> Result<()> {
    conn.execute(
        "INSERT INTO subtitles (volume_file_id, path, language)
         VALUES (:volume_file_id, :path, :language)",
        rusqlite::named_params! {
            ":volume_file_id": volume_file_id,
            ":path": path_text(&subtitle.path),
            ":language": &subtitle.language,
        },
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            Error::conflict(format!(
                "subtitle {} is already attached to this media",
                subtitle.path.display()
            ))
        } else {
            db_error(e)
        }
    })?;
    Ok(())
}

fn insert_volume_file_row(conn: &Connection, film_id: FilmId, volume_file: &VolumeFile) -> Result<()> {
    conn.execute(
        "INSERT INTO volume_files (film_id, volume_id, path, media_info)
         VALUES (:film_id, :volume_id, :path, :media_info)",
        rusqlite::named_params! {
            ":film_id": film_id.to_string(),
            ":volume_id": volume_file.volume_id.to_string(),
            ":path": path_text(&volume_file.path),
            ":media_info": to_json(&volume_file.media_info)?,
        },
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            path_conflict(&volume_file.path)
        } else {
            db_error(e)
        }
    })?;

    let volume_file_id = conn.last_insert_rowid();
    for subtitle in &volume_file.subtitles {
        insert_subtitle_row(conn, volume_file_id, subtitle)?;
    }
    Ok(())
}

fn load_subtitles(conn: &Connection, volume_file_id: i64) -> Result<Vec<Subtitle>> {
    let mut stmt = conn
        .prepare("SELECT path, language FROM subtitles WHERE volume_file_id = ? ORDER BY id")
        .map_err(db_error)?;

    let subtitles = stmt
        .query_map([volume_file_id], |row| {
            Ok(Subtitle {
                path: PathBuf::from(row.get::<_, String>(0)?),
                language: row.get(1)?,
            })
        })
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;

    Ok(subtitles)
}

fn load_volume_files(conn: &Connection, film_id: FilmId) -> Result<Vec<VolumeFile>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, volume_id, path, media_info FROM volume_files
             WHERE film_id = ? ORDER BY id",
        )
        .map_err(db_error)?;

    let rows = stmt
        .query_map([film_id.to_string()], |row| {
            let id: i64 = row.get(0)?;
            let volume_file = VolumeFile {
                volume_id: VolumeId::from(uuid_column(row, 1)?),
                path: PathBuf::from(row.get::<_, String>(2)?),
                media_info: json_column(row, 3)?,
                subtitles: Vec::new(),
            };
            Ok((id, volume_file))
        })
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;

    rows.into_iter()
        .map(|(id, mut volume_file)| -> Result<VolumeFile> {
            volume_file.subtitles = load_subtitles(conn, id)?;
            Ok(volume_file)
        })
        .collect()
}

fn volume_file_id_for_path(conn: &Connection, path: &Path) -> Result<Option<i64>> {
    conn.query_row(
        "SELECT id FROM volume_files WHERE path = ?",
        [path_text(path)],
        |row| row.get(0),
    )
    .optional()
    .map_err(db_error)
}

fn film_ids(conn: &Connection, sql: &str, param: &str) -> Result<Vec<FilmId>> {
    let mut stmt = conn.prepare(sql).map_err(db_error)?;
    let ids = stmt
        .query_map([param], |row| uuid_column(row, 0))
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;
    Ok(ids.into_iter().map(FilmId::from).collect())
}

/// Insert a film with its volume files, or overwrite the film with the same id.
///
/// Overwriting replaces the stored volume files with `film.volume_files`.
/// Returns `Conflict` if one of the paths already belongs to another film.
pub fn save_film(conn: &Connection, film: &Film) -> Result<()> {
    let tx = conn.unchecked_transaction().map_err(db_error)?;
    write_film(&tx, film)?;
    tx.commit().map_err(db_error)
}

fn write_film(conn: &Connection, film: &Film) -> Result<()> {
    upsert_film_row(conn, film)?;
    conn.execute(
        "DELETE FROM volume_files WHERE film_id = ?",
        [film.id.to_string()],
    )
    .map_err(db_error)?;
    for volume_file in &film.volume_files {
        insert_volume_file_row(conn, film.id, volume_file)?;
    }
    Ok(())
}

/// Insert `film`, unless a film resolved to the same TMDB id is stored, in
/// which case `film`'s volume files join that film instead.
///
/// The lookup and the write share one `IMMEDIATE` transaction, so concurrent
/// writers resolving the same TMDB id end up with a single film. Returns the
/// id of the film the files joined, `None` when `film` was inserted.
pub fn insert_or_merge(conn: &Connection, film: &Film) -> Result<Option<FilmId>> {
    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate).map_err(db_error)?;

    let existing = match film.tmdb_id {
        Some(tmdb_id) => film_id_for_tmdb_id(&tx, tmdb_id)?,
        None => None,
    };

    match existing {
        Some(film_id) => {
            for volume_file in &film.volume_files {
                insert_volume_file_row(&tx, film_id, volume_file)?;
            }
            tx.execute(
                "UPDATE films SET updated_at = ? WHERE id = ?",
                [Utc::now().to_rfc3339(), film_id.to_string()],
            )
            .map_err(db_error)?;
        }
        None => write_film(&tx, film)?,
    }

    tx.commit().map_err(db_error)?;
    Ok(existing)
}

/// Get a film by ID.
pub fn get_film(conn: &Connection, id: FilmId) -> Result<Option<Film>> {
    let film = conn
        .query_row(
            &format!("SELECT {FILM_COLUMNS} FROM films WHERE id = ?"),
            [id.to_string()],
            parse_film_row,
        )
        .optional()
        .map_err(db_error)?;

    match film {
        Some(mut film) => {
            film.volume_files = load_volume_files(conn, film.id)?;
            Ok(Some(film))
        }
        None => Ok(None),
    }
}

/// Get the film owning the volume file at `path`.
pub fn get_film_by_path(conn: &Connection, path: &Path) -> Result<Option<Film>> {
    match film_id_for_path(conn, path)? {
        Some(id) => get_film(conn, id),
        None => Ok(None),
    }
}

/// ID of the film owning the volume file at `path`.
pub fn film_id_for_path(conn: &Connection, path: &Path) -> Result<Option<FilmId>> {
    conn.query_row(
        "SELECT film_id FROM volume_files WHERE path = ?",
        [path_text(path)],
        |row| uuid_column(row, 0),
    )
    .optional()
    .map(|id| id.map(FilmId::from))
    .map_err(db_error)
}

/// List every film in insertion order.
pub fn list_films(conn: &Connection) -> Result<Vec<Film>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {FILM_COLUMNS} FROM films ORDER BY rowid"))
        .map_err(db_error)?;

    let films = stmt
        .query_map([], parse_film_row)
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;

    films
        .into_iter()
        .map(|mut film| -> Result<Film> {
            film.volume_files = load_volume_files(conn, film.id)?;
            Ok(film)
        })
        .collect()
}

/// Films with at least one volume file on `volume_id`.
pub fn films_by_volume(conn: &Connection, volume_id: VolumeId) -> Result<Vec<Film>> {
    let ids = film_ids(
        conn,
        "SELECT film_id FROM volume_files WHERE volume_id = ?
         GROUP BY film_id ORDER BY MIN(id)",
        &volume_id.to_string(),
    )?;

    let mut films = Vec::with_capacity(ids.len());
    for id in ids {
        if let Some(film) = get_film(conn, id)? {
            films.push(film);
        }
    }
    Ok(films)
}

/// Whether some volume file has this path.
pub fn is_path_present(conn: &Connection, path: &Path) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM volume_files WHERE path = ?)",
        [path_text(path)],
        |row| row.get(0),
    )
    .map_err(db_error)
}

/// Whether some volume file references this subtitle path.
pub fn is_subtitle_path_present(conn: &Connection, path: &Path) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM subtitles WHERE path = ?)",
        [path_text(path)],
        |row| row.get(0),
    )
    .map_err(db_error)
}

/// Paths of the volume files that reference the subtitle at `subtitle_path`.
pub fn media_paths_for_subtitle(conn: &Connection, subtitle_path: &Path) -> Result<Vec<PathBuf>> {
    let mut stmt = conn
        .prepare(
            "SELECT vf.path FROM subtitles s
             JOIN volume_files vf ON vf.id = s.volume_file_id
             WHERE s.path = ? ORDER BY vf.id",
        )
        .map_err(db_error)?;

    let paths = stmt
        .query_map([path_text(subtitle_path)], |row| {
            Ok(PathBuf::from(row.get::<_, String>(0)?))
        })
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;

    Ok(paths)
}

/// First film resolved to `tmdb_id`, if any.
pub fn film_id_for_tmdb_id(conn: &Connection, tmdb_id: i64) -> Result<Option<FilmId>> {
    conn.query_row(
        "SELECT id FROM films WHERE tmdb_id = ? ORDER BY rowid LIMIT 1",
        [tmdb_id],
        |row| uuid_column(row, 0),
    )
    .optional()
    .map(|id| id.map(FilmId::from))
    .map_err(db_error)
}

/// Append `volume_file` to the film resolved to `tmdb_id`.
///
/// Returns `NotFound` when no film has that id.
pub fn append_volume_file(conn: &Connection, tmdb_id: i64, volume_file: &VolumeFile) -> Result<FilmId> {
    let tx = conn.unchecked_transaction().map_err(db_error)?;

    let film_id = film_id_for_tmdb_id(&tx, tmdb_id)?
        .ok_or_else(|| Error::not_found(format!("no film with TMDB id {}", tmdb_id)))?;
    insert_volume_file_row(&tx, film_id, volume_file)?;
    tx.execute(
        "UPDATE films SET updated_at = ? WHERE id = ?",
        [Utc::now().to_rfc3339(), film_id.to_string()],
    )
    .map_err(db_error)?;

    tx.commit().map_err(db_error)?;
    Ok(film_id)
}

/// Replace, in place, the volume file at `old_path` of film `film_id`.
///
/// The replacement keeps the position of the file it replaces. Returns
/// `Invariant` when `old_path` is not a volume file of that film.
pub fn replace_volume_file(
    conn: &Connection,
    film_id: FilmId,
    old_path: &Path,
    new_file: &VolumeFile,
) -> Result<()> {
    let tx = conn.unchecked_transaction().map_err(db_error)?;

    let volume_file_id: Option<i64> = tx
        .query_row(
            "SELECT id FROM volume_files WHERE film_id = ? AND path = ?",
            [film_id.to_string(), path_text(old_path)],
            |row| row.get(0),
        )
        .optional()
        .map_err(db_error)?;
    let volume_file_id = volume_file_id.ok_or_else(|| {
        Error::invariant(format!(
            "{} is not a volume file of film {}",
            old_path.display(),
            film_id
        ))
    })?;

    tx.execute(
        "UPDATE volume_files SET volume_id = :volume_id, path = :path, media_info = :media_info
         WHERE id = :id",
        rusqlite::named_params! {
            ":id": volume_file_id,
            ":volume_id": new_file.volume_id.to_string(),
            ":path": path_text(&new_file.path),
            ":media_info": to_json(&new_file.media_info)?,
        },
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            path_conflict(&new_file.path)
        } else {
            db_error(e)
        }
    })?;

    tx.execute(
        "DELETE FROM subtitles WHERE volume_file_id = ?",
        [volume_file_id],
    )
    .map_err(db_error)?;
    for subtitle in &new_file.subtitles {
        insert_subtitle_row(&tx, volume_file_id, subtitle)?;
    }

    tx.commit().map_err(db_error)
}

/// Remove the volume file at `path`, deleting its film if it was the last one.
///
/// Returns whether the film itself was deleted, or `NotFound`.
pub fn delete_volume_file(conn: &Connection, path: &Path) -> Result<bool> {
    let tx = conn.unchecked_transaction().map_err(db_error)?;

    let film_id = film_id_for_path(&tx, path)?
        .ok_or_else(|| Error::not_found(format!("no volume file at {}", path.display())))?;
    let file_count: i64 = tx
        .query_row(
            "SELECT COUNT(*) FROM volume_files WHERE film_id = ?",
            [film_id.to_string()],
            |row| row.get(0),
        )
        .map_err(db_error)?;

    let film_deleted = if file_count <= 1 {
        tx.execute("DELETE FROM films WHERE id = ?", [film_id.to_string()])
            .map_err(db_error)?;
        true
    } else {
        tx.execute(
            "DELETE FROM volume_files WHERE path = ?",
            [path_text(path)],
        )
        .map_err(db_error)?;
        false
    };

    tx.commit().map_err(db_error)?;
    Ok(film_deleted)
}

/// Attach `subtitle` to the volume file at `media_path`.
///
/// `NotFound` if no volume file has that path, `Conflict` if the subtitle is
/// already attached.
pub fn add_subtitle(conn: &Connection, media_path: &Path, subtitle: &Subtitle) -> Result<()> {
    let volume_file_id = volume_file_id_for_path(conn, media_path)?
        .ok_or_else(|| Error::not_found(format!("no volume file at {}", media_path.display())))?;
    insert_subtitle_row(conn, volume_file_id, subtitle)
}

/// Detach the subtitle at `subtitle_path` from the volume file at `media_path`.
pub fn remove_subtitle(conn: &Connection, media_path: &Path, subtitle_path: &Path) -> Result<()> {
    let volume_file_id = volume_file_id_for_path(conn, media_path)?
        .ok_or_else(|| Error::not_found(format!("no volume file at {}", media_path.display())))?;

    let removed = conn
        .execute(
            "DELETE FROM subtitles WHERE volume_file_id = ? AND path = ?",
            rusqlite::params![volume_file_id, path_text(subtitle_path)],
        )
        .map_err(db_error)?;

    if removed == 0 {
        return Err(Error::not_found(format!(
            "subtitle {} is not attached to {}",
            subtitle_path.display(),
            media_path.display()
        )));
    }
    Ok(())
}

/// Remove every volume file on `volume_id` and the films left without any.
///
/// Returns the number of films deleted.
pub fn delete_volume_files_of_volume(conn: &Connection, volume_id: VolumeId) -> Result<usize> {
    let tx = conn.unchecked_transaction().map_err(db_error)?;

    tx.execute(
        "DELETE FROM volume_files WHERE volume_id = ?",
        [volume_id.to_string()],
    )
    .map_err(db_error)?;
    let deleted = tx
        .execute(
            "DELETE FROM films WHERE NOT EXISTS (
                SELECT 1 FROM volume_files vf WHERE vf.film_id = films.id
             )",
            [],
        )
        .map_err(db_error)?;

    tx.commit().map_err(db_error)?;
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CastMember;
    use crate::pool::init_memory_pool;
    use assert_matches::assert_matches;

    fn test_film(path: &str, volume_id: VolumeId, tmdb_id: Option<i64>) -> Film {
        let mut volume_file = VolumeFile::new(path, volume_id);
        volume_file.media_info.format = "Matroska".to_string();
        Film {
            name: "Heat".to_string(),
            release_year: 1995,
            tmdb_id,
            genres: vec!["Crime".to_string()],
            cast: vec![CastMember {
                character: "Neil McCauley".to_string(),
                actor_id: 1158,
            }],
            ..Film::with_volume_file(volume_file)
        }
    }

    #[test]
    fn test_save_and_get_film() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let volume_id = VolumeId::new();

        let mut film = test_film("/m/Heat.1995.mkv", volume_id, Some(949));
        film.volume_files[0].subtitles.push(Subtitle {
            path: "/m/Heat.1995.en.srt".into(),
            language: "en".to_string(),
        });
        save_film(&conn, &film).unwrap();

        let found = get_film(&conn, film.id).unwrap().unwrap();
        assert_eq!(found, film);

        let by_path = get_film_by_path(&conn, Path::new("/m/Heat.1995.mkv"))
            .unwrap()
            .unwrap();
        assert_eq!(by_path.id, film.id);
        assert!(get_film_by_path(&conn, Path::new("/m/other.mkv"))
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_save_overwrites_existing_film() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let mut film = test_film("/m/Heat.mkv", VolumeId::new(), None);
        save_film(&conn, &film).unwrap();

        film.title = "Heat".to_string();
        film.tmdb_id = Some(949);
        save_film(&conn, &film).unwrap();

        let films = list_films(&conn).unwrap();
        assert_eq!(films.len(), 1);
        assert_eq!(films[0].tmdb_id, Some(949));
        assert_eq!(films[0].volume_files.len(), 1);
    }

    #[test]
    fn test_path_belongs_to_one_film() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        save_film(&conn, &test_film("/m/a.mkv", VolumeId::new(), None)).unwrap();
        let result = save_film(&conn, &test_film("/m/a.mkv", VolumeId::new(), None));
        assert_matches!(result, Err(Error::Conflict(_)));
        assert_eq!(list_films(&conn).unwrap().len(), 1);
    }

    #[test]
    fn test_append_volume_file_by_tmdb_id() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let volume_id = VolumeId::new();

        let film = test_film("/m/Heat.mkv", volume_id, Some(949));
        save_film(&conn, &film).unwrap();

        let copy = VolumeFile::new("/n/Heat.1995.1080p.mkv", volume_id);
        let owner = append_volume_file(&conn, 949, &copy).unwrap();
        assert_eq!(owner, film.id);

        let found = get_film(&conn, film.id).unwrap().unwrap();
        let paths: Vec<_> = found.volume_files.iter().map(|vf| vf.path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/m/Heat.mkv"),
                PathBuf::from("/n/Heat.1995.1080p.mkv")
            ]
        );

        let missing = VolumeFile::new("/n/Other.mkv", volume_id);
        assert_matches!(
            append_volume_file(&conn, 1, &missing),
            Err(Error::NotFound(_))
        );
    }

    #[test]
    fn test_replace_volume_file_keeps_position() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let volume_id = VolumeId::new();

        let mut film = test_film("/m/a.mkv", volume_id, Some(949));
        film.volume_files.push(VolumeFile::new("/m/b.mkv", volume_id));
        save_film(&conn, &film).unwrap();

        let mut renamed = VolumeFile::new("/m/a-renamed.mkv", volume_id);
        renamed.subtitles.push(Subtitle {
            path: "/m/a-renamed.srt".into(),
            language: String::new(),
        });
        replace_volume_file(&conn, film.id, Path::new("/m/a.mkv"), &renamed).unwrap();

        let found = get_film(&conn, film.id).unwrap().unwrap();
        assert_eq!(found.volume_files[0], renamed);
        assert_eq!(found.volume_files[1].path, PathBuf::from("/m/b.mkv"));
        assert!(!is_path_present(&conn, Path::new("/m/a.mkv")).unwrap());

        let result = replace_volume_file(&conn, film.id, Path::new("/m/zzz.mkv"), &renamed);
        assert_matches!(result, Err(Error::Invariant(_)));
    }

    #[test]
    fn test_delete_volume_file() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let volume_id = VolumeId::new();

        let mut film = test_film("/m/a.mkv", volume_id, Some(949));
        film.volume_files.push(VolumeFile::new("/m/b.mkv", volume_id));
        save_film(&conn, &film).unwrap();

        assert!(!delete_volume_file(&conn, Path::new("/m/a.mkv")).unwrap());
        assert!(get_film(&conn, film.id).unwrap().is_some());

        assert!(delete_volume_file(&conn, Path::new("/m/b.mkv")).unwrap());
        assert!(get_film(&conn, film.id).unwrap().is_none());

        assert_matches!(
            delete_volume_file(&conn, Path::new("/m/b.mkv")),
            Err(Error::NotFound(_))
        );
    }

    #[test]
    fn test_subtitles() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        save_film(&conn, &test_film("/m/a.mkv", VolumeId::new(), None)).unwrap();
        let sub = Subtitle {
            path: "/m/a.fr.srt".into(),
            language: "fr".to_string(),
        };

        add_subtitle(&conn, Path::new("/m/a.mkv"), &sub).unwrap();
        assert!(is_subtitle_path_present(&conn, &sub.path).unwrap());
        assert_eq!(
            media_paths_for_subtitle(&conn, &sub.path).unwrap(),
            vec![PathBuf::from("/m/a.mkv")]
        );
        assert_matches!(
            add_subtitle(&conn, Path::new("/m/a.mkv"), &sub),
            Err(Error::Conflict(_))
        );
        assert_matches!(
            add_subtitle(&conn, Path::new("/m/none.mkv"), &sub),
            Err(Error::NotFound(_))
        );

        remove_subtitle(&conn, Path::new("/m/a.mkv"), &sub.path).unwrap();
        assert!(!is_subtitle_path_present(&conn, &sub.path).unwrap());
        assert_matches!(
            remove_subtitle(&conn, Path::new("/m/a.mkv"), &sub.path),
            Err(Error::NotFound(_))
        );
    }

    #[test]
    fn test_films_by_volume_and_volume_cleanup() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();
        let first = VolumeId::new();
        let second = VolumeId::new();

        let mut shared = test_film("/a/Heat.mkv", first, Some(949));
        shared.volume_files.push(VolumeFile::new("/b/Heat.mkv", second));
        save_film(&conn, &shared).unwrap();
        let only_first = test_film("/a/Ronin.mkv", first, Some(8195));
        save_film(&conn, &only_first).unwrap();

        assert_eq!(films_by_volume(&conn, first).unwrap().len(), 2);
        assert_eq!(films_by_volume(&conn, second).unwrap().len(), 1);

        let deleted = delete_volume_files_of_volume(&conn, first).unwrap();
        assert_eq!(deleted, 1);

        let remaining = list_films(&conn).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, shared.id);
        assert_eq!(remaining[0].volume_files.len(), 1);
        assert_eq!(remaining[0].volume_files[0].path, PathBuf::from("/b/Heat.mkv"));
    }
}
