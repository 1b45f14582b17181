//! Volume database queries.

use std::path::PathBuf;

use rusqlite::Connection;
use starfin_common::{Error, MediaKind, Result, VolumeId};

use super::{db_error, is_constraint_violation, path_text, timestamp_column, uuid_column};
use crate::models::Volume;

const VOLUME_COLUMNS: &str = "id, name, path, is_recursive, media_kind, created_at";

fn parse_volume_row(row: &rusqlite::Row) -> rusqlite::Result<Volume> {
    let path: String = row.get(2)?;
    let media_kind: String = row.get(4)?;
    let media_kind = media_kind.parse::<MediaKind>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
        )
    })?;

    Ok(Volume {
        id: VolumeId::from(uuid_column(row, 0)?),
        name: row.get(1)?,
        path: PathBuf::from(path),
        is_recursive: row.get(3)?,
        media_kind,
        created_at: timestamp_column(row, 5)?,
    })
}

/// Insert a volume.
///
/// Returns `Conflict` when another volume already has the same root path.
pub fn insert_volume(conn: &Connection, volume: &Volume) -> Result<()> {
    conn.execute(
        "INSERT INTO volumes (id, name, path, is_recursive, media_kind, created_at)
         VALUES (:id, :name, :path, :is_recursive, :media_kind, :created_at)",
        rusqlite::named_params! {
            ":id": volume.id.to_string(),
            ":name": &volume.name,
            ":path": path_text(&volume.path),
            ":is_recursive": volume.is_recursive,
            ":media_kind": volume.media_kind.to_string(),
            ":created_at": volume.created_at.to_rfc3339(),
        },
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            Error::conflict(format!(
                "a volume is already registered at {}",
                volume.path.display()
            ))
        } else {
            db_error(e)
        }
    })?;

    Ok(())
}

/// Get a volume by ID.
pub fn get_volume(conn: &Connection, id: VolumeId) -> Result<Option<Volume>> {
    let result = conn.query_row(
        &format!("SELECT {VOLUME_COLUMNS} FROM volumes WHERE id = :id"),
        rusqlite::named_params! { ":id": id.to_string() },
        parse_volume_row,
    );

    match result {
        Ok(volume) => Ok(Some(volume)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(db_error(e)),
    }
}

/// List all volumes, ordered by name.
pub fn list_volumes(conn: &Connection) -> Result<Vec<Volume>> {
    let mut stmt = conn
        .prepare(&format!("SELECT {VOLUME_COLUMNS} FROM volumes ORDER BY name"))
        .map_err(db_error)?;

    let volumes = stmt
        .query_map([], parse_volume_row)
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;

    Ok(volumes)
}

/// Delete a volume row. Returns `true` if a row was removed.
///
/// Films are not touched; see [`crate::queries::films::delete_volume_files_of_volume`].
pub fn delete_volume(conn: &Connection, id: VolumeId) -> Result<bool> {
    let affected = conn
        .execute(
            "DELETE FROM volumes WHERE id = :id",
            rusqlite::named_params! { ":id": id.to_string() },
        )
        .map_err(db_error)?;

    Ok(affected > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::init_memory_pool;
    use assert_matches::assert_matches;

    #[test]
    fn test_insert_and_get_volume() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let volume = Volume::new("Films", "/media/films", true, MediaKind::Movies);
        insert_volume(&conn, &volume).unwrap();

        let found = get_volume(&conn, volume.id).unwrap().unwrap();
        assert_eq!(found.name, "Films");
        assert_eq!(found.path, PathBuf::from("/media/films"));
        assert!(found.is_recursive);
        assert_eq!(found.media_kind, MediaKind::Movies);

        assert!(get_volume(&conn, VolumeId::new()).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_root_is_conflict() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        insert_volume(&conn, &Volume::new("A", "/media/a", true, MediaKind::Movies)).unwrap();
        let duplicate = Volume::new("B", "/media/a", false, MediaKind::Movies);
        assert_matches!(insert_volume(&conn, &duplicate), Err(Error::Conflict(_)));
    }

    #[test]
    fn test_list_and_delete_volumes() {
        let pool = init_memory_pool().unwrap();
        let conn = pool.get().unwrap();

        let b = Volume::new("Beta", "/media/b", true, MediaKind::Movies);
        let a = Volume::new("Alpha", "/media/a", false, MediaKind::TvShows);
        insert_volume(&conn, &b).unwrap();
        insert_volume(&conn, &a).unwrap();

        let names: Vec<_> = list_volumes(&conn)
            .unwrap()
            .into_iter()
            .map(|v| v.name)
            .collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);

        assert!(delete_volume(&conn, a.id).unwrap());
        assert!(!delete_volume(&conn, a.id).unwrap());
        assert_eq!(list_volumes(&conn).unwrap().len(), 1);
    }
}
