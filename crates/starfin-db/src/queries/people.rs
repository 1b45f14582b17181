//! Person database queries.

use rusqlite::{Connection, OptionalExtension};
use starfin_common::{PersonId, Result};

use super::{db_error, uuid_column};
use crate::models::Person;

fn parse_person_row(row: &rusqlite::Row) -> rusqlite::Result<Person> {
    Ok(Person {
        id: PersonId::from(uuid_column(row, 0)?),
        tmdb_id: row.get(1)?,
        name: row.get(2)?,
        photo: row.get(3)?,
        bio: row.get(4)?,
        birthday: row.get(5)?,
        deathday: row.get(6)?,
        imdb_id: row.get(7)?,
    })
}

/// Whether a person with this TMDB id is stored.
pub fn is_person_present(conn: &Connection, tmdb_id: i64) -> Result<bool> {
    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM people WHERE tmdb_id = ?)",
        [tmdb_id],
        |row| row.get(0),
    )
    .map_err(db_error)
}

/// Insert a person unless one with the same TMDB id exists.
///
/// Returns `true` when a row was inserted.
pub fn insert_person(conn: &Connection, person: &Person) -> Result<bool> {
    let inserted = conn
        .execute(
            "INSERT INTO people (id, tmdb_id, name, photo, bio, birthday, deathday, imdb_id)
             VALUES (:id, :tmdb_id, :name, :photo, :bio, :birthday, :deathday, :imdb_id)
             ON CONFLICT(tmdb_id) DO NOTHING",
            rusqlite::named_params! {
                ":id": person.id.to_string(),
                ":tmdb_id": person.tmdb_id,
                ":name": &person.name,
                ":photo": &person.photo,
                ":bio": &person.bio,
                ":birthday": &person.birthday,
                ":deathday": &person.deathday,
                ":imdb_id": &person.imdb_id,
            },
        )
        .map_err(db_error)?;

    Ok(inserted > 0)
}

/// Get a person by TMDB id.
pub fn get_person_by_tmdb_id(conn: &Connection, tmdb_id: i64) -> Result<Option<Person>> {
    conn.query_row(
        "SELECT id, tmdb_id, name, photo, bio, birthday, deathday, imdb_id
         FROM people WHERE tmdb_id = ?",
        [tmdb_id],
        parse_person_row,
    )
    .optional()
    .map_err(db_error)
}

/// List every stored person, ordered by name.
pub fn list_people(conn: &Connection) -> Result<Vec<Person>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, tmdb_id, name, photo, bio, birthday, deathday, imdb_id
             FROM people ORDER BY name, tmdb_id",
        )
        .map_err(db_error)?;

    let people = stmt
        .query_map([], parse_person_row)
        .map_err(db_error)?
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(db_error)?;

    Ok(people)
}
