//! Integration tests for the create / rename / remove pipelines.

mod common;

use common::TestHarness;
use starfin_db::CatalogStore;

/// Catalog `relative` through the create pipeline.
async fn create(h: &TestHarness, volume: &starfin_db::Volume, relative: &str) {
    let path = h.touch(relative);
    h.dispatcher.create(&path, volume).await.unwrap();
}

fn rename_on_disk(h: &TestHarness, from: &str, to: &str) -> (std::path::PathBuf, std::path::PathBuf) {
    let (from, to) = (h.path(from), h.path(to));
    std::fs::rename(&from, &to).unwrap();
    (from, to)
}

// ---------------------------------------------------------------------------
// Create
// ---------------------------------------------------------------------------

#[tokio::test]
async fn create_is_skipped_for_cataloged_path() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;
    let film = h.film_at("films/Heat.1995.mkv");

    let created = h
        .dispatcher
        .create_video(&h.path("films/Heat.1995.mkv"), volume.id)
        .await
        .unwrap();
    assert!(!created);
    assert_eq!(h.films(), vec![film]);
}

#[tokio::test]
async fn subtitle_created_after_its_video_is_attached() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;
    create(&h, &volume, "films/Heat.1995.en.srt").await;

    let film = h.film_at("films/Heat.1995.mkv");
    assert_eq!(film.volume_files[0].subtitles.len(), 1);
    assert_eq!(film.volume_files[0].subtitles[0].language, "en");

    // A second create of the same subtitle is harmless.
    create(&h, &volume, "films/Heat.1995.en.srt").await;
    assert_eq!(h.film_at("films/Heat.1995.mkv").volume_files[0].subtitles.len(), 1);
}

#[tokio::test]
async fn non_media_files_are_ignored() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/cover.jpg").await;
    assert!(h.films().is_empty());
}

// ---------------------------------------------------------------------------
// Rename
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rename_to_same_film_keeps_the_entry() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/The.Matrix.1999.mkv").await;
    let before = h.film_at("films/The.Matrix.1999.mkv");

    let (from, to) = rename_on_disk(&h, "films/The.Matrix.1999.mkv", "films/The Matrix (1999).mkv");
    h.dispatcher.rename(&from, &to, Some(&volume)).await.unwrap();

    assert!(!h.store.is_path_present(&from).unwrap());
    let after = h.film_at("films/The Matrix (1999).mkv");
    assert_eq!(after.id, before.id);
    assert_eq!(after.tmdb_id, Some(603));
    assert_eq!(after.volume_files.len(), 1);
    assert_eq!(h.films().len(), 1);
}

#[tokio::test]
async fn rename_to_other_film_replaces_the_entry() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/The.Matrix.1999.mkv").await;
    let before = h.film_at("films/The.Matrix.1999.mkv");

    let (from, to) = rename_on_disk(&h, "films/The.Matrix.1999.mkv", "films/Heat.1995.mkv");
    h.dispatcher.rename(&from, &to, Some(&volume)).await.unwrap();

    let films = h.films();
    assert_eq!(films.len(), 1);
    assert_ne!(films[0].id, before.id);
    assert_eq!(films[0].tmdb_id, Some(949));
    assert_eq!(films[0].title, "Heat");
    assert_eq!(films[0].volume_files[0].path, to);
}

#[tokio::test]
async fn rename_of_uncataloged_video_creates_it() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    h.touch("films/Heat.1995.part");
    let (from, to) = rename_on_disk(&h, "films/Heat.1995.part", "films/Heat.1995.mkv");

    h.dispatcher.rename(&from, &to, Some(&volume)).await.unwrap();
    assert_eq!(h.film_at("films/Heat.1995.mkv").tmdb_id, Some(949));
}

#[tokio::test]
async fn rename_to_non_media_removes_the_video() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;

    let (from, to) = rename_on_disk(&h, "films/Heat.1995.mkv", "films/Heat.1995.mkv.bak");
    h.dispatcher.rename(&from, &to, Some(&volume)).await.unwrap();
    assert!(h.films().is_empty());
}

#[tokio::test]
async fn move_out_of_every_volume_removes_the_video() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;
    std::fs::create_dir_all(h.path("elsewhere")).unwrap();

    let (from, to) = rename_on_disk(&h, "films/Heat.1995.mkv", "elsewhere/Heat.1995.mkv");
    h.dispatcher.rename(&from, &to, None).await.unwrap();
    assert!(h.films().is_empty());
}

#[tokio::test]
async fn subtitle_rename_moves_the_attachment() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;
    create(&h, &volume, "films/The.Matrix.1999.mkv").await;
    create(&h, &volume, "films/Heat.1995.en.srt").await;

    let (from, to) = rename_on_disk(&h, "films/Heat.1995.en.srt", "films/The.Matrix.1999.en.srt");
    h.dispatcher.rename(&from, &to, Some(&volume)).await.unwrap();

    assert!(h.film_at("films/Heat.1995.mkv").volume_files[0].subtitles.is_empty());
    let matrix = h.film_at("films/The.Matrix.1999.mkv");
    assert_eq!(matrix.volume_files[0].subtitles.len(), 1);
    assert_eq!(matrix.volume_files[0].subtitles[0].path, to);
}

// ---------------------------------------------------------------------------
// Remove
// ---------------------------------------------------------------------------

#[tokio::test]
async fn remove_deletes_film_with_its_last_file() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;

    let path = h.path("films/Heat.1995.mkv");
    std::fs::remove_file(&path).unwrap();
    h.dispatcher.remove(&path).await.unwrap();
    assert!(h.films().is_empty());

    // Removing again is not an error.
    h.dispatcher.remove(&path).await.unwrap();
}

#[tokio::test]
async fn removed_subtitle_is_detached() {
    let h = TestHarness::with_classics();
    let volume = h.volume("films");
    create(&h, &volume, "films/Heat.1995.mkv").await;
    create(&h, &volume, "films/Heat.1995.en.srt").await;

    let path = h.path("films/Heat.1995.en.srt");
    std::fs::remove_file(&path).unwrap();
    h.dispatcher.remove(&path).await.unwrap();

    assert!(h.film_at("films/Heat.1995.mkv").volume_files[0].subtitles.is_empty());
    assert!(!h.store.is_subtitle_path_present(&path).unwrap());
}
