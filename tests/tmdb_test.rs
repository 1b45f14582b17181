//! Integration tests for the TMDB client and the rating scrapers against a
//! mock HTTP server.

mod common;

use std::sync::Arc;

use common::StubProbe;
use serde_json::json;
use starfin::metadata::{
    Enricher, LetterboxdScraper, MetadataProvider, RatingScraper, TmdbProvider,
};
use starfin_common::VolumeId;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn provider(server: &MockServer) -> TmdbProvider {
    TmdbProvider::new("test-key".to_string(), "en-US".to_string())
        .unwrap()
        .with_base_url(&server.uri())
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

#[tokio::test]
async fn search_keeps_provider_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("api_key", "test-key"))
        .and(query_param("language", "en-US"))
        .and(query_param("query", "Heat"))
        .and(query_param("year", "1995"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "page": 1,
            "results": [
                {"id": 949, "title": "Heat", "popularity": 41.5},
                {"id": 55, "title": "Heat Wave", "popularity": null},
                {"id": 71, "popularity": 3.0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = provider(&server).search_movie("Heat", Some(1995)).await.unwrap();
    let ids: Vec<i64> = results.iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![949, 55, 71]);
    assert_eq!(results[1].popularity, 0.0);
    assert_eq!(results[2].title, "");
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [{"id": 603, "title": "The Matrix", "popularity": 80.0}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let results = provider(&server).search_movie("The Matrix", None).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, 603);
}

#[tokio::test]
async fn retries_give_up_after_three_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .expect(4)
        .mount(&server)
        .await;

    let err = provider(&server).movie_details(603).await.unwrap_err();
    assert!(format!("{err:#}").contains("429"));
}

#[tokio::test]
async fn server_error_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/movie/603/credits"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    assert!(provider(&server).movie_credits(603).await.is_err());
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

#[tokio::test]
async fn find_by_imdb_id() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/find/tt0133093"))
        .and(query_param("external_source", "imdb_id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "movie_results": [{"id": 603}],
            "person_results": []
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/find/tt0000000"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"movie_results": []})))
        .mount(&server)
        .await;

    let tmdb = provider(&server);
    assert_eq!(tmdb.find_by_imdb_id("tt0133093").await.unwrap(), Some(603));
    assert_eq!(tmdb.find_by_imdb_id("tt0000000").await.unwrap(), None);
}

#[tokio::test]
async fn enrichment_through_tmdb() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/movie"))
        .and(query_param("query", "The Matrix"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"id": 603, "title": "The Matrix", "popularity": 80.0},
                {"id": 604, "title": "The Matrix Reloaded", "popularity": 90.0}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/603"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 603,
            "imdb_id": "tt0133093",
            "title": "The Matrix",
            "original_title": "The Matrix",
            "release_date": "1999-03-30",
            "runtime": 136,
            "tagline": "Welcome to the Real World.",
            "overview": null,
            "poster_path": "/f89U3ADr1oiB1s9GkdPOEpXUk5H.jpg",
            "backdrop_path": null,
            "genres": [{"id": 28, "name": "Action"}, {"id": 878, "name": "Science Fiction"}],
            "production_countries": [{"iso_3166_1": "US", "name": "United States of America"}]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/603/credits"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "cast": [{"id": 6384, "character": "Neo"}],
            "crew": [
                {"id": 9339, "job": "Director", "department": "Directing"},
                {"id": 9339, "job": "Screenplay", "department": "Writing"},
                {"id": 9340, "job": "Director", "department": "Directing"}
            ]
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/movie/603/release_dates"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"iso_3166_1": "FR", "release_dates": [{"certification": "12"}]},
                {"iso_3166_1": "US", "release_dates": [{"certification": "R"}, {"certification": ""}]}
            ]
        })))
        .mount(&server)
        .await;

    let tmdb: Arc<dyn MetadataProvider> = Arc::new(provider(&server));
    let enricher = Enricher::new(tmdb, Arc::new(StubProbe));
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("The.Matrix.1999.2160p.mkv");
    std::fs::write(&file, b"").unwrap();

    let mut film = enricher.create_entry(&file, VolumeId::new(), &[]).await;
    assert_eq!(film.name, "The Matrix");
    assert_eq!(film.resolution, "2160p");
    enricher.enrich(&mut film).await;

    // The more popular sequel is too far from the name once a match exists.
    assert_eq!(film.tmdb_id, Some(603));
    assert_eq!(film.imdb_id, "tt0133093");
    assert_eq!(film.title, "The Matrix");
    assert_eq!(film.year, "1999");
    assert_eq!(film.runtime, "136");
    assert_eq!(film.overview, "");
    assert_eq!(film.genres, vec!["Action", "Science Fiction"]);
    assert_eq!(film.countries, vec!["US"]);
    assert_eq!(film.classification, "R");
    assert_eq!(film.directors, vec![9339, 9340]);
    assert_eq!(film.writers, vec![9339]);
    assert_eq!(film.cast.len(), 1);
    assert_eq!(film.cast[0].character, "Neo");
    assert_eq!(film.cast[0].actor_id, 6384);
    // No scrapers configured.
    assert_eq!(film.imdb_rating, "");
}

// ---------------------------------------------------------------------------
// Ratings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn letterboxd_rating_goes_through_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/search/films/tt0113277/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><body><div id="content"><div><div><section><ul>
                <li><div data-target-link="/film/heat-1995/"></div></li>
            </ul></section></div></div></div></body></html>"#,
        ))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/csi/film/heat-1995/rating-histogram/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<section><span class="average-rating"><a class="display-rating" href="/film/heat-1995/ratings/">4.2</a></span></section>"#,
        ))
        .mount(&server)
        .await;

    let scraper = LetterboxdScraper::new().unwrap().with_base_url(&server.uri());
    assert_eq!(scraper.rating("tt0113277").await.unwrap(), "4.2");
    assert!(scraper.rating("tt9999999").await.is_err());
}
