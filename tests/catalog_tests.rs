mod common;

use axum::http::StatusCode;
use common::{body_json, body_text, location, spawn_app, spawn_app_with, test_config};
use serde_json::json;

#[tokio::test]
async fn test_index_marks_favorites() {
    let app = spawn_app().await;
    let cookie = app.signup("fan@example.com", "hunter22").await;
    app.post_json("/favorites/add", &json!({ "animeId": 42 }), Some(&cookie))
        .await;

    let response = app.get_json("/", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["page"], 1);
    for item in body["animeList"].as_array().unwrap() {
        let expected = item["mal_id"] == 42;
        assert_eq!(item["isFavorited"], expected, "item {}", item["mal_id"]);
    }
    // Upstream fields pass through untouched.
    assert_eq!(body["animeList"][0]["rank"], 41);
}

#[tokio::test]
async fn test_index_for_anonymous_users() {
    let app = spawn_app().await;

    let body = body_json(app.get_json("/?page=2", None).await).await;
    assert_eq!(body["page"], 2);
    let list = body["animeList"].as_array().unwrap();
    assert_eq!(list[0]["mal_id"], 81);
    assert!(list.iter().all(|a| a["isFavorited"] == false));

    let body = body_json(app.get_json("/?page=abc", None).await).await;
    assert_eq!(body["page"], 1);
}

#[tokio::test]
async fn test_index_renders_page() {
    let app = spawn_app().await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("<!DOCTYPE html>"));
    assert!(html.contains("Anime 41"));
    assert!(html.contains(r#"data-logged-in="false""#));
    assert!(html.contains("id=\"genreSelect\""));
}

#[tokio::test]
async fn test_upstream_failure_is_generic_500() {
    let mut config = test_config("http://127.0.0.1:9");
    config.catalog.request_timeout_seconds = 2;
    let app = spawn_app_with(config).await;

    let response = app.get("/", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Failed to fetch anime data");

    let response = app.get_json("/", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to fetch anime data");
}

#[tokio::test]
async fn test_genre_without_id_is_empty() {
    let app = spawn_app().await;

    for uri in ["/genre", "/genre?genre=", "/genre?genre=action"] {
        let response = app.get_json(uri, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({ "animeList": [] }));
    }
}

#[tokio::test]
async fn test_genre_listing() {
    let app = spawn_app().await;
    let cookie = app.signup("fan@example.com", "hunter22").await;
    app.post_json("/favorites/add", &json!({ "animeId": 2203 }), Some(&cookie))
        .await;

    let body = body_json(app.get_json("/genre?genre=22&page=3", Some(&cookie)).await).await;
    assert_eq!(body["animeList"][0]["mal_id"], 2203);
    assert_eq!(body["animeList"][0]["isFavorited"], true);

    let response = app.get("/genre?genre=13", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await["error"],
        "Failed to fetch anime by genre"
    );
}

#[tokio::test]
async fn test_search() {
    let app = spawn_app().await;

    let response = app.get("/search", None).await;
    assert_eq!(location(&response), "/");
    let response = app.get("/search?q=+", None).await;
    assert_eq!(location(&response), "/");

    let cookie = app.signup("fan@example.com", "hunter22").await;
    app.post_json("/favorites/add", &json!({ "animeId": 42 }), Some(&cookie))
        .await;

    let html = body_text(app.get("/search?q=bebop", Some(&cookie)).await).await;
    assert!(html.contains(r#"Results for "bebop""#));
    assert!(html.contains("Added to Favorites"));

    let body = body_json(app.get_json("/search?q=bebop", Some(&cookie)).await).await;
    let list = body["animeList"].as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["isFavorited"], true);
    assert_eq!(list[1]["isFavorited"], false);

    let response = app.get("/search?q=broken", None).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_text(response).await, "Failed to search anime");
}
