#![allow(dead_code)]

use animark::{api::AppState, config::Config};
use axum::{
    Json, Router,
    body::Body,
    extract::{Path, Query},
    http::{Request, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

/// Lookups for this id always fail upstream.
pub const BROKEN_ID: i64 = 999;

pub struct TestApp {
    pub router: Router,
    pub state: Arc<AppState>,
}

fn anime(id: i64) -> Value {
    json!({
        "mal_id": id,
        "title": format!("Anime {id}"),
        "episodes": 12,
        "score": 8.1,
        "synopsis": "Stub entry",
        "images": { "jpg": { "image_url": format!("https://cdn.example/{id}.jpg") } },
        "rank": id
    })
}

/// Serves a fixed slice of the catalog API on a random local port.
///
/// Top list page `n` holds ids `40n+1..=40n+3` (page 1: 41, 42, 43). Genre
/// listings hold `genre * 100 + page`. Search returns 42 and 7.
pub async fn spawn_upstream() -> String {
    let router = Router::new()
        .route(
            "/top/anime",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                let page: i64 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
                let first = 40 * page + 1;
                Json(json!({ "data": (first..first + 3).map(anime).collect::<Vec<_>>() }))
            }),
        )
        .route(
            "/anime",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                if let Some(genre) = q.get("genres") {
                    if genre == "13" {
                        return StatusCode::SERVICE_UNAVAILABLE.into_response();
                    }
                    let genre: i64 = genre.parse().unwrap_or(0);
                    let page: i64 = q.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
                    return Json(json!({ "data": [anime(genre * 100 + page)] })).into_response();
                }
                if q.get("q").map(String::as_str) == Some("broken") {
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
                Json(json!({ "data": [anime(42), anime(7)] })).into_response()
            }),
        )
        .route(
            "/anime/{id}",
            get(|Path(id): Path<i64>| async move {
                if id == BROKEN_ID {
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                } else {
                    Json(json!({ "data": anime(id) })).into_response()
                }
            }),
        );

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

pub fn test_config(upstream: &str) -> Config {
    let db_path =
        std::env::temp_dir().join(format!("animark-it-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_url = format!("sqlite://{}", db_path.display());
    config.catalog.base_url = upstream.to_string();
    config.catalog.retry_delay_ms = 1;
    config.catalog.favorites_pacing_ms = 0;
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config
}

pub async fn spawn_app() -> TestApp {
    let upstream = spawn_upstream().await;
    spawn_app_with(test_config(&upstream)).await
}

pub async fn spawn_app_with(config: Config) -> TestApp {
    let state = animark::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    TestApp {
        router: animark::api::router(state.clone()),
        state,
    }
}

impl TestApp {
    pub async fn send(&self, request: Request<Body>) -> Response {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn get_json(&self, uri: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .uri(uri)
            .header("X-Requested-With", "XMLHttpRequest");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn post_form(&self, uri: &str, form: &str, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(form.to_string())).unwrap())
            .await
    }

    pub async fn post_json(&self, uri: &str, body: &Value, cookie: Option<&str>) -> Response {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Signs up `email` and returns the session cookie pair.
    pub async fn signup(&self, email: &str, password: &str) -> String {
        let form = format!(
            "email={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(password)
        );
        let response = self.post_form("/signup", &form, None).await;
        assert_eq!(location(&response), "/");
        session_cookie(&response).expect("signup should set a session cookie")
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        let form = format!(
            "email={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(password)
        );
        self.post_form("/login", &form, None).await
    }

    pub async fn user_id(&self, email: &str) -> i32 {
        self.state
            .store()
            .get_user_by_email(email)
            .await
            .unwrap()
            .expect("user should exist")
            .id
    }
}

pub fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

/// `name=value` of the session cookie set by `response`, if any.
pub fn session_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(animark::api::SESSION_COOKIE))
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}

pub async fn body_json(response: Response) -> Value {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&body).unwrap()
}

pub async fn body_text(response: Response) -> String {
    let body = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(body.to_vec()).unwrap()
}
