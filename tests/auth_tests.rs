mod common;

use animark::models::AuthProvider;
use axum::http::StatusCode;
use axum::http::header;
use common::{
    body_json, body_text, location, session_cookie, spawn_app, spawn_app_with, spawn_upstream,
    test_config,
};
use serde_json::json;

#[tokio::test]
async fn test_signup_logs_in() {
    let app = spawn_app().await;
    let cookie = app.signup("new@example.com", "hunter22").await;

    let response = app.get_json("/favorites", Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "animeList": [] }));
}

#[tokio::test]
async fn test_duplicate_signup_redirects_to_login() {
    let app = spawn_app().await;
    app.signup("dup@example.com", "hunter22").await;

    let response = app
        .post_form("/signup", "email=+dup%40example.com+&password=other", None)
        .await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/login");
    assert!(session_cookie(&response).is_none());

    let response = app.login("dup@example.com", "other").await;
    assert_eq!(location(&response), "/login?error=1");
    let response = app.login("dup@example.com", "hunter22").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_signup_requires_both_fields() {
    let app = spawn_app().await;

    let response = app.post_form("/signup", "email=a%40example.com&password=", None).await;
    assert_eq!(location(&response), "/signup?error=1");

    let response = app.post_form("/signup", "email=++&password=secret", None).await;
    assert_eq!(location(&response), "/signup?error=1");
}

#[tokio::test]
async fn test_login_failures_are_indistinguishable() {
    let app = spawn_app().await;
    app.signup("user@example.com", "right-password").await;

    let wrong_password = app.login("user@example.com", "wrong-password").await;
    let unknown_email = app.login("ghost@example.com", "right-password").await;

    assert_eq!(wrong_password.status(), unknown_email.status());
    assert_eq!(location(&wrong_password), "/login?error=1");
    assert_eq!(location(&unknown_email), "/login?error=1");
    assert!(session_cookie(&wrong_password).is_none());

    let page = app.get("/login?error=1", None).await;
    assert!(body_text(page).await.contains("Invalid email or password."));
}

#[tokio::test]
async fn test_login_trims_credentials() {
    let app = spawn_app().await;
    app.signup("trim@example.com", "secret").await;

    let response = app.login("  trim@example.com ", " secret ").await;
    assert_eq!(location(&response), "/");
    assert!(session_cookie(&response).is_some());
}

#[tokio::test]
async fn test_oauth_only_account_cannot_log_in_locally() {
    let app = spawn_app().await;
    app.state
        .store()
        .find_or_create_external_user("oauth@example.com", AuthProvider::Google)
        .await
        .unwrap();

    let response = app.login("oauth@example.com", "").await;
    assert_eq!(location(&response), "/login?error=1");

    let response = app.login("oauth@example.com", "anything").await;
    assert_eq!(location(&response), "/login?error=1");
}

#[tokio::test]
async fn test_pending_favorite_is_stored_on_login() {
    let app = spawn_app().await;
    app.signup("fan@example.com", "hunter22").await;

    let response = app
        .post_form(
            "/login",
            "email=fan%40example.com&password=hunter22&next=%2Fsearch%3Fq%3Dbebop&favorite=42",
            None,
        )
        .await;
    assert_eq!(location(&response), "/search?q=bebop");

    let user_id = app.user_id("fan@example.com").await;
    let ids = app.state.store().list_favorites(user_id).await.unwrap();
    assert_eq!(ids, vec![42]);
}

#[tokio::test]
async fn test_signup_from_login_keeps_pending_favorite() {
    let app = spawn_app().await;

    let login = body_text(app.get("/login?next=%2Ffavorites&favorite=42", None).await).await;
    assert!(login.contains(r#"href="/signup?next=%2Ffavorites&amp;favorite=42""#));

    let signup = body_text(app.get("/signup?next=%2Ffavorites&favorite=42", None).await).await;
    assert!(signup.contains(r#"name="next" value="/favorites""#));
    assert!(signup.contains(r#"name="favorite" value="42""#));

    let response = app
        .post_form(
            "/signup",
            "email=new%40example.com&password=hunter22&next=%2Ffavorites&favorite=42",
            None,
        )
        .await;
    assert_eq!(location(&response), "/favorites");
    assert!(session_cookie(&response).is_some());

    let user_id = app.user_id("new@example.com").await;
    let ids = app.state.store().list_favorites(user_id).await.unwrap();
    assert_eq!(ids, vec![42]);
}

#[tokio::test]
async fn test_failed_login_keeps_pending_target() {
    let app = spawn_app().await;

    let response = app
        .post_form(
            "/login",
            "email=ghost%40example.com&password=x&next=%2Ffavorites&favorite=42",
            None,
        )
        .await;
    assert_eq!(
        location(&response),
        "/login?error=1&next=%2Ffavorites&favorite=42"
    );

    let page = body_text(app.get("/login?error=1&next=%2Ffavorites&favorite=42", None).await).await;
    assert!(page.contains(r#"name="next" value="/favorites""#));
    assert!(page.contains(r#"name="favorite" value="42""#));
}

#[tokio::test]
async fn test_unsafe_next_falls_back_to_index() {
    let app = spawn_app().await;
    app.signup("user@example.com", "hunter22").await;

    for next in ["https%3A%2F%2Fevil.example%2F", "%2F%2Fevil.example"] {
        let form = format!("email=user%40example.com&password=hunter22&next={next}");
        let response = app.post_form("/login", &form, None).await;
        assert_eq!(location(&response), "/");
    }
}

#[tokio::test]
async fn test_logout_clears_session() {
    let app = spawn_app().await;
    let cookie = app.signup("user@example.com", "hunter22").await;

    let response = app.get("/logout", Some(&cookie)).await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");

    let response = app
        .post_json("/favorites/add", &json!({ "animeId": 42 }), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_google_login_disabled_without_client_id() {
    let app = spawn_app().await;

    let response = app.get("/auth/google", None).await;
    assert_eq!(location(&response), "/login?error=1");

    let response = app.get("/auth/google/callback?code=x&state=y", None).await;
    assert_eq!(location(&response), "/login?error=1");
}

#[tokio::test]
async fn test_session_cookie_lasts_one_day() {
    let app = spawn_app().await;

    let response = app
        .post_form("/signup", "email=day%40example.com&password=hunter22", None)
        .await;
    let set_cookie = response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with(animark::api::SESSION_COOKIE))
        .unwrap()
        .to_string();

    let max_age: i64 = set_cookie
        .split(';')
        .map(str::trim)
        .find_map(|attr| attr.strip_prefix("Max-Age="))
        .unwrap()
        .parse()
        .unwrap();
    assert!((24 * 3600 - 60..=24 * 3600).contains(&max_age), "{set_cookie}");
    assert!(set_cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn test_expired_login_is_anonymous() {
    let upstream = spawn_upstream().await;
    let mut config = test_config(&upstream);
    config.server.session_ttl_hours = 0;
    let app = spawn_app_with(config).await;

    let response = app
        .post_form("/signup", "email=late%40example.com&password=hunter22", None)
        .await;
    assert_eq!(location(&response), "/");
    let cookie = session_cookie(&response).unwrap();

    let response = app
        .post_json("/favorites/add", &json!({ "animeId": 42 }), Some(&cookie))
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.get("/favorites", Some(&cookie)).await;
    assert_eq!(location(&response), "/login?next=/favorites");
}
