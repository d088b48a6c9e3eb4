//! Server-rendered pages. Each card carries its display fields as `data-*`
//! attributes so the in-page script can open the detail modal without another
//! request.

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};
use std::fmt::Write;

use super::auth::PostLogin;
use crate::models::AnnotatedAnime;

/// Jikan genre ids offered by the filter select.
pub const GENRES: &[(u32, &str)] = &[
    (1, "Action"),
    (2, "Adventure"),
    (4, "Comedy"),
    (8, "Drama"),
    (10, "Fantasy"),
    (14, "Horror"),
    (7, "Mystery"),
    (22, "Romance"),
    (24, "Sci-Fi"),
    (36, "Slice of Life"),
    (30, "Sports"),
    (37, "Supernatural"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    Index,
    Search,
    Favorites,
    Login,
    Signup,
}

impl PageKind {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Search => "search",
            Self::Favorites => "favorites",
            Self::Login => "login",
            Self::Signup => "signup",
        }
    }
}

fn layout(title: &str, kind: PageKind, logged_in: bool, body: &str) -> String {
    let mut html = String::with_capacity(body.len() + 2048);

    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{title} | Animark</title>
<link rel="stylesheet" href="/static/style.css">
</head>
<body data-logged-in="{logged_in}" data-page="{page}">
<nav class="navbar">
  <a class="brand" href="/">Animark</a>
  <button id="hamburger" class="hamburger" aria-label="Menu">&#9776;</button>
  <ul id="menu" class="menu">
    <li><a href="/">Home</a></li>
"#,
        title = text(title),
        page = kind.as_str(),
    );

    if logged_in {
        html.push_str(
            "    <li><a href=\"/favorites\">Favorites</a></li>\n    <li><a href=\"/logout\">Logout</a></li>\n",
        );
    } else {
        html.push_str(
            "    <li><a href=\"/login\">Login</a></li>\n    <li><a href=\"/signup\">Sign up</a></li>\n",
        );
    }

    let _ = write!(
        html,
        r#"  </ul>
</nav>
<main>
{body}
</main>
<div id="modal" class="modal">
  <div class="modal-content">
    <span id="modalClose" class="close">&times;</span>
    <div id="modalBody"></div>
  </div>
</div>
<script src="/static/app.js"></script>
</body>
</html>
"#
    );

    html
}

fn card(item: &AnnotatedAnime) -> String {
    let anime = &item.anime;
    let episodes = anime.display_episodes();
    let score = anime.display_score();
    let (class, label) = if item.is_favorited {
        ("favorite-btn favorited", "Added to Favorites")
    } else {
        ("favorite-btn", "Add to Favorites")
    };

    format!(
        r#"<div class="anime-card" data-id="{id}" data-title="{title_attr}" data-episodes="{episodes}" data-score="{score}" data-synopsis="{synopsis}">
  <div class="anime-card-content">
    <img src="{image}" alt="{title_attr}">
    <div class="anime-info">
      <h3>{title}</h3>
      <p>Score: {score}</p>
      <p>Episodes: {episodes}</p>
    </div>
  </div>
  <div class="anime-card-footer">
    <button class="{class}" data-id="{id}">{label}</button>
  </div>
</div>
"#,
        id = anime.mal_id,
        title_attr = attr(&anime.title),
        title = text(&anime.title),
        episodes = text(&episodes),
        score = text(&score),
        synopsis = attr(anime.display_synopsis()),
        image = attr(anime.image_url().unwrap_or_default()),
    )
}

fn card_grid(list: &[AnnotatedAnime]) -> String {
    let mut html = String::from("<div id=\"animeList\" class=\"anime-list\">\n");
    for item in list {
        html.push_str(&card(item));
    }
    html.push_str("</div>\n");
    html
}

fn search_form(query: &str) -> String {
    format!(
        r#"<form class="search-form" action="/search" method="get">
  <input type="text" name="q" placeholder="Search anime..." value="{}">
  <button type="submit">Search</button>
</form>
"#,
        attr(query)
    )
}

fn genre_select() -> String {
    let mut html = String::from(
        "<select id=\"genreSelect\" class=\"genre-select\">\n  <option value=\"\">All genres</option>\n",
    );
    for (id, name) in GENRES {
        let _ = writeln!(html, "  <option value=\"{id}\">{name}</option>");
    }
    html.push_str("</select>\n");
    html
}

/// Top list with genre filter, search box and a load-more control.
#[must_use]
pub fn index_page(list: &[AnnotatedAnime], page: u32, logged_in: bool) -> String {
    let body = format!(
        r#"<section class="controls">
{search}{genres}</section>
{grid}<button id="loadMoreBtn" class="load-more" data-page="{page}">Load more</button>
"#,
        search = search_form(""),
        genres = genre_select(),
        grid = card_grid(list),
    );
    layout("Top Anime", PageKind::Index, logged_in, &body)
}

#[must_use]
pub fn search_page(query: &str, list: &[AnnotatedAnime], logged_in: bool) -> String {
    let results = if list.is_empty() {
        "<p class=\"empty\">No results found.</p>\n".to_string()
    } else {
        card_grid(list)
    };

    let body = format!(
        "<section class=\"controls\">\n{search}</section>\n<h2>Results for \"{q}\"</h2>\n{results}",
        search = search_form(query),
        q = text(query),
    );
    layout("Search", PageKind::Search, logged_in, &body)
}

#[must_use]
pub fn favorites_page(list: &[AnnotatedAnime]) -> String {
    let results = if list.is_empty() {
        "<p class=\"empty\">You have no favorites yet.</p>\n<div id=\"animeList\" class=\"anime-list\"></div>\n"
            .to_string()
    } else {
        card_grid(list)
    };

    let body = format!("<h2>Your Favorites</h2>\n{results}");
    layout("Favorites", PageKind::Favorites, true, &body)
}

fn hidden_target(target: &PostLogin) -> String {
    let mut html = format!(
        "  <input type=\"hidden\" name=\"next\" value=\"{}\">\n",
        attr(&target.next)
    );
    if let Some(id) = target.favorite {
        let _ = writeln!(
            html,
            "  <input type=\"hidden\" name=\"favorite\" value=\"{id}\">"
        );
    }
    html
}

fn credentials_form(action: &str, submit: &str, target: &PostLogin) -> String {
    format!(
        r#"<form class="auth-form" action="{action}" method="post">
  <label>Email <input type="email" name="email" required></label>
  <label>Password <input type="password" name="password" required></label>
{hidden}  <button type="submit">{submit}</button>
</form>
"#,
        hidden = hidden_target(target),
    )
}

#[must_use]
pub fn login_page(error: bool, target: &PostLogin, google_enabled: bool) -> String {
    let mut body = String::from("<h2>Login</h2>\n");
    if error {
        body.push_str("<p class=\"error\">Invalid email or password.</p>\n");
    }
    body.push_str(&credentials_form("/login", "Login", target));

    if google_enabled {
        let _ = writeln!(
            body,
            "<a class=\"google-btn\" href=\"{}\">Sign in with Google</a>",
            attr(&target.link_to("/auth/google"))
        );
    }
    let _ = writeln!(
        body,
        "<p>No account? <a href=\"{}\">Sign up</a></p>",
        attr(&target.link_to("/signup"))
    );

    layout("Login", PageKind::Login, false, &body)
}

#[must_use]
pub fn signup_page(error: bool, target: &PostLogin) -> String {
    let mut body = String::from("<h2>Sign up</h2>\n");
    if error {
        body.push_str("<p class=\"error\">Email and password are required.</p>\n");
    }
    body.push_str(&credentials_form("/signup", "Create account", target));
    let _ = writeln!(
        body,
        "<p>Already registered? <a href=\"{}\">Login</a></p>",
        attr(&target.link_to("/login"))
    );

    layout("Sign up", PageKind::Signup, false, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Anime;

    fn item(id: i64, title: &str, favorited: bool) -> AnnotatedAnime {
        let anime: Anime = serde_json::from_value(serde_json::json!({
            "mal_id": id,
            "title": title,
            "episodes": null,
            "score": 8.5,
            "images": { "jpg": { "image_url": "https://cdn.example/a.jpg" } }
        }))
        .unwrap();
        AnnotatedAnime::new(anime, favorited)
    }

    #[test]
    fn cards_escape_titles_and_show_favorite_state() {
        let html = index_page(
            &[item(1, "<Bebop> & \"Friends\"", true), item(2, "Plain", false)],
            1,
            true,
        );

        assert!(html.contains("&lt;Bebop&gt; &amp;"));
        assert!(!html.contains("<Bebop>"));
        assert!(html.contains("Added to Favorites"));
        assert!(html.contains("Add to Favorites"));
        assert!(html.contains(r#"data-episodes="N/A""#));
        assert!(html.contains(r#"data-synopsis="No synopsis available.""#));
        assert!(html.contains(r#"data-logged-in="true""#));
        assert!(html.contains("id=\"loadMoreBtn\""));
    }

    #[test]
    fn login_form_carries_pending_target() {
        let target = PostLogin {
            next: "/search?q=x".to_string(),
            favorite: Some(42),
        };
        let html = login_page(true, &target, true);

        assert!(html.contains("Invalid email or password."));
        assert!(html.contains(r#"name="next" value="/search?q=x""#));
        assert!(html.contains(r#"name="favorite" value="42""#));
        assert!(html.contains("/auth/google?next=%2Fsearch%3Fq%3Dx&amp;favorite=42"));
        assert!(html.contains(r#"href="/signup?next=%2Fsearch%3Fq%3Dx&amp;favorite=42""#));
    }

    #[test]
    fn signup_form_links_back_with_target() {
        let target = PostLogin {
            next: "/favorites".to_string(),
            favorite: Some(7),
        };
        let html = signup_page(false, &target);

        assert!(html.contains(r#"name="favorite" value="7""#));
        assert!(html.contains(r#"href="/login?next=%2Ffavorites&amp;favorite=7""#));
    }

    #[test]
    fn google_button_hidden_when_disabled() {
        let html = login_page(false, &PostLogin::default(), false);
        assert!(!html.contains("Sign in with Google"));
        assert!(!html.contains("class=\"error\""));
        assert!(!html.contains("name=\"favorite\""));
        assert!(html.contains(r#"href="/signup""#));
    }
}
