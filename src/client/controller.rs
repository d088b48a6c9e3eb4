//! Page state machine: paging, genre filter, load guard, favorite toggling and
//! the detail view. The transport is abstracted behind [`CatalogSource`].

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::models::AnnotatedAnime;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Not logged in")]
    NotLoggedIn,

    #[error("Server answered {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Unexpected response: {0}")]
    Decode(String),
}

/// What the controller needs from the service.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn top(&self, page: u32) -> Result<Vec<AnnotatedAnime>, SourceError>;

    async fn genre(&self, genre_id: u32, page: u32) -> Result<Vec<AnnotatedAnime>, SourceError>;

    async fn search(&self, query: &str) -> Result<Vec<AnnotatedAnime>, SourceError>;

    async fn favorites(&self) -> Result<Vec<AnnotatedAnime>, SourceError>;

    /// Adds when `favorited` is true, removes otherwise.
    async fn set_favorite(&self, anime_id: i64, favorited: bool) -> Result<(), SourceError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    Top,
    Genre(u32),
    Search(String),
    Favorites,
}

/// Next fetch issued by an infinite-scroll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListRequest {
    Top { page: u32 },
    Genre { genre_id: u32, page: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    Favorited,
    Unfavorited,
    /// The user must log in first; `login_path` carries the pending favorite.
    LoginRequired { anime_id: i64, login_path: String },
}

/// Contents of the detail overlay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailView {
    pub title: String,
    pub episodes: String,
    pub score: String,
    pub synopsis: String,
}

impl DetailView {
    fn of(item: &AnnotatedAnime) -> Self {
        Self {
            title: item.anime.title.clone(),
            episodes: item.anime.display_episodes(),
            score: item.anime.display_score(),
            synopsis: item.anime.display_synopsis().to_string(),
        }
    }
}

pub struct PageController<C> {
    source: C,
    view: View,
    page: u32,
    loading: bool,
    logged_in: bool,
    items: Vec<AnnotatedAnime>,
    pending_favorite: Option<i64>,
    detail: Option<DetailView>,
}

impl<C: CatalogSource> PageController<C> {
    #[must_use]
    pub const fn new(source: C, logged_in: bool) -> Self {
        Self {
            source,
            view: View::Top,
            page: 1,
            loading: false,
            logged_in,
            items: Vec::new(),
            pending_favorite: None,
            detail: None,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &C {
        &self.source
    }

    #[must_use]
    pub fn items(&self) -> &[AnnotatedAnime] {
        &self.items
    }

    #[must_use]
    pub const fn view(&self) -> &View {
        &self.view
    }

    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    #[must_use]
    pub const fn is_loading(&self) -> bool {
        self.loading
    }

    #[must_use]
    pub const fn logged_in(&self) -> bool {
        self.logged_in
    }

    #[must_use]
    pub const fn pending_favorite(&self) -> Option<i64> {
        self.pending_favorite
    }

    #[must_use]
    pub const fn detail(&self) -> Option<&DetailView> {
        self.detail.as_ref()
    }

    /// Called after a login or logout. A successful login consumes the
    /// pending favorite, which the server stored as part of the login.
    pub fn set_logged_in(&mut self, logged_in: bool) {
        self.logged_in = logged_in;
        if logged_in {
            self.pending_favorite = None;
        }
    }

    /// Path of the page the controller is showing, used as the post-login
    /// target.
    #[must_use]
    pub fn current_path(&self) -> String {
        match &self.view {
            View::Top | View::Genre(_) => "/".to_string(),
            View::Search(q) => format!("/search?q={}", urlencoding::encode(q)),
            View::Favorites => "/favorites".to_string(),
        }
    }

    fn login_path(&self, anime_id: i64) -> String {
        format!(
            "/login?next={}&favorite={anime_id}",
            urlencoding::encode(&self.current_path())
        )
    }

    /// Loads the first page of the top list.
    pub async fn open_top(&mut self) -> Result<usize, SourceError> {
        let items = self.source.top(1).await?;
        self.view = View::Top;
        self.page = 1;
        Ok(self.replace(items))
    }

    /// Selecting a genre restarts paging at 1 and replaces the result set;
    /// clearing it goes back to the unfiltered list.
    pub async fn select_genre(&mut self, genre_id: Option<u32>) -> Result<usize, SourceError> {
        let Some(genre_id) = genre_id else {
            return self.open_top().await;
        };

        self.view = View::Genre(genre_id);
        self.page = 1;
        let items = self.source.genre(genre_id, 1).await?;
        Ok(self.replace(items))
    }

    pub async fn search(&mut self, query: &str) -> Result<usize, SourceError> {
        let items = self.source.search(query).await?;
        self.view = View::Search(query.to_string());
        self.page = 1;
        Ok(self.replace(items))
    }

    pub async fn open_favorites(&mut self) -> Result<usize, SourceError> {
        match self.source.favorites().await {
            Ok(items) => {
                self.view = View::Favorites;
                self.page = 1;
                Ok(self.replace(items))
            }
            Err(SourceError::NotLoggedIn) => {
                self.logged_in = false;
                Err(SourceError::NotLoggedIn)
            }
            Err(e) => Err(e),
        }
    }

    /// Claims the load guard and advances the page. Returns `None` while a
    /// load is already in flight or the view does not page.
    pub fn begin_load(&mut self) -> Option<ListRequest> {
        if self.loading {
            return None;
        }

        let request = match self.view {
            View::Top => ListRequest::Top {
                page: self.page + 1,
            },
            View::Genre(genre_id) => ListRequest::Genre {
                genre_id,
                page: self.page + 1,
            },
            View::Search(_) | View::Favorites => return None,
        };

        self.loading = true;
        self.page += 1;
        Some(request)
    }

    /// Releases the load guard whatever the outcome and appends on success.
    pub fn finish_load(
        &mut self,
        result: Result<Vec<AnnotatedAnime>, SourceError>,
    ) -> Result<usize, SourceError> {
        self.loading = false;

        match result {
            Ok(items) => {
                let added = items.len();
                self.items.extend(items);
                Ok(added)
            }
            Err(e) => {
                warn!(page = self.page, error = %e, "Failed to load more anime");
                Err(e)
            }
        }
    }

    /// One infinite-scroll step.
    pub async fn load_more(&mut self) -> Result<usize, SourceError> {
        let Some(request) = self.begin_load() else {
            debug!("Load already in progress");
            return Ok(0);
        };

        let result = match request {
            ListRequest::Top { page } => self.source.top(page).await,
            ListRequest::Genre { genre_id, page } => self.source.genre(genre_id, page).await,
        };

        self.finish_load(result)
    }

    /// Flips the favorite state of `anime_id`.
    ///
    /// Anonymous users get [`ToggleOutcome::LoginRequired`] and the id is kept
    /// as the pending favorite. On failure the item keeps its state.
    pub async fn toggle_favorite(&mut self, anime_id: i64) -> Result<ToggleOutcome, SourceError> {
        if !self.logged_in {
            return Ok(self.require_login(anime_id));
        }

        let currently = self
            .items
            .iter()
            .find(|i| i.anime.mal_id == anime_id)
            .is_some_and(|i| i.is_favorited);

        match self.source.set_favorite(anime_id, !currently).await {
            Ok(()) => {}
            Err(SourceError::NotLoggedIn) => {
                self.logged_in = false;
                return Ok(self.require_login(anime_id));
            }
            Err(e) => return Err(e),
        }

        if currently && self.view == View::Favorites {
            self.items.retain(|i| i.anime.mal_id != anime_id);
        } else if let Some(item) = self.items.iter_mut().find(|i| i.anime.mal_id == anime_id) {
            item.is_favorited = !currently;
        }

        Ok(if currently {
            ToggleOutcome::Unfavorited
        } else {
            ToggleOutcome::Favorited
        })
    }

    fn require_login(&mut self, anime_id: i64) -> ToggleOutcome {
        self.pending_favorite = Some(anime_id);
        ToggleOutcome::LoginRequired {
            anime_id,
            login_path: self.login_path(anime_id),
        }
    }

    /// Opens the detail overlay for a listed item.
    pub fn show(&mut self, anime_id: i64) -> Option<&DetailView> {
        let item = self.items.iter().find(|i| i.anime.mal_id == anime_id)?;
        self.detail = Some(DetailView::of(item));
        self.detail.as_ref()
    }

    pub fn close_detail(&mut self) {
        self.detail = None;
    }

    fn replace(&mut self, items: Vec<AnnotatedAnime>) -> usize {
        self.detail = None;
        self.items = items;
        self.items.len()
    }
}
