use tokio::io::{AsyncBufReadExt, BufReader};

use crate::client::{CatalogSource, PageController, ServiceClient, SourceError, ToggleOutcome};
use crate::models::AnnotatedAnime;

/// One line of input at the `browse` prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BrowseCommand {
    More,
    Genre(Option<u32>),
    Search(String),
    Favorite(i64),
    Show(i64),
    Close,
    Favorites,
    Top,
    Login(String),
    Logout,
    Help,
    Quit,
}

impl BrowseCommand {
    pub fn parse(line: &str) -> Result<Self, String> {
        let line = line.trim();
        let (cmd, rest) = line
            .split_once(char::is_whitespace)
            .map_or((line, ""), |(c, r)| (c, r.trim()));

        let id = |what: &str| -> Result<i64, String> {
            rest.parse()
                .map_err(|_| format!("Usage: {what} <anime_id>"))
        };

        match cmd {
            "" | "more" | "m" => Ok(Self::More),
            "genre" | "g" if rest.is_empty() => Ok(Self::Genre(None)),
            "genre" | "g" => rest
                .parse()
                .map(|g| Self::Genre(Some(g)))
                .map_err(|_| "Usage: genre [genre_id]".to_string()),
            "search" | "s" if rest.is_empty() => Err("Usage: search <query>".to_string()),
            "search" | "s" => Ok(Self::Search(rest.to_string())),
            "fav" | "f" => id("fav").map(Self::Favorite),
            "show" => id("show").map(Self::Show),
            "close" => Ok(Self::Close),
            "favorites" => Ok(Self::Favorites),
            "top" => Ok(Self::Top),
            "login" if rest.is_empty() => Err("Usage: login <email>".to_string()),
            "login" => Ok(Self::Login(rest.to_string())),
            "logout" => Ok(Self::Logout),
            "help" | "?" => Ok(Self::Help),
            "quit" | "q" | "exit" => Ok(Self::Quit),
            other => Err(format!("Unknown command: {other} (try 'help')")),
        }
    }
}

fn print_help() {
    println!("Commands:");
    println!("  more | <enter>     load the next page");
    println!("  genre [id]         filter by genre, or clear the filter");
    println!("  search <query>     search the catalog");
    println!("  fav <id>           toggle a favorite");
    println!("  show <id> / close  open or close the detail view");
    println!("  favorites          list your favorites");
    println!("  top                back to the top list");
    println!("  login <email>      log in (password is read from the next line)");
    println!("  logout             end the session");
    println!("  quit               leave");
}

fn print_items(items: &[AnnotatedAnime]) {
    for item in items {
        let marker = if item.is_favorited { "★" } else { " " };
        println!(
            "{marker} [{}] {} | Score: {} | Episodes: {}",
            item.anime.mal_id,
            item.anime.title,
            item.anime.display_score(),
            item.anime.display_episodes()
        );
    }
}

fn report(result: Result<usize, SourceError>) {
    match result {
        Ok(0) => println!("Nothing more to show"),
        Ok(n) => println!("{n} items"),
        Err(SourceError::NotLoggedIn) => println!("Not logged in. Use 'login <email>'."),
        Err(e) => println!("Error: {e}"),
    }
}

pub async fn cmd_browse(server: &str) -> anyhow::Result<()> {
    let client = ServiceClient::new(server)?;
    let mut controller = PageController::new(client, false);

    println!("Connected to {server}. Type 'help' for commands.");
    report(controller.open_top().await);
    print_items(controller.items());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let command = match BrowseCommand::parse(&line) {
            Ok(c) => c,
            Err(msg) => {
                println!("{msg}");
                continue;
            }
        };

        match command {
            BrowseCommand::Quit => break,
            BrowseCommand::Help => print_help(),
            BrowseCommand::More => {
                let before = controller.items().len();
                report(controller.load_more().await);
                print_items(&controller.items()[before..]);
            }
            BrowseCommand::Genre(genre) => {
                report(controller.select_genre(genre).await);
                print_items(controller.items());
            }
            BrowseCommand::Search(q) => {
                report(controller.search(&q).await);
                print_items(controller.items());
            }
            BrowseCommand::Top => {
                report(controller.open_top().await);
                print_items(controller.items());
            }
            BrowseCommand::Favorites => {
                report(controller.open_favorites().await);
                print_items(controller.items());
            }
            BrowseCommand::Favorite(id) => match controller.toggle_favorite(id).await {
                Ok(ToggleOutcome::Favorited) => println!("Added to Favorites"),
                Ok(ToggleOutcome::Unfavorited) => println!("Removed from Favorites"),
                Ok(ToggleOutcome::LoginRequired { .. }) => {
                    println!("Log in to save favorites. It will be added once you log in.");
                }
                Err(e) => println!("Favorite toggle failed: {e}"),
            },
            BrowseCommand::Show(id) => match controller.show(id) {
                Some(detail) => {
                    println!("{}", detail.title);
                    println!("Episodes: {}", detail.episodes);
                    println!("Score: {}", detail.score);
                    println!("Synopsis: {}", detail.synopsis);
                }
                None => println!("No listed anime with id {id}"),
            },
            BrowseCommand::Close => controller.close_detail(),
            BrowseCommand::Login(email) => {
                println!("Password:");
                let Some(password) = lines.next_line().await? else {
                    break;
                };
                let pending = controller.pending_favorite();
                match controller.source().login(&email, &password, pending).await {
                    Ok(true) => {
                        controller.set_logged_in(true);
                        println!("Logged in as {email}");
                        report(refresh(&mut controller).await);
                        print_items(controller.items());
                    }
                    Ok(false) => println!("Invalid email or password"),
                    Err(e) => println!("Login failed: {e}"),
                }
            }
            BrowseCommand::Logout => match controller.source().logout().await {
                Ok(()) => {
                    controller.set_logged_in(false);
                    println!("Logged out");
                }
                Err(e) => println!("Logout failed: {e}"),
            },
        }
    }

    Ok(())
}

/// Reloads the current view so favorite markers reflect the new session.
async fn refresh<C: CatalogSource>(
    controller: &mut PageController<C>,
) -> Result<usize, SourceError> {
    match controller.view().clone() {
        crate::client::View::Top => controller.open_top().await,
        crate::client::View::Genre(g) => controller.select_genre(Some(g)).await,
        crate::client::View::Search(q) => controller.search(&q).await,
        crate::client::View::Favorites => controller.open_favorites().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prompt_commands() {
        assert_eq!(BrowseCommand::parse(""), Ok(BrowseCommand::More));
        assert_eq!(BrowseCommand::parse("more"), Ok(BrowseCommand::More));
        assert_eq!(BrowseCommand::parse("genre"), Ok(BrowseCommand::Genre(None)));
        assert_eq!(
            BrowseCommand::parse("genre 22"),
            Ok(BrowseCommand::Genre(Some(22)))
        );
        assert_eq!(
            BrowseCommand::parse("search  cowboy bebop "),
            Ok(BrowseCommand::Search("cowboy bebop".to_string()))
        );
        assert_eq!(BrowseCommand::parse("fav 42"), Ok(BrowseCommand::Favorite(42)));
        assert_eq!(BrowseCommand::parse("show 7"), Ok(BrowseCommand::Show(7)));
        assert_eq!(
            BrowseCommand::parse("login a@example.com"),
            Ok(BrowseCommand::Login("a@example.com".to_string()))
        );
        assert_eq!(BrowseCommand::parse("quit"), Ok(BrowseCommand::Quit));
    }

    #[test]
    fn rejects_malformed_commands() {
        assert!(BrowseCommand::parse("fav abc").is_err());
        assert!(BrowseCommand::parse("genre action").is_err());
        assert!(BrowseCommand::parse("search").is_err());
        assert!(BrowseCommand::parse("dance").is_err());
    }
}
