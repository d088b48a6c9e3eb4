use crate::clients::JikanClient;
use crate::config::Config;
use crate::models::Anime;

fn print_list(list: &[Anime]) {
    println!("{:-<60}", "");
    for anime in list {
        println!("• {} (ID: {})", anime.title, anime.mal_id);
        println!(
            "  Score: {} | Episodes: {}",
            anime.display_score(),
            anime.display_episodes()
        );
    }
    println!();
}

pub async fn cmd_top(config: &Config, page: u32) -> anyhow::Result<()> {
    let jikan = JikanClient::new(&config.catalog)?;
    let list = jikan.fetch_top_page(page.max(1)).await?;

    println!("Top Anime - page {}", page.max(1));
    print_list(&list);

    Ok(())
}

pub async fn cmd_search(config: &Config, query: &str) -> anyhow::Result<()> {
    println!("Searching for: {query}");

    let jikan = JikanClient::new(&config.catalog)?;
    let list = jikan.search_by_query(query).await?;

    if list.is_empty() {
        println!("No anime found matching '{query}'");
        return Ok(());
    }

    println!();
    println!("Search Results:");
    print_list(&list);

    Ok(())
}
