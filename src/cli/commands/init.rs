use crate::config::Config;

pub fn cmd_init() -> anyhow::Result<()> {
    if Config::create_default_if_missing()? {
        println!("Created config.toml with default settings");
        println!("Set GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET to enable Google login");
    } else {
        println!("config.toml already exists");
    }
    Ok(())
}
