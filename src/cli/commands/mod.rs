mod browse;
mod catalog;
mod init;

pub use browse::{BrowseCommand, cmd_browse};
pub use catalog::{cmd_search, cmd_top};
pub use init::cmd_init;
