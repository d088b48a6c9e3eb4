//! CLI module - Command-line interface for Animark
//!
//! This module provides a structured CLI using clap for argument parsing.

mod commands;

use clap::{Parser, Subcommand};

/// Animark - browse the anime catalog and keep a favorites list
#[derive(Parser)]
#[command(name = "animark")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Create default config file
    #[command(alias = "--init")]
    Init,

    /// Interactive terminal browser for a running server
    #[command(alias = "b")]
    Browse {
        /// Base URL of the server
        #[arg(long, default_value = "http://127.0.0.1:3000")]
        server: String,
    },

    /// Print a page of the top list straight from the catalog
    #[command(alias = "t")]
    Top {
        /// Page number
        #[arg(long, default_value = "1")]
        page: u32,
    },

    /// Search the catalog
    #[command(alias = "s")]
    Search {
        /// Search query
        #[arg(required = true)]
        query: Vec<String>,
    },
}

pub use commands::*;
