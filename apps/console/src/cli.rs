//! Command-line arguments for the `opsdeck` console.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "opsdeck", version, about = "OpsDeck operator console")]
pub struct Cli {
    /// Where the session tokens are kept between runs
    #[arg(long, env = "OPSDECK_TOKEN_STORE", value_enum, default_value_t = TokenStore::Sqlite)]
    pub token_store: TokenStore,

    /// SQLite database path (defaults to the user data directory)
    #[arg(long, env = "OPSDECK_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TokenStore {
    Sqlite,
    Keychain,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an account on the auth service
    Register {
        #[arg(long)]
        email: String,
        #[arg(long)]
        username: String,
        #[arg(long, env = "OPSDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Sign in and store the session
    Login {
        #[arg(long, env = "OPSDECK_EMAIL")]
        email: String,
        #[arg(long, env = "OPSDECK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Show the signed-in user's profile
    Profile,
    /// Sign out and forget the stored session
    Logout,
    /// Show whether a session is stored
    Status,
    /// List one page of a collection
    List {
        #[arg(value_enum)]
        collection: Collection,
        #[arg(long, default_value_t = 0)]
        offset: u32,
        #[arg(long, default_value_t = opsdeck_core::DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
    /// Search a collection
    Search {
        #[arg(value_enum)]
        collection: Collection,
        query: String,
        #[arg(long, default_value_t = opsdeck_core::DEFAULT_PAGE_LIMIT)]
        limit: u32,
    },
    /// Fetch a single item by id
    Get {
        #[arg(value_enum)]
        collection: Collection,
        id: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Collection {
    Users,
    Products,
    Tasks,
    Media,
}
