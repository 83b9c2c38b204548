use clap::{Parser, Subcommand};

/// NewsFlow: news aggregation API with managed API keys
#[derive(Parser)]
#[command(name = "newsflow", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the API server
    Serve {
        /// Port to bind
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Manage API keys
    Key {
        #[command(subcommand)]
        command: KeyCommands,
    },

    /// Manage the article store
    News {
        #[command(subcommand)]
        command: NewsCommands,
    },
}

#[derive(Subcommand)]
pub enum KeyCommands {
    /// Issue a new API key (the secret is printed once)
    Create {
        #[arg(long)]
        user_id: String,
        #[arg(long)]
        email: String,
        #[arg(long, default_value = "My API Key")]
        name: String,
        /// Expiry in days
        #[arg(long)]
        expires: Option<i64>,
        /// Daily request ceiling
        #[arg(long)]
        rate_limit: Option<i64>,
    },
    /// List keys for a user
    List {
        #[arg(long)]
        user_id: String,
    },
    /// Revoke a key (one-way)
    Revoke {
        #[arg(long)]
        key_id: String,
    },
    /// Delete a key permanently (usage logs are retained)
    Delete {
        #[arg(long)]
        key_id: String,
    },
    /// Check whether a presented key validates
    Validate {
        #[arg(long)]
        api_key: String,
    },
    /// Show usage statistics for a key
    Stats {
        #[arg(long)]
        key_id: String,
    },
}

#[derive(Subcommand)]
pub enum NewsCommands {
    /// Import scraped articles from a JSON file
    Import {
        /// Path to a JSON array of articles, or the scraper's
        /// `{data: {articles: [...]}}` envelope
        #[arg(long)]
        file: String,
    },
}
