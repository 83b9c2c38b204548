use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use newsflow_gateway::cli::{Cli, Commands, KeyCommands, NewsCommands};
use newsflow_gateway::keys::{usage, IssueOptions};
use newsflow_gateway::news::model::Article;
use newsflow_gateway::store::{KeyStore, PgStore};
use newsflow_gateway::{api, config, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "newsflow_gateway=debug,tower_http=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = Cli::parse();

    match args.command {
        Some(Commands::Serve { port }) => run_server(cfg, port).await,
        Some(Commands::Key { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            let state = build_state(db, cfg);
            handle_key_command(command, &state).await
        }
        Some(Commands::News { command }) => {
            let db = PgStore::connect(&cfg.database_url).await?;
            db.migrate().await?;
            let state = build_state(db, cfg);
            handle_news_command(command, &state).await
        }
        None => {
            let port = cfg.port;
            run_server(cfg, port).await
        }
    }
}

fn build_state(db: PgStore, cfg: config::Config) -> Arc<AppState> {
    let db = Arc::new(db);
    Arc::new(AppState::new(db.clone(), db, cfg))
}

async fn run_server(cfg: config::Config, port: u16) -> anyhow::Result<()> {
    tracing::info!("Connecting to database...");
    let db = PgStore::connect(&cfg.database_url).await?;

    tracing::info!("Running migrations...");
    db.migrate().await?;

    let allowed_origins = cfg.allowed_origins.clone();
    let state = build_state(db, cfg);

    let app = api::api_router(state).layer({
        use axum::http::Method;
        use tower_http::cors::AllowOrigin;
        CorsLayer::new()
            .allow_origin(AllowOrigin::predicate(move |origin, _| {
                let origin = origin.to_str().unwrap_or("");
                allowed_origins.iter().any(|o| o == origin)
                    || origin.starts_with("http://localhost:")
                    || origin.starts_with("http://127.0.0.1:")
            }))
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([
                axum::http::HeaderName::from_static("content-type"),
                axum::http::HeaderName::from_static("x-api-key"),
                axum::http::HeaderName::from_static("x-internal-request"),
            ])
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("NewsFlow gateway listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}

async fn handle_key_command(cmd: KeyCommands, state: &Arc<AppState>) -> anyhow::Result<()> {
    match cmd {
        KeyCommands::Create {
            user_id,
            email,
            name,
            expires,
            rate_limit,
        } => {
            let opts = IssueOptions {
                expires_in_days: expires,
                rate_limit,
                ..Default::default()
            };
            let (record, secret) = state.keys.issue(&user_id, &email, &name, opts).await?;
            println!("API key created:");
            println!("  ID:         {}", record.id);
            println!("  Name:       {}", record.name);
            println!("  Expires:    {}", record.expires_at);
            println!("  Rate limit: {}/day", record.rate_limit);
            println!("\nSAVE THIS KEY - IT WILL NOT BE SHOWN AGAIN:\n\n{secret}\n");
        }
        KeyCommands::List { user_id } => {
            let keys = state.keys.list_for_owner(&user_id).await?;
            if keys.is_empty() {
                println!("No API keys found.");
            } else {
                println!("{:<38} {:<20} {:<8} EXPIRES", "ID", "NAME", "ACTIVE");
                for k in keys {
                    println!(
                        "{:<38} {:<20} {:<8} {}",
                        k.id,
                        k.name,
                        k.is_active,
                        k.expires_at.format("%Y-%m-%d")
                    );
                }
            }
        }
        KeyCommands::Revoke { key_id } => {
            let id = key_id.parse().context("Invalid key ID")?;
            if state.keys.revoke(id).await? {
                println!("API key revoked.");
            } else {
                println!("API key not found.");
            }
        }
        KeyCommands::Delete { key_id } => {
            let id = key_id.parse().context("Invalid key ID")?;
            if state.keys.delete(id).await? {
                println!("API key deleted.");
            } else {
                println!("API key not found.");
            }
        }
        KeyCommands::Validate { api_key } => match state.keys.validate(&api_key).await? {
            Some(k) => {
                println!("Valid API key:");
                println!("  Name:     {}", k.name);
                println!("  User:     {}", k.user_email);
                println!("  Requests: {}/{} per day", k.request_count, k.rate_limit);
            }
            None => println!("Invalid API key."),
        },
        KeyCommands::Stats { key_id } => {
            let id = key_id.parse().context("Invalid key ID")?;
            let store: &Arc<dyn KeyStore> = state.keys.store();
            let stats = usage::stats(store, id).await?;
            println!("Usage statistics for {id}:");
            println!("  Total requests:    {}", stats.total_requests);
            println!("  Avg response time: {}ms", stats.avg_response_time_ms);
            println!("  Success rate:      {}%", stats.success_rate);
            println!("  Error count:       {}", stats.error_count);
        }
    }
    Ok(())
}

async fn handle_news_command(cmd: NewsCommands, state: &Arc<AppState>) -> anyhow::Result<()> {
    match cmd {
        NewsCommands::Import { file } => {
            let raw = std::fs::read_to_string(&file).context("reading import file")?;
            let articles = parse_import(&raw)?;
            let stored = state.news.import(&articles).await?;
            println!("Imported {stored} articles from {file}");
        }
    }
    Ok(())
}

/// Accept either a bare JSON array of articles or the scraper's
/// `{data: {articles: [...]}}` envelope.
fn parse_import(raw: &str) -> anyhow::Result<Vec<Article>> {
    if let Ok(articles) = serde_json::from_str::<Vec<Article>>(raw) {
        return Ok(articles);
    }
    let value: serde_json::Value = serde_json::from_str(raw).context("parsing import file")?;
    let inner = value
        .pointer("/data/articles")
        .cloned()
        .context("expected an array of articles or a scraper envelope")?;
    Ok(serde_json::from_value(inner)?)
}
