//! NewsFlow gateway library crate.
//!
//! Exposes the modules the binary and the integration tests in `tests/`
//! build on.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod keys;
pub mod news;
pub mod store;

use keys::KeyService;
use news::NewsService;

/// Shared application state passed to handlers and middleware.
///
/// Constructed exactly once at process start and injected everywhere; the
/// store client is an explicit handle, never a lazy global.
pub struct AppState {
    pub keys: KeyService,
    pub news: NewsService,
    pub config: config::Config,
}

impl AppState {
    pub fn new(
        key_store: Arc<dyn store::KeyStore>,
        article_store: Arc<dyn store::ArticleStore>,
        config: config::Config,
    ) -> Self {
        Self {
            keys: KeyService::new(
                key_store,
                config.default_expiry_days,
                config.default_rate_limit,
            ),
            news: NewsService::new(article_store),
            config,
        }
    }
}
