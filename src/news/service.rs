use std::sync::Arc;

use super::filter::{self, ArticleFilter, MAX_RESULTS};
use super::model::Article;
use crate::store::ArticleStore;

pub struct NewsService {
    store: Arc<dyn ArticleStore>,
}

impl NewsService {
    pub fn new(store: Arc<dyn ArticleStore>) -> Self {
        Self { store }
    }

    /// Fetch articles for a filter. The store handles the structured fields
    /// and the recency ordering; the free-text term is then matched against
    /// the capped page in-process. A store failure degrades to an empty
    /// page; a transient query failure should show "no articles", not take
    /// the dashboard down.
    pub async fn list(&self, filter: &ArticleFilter) -> Vec<Article> {
        let page = match self.store.query_articles(filter, MAX_RESULTS).await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!("article query failed, degrading to empty result: {e}");
                return Vec::new();
            }
        };
        filter::apply_query(page, filter.query.as_deref())
    }

    pub async fn import(&self, articles: &[Article]) -> anyhow::Result<usize> {
        let mut stored = 0;
        for article in articles {
            self.store.upsert_article(article).await?;
            stored += 1;
        }
        Ok(stored)
    }
}
