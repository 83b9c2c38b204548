use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use super::{ApiKeyRecord, ArticleStore, KeyStore, UsageLogRecord};
use crate::news::filter::ArticleFilter;
use crate::news::model::Article;

/// In-memory store used by the test suite and demo mode. Increments go
/// through DashMap shard locks, so they are atomic under concurrent callers
/// the same way the SQL `request_count = request_count + 1` form is.
#[derive(Default)]
pub struct MemStore {
    keys: DashMap<Uuid, ApiKeyRecord>,
    hash_index: DashMap<String, Uuid>,
    meters: DashMap<(Uuid, NaiveDate), i64>,
    logs: Mutex<Vec<UsageLogRecord>>,
    articles: DashMap<String, Article>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyStore for MemStore {
    async fn insert_key(&self, key: &ApiKeyRecord) -> anyhow::Result<()> {
        self.hash_index.insert(key.key_hash.clone(), key.id);
        self.keys.insert(key.id, key.clone());
        Ok(())
    }

    async fn get_key(&self, id: Uuid) -> anyhow::Result<Option<ApiKeyRecord>> {
        Ok(self.keys.get(&id).map(|k| k.clone()))
    }

    async fn get_key_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<ApiKeyRecord>> {
        let Some(id) = self.hash_index.get(key_hash).map(|e| *e) else {
            return Ok(None);
        };
        Ok(self.keys.get(&id).map(|k| k.clone()))
    }

    async fn list_keys_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ApiKeyRecord>> {
        let mut keys: Vec<ApiKeyRecord> = self
            .keys
            .iter()
            .filter(|k| k.user_id == user_id)
            .map(|k| k.clone())
            .collect();
        keys.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(keys)
    }

    async fn revoke_key(&self, id: Uuid) -> anyhow::Result<bool> {
        match self.keys.get_mut(&id) {
            Some(mut key) => {
                key.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_key(&self, id: Uuid) -> anyhow::Result<bool> {
        match self.keys.remove(&id) {
            Some((_, key)) => {
                self.hash_index.remove(&key.key_hash);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn increment_usage(&self, id: Uuid, now: DateTime<Utc>) -> anyhow::Result<()> {
        if let Some(mut key) = self.keys.get_mut(&id) {
            key.request_count += 1;
            key.last_used_at = Some(now);
        }
        Ok(())
    }

    async fn increment_period_count(&self, id: Uuid, period: NaiveDate) -> anyhow::Result<i64> {
        let mut entry = self.meters.entry((id, period)).or_insert(0);
        *entry += 1;
        Ok(*entry)
    }

    async fn period_count(&self, id: Uuid, period: NaiveDate) -> anyhow::Result<i64> {
        Ok(self.meters.get(&(id, period)).map(|c| *c).unwrap_or(0))
    }

    async fn append_usage_log(&self, log: &UsageLogRecord) -> anyhow::Result<()> {
        self.logs
            .lock()
            .map_err(|_| anyhow::anyhow!("usage log mutex poisoned"))?
            .push(log.clone());
        Ok(())
    }

    async fn list_usage_logs(
        &self,
        api_key_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<UsageLogRecord>> {
        let mut logs: Vec<UsageLogRecord> = self
            .logs
            .lock()
            .map_err(|_| anyhow::anyhow!("usage log mutex poisoned"))?
            .iter()
            .filter(|l| l.api_key_id == api_key_id)
            .cloned()
            .collect();
        logs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        logs.truncate(limit.max(0) as usize);
        Ok(logs)
    }
}

#[async_trait]
impl ArticleStore for MemStore {
    async fn query_articles(
        &self,
        filter: &ArticleFilter,
        limit: i64,
    ) -> anyhow::Result<Vec<Article>> {
        let mut articles: Vec<Article> = self
            .articles
            .iter()
            .filter(|a| {
                filter.country.as_deref().map_or(true, |c| a.country == c)
                    && filter.category.as_deref().map_or(true, |c| a.category == c)
                    && filter.language.as_deref().map_or(true, |l| a.language == l)
                    && filter.source.as_deref().map_or(true, |s| a.source == s)
                    && filter.from.map_or(true, |f| a.published_at >= f)
                    && filter.to.map_or(true, |t| a.published_at <= t)
            })
            .map(|a| a.clone())
            .collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles.truncate(limit.max(0) as usize);
        Ok(articles)
    }

    async fn upsert_article(&self, article: &Article) -> anyhow::Result<()> {
        self.articles.insert(article.id.clone(), article.clone());
        Ok(())
    }
}
