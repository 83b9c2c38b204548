//! Storage seam: record types plus the `KeyStore` / `ArticleStore` traits.
//!
//! Production runs against Postgres (`PgStore`); tests and demo mode use the
//! in-memory `MemStore`. Handlers and services only see the trait objects.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::news::filter::ArticleFilter;
use crate::news::model::Article;

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

/// One issued API credential. The raw secret is never stored, only its
/// SHA-256 digest and a short display prefix.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    pub id: Uuid,
    pub key_hash: String,
    pub key_prefix: String,
    pub user_id: String,
    pub user_email: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    /// Not valid before.
    pub start_date: DateTime<Utc>,
    /// Not valid after.
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    /// Lifetime counter, only ever incremented.
    pub request_count: i64,
    /// Daily request ceiling.
    pub rate_limit: i64,
    pub allowed_endpoints: Vec<String>,
    pub ip_whitelist: Option<Vec<String>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

/// Immutable log entry for one authenticated request. Written once at
/// request-completion time, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UsageLogRecord {
    pub id: Uuid,
    pub api_key_id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub status_code: i16,
    pub response_time_ms: i32,
    pub timestamp: DateTime<Utc>,
    pub ip_address: String,
    pub user_agent: String,
    pub query_params: Option<serde_json::Value>,
}

#[async_trait]
pub trait KeyStore: Send + Sync {
    async fn insert_key(&self, key: &ApiKeyRecord) -> anyhow::Result<()>;

    async fn get_key(&self, id: Uuid) -> anyhow::Result<Option<ApiKeyRecord>>;

    /// Exact digest match. Status/window checks are the lifecycle manager's job.
    async fn get_key_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<ApiKeyRecord>>;

    async fn list_keys_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ApiKeyRecord>>;

    /// Sets `is_active = false`. Returns false when the id is unknown.
    /// Re-revoking an already-revoked key is a no-op that still returns true.
    async fn revoke_key(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Removes the credential permanently. Usage logs are retained for audit.
    async fn delete_key(&self, id: Uuid) -> anyhow::Result<bool>;

    /// Atomic field-level increment of the lifetime counter plus
    /// `last_used_at`. Must not be a read-modify-write round trip.
    async fn increment_usage(&self, id: Uuid, now: DateTime<Utc>) -> anyhow::Result<()>;

    /// Atomic upsert-increment of the daily meter. Returns the new count.
    async fn increment_period_count(&self, id: Uuid, period: NaiveDate) -> anyhow::Result<i64>;

    /// Current count in the daily meter (0 when no bucket exists yet).
    async fn period_count(&self, id: Uuid, period: NaiveDate) -> anyhow::Result<i64>;

    async fn append_usage_log(&self, log: &UsageLogRecord) -> anyhow::Result<()>;

    /// Most recent usage logs for a credential, newest first.
    async fn list_usage_logs(
        &self,
        api_key_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<UsageLogRecord>>;
}

#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Structured-filter query, ordered by publish time descending, capped at
    /// `limit`. Free-text matching happens in-process on the returned page.
    async fn query_articles(
        &self,
        filter: &ArticleFilter,
        limit: i64,
    ) -> anyhow::Result<Vec<Article>>;

    async fn upsert_article(&self, article: &Article) -> anyhow::Result<()>;
}
