use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{ApiKeyRecord, ArticleStore, KeyStore, UsageLogRecord};
use crate::news::filter::ArticleFilter;
use crate::news::model::Article;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyStore for PgStore {
    async fn insert_key(&self, key: &ApiKeyRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO api_keys
                 (id, key_hash, key_prefix, user_id, user_email, name, description,
                  created_at, start_date, expires_at, is_active, request_count,
                  rate_limit, allowed_endpoints, ip_whitelist, last_used_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)"#,
        )
        .bind(key.id)
        .bind(&key.key_hash)
        .bind(&key.key_prefix)
        .bind(&key.user_id)
        .bind(&key.user_email)
        .bind(&key.name)
        .bind(&key.description)
        .bind(key.created_at)
        .bind(key.start_date)
        .bind(key.expires_at)
        .bind(key.is_active)
        .bind(key.request_count)
        .bind(key.rate_limit)
        .bind(&key.allowed_endpoints)
        .bind(&key.ip_whitelist)
        .bind(key.last_used_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_key(&self, id: Uuid) -> anyhow::Result<Option<ApiKeyRecord>> {
        let row = sqlx::query_as::<_, ApiKeyRecord>("SELECT * FROM api_keys WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn get_key_by_hash(&self, key_hash: &str) -> anyhow::Result<Option<ApiKeyRecord>> {
        let row = sqlx::query_as::<_, ApiKeyRecord>("SELECT * FROM api_keys WHERE key_hash = $1")
            .bind(key_hash)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row)
    }

    async fn list_keys_for_user(&self, user_id: &str) -> anyhow::Result<Vec<ApiKeyRecord>> {
        let rows = sqlx::query_as::<_, ApiKeyRecord>(
            "SELECT * FROM api_keys WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn revoke_key(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE api_keys SET is_active = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_key(&self, id: Uuid) -> anyhow::Result<bool> {
        // Usage logs are retained for audit; they keep the key id as a
        // dangling reference by design.
        let result = sqlx::query("DELETE FROM api_keys WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn increment_usage(&self, id: Uuid, now: DateTime<Utc>) -> anyhow::Result<()> {
        // Field-level increment, never a fetch-then-write pair.
        sqlx::query(
            "UPDATE api_keys SET request_count = request_count + 1, last_used_at = $2 WHERE id = $1",
        )
        .bind(id)
        .bind(now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn increment_period_count(&self, id: Uuid, period: NaiveDate) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO usage_meters (api_key_id, period, request_count)
               VALUES ($1, $2, 1)
               ON CONFLICT (api_key_id, period) DO UPDATE SET
                   request_count = usage_meters.request_count + 1,
                   updated_at = NOW()
               RETURNING request_count"#,
        )
        .bind(id)
        .bind(period)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn period_count(&self, id: Uuid, period: NaiveDate) -> anyhow::Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT request_count FROM usage_meters WHERE api_key_id = $1 AND period = $2",
        )
        .bind(id)
        .bind(period)
        .fetch_optional(&self.pool)
        .await?;
        Ok(count.unwrap_or(0))
    }

    async fn append_usage_log(&self, log: &UsageLogRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO usage_logs
                 (id, api_key_id, endpoint, method, status_code, response_time_ms,
                  timestamp, ip_address, user_agent, query_params)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
        )
        .bind(log.id)
        .bind(log.api_key_id)
        .bind(&log.endpoint)
        .bind(&log.method)
        .bind(log.status_code)
        .bind(log.response_time_ms)
        .bind(log.timestamp)
        .bind(&log.ip_address)
        .bind(&log.user_agent)
        .bind(&log.query_params)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_usage_logs(
        &self,
        api_key_id: Uuid,
        limit: i64,
    ) -> anyhow::Result<Vec<UsageLogRecord>> {
        let rows = sqlx::query_as::<_, UsageLogRecord>(
            r#"SELECT * FROM usage_logs
               WHERE api_key_id = $1
               ORDER BY timestamp DESC
               LIMIT $2"#,
        )
        .bind(api_key_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}

#[async_trait]
impl ArticleStore for PgStore {
    async fn query_articles(
        &self,
        filter: &ArticleFilter,
        limit: i64,
    ) -> anyhow::Result<Vec<Article>> {
        // Structured filters only; the free-text term is matched in-process
        // by the news service on the page this returns.
        let rows = sqlx::query_as::<_, Article>(
            r#"SELECT * FROM articles
               WHERE ($1::text IS NULL OR country = $1)
                 AND ($2::text IS NULL OR category = $2)
                 AND ($3::text IS NULL OR language = $3)
                 AND ($4::text IS NULL OR source = $4)
                 AND ($5::timestamptz IS NULL OR published_at >= $5)
                 AND ($6::timestamptz IS NULL OR published_at <= $6)
               ORDER BY published_at DESC
               LIMIT $7"#,
        )
        .bind(&filter.country)
        .bind(&filter.category)
        .bind(&filter.language)
        .bind(&filter.source)
        .bind(filter.from)
        .bind(filter.to)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn upsert_article(&self, article: &Article) -> anyhow::Result<()> {
        sqlx::query(
            r#"INSERT INTO articles
                 (id, title, description, content, url, image_url, source, author,
                  published_at, category, country, language, sentiment, scraped_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
               ON CONFLICT (id) DO UPDATE SET
                   title = EXCLUDED.title,
                   description = EXCLUDED.description,
                   content = EXCLUDED.content,
                   image_url = EXCLUDED.image_url,
                   sentiment = EXCLUDED.sentiment,
                   scraped_at = EXCLUDED.scraped_at"#,
        )
        .bind(&article.id)
        .bind(&article.title)
        .bind(&article.description)
        .bind(&article.content)
        .bind(&article.url)
        .bind(&article.image_url)
        .bind(&article.source)
        .bind(&article.author)
        .bind(article.published_at)
        .bind(&article.category)
        .bind(&article.country)
        .bind(&article.language)
        .bind(&article.sentiment)
        .bind(article.scraped_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
