//! Credential lifecycle: issuance, validation, revocation, deletion.

use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::codec;
use crate::store::{ApiKeyRecord, KeyStore};

/// Endpoints a fresh credential may call unless the caller narrows the list.
pub const DEFAULT_ALLOWED_ENDPOINTS: [&str; 2] = ["/api/news", "/api/news/search"];

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("activation date would fall after expiry")]
    WindowInverted,
    #[error("{0} must be positive")]
    NonPositive(&'static str),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Caller-tunable issuance knobs; everything has a sensible default.
#[derive(Debug, Clone, Default)]
pub struct IssueOptions {
    pub description: Option<String>,
    pub expires_in_days: Option<i64>,
    pub rate_limit: Option<i64>,
    pub start_delay_days: Option<i64>,
    pub allowed_endpoints: Option<Vec<String>>,
    pub ip_whitelist: Option<Vec<String>>,
}

pub struct KeyService {
    store: Arc<dyn KeyStore>,
    default_expiry_days: i64,
    default_rate_limit: i64,
}

impl KeyService {
    pub fn new(store: Arc<dyn KeyStore>, default_expiry_days: i64, default_rate_limit: i64) -> Self {
        Self {
            store,
            default_expiry_days,
            default_rate_limit,
        }
    }

    pub fn store(&self) -> &Arc<dyn KeyStore> {
        &self.store
    }

    /// Issue a new credential. Returns the stored record and the one-time
    /// plaintext secret; the secret is never persisted and must not be
    /// logged or re-exposed by callers after this returns.
    pub async fn issue(
        &self,
        user_id: &str,
        user_email: &str,
        name: &str,
        opts: IssueOptions,
    ) -> Result<(ApiKeyRecord, String), IssueError> {
        let expires_in_days = opts.expires_in_days.unwrap_or(self.default_expiry_days);
        if expires_in_days <= 0 {
            return Err(IssueError::NonPositive("expiresInDays"));
        }
        let rate_limit = opts.rate_limit.unwrap_or(self.default_rate_limit);
        if rate_limit <= 0 {
            return Err(IssueError::NonPositive("rateLimit"));
        }
        let start_delay_days = opts.start_delay_days.unwrap_or(0);
        if start_delay_days < 0 {
            return Err(IssueError::NonPositive("startDelayDays"));
        }

        let now = Utc::now();
        let start_date = now + Duration::days(start_delay_days);
        let expires_at = start_date + Duration::days(expires_in_days);
        if start_date > expires_at {
            return Err(IssueError::WindowInverted);
        }

        let secret = codec::generate().map_err(IssueError::Other)?;
        let record = ApiKeyRecord {
            id: Uuid::new_v4(),
            key_hash: codec::digest(&secret),
            key_prefix: codec::display_prefix(&secret),
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            name: name.to_string(),
            description: opts.description.unwrap_or_default(),
            created_at: now,
            start_date,
            expires_at,
            is_active: true,
            request_count: 0,
            rate_limit,
            allowed_endpoints: opts.allowed_endpoints.unwrap_or_else(|| {
                DEFAULT_ALLOWED_ENDPOINTS.iter().map(|s| s.to_string()).collect()
            }),
            ip_whitelist: opts.ip_whitelist,
            last_used_at: None,
        };

        self.store.insert_key(&record).await?;
        Ok((record, secret))
    }

    /// Resolve a presented secret to its credential.
    ///
    /// Returns `None` for every failure mode (unknown digest, revoked, not
    /// yet active, expired) so a caller cannot tell whether a key exists
    /// at all. This information minimization is deliberate.
    pub async fn validate(&self, presented: &str) -> anyhow::Result<Option<ApiKeyRecord>> {
        let hash = codec::digest(presented);
        let Some(key) = self.store.get_key_by_hash(&hash).await? else {
            return Ok(None);
        };

        let now = Utc::now();
        if !key.is_active || now < key.start_date || now > key.expires_at {
            return Ok(None);
        }
        Ok(Some(key))
    }

    /// Revoke a credential. Revoking twice is a harmless no-op; there is no
    /// reactivate operation.
    pub async fn revoke(&self, id: Uuid) -> anyhow::Result<bool> {
        self.store.revoke_key(id).await
    }

    /// Permanently remove a credential. Its usage records are kept for audit.
    pub async fn delete(&self, id: Uuid) -> anyhow::Result<bool> {
        self.store.delete_key(id).await
    }

    pub async fn list_for_owner(&self, user_id: &str) -> anyhow::Result<Vec<ApiKeyRecord>> {
        self.store.list_keys_for_user(user_id).await
    }
}
