use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use super::envelope;
use crate::errors::ApiError;
use crate::keys::{usage, IssueError, IssueOptions};
use crate::news::filter::ArticleFilter;
use crate::news::model::{is_known_category, CATEGORIES, COUNTRIES, LANGUAGES};
use crate::store::ApiKeyRecord;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct NewsQuery {
    pub country: Option<String>,
    pub category: Option<String>,
    pub language: Option<String>,
    pub source: Option<String>,
    pub q: Option<String>,
    /// Accepted alias for `q`.
    pub search: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeyRequest {
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub expires_in_days: Option<i64>,
    pub rate_limit: Option<i64>,
    pub start_delay_days: Option<i64>,
    pub allowed_endpoints: Option<Vec<String>>,
    pub ip_whitelist: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListKeysQuery {
    pub user_id: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteKeyQuery {
    pub key_id: Option<Uuid>,
    pub action: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageQuery {
    pub api_key_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// Credential as exposed over the API: the digest stays server-side, only
/// the display prefix goes out.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyView {
    pub id: Uuid,
    pub key_prefix: String,
    pub user_id: String,
    pub user_email: String,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub start_date: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub is_active: bool,
    pub request_count: i64,
    pub rate_limit: i64,
    pub allowed_endpoints: Vec<String>,
    pub ip_whitelist: Option<Vec<String>>,
    pub last_used_at: Option<DateTime<Utc>>,
}

impl From<ApiKeyRecord> for ApiKeyView {
    fn from(k: ApiKeyRecord) -> Self {
        Self {
            id: k.id,
            key_prefix: k.key_prefix,
            user_id: k.user_id,
            user_email: k.user_email,
            name: k.name,
            description: k.description,
            created_at: k.created_at,
            start_date: k.start_date,
            expires_at: k.expires_at,
            is_active: k.is_active,
            request_count: k.request_count,
            rate_limit: k.rate_limit,
            allowed_endpoints: k.allowed_endpoints,
            ip_whitelist: k.ip_whitelist,
            last_used_at: k.last_used_at,
        }
    }
}

// ── News routes ──────────────────────────────────────────────

/// GET /api/news: filtered article list.
pub async fn list_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = build_filter(&params)?;
    let articles = state.news.list(&filter).await;
    Ok(Json(news_envelope(articles, &filter)))
}

/// GET /api/news/search: free-text filtered list; `q` is required.
pub async fn search_news(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NewsQuery>,
) -> Result<Json<Value>, ApiError> {
    let filter = build_filter(&params)?;
    if filter.query.as_deref().map_or(true, |q| q.trim().is_empty()) {
        return Err(ApiError::MissingParam("q"));
    }
    let articles = state.news.list(&filter).await;
    Ok(Json(news_envelope(articles, &filter)))
}

/// GET /api/news/categories: static enumerations, no auth.
pub async fn categories() -> Json<Value> {
    Json(envelope(
        json!({
            "categories": CATEGORIES,
            "countries": COUNTRIES.iter().map(|c| json!({
                "code": c.code,
                "name": c.name,
                "sources": c.sources,
            })).collect::<Vec<_>>(),
            "languages": LANGUAGES,
        }),
        None,
    ))
}

fn build_filter(params: &NewsQuery) -> Result<ArticleFilter, ApiError> {
    if let Some(category) = params.category.as_deref() {
        if !is_known_category(category) {
            return Err(ApiError::InvalidParam(format!("unknown category: {category}")));
        }
    }
    Ok(ArticleFilter {
        country: params.country.clone(),
        category: params.category.clone(),
        language: Some(params.language.clone().unwrap_or_else(|| "en".into())),
        source: params.source.clone(),
        query: params.q.clone().or_else(|| params.search.clone()),
        from: params.from.as_deref().map(parse_instant).transpose()?,
        to: params.to.as_deref().map(parse_instant).transpose()?,
    })
}

/// Accept RFC 3339 instants or bare dates (`2024-03-01`, midnight UTC).
fn parse_instant(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    if let Ok(ts) = raw.parse::<DateTime<Utc>>() {
        return Ok(ts);
    }
    if let Ok(date) = raw.parse::<NaiveDate>() {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(ApiError::InvalidParam(format!("bad timestamp: {raw}")))
}

fn news_envelope(articles: Vec<crate::news::model::Article>, filter: &ArticleFilter) -> Value {
    let total = articles.len();
    envelope(
        json!({
            "articles": articles,
            "totalResults": total,
            "filter": {
                "country": filter.country,
                "category": filter.category,
                "language": filter.language,
                "search": filter.query,
            },
        }),
        Some(json!({ "fetchedAt": Utc::now() })),
    )
}

// ── Key management routes ────────────────────────────────────

/// POST /api/keys: issue a credential. The raw secret appears in this
/// response exactly once and is never retrievable again.
pub async fn create_key(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateKeyRequest>,
) -> Result<(StatusCode, Json<Value>), ApiError> {
    let user_id = payload.user_id.as_deref().ok_or(ApiError::MissingParam("userId"))?;
    let user_email = payload
        .user_email
        .as_deref()
        .ok_or(ApiError::MissingParam("userEmail"))?;
    let name = payload.name.as_deref().ok_or(ApiError::MissingParam("name"))?;

    let opts = IssueOptions {
        description: payload.description.clone(),
        expires_in_days: payload.expires_in_days,
        rate_limit: payload.rate_limit,
        start_delay_days: payload.start_delay_days,
        allowed_endpoints: payload.allowed_endpoints.clone(),
        ip_whitelist: payload.ip_whitelist.clone(),
    };

    let (record, secret) = state
        .keys
        .issue(user_id, user_email, name, opts)
        .await
        .map_err(|e| match e {
            IssueError::Other(inner) => ApiError::Internal(inner),
            validation => ApiError::InvalidParam(validation.to_string()),
        })?;

    let body = json!({
        "success": true,
        "data": {
            "apiKey": ApiKeyView::from(record),
            "key": secret,
        },
        "message": "Save this key - it will not be shown again.",
    });
    Ok((StatusCode::CREATED, Json(body)))
}

/// GET /api/keys?userId=: list a user's credentials.
pub async fn list_keys(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListKeysQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = params.user_id.as_deref().ok_or(ApiError::MissingParam("userId"))?;
    let keys = state.keys.list_for_owner(user_id).await?;
    let views: Vec<ApiKeyView> = keys.into_iter().map(ApiKeyView::from).collect();
    let total = views.len();
    Ok(Json(envelope(
        json!({ "apiKeys": views }),
        Some(json!({ "total": total })),
    )))
}

/// DELETE /api/keys?keyId=&action=revoke|delete
pub async fn delete_key(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DeleteKeyQuery>,
) -> Result<Json<Value>, ApiError> {
    let key_id = params.key_id.ok_or(ApiError::MissingParam("keyId"))?;
    let action = params.action.as_deref().unwrap_or("revoke");

    let applied = match action {
        "revoke" => state.keys.revoke(key_id).await?,
        "delete" => state.keys.delete(key_id).await?,
        other => {
            return Err(ApiError::InvalidParam(format!(
                "action must be revoke or delete, got: {other}"
            )))
        }
    };
    if !applied {
        return Err(ApiError::NotFound);
    }

    Ok(Json(envelope(
        json!({ "keyId": key_id, "action": action }),
        None,
    )))
}

/// GET /api/keys/usage?apiKeyId=: usage records plus a stats summary.
pub async fn key_usage(
    State(state): State<Arc<AppState>>,
    Query(params): Query<UsageQuery>,
) -> Result<Json<Value>, ApiError> {
    let api_key_id = params.api_key_id.ok_or(ApiError::MissingParam("apiKeyId"))?;
    let limit = params.limit.unwrap_or(100).clamp(1, 1000);

    let logs = state.keys.store().list_usage_logs(api_key_id, limit).await?;
    let stats = usage::stats(state.keys.store(), api_key_id).await?;

    Ok(Json(envelope(
        json!({ "usage": logs }),
        Some(serde_json::to_value(stats).map_err(anyhow::Error::from)?),
    )))
}
