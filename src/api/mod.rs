use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower_http::trace::TraceLayer;

use crate::errors::ApiError;
use crate::keys::{rate_limit, usage};
use crate::AppState;

pub mod handlers;

/// Build the public API router. The news routes sit behind the API-key
/// gate; category enumeration and key management are open (the caller
/// supplies the owner identity, as in the source system).
pub fn api_router(state: Arc<AppState>) -> Router {
    let gated = Router::new()
        .route("/api/news", get(handlers::list_news))
        .route("/api/news/search", get(handlers::search_news))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_api_key,
        ));

    Router::new()
        .merge(gated)
        .route("/api/news/categories", get(handlers::categories))
        .route(
            "/api/keys",
            get(handlers::list_keys)
                .post(handlers::create_key)
                .delete(handlers::delete_key),
        )
        .route("/api/keys/usage", get(handlers::key_usage))
        .route("/healthz", get(|| async { "ok" }))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Success envelope: `{ success, data, meta? }`.
pub fn envelope(data: Value, meta: Option<Value>) -> Value {
    match meta {
        Some(meta) => json!({ "success": true, "data": data, "meta": meta }),
        None => json!({ "success": true, "data": data }),
    }
}

/// Request gate for the article routes.
///
/// `x-internal-request: true` (the dashboard's own fetches) bypasses the key
/// check. Otherwise the presented `x-api-key` must validate, the endpoint
/// must be on the credential's allow-list, the source address must pass the
/// whitelist when one is set, and the daily ceiling must not be reached.
/// Authenticated requests are recorded after completion without blocking
/// the response.
async fn require_api_key(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let internal = req
        .headers()
        .get("x-internal-request")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if internal {
        return Ok(next.run(req).await);
    }

    let presented = req
        .headers()
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .ok_or(ApiError::MissingApiKey)?;

    let key = state
        .keys
        .validate(presented)
        .await?
        .ok_or(ApiError::InvalidApiKey)?;

    let path = req.uri().path().to_string();
    if !key.allowed_endpoints.iter().any(|e| e == &path) {
        return Err(ApiError::InvalidApiKey);
    }

    let ip = client_ip(&req);
    if let Some(whitelist) = &key.ip_whitelist {
        if !whitelist.iter().any(|allowed| allowed == &ip) {
            return Err(ApiError::InvalidApiKey);
        }
    }

    if !rate_limit::allow(state.keys.store(), &key).await? {
        return Err(ApiError::RateLimited);
    }

    let method = req.method().to_string();
    let user_agent = req
        .headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let query_params = req.uri().query().map(query_to_json);

    let start = Instant::now();
    let resp = next.run(req).await;

    usage::record_async(
        state.keys.store().clone(),
        usage::UsageEntry {
            api_key_id: key.id,
            endpoint: path,
            method,
            status_code: resp.status().as_u16() as i16,
            response_time_ms: start.elapsed().as_millis() as i32,
            ip_address: ip,
            user_agent,
            query_params,
        },
    );

    Ok(resp)
}

fn client_ip(req: &Request) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Echo the raw query string as a JSON object for the usage log.
fn query_to_json(query: &str) -> Value {
    let map: serde_json::Map<String, Value> = query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
            (k.to_string(), Value::String(v.to_string()))
        })
        .collect();
    Value::Object(map)
}
