//! HTTP-level tests: the full router over the in-memory store, driven with
//! `tower::ServiceExt::oneshot`. Covers the status contract (400/401/403/
//! 404/429), the response envelope, and the key-management flow end to end.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::util::ServiceExt;
use uuid::Uuid;

use newsflow_gateway::api::api_router;
use newsflow_gateway::config::Config;
use newsflow_gateway::news::model::Article;
use newsflow_gateway::store::{ArticleStore, KeyStore, MemStore};
use newsflow_gateway::AppState;

fn test_app() -> (Router, Arc<MemStore>) {
    let mem = Arc::new(MemStore::new());
    let config = Config {
        port: 0,
        database_url: String::new(),
        default_expiry_days: 365,
        default_rate_limit: 1000,
        allowed_origins: vec![],
    };
    let state = Arc::new(AppState::new(mem.clone(), mem.clone(), config));
    (api_router(state), mem)
}

async fn body_json(resp: Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn get_with_key(uri: &str, key: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-api-key", key)
        .body(Body::empty())
        .unwrap()
}

fn internal_get(uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("x-internal-request", "true")
        .body(Body::empty())
        .unwrap()
}

/// Issue a credential over HTTP, returning (id, plaintext secret).
async fn create_key(app: &Router, extra: Value) -> (Uuid, String) {
    let mut payload = json!({
        "userId": "user-1",
        "userEmail": "user@example.com",
        "name": "test key",
    });
    if let (Some(base), Some(more)) = (payload.as_object_mut(), extra.as_object()) {
        for (k, v) in more {
            base.insert(k.clone(), v.clone());
        }
    }

    let req = Request::builder()
        .method("POST")
        .uri("/api/keys")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(payload.to_string()))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    let secret = body["data"]["key"].as_str().unwrap().to_string();
    assert!(secret.starts_with("nf_live_"));
    // The digest never leaves the server.
    assert!(body["data"]["apiKey"].get("keyHash").is_none());
    let id: Uuid = body["data"]["apiKey"]["id"].as_str().unwrap().parse().unwrap();
    (id, secret)
}

fn fixture_article(id: &str, title: &str, category: &str, age_hours: i64) -> Article {
    Article {
        id: id.into(),
        title: title.into(),
        description: String::new(),
        content: String::new(),
        url: format!("https://example.com/{id}"),
        image_url: String::new(),
        source: "bbc".into(),
        author: "desk".into(),
        published_at: Utc::now() - Duration::hours(age_hours),
        category: category.into(),
        country: "us".into(),
        language: "en".into(),
        sentiment: None,
        scraped_at: None,
    }
}

#[tokio::test]
async fn test_news_without_key_is_401() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/api/news")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "api_key_required");
}

#[tokio::test]
async fn test_news_with_unknown_key_is_403() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(get_with_key("/api/news", "nf_live_obviously_wrong"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_api_key");
}

#[tokio::test]
async fn test_internal_request_bypasses_key_check() {
    let (app, _) = test_app();
    let resp = app.oneshot(internal_get("/api/news")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["totalResults"], 0);
    assert!(body["data"]["articles"].as_array().unwrap().is_empty());
    assert!(body["meta"]["fetchedAt"].is_string());
}

#[tokio::test]
async fn test_categories_route_is_open() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/api/news/categories")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["data"]["categories"].as_array().unwrap().len(), 8);
    assert_eq!(body["data"]["countries"].as_array().unwrap().len(), 8);
    assert_eq!(body["data"]["countries"][0]["code"], "us");
    assert_eq!(body["data"]["languages"][0], "en");
}

#[tokio::test]
async fn test_search_requires_q() {
    let (app, _) = test_app();
    let resp = app.oneshot(internal_get("/api/news/search")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "missing_parameter");
}

#[tokio::test]
async fn test_bad_timestamp_is_400() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(internal_get("/api/news?from=not-a-date"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_parameter");
}

#[tokio::test]
async fn test_unknown_category_is_400() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(internal_get("/api/news?category=astrology"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "invalid_parameter");
    assert!(body["message"].as_str().unwrap().contains("astrology"));
}

#[tokio::test]
async fn test_news_filtering_and_search_over_http() {
    let (app, mem) = test_app();
    for article in [
        fixture_article("a1", "AI chips surge", "technology", 1),
        fixture_article("a2", "Election results in", "politics", 2),
        fixture_article("a3", "New AI model released", "technology", 3),
    ] {
        mem.upsert_article(&article).await.unwrap();
    }

    // Category filter, recency order.
    let resp = app
        .clone()
        .oneshot(internal_get("/api/news?category=technology"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["totalResults"], 2);
    assert_eq!(body["data"]["articles"][0]["id"], "a1");
    assert_eq!(body["data"]["articles"][1]["id"], "a3");
    assert_eq!(body["data"]["filter"]["category"], "technology");

    // Free-text search is case-insensitive over title.
    let resp = app
        .clone()
        .oneshot(internal_get("/api/news/search?q=ai"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["totalResults"], 2);
    assert_eq!(body["data"]["filter"]["search"], "ai");

    // Search alias parameter.
    let resp = app
        .oneshot(internal_get("/api/news/search?search=election"))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["data"]["totalResults"], 1);
    assert_eq!(body["data"]["articles"][0]["id"], "a2");
}

#[tokio::test]
async fn test_key_lifecycle_over_http() {
    let (app, _) = test_app();
    let (id, secret) = create_key(&app, json!({})).await;

    // Freshly issued key reaches the gated route.
    let resp = app
        .clone()
        .oneshot(get_with_key("/api/news", &secret))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // It shows up in the owner's list, prefix only.
    let resp = app
        .clone()
        .oneshot(get("/api/keys?userId=user-1"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["meta"]["total"], 1);
    let listed = &body["data"]["apiKeys"][0];
    assert_eq!(listed["id"], id.to_string());
    assert!(listed["keyPrefix"].as_str().unwrap().starts_with("nf_live_"));
    assert!(listed.get("keyHash").is_none());

    // Revoke, then the same secret is rejected.
    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/keys?keyId={id}&action=revoke"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(get_with_key("/api/news", &secret))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_create_key_missing_fields_is_400() {
    let (app, _) = test_app();
    let req = Request::builder()
        .method("POST")
        .uri("/api/keys")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "userId": "user-1" }).to_string()))
        .unwrap();
    let resp = app.oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "missing_parameter");
}

#[tokio::test]
async fn test_delete_unknown_key_is_404() {
    let (app, _) = test_app();
    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri(format!("/api/keys?keyId={}", Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body = body_json(resp).await;
    assert_eq!(body["error"], "not_found");
}

#[tokio::test]
async fn test_exhausted_daily_quota_is_429_with_retry_after() {
    let (app, mem) = test_app();
    let (id, secret) = create_key(&app, json!({ "rateLimit": 1 })).await;

    // Fill today's meter directly so the gate sees the ceiling reached.
    mem.increment_period_count(id, Utc::now().date_naive())
        .await
        .unwrap();

    let resp = app
        .oneshot(get_with_key("/api/news", &secret))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert_eq!(resp.headers()["retry-after"], "86400");

    let body = body_json(resp).await;
    assert_eq!(body["error"], "rate_limit_exceeded");
}

#[tokio::test]
async fn test_endpoint_allow_list_is_enforced() {
    let (app, _) = test_app();
    let (_, secret) = create_key(&app, json!({ "allowedEndpoints": ["/api/news"] })).await;

    let resp = app
        .clone()
        .oneshot(get_with_key("/api/news", &secret))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(get_with_key("/api/news/search?q=ai", &secret))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_ip_whitelist_is_enforced() {
    let (app, _) = test_app();
    let (_, secret) = create_key(&app, json!({ "ipWhitelist": ["1.2.3.4"] })).await;

    let blocked = Request::builder()
        .uri("/api/news")
        .header("x-api-key", &secret)
        .header("x-forwarded-for", "5.6.7.8")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(blocked).await.unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let allowed = Request::builder()
        .uri("/api/news")
        .header("x-api-key", &secret)
        .header("x-forwarded-for", "1.2.3.4, 10.0.0.1")
        .body(Body::empty())
        .unwrap();
    let resp = app.oneshot(allowed).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_usage_endpoint_reports_logs_and_stats() {
    let (app, mem) = test_app();
    let (id, secret) = create_key(&app, json!({})).await;

    let resp = app
        .clone()
        .oneshot(get_with_key("/api/news", &secret))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Usage is recorded off the response path; wait for the log to land.
    for _ in 0..50 {
        if !mem.list_usage_logs(id, 1).await.unwrap().is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }

    let resp = app
        .oneshot(get(&format!("/api/keys/usage?apiKeyId={id}")))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    let usage = body["data"]["usage"].as_array().unwrap();
    assert_eq!(usage.len(), 1);
    assert_eq!(usage[0]["endpoint"], "/api/news");
    assert_eq!(usage[0]["method"], "GET");
    assert_eq!(usage[0]["statusCode"], 200);
    assert_eq!(body["meta"]["totalRequests"], 1);
    assert_eq!(body["meta"]["successRate"], 100.0);
}

#[tokio::test]
async fn test_healthz() {
    let (app, _) = test_app();
    let resp = app.oneshot(get("/healthz")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
