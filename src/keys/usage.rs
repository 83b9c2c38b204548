//! Usage recording: one immutable log entry per authenticated request plus
//! atomic counter increments on the credential.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::rate_limit::current_period;
use crate::store::{KeyStore, UsageLogRecord};

/// Everything the request gate observed about one authenticated request.
#[derive(Debug, Clone)]
pub struct UsageEntry {
    pub api_key_id: Uuid,
    pub endpoint: String,
    pub method: String,
    pub status_code: i16,
    pub response_time_ms: i32,
    pub ip_address: String,
    pub user_agent: String,
    pub query_params: Option<serde_json::Value>,
}

/// Aggregate view over a credential's usage logs.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_requests: i64,
    pub avg_response_time_ms: f64,
    pub success_rate: f64,
    pub error_count: i64,
}

/// Write the usage record and bump both counters on a spawned task so the
/// response path never blocks on the store. Failures are logged, not
/// propagated; best-effort, single attempt.
pub fn record_async(store: Arc<dyn KeyStore>, entry: UsageEntry) {
    tokio::spawn(async move {
        if let Err(e) = record(&store, entry.clone()).await {
            tracing::error!(api_key_id = %entry.api_key_id, "failed to record usage: {e}");
        }
    });
}

/// Append the immutable log entry and increment the lifetime counter and the
/// daily meter. Both increments are atomic at the store layer.
pub async fn record(store: &Arc<dyn KeyStore>, entry: UsageEntry) -> anyhow::Result<()> {
    let now = Utc::now();
    let log = UsageLogRecord {
        id: Uuid::new_v4(),
        api_key_id: entry.api_key_id,
        endpoint: entry.endpoint,
        method: entry.method,
        status_code: entry.status_code,
        response_time_ms: entry.response_time_ms,
        timestamp: now,
        ip_address: entry.ip_address,
        user_agent: entry.user_agent,
        query_params: entry.query_params,
    };

    store.append_usage_log(&log).await?;
    store.increment_usage(entry.api_key_id, now).await?;
    store
        .increment_period_count(entry.api_key_id, current_period(now))
        .await?;
    Ok(())
}

/// Compute the stats summary the dashboard shows per key.
pub async fn stats(store: &Arc<dyn KeyStore>, api_key_id: Uuid) -> anyhow::Result<UsageStats> {
    // The log page is already capped; stats describe recent traffic, not
    // the full history.
    let logs = store.list_usage_logs(api_key_id, 1000).await?;
    Ok(summarize(&logs))
}

fn summarize(logs: &[UsageLogRecord]) -> UsageStats {
    if logs.is_empty() {
        return UsageStats {
            total_requests: 0,
            avg_response_time_ms: 0.0,
            success_rate: 0.0,
            error_count: 0,
        };
    }
    let total = logs.len() as i64;
    let success = logs
        .iter()
        .filter(|l| (200..300).contains(&(l.status_code as i32)))
        .count() as i64;
    let avg = logs.iter().map(|l| l.response_time_ms as f64).sum::<f64>() / total as f64;
    UsageStats {
        total_requests: total,
        avg_response_time_ms: (avg * 100.0).round() / 100.0,
        success_rate: ((success as f64 / total as f64) * 10_000.0).round() / 100.0,
        error_count: total - success,
    }
}
