//! Daily rate limiting.
//!
//! The ceiling is enforced against a fixed UTC-day window backed by the
//! store's usage meters, which reset naturally when the date rolls over.
//! The credential's lifetime `request_count` stays monotonic and is never
//! consulted for limiting.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::store::{ApiKeyRecord, KeyStore};

/// Point check: true iff the counter is still below the ceiling.
pub fn under_ceiling(count: i64, ceiling: i64) -> bool {
    count < ceiling
}

/// UTC day bucket for a given instant.
pub fn current_period(now: DateTime<Utc>) -> NaiveDate {
    now.date_naive()
}

/// Whether the credential may serve one more request today.
pub async fn allow(store: &Arc<dyn KeyStore>, key: &ApiKeyRecord) -> anyhow::Result<bool> {
    let count = store.period_count(key.id, current_period(Utc::now())).await?;
    Ok(under_ceiling(count, key.rate_limit))
}
