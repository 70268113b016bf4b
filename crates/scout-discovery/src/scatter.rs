//! Concurrent sub-region fan-out for wide-radius searches.

use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::DiscoveryError;
use crate::providers::PlaceProvider;
use crate::types::{ProviderQuery, RawProviderRecord};

/// Runs every query against `provider` with at most `max_concurrent` in
/// flight, abandoning any that exceed `worker_timeout`.
///
/// A failed or timed-out sub-region contributes an empty batch. Only when
/// every sub-region fails is the last error returned.
pub(crate) async fn scatter_fetch(
    provider: &dyn PlaceProvider,
    queries: Vec<ProviderQuery>,
    max_concurrent: usize,
    worker_timeout: Duration,
) -> Result<Vec<RawProviderRecord>, DiscoveryError> {
    let total = queries.len();
    let kind = provider.kind();

    let outcomes: Vec<Result<Vec<RawProviderRecord>, DiscoveryError>> = stream::iter(
        queries.into_iter().enumerate(),
    )
    .map(|(index, query)| async move {
        match tokio::time::timeout(worker_timeout, provider.fetch_page(&query)).await {
            Ok(Ok(page)) => {
                tracing::debug!(index, records = page.records.len(), "sub-region complete");
                Ok(page.records)
            }
            Ok(Err(e)) => {
                tracing::warn!(index, error = %e, "sub-region search failed");
                Err(e)
            }
            Err(_) => {
                tracing::warn!(
                    index,
                    timeout_secs = worker_timeout.as_secs(),
                    "sub-region search timed out"
                );
                Err(DiscoveryError::Timeout {
                    provider: kind,
                    after_secs: worker_timeout.as_secs(),
                })
            }
        }
    })
    .buffer_unordered(max_concurrent.max(1))
    .collect()
    .await;

    let mut records = Vec::new();
    let mut last_error = None;
    let mut failed = 0usize;
    for outcome in outcomes {
        match outcome {
            Ok(batch) => records.extend(batch),
            Err(e) => {
                failed += 1;
                last_error = Some(e);
            }
        }
    }

    if failed == total {
        if let Some(e) = last_error {
            return Err(e);
        }
    }
    if failed > 0 {
        tracing::info!(failed, total, "scatter completed with partial coverage");
    }
    Ok(records)
}
