use crate::retry::classify_delivery_error;
use connectors::error::DeliveryError;
use connectors::upstream::BulkTrack;
use engine_core::metrics::Metrics;
use engine_core::retry::{RetryError, RetryPolicy};
use model::batch::Batch;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

/// Delivers single batches upstream, retrying transient failures with
/// backoff local to each call.
pub struct BatchDeliverer {
    api: Arc<dyn BulkTrack>,
    retry: RetryPolicy,
    metrics: Metrics,
}

impl BatchDeliverer {
    pub fn new(api: Arc<dyn BulkTrack>, retry: RetryPolicy, metrics: Metrics) -> Self {
        BatchDeliverer {
            api,
            retry,
            metrics,
        }
    }

    /// Delivers one batch and returns the number of records applied
    /// upstream. Exhausted retries surface as fatal.
    pub async fn deliver(&self, batch: &Batch) -> Result<usize, DeliveryError> {
        let attempts = AtomicU64::new(0);
        let result = self
            .retry
            .run(
                || {
                    if attempts.fetch_add(1, Ordering::Relaxed) > 0 {
                        self.metrics.increment_retries(1);
                    }
                    let api = self.api.clone();
                    let records = batch.records();
                    async move { api.track(records).await }
                },
                classify_delivery_error,
            )
            .await;

        match result {
            Ok(applied) => {
                let failed = batch.len().saturating_sub(applied);
                if failed > 0 {
                    warn!(
                        failed,
                        batch_size = batch.len(),
                        "Not every record in the batch was applied"
                    );
                }
                self.metrics.increment_records(applied as u64);
                self.metrics.increment_record_failures(failed as u64);
                self.metrics.increment_batches(1);
                Ok(applied)
            }
            Err(RetryError::Fatal(err)) => Err(err),
            Err(RetryError::AttemptsExceeded(err)) => Err(DeliveryError::Fatal(format!(
                "retry attempts exhausted: {err}"
            ))),
        }
    }
}
