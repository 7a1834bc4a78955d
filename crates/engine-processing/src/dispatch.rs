use crate::deliver::BatchDeliverer;
use connectors::error::DeliveryError;
use model::batch::Wave;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error};

/// Fans a wave of batches out to concurrent delivery tasks and joins them
/// all before reporting.
pub struct WaveDispatcher {
    deliverer: Arc<BatchDeliverer>,
}

impl WaveDispatcher {
    pub fn new(deliverer: Arc<BatchDeliverer>) -> Self {
        WaveDispatcher { deliverer }
    }

    /// Dispatches every batch in the wave concurrently. Returns the total
    /// number of records applied; the first fatal error aborts the wave, but
    /// only after every in-flight delivery has returned. Batches that
    /// succeeded before a sibling failed stay delivered upstream.
    pub async fn dispatch(&self, wave: Wave) -> Result<usize, DeliveryError> {
        if wave.is_empty() {
            return Ok(0);
        }

        let start = Instant::now();
        let batch_count = wave.batch_count();

        let mut tasks = Vec::with_capacity(batch_count);
        for (idx, batch) in wave.into_batches().into_iter().enumerate() {
            let deliverer = self.deliverer.clone();
            tasks.push(tokio::spawn(async move {
                (idx, deliverer.deliver(&batch).await)
            }));
        }

        let mut applied = 0usize;
        let mut fatal: Option<DeliveryError> = None;
        for result in futures::future::join_all(tasks).await {
            match result {
                Ok((_, Ok(count))) => applied += count,
                Ok((idx, Err(err))) => {
                    error!(batch = idx, error = %err, "Batch delivery failed");
                    fatal.get_or_insert(err);
                }
                Err(join_err) => {
                    error!(error = %join_err, "Delivery task aborted");
                    fatal.get_or_insert(DeliveryError::Fatal(format!(
                        "delivery task aborted: {join_err}"
                    )));
                }
            }
        }

        if let Some(err) = fatal {
            return Err(err);
        }

        debug!(
            batches = batch_count,
            applied,
            duration_ms = start.elapsed().as_millis() as u64,
            "Wave dispatched"
        );
        Ok(applied)
    }
}
