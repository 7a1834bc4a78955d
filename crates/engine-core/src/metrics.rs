use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

#[derive(Debug, Default)]
struct InnerMetrics {
    records_delivered: AtomicU64,
    record_failures: AtomicU64,
    batches_delivered: AtomicU64,
    bytes_committed: AtomicU64,
    retry_count: AtomicU64,
}

/// Run-wide counters shared by the delivery worker pool. The only mutable
/// state that crosses task boundaries during a run.
#[derive(Debug, Clone, Default)]
pub struct Metrics {
    inner: Arc<InnerMetrics>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub records_delivered: u64,
    pub record_failures: u64,
    pub batches_delivered: u64,
    pub bytes_committed: u64,
    pub retry_count: u64,
}

impl Metrics {
    pub fn new() -> Self {
        Metrics::default()
    }

    pub fn increment_records(&self, count: u64) {
        self.inner
            .records_delivered
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_record_failures(&self, count: u64) {
        self.inner
            .record_failures
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_batches(&self, count: u64) {
        self.inner
            .batches_delivered
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_bytes(&self, count: u64) {
        self.inner
            .bytes_committed
            .fetch_add(count, Ordering::Relaxed);
    }

    pub fn increment_retries(&self, count: u64) {
        self.inner.retry_count.fetch_add(count, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_delivered: self.inner.records_delivered.load(Ordering::Relaxed),
            record_failures: self.inner.record_failures.load(Ordering::Relaxed),
            batches_delivered: self.inner.batches_delivered.load(Ordering::Relaxed),
            bytes_committed: self.inner.bytes_committed.load(Ordering::Relaxed),
            retry_count: self.inner.retry_count.load(Ordering::Relaxed),
        }
    }
}
