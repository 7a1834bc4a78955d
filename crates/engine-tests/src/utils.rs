use async_trait::async_trait;
use bytes::Bytes;
use connectors::error::{DeliveryError, SourceError};
use connectors::object::{ByteStream, SourceObject};
use connectors::upstream::BulkTrack;
use engine_core::retry::RetryPolicy;
use engine_runtime::budget::RunBudget;
use engine_runtime::controller::{ImportController, RunParams};
use engine_runtime::error::ImportError;
use futures_util::{StreamExt, stream};
use model::record::AttributeRecord;
use model::run::RunReport;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory source object whose stream yields fixed-size pieces, so tests
/// control where chunk boundaries land.
pub struct MemoryObject {
    data: Vec<u8>,
    piece: usize,
}

impl MemoryObject {
    pub fn new(data: &[u8], piece: usize) -> Arc<Self> {
        Arc::new(MemoryObject {
            data: data.to_vec(),
            piece: piece.max(1),
        })
    }
}

#[async_trait]
impl SourceObject for MemoryObject {
    async fn content_length(&self) -> Result<u64, SourceError> {
        Ok(self.data.len() as u64)
    }

    async fn read_range(&self, offset: u64) -> Result<ByteStream, SourceError> {
        let tail = self.data[offset as usize..].to_vec();
        let pieces: Vec<Result<Bytes, SourceError>> = tail
            .chunks(self.piece)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Ok(stream::iter(pieces).boxed())
    }
}

/// Planned outcome for one upstream call. Calls beyond the plan succeed.
pub enum Plan {
    /// Apply the whole batch.
    Success,
    /// Apply the batch minus this many per-record errors.
    Partial(usize),
    /// Transient failure: rate limit, server error, transport.
    Retryable(&'static str),
    /// Unexpected client error; aborts the run.
    Fatal(&'static str),
}

/// Fake bulk endpoint driven by a per-call plan, recording every record it
/// applied.
pub struct FakeTrack {
    plan: Mutex<Vec<Plan>>,
    delivered: Mutex<Vec<serde_json::Value>>,
    pub calls: AtomicUsize,
}

impl FakeTrack {
    pub fn reliable() -> Arc<Self> {
        Self::scripted(Vec::new())
    }

    pub fn scripted(plan: Vec<Plan>) -> Arc<Self> {
        Arc::new(FakeTrack {
            plan: Mutex::new(plan),
            delivered: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        })
    }

    /// Identifiers of every record in a successfully applied call, in
    /// delivery order.
    pub fn delivered_ids(&self) -> Vec<String> {
        self.delivered
            .lock()
            .unwrap()
            .iter()
            .map(|record| record["external_id"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    /// The records exactly as they were serialized for the wire.
    pub fn delivered_records(&self) -> Vec<serde_json::Value> {
        self.delivered.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BulkTrack for FakeTrack {
    async fn track(&self, records: &[AttributeRecord]) -> Result<usize, DeliveryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let plan = {
            let mut plans = self.plan.lock().unwrap();
            if plans.is_empty() {
                Plan::Success
            } else {
                plans.remove(0)
            }
        };

        match plan {
            Plan::Success => {
                self.remember(records);
                Ok(records.len())
            }
            Plan::Partial(errors) => {
                self.remember(records);
                Ok(records.len().saturating_sub(errors))
            }
            Plan::Retryable(message) => Err(DeliveryError::Retryable(message.into())),
            Plan::Fatal(message) => Err(DeliveryError::Fatal(message.into())),
        }
    }
}

impl FakeTrack {
    fn remember(&self, records: &[AttributeRecord]) {
        let mut delivered = self.delivered.lock().unwrap();
        delivered.extend(
            records
                .iter()
                .map(|r| serde_json::to_value(r).expect("record serializes")),
        );
    }
}

/// Run one import over an in-memory object with fast retries and the given
/// resume state, returning the controller for post-run inspection.
pub async fn run_import(
    data: &[u8],
    api: Arc<FakeTrack>,
    offset: u64,
    headers: Option<Vec<String>>,
    max_threads: usize,
    budget: RunBudget,
) -> (ImportController, Result<RunReport, ImportError>) {
    let object = MemoryObject::new(data, 7);
    let mut params = RunParams::new(object, api);
    params.offset = offset;
    params.headers = headers;
    params.max_threads = max_threads;
    params.budget = budget;
    params.retry = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(2));

    let mut controller = ImportController::new(params);
    let result = controller.run().await;
    (controller, result)
}

/// A body of `count` rows shaped `u<n>,x`, prefixed with the standard
/// header. Returns the bytes and the byte length of each line in order.
pub fn csv_with_rows(count: usize) -> (Vec<u8>, Vec<u64>) {
    let mut data = b"external_id,a\n".to_vec();
    let mut line_lengths = vec![14u64];
    for n in 0..count {
        let line = format!("u{n},x\n");
        line_lengths.push(line.len() as u64);
        data.extend_from_slice(line.as_bytes());
    }
    (data, line_lengths)
}
