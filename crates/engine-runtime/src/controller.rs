use crate::budget::RunBudget;
use crate::error::ImportError;
use connectors::object::SourceObject;
use connectors::reader::{ChunkedLineReader, DEFAULT_CHUNK_SIZE, verify_headers};
use connectors::upstream::BulkTrack;
use engine_core::metrics::Metrics;
use engine_core::retry::RetryPolicy;
use engine_processing::batcher::WaveBatcher;
use engine_processing::deliver::BatchDeliverer;
use engine_processing::dispatch::WaveDispatcher;
use engine_processing::normalize::CastSpec;
use engine_processing::record::RecordBuilder;
use model::batch::Wave;
use model::run::{ContinuationDescriptor, RunReport, RunState};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Default size of the delivery worker pool, and therefore of a wave.
pub const DEFAULT_MAX_THREADS: usize = 20;

/// Everything a run needs: the source object, the delivery endpoint, resume
/// state from the trigger, and tuning knobs.
pub struct RunParams {
    pub object: Arc<dyn SourceObject>,
    pub api: Arc<dyn BulkTrack>,
    pub offset: u64,
    pub headers: Option<Vec<String>>,
    pub casts: CastSpec,
    pub max_threads: usize,
    pub chunk_size: usize,
    pub retry: RetryPolicy,
    pub budget: RunBudget,
    pub metrics: Metrics,
}

impl RunParams {
    pub fn new(object: Arc<dyn SourceObject>, api: Arc<dyn BulkTrack>) -> Self {
        RunParams {
            object,
            api,
            offset: 0,
            headers: None,
            casts: CastSpec::default(),
            max_threads: DEFAULT_MAX_THREADS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            retry: RetryPolicy::for_upstream(),
            budget: RunBudget::unbounded(),
            metrics: Metrics::new(),
        }
    }
}

/// Drives one resumable run: read, batch, dispatch, commit, and suspend or
/// finish. The committed offset only moves after a wave returns without a
/// fatal error, so an aborted run re-reads and re-sends the unconfirmed
/// tail (at-least-once).
pub struct ImportController {
    object: Arc<dyn SourceObject>,
    dispatcher: WaveDispatcher,
    casts: CastSpec,
    max_threads: usize,
    chunk_size: usize,
    budget: RunBudget,
    metrics: Metrics,
    state: RunState,
    start_offset: u64,
    content_length: u64,
}

impl ImportController {
    pub fn new(params: RunParams) -> Self {
        let deliverer = Arc::new(BatchDeliverer::new(
            params.api,
            params.retry,
            params.metrics.clone(),
        ));
        ImportController {
            object: params.object,
            dispatcher: WaveDispatcher::new(deliverer),
            casts: params.casts,
            max_threads: params.max_threads,
            chunk_size: params.chunk_size,
            budget: params.budget,
            metrics: params.metrics,
            state: RunState::resumed(params.offset, params.headers),
            start_offset: params.offset,
            content_length: 0,
        }
    }

    /// Runs the pipeline to completion, suspension, or failure. On failure
    /// the in-flight bytes are discarded and diagnostics carry a
    /// ready-to-resume continuation.
    pub async fn run(&mut self) -> Result<RunReport, ImportError> {
        match self.execute().await {
            Ok(()) => {
                let report = self.report();
                info!(
                    users_processed = report.users_processed,
                    bytes_read = report.bytes_read,
                    is_finished = report.is_finished,
                    "Import run complete"
                );
                Ok(report)
            }
            Err(err) => {
                error!(
                    error = %err,
                    committed_offset = self.state.total_offset,
                    processed = self.state.processed_count,
                    "Import run failed"
                );
                if let Ok(payload) = serde_json::to_string(&self.continuation()) {
                    error!(
                        continuation = %payload,
                        "Resume from this continuation once the failure is resolved"
                    );
                }
                Err(err)
            }
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// The minimal state a follow-up run needs.
    pub fn continuation(&self) -> ContinuationDescriptor {
        ContinuationDescriptor {
            offset: self.state.total_offset,
            headers: self.state.headers.clone(),
        }
    }

    /// A run is finished when it reached end-of-object, or when the object
    /// held nothing to process in the first place.
    pub fn is_finished(&self) -> bool {
        self.state.processed_count == 0
            || self.state.total_offset == 0
            || self.state.total_offset >= self.content_length
    }

    pub fn report(&self) -> RunReport {
        RunReport {
            users_processed: self.state.processed_count,
            bytes_read: self.state.total_offset - self.start_offset,
            is_finished: self.is_finished(),
        }
    }

    async fn execute(&mut self) -> Result<(), ImportError> {
        self.content_length = self.object.content_length().await?;
        let mut reader = ChunkedLineReader::new(
            self.object.clone(),
            self.state.total_offset,
            self.chunk_size,
        );

        let headers = match self.state.headers.clone() {
            Some(headers) => {
                // resumed mid-body; the stream holds no header row
                verify_headers(&headers)?;
                headers
            }
            None => match reader.read_header_row().await? {
                Some(headers) => {
                    self.state.headers = Some(headers.clone());
                    headers
                }
                None => {
                    info!("Source object is empty; nothing to import");
                    return Ok(());
                }
            },
        };

        let builder = RecordBuilder::new(headers, self.casts.clone());
        let mut batcher = WaveBatcher::new(self.max_threads);
        let mut suspended = false;

        while let Some(line) = reader.next_line().await? {
            let Some(record) = builder.build(&line)? else {
                continue;
            };
            if let Some(wave) = batcher.push(record) {
                self.dispatch_wave(wave, &mut reader).await?;
                if self.budget.should_suspend() {
                    info!(
                        committed_offset = self.state.total_offset,
                        "Time budget low; suspending before the next wave"
                    );
                    suspended = true;
                    break;
                }
            }
        }

        if !suspended {
            // the final flush also commits header and skipped-row bytes
            let wave = batcher.flush();
            self.dispatch_wave(wave, &mut reader).await?;
        }
        Ok(())
    }

    async fn dispatch_wave(
        &mut self,
        wave: Wave,
        reader: &mut ChunkedLineReader,
    ) -> Result<(), ImportError> {
        let batches = wave.batch_count();
        let records = wave.record_count();
        let applied = self.dispatcher.dispatch(wave).await?;

        let pending = reader.take_pending();
        self.state.commit(pending, applied as u64);
        self.metrics.increment_bytes(pending);

        debug!(
            batches,
            records,
            applied,
            committed_offset = self.state.total_offset,
            "Wave committed"
        );
        Ok(())
    }
}
