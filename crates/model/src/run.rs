use serde::{Deserialize, Serialize};

/// Inbound payload that starts or resumes an import run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriggerPayload {
    pub source_bucket: String,
    pub source_key: String,
    /// Bytes already committed by prior runs; 0 on a fresh run.
    #[serde(default)]
    pub offset: u64,
    /// Column headers captured by a prior run; unset on a fresh run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<Vec<String>>,
    /// Comma-separated `column=type` pairs forcing per-column casts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_cast_spec: Option<String>,
}

impl TriggerPayload {
    /// The payload a follow-up run should receive: this one overlaid with
    /// the continuation's committed offset and headers.
    pub fn with_continuation(&self, continuation: &ContinuationDescriptor) -> TriggerPayload {
        TriggerPayload {
            offset: continuation.offset,
            headers: continuation.headers.clone(),
            ..self.clone()
        }
    }
}

/// The minimal state a suspended or failed run hands to its successor. The
/// sole artifact persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContinuationDescriptor {
    pub offset: u64,
    pub headers: Option<Vec<String>>,
}

/// Mutable bookkeeping for one controller instance. `total_offset` covers
/// only bytes whose records are confirmed dispatched; bytes of an in-flight
/// wave stay with the reader until the wave returns cleanly.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    pub total_offset: u64,
    pub headers: Option<Vec<String>>,
    pub processed_count: u64,
}

impl RunState {
    pub fn resumed(offset: u64, headers: Option<Vec<String>>) -> Self {
        RunState {
            total_offset: offset,
            headers,
            processed_count: 0,
        }
    }

    /// Commits provisionally consumed bytes after a wave dispatched cleanly.
    pub fn commit(&mut self, pending_bytes: u64, applied_records: u64) {
        self.total_offset += pending_bytes;
        self.processed_count += applied_records;
    }
}

/// Outcome summary returned to the invoker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub users_processed: u64,
    pub bytes_read: u64,
    pub is_finished: bool,
}
