use model::batch::{Batch, MAX_BATCH_RECORDS, Wave};
use model::record::AttributeRecord;

/// Accumulates normalized records into fixed-size batches and batches into
/// waves sized to the delivery worker pool.
pub struct WaveBatcher {
    wave_capacity: usize,
    records: Vec<AttributeRecord>,
    batches: Vec<Batch>,
}

impl WaveBatcher {
    pub fn new(wave_capacity: usize) -> Self {
        WaveBatcher {
            wave_capacity: wave_capacity.max(1),
            records: Vec::with_capacity(MAX_BATCH_RECORDS),
            batches: Vec::new(),
        }
    }

    /// Adds a record; returns a full wave when this record completes it.
    pub fn push(&mut self, record: AttributeRecord) -> Option<Wave> {
        self.records.push(record);
        if self.records.len() == MAX_BATCH_RECORDS {
            self.batches.push(Batch::new(std::mem::take(&mut self.records)));
        }
        if self.batches.len() == self.wave_capacity {
            return Some(Wave::new(std::mem::take(&mut self.batches)));
        }
        None
    }

    /// Drains buffered records into a final wave. The wave may be empty when
    /// every remaining row was skipped.
    pub fn flush(&mut self) -> Wave {
        if !self.records.is_empty() {
            self.batches.push(Batch::new(std::mem::take(&mut self.records)));
        }
        Wave::new(std::mem::take(&mut self.batches))
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty() && self.batches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(n: usize) -> AttributeRecord {
        let mut record = AttributeRecord::new(format!("u-{n}"));
        record.push_attribute("a", model::value::AttributeValue::Int(n as i64));
        record
    }

    #[test]
    fn emits_a_wave_once_capacity_is_reached() {
        let mut batcher = WaveBatcher::new(2);
        let mut waves = Vec::new();

        for n in 0..(MAX_BATCH_RECORDS * 2) {
            if let Some(wave) = batcher.push(record(n)) {
                waves.push(wave);
            }
        }

        assert_eq!(waves.len(), 1);
        assert_eq!(waves[0].batch_count(), 2);
        assert_eq!(waves[0].record_count(), MAX_BATCH_RECORDS * 2);
        assert!(batcher.is_empty());
    }

    #[test]
    fn flush_drains_a_partial_batch_and_wave() {
        let mut batcher = WaveBatcher::new(20);
        for n in 0..(MAX_BATCH_RECORDS + 3) {
            assert!(batcher.push(record(n)).is_none());
        }

        let wave = batcher.flush();
        assert_eq!(wave.batch_count(), 2);
        assert_eq!(wave.record_count(), MAX_BATCH_RECORDS + 3);
        assert!(batcher.is_empty());
    }

    #[test]
    fn flush_of_an_empty_batcher_is_an_empty_wave() {
        let mut batcher = WaveBatcher::new(20);
        assert!(batcher.flush().is_empty());
    }

    #[test]
    fn batches_never_exceed_the_record_ceiling() {
        let mut batcher = WaveBatcher::new(1);
        let mut waves = Vec::new();
        for n in 0..(MAX_BATCH_RECORDS * 3) {
            if let Some(wave) = batcher.push(record(n)) {
                waves.push(wave);
            }
        }

        assert_eq!(waves.len(), 3);
        for wave in &waves {
            assert_eq!(wave.batch_count(), 1);
            assert_eq!(wave.record_count(), MAX_BATCH_RECORDS);
        }
    }
}
