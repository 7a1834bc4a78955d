use crate::normalize::{CastSpec, normalize};
use connectors::error::SourceError;
use connectors::reader::split_line;
use model::record::AttributeRecord;
use tracing::warn;

/// Builds normalized attribute records from raw lines, pairing header
/// columns with cells.
pub struct RecordBuilder {
    headers: Vec<String>,
    casts: CastSpec,
}

impl RecordBuilder {
    pub fn new(headers: Vec<String>, casts: CastSpec) -> Self {
        casts.warn_missing_columns(&headers);
        RecordBuilder { headers, casts }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Parses one line into a normalized record. Returns `None` for blank
    /// lines, rows without an identifier, and rows that carry no attribute
    /// updates.
    pub fn build(&self, line: &str) -> Result<Option<AttributeRecord>, SourceError> {
        if line.trim().is_empty() {
            return Ok(None);
        }

        let mut cells = split_line(line)?;
        if cells.len() > self.headers.len() {
            warn!(
                expected = self.headers.len(),
                got = cells.len(),
                "Row has more cells than headers; surplus cells dropped"
            );
            cells.truncate(self.headers.len());
        }

        let external_id = cells.first().cloned().unwrap_or_default();
        if external_id.trim().is_empty() {
            warn!("Skipping row with an empty identifier cell");
            return Ok(None);
        }

        let mut record = AttributeRecord::new(external_id);
        for (idx, header) in self.headers.iter().enumerate().skip(1) {
            let Some(cell) = cells.get(idx) else {
                break;
            };
            if let Some(value) = normalize(cell, self.casts.get(header)) {
                record.push_attribute(header.clone(), value);
            }
        }

        // identifier-only rows carry no update
        if !record.has_attributes() {
            return Ok(None);
        }
        Ok(Some(record))
    }
}
