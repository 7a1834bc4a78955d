use crate::error::SourceError;
use crate::object::{ByteStream, SourceObject};
use futures_util::StreamExt;
use model::record::IDENTIFIER_COLUMN;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Default read chunk: 10 MiB.
pub const DEFAULT_CHUNK_SIZE: usize = 10 * 1024 * 1024;

struct Line {
    text: String,
    raw_len: u64,
}

/// Forward-only line reader over a byte-range addressable object.
///
/// Raw bytes are pulled in fixed-size chunks; unless a chunk reaches the end
/// of the object, the boundary is rewound to the last newline and the
/// remainder deferred to the next chunk, so a line is never split across two
/// yields. Bytes consumed by yielded lines accumulate as pending (not yet
/// committed) consumption until the caller takes them.
pub struct ChunkedLineReader {
    object: Arc<dyn SourceObject>,
    chunk_size: usize,
    start_offset: u64,
    stream: Option<ByteStream>,
    lines: VecDeque<Line>,
    carry: Vec<u8>,
    pending: u64,
    line_offset: u64,
    eof: bool,
}

impl ChunkedLineReader {
    pub fn new(object: Arc<dyn SourceObject>, start_offset: u64, chunk_size: usize) -> Self {
        ChunkedLineReader {
            object,
            chunk_size: chunk_size.max(1),
            start_offset,
            stream: None,
            lines: VecDeque::new(),
            carry: Vec::new(),
            pending: 0,
            line_offset: start_offset,
            eof: false,
        }
    }

    /// Reads the first line as the header row and validates it. Returns
    /// `None` for an empty object. The header's bytes stay pending and
    /// commit together with the first wave.
    pub async fn read_header_row(&mut self) -> Result<Option<Vec<String>>, SourceError> {
        match self.next_line().await? {
            Some(line) => {
                let columns = split_line(&line)?;
                verify_headers(&columns)?;
                debug!(columns = columns.len(), "Header row consumed");
                Ok(Some(columns))
            }
            None => Ok(None),
        }
    }

    /// Yields the next decoded line, without its terminator. The line's full
    /// byte length (terminator included) is added to the pending count.
    pub async fn next_line(&mut self) -> Result<Option<String>, SourceError> {
        self.fill_lines().await?;
        match self.lines.pop_front() {
            Some(line) => {
                self.pending += line.raw_len;
                Ok(Some(line.text))
            }
            None => Ok(None),
        }
    }

    /// Bytes provisionally consumed by yielded lines since the last take.
    pub fn pending_bytes(&self) -> u64 {
        self.pending
    }

    /// Hands the pending byte count to the caller for committing and resets
    /// it. Pending bytes never taken are simply re-read by the next run.
    pub fn take_pending(&mut self) -> u64 {
        std::mem::take(&mut self.pending)
    }

    pub fn reached_end(&self) -> bool {
        self.eof && self.lines.is_empty()
    }

    async fn fill_lines(&mut self) -> Result<(), SourceError> {
        while self.lines.is_empty() && !self.eof {
            if self.stream.is_none() {
                self.stream = Some(self.object.read_range(self.start_offset).await?);
            }
            let stream = self.stream.as_mut().expect("stream opened above");

            let mut buf: Vec<u8> = Vec::with_capacity(self.chunk_size);
            while buf.len() < self.chunk_size {
                match stream.next().await {
                    Some(piece) => buf.extend_from_slice(&piece?),
                    None => {
                        self.eof = true;
                        break;
                    }
                }
            }

            let mut data = std::mem::take(&mut self.carry);
            data.extend_from_slice(&buf);

            if !self.eof {
                match data.iter().rposition(|&b| b == b'\n') {
                    Some(pos) => self.carry = data.split_off(pos + 1),
                    None => {
                        // line longer than the chunk; keep accumulating
                        self.carry = data;
                        continue;
                    }
                }
            }

            self.push_lines(&data)?;
        }
        Ok(())
    }

    fn push_lines(&mut self, data: &[u8]) -> Result<(), SourceError> {
        let mut rest = data;
        while !rest.is_empty() {
            let (raw, tail) = match rest.iter().position(|&b| b == b'\n') {
                Some(pos) => rest.split_at(pos + 1),
                None => rest.split_at(rest.len()),
            };

            let mut content = raw;
            if let Some(stripped) = content.strip_suffix(b"\n") {
                content = stripped;
            }
            if let Some(stripped) = content.strip_suffix(b"\r") {
                content = stripped;
            }
            let text = std::str::from_utf8(content)
                .map_err(|_| SourceError::Utf8 {
                    offset: self.line_offset,
                })?
                .to_string();

            self.lines.push_back(Line {
                text,
                raw_len: raw.len() as u64,
            });
            self.line_offset += raw.len() as u64;
            rest = tail;
        }
        Ok(())
    }
}

/// Splits one CSV line into cells. Quoted cells may contain commas; record
/// boundaries are always newlines.
pub fn split_line(line: &str) -> Result<Vec<String>, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(line.as_bytes());
    let mut record = csv::StringRecord::new();
    if reader.read_record(&mut record)? {
        Ok(record.iter().map(str::to_string).collect())
    } else {
        Ok(Vec::new())
    }
}

/// Validates that the header row follows `external_id,attr1,...attrN`.
pub fn verify_headers(columns: &[String]) -> Result<(), SourceError> {
    match columns.first() {
        Some(first) if first == IDENTIFIER_COLUMN => Ok(()),
        other => Err(SourceError::MalformedHeader {
            expected: IDENTIFIER_COLUMN,
            actual: other.cloned().unwrap_or_default(),
        }),
    }
}
