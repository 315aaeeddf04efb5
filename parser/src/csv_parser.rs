use crate::{ParseError, RawRecord};
use csv::{Reader, ReaderBuilder, StringRecord};
use std::io::Read;
use tracing::{debug, info, warn};

/// One item read from the CSV input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowRead {
    Row(RawRecord),
    /// The row could not be decoded (bad UTF-8, broken quoting). Only this
    /// row is lost; reading continues with the next one.
    Malformed { index: usize, error: String },
}

impl RowRead {
    pub fn index(&self) -> usize {
        match self {
            RowRead::Row(raw) => raw.index,
            RowRead::Malformed { index, .. } => *index,
        }
    }
}

/// Sequential CSV row reader.
///
/// Headers are not interpreted and rows may have any number of fields: the
/// header row and short rows are handed on as-is so the record processor
/// can decide what to do with them. Rows are numbered from 1.
pub struct CsvRowReader<R: Read> {
    inner: Reader<R>,
    record: StringRecord,
    next_index: usize,
    done: bool,
}

impl<R: Read> CsvRowReader<R> {
    pub fn new(reader: R) -> Self {
        let inner = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        Self {
            inner,
            record: StringRecord::new(),
            next_index: 1,
            done: false,
        }
    }

    /// Read every remaining row. An I/O error on the underlying reader is
    /// returned as an error; per-row decoding problems are not.
    pub fn read_all(self) -> Result<Vec<RowRead>, ParseError> {
        let rows = self.collect::<Result<Vec<_>, _>>()?;
        let malformed = rows
            .iter()
            .filter(|r| matches!(r, RowRead::Malformed { .. }))
            .count();
        info!("CSV reading complete: {} rows, {} malformed", rows.len(), malformed);
        Ok(rows)
    }
}

impl<R: Read> Iterator for CsvRowReader<R> {
    type Item = Result<RowRead, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let index = self.next_index;
        match self.inner.read_record(&mut self.record) {
            Ok(false) => {
                self.done = true;
                None
            }
            Ok(true) => {
                self.next_index += 1;
                let fields = self.record.iter().map(str::to_string).collect();
                debug!("Read row {}", index);
                Some(Ok(RowRead::Row(RawRecord::new(index, fields))))
            }
            Err(e) if e.is_io_error() => {
                self.done = true;
                Some(Err(e.into()))
            }
            Err(e) => {
                self.next_index += 1;
                warn!("Row {} is malformed: {}", index, e);
                Some(Ok(RowRead::Malformed {
                    index,
                    error: e.to_string(),
                }))
            }
        }
    }
}
