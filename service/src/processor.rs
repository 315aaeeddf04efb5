use crate::enrichment::{EnrichmentError, NoteSource};
use crate::models::SkipKind;
use parser::{parse_record, OutputRecord, ParseError, RawRecord};
use std::sync::Arc;
use tracing::debug;

/// Index of the first row read from the input.
pub const FIRST_ROW_INDEX: usize = 1;

/// How the first input row is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HeaderPolicy {
    /// Skip exactly the first row; it never produces output.
    #[default]
    SkipFirstRow,
    /// Every row is data.
    None,
}

impl HeaderPolicy {
    pub fn is_header(&self, index: usize) -> bool {
        match self {
            HeaderPolicy::SkipFirstRow => index == FIRST_ROW_INDEX,
            HeaderPolicy::None => false,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Enrichment(#[from] EnrichmentError),
    #[error("record task failed: {0}")]
    Task(String),
}

impl RecordError {
    pub fn kind(&self) -> SkipKind {
        match self {
            RecordError::Parse(ParseError::InvalidTimestamp { .. }) => SkipKind::InvalidTimestamp,
            RecordError::Parse(ParseError::MissingFields { .. }) => SkipKind::MissingFields,
            RecordError::Parse(_) => SkipKind::MalformedRow,
            RecordError::Enrichment(_) => SkipKind::Enrichment,
            RecordError::Task(_) => SkipKind::Task,
        }
    }
}

/// A record that made it through parsing and enrichment.
#[derive(Debug, Clone)]
pub struct ProcessedRecord {
    pub record: OutputRecord,
    pub ip_valid: bool,
}

/// Turns one raw row into one output record.
#[derive(Clone)]
pub struct RecordProcessor {
    notes: Arc<dyn NoteSource>,
    header: HeaderPolicy,
}

impl RecordProcessor {
    pub fn new(notes: Arc<dyn NoteSource>, header: HeaderPolicy) -> Self {
        Self { notes, header }
    }

    /// Rows the header policy excludes are never handed to [`process`].
    ///
    /// [`process`]: RecordProcessor::process
    pub fn is_header(&self, index: usize) -> bool {
        self.header.is_header(index)
    }

    /// The row is parsed before the annotation is fetched, so rows that fail
    /// to parse cost no request.
    pub async fn process(&self, raw: RawRecord) -> Result<ProcessedRecord, RecordError> {
        let parsed = parse_record(&raw)?;
        let ip_valid = parsed.source_ip.is_valid();
        let note = self.notes.fetch_note().await?;

        debug!("Row {} processed", raw.index);
        Ok(ProcessedRecord {
            record: parsed.with_note(note),
            ip_valid,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrichment::fakes::{FixedNote, FlakyNote};
    use parser::{NormalizedUrl, IP_NOT_VALID};

    fn row(index: usize, fields: &[&str]) -> RawRecord {
        RawRecord::new(index, fields.iter().map(|f| f.to_string()).collect())
    }

    fn processor(note: &str) -> RecordProcessor {
        RecordProcessor::new(Arc::new(FixedNote(note.into())), HeaderPolicy::SkipFirstRow)
    }

    #[tokio::test]
    async fn test_process_valid_row() {
        let raw = row(
            2,
            &["_", "2024-01-01T00:00:00Z", "10.0.0.5", "http://Example.com:80/Path/", "1024"],
        );
        let processed = processor("42 is the number of...")
            .process(raw)
            .await
            .unwrap();

        assert!(processed.ip_valid);
        assert_eq!(
            processed.record,
            OutputRecord {
                ts: 1704067200,
                source_ip: "10.0.0.5".into(),
                url: NormalizedUrl {
                    scheme: "http".into(),
                    host: "example.com".into(),
                    path: "/Path/".into(),
                    opaque: String::new(),
                },
                size: "1024".into(),
                note: "42 is the number of...".into(),
            }
        );
    }

    #[test]
    fn test_header_policy_names_only_the_first_row() {
        let skip = processor("n");
        assert!(skip.is_header(FIRST_ROW_INDEX));
        assert!(!skip.is_header(2));

        let keep = RecordProcessor::new(Arc::new(FixedNote("n".into())), HeaderPolicy::None);
        assert!(!keep.is_header(FIRST_ROW_INDEX));
    }

    #[tokio::test]
    async fn test_invalid_ip_keeps_record() {
        let raw = row(3, &["_", "2024-01-01T00:00:00Z", "not-an-ip", "http://a.com/x", "7"]);
        let processed = processor("n").process(raw).await.unwrap();

        assert!(!processed.ip_valid);
        assert_eq!(processed.record.source_ip, IP_NOT_VALID);
        assert_eq!(processed.record.ts, 1704067200);
        assert_eq!(processed.record.url.path, "/x");
        assert_eq!(processed.record.note, "n");
    }

    #[tokio::test]
    async fn test_bad_timestamp_fails_before_enrichment() {
        let notes = Arc::new(FlakyNote::new("n", vec![]));
        let processor = RecordProcessor::new(notes.clone(), HeaderPolicy::SkipFirstRow);
        let raw = row(2, &["_", "garbage", "10.0.0.5", "a.com", "1"]);

        let err = processor.process(raw).await.unwrap_err();
        assert_eq!(err.kind(), SkipKind::InvalidTimestamp);
        assert_eq!(notes.calls(), 0);
    }

    #[tokio::test]
    async fn test_enrichment_failure_fails_record() {
        let processor =
            RecordProcessor::new(Arc::new(FlakyNote::new("n", vec![1])), HeaderPolicy::SkipFirstRow);
        let raw = row(2, &["_", "2024-01-01T00:00:00Z", "10.0.0.5", "a.com", "1"]);

        let err = processor.process(raw).await.unwrap_err();
        assert_eq!(err.kind(), SkipKind::Enrichment);
    }
}
