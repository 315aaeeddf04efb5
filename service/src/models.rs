use parser::OutputRecord;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// Why an input row produced no output record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipKind {
    MissingFields,
    InvalidTimestamp,
    MalformedRow,
    Enrichment,
    Task,
}

impl fmt::Display for SkipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SkipKind::MissingFields => "missing fields",
            SkipKind::InvalidTimestamp => "invalid timestamp",
            SkipKind::MalformedRow => "malformed row",
            SkipKind::Enrichment => "enrichment failed",
            SkipKind::Task => "task failed",
        };
        f.write_str(name)
    }
}

/// Completed records keyed by input row index.
///
/// Owned by the pipeline coordinator and only mutated by it; iteration is
/// always in row order, whatever order the records completed in.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResultSet {
    records: BTreeMap<usize, OutputRecord>,
}

impl ResultSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the record previously stored at `index`, if any.
    pub fn insert(&mut self, index: usize, record: OutputRecord) -> Option<OutputRecord> {
        self.records.insert(index, record)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.records.keys().copied()
    }

    pub fn records(&self) -> impl Iterator<Item = &OutputRecord> {
        self.records.values()
    }
}

/// A row that was dropped, with the reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub index: usize,
    pub kind: SkipKind,
    pub reason: String,
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub header_rows: usize,
    pub written: usize,
    pub invalid_ips: usize,
    pub skipped: Vec<SkippedRow>,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn record_skip(&mut self, index: usize, kind: SkipKind, reason: impl Into<String>) {
        self.skipped.push(SkippedRow {
            index,
            kind,
            reason: reason.into(),
        });
    }

    pub fn skip_counts(&self) -> BTreeMap<SkipKind, usize> {
        let mut counts = BTreeMap::new();
        for row in &self.skipped {
            *counts.entry(row.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}
