// Fan-out of rows to record processors and collection of their results.

use crate::config::{Config, ConfigError};
use crate::enrichment::{EnrichmentError, HttpNoteSource, NoteSource};
use crate::models::{ResultSet, RunSummary, SkipKind};
use crate::processor::{ProcessedRecord, RecordError, RecordProcessor};
use crate::storage::{write_results, OutputError};
use futures::stream::{self, StreamExt};
use parser::{CsvRowReader, ParseError, RawRecord, RowRead};
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to read input {}: {source}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: ParseError,
    },
    #[error("could not build annotation client: {0}")]
    Client(#[from] EnrichmentError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

/// Everything a finished fan-out produced.
#[derive(Debug, Default)]
pub struct RunOutcome {
    pub results: ResultSet,
    pub summary: RunSummary,
}

pub struct Pipeline {
    processor: RecordProcessor,
    concurrency: usize,
}

impl Pipeline {
    pub fn new(processor: RecordProcessor, concurrency: usize) -> Self {
        Self {
            processor,
            concurrency: concurrency.max(1),
        }
    }

    /// Process every row and wait for all of them.
    ///
    /// Each data row runs as its own task, at most `concurrency` at a time.
    /// This function is the only writer of the result set: tasks hand their
    /// record back through the stream and never touch shared state. Failed
    /// rows are recorded in the summary and do not affect other rows.
    pub async fn run(&self, rows: Vec<RowRead>) -> RunOutcome {
        let mut outcome = RunOutcome::default();
        outcome.summary.rows_read = rows.len();

        let mut dispatch: Vec<RawRecord> = Vec::with_capacity(rows.len());

        for row in rows {
            if self.processor.is_header(row.index()) {
                debug!("Skipping header row {}", row.index());
                outcome.summary.header_rows += 1;
                continue;
            }
            match row {
                RowRead::Row(raw) => dispatch.push(raw),
                RowRead::Malformed { index, error } => {
                    warn!("Row {} skipped ({}): {}", index, SkipKind::MalformedRow, error);
                    outcome.summary.record_skip(index, SkipKind::MalformedRow, error);
                }
            }
        }

        info!(
            "Dispatching {} rows ({} concurrent)",
            dispatch.len(),
            self.concurrency
        );

        let processor = self.processor.clone();
        let mut completions = stream::iter(dispatch)
            .map(|raw| {
                let processor = processor.clone();
                let index = raw.index;
                async move {
                    let joined = tokio::spawn(async move { processor.process(raw).await }).await;
                    let result = match joined {
                        Ok(result) => result,
                        Err(e) => Err(RecordError::Task(e.to_string())),
                    };
                    (index, result)
                }
            })
            .buffer_unordered(self.concurrency);

        while let Some((index, result)) = completions.next().await {
            collect(&mut outcome, index, result);
        }

        outcome.summary.skipped.sort_by_key(|row| row.index);
        outcome
    }
}

fn collect(
    outcome: &mut RunOutcome,
    index: usize,
    result: Result<ProcessedRecord, RecordError>,
) {
    match result {
        Ok(processed) => {
            if !processed.ip_valid {
                outcome.summary.invalid_ips += 1;
            }
            outcome.results.insert(index, processed.record);
        }
        Err(e) => {
            warn!("Row {} skipped ({}): {}", index, e.kind(), e);
            outcome.summary.record_skip(index, e.kind(), e.to_string());
        }
    }
}

/// Run the whole job against the configured annotation service.
pub async fn run_file(config: &Config) -> Result<RunSummary, RunError> {
    let notes = HttpNoteSource::new(config.endpoint.clone(), config.timeout)?;
    run_file_with(config, Arc::new(notes)).await
}

/// Read the input, process it, and write the output once every row is done.
pub async fn run_file_with(
    config: &Config,
    notes: Arc<dyn NoteSource>,
) -> Result<RunSummary, RunError> {
    config.validate()?;
    let start = Instant::now();

    info!("Reading {}", config.input.display());
    let rows = read_rows(config)?;

    let pipeline = Pipeline::new(RecordProcessor::new(notes, config.header), config.concurrency);
    let RunOutcome {
        results,
        mut summary,
    } = pipeline.run(rows).await;

    summary.written = write_results(&results, &config.output)?;
    summary.elapsed = start.elapsed();

    log_summary(&summary);
    Ok(summary)
}

fn read_rows(config: &Config) -> Result<Vec<RowRead>, RunError> {
    let input_error = |source: ParseError| RunError::Input {
        path: config.input.clone(),
        source,
    };

    let file = File::open(&config.input).map_err(|e| input_error(e.into()))?;
    CsvRowReader::new(BufReader::new(file))
        .read_all()
        .map_err(input_error)
}

pub fn log_summary(summary: &RunSummary) {
    info!(
        "Run complete in {:.2}s: {} rows read, {} written, {} skipped, {} with invalid IP",
        summary.elapsed.as_secs_f64(),
        summary.rows_read,
        summary.written,
        summary.skipped_count(),
        summary.invalid_ips
    );
    for (kind, count) in summary.skip_counts() {
        info!("  skipped ({}): {}", kind, count);
    }
}
