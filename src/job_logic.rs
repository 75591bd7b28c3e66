// src/job_logic.rs

use std::path::PathBuf;
use std::time::Duration;

use tracing::{info, instrument, warn};

use crate::config::{ParquetInputConfig, RunSettings};
use crate::error::Result;
use crate::orchestrator::{BatchOrchestrator, OutcomeSummary, RunReport};
use crate::pipeline::readers::{BaseReader, Dataset, ParquetReader};
use crate::pipeline::writers::{BaseWriter, ParquetWriter};

/// What a finished job reports back to the binary.
#[derive(Debug, Clone)]
pub struct JobSummary {
    pub output_path: PathBuf,
    pub rows: usize,
    pub items: usize,
    pub outcomes: OutcomeSummary,
    pub abandoned: bool,
    pub elapsed: Duration,
}

/// Reads the input file, annotates every row with text and writes the
/// annotated copy. An abandoned run still writes what it has; unfinished
/// rows keep their placeholders.
#[instrument(skip(settings, orchestrator), fields(batch_size = settings.batch_size))]
pub async fn run_annotation_job(
    input_path: &str,
    output_path: &str,
    settings: &RunSettings,
    orchestrator: &BatchOrchestrator,
) -> Result<JobSummary> {
    let reader = ParquetReader::new(ParquetInputConfig {
        path: input_path.to_string(),
        text_column: settings.text_column.clone(),
        batch_size: None,
    });
    let dataset = reader.read_dataset()?;

    let report = orchestrator
        .run(&dataset.items, settings.batch_size, settings.inter_batch_delay())
        .await?;
    if report.abandoned {
        warn!(
            completed = report.labels.len(),
            total = dataset.items.len(),
            "Run was stopped early, writing partial results"
        );
    }

    let output_path = write_annotated(&dataset, &report, output_path, settings)?;
    let summary = JobSummary {
        output_path,
        rows: dataset.num_rows(),
        items: dataset.items.len(),
        outcomes: report.summary(),
        abandoned: report.abandoned,
        elapsed: report.elapsed,
    };
    info!(
        output = %summary.output_path.display(),
        rows = summary.rows,
        items = summary.items,
        failed = summary.outcomes.failed,
        unrecognized = summary.outcomes.unrecognized,
        "Annotation job finished"
    );
    Ok(summary)
}

/// Writes every input batch with the annotation columns appended and returns
/// the path actually written.
pub fn write_annotated(
    dataset: &Dataset,
    report: &RunReport,
    output_path: &str,
    settings: &RunSettings,
) -> Result<PathBuf> {
    let mut writer = ParquetWriter::new(
        output_path,
        &dataset.schema,
        &settings.sentiment_column,
        &settings.segmented_column,
    )?;
    let path = writer.path().to_path_buf();

    let mut row_offset = 0;
    for batch in &dataset.batches {
        writer.write_batch(batch, row_offset, report)?;
        row_offset += batch.num_rows();
    }
    writer.close()?;

    Ok(path)
}
