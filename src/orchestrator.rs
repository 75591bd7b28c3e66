use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesOrdered, StreamExt};
use tokio::sync::mpsc::UnboundedSender;
use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::annotator::AnnotationClient;
use crate::data_model::{AnnotationOutcome, Identifier, LabelOrError, Progress, SentimentLabel, WorkItem};
use crate::error::{PipelineError, Result};
use crate::pipeline::segment::{Segmenter, WordSegmenterTransform};
use crate::utils::prometheus_metrics::{BATCHES_COMPLETED_TOTAL, SEGMENTATION_ERRORS_TOTAL};

/// Result of `BatchOrchestrator::run`.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub labels: HashMap<Identifier, LabelOrError>,
    pub segments: HashMap<Identifier, String>,
    /// True when the run was stopped before every batch was dispatched.
    pub abandoned: bool,
    pub elapsed: Duration,
}

/// Per-category counts over a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeSummary {
    pub labelled: HashMap<SentimentLabel, usize>,
    pub unrecognized: usize,
    pub failed: usize,
}

impl OutcomeSummary {
    pub fn total(&self) -> usize {
        self.labelled.values().sum::<usize>() + self.unrecognized + self.failed
    }
}

impl RunReport {
    pub fn summary(&self) -> OutcomeSummary {
        let mut summary = OutcomeSummary::default();
        for outcome in self.labels.values() {
            match outcome {
                LabelOrError::Label(label) => *summary.labelled.entry(*label).or_insert(0) += 1,
                LabelOrError::Unrecognized(_) => summary.unrecognized += 1,
                LabelOrError::Failed(_) => summary.failed += 1,
            }
        }
        summary
    }
}

/// Splits the work list into batches and runs them one after another.
///
/// Items of a batch are dispatched together; the client's admission gate,
/// shared across batches, decides how many actually run at once. Batch N+1
/// starts only after every item of batch N has resolved.
pub struct BatchOrchestrator {
    client: AnnotationClient,
    segmenter: Arc<dyn Segmenter>,
    progress_tx: Option<UnboundedSender<Progress>>,
    cancel: CancellationToken,
}

impl BatchOrchestrator {
    pub fn new(client: AnnotationClient) -> Self {
        BatchOrchestrator {
            client,
            segmenter: Arc::new(WordSegmenterTransform::default()),
            progress_tx: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    /// Progress snapshots are sent here after each batch. A dropped receiver
    /// does not affect the run.
    pub fn with_progress(mut self, progress_tx: UnboundedSender<Progress>) -> Self {
        self.progress_tx = Some(progress_tx);
        self
    }

    /// Cancelling the token abandons the run before the next batch. A batch
    /// already in flight always drains; a pause between batches ends at once.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Annotates and segments every item.
    ///
    /// Items are expected to carry analyzable text; rows without text are
    /// dropped by the dataset reader before they get here. Unless the run is
    /// stopped, the report holds exactly one label per item.
    pub async fn run(
        &self,
        items: &[WorkItem],
        batch_size: usize,
        inter_batch_delay: Duration,
    ) -> Result<RunReport> {
        if batch_size == 0 {
            return Err(PipelineError::ConfigValidationError(
                "BatchOrchestrator: batch_size must be greater than 0".to_string(),
            ));
        }

        let started = Instant::now();
        let total = items.len();
        let total_batches = total.div_ceil(batch_size);
        let mut report = RunReport {
            labels: HashMap::with_capacity(total),
            segments: HashMap::with_capacity(total),
            ..Default::default()
        };
        info!(total, batch_size, total_batches, "Starting annotation run");

        for (batch_idx, batch) in items.chunks(batch_size).enumerate() {
            let batch_number = batch_idx + 1;
            if self.cancel.is_cancelled() {
                warn!(
                    batch = batch_number,
                    total_batches,
                    completed = report.labels.len(),
                    "Run stopped before dispatching batch"
                );
                report.abandoned = true;
                break;
            }

            debug!(batch = batch_number, size = batch.len(), "Dispatching batch");
            let outcomes = self.annotate_batch(batch).await?;

            for item in batch {
                let segmented = match self.segmenter.segment(&item.text) {
                    Ok(segmented) => segmented,
                    Err(e) => {
                        SEGMENTATION_ERRORS_TOTAL.inc();
                        warn!(index = item.index, segmenter = self.segmenter.name(), error = %e, "Segmentation failed");
                        String::new()
                    }
                };
                report.segments.insert(item.index, segmented);
            }

            for outcome in outcomes {
                report.labels.insert(outcome.index, outcome.label);
            }
            BATCHES_COMPLETED_TOTAL.inc();

            let progress = Progress {
                completed: report.labels.len(),
                total,
                batches_completed: batch_number,
                total_batches,
                elapsed: started.elapsed(),
            };
            info!(
                completed = progress.completed,
                total,
                batch = batch_number,
                total_batches,
                rate = %format!("{:.2}", progress.rate()),
                eta_secs = %format!("{:.2}", progress.eta().as_secs_f64()),
                "Batch complete"
            );
            if let Some(tx) = &self.progress_tx {
                // A closed receiver only means nobody is watching.
                let _ = tx.send(progress);
            }

            if batch_number < total_batches && !inter_batch_delay.is_zero() {
                tokio::select! {
                    _ = sleep(inter_batch_delay) => {}
                    _ = self.cancel.cancelled() => {
                        debug!(batch = batch_number, "Pause cut short by cancellation");
                    }
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            completed = report.labels.len(),
            total,
            abandoned = report.abandoned,
            elapsed_secs = %format!("{:.2}", report.elapsed.as_secs_f64()),
            "Annotation run finished"
        );
        Ok(report)
    }

    /// Dispatches every item of the batch at once and waits for all of them.
    /// Outcomes come back in input order.
    async fn annotate_batch(&self, batch: &[WorkItem]) -> Result<Vec<AnnotationOutcome>> {
        let results: Vec<Result<AnnotationOutcome>> = batch
            .iter()
            .map(|item| async move {
                self.client
                    .annotate(&item.text)
                    .await
                    .map(|label| AnnotationOutcome {
                        index: item.index,
                        label,
                    })
            })
            .collect::<FuturesOrdered<_>>()
            .collect()
            .await;

        results.into_iter().collect()
    }
}
