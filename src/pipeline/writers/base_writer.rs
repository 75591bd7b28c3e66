use arrow::record_batch::RecordBatch;

use crate::error::Result;
use crate::orchestrator::RunReport;

/// Trait for writing annotated record batches to an output sink (e.g. file).
pub trait BaseWriter {
    /// Write one input batch with the annotation columns appended.
    /// `row_offset` is the file-wide position of the batch's first row.
    fn write_batch(&mut self, batch: &RecordBatch, row_offset: usize, report: &RunReport)
        -> Result<()>;

    /// Finalize and close the output writer.
    fn close(self) -> Result<()>;
}
