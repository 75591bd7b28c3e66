use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;

use crate::data_model::WorkItem;
use crate::error::Result;

/// A dataset loaded into memory: the untouched record batches, ready to be
/// written back with annotation columns, plus the items extracted from them.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub schema: SchemaRef,
    pub batches: Vec<RecordBatch>,
    pub items: Vec<WorkItem>,
}

impl Dataset {
    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }
}

pub trait BaseReader {
    fn read_dataset(&self) -> Result<Dataset>;
}
