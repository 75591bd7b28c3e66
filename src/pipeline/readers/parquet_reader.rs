// src/pipeline/readers/parquet_reader.rs

use crate::config::ParquetInputConfig;
use crate::data_model::WorkItem;
use crate::error::{PipelineError, Result};
use crate::pipeline::readers::{BaseReader, Dataset};

use arrow::array::{Array, StringArray};
use arrow::compute::cast;
use arrow::datatypes::DataType;
use arrow::record_batch::RecordBatchReader;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use std::fs::File;
use tracing::{debug, info};

/// Loads a whole Parquet file and extracts one `WorkItem` per row with text.
#[derive(Debug)]
pub struct ParquetReader {
    config: ParquetInputConfig,
}

impl ParquetReader {
    pub fn new(config: ParquetInputConfig) -> Self {
        ParquetReader { config }
    }
}

impl BaseReader for ParquetReader {
    /// Item identifiers are zero-based row positions across the whole file.
    /// Non-string text columns are cast to strings; null text rows are left
    /// out of the items but stay in the batches.
    fn read_dataset(&self) -> Result<Dataset> {
        let file = File::open(&self.config.path).map_err(|e| {
            PipelineError::ConfigError(format!(
                "Failed to open input file '{}': {}",
                self.config.path, e
            ))
        })?;
        let builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
        let builder = if let Some(batch_size) = self.config.batch_size {
            builder.with_batch_size(batch_size)
        } else {
            builder
        };
        let record_batch_reader = builder.build()?;
        let schema = record_batch_reader.schema();

        let text_col_idx = schema.index_of(&self.config.text_column).map_err(|_| {
            PipelineError::ConfigError(format!(
                "Text column '{}' not found in Parquet schema of '{}'.",
                self.config.text_column, self.config.path
            ))
        })?;
        let source_type = schema.field(text_col_idx).data_type().clone();
        if source_type != DataType::Utf8 {
            debug!(column = %self.config.text_column, ?source_type, "Casting text column to Utf8");
        }

        let mut batches = Vec::new();
        let mut items = Vec::new();
        let mut row_offset = 0usize;
        let mut null_rows = 0usize;

        for batch_result in record_batch_reader {
            let batch = batch_result?;
            let texts = cast(batch.column(text_col_idx), &DataType::Utf8)?;
            let texts = texts
                .as_any()
                .downcast_ref::<StringArray>()
                .ok_or_else(|| {
                    PipelineError::Unexpected(format!(
                        "Column '{}' did not cast to a Utf8 StringArray",
                        self.config.text_column
                    ))
                })?;

            for i in 0..batch.num_rows() {
                if texts.is_null(i) {
                    null_rows += 1;
                    continue;
                }
                items.push(WorkItem::new(row_offset + i, texts.value(i)));
            }
            row_offset += batch.num_rows();
            batches.push(batch);
        }

        info!(
            path = %self.config.path,
            rows = row_offset,
            items = items.len(),
            null_rows,
            "Loaded input dataset"
        );

        Ok(Dataset {
            schema,
            batches,
            items,
        })
    }
}
