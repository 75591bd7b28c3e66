use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow::array::{ArrayRef, RecordBatch, StringBuilder};
use arrow::datatypes::{DataType, Field, FieldRef, Schema, SchemaRef};
use parquet::arrow::arrow_writer::ArrowWriter;
use parquet::file::properties::WriterProperties;
use tracing::{info, warn};

use crate::error::Result;
use crate::orchestrator::RunReport;
use crate::pipeline::writers::BaseWriter;

/// Written for rows that never received a label (null text, abandoned run).
pub const PENDING_SENTIMENT: &str = "待分析";
/// Written for rows that never received segmented text.
pub const PENDING_SEGMENTATION: &str = "待分词";

/// Returns `path` with its extension replaced by `.parquet` when it has any other.
pub fn ensure_parquet_extension(path: &str) -> PathBuf {
    let path = Path::new(path);
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("parquet") => path.to_path_buf(),
        _ => path.with_extension("parquet"),
    }
}

/// Input schema without any column that will be overwritten, followed by the
/// two annotation columns. Returns the schema and the kept input indices.
fn create_schema(
    input: &Schema,
    sentiment_column: &str,
    segmented_column: &str,
) -> (SchemaRef, Vec<usize>) {
    let kept: Vec<usize> = input
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| field.name() != sentiment_column && field.name() != segmented_column)
        .map(|(idx, _)| idx)
        .collect();

    let mut fields: Vec<FieldRef> = kept.iter().map(|&idx| input.fields()[idx].clone()).collect();
    fields.push(Arc::new(Field::new(sentiment_column, DataType::Utf8, false)));
    fields.push(Arc::new(Field::new(segmented_column, DataType::Utf8, false)));

    (Arc::new(Schema::new(fields)), kept)
}

/// Writes the input record batches back out with sentiment and segmented-text
/// columns appended.
pub struct ParquetWriter {
    path: PathBuf,
    schema: SchemaRef,
    kept_columns: Vec<usize>,
    rows_written: usize,
    writer: Option<ArrowWriter<File>>,
}

impl ParquetWriter {
    pub fn new(
        path: &str,
        input_schema: &Schema,
        sentiment_column: &str,
        segmented_column: &str,
    ) -> Result<Self> {
        let output_path = ensure_parquet_extension(path);
        if output_path.as_path() != Path::new(path) {
            warn!(
                requested = path,
                actual = %output_path.display(),
                "Output path rewritten to use the .parquet extension"
            );
        }
        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let (schema, kept_columns) = create_schema(input_schema, sentiment_column, segmented_column);
        let file = File::create(&output_path)?;
        let props = WriterProperties::builder().build();
        let writer = ArrowWriter::try_new(file, schema.clone(), Some(props))?;

        Ok(ParquetWriter {
            path: output_path,
            schema,
            kept_columns,
            rows_written: 0,
            writer: Some(writer),
        })
    }

    /// Where the file is actually written.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl BaseWriter for ParquetWriter {
    fn write_batch(
        &mut self,
        batch: &RecordBatch,
        row_offset: usize,
        report: &RunReport,
    ) -> Result<()> {
        let num_rows = batch.num_rows();
        if num_rows == 0 {
            return Ok(());
        }

        let mut sentiment_builder = StringBuilder::new();
        let mut segmented_builder = StringBuilder::new();
        for row in row_offset..row_offset + num_rows {
            match report.labels.get(&row) {
                Some(outcome) => sentiment_builder.append_value(outcome.to_string()),
                None => sentiment_builder.append_value(PENDING_SENTIMENT),
            }
            match report.segments.get(&row) {
                Some(segmented) => segmented_builder.append_value(segmented),
                None => segmented_builder.append_value(PENDING_SEGMENTATION),
            }
        }

        let mut columns: Vec<ArrayRef> = self
            .kept_columns
            .iter()
            .map(|&idx| batch.column(idx).clone())
            .collect();
        columns.push(Arc::new(sentiment_builder.finish()) as ArrayRef);
        columns.push(Arc::new(segmented_builder.finish()) as ArrayRef);

        let output = RecordBatch::try_new(self.schema.clone(), columns)?;
        if let Some(writer) = self.writer.as_mut() {
            writer.write(&output)?;
        }
        self.rows_written += num_rows;

        Ok(())
    }

    fn close(mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.close()?;
        }
        info!(path = %self.path.display(), rows = self.rows_written, "Saved annotated dataset");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_is_enforced() {
        assert_eq!(ensure_parquet_extension("out.parquet"), PathBuf::from("out.parquet"));
        assert_eq!(ensure_parquet_extension("out.PARQUET"), PathBuf::from("out.PARQUET"));
        assert_eq!(ensure_parquet_extension("after/out.xlsx"), PathBuf::from("after/out.parquet"));
        assert_eq!(ensure_parquet_extension("out"), PathBuf::from("out.parquet"));
    }

    #[test]
    fn test_existing_annotation_columns_are_replaced() {
        let input = Schema::new(vec![
            Field::new("text", DataType::Utf8, true),
            Field::new("情感分析", DataType::Utf8, true),
            Field::new("likes", DataType::Int64, false),
        ]);
        let (schema, kept) = create_schema(&input, "情感分析", "分词结果");
        assert_eq!(kept, vec![0, 2]);
        let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
        assert_eq!(names, vec!["text", "likes", "情感分析", "分词结果"]);
    }
}
