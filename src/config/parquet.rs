use serde::Deserialize;

#[derive(Deserialize, Debug, Clone)]
pub struct ParquetInputConfig {
    pub path: String,        // Path to the Parquet file
    pub text_column: String, // Name of the column containing the text to annotate
    pub batch_size: Option<usize>, // Optional: Arrow batch size for reading
}
