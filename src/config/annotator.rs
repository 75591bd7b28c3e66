// --- Command-Line Arguments Struct ---
use std::path::PathBuf;

use clap::Parser;

use crate::config::{load_app_config, AppConfig};
use crate::error::{PipelineError, Result};

/// Annotate a Parquet dataset with sentiment labels and segmented text.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the input Parquet file
    #[arg(short, long)]
    pub input_file: String,

    /// Path to the output Parquet file (a ".parquet" extension is enforced)
    #[arg(short, long, default_value = "annotated.parquet")]
    pub output_file: String,

    /// Optional YAML configuration file; built-in defaults are used otherwise
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API key for the completion service
    #[arg(long, env = "DEEPSEEK_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Override: column holding the text to annotate
    #[arg(long)]
    pub text_column: Option<String>,

    /// Override: number of items dispatched per batch
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Override: maximum number of requests in flight
    #[arg(long)]
    pub max_concurrent_requests: Option<usize>,

    /// Override: pause between batches, in seconds
    #[arg(long)]
    pub inter_batch_delay: Option<f64>,

    /// Override: attempts per request before giving up
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Optional: Port for the Prometheus metrics HTTP endpoint
    #[arg(long)]
    pub metrics_port: Option<u16>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    pub validate_config: bool,
}

impl Args {
    /// Loads the YAML file (if any), applies command-line overrides and validates the result.
    pub fn resolve_config(&self) -> Result<AppConfig> {
        let mut config = match &self.config {
            Some(path) => load_app_config(path)?,
            None => AppConfig::default(),
        };

        if let Some(text_column) = &self.text_column {
            config.run.text_column = text_column.clone();
        }
        if let Some(batch_size) = self.batch_size {
            config.run.batch_size = batch_size;
        }
        if let Some(delay) = self.inter_batch_delay {
            config.run.inter_batch_delay_secs = delay;
        }
        if let Some(max_concurrent) = self.max_concurrent_requests {
            config.client.max_concurrent_requests = max_concurrent;
        }
        if let Some(max_retries) = self.max_retries {
            config.client.max_retries = max_retries;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn require_api_key(&self) -> Result<&str> {
        match self.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(PipelineError::ConfigError(
                "API key missing: pass --api-key or set DEEPSEEK_API_KEY".to_string(),
            )),
        }
    }
}
