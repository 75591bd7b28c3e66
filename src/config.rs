// src/config.rs
use crate::error::{PipelineError, Result};
use serde::Deserialize;
use std::fmt;
use std::fs;
use std::path::Path;
use std::time::Duration;

pub mod annotator;
pub mod parquet;

pub use parquet::ParquetInputConfig;

pub const DEFAULT_API_BASE: &str = "https://api.deepseek.com";
pub const DEFAULT_MODEL: &str = "deepseek-chat";

/// Represents the overall configuration read from YAML.
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct AppConfig {
    pub client: ClientSettings,
    pub run: RunSettings,
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        self.client.validate()?;
        self.run.validate()
    }
}

/// Settings for the completion client. The API key is deliberately absent;
/// it is supplied on the command line or through the environment.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct ClientSettings {
    pub api_base: String,
    pub model: String,
    pub max_concurrent_requests: usize,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_delay_secs: f64,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        ClientSettings {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            max_concurrent_requests: 50,
            request_timeout_secs: 30,
            max_retries: 3,
            retry_delay_secs: 1.0,
            temperature: 0.1,
            max_tokens: 100,
        }
    }
}

impl ClientSettings {
    pub fn validate(&self) -> Result<()> {
        if self.api_base.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "ClientSettings: api_base must not be empty".to_string(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(PipelineError::ConfigValidationError(
                "ClientSettings: model must not be empty".to_string(),
            ));
        }
        if self.max_concurrent_requests == 0 {
            return Err(PipelineError::ConfigValidationError(
                "ClientSettings: max_concurrent_requests must be greater than 0".to_string(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(PipelineError::ConfigValidationError(
                "ClientSettings: request_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.max_retries == 0 {
            return Err(PipelineError::ConfigValidationError(
                "ClientSettings: max_retries must be greater than 0".to_string(),
            ));
        }
        if !self.retry_delay_secs.is_finite() || self.retry_delay_secs < 0.0 {
            return Err(PipelineError::ConfigValidationError(format!(
                "ClientSettings: retry_delay_secs must be a non-negative number, got {}",
                self.retry_delay_secs
            )));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(PipelineError::ConfigValidationError(format!(
                "ClientSettings: temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(PipelineError::ConfigValidationError(
                "ClientSettings: max_tokens must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Freezes these settings together with the credential into a `ClientConfig`.
    pub fn to_client_config(&self, api_key: impl Into<String>) -> ClientConfig {
        ClientConfig {
            api_key: api_key.into(),
            api_base: self.api_base.clone(),
            model: self.model.clone(),
            max_concurrent_requests: self.max_concurrent_requests,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            max_retries: self.max_retries,
            base_retry_delay: secs_to_duration(self.retry_delay_secs),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Settings for a single annotation run over a dataset.
#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct RunSettings {
    pub text_column: String,
    pub batch_size: usize,
    pub inter_batch_delay_secs: f64,
    pub sentiment_column: String,
    pub segmented_column: String,
}

impl Default for RunSettings {
    fn default() -> Self {
        RunSettings {
            text_column: "微博正文".to_string(),
            batch_size: 50,
            inter_batch_delay_secs: 0.05,
            sentiment_column: "情感分析".to_string(),
            segmented_column: "分词结果".to_string(),
        }
    }
}

impl RunSettings {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(PipelineError::ConfigValidationError(
                "RunSettings: batch_size must be greater than 0".to_string(),
            ));
        }
        if !self.inter_batch_delay_secs.is_finite() || self.inter_batch_delay_secs < 0.0 {
            return Err(PipelineError::ConfigValidationError(format!(
                "RunSettings: inter_batch_delay_secs must be a non-negative number, got {}",
                self.inter_batch_delay_secs
            )));
        }
        for (name, value) in [
            ("text_column", &self.text_column),
            ("sentiment_column", &self.sentiment_column),
            ("segmented_column", &self.segmented_column),
        ] {
            if value.trim().is_empty() {
                return Err(PipelineError::ConfigValidationError(format!(
                    "RunSettings: {} must not be empty",
                    name
                )));
            }
        }
        if self.sentiment_column == self.segmented_column {
            return Err(PipelineError::ConfigValidationError(format!(
                "RunSettings: sentiment_column and segmented_column must differ, both are '{}'",
                self.sentiment_column
            )));
        }
        Ok(())
    }

    pub fn inter_batch_delay(&self) -> Duration {
        secs_to_duration(self.inter_batch_delay_secs)
    }
}

/// Immutable configuration of one `AnnotationClient`.
#[derive(Clone)]
pub struct ClientConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub max_concurrent_requests: usize,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub base_retry_delay: Duration,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl ClientConfig {
    /// Defaults for everything but the credential.
    pub fn new(api_key: impl Into<String>) -> Self {
        ClientSettings::default().to_client_config(api_key)
    }
}

// Keep the credential out of logs.
impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("api_key", &"<redacted>")
            .field("api_base", &self.api_base)
            .field("model", &self.model)
            .field("max_concurrent_requests", &self.max_concurrent_requests)
            .field("request_timeout", &self.request_timeout)
            .field("max_retries", &self.max_retries)
            .field("base_retry_delay", &self.base_retry_delay)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::ZERO)
}

/// Loads, parses and validates the YAML configuration file.
pub fn load_app_config<P: AsRef<Path>>(config_path: P) -> Result<AppConfig> {
    let path_ref = config_path.as_ref();
    let config_content = fs::read_to_string(path_ref).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to read config file '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    let config: AppConfig = serde_yaml::from_str(&config_content).map_err(|e| {
        PipelineError::ConfigError(format!(
            "Failed to parse config YAML from '{}': {}",
            path_ref.display(),
            e
        ))
    })?;

    config.validate()?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_config_validation_error {
        ($result:expr, $expected_msg_part:expr) => {
            match $result {
                Err(PipelineError::ConfigValidationError(msg)) => {
                    assert!(
                        msg.contains($expected_msg_part),
                        "Error message '{}' did not contain '{}'",
                        msg,
                        $expected_msg_part
                    );
                }
                Err(other_err) => {
                    panic!(
                        "Expected ConfigValidationError, but got different error: {:?}",
                        other_err
                    );
                }
                Ok(_) => {
                    panic!("Expected error, but got Ok");
                }
            }
        };
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_client_settings_invalid_concurrency() {
        let settings = ClientSettings {
            max_concurrent_requests: 0,
            ..Default::default()
        };
        assert_config_validation_error!(settings.validate(), "max_concurrent_requests");
    }

    #[test]
    fn test_client_settings_invalid_retry_delay() {
        let settings = ClientSettings {
            retry_delay_secs: -1.0,
            ..Default::default()
        };
        assert_config_validation_error!(settings.validate(), "retry_delay_secs");

        let settings = ClientSettings {
            retry_delay_secs: f64::NAN,
            ..Default::default()
        };
        assert_config_validation_error!(settings.validate(), "retry_delay_secs");
    }

    #[test]
    fn test_client_settings_invalid_temperature() {
        let settings = ClientSettings {
            temperature: 3.5,
            ..Default::default()
        };
        assert_config_validation_error!(settings.validate(), "temperature");
    }

    #[test]
    fn test_run_settings_invalid_batch_size() {
        let settings = RunSettings {
            batch_size: 0,
            ..Default::default()
        };
        assert_config_validation_error!(settings.validate(), "batch_size");
    }

    #[test]
    fn test_run_settings_same_output_columns() {
        let settings = RunSettings {
            segmented_column: "情感分析".to_string(),
            ..Default::default()
        };
        assert_config_validation_error!(settings.validate(), "must differ");
    }

    #[test]
    fn test_to_client_config() {
        let settings = ClientSettings {
            retry_delay_secs: 0.5,
            request_timeout_secs: 10,
            ..Default::default()
        };
        let config = settings.to_client_config("secret");
        assert_eq!(config.base_retry_delay, Duration::from_millis(500));
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.api_key, "secret");
        assert!(!format!("{:?}", config).contains("secret"));
    }
}
