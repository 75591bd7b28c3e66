// Utils

pub mod interrupt;
pub mod prometheus_metrics;
pub mod telemetry;
pub mod text;

pub use text::{split_into_tokens, split_into_words, PUNCTUATION};
