use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Stable address of a record in the external dataset (its row position).
pub type Identifier = usize;

/// Leads the `Unrecognized` text recorded when the service returned no choice;
/// the raw response body follows it.
pub const NO_RESULT_TEXT: &str = "未找到情感分析结果";

/// Prefix put in front of `Failed` messages when rendered for the dataset.
pub const FAILED_PREFIX: &str = "错误";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub index: Identifier,
    pub text: String,
}

impl WorkItem {
    pub fn new(index: Identifier, text: impl Into<String>) -> Self {
        WorkItem {
            index,
            text: text.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    VeryPositive,
    Positive,
    Neutral,
    Negative,
    VeryNegative,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 5] = [
        SentimentLabel::VeryPositive,
        SentimentLabel::Positive,
        SentimentLabel::Neutral,
        SentimentLabel::Negative,
        SentimentLabel::VeryNegative,
    ];

    /// The label as written back to the dataset.
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::VeryPositive => "非常积极",
            SentimentLabel::Positive => "积极",
            SentimentLabel::Neutral => "中性",
            SentimentLabel::Negative => "消极",
            SentimentLabel::VeryNegative => "非常消极",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final per-item result of an annotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum LabelOrError {
    Label(SentimentLabel),
    /// The service answered but the reply matched no label. Holds the trimmed
    /// reply; empty when the response carried no usable choice.
    Unrecognized(String),
    /// Retries exhausted or a non-retryable error occurred.
    Failed(String),
}

impl LabelOrError {
    pub fn label(&self) -> Option<SentimentLabel> {
        match self {
            LabelOrError::Label(label) => Some(*label),
            _ => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, LabelOrError::Failed(_))
    }
}

impl fmt::Display for LabelOrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LabelOrError::Label(label) => f.write_str(label.as_str()),
            LabelOrError::Unrecognized(raw) => f.write_str(raw),
            LabelOrError::Failed(message) => write!(f, "{}: {}", FAILED_PREFIX, message),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationOutcome {
    pub index: Identifier,
    pub label: LabelOrError,
}

/// Snapshot of a run's progress, emitted once per completed batch.
///
/// Only the counters and the elapsed time are stored; rate and ETA are
/// derived on demand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progress {
    pub completed: usize,
    pub total: usize,
    pub batches_completed: usize,
    pub total_batches: usize,
    pub elapsed: Duration,
}

impl Progress {
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.completed as f64 / self.total as f64 * 100.0
    }

    /// Items per second since the run started.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.completed as f64 / secs
        } else {
            0.0
        }
    }

    /// Estimated time to finish the remaining items at the current rate.
    pub fn eta(&self) -> Duration {
        let rate = self.rate();
        if rate <= 0.0 {
            return Duration::ZERO;
        }
        let remaining = self.total.saturating_sub(self.completed) as f64;
        Duration::try_from_secs_f64(remaining / rate).unwrap_or(Duration::ZERO)
    }

    pub fn is_complete(&self) -> bool {
        self.completed >= self.total
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} ({:.2}%) | batch {}/{} | {:.2} items/s | elapsed {:.2}s | eta {:.2}s",
            self.completed,
            self.total,
            self.percent(),
            self.batches_completed,
            self.total_batches,
            self.rate(),
            self.elapsed.as_secs_f64(),
            self.eta().as_secs_f64()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_display_strings() {
        assert_eq!(LabelOrError::Label(SentimentLabel::VeryNegative).to_string(), "非常消极");
        assert_eq!(LabelOrError::Unrecognized("无法判断".into()).to_string(), "无法判断");
        // A blank reply stays blank.
        assert_eq!(LabelOrError::Unrecognized(String::new()).to_string(), "");
        assert_eq!(
            LabelOrError::Failed("达到最大重试次数 - boom".into()).to_string(),
            "错误: 达到最大重试次数 - boom"
        );
    }

    #[test]
    fn test_progress_rate_and_eta() {
        let progress = Progress {
            completed: 50,
            total: 150,
            batches_completed: 1,
            total_batches: 3,
            elapsed: Duration::from_secs(10),
        };
        assert!((progress.rate() - 5.0).abs() < f64::EPSILON);
        assert_eq!(progress.eta(), Duration::from_secs(20));
        assert!((progress.percent() - 33.333).abs() < 0.01);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_progress_zero_elapsed() {
        let progress = Progress {
            completed: 0,
            total: 10,
            batches_completed: 0,
            total_batches: 1,
            elapsed: Duration::ZERO,
        };
        assert_eq!(progress.rate(), 0.0);
        assert_eq!(progress.eta(), Duration::ZERO);
    }
}
