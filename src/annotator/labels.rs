use crate::data_model::{LabelOrError, SentimentLabel};

/// One row of the classification table: the reply must contain `pattern`
/// and, when `unless` is set, must not contain `unless`.
#[derive(Debug, Clone, Copy)]
pub struct LabelRule {
    pub pattern: &'static str,
    pub unless: Option<&'static str>,
    pub label: SentimentLabel,
}

impl LabelRule {
    pub fn matches(&self, reply: &str) -> bool {
        reply.contains(self.pattern) && self.unless.map_or(true, |word| !reply.contains(word))
    }
}

/// Evaluated top to bottom; the first matching rule wins. Intensified labels
/// come before their plain forms so "非常积极" never reads as "积极".
pub const LABEL_RULES: &[LabelRule] = &[
    LabelRule {
        pattern: "非常积极",
        unless: None,
        label: SentimentLabel::VeryPositive,
    },
    LabelRule {
        pattern: "积极",
        unless: Some("非常"),
        label: SentimentLabel::Positive,
    },
    LabelRule {
        pattern: "非常消极",
        unless: None,
        label: SentimentLabel::VeryNegative,
    },
    LabelRule {
        pattern: "消极",
        unless: Some("非常"),
        label: SentimentLabel::Negative,
    },
    LabelRule {
        pattern: "中性",
        unless: None,
        label: SentimentLabel::Neutral,
    },
];

/// Maps a completion reply onto the label set. Pure: the same reply always
/// gives the same answer.
pub fn classify(reply: &str) -> LabelOrError {
    let reply = reply.trim();
    LABEL_RULES
        .iter()
        .find(|rule| rule.matches(reply))
        .map(|rule| LabelOrError::Label(rule.label))
        .unwrap_or_else(|| LabelOrError::Unrecognized(reply.to_string()))
}
