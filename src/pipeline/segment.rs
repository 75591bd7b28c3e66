use crate::error::Result;
use crate::utils::text::{split_into_tokens, split_into_words};

/// A pure, synchronous per-record text transform run next to annotation.
pub trait Segmenter: Send + Sync {
    fn name(&self) -> &'static str; // For logging/error reporting

    fn segment(&self, text: &str) -> Result<String>;
}

/// ICU word segmentation, segments joined with single spaces.
#[derive(Debug, Clone)]
pub struct WordSegmenterTransform {
    keep_punctuation: bool,
}

impl WordSegmenterTransform {
    pub fn new(keep_punctuation: bool) -> Self {
        WordSegmenterTransform { keep_punctuation }
    }
}

impl Default for WordSegmenterTransform {
    fn default() -> Self {
        WordSegmenterTransform::new(true)
    }
}

impl Segmenter for WordSegmenterTransform {
    fn name(&self) -> &'static str {
        "WordSegmenterTransform"
    }

    fn segment(&self, text: &str) -> Result<String> {
        let segments = if self.keep_punctuation {
            split_into_tokens(text)
        } else {
            split_into_words(text)
        };
        Ok(segments.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_joins_with_spaces() {
        let transform = WordSegmenterTransform::default();
        assert_eq!(transform.segment("hello, world!").unwrap(), "hello , world !");

        let words_only = WordSegmenterTransform::new(false);
        assert_eq!(words_only.segment("hello, world!").unwrap(), "hello world");
    }

    #[test]
    fn test_segment_blank_text() {
        let transform = WordSegmenterTransform::default();
        assert_eq!(transform.segment("").unwrap(), "");
        assert_eq!(transform.segment("  \n ").unwrap(), "");
    }
}
