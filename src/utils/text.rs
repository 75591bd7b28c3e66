// Text utils

use icu::segmenter::WordSegmenter;
use once_cell::sync::Lazy;
use std::collections::HashSet;

/// Literal punctuation characters, ASCII and full-width CJK forms.
const PUNCTUATION_LIT: &str =
    "!/—”:％１〈&(、━\\【#%「」，】；+^]~“《„';’{|∶´[=-`*．（–？！：$～«〉,><》)?）。…@_.\"}►»·『』〔〕";

/// Ranges of control codepoints treated as punctuation (0..9, 11..13, 13..32, 127..160)
const PUNCTUATION_RANGES: &[(u32, u32)] = &[(0, 9), (11, 13), (13, 32), (127, 160)];

/// A lazily-initialized, global set of all punctuation chars
pub static PUNCTUATION: Lazy<HashSet<char>> = Lazy::new(|| {
    let mut set: HashSet<char> = PUNCTUATION_LIT.chars().collect();
    for &(start, end) in PUNCTUATION_RANGES {
        set.extend((start..end).filter_map(char::from_u32));
    }
    set
});

fn is_punctuation_only(segment: &str) -> bool {
    segment
        .chars()
        .all(|ch| PUNCTUATION.contains(&ch) || ch.is_whitespace())
}

/// Splits `text` at ICU word boundaries and returns every non-blank segment,
/// punctuation included. Chinese and Japanese text is split with the
/// dictionary model, everything else with UAX #29 rules.
pub fn split_into_tokens(text: &str) -> Vec<&str> {
    if text.is_empty() {
        return Vec::new();
    }
    // Built per call: the compiled-data segmenter is not shareable across threads.
    let segmenter = WordSegmenter::new_auto();
    let mut tokens = Vec::new();
    let mut prev_break = 0;

    for current_break in segmenter.segment_str(text) {
        if current_break > prev_break {
            let segment = text[prev_break..current_break].trim();
            if !segment.is_empty() {
                tokens.push(segment);
            }
        }
        prev_break = current_break;
    }

    if text.len() > prev_break {
        let segment = text[prev_break..].trim();
        if !segment.is_empty() {
            tokens.push(segment);
        }
    }
    tokens
}

/// Like [`split_into_tokens`], minus segments made only of punctuation.
pub fn split_into_words(text: &str) -> Vec<&str> {
    split_into_tokens(text)
        .into_iter()
        .filter(|segment| !is_punctuation_only(segment))
        .collect()
}
