//! Token estimation without an external tokenizer.
//!
//! CJK ideographs are counted one by one at 1.5 tokens each. Everything
//! else is split on whitespace into words (punctuation stays attached) at
//! 1.3 tokens each. The estimate is the ceiling of the weighted sum.
//!
//! Weights are applied in integer tenths so the ceiling is exact and the
//! estimate is additive across lines: `estimate("a\nb")` equals the
//! weighted sum of both lines before rounding.

/// CJK weight in tenths of a token.
const CJK_WEIGHT_TENTHS: usize = 15;

/// Word weight in tenths of a token.
const WORD_WEIGHT_TENTHS: usize = 13;

/// Returns true for the common Han ideograph ranges.
pub fn is_cjk(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{F900}'..='\u{FAFF}')
}

/// Weighted token count in tenths, before rounding.
pub fn weighted_tenths(text: &str) -> usize {
    let mut cjk = 0usize;
    let mut words = 0usize;
    let mut in_word = false;

    for c in text.chars() {
        if is_cjk(c) {
            cjk += 1;
            in_word = false;
        } else if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            words += 1;
            in_word = true;
        }
    }

    cjk * CJK_WEIGHT_TENTHS + words * WORD_WEIGHT_TENTHS
}

/// Estimate the model-token cost of a string.
///
/// Empty and whitespace-only input yields 0.
pub fn estimate_tokens(text: &str) -> usize {
    weighted_tenths(text).div_ceil(10)
}
