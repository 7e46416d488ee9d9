// Text Processing Service
// Unicode normalization and word tokenization for Polish text

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Letters of the Polish alphabet (plus plain ASCII) accepted inside a word.
pub const POLISH_LETTERS: &str = "A-Za-zĄĆĘŁŃÓŚŹŻąćęłńóśźż";

/// A normalized, lowercase word form. Order within a text is significant.
pub type Token = String;

fn word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Hyphen and apostrophes are allowed only between two letter runs,
        // so "biało-czerwony" and "rock'n'roll" stay one token.
        let pattern = format!(
            r"[{letters}]+(?:[-'’][{letters}]+)*",
            letters = POLISH_LETTERS
        );
        Regex::new(&pattern).expect("word regex")
    })
}

/// Normalize text to NFKC and unify line endings to `\n`.
pub fn normalize_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let nfkc: String = text.nfkc().collect();
    nfkc.replace("\r\n", "\n").replace('\r', "\n")
}

/// Extract lowercase word tokens from arbitrary text.
///
/// Empty and punctuation-only input yields an empty vector.
pub fn tokenize_words(text: &str) -> Vec<Token> {
    let lowered = normalize_text(text).to_lowercase();
    word_re()
        .find_iter(&lowered)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Number of word tokens in `text` without allocating the tokens.
pub fn count_words(text: &str) -> usize {
    let lowered = normalize_text(text).to_lowercase();
    word_re().find_iter(&lowered).count()
}

/// Take at most `max_chars` characters from the start of `text`.
pub fn head_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
