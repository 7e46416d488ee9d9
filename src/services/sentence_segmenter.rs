// Sentence Segmenter Service
// Splits Polish text into sentences, protecting abbreviations, initials and
// decimal numbers; falls back to line segmentation for unpunctuated verse.

use crate::services::config_store::StylometryConfig;
use crate::services::text_processor::{count_words, normalize_text, POLISH_LETTERS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::OnceLock;

/// A sentence with UTF-8 byte offsets into the normalized source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Sentence {
    pub text: String,
    pub start: usize,
    pub end: usize,
}

impl Sentence {
    pub fn word_count(&self) -> usize {
        count_words(&self.text)
    }
}

fn sentence_end_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?…]+").expect("sentence end regex"))
}

fn trailing_word_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!(r"([{}]+)$", POLISH_LETTERS)).expect("trailing word regex")
    })
}

fn is_trim_char(c: char) -> bool {
    c.is_whitespace() || matches!(c, '"' | '“' | '”' | '„' | '«' | '»')
}

/// Build a sentence from `text[start..end]`, trimming whitespace and quotes.
/// Spans without any alphanumeric character are dropped.
fn make_sentence(text: &str, start: usize, end: usize) -> Option<Sentence> {
    let slice = &text[start..end];
    let head_trimmed = slice.trim_start_matches(is_trim_char);
    let s = start + (slice.len() - head_trimmed.len());
    let trimmed = head_trimmed.trim_end_matches(is_trim_char);
    if !trimmed.chars().any(|c| c.is_alphanumeric()) {
        return None;
    }
    Some(Sentence {
        text: trimmed.to_string(),
        start: s,
        end: s + trimmed.len(),
    })
}

/// Whether the word directly before a `.` is an abbreviation or an initial.
///
/// `prefix` is the text preceding `token`, used to recognise "m.in.".
fn looks_like_abbrev(token: &str, prefix: &str, abbreviations: &HashSet<String>) -> bool {
    let t = token.to_lowercase();
    if t.is_empty() {
        return false;
    }
    if abbreviations.contains(&t) {
        return true;
    }
    // Initial: "A." / "J."
    if t.chars().count() == 1 && t.chars().all(char::is_alphabetic) {
        return true;
    }
    if t == "in" && prefix.to_lowercase().ends_with("m.") && abbreviations.contains("m.in") {
        return true;
    }
    false
}

fn is_decimal_point(text: &str, dot_at: usize) -> bool {
    let before = text[..dot_at].chars().next_back();
    let after = text[dot_at + 1..].chars().next();
    matches!((before, after), (Some(b), Some(a)) if b.is_ascii_digit() && a.is_ascii_digit())
}

fn is_protected_dot(text: &str, segment_start: usize, dot_at: usize, cfg: &StylometryConfig) -> bool {
    if is_decimal_point(text, dot_at) {
        return true;
    }
    let before = &text[segment_start..dot_at];
    match trailing_word_re().captures(before) {
        Some(caps) => {
            let token = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let prefix = &before[..before.len() - token.len()];
            looks_like_abbrev(token, prefix, &cfg.abbreviations)
        }
        None => false,
    }
}

/// Punctuation-driven segmentation of already normalized text.
fn split_on_terminators(text: &str, cfg: &StylometryConfig) -> Vec<Sentence> {
    let mut sentences = Vec::new();
    let mut start = 0usize;

    for m in sentence_end_re().find_iter(text) {
        let end = m.end();
        if text[start..end].trim().is_empty() {
            start = end;
            continue;
        }
        if m.as_str() == "." && is_protected_dot(text, start, m.start(), cfg) {
            continue;
        }
        if let Some(sentence) = make_sentence(text, start, end) {
            sentences.push(sentence);
        }
        start = end;
    }

    if start < text.len() {
        if let Some(sentence) = make_sentence(text, start, text.len()) {
            sentences.push(sentence);
        }
    }

    sentences
}

/// One sentence per line longer than `min_len` characters after trimming.
fn split_on_lines(text: &str, min_len: usize) -> Vec<Sentence> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    for line in text.split('\n') {
        let line_start = offset;
        offset += line.len() + 1;
        if line.trim().chars().count() <= min_len {
            continue;
        }
        if let Some(sentence) = make_sentence(text, line_start, line_start + line.len()) {
            out.push(sentence);
        }
    }
    out
}

/// Segment `text` into sentences. Offsets refer to `normalize_text(text)`.
///
/// When the punctuated segmentation leaves more than
/// `verse_word_sentence_ratio` words per sentence, each non-trivial line
/// becomes a sentence instead.
pub fn segment_sentences(text: &str, cfg: &StylometryConfig) -> Vec<Sentence> {
    let normalized = normalize_text(text);
    if normalized.trim().is_empty() {
        return Vec::new();
    }

    let sentences = split_on_terminators(&normalized, cfg);

    let word_count = count_words(&normalized);
    if word_count > 0
        && (sentences.len() as f64) < word_count as f64 / cfg.verse_word_sentence_ratio
    {
        let lines = split_on_lines(&normalized, cfg.min_line_len_for_verse);
        if lines.len() > sentences.len() {
            return lines;
        }
    }

    sentences
}
