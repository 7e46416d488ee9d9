// Stylometry Service
// Lexical diversity, information-theoretic and punctuation metrics for one text

use crate::models::{FeatureVector, NgramCount};
use crate::services::config_store::{NgramConfig, StylometryConfig};
use crate::services::round_to;
use crate::services::sentence_segmenter::{segment_sentences, Sentence};
use crate::services::text_processor::{normalize_text, tokenize_words, Token};
use regex::Regex;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

/// Below this many tokens MTLD is not meaningful and is reported as 0.
const MTLD_MIN_TOKENS: usize = 50;

const PUNCT_CHARS: &[(char, &str)] = &[
    (',', "comma"),
    (';', "semicolon"),
    (':', "colon"),
    ('—', "emdash"),
    ('–', "endash"),
    ('-', "hyphen"),
    ('…', "ellipsis"),
    ('.', "dot"),
    ('!', "excl"),
    ('?', "qmark"),
    ('"', "quote"),
    ('„', "quote_pl_open"),
    ('”', "quote_pl_close"),
    ('’', "apostrophe"),
    ('\'', "apostrophe_ascii"),
    ('(', "lparen"),
    (')', "rparen"),
];

fn dialogue_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*[—–-]\s+\S").expect("dialogue line regex"))
}

fn frequencies(tokens: &[Token]) -> HashMap<&str, usize> {
    let mut freq: HashMap<&str, usize> = HashMap::new();
    for t in tokens {
        *freq.entry(t.as_str()).or_insert(0) += 1;
    }
    freq
}

/// Moving-average type-token ratio over a sliding window.
///
/// Sequences not longer than the window fall back to the plain
/// distinct/total ratio. Empty input yields 0.
pub fn mattr(tokens: &[Token], window: usize) -> f64 {
    if tokens.is_empty() || window == 0 {
        return 0.0;
    }
    if tokens.len() <= window {
        return frequencies(tokens).len() as f64 / tokens.len() as f64;
    }

    let mut counts: HashMap<&str, usize> = HashMap::new();
    for t in &tokens[..window] {
        *counts.entry(t.as_str()).or_insert(0) += 1;
    }
    let mut distinct_sum = counts.len();
    let positions = tokens.len() - window + 1;

    for i in window..tokens.len() {
        let outgoing = tokens[i - window].as_str();
        if let Some(c) = counts.get_mut(outgoing) {
            *c -= 1;
            if *c == 0 {
                counts.remove(outgoing);
            }
        }
        *counts.entry(tokens[i].as_str()).or_insert(0) += 1;
        distinct_sum += counts.len();
    }

    distinct_sum as f64 / (positions * window) as f64
}

/// Share of tokens that are not function words.
pub fn lexical_density(tokens: &[Token], stopwords: &HashSet<String>) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let content = tokens.iter().filter(|t| !stopwords.contains(t.as_str())).count();
    content as f64 / tokens.len() as f64
}

/// Shannon entropy in bits and its value normalized by `log2(V)`.
pub fn shannon_entropy(tokens: &[Token]) -> (f64, f64) {
    if tokens.is_empty() {
        return (0.0, 0.0);
    }
    let freq = frequencies(tokens);
    let total = tokens.len() as f64;
    let entropy: f64 = freq
        .values()
        .map(|&c| {
            let p = c as f64 / total;
            -p * p.log2()
        })
        .sum();
    // -0.0 for a single repeated token
    let entropy = entropy.max(0.0);

    let vocab = freq.len();
    let normalized = if vocab > 1 {
        entropy / (vocab as f64).log2()
    } else {
        0.0
    };
    (entropy, normalized)
}

/// Hapax legomena over distinct words.
pub fn hapax_ratio(tokens: &[Token]) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let freq = frequencies(tokens);
    let hapax = freq.values().filter(|&&c| c == 1).count();
    hapax as f64 / freq.len() as f64
}

/// Yule's K; higher means more repetitive vocabulary.
pub fn yules_k(tokens: &[Token]) -> f64 {
    let n = tokens.len();
    if n <= 1 {
        return 0.0;
    }
    let s: usize = frequencies(tokens).values().map(|&c| c * (c - 1)).sum();
    1e4 * s as f64 / (n * (n - 1)) as f64
}

fn mtld_pass<'a>(seq: impl Iterator<Item = &'a Token>, len: usize, threshold: f64) -> f64 {
    let mut types: HashSet<&str> = HashSet::new();
    let mut token_count = 0usize;
    let mut factors = 0.0;

    for t in seq {
        token_count += 1;
        types.insert(t.as_str());
        let ttr = types.len() as f64 / token_count as f64;
        if ttr <= threshold {
            factors += 1.0;
            types.clear();
            token_count = 0;
        }
    }

    // Partial factor for the unfinished segment
    if token_count > 0 {
        let ttr = types.len() as f64 / token_count as f64;
        if ttr < 1.0 {
            factors += (1.0 - ttr) / (1.0 - threshold).max(1e-9);
        }
    }

    len as f64 / factors.max(1e-9)
}

/// Measure of Textual Lexical Diversity, mean of forward and backward passes.
pub fn mtld(tokens: &[Token], threshold: f64) -> f64 {
    if tokens.is_empty() {
        return 0.0;
    }
    let forward = mtld_pass(tokens.iter(), tokens.len(), threshold);
    let backward = mtld_pass(tokens.iter().rev(), tokens.len(), threshold);
    (forward + backward) / 2.0
}

/// Mean and population standard deviation of words per sentence.
pub fn sentence_length_stats(sentences: &[Sentence]) -> (f64, f64) {
    if sentences.is_empty() {
        return (0.0, 0.0);
    }
    let lengths: Vec<f64> = sentences.iter().map(|s| s.word_count() as f64).collect();
    let n = lengths.len() as f64;
    let mean = lengths.iter().sum::<f64>() / n;
    if lengths.len() < 2 {
        return (mean, 0.0);
    }
    let var = lengths.iter().map(|l| (l - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Most frequent contiguous n-grams, ties broken by first occurrence.
pub fn top_ngrams(tokens: &[Token], cfg: &NgramConfig) -> Vec<NgramCount> {
    let n = cfg.n;
    if n == 0 || tokens.len() < n {
        return Vec::new();
    }

    let mut index: HashMap<&[Token], usize> = HashMap::new();
    let mut counted: Vec<(&[Token], usize)> = Vec::new();
    for gram in tokens.windows(n) {
        match index.get(gram) {
            Some(&i) => counted[i].1 += 1,
            None => {
                index.insert(gram, counted.len());
                counted.push((gram, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts
    counted.sort_by(|a, b| b.1.cmp(&a.1));
    counted
        .into_iter()
        .filter(|(_, count)| *count >= cfg.min_count)
        .take(cfg.top_k)
        .map(|(gram, count)| NgramCount {
            ngram: gram.join(" "),
            count,
        })
        .collect()
}

/// Share of non-blank lines that open with a dialogue dash.
pub fn dialogue_ratio(text: &str) -> f64 {
    let normalized = normalize_text(text);
    let lines: Vec<&str> = normalized.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return 0.0;
    }
    let dialogue = lines.iter().filter(|l| dialogue_line_re().is_match(l)).count();
    dialogue as f64 / lines.len() as f64
}

/// Punctuation frequencies per 1000 characters.
///
/// Only marks that occur are reported, plus the `punct_dash_per_1kchar`
/// aggregate of all dash kinds which is always present for non-empty text.
pub fn punctuation_stats(text: &str) -> BTreeMap<String, f64> {
    let normalized = normalize_text(text);
    let mut out = BTreeMap::new();
    if normalized.is_empty() {
        return out;
    }

    let mut counts: HashMap<char, usize> = HashMap::new();
    let mut total_chars = 0usize;
    for ch in normalized.chars() {
        total_chars += 1;
        if PUNCT_CHARS.iter().any(|(p, _)| *p == ch) {
            *counts.entry(ch).or_insert(0) += 1;
        }
    }
    let per_1k = |count: usize| round_to(count as f64 / total_chars as f64 * 1000.0, 4);

    for (ch, name) in PUNCT_CHARS {
        if let Some(&count) = counts.get(ch) {
            out.insert(format!("punct_{}_per_1kchar", name), per_1k(count));
        }
    }

    let dashes: usize = ['—', '–', '-']
        .iter()
        .map(|c| counts.get(c).copied().unwrap_or(0))
        .sum();
    out.insert("punct_dash_per_1kchar".to_string(), per_1k(dashes));
    out
}

/// Assemble a feature vector from already computed tokens and sentences.
pub fn compute_features(
    text: &str,
    tokens: &[Token],
    sentences: &[Sentence],
    cfg: &StylometryConfig,
) -> FeatureVector {
    let (avg_len, std_len) = sentence_length_stats(sentences);
    let (entropy, entropy_norm) = shannon_entropy(tokens);
    let mtld_value = if tokens.len() >= MTLD_MIN_TOKENS {
        mtld(tokens, cfg.mtld_threshold)
    } else {
        0.0
    };

    FeatureVector {
        ttr: round_to(mattr(tokens, cfg.mattr_window), 4),
        avg_sentence_length: round_to(avg_len, 2),
        sentence_length_std: round_to(std_len, 4),
        lexical_density: round_to(lexical_density(tokens, &cfg.stopwords), 4),
        entropy: round_to(entropy, 4),
        entropy_norm: round_to(entropy_norm, 4),
        vocab_richness: round_to(hapax_ratio(tokens), 4),
        word_count: tokens.len(),
        sentence_count: sentences.len(),
        unique_words: frequencies(tokens).len(),
        mtld: round_to(mtld_value, 4),
        yules_k: round_to(yules_k(tokens), 4),
        dialogue_ratio: round_to(dialogue_ratio(text), 4),
        top_ngrams: top_ngrams(tokens, &cfg.ngram),
        punctuation: punctuation_stats(text),
    }
}

/// Full stylometric fingerprint of `text`. Empty input yields an all-zero vector.
pub fn analyze_stylometry(text: &str, cfg: &StylometryConfig) -> FeatureVector {
    let normalized = normalize_text(text);
    let tokens = tokenize_words(&normalized);
    let sentences = segment_sentences(&normalized, cfg);
    compute_features(&normalized, &tokens, &sentences, cfg)
}
