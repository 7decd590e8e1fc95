// Linguistic Pattern Analyzer
// Text-level statistics independent of any model output

use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::models::LinguisticProfile;
use crate::services::text_processor::{normalize_punctuation, split_sentences, split_words, trim_punctuation};

const EMOTIONAL_WORDS: &[&str] = &[
    "love", "hate", "amazing", "terrible", "wonderful", "awful", "fantastic", "horrible",
    "brilliant", "stupid", "crazy", "weird",
];

fn contraction_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\b[a-z]+'[a-z]+\b").expect("contraction regex"))
}

fn mean_and_stddev(values: &[usize]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<usize>() as f64 / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, variance.sqrt())
}

pub fn analyze_linguistic_patterns(text: &str) -> LinguisticProfile {
    let words = split_words(text);
    let sentence_lengths: Vec<usize> = split_sentences(text)
        .iter()
        .map(|s| split_words(s).len())
        .collect();
    let (avg_sentence_length, sentence_length_stddev) = mean_and_stddev(&sentence_lengths);

    // Curly apostrophes count as contractions too
    let has_contractions = contraction_re().is_match(&normalize_punctuation(text));

    let char_count = text.chars().count();
    let ratio = |needle: char| {
        if char_count == 0 {
            0.0
        } else {
            text.chars().filter(|&c| c == needle).count() as f64 / char_count as f64
        }
    };

    let lexical_diversity = if words.is_empty() {
        0.0
    } else {
        let unique: HashSet<String> = words.iter().map(|w| w.to_lowercase()).collect();
        unique.len() as f64 / words.len() as f64
    };

    let emotional_word_count = words
        .iter()
        .filter(|w| EMOTIONAL_WORDS.contains(&trim_punctuation(w).to_lowercase().as_str()))
        .count();

    LinguisticProfile {
        avg_sentence_length,
        sentence_length_stddev,
        lexical_diversity,
        exclamation_ratio: ratio('!'),
        question_ratio: ratio('?'),
        emotional_word_count,
        has_contractions,
        word_count: words.len(),
        sentence_count: sentence_lengths.len(),
    }
}
