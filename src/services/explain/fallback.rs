// Heuristic Fallback Extraction
// Derives candidate features straight from the text when no explainer output is usable

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{EvidenceClass, WordScore};
use crate::services::text_processor::{
    is_all_caps, is_stop_word, normalize_punctuation, split_words, trim_punctuation,
};

/// Emitted when the text yields no usable word at all.
pub const SENTINEL_FEATURE: &str = "unable_to_analyze";

/// Scoring knobs for the fallback extractor. Scores are signed toward the
/// predicted class: positive supports it, negative opposes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FallbackStrategy {
    pub ai_patterns: Vec<String>,
    pub human_patterns: Vec<String>,
    pub base_weight: f64,
    pub pattern_weight: f64,
    /// Added per character, up to `max_length_bonus_chars`
    pub length_bonus: f64,
    pub max_length_bonus_chars: usize,
    /// Multiplier applied to ALL-CAPS words
    pub caps_penalty: f64,
    pub max_features: usize,
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        let to_vec = |items: &[&str]| -> Vec<String> { items.iter().map(|s| s.to_string()).collect() };
        Self {
            ai_patterns: to_vec(&[
                "furthermore", "moreover", "additionally", "comprehensive", "utilize",
                "significant", "various", "ensure", "crucial", "overall", "consequently",
                "therefore", "delve", "essential",
            ]),
            human_patterns: to_vec(&[
                "love", "hate", "amazing", "awesome", "terrible", "honestly", "lol", "omg",
                "gonna", "wanna", "kinda", "super", "totally", "awful", "wow",
            ]),
            base_weight: 0.05,
            pattern_weight: 0.3,
            length_bonus: 0.01,
            max_length_bonus_chars: 10,
            caps_penalty: 0.5,
            max_features: 10,
        }
    }
}

impl FallbackStrategy {
    fn pattern_class(&self, lower: &str) -> Option<EvidenceClass> {
        if self.ai_patterns.iter().any(|p| p == lower) {
            Some(EvidenceClass::Ai)
        } else if self.human_patterns.iter().any(|p| p == lower) {
            Some(EvidenceClass::Human)
        } else {
            None
        }
    }

    fn score_word(&self, word: &str, predicted: Option<EvidenceClass>) -> f64 {
        let lower = word.to_lowercase();
        let pattern = self.pattern_class(&lower);
        let chars = word.chars().count().min(self.max_length_bonus_chars);

        let mut magnitude = self.base_weight + self.length_bonus * chars as f64;
        if pattern.is_some() {
            magnitude += self.pattern_weight;
        }
        if is_all_caps(word) {
            magnitude *= self.caps_penalty;
        }

        let reference = predicted.unwrap_or(EvidenceClass::Ai);
        let side = pattern.unwrap_or(reference);
        if side == reference {
            magnitude
        } else {
            -magnitude
        }
    }

    /// Extract scored words in text order. Always returns at least one entry.
    pub fn extract(&self, text: &str, predicted: Option<EvidenceClass>) -> Vec<WordScore> {
        let normalized = normalize_punctuation(text);
        let mut seen: HashSet<String> = HashSet::new();
        let mut scored: Vec<(usize, WordScore)> = Vec::new();

        for raw in split_words(&normalized) {
            let word = trim_punctuation(raw);
            if word.chars().count() < 2 || is_stop_word(word) {
                continue;
            }
            if !seen.insert(word.to_lowercase()) {
                continue;
            }
            let score = self.score_word(word, predicted);
            scored.push((scored.len(), WordScore::new(word, score)));
        }

        if scored.is_empty() {
            return vec![WordScore::new(SENTINEL_FEATURE, 0.0)];
        }

        // Keep the strongest words, then restore text order
        scored.sort_by(|a, b| {
            b.1.score
                .abs()
                .partial_cmp(&a.1.score.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(self.max_features.max(1));
        scored.sort_by_key(|(idx, _)| *idx);
        scored.into_iter().map(|(_, w)| w).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_for_degenerate_input() {
        let strategy = FallbackStrategy::default();
        for text in ["", "   ", "a I !", "the and of"] {
            let words = strategy.extract(text, Some(EvidenceClass::Human));
            assert_eq!(words, vec![WordScore::new(SENTINEL_FEATURE, 0.0)]);
        }
    }

    #[test]
    fn test_patterns_signed_toward_prediction() {
        let strategy = FallbackStrategy::default();
        let words = strategy.extract("Moreover I love it", Some(EvidenceClass::Human));
        let moreover = words.iter().find(|w| w.word == "Moreover").unwrap();
        let love = words.iter().find(|w| w.word == "love").unwrap();
        assert!(moreover.score < 0.0);
        assert!(love.score > 0.0);
        assert!(love.score.abs() > 0.3);
    }

    #[test]
    fn test_caps_penalty_and_length_bonus() {
        let strategy = FallbackStrategy::default();
        let words = strategy.extract("WOW wow extraordinary", None);
        assert_eq!(words.len(), 2); // "wow" repeats case-insensitively
        let long = strategy.score_word("extraordinary", None);
        let short = strategy.score_word("cat", None);
        assert!(long > short);
        assert!(strategy.score_word("LOUD", None) < strategy.score_word("loud", None));
    }

    #[test]
    fn test_max_features_keeps_text_order() {
        let strategy = FallbackStrategy { max_features: 2, ..FallbackStrategy::default() };
        let words = strategy.extract("cat furthermore dog comprehensive", Some(EvidenceClass::Ai));
        let names: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["furthermore", "comprehensive"]);
    }
}
