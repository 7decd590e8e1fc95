// N-gram Aggregator
// Merges word-level scores into ranked, deduplicated phrases

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::models::{Attribution, EvidenceClass, WordScore};
use crate::services::text_processor::{is_generic_word, is_stop_word, match_form};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NgramConfig {
    pub max_n: usize,
    pub top_k: usize,
    /// Divide an n-gram's summed score by n before boosting
    pub length_normalize: bool,
    /// Multiplier (> 1) for phrases of two or more words
    pub multiword_boost: f64,
    /// Multiplier (< 1) for phrases containing generic filler words
    pub generic_damping: f64,
}

impl Default for NgramConfig {
    fn default() -> Self {
        Self {
            max_n: 3,
            top_k: 10,
            length_normalize: true,
            multiword_boost: 1.2,
            generic_damping: 0.7,
        }
    }
}

/// Class a signed weight points at. Positive weights support the predicted
/// class (AI when nothing was predicted), negative weights the other one.
pub fn class_for_weight(weight: f64, predicted: Option<EvidenceClass>) -> EvidenceClass {
    let reference = predicted.unwrap_or(EvidenceClass::Ai);
    if weight >= 0.0 {
        reference
    } else {
        reference.opposite()
    }
}

#[derive(Debug, Clone)]
struct Candidate {
    phrase: String,
    score: f64,
    n: usize,
    start: usize,
    core: String,
}

/// Lowercased content words with stop/generic words removed.
fn phrase_core(words: &[WordScore]) -> (String, bool) {
    let mut has_generic = false;
    let mut core: Vec<String> = Vec::new();
    for token in words.iter().flat_map(|w| w.word.split_whitespace()) {
        if is_generic_word(token) {
            has_generic = true;
            continue;
        }
        if is_stop_word(token) {
            continue;
        }
        core.push(token.to_lowercase());
    }
    (core.join(" "), has_generic)
}

fn build_candidates(
    words: &[WordScore],
    source_form: Option<&str>,
    config: &NgramConfig,
) -> Vec<Candidate> {
    let max_n = config.max_n.max(1);
    let mut candidates = Vec::new();

    for n in 1..=max_n.min(words.len()) {
        for start in 0..=(words.len() - n) {
            let window = &words[start..start + n];
            let phrase = window
                .iter()
                .map(|w| w.word.as_str())
                .collect::<Vec<_>>()
                .join(" ");

            // Multi-word phrases must be contiguous in the source text
            if n > 1 {
                if let Some(form) = source_form {
                    if !form.contains(&match_form(&phrase)) {
                        continue;
                    }
                }
            }

            let sum: f64 = window.iter().map(|w| w.score).sum();
            if !sum.is_finite() {
                continue;
            }

            let (core, has_generic) = phrase_core(window);
            if core.is_empty() {
                continue;
            }

            let mut score = sum;
            if config.length_normalize {
                score /= n as f64;
            }
            if n > 1 {
                score *= config.multiword_boost;
            }
            if has_generic {
                score *= config.generic_damping;
            }

            candidates.push(Candidate {
                phrase,
                score,
                n,
                start,
                core,
            });
        }
    }
    candidates
}

/// Score 1..=max_n word phrases, keep one phrase per core and return the
/// top-K as attributions. Never empty when `words` is non-empty.
pub fn aggregate_ngrams(
    words: &[WordScore],
    source_text: Option<&str>,
    predicted: Option<EvidenceClass>,
    config: &NgramConfig,
) -> Vec<Attribution> {
    if words.is_empty() {
        return Vec::new();
    }

    let source_form = source_text.map(match_form);
    let mut candidates = build_candidates(words, source_form.as_deref(), config);

    candidates.sort_by(|a, b| {
        b.score
            .abs()
            .partial_cmp(&a.score.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(b.n.cmp(&a.n))
            .then(a.start.cmp(&b.start))
    });

    let mut seen_cores: HashSet<String> = HashSet::new();
    let selected: Vec<Attribution> = candidates
        .into_iter()
        .filter(|c| seen_cores.insert(c.core.clone()))
        .take(config.top_k.max(1))
        .map(|c| Attribution::new(c.phrase, c.score, class_for_weight(c.score, predicted)))
        .collect();

    if !selected.is_empty() {
        return selected;
    }

    // Nothing survived: fall back to the strongest raw word
    let strongest = words
        .iter()
        .filter(|w| w.score.is_finite())
        .max_by(|a, b| {
            a.score
                .abs()
                .partial_cmp(&b.score.abs())
                .unwrap_or(std::cmp::Ordering::Equal)
        })
        .unwrap_or(&words[0]);
    let score = if strongest.score.is_finite() { strongest.score } else { 0.0 };
    vec![Attribution::new(
        strongest.word.clone(),
        score,
        class_for_weight(score, predicted),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws(items: &[(&str, f64)]) -> Vec<WordScore> {
        items.iter().map(|(w, s)| WordScore::new(*w, *s)).collect()
    }

    #[test]
    fn test_class_for_weight_follows_prediction() {
        assert_eq!(class_for_weight(0.3, Some(EvidenceClass::Ai)), EvidenceClass::Ai);
        assert_eq!(class_for_weight(-0.3, Some(EvidenceClass::Ai)), EvidenceClass::Human);
        assert_eq!(class_for_weight(0.3, Some(EvidenceClass::Human)), EvidenceClass::Human);
        assert_eq!(class_for_weight(-0.3, Some(EvidenceClass::Human)), EvidenceClass::Ai);
        assert_eq!(class_for_weight(0.0, None), EvidenceClass::Ai);
    }

    #[test]
    fn test_multiword_phrase_outranks_parts() {
        let text = "absolutely amazing experience";
        let words = ws(&[("absolutely", 0.5), ("amazing", 0.6), ("experience", 0.1)]);
        let attrs = aggregate_ngrams(&words, Some(text), None, &NgramConfig::default());
        assert_eq!(attrs[0].feature, "absolutely amazing");
        assert!((attrs[0].weight - 0.66).abs() < 1e-9);
    }

    #[test]
    fn test_non_contiguous_phrases_rejected() {
        // "love product" is adjacent in the cleaned list but not in the text
        let text = "I love this product";
        let words = ws(&[("love", 0.5), ("product", 0.4)]);
        let attrs = aggregate_ngrams(&words, Some(text), None, &NgramConfig::default());
        assert!(attrs.iter().all(|a| a.feature != "love product"));
        assert_eq!(attrs.len(), 2);
    }

    #[test]
    fn test_generic_words_damped_and_cores_deduplicated() {
        let text = "really great";
        let words = ws(&[("really", 0.1), ("great", 0.8)]);
        let attrs = aggregate_ngrams(&words, Some(text), None, &NgramConfig::default());
        // "really great" shares the core "great" and scores lower, "really" has no core
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].feature, "great");
    }

    #[test]
    fn test_top_k_truncation_and_order() {
        let words = ws(&[("alpha", 0.1), ("beta", -0.9), ("gamma", 0.5), ("delta", 0.3)]);
        let config = NgramConfig { max_n: 1, top_k: 2, ..NgramConfig::default() };
        let attrs = aggregate_ngrams(&words, None, Some(EvidenceClass::Human), &config);
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].feature, "beta");
        assert_eq!(attrs[0].indicates, EvidenceClass::Ai);
        assert_eq!(attrs[1].feature, "gamma");
        assert_eq!(attrs[1].indicates, EvidenceClass::Human);
    }

    #[test]
    fn test_never_empty_for_non_empty_input() {
        let words = ws(&[("really", 0.2), ("just", -0.7)]);
        let attrs = aggregate_ngrams(&words, Some("really just"), None, &NgramConfig::default());
        assert_eq!(attrs.len(), 1);
        assert_eq!(attrs[0].feature, "just");
        assert_eq!(attrs[0].indicates, EvidenceClass::Human);
        assert!(aggregate_ngrams(&[], None, None, &NgramConfig::default()).is_empty());
    }

    #[test]
    fn test_phrases_are_contiguous_runs_of_input() {
        let words = ws(&[("quick", 0.2), ("brown", 0.3), ("fox", 0.4), ("jumps", -0.1)]);
        let joined = "quick brown fox jumps";
        let attrs = aggregate_ngrams(&words, None, None, &NgramConfig::default());
        assert!(!attrs.is_empty());
        for attr in attrs {
            assert!(joined.contains(&attr.feature), "{}", attr.feature);
        }
    }
}
