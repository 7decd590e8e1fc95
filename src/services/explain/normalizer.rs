// Feature Attribution Normalizer
// Cleans raw explainer output into ordered (word, score) pairs

use tracing::{debug, warn};

use crate::models::{EvidenceClass, RawAttributions, WordScore};
use crate::services::providers::ClassifierError;
use crate::services::text_processor::{
    is_punctuation_only, is_stop_word, match_form, normalize_punctuation, split_words,
    trim_punctuation,
};

use super::fallback::FallbackStrategy;

const SPECIAL_TOKENS: &[&str] = &[
    "<s>", "</s>", "<pad>", "<unk>", "<mask>", "[CLS]", "[SEP]", "[PAD]", "[UNK]", "[MASK]",
];
/// BPE (RoBERTa/GPT-2) and SentencePiece word-start markers
const WORD_START_MARKERS: [char; 2] = ['\u{0120}', '\u{2581}'];
/// WordPiece continuation prefix
const CONTINUATION_PREFIX: &str = "##";
const MIN_PHRASE_CHARS: usize = 2;

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedAttributions {
    pub words: Vec<WordScore>,
    /// Set when the heuristic extractor replaced the explainer output.
    pub fallback_reason: Option<String>,
}

impl NormalizedAttributions {
    pub fn used_fallback(&self) -> bool {
        self.fallback_reason.is_some()
    }
}

/// Merge subword tokens into whole words, summing their scores.
/// Special tokens are dropped and close the current word.
pub fn merge_subword_tokens(tokens: &[String], scores: &[f64]) -> Vec<WordScore> {
    let uses_start_markers = tokens.iter().any(|t| t.starts_with(WORD_START_MARKERS));
    let mut words: Vec<WordScore> = Vec::new();
    let mut current: Option<WordScore> = None;

    for (token, &score) in tokens.iter().zip(scores.iter()) {
        if SPECIAL_TOKENS.contains(&token.as_str()) {
            words.extend(current.take());
            continue;
        }

        if let Some(rest) = token.strip_prefix(CONTINUATION_PREFIX) {
            match current.as_mut() {
                Some(word) => {
                    word.word.push_str(rest);
                    word.score += score;
                }
                None => current = Some(WordScore::new(rest, score)),
            }
            continue;
        }

        if let Some(rest) = token.strip_prefix(WORD_START_MARKERS) {
            words.extend(current.take());
            if !rest.is_empty() {
                current = Some(WordScore::new(rest, score));
            }
            continue;
        }

        match current.as_mut() {
            // BPE style: unmarked pieces continue the previous word
            Some(word) if uses_start_markers => {
                word.word.push_str(token);
                word.score += score;
            }
            _ => {
                words.extend(current.take());
                current = Some(WordScore::new(token.as_str(), score));
            }
        }
    }
    words.extend(current);
    words
}

/// Clean one word or phrase; `None` when it should be discarded.
fn clean_phrase(raw: &str, source_form: &str) -> Option<String> {
    let normalized = normalize_punctuation(raw);
    let phrase = split_words(&normalized)
        .into_iter()
        .map(trim_punctuation)
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    if phrase.is_empty() || is_punctuation_only(&phrase) {
        return None;
    }
    if phrase.chars().count() < MIN_PHRASE_CHARS {
        return None;
    }
    if phrase.split(' ').all(is_stop_word) {
        return None;
    }
    // Guards against fragments produced by aggressive merging
    if !source_form.contains(&match_form(&phrase)) {
        return None;
    }
    Some(phrase)
}

/// Clean explainer output against the source text.
/// Returns an empty list when nothing survives; errors only on malformed shapes.
pub fn normalize_attributions(
    text: &str,
    raw: &RawAttributions,
) -> Result<Vec<WordScore>, ClassifierError> {
    let source_form = match_form(text);

    let candidates: Vec<WordScore> = match raw {
        RawAttributions::Tokens { tokens, scores } => {
            if tokens.len() != scores.len() {
                return Err(ClassifierError::Malformed(format!(
                    "{} tokens but {} scores",
                    tokens.len(),
                    scores.len()
                )));
            }
            merge_subword_tokens(tokens, scores)
        }
        RawAttributions::Features(features) => features
            .iter()
            .map(|f| WordScore::new(f.feature.as_str(), f.weight))
            .collect(),
    };

    let total = candidates.len();
    let cleaned: Vec<WordScore> = candidates
        .into_iter()
        .filter(|c| c.score.is_finite())
        .filter_map(|c| clean_phrase(&c.word, &source_form).map(|w| WordScore::new(w, c.score)))
        .collect();

    debug!("[NORMALIZER] kept {}/{} candidates", cleaned.len(), total);
    Ok(cleaned)
}

/// Normalize explainer output, degrading to the heuristic extractor on any
/// upstream failure or when no phrase survives cleaning. Never empty.
pub fn normalize_or_fallback(
    text: &str,
    raw: Result<RawAttributions, ClassifierError>,
    predicted: Option<EvidenceClass>,
    fallback: &FallbackStrategy,
) -> NormalizedAttributions {
    let reason = match raw.and_then(|r| normalize_attributions(text, &r)) {
        Ok(words) if !words.is_empty() => {
            return NormalizedAttributions {
                words,
                fallback_reason: None,
            }
        }
        Ok(_) => "no attribution survived filtering".to_string(),
        Err(e) => e.to_string(),
    };

    warn!("[NORMALIZER] using heuristic fallback: {}", reason);
    NormalizedAttributions {
        words: fallback.extract(text, predicted),
        fallback_reason: Some(reason),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FeatureWeight;

    fn toks(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_merge_bpe_tokens() {
        let tokens = toks(&["<s>", "I", "\u{0120}abso", "lutely", "\u{0120}love", "\u{0120}it", "!", "</s>"]);
        let scores = vec![0.0, 0.1, 0.2, 0.3, 0.5, 0.05, 0.1, 0.0];
        let words = merge_subword_tokens(&tokens, &scores);
        let names: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["I", "absolutely", "love", "it!"]);
        assert!((words[1].score - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_merge_wordpiece_tokens() {
        let tokens = toks(&["[CLS]", "un", "##believ", "##able", "story", "[SEP]"]);
        let scores = vec![0.0, 0.1, 0.1, 0.1, -0.2, 0.0];
        let words = merge_subword_tokens(&tokens, &scores);
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].word, "unbelievable");
        assert!((words[0].score - 0.3).abs() < 1e-9);
        assert_eq!(words[1].word, "story");
    }

    #[test]
    fn test_merge_sentencepiece_tokens() {
        let tokens = toks(&["\u{2581}great", "\u{2581}pro", "duct"]);
        let words = merge_subword_tokens(&tokens, &[0.4, 0.1, 0.1]);
        assert_eq!(words[1].word, "product");
    }

    #[test]
    fn test_normalize_filters_noise_and_hallucinations() {
        let text = "The product is amazing, honestly.";
        let raw = RawAttributions::Features(vec![
            FeatureWeight { feature: "amazing".into(), weight: 0.6 },
            FeatureWeight { feature: "the".into(), weight: 0.2 },
            FeatureWeight { feature: ",".into(), weight: 0.1 },
            FeatureWeight { feature: "x".into(), weight: 0.1 },
            FeatureWeight { feature: "terrible".into(), weight: -0.3 },
            FeatureWeight { feature: "honestly".into(), weight: f64::NAN },
            FeatureWeight { feature: "product".into(), weight: -0.1 },
        ]);
        let words = normalize_attributions(text, &raw).unwrap();
        let names: Vec<&str> = words.iter().map(|w| w.word.as_str()).collect();
        assert_eq!(names, vec!["amazing", "product"]);
    }

    #[test]
    fn test_normalize_repairs_mojibake() {
        let text = "It\u{2019}s wonderful";
        let raw = RawAttributions::Features(vec![FeatureWeight {
            feature: "Itâ€™s".into(),
            weight: 0.2,
        }]);
        let words = normalize_attributions(text, &raw).unwrap();
        assert_eq!(words[0].word, "It's");
    }

    #[test]
    fn test_normalize_matches_decomposed_accents() {
        let text = "The caf\u{e9} was lovely.";
        let raw = RawAttributions::Features(vec![FeatureWeight {
            feature: "cafe\u{301}".into(),
            weight: 0.3,
        }]);
        let words = normalize_attributions(text, &raw).unwrap();
        assert_eq!(words.len(), 1);
        assert_eq!(words[0].word, "caf\u{e9}");
    }

    #[test]
    fn test_mismatched_tokens_are_malformed() {
        let raw = RawAttributions::Tokens { tokens: toks(&["a", "b"]), scores: vec![0.1] };
        assert!(matches!(
            normalize_attributions("a b", &raw),
            Err(ClassifierError::Malformed(_))
        ));
    }

    #[test]
    fn test_fallback_on_upstream_error() {
        let result = normalize_or_fallback(
            "Furthermore, the results are comprehensive.",
            Err(ClassifierError::Explainer("lime crashed".into())),
            Some(EvidenceClass::Ai),
            &FallbackStrategy::default(),
        );
        assert!(result.used_fallback());
        assert!(!result.words.is_empty());
        assert!(result.fallback_reason.unwrap().contains("lime crashed"));
    }

    #[test]
    fn test_fallback_when_everything_filtered() {
        let raw = RawAttributions::Features(vec![FeatureWeight { feature: "zzz".into(), weight: 0.5 }]);
        let result = normalize_or_fallback("", Ok(raw), None, &FallbackStrategy::default());
        assert!(result.used_fallback());
        assert_eq!(result.words.len(), 1);
        assert_eq!(result.words[0].word, crate::services::explain::SENTINEL_FEATURE);
    }
}
