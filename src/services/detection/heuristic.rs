// Lexical Classifier
// Deterministic local classifier built on vocabulary and stylometry signals.
// Scores accumulate in logit space with soft (sigmoid) thresholds.

use async_trait::async_trait;
use std::collections::HashSet;

use crate::models::{EvidenceClass, FeatureWeight, Prediction, RawAttributions};
use crate::services::explain::{analyze_linguistic_patterns, lexical_class};
use crate::services::providers::{Classifier, ClassifierError};
use crate::services::text_processor::{normalize_punctuation, split_words, trim_punctuation};

pub const LEXICAL_CLASSIFIER_NAME: &str = "lexical";

const VOCAB_LOGIT: f64 = 0.8;
const CONTRACTION_LOGIT: f64 = -0.6;
const EMOTION_LOGIT: f64 = -0.3;
const MAX_EMOTION_WORDS: usize = 4;
const UNIFORM_LOGIT: f64 = 0.8;
const LOW_DIVERSITY_LOGIT: f64 = 0.6;
const EXCLAMATION_LOGIT: f64 = -0.5;
const MIN_PROB: f64 = 0.02;
const MAX_PROB: f64 = 0.98;
const WORD_WEIGHT: f64 = 0.4;

/// Decreasing sigmoid: close to 1 below `center`, close to 0 above it.
#[inline]
fn sigmoid(x: f64, center: f64, k: f64) -> f64 {
    1.0 / (1.0 + ((x - center) / k).exp())
}

#[inline]
fn from_logit(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

fn content_words(text: &str) -> Vec<String> {
    let normalized = normalize_punctuation(text);
    split_words(&normalized)
        .into_iter()
        .map(trim_punctuation)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// Probability that `text` is machine-generated.
pub fn score_text(text: &str) -> f64 {
    let profile = analyze_linguistic_patterns(text);
    let mut logit = 0.0;

    for word in content_words(text) {
        match lexical_class(&word) {
            Some(EvidenceClass::Ai) => logit += VOCAB_LOGIT,
            Some(EvidenceClass::Human) => logit -= VOCAB_LOGIT,
            None => {}
        }
    }

    if profile.has_contractions {
        logit += CONTRACTION_LOGIT;
    }
    logit += EMOTION_LOGIT * profile.emotional_word_count.min(MAX_EMOTION_WORDS) as f64;

    // Uniform sentence lengths only mean something with a few sentences
    if profile.sentence_count >= 3 {
        logit += sigmoid(profile.sentence_length_stddev, 3.0, 1.0) * UNIFORM_LOGIT;
    }
    if profile.word_count >= 10 {
        logit += sigmoid(profile.lexical_diversity, 0.5, 0.08) * LOW_DIVERSITY_LOGIT;
    }
    logit += (profile.exclamation_ratio * 100.0).min(1.0) * EXCLAMATION_LOGIT;

    from_logit(logit).clamp(MIN_PROB, MAX_PROB)
}

pub struct LexicalClassifier {
    name: String,
}

impl LexicalClassifier {
    pub fn new() -> Self {
        Self::with_name(LEXICAL_CLASSIFIER_NAME)
    }

    pub fn with_name(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

impl Default for LexicalClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Classifier for LexicalClassifier {
    fn name(&self) -> &str {
        &self.name
    }

    async fn classify(&self, text: &str) -> Result<Prediction, ClassifierError> {
        let p_ai = score_text(text);
        let (label, confidence) = if p_ai >= 0.5 {
            (EvidenceClass::Ai, p_ai)
        } else {
            (EvidenceClass::Human, 1.0 - p_ai)
        };
        Ok(Prediction::new(label.as_str(), confidence)
            .with_probability(EvidenceClass::Ai.as_str(), p_ai)
            .with_probability(EvidenceClass::Human.as_str(), 1.0 - p_ai))
    }

    /// Vocabulary words weighted toward the predicted class.
    async fn explain(&self, text: &str) -> Result<RawAttributions, ClassifierError> {
        let predicted = if score_text(text) >= 0.5 {
            EvidenceClass::Ai
        } else {
            EvidenceClass::Human
        };

        let mut seen = HashSet::new();
        let features: Vec<FeatureWeight> = content_words(text)
            .into_iter()
            .filter(|w| seen.insert(w.to_lowercase()))
            .filter_map(|word| {
                let class = lexical_class(&word)?;
                let weight = if class == predicted { WORD_WEIGHT } else { -WORD_WEIGHT };
                Some(FeatureWeight { feature: word, weight })
            })
            .collect();

        if features.is_empty() {
            return Err(ClassifierError::Explainer(
                "no vocabulary indicators in text".to_string(),
            ));
        }
        Ok(RawAttributions::Features(features))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sigmoid_shape() {
        assert!((sigmoid(3.0, 3.0, 1.0) - 0.5).abs() < 1e-9);
        assert!(sigmoid(0.0, 3.0, 1.0) > 0.9);
        assert!((from_logit(0.0) - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_formal_text_scores_ai() {
        let text = "Furthermore, this comprehensive framework ensures optimal outcomes. \
                    Moreover, it is crucial to leverage robust tooling. \
                    Consequently, the results are significant.";
        assert!(score_text(text) > 0.9);
    }

    #[test]
    fn test_casual_text_scores_human() {
        let text = "Honestly I love this thing, it's amazing! Can't stop using it lol";
        assert!(score_text(text) < 0.1);
    }

    #[test]
    fn test_score_bounds() {
        for text in ["", "a", "!!!!", "word word word word word word word word word word"] {
            let p = score_text(text);
            assert!((MIN_PROB..=MAX_PROB).contains(&p));
        }
    }

    #[tokio::test]
    async fn test_classify_is_consistent() {
        let classifier = LexicalClassifier::new();
        let text = "Honestly I love it, it's awesome!";
        let prediction = classifier.classify(text).await.unwrap();
        assert_eq!(prediction.label, "Human");
        assert!(prediction.validate().is_ok());
        let sum: f64 = prediction.class_probabilities.values().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_explain_signs_toward_prediction() {
        let classifier = LexicalClassifier::new();
        let raw = classifier
            .explain("Honestly I love it, moreover it is awesome!")
            .await
            .unwrap();
        let RawAttributions::Features(features) = raw else {
            panic!("expected features");
        };
        let love = features.iter().find(|f| f.feature == "love").unwrap();
        let moreover = features.iter().find(|f| f.feature == "moreover").unwrap();
        assert!(love.weight > 0.0);
        assert!(moreover.weight < 0.0);

        assert!(classifier.explain("table chair").await.is_err());
    }
}
