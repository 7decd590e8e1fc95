// Explanation Pipeline
// Runs evidence, linguistic and narrative stages into one Explanation

use tracing::{debug, warn};

use crate::models::{Attribution, Explanation, Prediction, PredictionError, RawAttributions};
use crate::services::providers::ClassifierError;

use super::evidence::summarize_evidence;
use super::linguistic::analyze_linguistic_patterns;
use super::narrative::{
    assess_confidence, build_reasoning_chain, generate_alternatives, generate_conclusion,
};
use super::ngram::aggregate_ngrams;
use super::normalizer::normalize_or_fallback;
use super::ExplanationConfig;

const FALLBACK_FACTOR: &str = "Heuristic fallback used for feature extraction";
const UNKNOWN_LABEL: &str = "Unknown";

fn synthesize(text: &str, prediction: &Prediction, attributions: &[Attribution]) -> Explanation {
    let evidence = summarize_evidence(attributions, prediction.predicted_class());
    let profile = analyze_linguistic_patterns(text);
    let assessment = assess_confidence(prediction, &evidence);
    let conclusion = generate_conclusion(text, prediction, &evidence, &profile, &assessment);
    let reasoning_chain = build_reasoning_chain(&evidence, &profile, &assessment);
    let alternative_explanations = generate_alternatives(prediction, &evidence);

    Explanation {
        prediction: prediction.clone(),
        confidence_level: assessment.level,
        evidence_summary: evidence,
        linguistic_analysis: profile,
        confidence_assessment: assessment,
        conclusion,
        reasoning_chain,
        alternative_explanations,
        error: None,
    }
}

/// Validate the prediction, then build the explanation.
pub fn try_generate_explanation(
    text: &str,
    prediction: &Prediction,
    attributions: &[Attribution],
) -> Result<Explanation, PredictionError> {
    prediction.validate()?;
    Ok(synthesize(text, prediction, attributions))
}

/// Explanation for an unusable prediction: "Unknown" label, zero confidence,
/// no attributions, and the reason recorded in `error`.
pub fn degraded_explanation(text: &str, reason: &str) -> Explanation {
    let mut explanation = synthesize(text, &Prediction::new(UNKNOWN_LABEL, 0.0), &[]);
    explanation.error = Some(reason.to_string());
    explanation
}

/// Total entry point: always returns an explanation.
pub fn generate_explanation(
    text: &str,
    prediction: &Prediction,
    attributions: &[Attribution],
) -> Explanation {
    match try_generate_explanation(text, prediction, attributions) {
        Ok(explanation) => explanation,
        Err(e) => {
            warn!("[EXPLAIN] invalid prediction, degrading: {}", e);
            degraded_explanation(text, &e.to_string())
        }
    }
}

/// Normalize raw explainer output, aggregate phrases and explain.
pub fn explain_prediction(
    text: &str,
    prediction: &Prediction,
    raw: Result<RawAttributions, ClassifierError>,
    config: &ExplanationConfig,
) -> Explanation {
    let predicted = prediction.predicted_class();
    let normalized = normalize_or_fallback(text, raw, predicted, &config.fallback);
    let attributions = aggregate_ngrams(&normalized.words, Some(text), predicted, &config.ngram);
    debug!(
        "[EXPLAIN] {} words -> {} phrases (fallback={})",
        normalized.words.len(),
        attributions.len(),
        normalized.used_fallback()
    );

    let mut explanation = generate_explanation(text, prediction, &attributions);
    if normalized.used_fallback() {
        explanation
            .confidence_assessment
            .factors
            .push(FALLBACK_FACTOR.to_string());
    }
    explanation
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ConfidenceLevel, EvidenceClass, EvidenceDirection, EvidenceStrength, FeatureWeight,
    };

    fn human_prediction() -> Prediction {
        Prediction::new("Human", 0.85)
            .with_probability("AI", 0.15)
            .with_probability("Human", 0.85)
    }

    #[test]
    fn test_human_review_example() {
        let text = "I love this product! It's amazing.";
        let attrs = vec![Attribution::new("amazing", 0.6, EvidenceClass::Human)];
        let explanation = generate_explanation(text, &human_prediction(), &attrs);

        assert_eq!(explanation.evidence_summary.direction, EvidenceDirection::StronglyHuman);
        assert_eq!(explanation.confidence_level, ConfidenceLevel::High);
        assert!(explanation.conclusion.contains("human-written"));
        assert!(explanation.conclusion.contains("'amazing'"));
        assert_eq!(explanation.reasoning_chain.len(), 4);
        assert_eq!(explanation.alternative_explanations.len(), 2);
        assert!(explanation.error.is_none());
    }

    #[test]
    fn test_empty_attributions_are_insufficient() {
        let explanation = generate_explanation("Some text here.", &human_prediction(), &[]);
        let summary = &explanation.evidence_summary;
        assert_eq!(summary.strength, EvidenceStrength::Insufficient);
        assert_eq!(summary.direction, EvidenceDirection::Unclear);
        assert_eq!(summary.ai_evidence_count, 0);
        assert_eq!(summary.human_evidence_count, 0);
        assert!(summary.key_indicators.is_empty());
        assert_eq!(explanation.confidence_level, ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_invalid_prediction_degrades() {
        let bad = Prediction::new("AI", 1.7);
        assert!(try_generate_explanation("text", &bad, &[]).is_err());

        let explanation = generate_explanation("text", &bad, &[]);
        assert_eq!(explanation.prediction.label, "Unknown");
        assert_eq!(explanation.prediction.confidence, 0.0);
        assert!(explanation.error.as_deref().unwrap_or("").contains("1.7"));
        assert_eq!(explanation.confidence_level, ConfidenceLevel::VeryLow);
    }

    #[test]
    fn test_explanation_is_idempotent() {
        let text = "Moreover, the framework is robust. Honestly I love it!";
        let attrs = vec![
            Attribution::new("robust", 0.4, EvidenceClass::Ai),
            Attribution::new("love", -0.3, EvidenceClass::Human),
            Attribution::new("Moreover", 0.2, EvidenceClass::Ai),
        ];
        let prediction = Prediction::new("AI", 0.66).with_probability("AI", 0.66);
        let first = serde_json::to_string(&generate_explanation(text, &prediction, &attrs)).unwrap();
        let second = serde_json::to_string(&generate_explanation(text, &prediction, &attrs)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_explain_prediction_from_features() {
        let text = "I absolutely love this product, it's amazing!";
        let raw = RawAttributions::Features(vec![
            FeatureWeight { feature: "absolutely".into(), weight: 0.5 },
            FeatureWeight { feature: "love".into(), weight: 0.4 },
            FeatureWeight { feature: "amazing".into(), weight: 0.6 },
        ]);
        let explanation =
            explain_prediction(text, &human_prediction(), Ok(raw), &ExplanationConfig::default());
        assert_eq!(explanation.evidence_summary.direction, EvidenceDirection::StronglyHuman);
        assert!(!explanation
            .confidence_assessment
            .factors
            .contains(&FALLBACK_FACTOR.to_string()));
    }

    #[test]
    fn test_explain_prediction_with_failed_explainer() {
        let text = "Furthermore, this comprehensive approach ensures optimal results.";
        let prediction = Prediction::new("AI", 0.9);
        let explanation = explain_prediction(
            text,
            &prediction,
            Err(ClassifierError::Explainer("timeout".into())),
            &ExplanationConfig::default(),
        );
        assert!(explanation
            .confidence_assessment
            .factors
            .contains(&FALLBACK_FACTOR.to_string()));
        assert_eq!(explanation.evidence_summary.direction, EvidenceDirection::StronglyAi);
        assert!(explanation.conclusion.contains("AI-generated"));
    }
}
