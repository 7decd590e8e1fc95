// Narrative Synthesizer
// Turns evidence and linguistic statistics into confidence, conclusion and reasoning

use crate::models::{
    AlternativeExplanation, Attribution, ConfidenceAssessment, ConfidenceLevel, EvidenceClass,
    EvidenceDirection, EvidenceSummary, LabelDomain, Likelihood, LinguisticProfile, Prediction,
    ReasoningStep,
};
use crate::services::text_processor::{contains_verbatim, has_foreign_punctuation};

const STRONG_BOOST: f64 = 1.1;
const MIXED_PENALTY: f64 = 0.8;
const UNCLEAR_PENALTY: f64 = 0.6;
const MANY_INDICATORS: usize = 3;
const MAX_CONCLUSION_PHRASES: usize = 2;
const UNIFORM_MIN_SENTENCES: usize = 3;
const UNIFORM_MAX_STDDEV: f64 = 3.0;
const LOW_DIVERSITY: f64 = 0.5;
const HIGH_DIVERSITY: f64 = 0.7;
const MANY_EMOTIONAL_WORDS: usize = 3;

fn confidence_phrase(level: ConfidenceLevel) -> &'static str {
    match level {
        ConfidenceLevel::High => "high",
        ConfidenceLevel::Medium => "moderate",
        ConfidenceLevel::Low => "low",
        ConfidenceLevel::VeryLow => "very low",
    }
}

fn confidence_factors(evidence: &EvidenceSummary) -> Vec<String> {
    let mut factors = Vec::new();
    if evidence.ai_evidence_count > MANY_INDICATORS {
        factors.push("Multiple AI indicators present".to_string());
    }
    if evidence.human_evidence_count > MANY_INDICATORS {
        factors.push("Multiple human indicators present".to_string());
    }
    if evidence.direction == EvidenceDirection::Mixed {
        factors.push("Conflicting evidence reduces confidence".to_string());
    }
    if evidence.key_indicators.len() < 2 {
        factors.push("Limited distinctive features".to_string());
    }
    factors
}

/// Adjust the model confidence by how consistent the evidence is.
pub fn assess_confidence(prediction: &Prediction, evidence: &EvidenceSummary) -> ConfidenceAssessment {
    let original = if prediction.confidence.is_finite() {
        prediction.confidence
    } else {
        0.0
    };

    let (adjusted, level) = match evidence.direction {
        d if d.is_strong() => ((original * STRONG_BOOST).min(1.0), ConfidenceLevel::High),
        d if d.is_moderate() => (original, ConfidenceLevel::Medium),
        EvidenceDirection::Mixed => (original * MIXED_PENALTY, ConfidenceLevel::Low),
        _ => (original * UNCLEAR_PENALTY, ConfidenceLevel::VeryLow),
    };

    ConfidenceAssessment {
        original_confidence: original,
        adjusted_confidence: adjusted.clamp(0.0, 1.0),
        level,
        factors: confidence_factors(evidence),
    }
}

/// Pick the top two indicators worth quoting, in weight order. An indicator
/// qualifies when it appears verbatim in the text, carries no stray
/// punctuation, and is not a fragment of another qualifying indicator.
pub fn select_key_phrases<'a>(text: &str, indicators: &'a [Attribution]) -> Vec<&'a str> {
    let candidates: Vec<&str> = indicators
        .iter()
        .map(|attr| attr.feature.trim())
        .filter(|phrase| !phrase.is_empty() && !has_foreign_punctuation(phrase))
        .filter(|phrase| contains_verbatim(text, phrase))
        .collect();
    let lowered: Vec<String> = candidates.iter().map(|p| p.to_lowercase()).collect();

    candidates
        .iter()
        .zip(&lowered)
        .filter(|(_, lower)| {
            !lowered
                .iter()
                .any(|other| other.len() > lower.len() && other.contains(lower.as_str()))
        })
        .map(|(phrase, _)| *phrase)
        .take(MAX_CONCLUSION_PHRASES)
        .collect()
}

fn verdict_clause(prediction: &Prediction, phrase: &str) -> String {
    let domain = LabelDomain::from_label(&prediction.label);
    match (prediction.predicted_class(), domain) {
        (Some(EvidenceClass::Ai), LabelDomain::Review) => {
            format!("The review appears to be fake with {} confidence.", phrase)
        }
        (Some(EvidenceClass::Human), LabelDomain::Review) => {
            format!("The review appears to be genuine with {} confidence.", phrase)
        }
        (Some(EvidenceClass::Ai), LabelDomain::Authorship) => {
            format!("The text appears to be AI-generated with {} confidence.", phrase)
        }
        (Some(EvidenceClass::Human), LabelDomain::Authorship) => {
            format!("The text appears to be human-written with {} confidence.", phrase)
        }
        (None, _) => format!(
            "The text could not be attributed to a clear origin ({} confidence).",
            phrase
        ),
    }
}

fn direction_insight(direction: EvidenceDirection) -> Option<&'static str> {
    match direction {
        EvidenceDirection::StronglyAi => Some("Multiple AI-typical patterns reinforce this assessment."),
        EvidenceDirection::StronglyHuman => {
            Some("Multiple human-typical patterns reinforce this assessment.")
        }
        EvidenceDirection::Mixed => Some("The text contains both AI and human-like characteristics."),
        _ => None,
    }
}

/// Assemble the conclusion paragraph from fixed clauses.
pub fn generate_conclusion(
    text: &str,
    prediction: &Prediction,
    evidence: &EvidenceSummary,
    profile: &LinguisticProfile,
    assessment: &ConfidenceAssessment,
) -> String {
    let mut parts: Vec<String> = Vec::new();

    parts.push(verdict_clause(prediction, confidence_phrase(assessment.level)));

    let phrases = select_key_phrases(text, &evidence.key_indicators);
    if !phrases.is_empty() {
        let quoted: Vec<String> = phrases.iter().map(|p| format!("'{}'", p)).collect();
        parts.push(format!("Key indicators include: {}.", quoted.join(" and ")));
    }

    if profile.has_contractions {
        parts.push("The text shows natural human language patterns with contractions.".to_string());
    } else if profile.sentence_count >= UNIFORM_MIN_SENTENCES
        && profile.sentence_length_stddev < UNIFORM_MAX_STDDEV
    {
        parts.push("The text shows uniform sentence structure typical of AI generation.".to_string());
    }

    if profile.word_count > 0 {
        if profile.lexical_diversity < LOW_DIVERSITY {
            parts.push("Limited vocabulary variety is more AI-like.".to_string());
        } else if profile.lexical_diversity > HIGH_DIVERSITY {
            parts.push("Rich vocabulary variety is more human-like.".to_string());
        }
    }

    if profile.emotional_word_count > MANY_EMOTIONAL_WORDS {
        parts.push("The presence of emotional language is more human-like.".to_string());
    }

    match assessment.level {
        ConfidenceLevel::Low => parts.push(
            "However, the evidence is mixed and the prediction should be treated with caution."
                .to_string(),
        ),
        ConfidenceLevel::VeryLow => {
            parts.push("The evidence is insufficient for a reliable determination.".to_string())
        }
        _ => {}
    }

    if let Some(insight) = direction_insight(evidence.direction) {
        parts.push(insight.to_string());
    }

    parts.join(" ")
}

fn step(step: u32, description: &str, finding: String, significance: &str) -> ReasoningStep {
    ReasoningStep {
        step,
        description: description.to_string(),
        finding,
        significance: significance.to_string(),
    }
}

pub fn build_reasoning_chain(
    evidence: &EvidenceSummary,
    profile: &LinguisticProfile,
    assessment: &ConfidenceAssessment,
) -> Vec<ReasoningStep> {
    vec![
        step(
            1,
            "Evidence Analysis",
            format!(
                "Found {} AI indicators and {} human indicators",
                evidence.ai_evidence_count, evidence.human_evidence_count
            ),
            "Establishes the foundation for classification",
        ),
        step(
            2,
            "Pattern Recognition",
            format!(
                "Text exhibits {} characteristics",
                evidence.direction.as_str().replace('_', " ")
            ),
            "Identifies dominant writing patterns",
        ),
        step(
            3,
            "Linguistic Features",
            format!(
                "Sentence variation: {:.1}, Lexical diversity: {:.2}, Contractions: {}",
                profile.sentence_length_stddev,
                profile.lexical_diversity,
                if profile.has_contractions { "yes" } else { "no" }
            ),
            "Reveals natural vs. artificial language use",
        ),
        step(
            4,
            "Confidence Evaluation",
            format!(
                "Overall confidence level: {} (evidence strength: {}, adjusted confidence {:.2})",
                assessment.level.as_str(),
                evidence.strength.as_str(),
                assessment.adjusted_confidence
            ),
            "Determines reliability of the prediction",
        ),
    ]
}

fn alternative(explanation: &str, likelihood: Likelihood, reasoning: &str) -> AlternativeExplanation {
    AlternativeExplanation {
        explanation: explanation.to_string(),
        likelihood,
        reasoning: reasoning.to_string(),
    }
}

/// Exactly two competing readings of the same evidence.
pub fn generate_alternatives(
    prediction: &Prediction,
    evidence: &EvidenceSummary,
) -> Vec<AlternativeExplanation> {
    let review = LabelDomain::from_label(&prediction.label) == LabelDomain::Review;
    let ai_side = prediction.predicted_class() == Some(EvidenceClass::Ai);

    if ai_side {
        let first = if evidence.direction == EvidenceDirection::StronglyAi {
            Likelihood::Low
        } else {
            Likelihood::Medium
        };
        if review {
            vec![
                alternative(
                    "Genuine customer with an enthusiastic or promotional tone",
                    first,
                    "Strong opinions can resemble promotional language",
                ),
                alternative(
                    "Incentivized or edited genuine review",
                    Likelihood::Medium,
                    "Real experiences can be rewritten to sound polished",
                ),
            ]
        } else {
            vec![
                alternative(
                    "Human author using formal writing style",
                    first,
                    "Formal language can sometimes mimic AI patterns",
                ),
                alternative(
                    "AI-assisted human writing",
                    Likelihood::Medium,
                    "Combination of human creativity with AI enhancement",
                ),
            ]
        }
    } else {
        let first = if evidence.direction == EvidenceDirection::StronglyHuman {
            Likelihood::Low
        } else {
            Likelihood::Medium
        };
        if review {
            vec![
                alternative(
                    "Fake review written to imitate customer language",
                    first,
                    "Fake reviews often copy casual customer phrasing",
                ),
                alternative(
                    "Genuine customer review",
                    Likelihood::High,
                    "Natural customer expression with personal detail",
                ),
            ]
        } else {
            vec![
                alternative(
                    "AI trained on informal text",
                    first,
                    "Modern AI can mimic casual human writing",
                ),
                alternative(
                    "Human writing in casual style",
                    Likelihood::High,
                    "Natural human expression with informal language",
                ),
            ]
        }
    }
}
