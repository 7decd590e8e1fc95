// ProseGuard Data Models
// Shared request/response shapes for classification, explanation and ensembles

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

// ============ Classes & Labels ============

/// The two evidence classes every classifier output is mapped onto.
/// `Ai` covers machine-generated and fake-review labels, `Human` covers
/// human-written and genuine-review labels.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EvidenceClass {
    #[serde(rename = "AI", alias = "CG", alias = "Fake")]
    Ai,
    #[serde(rename = "Human", alias = "OR", alias = "Genuine")]
    Human,
}

impl EvidenceClass {
    /// Resolve a classifier label (AI/CG/Fake, Human/OR/Genuine) to its class.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ai" | "cg" | "fake" => Some(Self::Ai),
            "human" | "or" | "genuine" => Some(Self::Human),
            _ => None,
        }
    }

    pub fn opposite(self) -> Self {
        match self {
            Self::Ai => Self::Human,
            Self::Human => Self::Ai,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ai => "AI",
            Self::Human => "Human",
        }
    }
}

/// Wording family for a label: authorship (AI vs human) or review (fake vs genuine).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum LabelDomain {
    Authorship,
    Review,
}

impl LabelDomain {
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "fake" | "genuine" => Self::Review,
            _ => Self::Authorship,
        }
    }
}

// ============ Classifier Output ============

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PredictionError {
    #[error("Prediction label is empty")]
    EmptyLabel,
    #[error("Confidence {0} is outside [0, 1]")]
    ConfidenceOutOfRange(f64),
    #[error("Probability for class '{class}' is invalid: {value}")]
    InvalidProbability { class: String, value: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub label: String,
    pub confidence: f64,
    #[serde(default)]
    pub class_probabilities: BTreeMap<String, f64>,
}

impl Prediction {
    pub fn new(label: impl Into<String>, confidence: f64) -> Self {
        Self {
            label: label.into(),
            confidence,
            class_probabilities: BTreeMap::new(),
        }
    }

    pub fn with_probability(mut self, class_name: impl Into<String>, prob: f64) -> Self {
        self.class_probabilities.insert(class_name.into(), prob);
        self
    }

    /// Reject predictions the explanation pipeline cannot reason about.
    pub fn validate(&self) -> Result<(), PredictionError> {
        if self.label.trim().is_empty() {
            return Err(PredictionError::EmptyLabel);
        }
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(PredictionError::ConfidenceOutOfRange(self.confidence));
        }
        for (class, &value) in &self.class_probabilities {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(PredictionError::InvalidProbability {
                    class: class.clone(),
                    value,
                });
            }
        }
        Ok(())
    }

    /// Class the predicted label resolves to, if it is a known alias.
    pub fn predicted_class(&self) -> Option<EvidenceClass> {
        EvidenceClass::from_label(&self.label)
    }

    /// Probability for a class name, matched exactly first and then case-insensitively.
    pub fn probability_of(&self, class_name: &str) -> Option<f64> {
        self.class_probabilities.get(class_name).copied().or_else(|| {
            self.class_probabilities
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case(class_name))
                .map(|(_, v)| *v)
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    pub feature: String,
    pub weight: f64,
    pub indicates: EvidenceClass,
}

impl Attribution {
    pub fn new(feature: impl Into<String>, weight: f64, indicates: EvidenceClass) -> Self {
        Self {
            feature: feature.into(),
            weight,
            indicates,
        }
    }
}

/// A `{feature, weight}` pair as produced by perturbation explainers (LIME style).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureWeight {
    pub feature: String,
    pub weight: f64,
}

/// Raw explainer output, one variant per backend shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RawAttributions {
    /// Subword tokens with one score per token.
    Tokens { tokens: Vec<String>, scores: Vec<f64> },
    /// Whole-word or phrase features with signed weights.
    Features(Vec<FeatureWeight>),
}

/// A cleaned word and its signed attribution score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordScore {
    pub word: String,
    pub score: f64,
}

impl WordScore {
    pub fn new(word: impl Into<String>, score: f64) -> Self {
        Self {
            word: word.into(),
            score,
        }
    }
}

// ============ Evidence ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceStrength {
    Weak,
    Moderate,
    Strong,
    VeryStrong,
    Insufficient,
}

impl EvidenceStrength {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Weak => "weak",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::VeryStrong => "very_strong",
            Self::Insufficient => "insufficient",
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceDirection {
    StronglyAi,
    ModeratelyAi,
    StronglyHuman,
    ModeratelyHuman,
    Mixed,
    Unclear,
}

impl EvidenceDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StronglyAi => "strongly_ai",
            Self::ModeratelyAi => "moderately_ai",
            Self::StronglyHuman => "strongly_human",
            Self::ModeratelyHuman => "moderately_human",
            Self::Mixed => "mixed",
            Self::Unclear => "unclear",
        }
    }

    pub fn is_strong(self) -> bool {
        matches!(self, Self::StronglyAi | Self::StronglyHuman)
    }

    pub fn is_moderate(self) -> bool {
        matches!(self, Self::ModeratelyAi | Self::ModeratelyHuman)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSummary {
    pub strength: EvidenceStrength,
    pub direction: EvidenceDirection,
    pub ai_evidence_count: usize,
    pub human_evidence_count: usize,
    pub key_indicators: Vec<Attribution>,
    pub evidence_balance: f64,
}

impl EvidenceSummary {
    pub fn insufficient() -> Self {
        Self {
            strength: EvidenceStrength::Insufficient,
            direction: EvidenceDirection::Unclear,
            ai_evidence_count: 0,
            human_evidence_count: 0,
            key_indicators: Vec::new(),
            evidence_balance: 0.0,
        }
    }
}

// ============ Linguistic Profile ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct LinguisticProfile {
    pub avg_sentence_length: f64,
    pub sentence_length_stddev: f64,
    pub lexical_diversity: f64,
    pub exclamation_ratio: f64,
    pub question_ratio: f64,
    pub emotional_word_count: usize,
    pub has_contractions: bool,
    pub word_count: usize,
    pub sentence_count: usize,
}

// ============ Confidence ============

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::VeryLow => "very_low",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceAssessment {
    pub original_confidence: f64,
    pub adjusted_confidence: f64,
    pub level: ConfidenceLevel,
    pub factors: Vec<String>,
}

// ============ Explanation ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasoningStep {
    pub step: u32,
    pub description: String,
    pub finding: String,
    pub significance: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Likelihood {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlternativeExplanation {
    pub explanation: String,
    pub likelihood: Likelihood,
    pub reasoning: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    pub prediction: Prediction,
    pub confidence_level: ConfidenceLevel,
    pub evidence_summary: EvidenceSummary,
    pub linguistic_analysis: LinguisticProfile,
    pub confidence_assessment: ConfidenceAssessment,
    pub conclusion: String,
    pub reasoning_chain: Vec<ReasoningStep>,
    pub alternative_explanations: Vec<AlternativeExplanation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============ Ensemble ============

/// Result of one ensemble member for a single request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModelOutcome {
    Predicted(Prediction),
    Failed { error: String },
}

impl ModelOutcome {
    pub fn prediction(&self) -> Option<&Prediction> {
        match self {
            Self::Predicted(p) => Some(p),
            Self::Failed { .. } => None,
        }
    }
}

/// Explanation slot in an ensemble response; failures never replace the verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExplanationOutcome {
    Explained(Box<Explanation>),
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnsembleResponse {
    pub request_id: String,
    pub final_label: String,
    pub combined_score: f64,
    pub per_model_results: BTreeMap<String, ModelOutcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanations: Option<BTreeMap<String, ExplanationOutcome>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
