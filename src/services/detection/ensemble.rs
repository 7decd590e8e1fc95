// Ensemble Combiner
// Runs the configured classifiers and fuses their target-class probabilities:
// - Weighted combination (default roberta 0.4 + ai_detector 0.3 + fake_review 0.3)
// - Failed members drop out; remaining weights are rescaled to the configured total
// - Optional explanation of the primary member, which never changes the verdict

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{
    EnsembleResponse, EvidenceClass, ExplanationOutcome, ModelOutcome, Prediction,
};
use crate::services::explain::{explain_prediction, ExplanationConfig};
use crate::services::providers::Classifier;

use super::policy::{decide_label, DecisionPolicy, VerdictLabels};

const UNKNOWN_LABEL: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnsembleMember {
    pub name: String,
    /// Class whose probability this member contributes
    pub target_label: String,
    pub weight: f64,
}

impl EnsembleMember {
    pub fn new(name: &str, target_label: &str, weight: f64) -> Self {
        Self {
            name: name.to_string(),
            target_label: target_label.to_string(),
            weight,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EnsembleConfig {
    pub members: Vec<EnsembleMember>,
    pub policy: DecisionPolicy,
    /// Member explained when explanations are requested
    pub primary: String,
    pub labels: VerdictLabels,
}

impl Default for EnsembleConfig {
    fn default() -> Self {
        Self {
            members: vec![
                EnsembleMember::new("roberta", "AI", 0.4),
                EnsembleMember::new("ai_detector", "AI", 0.3),
                EnsembleMember::new("fake_review", "Fake", 0.3),
            ],
            policy: DecisionPolicy::default(),
            primary: "roberta".to_string(),
            labels: VerdictLabels::default(),
        }
    }
}

impl EnsembleConfig {
    /// Single-member ensemble, used when only one classifier is available.
    pub fn single(name: &str, target_label: &str) -> Self {
        Self {
            members: vec![EnsembleMember::new(name, target_label, 1.0)],
            primary: name.to_string(),
            ..Self::default()
        }
    }

    pub fn total_weight(&self) -> f64 {
        self.members.iter().map(|m| m.weight).sum()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.members.is_empty() {
            return Err("ensemble has no members".to_string());
        }

        let mut names = HashSet::new();
        for member in &self.members {
            if member.name.trim().is_empty() {
                return Err("ensemble member with empty name".to_string());
            }
            if !names.insert(member.name.as_str()) {
                return Err(format!("duplicate ensemble member '{}'", member.name));
            }
            if !member.weight.is_finite() || member.weight < 0.0 {
                return Err(format!(
                    "member '{}' has invalid weight {}",
                    member.name, member.weight
                ));
            }
        }

        if self.total_weight() <= 0.0 {
            return Err("ensemble weights sum to zero".to_string());
        }

        if !names.contains(self.primary.as_str()) {
            return Err(format!("primary '{}' is not an ensemble member", self.primary));
        }

        match self.policy {
            DecisionPolicy::DualThreshold { flag, review } => {
                if !flag.is_finite() || !review.is_finite() {
                    return Err("dual thresholds must be finite".to_string());
                }
                if review > flag {
                    return Err(format!(
                        "review threshold {} exceeds flag threshold {}",
                        review, flag
                    ));
                }
            }
            DecisionPolicy::SingleThreshold { threshold } if !threshold.is_finite() => {
                return Err("threshold must be finite".to_string());
            }
            _ => {}
        }

        Ok(())
    }
}

/// Probability a prediction assigns to `target_label`: exact or
/// case-insensitive key, then any key of the same class (AI/CG/Fake),
/// then the predicted label's own confidence for binary outputs.
pub fn target_probability(prediction: &Prediction, target_label: &str) -> Option<f64> {
    if let Some(p) = prediction.probability_of(target_label) {
        return Some(p);
    }

    let target_class = EvidenceClass::from_label(target_label)?;
    let by_alias = prediction
        .class_probabilities
        .iter()
        .find(|(k, _)| EvidenceClass::from_label(k) == Some(target_class))
        .map(|(_, v)| *v);
    if by_alias.is_some() {
        return by_alias;
    }

    match prediction.predicted_class() {
        Some(class) if class == target_class => Some(prediction.confidence),
        Some(_) => Some(1.0 - prediction.confidence),
        None => None,
    }
}

/// Weighted sum of `(weight, probability)` pairs. Missing probabilities drop
/// out and the remaining weights are rescaled to the full total.
pub fn combine_scores(contributions: &[(f64, Option<f64>)]) -> Option<f64> {
    let total: f64 = contributions.iter().map(|(w, _)| *w).sum();
    let available: f64 = contributions
        .iter()
        .filter(|(_, p)| p.is_some())
        .map(|(w, _)| *w)
        .sum();

    if contributions.iter().all(|(_, p)| p.is_none()) {
        return None;
    }
    if available <= 0.0 {
        return Some(0.0);
    }

    let weighted: f64 = contributions
        .iter()
        .filter_map(|(w, p)| p.map(|p| w * p))
        .sum();
    Some((weighted * total / available).clamp(0.0, 1.0))
}

pub struct Ensemble {
    config: EnsembleConfig,
    explanation: ExplanationConfig,
    classifiers: HashMap<String, Arc<dyn Classifier>>,
}

impl Ensemble {
    pub fn new(config: EnsembleConfig, explanation: ExplanationConfig) -> Result<Self, String> {
        config.validate()?;
        Ok(Self {
            config,
            explanation,
            classifiers: HashMap::new(),
        })
    }

    /// Register a classifier under its own name.
    pub fn with_classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        let name = classifier.name().to_string();
        self.register(&name, classifier);
        self
    }

    pub fn register(&mut self, member: &str, classifier: Arc<dyn Classifier>) {
        if !self.config.members.iter().any(|m| m.name == member) {
            warn!("[ENSEMBLE] classifier '{}' is not a configured member", member);
        }
        self.classifiers.insert(member.to_string(), classifier);
    }

    pub fn config(&self) -> &EnsembleConfig {
        &self.config
    }

    async fn run_member(
        &self,
        name: &str,
        target_label: &str,
        text: &str,
    ) -> Result<(Prediction, f64), String> {
        let classifier = self
            .classifiers
            .get(name)
            .ok_or_else(|| format!("no classifier registered for '{}'", name))?;

        classifier.ensure_loaded().await.map_err(|e| e.to_string())?;
        let prediction = classifier.classify(text).await.map_err(|e| e.to_string())?;
        prediction.validate().map_err(|e| e.to_string())?;

        let prob = target_probability(&prediction, target_label)
            .ok_or_else(|| format!("no probability for target label '{}'", target_label))?;
        Ok((prediction, prob))
    }

    async fn explain_primary(
        &self,
        text: &str,
        per_model: &BTreeMap<String, ModelOutcome>,
    ) -> ExplanationOutcome {
        let primary = self.config.primary.as_str();
        let prediction = match per_model.get(primary).and_then(ModelOutcome::prediction) {
            Some(p) => p,
            None => {
                return ExplanationOutcome::Failed {
                    error: format!("primary member '{}' produced no prediction", primary),
                }
            }
        };
        let classifier = match self.classifiers.get(primary) {
            Some(c) => c,
            None => {
                return ExplanationOutcome::Failed {
                    error: format!("no classifier registered for '{}'", primary),
                }
            }
        };

        let raw = classifier.explain(text).await;
        if let Err(e) = &raw {
            warn!("[ENSEMBLE] explainer for '{}' failed: {}", primary, e);
        }
        let explanation = explain_prediction(text, prediction, raw, &self.explanation);
        ExplanationOutcome::Explained(Box::new(explanation))
    }

    /// Classify `text` with every member and fuse the results.
    pub async fn ensemble_predict(&self, text: &str, include_explanations: bool) -> EnsembleResponse {
        let request_id = Uuid::new_v4().to_string();
        info!(
            "[ENSEMBLE] request {} members={} policy={} chars={}",
            request_id,
            self.config.members.len(),
            self.config.policy.name(),
            text.chars().count()
        );

        let mut per_model: BTreeMap<String, ModelOutcome> = BTreeMap::new();
        let mut contributions: Vec<(f64, Option<f64>)> = Vec::new();

        for member in &self.config.members {
            match self.run_member(&member.name, &member.target_label, text).await {
                Ok((prediction, prob)) => {
                    debug!(
                        "[ENSEMBLE] {} label={} p({})={:.3}",
                        member.name, prediction.label, member.target_label, prob
                    );
                    contributions.push((member.weight, Some(prob)));
                    per_model.insert(member.name.clone(), ModelOutcome::Predicted(prediction));
                }
                Err(error) => {
                    warn!("[ENSEMBLE] member '{}' failed: {}", member.name, error);
                    contributions.push((member.weight, None));
                    per_model.insert(member.name.clone(), ModelOutcome::Failed { error });
                }
            }
        }

        let (final_label, combined_score, error) = match combine_scores(&contributions) {
            Some(score) => {
                let predictions: Vec<&Prediction> =
                    per_model.values().filter_map(ModelOutcome::prediction).collect();
                let label = decide_label(&self.config.policy, score, &predictions, &self.config.labels);
                (label, score, None)
            }
            None => (
                UNKNOWN_LABEL.to_string(),
                0.0,
                Some("all ensemble members failed".to_string()),
            ),
        };

        let explanations = if include_explanations {
            let outcome = self.explain_primary(text, &per_model).await;
            let mut map = BTreeMap::new();
            map.insert(self.config.primary.clone(), outcome);
            Some(map)
        } else {
            None
        };

        info!(
            "[ENSEMBLE] request {} -> {} (score {:.3})",
            request_id, final_label, combined_score
        );

        EnsembleResponse {
            request_id,
            final_label,
            combined_score,
            per_model_results: per_model,
            explanations,
            error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FeatureWeight, RawAttributions};
    use crate::services::providers::ClassifierError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct StubClassifier {
        name: String,
        prediction: Option<Prediction>,
        attributions: Option<RawAttributions>,
        loads: AtomicUsize,
    }

    impl StubClassifier {
        fn new(name: &str, prediction: Option<Prediction>) -> Self {
            Self {
                name: name.to_string(),
                prediction,
                attributions: None,
                loads: AtomicUsize::new(0),
            }
        }

        fn scoring(name: &str, label: &str, target: &str, p: f64) -> Arc<dyn Classifier> {
            let prediction = Prediction::new(label, p.max(1.0 - p)).with_probability(target, p);
            Arc::new(Self::new(name, Some(prediction)))
        }
    }

    #[async_trait]
    impl Classifier for StubClassifier {
        fn name(&self) -> &str {
            &self.name
        }

        async fn ensure_loaded(&self) -> Result<(), ClassifierError> {
            self.loads.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn classify(&self, _text: &str) -> Result<Prediction, ClassifierError> {
            self.prediction
                .clone()
                .ok_or_else(|| ClassifierError::Api { status: 503, message: "down".to_string() })
        }

        async fn explain(&self, _text: &str) -> Result<RawAttributions, ClassifierError> {
            self.attributions
                .clone()
                .ok_or_else(|| ClassifierError::ExplainUnsupported(self.name.clone()))
        }
    }

    fn default_ensemble(members: Vec<Arc<dyn Classifier>>) -> Ensemble {
        members.into_iter().fold(
            Ensemble::new(EnsembleConfig::default(), ExplanationConfig::default()).unwrap(),
            |ensemble, c| ensemble.with_classifier(c),
        )
    }

    #[test]
    fn test_combine_scores_weighted_sum() {
        let score = combine_scores(&[(0.4, Some(0.7)), (0.3, Some(0.5)), (0.3, Some(0.8))]).unwrap();
        assert!((score - 0.67).abs() < 1e-9);
    }

    #[test]
    fn test_combine_scores_rescales_missing() {
        let score = combine_scores(&[(0.4, Some(0.7)), (0.3, None), (0.3, Some(0.8))]).unwrap();
        assert!((score - (0.28 + 0.24) / 0.7).abs() < 1e-9);
        assert_eq!(combine_scores(&[(0.5, None), (0.5, None)]), None);
        assert_eq!(combine_scores(&[(0.0, Some(0.9)), (1.0, None)]), Some(0.0));
    }

    #[test]
    fn test_target_probability_lookup() {
        let p = Prediction::new("CG", 0.8).with_probability("CG", 0.8).with_probability("OR", 0.2);
        assert_eq!(target_probability(&p, "AI"), Some(0.8));

        let binary = Prediction::new("Human", 0.75);
        assert_eq!(target_probability(&binary, "AI"), Some(0.25));
        assert_eq!(target_probability(&Prediction::new("Neutral", 0.5), "Spam"), None);
    }

    #[test]
    fn test_config_validation() {
        assert!(EnsembleConfig::default().validate().is_ok());
        assert!(EnsembleConfig::single("lexical", "AI").validate().is_ok());

        let mut config = EnsembleConfig::default();
        config.members[1].weight = -0.1;
        assert!(config.validate().is_err());

        let mut config = EnsembleConfig::default();
        config.primary = "missing".to_string();
        assert!(config.validate().unwrap_err().contains("primary"));

        let mut config = EnsembleConfig::default();
        config.policy = DecisionPolicy::DualThreshold { flag: 0.3, review: 0.5 };
        assert!(config.validate().is_err());

        let mut config = EnsembleConfig::default();
        config.members.push(EnsembleMember::new("roberta", "AI", 0.1));
        assert!(config.validate().unwrap_err().contains("duplicate"));
    }

    #[tokio::test]
    async fn test_ensemble_weighted_verdict() {
        let ensemble = default_ensemble(vec![
            StubClassifier::scoring("roberta", "AI", "AI", 0.7),
            StubClassifier::scoring("ai_detector", "Human", "AI", 0.5),
            StubClassifier::scoring("fake_review", "Fake", "Fake", 0.8),
        ]);
        let response = ensemble.ensemble_predict("some review text", false).await;
        assert!((response.combined_score - 0.67).abs() < 1e-9);
        assert_eq!(response.final_label, "AI-generated or Fake");
        assert_eq!(response.per_model_results.len(), 3);
        assert!(response.explanations.is_none());
        assert!(response.error.is_none());
        assert!(Uuid::parse_str(&response.request_id).is_ok());
    }

    #[tokio::test]
    async fn test_member_failure_is_isolated() {
        let ensemble = default_ensemble(vec![
            StubClassifier::scoring("roberta", "Human", "AI", 0.2),
            Arc::new(StubClassifier::new("ai_detector", None)),
        ]);
        let response = ensemble.ensemble_predict("text", false).await;

        assert!(matches!(
            response.per_model_results["ai_detector"],
            ModelOutcome::Failed { .. }
        ));
        // fake_review never registered
        match &response.per_model_results["fake_review"] {
            ModelOutcome::Failed { error } => assert!(error.contains("no classifier registered")),
            other => panic!("unexpected {:?}", other),
        }
        assert!((response.combined_score - 0.2).abs() < 1e-9);
        assert_eq!(response.final_label, "Human Genuine");
    }

    #[tokio::test]
    async fn test_all_members_failing() {
        let ensemble = default_ensemble(vec![]);
        let response = ensemble.ensemble_predict("text", true).await;
        assert_eq!(response.final_label, "Unknown");
        assert_eq!(response.combined_score, 0.0);
        assert!(response.error.is_some());
        let explanations = response.explanations.unwrap();
        assert!(matches!(explanations["roberta"], ExplanationOutcome::Failed { .. }));
    }

    #[tokio::test]
    async fn test_primary_explanation_attached() {
        let primary = StubClassifier {
            attributions: Some(RawAttributions::Features(vec![FeatureWeight {
                feature: "amazing".to_string(),
                weight: 0.6,
            }])),
            ..StubClassifier::new(
                "roberta",
                Some(Prediction::new("Human", 0.85).with_probability("AI", 0.15)),
            )
        };
        let ensemble = default_ensemble(vec![Arc::new(primary)]);
        let response = ensemble
            .ensemble_predict("I love this product! It's amazing.", true)
            .await;

        let explanations = response.explanations.unwrap();
        match &explanations["roberta"] {
            ExplanationOutcome::Explained(explanation) => {
                assert!(explanation.conclusion.contains("human-written"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(response.final_label, "Human Genuine");
    }

    #[tokio::test]
    async fn test_invalid_prediction_counts_as_failure() {
        let bad = Prediction::new("AI", 1.5).with_probability("AI", 0.9);
        let ensemble = default_ensemble(vec![
            Arc::new(StubClassifier::new("roberta", Some(bad))),
            StubClassifier::scoring("ai_detector", "AI", "AI", 0.9),
        ]);
        let response = ensemble.ensemble_predict("text", false).await;
        assert!(matches!(response.per_model_results["roberta"], ModelOutcome::Failed { .. }));
        assert!((response.combined_score - 0.9).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_any_positive_policy() {
        let config = EnsembleConfig {
            policy: DecisionPolicy::AnyPositive,
            ..EnsembleConfig::default()
        };
        let ensemble = Ensemble::new(config, ExplanationConfig::default())
            .unwrap()
            .with_classifier(StubClassifier::scoring("roberta", "Human", "AI", 0.1))
            .with_classifier(StubClassifier::scoring("ai_detector", "AI", "AI", 0.55));
        let response = ensemble.ensemble_predict("text", false).await;
        assert_eq!(response.final_label, "AI-generated or Fake");
    }
}
