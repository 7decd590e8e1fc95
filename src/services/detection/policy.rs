// Decision policy
// Policy maps a combined ensemble score to a verdict label, never the score itself.

use serde::{Deserialize, Serialize};

use crate::models::{EvidenceClass, Prediction};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionPolicy {
    /// score > flag: positive; score > review: suspicious; otherwise negative
    DualThreshold { flag: f64, review: f64 },
    /// score > threshold: positive; otherwise negative
    SingleThreshold { threshold: f64 },
    /// Positive when any member predicts the AI/fake class
    AnyPositive,
}

impl Default for DecisionPolicy {
    fn default() -> Self {
        Self::DualThreshold {
            flag: 0.6,
            review: 0.4,
        }
    }
}

impl DecisionPolicy {
    pub fn from_str(val: &str) -> Self {
        match val.trim().to_lowercase().as_str() {
            "single" => Self::SingleThreshold { threshold: 0.5 },
            "any" | "or" => Self::AnyPositive,
            _ => Self::default(),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::DualThreshold { .. } => "dual",
            Self::SingleThreshold { .. } => "single",
            Self::AnyPositive => "any",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VerdictLabels {
    pub positive: String,
    pub suspicious: String,
    pub negative: String,
}

impl Default for VerdictLabels {
    fn default() -> Self {
        Self {
            positive: "AI-generated or Fake".to_string(),
            suspicious: "Suspicious Content".to_string(),
            negative: "Human Genuine".to_string(),
        }
    }
}

pub fn decide_label(
    policy: &DecisionPolicy,
    score: f64,
    predictions: &[&Prediction],
    labels: &VerdictLabels,
) -> String {
    let label = match policy {
        DecisionPolicy::DualThreshold { flag, review } => {
            if score > *flag {
                &labels.positive
            } else if score > *review {
                &labels.suspicious
            } else {
                &labels.negative
            }
        }
        DecisionPolicy::SingleThreshold { threshold } => {
            if score > *threshold {
                &labels.positive
            } else {
                &labels.negative
            }
        }
        DecisionPolicy::AnyPositive => {
            if predictions
                .iter()
                .any(|p| p.predicted_class() == Some(EvidenceClass::Ai))
            {
                &labels.positive
            } else {
                &labels.negative
            }
        }
    };
    label.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_from_str() {
        assert_eq!(DecisionPolicy::from_str("single"), DecisionPolicy::SingleThreshold { threshold: 0.5 });
        assert_eq!(DecisionPolicy::from_str(" OR "), DecisionPolicy::AnyPositive);
        assert_eq!(DecisionPolicy::from_str("whatever"), DecisionPolicy::default());
    }

    #[test]
    fn test_dual_threshold_bands() {
        let labels = VerdictLabels::default();
        let policy = DecisionPolicy::default();
        assert_eq!(decide_label(&policy, 0.67, &[], &labels), "AI-generated or Fake");
        assert_eq!(decide_label(&policy, 0.6, &[], &labels), "Suspicious Content");
        assert_eq!(decide_label(&policy, 0.4, &[], &labels), "Human Genuine");
    }

    #[test]
    fn test_single_threshold_is_strict() {
        let labels = VerdictLabels::default();
        let policy = DecisionPolicy::SingleThreshold { threshold: 0.5 };
        assert_eq!(decide_label(&policy, 0.5, &[], &labels), "Human Genuine");
        assert_eq!(decide_label(&policy, 0.51, &[], &labels), "AI-generated or Fake");
    }

    #[test]
    fn test_any_positive_uses_member_labels() {
        let labels = VerdictLabels::default();
        let human = Prediction::new("Human", 0.9);
        let fake = Prediction::new("Fake", 0.55);
        let policy = DecisionPolicy::AnyPositive;
        assert_eq!(decide_label(&policy, 0.1, &[&human], &labels), "Human Genuine");
        assert_eq!(decide_label(&policy, 0.1, &[&human, &fake], &labels), "AI-generated or Fake");
    }

    #[test]
    fn test_policy_serialization() {
        let json = serde_json::to_string(&DecisionPolicy::default()).unwrap();
        assert_eq!(json, r#"{"dual_threshold":{"flag":0.6,"review":0.4}}"#);
        let any: DecisionPolicy = serde_json::from_str(r#""any_positive""#).unwrap();
        assert_eq!(any, DecisionPolicy::AnyPositive);
    }
}
