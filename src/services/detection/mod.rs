// Detection Module
// Verdict logic organized into specialized submodules:
// - ensemble: Weighted fusion of several classifiers into one verdict
// - policy: Decision policies mapping a combined score to a label
// - heuristic: Deterministic local classifier for offline use

pub mod ensemble;
pub mod policy;
pub mod heuristic;

// Re-export commonly used items
pub use ensemble::{
    combine_scores,
    target_probability,
    Ensemble,
    EnsembleConfig,
    EnsembleMember,
};
pub use policy::{decide_label, DecisionPolicy, VerdictLabels};
pub use heuristic::{score_text, LexicalClassifier, LEXICAL_CLASSIFIER_NAME};
