// ProseGuard Core Services

pub mod text_processor;
pub mod config_store;
pub mod providers;
pub mod detection;
pub mod explain;

pub use text_processor::*;
pub use config_store::*;
pub use providers::*;

// Re-export the library boundary
pub use detection::{
    combine_scores,
    decide_label,
    DecisionPolicy,
    Ensemble,
    EnsembleConfig,
    EnsembleMember,
    LexicalClassifier,
    VerdictLabels,
};
pub use explain::{
    explain_prediction,
    generate_explanation,
    try_generate_explanation,
    ExplanationConfig,
};
