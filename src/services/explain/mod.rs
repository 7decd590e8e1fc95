// Explanation Module
// Turns classifier attributions into a readable explanation:
// - normalizer: token/feature cleanup, subword merging
// - fallback: heuristic feature extraction when the explainer fails
// - ngram: phrase scoring, dedup and top-K selection
// - evidence: per-class evidence strength and direction
// - linguistic: text statistics independent of the model
// - narrative: confidence, conclusion, reasoning chain, alternatives
// - pipeline: the total `generate_explanation` entry points

pub mod normalizer;
pub mod fallback;
pub mod ngram;
pub mod evidence;
pub mod linguistic;
pub mod narrative;
pub mod pipeline;

use serde::{Deserialize, Serialize};

pub use normalizer::{merge_subword_tokens, normalize_attributions, normalize_or_fallback, NormalizedAttributions};
pub use fallback::{FallbackStrategy, SENTINEL_FEATURE};
pub use ngram::{aggregate_ngrams, class_for_weight, NgramConfig};
pub use evidence::{categorize_strength, classify_attribution, lexical_class, summarize_evidence};
pub use linguistic::analyze_linguistic_patterns;
pub use narrative::{
    assess_confidence,
    build_reasoning_chain,
    generate_alternatives,
    generate_conclusion,
    select_key_phrases,
};
pub use pipeline::{degraded_explanation, explain_prediction, generate_explanation, try_generate_explanation};

/// Tunables for the attribution path of an explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
pub struct ExplanationConfig {
    pub ngram: NgramConfig,
    pub fallback: FallbackStrategy,
}
