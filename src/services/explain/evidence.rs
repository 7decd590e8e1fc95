// Evidence Classifier & Scorer
// Assigns each attribution to a side and summarizes strength and direction

use crate::models::{
    Attribution, EvidenceClass, EvidenceDirection, EvidenceStrength, EvidenceSummary,
};
use crate::services::text_processor::match_form;

use super::ngram::class_for_weight;

/// Formal, generic and transition vocabulary typical of generated text.
const AI_INDICATORS: &[&str] = &[
    "furthermore", "moreover", "additionally", "in conclusion", "overall", "consequently",
    "therefore", "thus", "comprehensive", "significant", "significantly", "various", "utilize",
    "facilitate", "ensure", "optimal", "crucial", "essential", "delve", "notably",
    "it is important", "leverage", "robust", "seamless", "enhance", "ultimately", "pivotal",
];

/// Informal, personal and emotive vocabulary typical of human text.
const HUMAN_INDICATORS: &[&str] = &[
    "i", "i'm", "my", "love", "hate", "lol", "omg", "honestly", "awesome", "amazing",
    "terrible", "awful", "wonderful", "fantastic", "horrible", "super", "totally", "gonna",
    "wanna", "kinda", "yeah", "wow", "can't", "don't", "won't", "crazy", "weird", "literally",
    "haha",
];

const KEY_INDICATOR_COUNT: usize = 3;
const DOMINANCE_RATIO: f64 = 1.5;
const BALANCE_EPSILON: f64 = 0.001;

/// Whole-word or whole-phrase occurrence of `needle` inside `haystack`
/// (both already in match form).
fn contains_term(haystack: &str, needle: &str) -> bool {
    haystack
        .match_indices(needle)
        .any(|(start, _)| {
            let end = start + needle.len();
            let before_ok = haystack[..start]
                .chars()
                .next_back()
                .map_or(true, |c| !c.is_alphanumeric() && c != '\'');
            let after_ok = haystack[end..]
                .chars()
                .next()
                .map_or(true, |c| !c.is_alphanumeric() && c != '\'');
            before_ok && after_ok
        })
}

fn count_matches(feature: &str, vocabulary: &[&str]) -> usize {
    vocabulary.iter().filter(|term| contains_term(feature, term)).count()
}

/// Class a term leans toward by vocabulary alone; `None` when neutral or tied.
pub fn lexical_class(term: &str) -> Option<EvidenceClass> {
    let form = match_form(term);
    let ai_hits = count_matches(&form, AI_INDICATORS);
    let human_hits = count_matches(&form, HUMAN_INDICATORS);
    match ai_hits.cmp(&human_hits) {
        std::cmp::Ordering::Greater => Some(EvidenceClass::Ai),
        std::cmp::Ordering::Less => Some(EvidenceClass::Human),
        std::cmp::Ordering::Equal => None,
    }
}

/// Decide which side an attribution supports. Vocabulary matches win;
/// ties fall back to the weight sign relative to the predicted class.
pub fn classify_attribution(attr: &Attribution, predicted: Option<EvidenceClass>) -> EvidenceClass {
    match lexical_class(&attr.feature) {
        Some(class) => class,
        None if predicted.is_some() => class_for_weight(attr.weight, predicted),
        None => attr.indicates,
    }
}

pub fn categorize_strength(value: f64) -> EvidenceStrength {
    if value > 3.0 {
        EvidenceStrength::VeryStrong
    } else if value > 2.0 {
        EvidenceStrength::Strong
    } else if value > 1.0 {
        EvidenceStrength::Moderate
    } else {
        EvidenceStrength::Weak
    }
}

fn direction_for(ai_strength: f64, human_strength: f64) -> EvidenceDirection {
    if ai_strength > human_strength * DOMINANCE_RATIO {
        EvidenceDirection::StronglyAi
    } else if human_strength > ai_strength * DOMINANCE_RATIO {
        EvidenceDirection::StronglyHuman
    } else if ai_strength > human_strength {
        EvidenceDirection::ModeratelyAi
    } else if human_strength > ai_strength {
        EvidenceDirection::ModeratelyHuman
    } else {
        EvidenceDirection::Mixed
    }
}

/// Summarize attributions into strength, direction and the top indicators.
pub fn summarize_evidence(
    attributions: &[Attribution],
    predicted: Option<EvidenceClass>,
) -> EvidenceSummary {
    if attributions.is_empty() {
        return EvidenceSummary::insufficient();
    }

    let resolved: Vec<Attribution> = attributions
        .iter()
        .map(|a| {
            let weight = if a.weight.is_finite() { a.weight } else { 0.0 };
            Attribution::new(a.feature.clone(), weight, classify_attribution(a, predicted))
        })
        .collect();

    let mut ai_count = 0;
    let mut human_count = 0;
    let mut ai_strength = 0.0;
    let mut human_strength = 0.0;
    for attr in &resolved {
        match attr.indicates {
            EvidenceClass::Ai => {
                ai_count += 1;
                ai_strength += attr.weight.abs();
            }
            EvidenceClass::Human => {
                human_count += 1;
                human_strength += attr.weight.abs();
            }
        }
    }

    // Stable sort keeps input order among equal weights
    let mut key_indicators = resolved;
    key_indicators.sort_by(|a, b| {
        b.weight
            .abs()
            .partial_cmp(&a.weight.abs())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    key_indicators.truncate(KEY_INDICATOR_COUNT);

    EvidenceSummary {
        strength: categorize_strength(ai_strength.max(human_strength)),
        direction: direction_for(ai_strength, human_strength),
        ai_evidence_count: ai_count,
        human_evidence_count: human_count,
        key_indicators,
        evidence_balance: human_strength / (ai_strength + human_strength + BALANCE_EPSILON),
    }
}
