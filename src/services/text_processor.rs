// Text Processing Service
// Normalization, word/sentence splitting and shared word lists

use regex::Regex;
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

/// Common UTF-8-read-as-Latin-1 sequences and their intended characters.
/// Longer sequences come first so prefixes do not shadow them.
const MOJIBAKE_FIXES: &[(&str, &str)] = &[
    ("\u{e2}\u{80}\u{99}", "'"),
    ("\u{e2}\u{80}\u{98}", "'"),
    ("\u{e2}\u{80}\u{9c}", "\""),
    ("\u{e2}\u{80}\u{9d}", "\""),
    ("\u{e2}\u{80}\u{93}", "-"),
    ("\u{e2}\u{80}\u{94}", "-"),
    ("\u{e2}\u{80}\u{a6}", "..."),
    ("â€™", "'"),
    ("â€˜", "'"),
    ("â€œ", "\""),
    ("â€\u{9d}", "\""),
    ("â€“", "-"),
    ("â€”", "-"),
    ("â€¦", "..."),
    ("Ã©", "é"),
    ("Ã¨", "è"),
    ("Ã¡", "á"),
    ("Ã±", "ñ"),
    ("Ã¶", "ö"),
    ("Ã¼", "ü"),
    ("\u{fffd}", ""),
];

const STOP_WORDS: &[&str] = &[
    "a", "about", "after", "all", "am", "an", "and", "any", "are", "as", "at", "be", "been",
    "before", "being", "both", "but", "by", "can", "could", "did", "do", "does", "doing", "down",
    "during", "each", "few", "for", "from", "further", "had", "has", "have", "having", "he", "her",
    "here", "hers", "him", "his", "how", "if", "in", "into", "is", "it", "its", "itself", "me",
    "more", "most", "no", "nor", "not", "of", "off", "on", "once", "only", "or", "other", "our",
    "ours", "out", "over", "own", "same", "she", "should", "so", "some", "such", "than", "that",
    "the", "their", "theirs", "them", "then", "there", "these", "they", "this", "those", "through",
    "to", "too", "under", "until", "up", "was", "we", "were", "what", "when", "where", "which",
    "while", "who", "whom", "why", "will", "with", "would", "you", "your", "yours",
];

/// Vague filler words: kept as features but damped and ignored when
/// comparing phrase cores.
const GENERIC_WORDS: &[&str] = &[
    "also", "actually", "basically", "just", "like", "really", "very", "quite", "thing", "things",
    "stuff", "something", "anything", "everything", "one", "ones", "get", "got", "make", "made",
    "lot", "lots", "way", "well", "much", "many", "even", "still",
];

fn mojibake_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"â[€\u{80}-\u{9f}]|Ã[\u{80}-\u{bf}]|Â[\u{a0}-\u{bf}]|\u{fffd}")
            .expect("mojibake regex")
    })
}

/// Stray `Â` left in front of a Latin-1 high character (U+00A0..U+00BF)
fn stray_latin1_prefix_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Â([\u{a0}-\u{bf}])").expect("latin1 prefix regex"))
}

fn space_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[\u{3000}\u{00A0}\u{2009}\u{200B}]").expect("space regex"))
}

fn horizontal_ws_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[ \t\x0C\x0B]+").expect("whitespace regex"))
}

fn sentence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[.!?]+").expect("sentence regex"))
}

/// Replace known mojibake byte sequences with the characters they encode.
pub fn fix_mojibake(text: &str) -> String {
    if !mojibake_re().is_match(text) {
        return text.to_string();
    }
    let fixed = MOJIBAKE_FIXES
        .iter()
        .fold(text.to_string(), |acc, (bad, good)| acc.replace(bad, good));
    stray_latin1_prefix_re().replace_all(&fixed, "$1").to_string()
}

/// Normalize Unicode (NFC), quotes, dashes and whitespace
pub fn normalize_punctuation(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut s: String = fix_mojibake(text).nfc().collect();

    // Replace smart quotes
    s = s.replace('\u{201c}', "\"")
         .replace('\u{201d}', "\"")
         .replace('\u{2018}', "'")
         .replace('\u{2019}', "'");

    // Replace en/em dash
    s = s.replace('\u{2013}', "-").replace('\u{2014}', "-");

    s = space_re().replace_all(&s, " ").to_string();

    // Normalize line endings
    s = s.replace("\r\n", "\n").replace('\r', "\n");

    s = horizontal_ws_re().replace_all(&s, " ").to_string();

    s = s.lines()
         .map(|ln| ln.trim())
         .collect::<Vec<_>>()
         .join("\n");

    s.trim().to_string()
}

/// Lowercased, normalized form used for verbatim containment checks.
pub fn match_form(text: &str) -> String {
    split_words(&normalize_punctuation(text))
        .join(" ")
        .to_lowercase()
}

/// True when `phrase` appears verbatim (case-insensitive, after normalization) in `text`.
pub fn contains_verbatim(text: &str, phrase: &str) -> bool {
    let needle = match_form(phrase);
    if needle.is_empty() {
        return false;
    }
    match_form(text).contains(&needle)
}

/// Whitespace-delimited words
pub fn split_words(text: &str) -> Vec<&str> {
    text.split_whitespace().collect()
}

/// Split on runs of `.`, `!` and `?`, dropping blank pieces
pub fn split_sentences(text: &str) -> Vec<&str> {
    sentence_re()
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .collect()
}

/// Strip leading/trailing punctuation; apostrophes inside the word survive.
pub fn trim_punctuation(word: &str) -> &str {
    word.trim_matches(|c: char| !c.is_alphanumeric())
}

pub fn is_punctuation_only(token: &str) -> bool {
    !token.trim().is_empty() && token.chars().all(|c| !c.is_alphanumeric())
}

pub fn is_stop_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    STOP_WORDS.contains(&lower.as_str())
}

pub fn is_generic_word(word: &str) -> bool {
    let lower = word.to_lowercase();
    GENERIC_WORDS.contains(&lower.as_str())
}

/// Any punctuation other than apostrophes (spaces are allowed).
pub fn has_foreign_punctuation(phrase: &str) -> bool {
    phrase
        .chars()
        .any(|c| !c.is_alphanumeric() && !c.is_whitespace() && c != '\'')
}

pub fn is_all_caps(word: &str) -> bool {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    letters.len() > 1 && letters.iter().all(|c| c.is_uppercase())
}
