//! Fuzzy string scoring.
//!
//! Users rarely type a title exactly, so [`match_score`] lets substring
//! containment and token overlap dominate plain edit distance.  All lengths
//! are counted in Unicode scalar values, which keeps Hangul syllables at one
//! unit each.

/// Score floor for a keyword contained verbatim in the text.
const CONTAINMENT_BASE: f64 = 0.9;

/// Weight of the token-overlap ratio in the partial-match blend.
const TOKEN_WEIGHT: f64 = 0.7;

/// Weight of whole-string similarity in the partial-match blend.
const EDIT_WEIGHT: f64 = 0.3;

/// Partial matches never reach the containment band.
const PARTIAL_MATCH_CEILING: f64 = 0.89;

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// Levenshtein distance over `char`s, two-row dynamic programme.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            curr[j + 1] = substitution.min(prev[j + 1] + 1).min(curr[j] + 1);
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Normalized edit-distance similarity in `[0, 1]`.
///
/// Inputs are trimmed and compared case-insensitively.  Identical inputs
/// (including two empty strings) score 1.0; an empty input against a
/// non-empty one scores 0.0.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = normalize(a);
    let b = normalize(b);
    if a == b {
        return 1.0;
    }
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = levenshtein(&a, &b);
    (max_len - distance.min(max_len)) as f64 / max_len as f64
}

/// Fraction of keyword tokens that partially match some text token, where a
/// partial match means either token contains the other.
fn token_overlap(keyword: &str, text: &str) -> f64 {
    let keyword_tokens: Vec<&str> = keyword.split_whitespace().collect();
    if keyword_tokens.is_empty() {
        return 0.0;
    }
    let text_tokens: Vec<&str> = text.split_whitespace().collect();
    let matched = keyword_tokens
        .iter()
        .filter(|k| {
            text_tokens
                .iter()
                .any(|t| t.contains(**k) || k.contains(*t))
        })
        .count();
    matched as f64 / keyword_tokens.len() as f64
}

/// Composite confidence that `text` is what the user meant by `keyword`.
///
/// * `text` contains `keyword`: `0.9 + 0.1 × |keyword| / |text|`.
/// * otherwise: `max(0.7 × overlap + 0.3 × similarity, similarity)`, capped
///   below the containment band.
///
/// Empty input on either side scores 0.
pub fn match_score(keyword: &str, text: &str) -> f64 {
    let keyword = normalize(keyword);
    let text = normalize(text);
    if keyword.is_empty() || text.is_empty() {
        return 0.0;
    }

    if text.contains(&keyword) {
        let ratio = keyword.chars().count() as f64 / text.chars().count() as f64;
        return CONTAINMENT_BASE + (1.0 - CONTAINMENT_BASE) * ratio;
    }

    let sim = similarity(&keyword, &text);
    let blend = TOKEN_WEIGHT * token_overlap(&keyword, &text) + EDIT_WEIGHT * sim;
    blend.max(sim).min(PARTIAL_MATCH_CEILING)
}
