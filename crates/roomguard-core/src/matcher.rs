//! Phrase matcher: weighted-ratio fuzzy similarity between a transcript and a phrase set.
//!
//! Scores are on a 0–100 scale. 100 means the two strings are identical after
//! normalization (case, punctuation, and for the token scorers, word order).
//! Acceptance is decided by the caller against a configurable threshold.

use std::collections::BTreeSet;

/// Scale applied to token-based scores in the weighted ratio.
const UNBASE_SCALE: f64 = 0.95;

/// Ordered, immutable set of canonical phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhraseSet {
    phrases: Vec<String>,
}

impl PhraseSet {
    /// Build from raw phrases; each is normalized, blanks and duplicates are dropped.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for p in phrases {
            let n = normalize(p.as_ref());
            if !n.is_empty() && !out.contains(&n) {
                out.push(n);
            }
        }
        Self { phrases: out }
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

/// Best candidate for one utterance against one phrase set.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub candidate: Option<String>,
    pub score: f64,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            candidate: None,
            score: 0.0,
        }
    }

    /// True when a candidate exists and the score reaches `threshold`.
    pub fn accepts(&self, threshold: f64) -> bool {
        self.candidate.is_some() && self.score >= threshold
    }
}

/// Return the highest-scoring phrase of `candidates` for `utterance`.
/// Ties keep the earlier phrase.
pub fn match_phrase(utterance: &str, candidates: &PhraseSet) -> MatchResult {
    let heard = normalize(utterance);
    if heard.is_empty() {
        return MatchResult::none();
    }
    let mut best = MatchResult::none();
    for phrase in candidates.phrases() {
        let score = weighted_ratio(&heard, phrase);
        if best.candidate.is_none() || score > best.score {
            best = MatchResult {
                candidate: Some(phrase.clone()),
                score,
            };
        }
    }
    best
}

/// Lowercase, map non-alphanumerics to spaces, collapse whitespace.
pub fn normalize(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { ' ' })
        .flat_map(char::to_lowercase)
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Weighted ratio over already-normalized strings.
pub fn weighted_ratio(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_b == 0 {
        return 0.0;
    }

    let len_ratio = len_a.max(len_b) as f64 / len_a.min(len_b) as f64;
    let mut best = ratio(a, b);

    if len_ratio < 1.5 {
        return best.max(token_ratio(a, b) * UNBASE_SCALE);
    }

    let partial_scale = if len_ratio < 8.0 { 0.9 } else { 0.6 };
    best = best.max(partial_ratio(a, b) * partial_scale);
    best.max(partial_token_ratio(a, b) * UNBASE_SCALE * partial_scale)
}

/// Normalized indel similarity: 2·LCS / (|a| + |b|), scaled to 100.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    ratio_chars(&a, &b)
}

fn ratio_chars(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 100.0;
    }
    200.0 * lcs_len(a, b) as f64 / total as f64
}

/// Longest common subsequence length (two-row DP).
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut cur = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            cur[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                cur[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut cur);
    }
    prev[b.len()]
}

/// Best ratio of the shorter string against every same-length window of the longer
/// one, including the windows hanging off either end.
pub fn partial_ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let (short, long) = if a.len() <= b.len() { (&a, &b) } else { (&b, &a) };
    let mut best = partial_windows(short, long);
    if a.len() == b.len() {
        best = best.max(partial_windows(long, short));
    }
    best
}

fn partial_windows(short: &[char], long: &[char]) -> f64 {
    let n = short.len();
    let m = long.len();
    let mut best: f64 = 0.0;

    for end in 1..n {
        best = best.max(ratio_chars(short, &long[..end]));
    }
    for start in 0..=(m - n) {
        best = best.max(ratio_chars(short, &long[start..start + n]));
        if best >= 100.0 {
            return 100.0;
        }
    }
    for start in (m - n + 1)..m {
        best = best.max(ratio_chars(short, &long[start..]));
    }
    best
}

fn sorted_tokens(s: &str) -> Vec<&str> {
    let mut tokens: Vec<&str> = s.split_whitespace().collect();
    tokens.sort_unstable();
    tokens
}

fn token_set(s: &str) -> BTreeSet<&str> {
    s.split_whitespace().collect()
}

fn join(tokens: impl IntoIterator<Item = impl AsRef<str>>) -> String {
    tokens
        .into_iter()
        .map(|t| t.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ratio after sorting both token lists.
pub fn token_sort_ratio(a: &str, b: &str) -> f64 {
    ratio(&join(sorted_tokens(a)), &join(sorted_tokens(b)))
}

/// Ratio over token intersection and differences; 100 when one token set contains the other.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let ta = token_set(a);
    let tb = token_set(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }

    let sect: Vec<&str> = ta.intersection(&tb).copied().collect();
    let diff_ab: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_ba: Vec<&str> = tb.difference(&ta).copied().collect();
    if !sect.is_empty() && (diff_ab.is_empty() || diff_ba.is_empty()) {
        return 100.0;
    }

    let diff_ab = join(diff_ab);
    let diff_ba = join(diff_ba);
    let ab_len = diff_ab.chars().count();
    let ba_len = diff_ba.chars().count();
    let sect_len = join(&sect).chars().count();

    let mut best = ratio(&diff_ab, &diff_ba);
    if sect_len == 0 {
        return best;
    }

    // sect vs "sect + diff": the only edits are the appended diff and its separator.
    let sep = 1;
    let sect_ab_len = sect_len + sep + ab_len;
    let sect_ba_len = sect_len + sep + ba_len;
    let sect_ab = 100.0 * (1.0 - (sep + ab_len) as f64 / (sect_len + sect_ab_len) as f64);
    let sect_ba = 100.0 * (1.0 - (sep + ba_len) as f64 / (sect_len + sect_ba_len) as f64);
    best = best.max(sect_ab).max(sect_ba);
    best
}

fn token_ratio(a: &str, b: &str) -> f64 {
    token_sort_ratio(a, b).max(token_set_ratio(a, b))
}

/// Partial ratio over sorted tokens; 100 as soon as the two share any word.
pub fn partial_token_ratio(a: &str, b: &str) -> f64 {
    let ta = token_set(a);
    let tb = token_set(b);
    if ta.is_empty() || tb.is_empty() {
        return 0.0;
    }
    if !ta.is_disjoint(&tb) {
        return 100.0;
    }

    let result = partial_ratio(&join(sorted_tokens(a)), &join(sorted_tokens(b)));
    let diff_ab: Vec<&str> = ta.difference(&tb).copied().collect();
    let diff_ba: Vec<&str> = tb.difference(&ta).copied().collect();
    if diff_ab.len() == a.split_whitespace().count() && diff_ba.len() == b.split_whitespace().count() {
        return result;
    }
    result.max(partial_ratio(&join(diff_ab), &join(diff_ba)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wake() -> PhraseSet {
        PhraseSet::new(["guard my room", "guard the room", "guard my room please"])
    }

    #[test]
    fn normalize_strips_case_and_punctuation() {
        assert_eq!(normalize("  Guard, MY room!! "), "guard my room");
        assert_eq!(normalize("what's up"), "what s up");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn exact_match_scores_100() {
        let m = match_phrase("guard the room", &wake());
        assert_eq!(m.candidate.as_deref(), Some("guard the room"));
        assert!((m.score - 100.0).abs() < 1e-9);
    }

    #[test]
    fn word_order_is_ignored_by_token_scorers() {
        let s = weighted_ratio("room my guard", "guard my room");
        assert!((s - 95.0).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn near_miss_transcription_is_accepted() {
        let m = match_phrase("guard my rooms", &wake());
        assert!(m.accepts(78.0), "score {}", m.score);
    }

    #[test]
    fn unrelated_speech_is_rejected() {
        let m = match_phrase("hello there", &wake());
        assert!(!m.accepts(78.0), "score {}", m.score);
    }

    #[test]
    fn shared_word_scores_high_on_length_mismatch() {
        // One common token caps partial_token_ratio at 100, scaled by 0.95 * 0.9.
        let s = weighted_ratio("stop guard", "guard my room please");
        assert!((s - 85.5).abs() < 1e-9, "got {}", s);
    }

    #[test]
    fn empty_utterance_scores_zero() {
        let m = match_phrase("", &wake());
        assert_eq!(m, MatchResult::none());
        assert!(!m.accepts(0.0));
    }

    #[test]
    fn ratio_known_values() {
        assert!((ratio("abc", "abc") - 100.0).abs() < 1e-9);
        // LCS("kitten","sitting") = 4 -> 2*4/13
        assert!((ratio("kitten", "sitting") - 800.0 / 13.0).abs() < 1e-9);
        assert_eq!(ratio("abc", "xyz"), 0.0);
    }

    #[test]
    fn partial_ratio_finds_substring() {
        assert!((partial_ratio("guard", "please guard my room") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn token_set_subset_is_full_score() {
        assert!((token_set_ratio("guard room", "guard my room") - 100.0).abs() < 1e-9);
    }

    #[test]
    fn phrase_set_normalizes_and_dedups() {
        let set = PhraseSet::new(["Yes", "yes!", "", "Yeah"]);
        assert_eq!(set.phrases(), &["yes".to_string(), "yeah".to_string()]);
    }

    #[test]
    fn confirm_variants_pass_confirm_threshold() {
        let confirm = PhraseSet::new(["yes", "yeah", "yup", "confirm", "activate"]);
        assert!(match_phrase("yeah", &confirm).accepts(70.0));
        assert!(match_phrase("Yes.", &confirm).accepts(70.0));
        assert!(!match_phrase("no", &confirm).accepts(70.0));
    }
}
