pub const MAX_SCORE: i32 = 100;

const CHAR_WEIGHT: i32 = 16;
const ADJACENT_BONUS: i32 = 8;
const BOUNDARY_BONUS: i32 = 4;
const GAP_PENALTY: i32 = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyMatch {
    pub score: i32,
    pub positions: Vec<i32>,
    pub start: i32,
}

/// Scores `query` against `candidate`, case-insensitively.
///
/// Exact mode requires a contiguous run; fuzzy mode accepts an ordered
/// subsequence. A prefix (or equal) match always gets [`MAX_SCORE`], every
/// other hit lands in `1..MAX_SCORE`. `None` means some query character is
/// missing, or the query is empty.
pub fn score(query: &str, candidate: &str, exact: bool) -> Option<FuzzyMatch> {
    Pattern::new(query).score(candidate, exact)
}

/// A query folded once, for scoring against many candidates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Pattern {
    needle: Vec<char>,
}

impl Pattern {
    pub fn new(query: &str) -> Self {
        Self {
            needle: query.chars().map(fold_char).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.needle.is_empty()
    }

    /// Same contract as [`score`].
    pub fn score(&self, candidate: &str, exact: bool) -> Option<FuzzyMatch> {
        let needle = self.needle.as_slice();
        if needle.is_empty() || !contains_subsequence(candidate, needle) {
            return None;
        }

        let haystack: Vec<char> = candidate.chars().map(fold_char).collect();
        if needle.len() > haystack.len() {
            return None;
        }

        if haystack.starts_with(needle) {
            return Some(FuzzyMatch {
                score: MAX_SCORE,
                positions: (0..needle.len() as i32).collect(),
                start: 0,
            });
        }

        let positions = if exact {
            contiguous_positions(&haystack, needle)?
        } else {
            best_subsequence(&haystack, needle)?
        };

        Some(FuzzyMatch {
            score: rate(&haystack, &positions),
            start: positions[0] as i32,
            positions: positions.into_iter().map(|p| p as i32).collect(),
        })
    }
}

fn fold_char(c: char) -> char {
    c.to_lowercase().next().unwrap_or(c)
}

// Allocation-free rejection; a contiguous run is also a subsequence.
fn contains_subsequence(candidate: &str, needle: &[char]) -> bool {
    let mut pending = needle.iter().peekable();
    for c in candidate.chars() {
        let Some(&&want) = pending.peek() else {
            break;
        };
        let folded = if c.is_ascii() {
            c.to_ascii_lowercase()
        } else {
            fold_char(c)
        };
        if folded == want {
            pending.next();
        }
    }
    pending.peek().is_none()
}

fn contiguous_positions(haystack: &[char], needle: &[char]) -> Option<Vec<usize>> {
    let start = haystack
        .windows(needle.len())
        .position(|window| window == needle)?;
    Some((start..start + needle.len()).collect())
}

// Tries every occurrence of the first query character as an anchor and keeps
// the best-rated greedy walk. Earlier anchors win ties.
fn best_subsequence(haystack: &[char], needle: &[char]) -> Option<Vec<usize>> {
    let mut best: Option<(i32, Vec<usize>)> = None;

    for (anchor, hay_char) in haystack.iter().enumerate() {
        if *hay_char != needle[0] {
            continue;
        }

        let Some(positions) = walk_from(haystack, needle, anchor) else {
            // No later anchor can complete either.
            break;
        };

        let rating = rate(haystack, &positions);
        if best.as_ref().map_or(true, |(current, _)| rating > *current) {
            best = Some((rating, positions));
        }
    }

    best.map(|(_, positions)| positions)
}

fn walk_from(haystack: &[char], needle: &[char], anchor: usize) -> Option<Vec<usize>> {
    let mut positions = Vec::with_capacity(needle.len());
    positions.push(anchor);
    let mut next = anchor + 1;

    for needle_char in &needle[1..] {
        let offset = haystack[next..].iter().position(|c| c == needle_char)?;
        positions.push(next + offset);
        next += offset + 1;
    }

    Some(positions)
}

fn rate(haystack: &[char], positions: &[usize]) -> i32 {
    let len = positions.len() as i32;
    let adjacent = positions
        .windows(2)
        .filter(|pair| pair[1] == pair[0] + 1)
        .count() as i32;
    let gaps: i32 = positions
        .windows(2)
        .map(|pair| (pair[1] - pair[0] - 1) as i32)
        .sum();
    let boundaries = positions
        .iter()
        .filter(|&&p| p == 0 || !haystack[p - 1].is_alphanumeric())
        .count() as i32;
    let start = positions.first().copied().unwrap_or(0) as i32;

    let raw = len * CHAR_WEIGHT + adjacent * ADJACENT_BONUS + boundaries * BOUNDARY_BONUS
        - gaps * GAP_PENALTY
        - start;
    let perfect = len * CHAR_WEIGHT + (len - 1) * ADJACENT_BONUS + BOUNDARY_BONUS;

    (raw * (MAX_SCORE - 1) / perfect).clamp(1, MAX_SCORE - 1)
}

#[cfg(test)]
mod tests {
    use super::{score, Pattern, MAX_SCORE};

    #[test]
    fn prefix_gets_max_score() {
        let hit = score("fir", "Firefox", false).unwrap();
        assert_eq!(hit.score, MAX_SCORE);
        assert_eq!(hit.positions, vec![0, 1, 2]);
        assert_eq!(hit.start, 0);
    }

    #[test]
    fn equal_text_scores_the_same_in_both_modes() {
        let exact = score("terminal", "Terminal", true).unwrap();
        let fuzzy = score("terminal", "Terminal", false).unwrap();
        assert_eq!(exact.score, MAX_SCORE);
        assert_eq!(exact, fuzzy);
    }

    #[test]
    fn exact_mode_requires_contiguous_run() {
        assert!(score("fx", "Firefox", true).is_none());
        let hit = score("fox", "Firefox", true).unwrap();
        assert_eq!(hit.start, 4);
        assert_eq!(hit.positions, vec![4, 5, 6]);
        assert!(hit.score < MAX_SCORE);
    }

    #[test]
    fn fuzzy_mode_accepts_subsequence() {
        let hit = score("ffx", "Firefox", false).unwrap();
        assert_eq!(hit.positions, vec![0, 4, 6]);
        assert!(hit.score > 0 && hit.score < MAX_SCORE);
    }

    #[test]
    fn missing_character_is_no_match() {
        assert!(score("fz", "Firefox", false).is_none());
        assert!(score("", "Firefox", false).is_none());
        assert!(score("firefoxes", "Firefox", false).is_none());
    }

    #[test]
    fn contiguous_beats_scattered() {
        let dense = score("code", "vscode editor", false).unwrap();
        let sparse = score("code", "cat on desk easel", false).unwrap();
        assert!(dense.score > sparse.score);
    }

    #[test]
    fn later_start_scores_lower() {
        let early = score("term", "a term", false).unwrap();
        let late = score("term", "a long winded term", false).unwrap();
        assert!(early.score > late.score);
    }

    #[test]
    fn prefers_best_anchor() {
        let hit = score("ed", "e-mail editor", false).unwrap();
        assert_eq!(hit.positions, vec![7, 8]);
    }

    #[test]
    fn folded_pattern_matches_one_shot_scoring() {
        let pattern = Pattern::new("ReOrt");
        for candidate in ["Q4_Report.xlsx", "report", "Document_00042.txt", ""] {
            assert_eq!(pattern.score(candidate, false), score("ReOrt", candidate, false));
            assert_eq!(pattern.score(candidate, true), score("ReOrt", candidate, true));
        }
        assert!(Pattern::new("").is_empty());
    }

    #[test]
    fn non_ascii_text_folds_case() {
        let hit = score("ölf", "Ölfilter", false).unwrap();
        assert_eq!(hit.score, MAX_SCORE);
    }

    #[test]
    fn scoring_is_deterministic() {
        let first = score("gc", "google-chrome", false);
        let second = score("gc", "google-chrome", false);
        assert_eq!(first, second);
    }
}
