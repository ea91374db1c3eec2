// SPDX-License-Identifier: GPL-3.0-or-later
//! Album title matching against `[YYYY] Title` folders.

use std::collections::HashSet;
use std::path::PathBuf;

use curatarr_config::DEFAULT_SIMILARITY_THRESHOLD;
use curatarr_domain::{AlbumRecord, OwnershipStatus};
use curatarr_library::{normalize_title, FolderEntry};
use tracing::{debug, warn};

/// Below this Levenshtein ratio, titles without a common word are unrelated.
const MIN_SPELLING_SIMILARITY: f64 = 0.5;

/// The parts of a catalog album the matcher looks at.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlbumQuery<'a> {
    pub title: &'a str,
    pub release_year: Option<i32>,
}

impl<'a> From<&'a AlbumRecord> for AlbumQuery<'a> {
    fn from(album: &'a AlbumRecord) -> Self {
        Self {
            title: &album.title,
            release_year: album.release_year,
        }
    }
}

/// Verdict for one album. `folder_path` is set for `Owned` and `Ambiguous` only.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub status: OwnershipStatus,
    pub confidence: f64,
    pub folder_path: Option<PathBuf>,
}

impl MatchResult {
    pub fn missing() -> Self {
        Self {
            status: OwnershipStatus::Missing,
            confidence: 0.0,
            folder_path: None,
        }
    }
}

/// Decides which candidate folder, if any, holds an album.
///
/// Implementations must be pure: the same inputs always give the same result.
pub trait CandidateMatcher: Send + Sync {
    fn match_album(&self, album: &AlbumQuery<'_>, candidates: &[FolderEntry]) -> MatchResult;
}

#[derive(Debug, Clone)]
pub struct FuzzyCandidateMatcher {
    threshold: f64,
    year_tolerance: i32,
}

impl Default for FuzzyCandidateMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_SIMILARITY_THRESHOLD)
    }
}

impl FuzzyCandidateMatcher {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: clamp_threshold(threshold),
            year_tolerance: 1,
        }
    }

    pub fn with_year_tolerance(mut self, tolerance: i32) -> Self {
        self.year_tolerance = tolerance.max(0);
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    fn within_year(&self, album_year: i32, entry: &FolderEntry) -> bool {
        entry
            .parsed_year
            .map(|year| year.abs_diff(album_year) <= self.year_tolerance.unsigned_abs())
            .unwrap_or(false)
    }
}

impl CandidateMatcher for FuzzyCandidateMatcher {
    fn match_album(&self, album: &AlbumQuery<'_>, candidates: &[FolderEntry]) -> MatchResult {
        // no year, no match: titles alone are not trusted
        let Some(album_year) = album.release_year else {
            return MatchResult::missing();
        };

        let wanted = normalize_title(album.title);
        let mut best: Option<(f64, &FolderEntry)> = None;

        for entry in candidates.iter().filter(|entry| self.within_year(album_year, entry)) {
            let title = entry.parsed_title.as_deref().unwrap_or_default();
            let score = title_similarity(&wanted, title);
            let better = match best {
                None => true,
                Some((best_score, best_entry)) => {
                    score > best_score || (score == best_score && entry.name < best_entry.name)
                }
            };
            if better {
                best = Some((score, entry));
            }
        }

        let Some((score, entry)) = best else {
            return MatchResult::missing();
        };

        if score <= 0.0 {
            return MatchResult::missing();
        }
        let status = if score >= self.threshold {
            OwnershipStatus::Owned
        } else {
            OwnershipStatus::Ambiguous
        };

        debug!(
            target: "matching",
            album = album.title,
            folder = %entry.name,
            score,
            %status,
            "album matched"
        );

        MatchResult {
            status,
            confidence: score,
            folder_path: Some(entry.path.clone()),
        }
    }
}

/// Similarity of two already normalized titles in `[0, 1]`.
///
/// Identical titles score 1.0 and an empty title scores 0.0. Otherwise the
/// score is the better of the Levenshtein ratio and the Dice coefficient over
/// word sets. Titles without a common word score 0.0 unless they are spelled
/// nearly alike (`kida` against `kid a`).
pub fn title_similarity(left: &str, right: &str) -> f64 {
    if left.is_empty() || right.is_empty() {
        return 0.0;
    }
    if left == right {
        return 1.0;
    }

    let spelling = levenshtein_ratio(left, right);
    let words = word_dice(left, right);
    if words == 0.0 && spelling < MIN_SPELLING_SIMILARITY {
        return 0.0;
    }
    spelling.max(words).clamp(0.0, 1.0)
}

fn clamp_threshold(value: f64) -> f64 {
    if !value.is_finite() {
        warn!(
            target: "matching",
            value,
            "similarity threshold is not finite, using default {DEFAULT_SIMILARITY_THRESHOLD}"
        );
        return DEFAULT_SIMILARITY_THRESHOLD;
    }
    if !(0.0..=1.0).contains(&value) {
        let clamped = value.clamp(0.0, 1.0);
        warn!(target: "matching", value, clamped, "similarity threshold out of [0.0, 1.0] range, clamping");
        return clamped;
    }
    value
}

fn word_dice(left: &str, right: &str) -> f64 {
    let left_words: HashSet<&str> = left.split_whitespace().collect();
    let right_words: HashSet<&str> = right.split_whitespace().collect();
    let total = left_words.len() + right_words.len();
    if total == 0 {
        return 0.0;
    }
    let shared = left_words.intersection(&right_words).count();
    (2 * shared) as f64 / total as f64
}

fn levenshtein_ratio(left: &str, right: &str) -> f64 {
    let max_len = left.chars().count().max(right.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - levenshtein_distance(left, right) as f64 / max_len as f64
}

fn levenshtein_distance(left: &str, right: &str) -> usize {
    let left_chars: Vec<char> = left.chars().collect();
    let right_chars: Vec<char> = right.chars().collect();

    if left_chars.is_empty() {
        return right_chars.len();
    }
    if right_chars.is_empty() {
        return left_chars.len();
    }

    let mut previous_row: Vec<usize> = (0..=right_chars.len()).collect();
    let mut current_row: Vec<usize> = vec![0; right_chars.len() + 1];

    for (i, left_char) in left_chars.iter().enumerate() {
        current_row[0] = i + 1;
        for (j, right_char) in right_chars.iter().enumerate() {
            let substitution = previous_row[j] + usize::from(left_char != right_char);
            current_row[j + 1] = (current_row[j] + 1)
                .min(previous_row[j + 1] + 1)
                .min(substitution);
        }
        std::mem::swap(&mut previous_row, &mut current_row);
    }

    previous_row[right_chars.len()]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn folder(name: &str) -> FolderEntry {
        FolderEntry::from_path(PathBuf::from("/music/Artist").join(name), 2)
    }

    fn query(title: &str, year: Option<i32>) -> AlbumQuery<'_> {
        AlbumQuery {
            title,
            release_year: year,
        }
    }

    #[test]
    fn exact_title_and_year_is_owned() {
        let result = FuzzyCandidateMatcher::default()
            .match_album(&query("Abbey Road", Some(1969)), &[folder("[1969] Abbey Road")]);
        assert_eq!(result.status, OwnershipStatus::Owned);
        assert!(result.confidence >= 0.99);
        assert_eq!(
            result.folder_path,
            Some(PathBuf::from("/music/Artist/[1969] Abbey Road"))
        );
    }

    #[test]
    fn punctuation_and_case_do_not_matter() {
        let result = FuzzyCandidateMatcher::default().match_album(
            &query("Sgt. Pepper's Lonely Hearts Club Band", Some(1967)),
            &[folder("[1967] SGT PEPPERS LONELY HEARTS CLUB BAND")],
        );
        assert_eq!(result.status, OwnershipStatus::Owned);
        assert!(result.confidence >= 0.95);
    }

    #[test]
    fn partial_title_is_ambiguous() {
        let result = FuzzyCandidateMatcher::default()
            .match_album(&query("In Rainbows", Some(2007)), &[folder("[2007] Rainbows")]);
        assert_eq!(result.status, OwnershipStatus::Ambiguous);
        assert!(result.confidence > 0.0 && result.confidence < 0.80);
        assert!(result.folder_path.is_some());
    }

    #[test]
    fn year_gate_blocks_perfect_title() {
        let result = FuzzyCandidateMatcher::default()
            .match_album(&query("Abbey Road", Some(1969)), &[folder("[2020] Abbey Road")]);
        assert_eq!(result, MatchResult::missing());
    }

    #[test]
    fn adjacent_years_pass_the_gate() {
        let matcher = FuzzyCandidateMatcher::default();
        for year in [1968, 1970] {
            let result = matcher.match_album(&query("Abbey Road", Some(year)), &[folder("[1969] Abbey Road")]);
            assert_eq!(result.status, OwnershipStatus::Owned, "release year {year}");
        }
    }

    #[test]
    fn year_tolerance_is_adjustable() {
        let strict = FuzzyCandidateMatcher::default().with_year_tolerance(0);
        let result = strict.match_album(&query("Abbey Road", Some(1970)), &[folder("[1969] Abbey Road")]);
        assert_eq!(result, MatchResult::missing());
    }

    #[test]
    fn no_year_is_missing() {
        let result = FuzzyCandidateMatcher::default()
            .match_album(&query("Abbey Road", None), &[folder("[1969] Abbey Road")]);
        assert_eq!(result, MatchResult::missing());
    }

    #[test]
    fn unrelated_title_is_missing() {
        let result = FuzzyCandidateMatcher::default()
            .match_album(&query("Abbey Road", Some(1969)), &[folder("[1969] Kid")]);
        assert_eq!(result.status, OwnershipStatus::Missing);
        assert_eq!(result.confidence, 0.0);
        assert!(result.folder_path.is_none());
    }

    #[test]
    fn year_gate_holds_for_any_distance() {
        let matcher = FuzzyCandidateMatcher::default();
        for offset in [-30, -5, -2, 2, 3, 40] {
            let year = 1990 + offset;
            let candidates = [folder(&format!("[{year}] Loveless"))];
            let result = matcher.match_album(&query("Loveless", Some(1990)), &candidates);
            assert_eq!(result, MatchResult::missing(), "offset {offset}");
        }
    }

    #[test]
    fn extreme_release_years_are_missing() {
        let matcher = FuzzyCandidateMatcher::default().with_year_tolerance(i32::MAX);
        for year in [i32::MIN, i32::MAX] {
            let result = FuzzyCandidateMatcher::default()
                .match_album(&query("Abbey Road", Some(year)), &[folder("[1969] Abbey Road")]);
            assert_eq!(result, MatchResult::missing(), "release year {year}");
        }
        let result = matcher.match_album(&query("Abbey Road", Some(i32::MAX)), &[folder("[1969] Abbey Road")]);
        assert_eq!(result.status, OwnershipStatus::Owned);
    }

    #[test]
    fn best_score_wins_and_ties_take_first_name() {
        let matcher = FuzzyCandidateMatcher::default();
        let result = matcher.match_album(
            &query("Kid A", Some(2000)),
            &[folder("[2000] Kid A Mnesia"), folder("[2000] Kid A")],
        );
        assert_eq!(result.folder_path, Some(PathBuf::from("/music/Artist/[2000] Kid A")));

        let result = matcher.match_album(
            &query("Kid A", Some(2000)),
            &[folder("[2001] Kid A"), folder("[2000] Kid A"), folder("[1999] Kid A")],
        );
        assert_eq!(result.folder_path, Some(PathBuf::from("/music/Artist/[1999] Kid A")));
    }

    #[test]
    fn score_at_threshold_is_owned_and_just_below_is_ambiguous() {
        let score = title_similarity("in rainbows", "rainbows");
        let candidates = [folder("[2007] Rainbows")];
        let album = query("In Rainbows", Some(2007));

        let at = FuzzyCandidateMatcher::new(score).match_album(&album, &candidates);
        assert_eq!(at.status, OwnershipStatus::Owned);
        assert_eq!(at.confidence, score);

        let above = FuzzyCandidateMatcher::new(score + f64::EPSILON).match_album(&album, &candidates);
        assert_eq!(above.status, OwnershipStatus::Ambiguous);
    }

    #[test]
    fn zero_score_is_missing_even_with_zero_threshold() {
        let result = FuzzyCandidateMatcher::new(0.0)
            .match_album(&query("Abbey Road", Some(1969)), &[folder("[1969] Kid")]);
        assert_eq!(result, MatchResult::missing());
    }

    #[test]
    fn album_folder_with_only_a_year_never_matches() {
        let result = FuzzyCandidateMatcher::default()
            .match_album(&query("Untitled", Some(2004)), &[folder("[2004]")]);
        assert_eq!(result, MatchResult::missing());
    }

    #[test]
    fn similarity_bounds() {
        assert_eq!(title_similarity("abbey road", "abbey road"), 1.0);
        assert_eq!(title_similarity("", "abbey road"), 0.0);
        assert_eq!(title_similarity("abbey road", "kid"), 0.0);
        let score = title_similarity("in rainbows", "rainbows");
        assert!(score > 0.7 && score < 0.75, "{score}");
        assert!(title_similarity("ok computer", "ok computer oknotok") > 0.5);
        assert_eq!(title_similarity("let it be", "abbey road"), 0.0);
        assert!(title_similarity("kida", "kid a") >= 0.8);
    }

    #[test]
    fn thresholds_are_clamped() {
        assert_eq!(FuzzyCandidateMatcher::new(1.7).threshold(), 1.0);
        assert_eq!(FuzzyCandidateMatcher::new(-0.2).threshold(), 0.0);
        assert_eq!(
            FuzzyCandidateMatcher::new(f64::NAN).threshold(),
            DEFAULT_SIMILARITY_THRESHOLD
        );
    }

    #[test]
    fn matching_is_deterministic() {
        let matcher = FuzzyCandidateMatcher::default();
        let candidates = [folder("[2003] Hail to the Thief"), folder("[2003] Hail")];
        let album = query("Hail to the Thief", Some(2003));
        assert_eq!(
            matcher.match_album(&album, &candidates),
            matcher.match_album(&album, &candidates)
        );
    }
}
