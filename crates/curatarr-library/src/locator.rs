// SPDX-License-Identifier: GPL-3.0-or-later

//! Artist folder lookup by name.
//!
//! Lookup is an ordered list of [`NameRule`]s. Every rule is tried against the
//! top level of the library first, then inside the grouping bucket the artist
//! sorts into (`= B =` for "The Beatles", `= # =` for "The 1975"). The first
//! rule that finds a folder wins.

use std::path::PathBuf;

use tracing::debug;
use unicode_normalization::UnicodeNormalization;

use crate::folder_name::{bucket_label, bucket_label_for};
use crate::scanner::{FolderEntry, LibrarySnapshot};

const LEADING_ARTICLES: &[&str] = &["the", "a", "an"];
const UNSAFE_FOLDER_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];
const SUBSTITUTE_CHARS: &[char] = &['-', '_'];

/// One way of turning an artist name into the folder name to look for.
#[derive(Debug, Clone, Copy)]
pub struct NameRule {
    pub name: &'static str,
    /// Comparison key derived from the artist name, `None` when the rule
    /// does not apply to that name.
    pub artist_key: fn(&str) -> Option<String>,
    /// Comparison key derived from a folder name.
    pub folder_key: fn(&str) -> String,
}

impl NameRule {
    pub fn matches(&self, artist_name: &str, folder_name: &str) -> bool {
        match (self.artist_key)(artist_name) {
            Some(key) => (self.folder_key)(folder_name) == key,
            None => false,
        }
    }
}

pub const EXACT: NameRule = NameRule {
    name: "exact",
    artist_key: exact_key,
    folder_key: fold,
};

pub const ARTICLE_SUFFIX: NameRule = NameRule {
    name: "article_suffix",
    artist_key: article_suffix_key,
    folder_key: fold,
};

pub const UNSAFE_CHARS: NameRule = NameRule {
    name: "unsafe_chars",
    artist_key: unsafe_chars_key,
    folder_key: safe_fold,
};

pub const ARTICLE_SUFFIX_UNSAFE_CHARS: NameRule = NameRule {
    name: "article_suffix_unsafe_chars",
    artist_key: article_suffix_unsafe_chars_key,
    folder_key: safe_fold,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistFolderMatch {
    pub path: PathBuf,
    /// Name of the rule that found the folder.
    pub rule: &'static str,
    /// Bucket folder name when the artist folder was nested in one.
    pub bucket: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ArtistFolderLocator {
    rules: Vec<NameRule>,
}

impl Default for ArtistFolderLocator {
    fn default() -> Self {
        Self::new(vec![EXACT, ARTICLE_SUFFIX, UNSAFE_CHARS, ARTICLE_SUFFIX_UNSAFE_CHARS])
    }
}

impl ArtistFolderLocator {
    pub fn new(rules: Vec<NameRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[NameRule] {
        &self.rules
    }

    /// Find the folder for `artist_name` in `snapshot`, or `None` when no rule matches.
    pub fn locate(&self, snapshot: &LibrarySnapshot, artist_name: &str) -> Option<ArtistFolderMatch> {
        let top_level: Vec<&FolderEntry> = snapshot
            .top_level()
            .filter(|entry| entry.is_artist_folder_candidate)
            .collect();

        if let Some(found) = self.search(&top_level, artist_name, None) {
            return Some(found);
        }

        for label in bucket_labels(artist_name) {
            let Some(bucket) = snapshot
                .top_level()
                .find(|entry| bucket_label(&entry.name).as_deref() == Some(label.as_str()))
            else {
                continue;
            };

            let nested: Vec<&FolderEntry> = snapshot
                .children_of(&bucket.path)
                .filter(|entry| entry.is_artist_folder_candidate)
                .collect();
            if let Some(found) = self.search(&nested, artist_name, Some(&bucket.name)) {
                return Some(found);
            }
        }

        debug!(target: "library", artist = artist_name, "no artist folder found");
        None
    }

    fn search(
        &self,
        candidates: &[&FolderEntry],
        artist_name: &str,
        bucket: Option<&str>,
    ) -> Option<ArtistFolderMatch> {
        self.rules.iter().find_map(|rule| {
            // candidates come sorted by path, so the first hit is the lexicographic winner
            candidates
                .iter()
                .find(|entry| rule.matches(artist_name, &entry.name))
                .map(|entry| {
                    debug!(
                        target: "library",
                        artist = artist_name,
                        rule = rule.name,
                        path = %entry.path.display(),
                        "artist folder located"
                    );
                    ArtistFolderMatch {
                        path: entry.path.clone(),
                        rule: rule.name,
                        bucket: bucket.map(str::to_string),
                    }
                })
        })
    }
}

/// Buckets to look in: the one for the article-moved name first, then the
/// one for the name as written.
fn bucket_labels(artist_name: &str) -> Vec<String> {
    let mut labels = Vec::with_capacity(2);
    if let Some(moved) = move_leading_article(artist_name) {
        labels.push(bucket_label_for(&moved));
    }
    let plain = bucket_label_for(artist_name);
    if !labels.contains(&plain) {
        labels.push(plain);
    }
    labels
}

/// `The Beatles` becomes `Beatles, The`. Names without a leading article,
/// or consisting of only the article, give `None`.
pub fn move_leading_article(artist_name: &str) -> Option<String> {
    let trimmed = artist_name.trim();
    let (first, rest) = trimmed.split_once(char::is_whitespace)?;
    let rest = rest.trim();
    if rest.is_empty() {
        return None;
    }
    LEADING_ARTICLES
        .iter()
        .any(|article| article.eq_ignore_ascii_case(first))
        .then(|| format!("{rest}, {first}"))
}

fn fold(value: &str) -> String {
    value.trim().nfc().flat_map(char::to_lowercase).collect()
}

fn safe_fold(value: &str) -> String {
    fold(value)
        .chars()
        .map(|c| {
            if UNSAFE_FOLDER_CHARS.contains(&c) || SUBSTITUTE_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn exact_key(artist_name: &str) -> Option<String> {
    Some(fold(artist_name))
}

fn article_suffix_key(artist_name: &str) -> Option<String> {
    move_leading_article(artist_name).map(|moved| fold(&moved))
}

fn unsafe_chars_key(artist_name: &str) -> Option<String> {
    Some(safe_fold(artist_name))
}

fn article_suffix_unsafe_chars_key(artist_name: &str) -> Option<String> {
    move_leading_article(artist_name).map(|moved| safe_fold(&moved))
}
