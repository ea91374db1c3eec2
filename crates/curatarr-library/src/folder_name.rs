// SPDX-License-Identifier: GPL-3.0-or-later

//! Folder naming conventions.
//!
//! Album folders are named `[YYYY] Title`. Artist folders may be grouped in
//! bucket folders named `= A =` (or `= # =` for names not starting with a letter).

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref ALBUM_FOLDER_REGEX: Regex =
        Regex::new(r"^\[(?P<year>\d{4})\](?P<title>.*)$").expect("valid album folder regex");
    static ref BUCKET_FOLDER_REGEX: Regex =
        Regex::new(r"^=\s*(?P<label>\p{Alphabetic}|#)\s*=$").expect("valid bucket regex");
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedFolderName {
    pub year: Option<i32>,
    /// Normalized title, see [`normalize_title`].
    pub title: String,
}

/// Split a folder name into an optional `[YYYY]` release year and a
/// normalized title.
///
/// A bracket that does not hold exactly four digits is ordinary text.
pub fn parse_folder_name(name: &str) -> ParsedFolderName {
    let trimmed = name.trim();

    if let Some(caps) = ALBUM_FOLDER_REGEX.captures(trimmed) {
        let year = caps
            .name("year")
            .and_then(|m| m.as_str().parse::<i32>().ok());
        let title = caps.name("title").map(|m| m.as_str()).unwrap_or_default();
        return ParsedFolderName {
            year,
            title: normalize_title(title),
        };
    }

    ParsedFolderName {
        year: None,
        title: normalize_title(trimmed),
    }
}

/// True when the name starts with a `[YYYY]` token.
pub fn is_album_folder_name(name: &str) -> bool {
    ALBUM_FOLDER_REGEX.is_match(name.trim())
}

/// Lowercase, drop punctuation (letters, digits and whitespace survive),
/// collapse whitespace runs and trim.
pub fn normalize_title(value: &str) -> String {
    value
        .nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn is_grouping_bucket(name: &str) -> bool {
    BUCKET_FOLDER_REGEX.is_match(name.trim())
}

/// Label of a bucket folder (`= a =` gives `A`), if the name is one.
pub fn bucket_label(name: &str) -> Option<String> {
    BUCKET_FOLDER_REGEX
        .captures(name.trim())
        .and_then(|caps| caps.name("label"))
        .map(|m| m.as_str().to_uppercase())
}

/// Bucket label an artist name sorts into: its uppercased first character when
/// that is a letter, `#` otherwise.
pub fn bucket_label_for(artist_name: &str) -> String {
    match artist_name.trim().chars().next() {
        Some(first) if first.is_alphabetic() => first.to_uppercase().collect(),
        _ => "#".to_string(),
    }
}
