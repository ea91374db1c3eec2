// SPDX-License-Identifier: GPL-3.0-or-later
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Value Objects & IDs
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtistId(pub Uuid);

impl ArtistId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for ArtistId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ArtistId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ArtistId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AlbumId(pub Uuid);

impl AlbumId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for AlbumId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AlbumId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for AlbumId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// Enums
// ============================================================================

/// Whether a catalog album has a folder in the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnershipStatus {
    Owned,
    Missing,
    Ambiguous,
}

impl std::fmt::Display for OwnershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Owned => write!(f, "owned"),
            Self::Missing => write!(f, "missing"),
            Self::Ambiguous => write!(f, "ambiguous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownOwnershipStatus(pub String);

impl std::fmt::Display for UnknownOwnershipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unknown ownership status: {}", self.0)
    }
}

impl std::error::Error for UnknownOwnershipStatus {}

impl FromStr for OwnershipStatus {
    type Err = UnknownOwnershipStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "owned" => Ok(Self::Owned),
            "missing" => Ok(Self::Missing),
            "ambiguous" => Ok(Self::Ambiguous),
            other => Err(UnknownOwnershipStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Entities
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Artist {
    pub id: ArtistId,
    pub name: String,
    pub foreign_artist_id: Option<String>,
    /// Folder chosen by a human, relative to the library root. Takes precedence
    /// over folder lookup by name.
    pub folder_link: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artist {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ArtistId::new(),
            name: name.into(),
            foreign_artist_id: None,
            folder_link: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A catalog album as seen by reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlbumRecord {
    pub id: AlbumId,
    pub artist_id: ArtistId,
    /// Stable identifier assigned by the external metadata catalog.
    pub foreign_album_id: Option<String>,
    pub title: String,
    pub release_year: Option<i32>,
    pub ownership_status: OwnershipStatus,
    /// Library-root-relative folder path of the matched album folder.
    pub matched_folder_path: Option<String>,
    pub confidence: Option<f64>,
    /// Set once a human decided status or path; automatic passes leave the
    /// ownership fields alone from then on.
    pub manual_override: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AlbumRecord {
    pub fn new(artist_id: ArtistId, title: impl Into<String>, release_year: Option<i32>) -> Self {
        let now = Utc::now();
        Self {
            id: AlbumId::new(),
            artist_id,
            foreign_album_id: None,
            title: title.into(),
            release_year,
            ownership_status: OwnershipStatus::Missing,
            matched_folder_path: None,
            confidence: None,
            manual_override: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// True when the automatic ownership fields already hold these values.
    pub fn has_match(
        &self,
        status: OwnershipStatus,
        path: Option<&str>,
        confidence: Option<f64>,
    ) -> bool {
        self.ownership_status == status
            && self.matched_folder_path.as_deref() == path
            && self.confidence == confidence
    }
}

// ============================================================================
// Domain Validation
// ============================================================================

/// Four-digit years, the only ones an album folder name can carry.
pub const RELEASE_YEAR_RANGE: std::ops::RangeInclusive<i32> = 1000..=9999;

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Join a list of validation failures into one message.
pub fn describe_validation_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

pub trait Validate {
    fn validate(&self) -> Result<(), Vec<ValidationError>>;
}

impl Validate for Artist {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.name.trim().is_empty() {
            errors.push(ValidationError {
                field: "name",
                message: "name cannot be empty".into(),
            });
        }
        if let Some(link) = &self.folder_link {
            if link.trim().is_empty() {
                errors.push(ValidationError {
                    field: "folder_link",
                    message: "folder link cannot be empty when provided".into(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

impl Validate for AlbumRecord {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();
        if self.title.trim().is_empty() {
            errors.push(ValidationError {
                field: "title",
                message: "title cannot be empty".into(),
            });
        }
        if let Some(year) = self.release_year {
            if !RELEASE_YEAR_RANGE.contains(&year) {
                errors.push(ValidationError {
                    field: "release_year",
                    message: format!(
                        "release year must be within {}..={}",
                        RELEASE_YEAR_RANGE.start(),
                        RELEASE_YEAR_RANGE.end()
                    ),
                });
            }
        }
        if self.ownership_status == OwnershipStatus::Owned && self.matched_folder_path.is_none() {
            errors.push(ValidationError {
                field: "matched_folder_path",
                message: "owned albums must reference a folder".into(),
            });
        }
        if let Some(confidence) = self.confidence {
            if !(0.0..=1.0).contains(&confidence) {
                errors.push(ValidationError {
                    field: "confidence",
                    message: "confidence must be within [0, 1]".into(),
                });
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
