// SPDX-License-Identifier: GPL-3.0-or-later
use anyhow::Result;
use curatarr_domain::{AlbumId, AlbumRecord, Artist, ArtistId, OwnershipStatus};

// ============================================================================
// Repository Traits
// ============================================================================

/// Outcome of an automatic ownership write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchUpdate {
    Applied,
    /// The album carries a manual override and was left untouched.
    ManualOverride,
    NotFound,
}

/// Artist repository
#[async_trait::async_trait]
pub trait ArtistRepository: Send + Sync {
    async fn create(&self, artist: Artist) -> Result<Artist>;
    async fn get_by_id(&self, id: ArtistId) -> Result<Option<Artist>>;
    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Artist>>;
    /// Store or clear the manually chosen folder. Returns false when the artist does not exist.
    async fn set_folder_link(&self, id: ArtistId, folder_link: Option<&str>) -> Result<bool>;
}

/// Album repository
///
/// Catalog fields (title, year, foreign id) and ownership fields are written
/// through separate operations so a catalog refresh never clobbers a match.
#[async_trait::async_trait]
pub trait AlbumRepository: Send + Sync {
    /// Insert a new album, or refresh the catalog fields of the album with the
    /// same `(artist_id, foreign_album_id)`. Ownership fields of an existing row are kept.
    async fn upsert(&self, album: AlbumRecord) -> Result<AlbumRecord>;
    async fn get_by_id(&self, id: AlbumId) -> Result<Option<AlbumRecord>>;
    async fn get_by_artist(&self, artist_id: ArtistId) -> Result<Vec<AlbumRecord>>;
    /// Write an automatic match result. Rows with `manual_override` set are never changed.
    async fn update_match(
        &self,
        id: AlbumId,
        status: OwnershipStatus,
        matched_folder_path: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<MatchUpdate>;
    /// Record a human decision and set `manual_override`.
    async fn set_manual_ownership(
        &self,
        id: AlbumId,
        status: OwnershipStatus,
        matched_folder_path: Option<&str>,
    ) -> Result<Option<AlbumRecord>>;
    /// Hand the album back to automatic matching. Ownership fields keep their
    /// values until the next reconciliation pass.
    async fn clear_manual_override(&self, id: AlbumId) -> Result<Option<AlbumRecord>>;
}
