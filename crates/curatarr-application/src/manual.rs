// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use curatarr_config::LibraryConfig;
use curatarr_domain::{AlbumId, AlbumRecord, ArtistId, OwnershipStatus};
use curatarr_infrastructure::{AlbumRepository, ArtistRepository};
use curatarr_library::{PathGuard, SecurityError};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum ManualDecisionError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("folder does not exist: {0}")]
    FolderNotFound(String),

    #[error("artist {0} not found")]
    ArtistNotFound(ArtistId),

    #[error("album {0} not found")]
    AlbumNotFound(AlbumId),

    #[error("invalid decision: {0}")]
    Validation(String),

    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

/// Decisions taken by a person: artist folder links and album ownership.
///
/// Every folder is checked against the library root and stored root-relative.
pub struct ManualDecisionService {
    config: LibraryConfig,
    artists: Arc<dyn ArtistRepository>,
    albums: Arc<dyn AlbumRepository>,
}

impl ManualDecisionService {
    pub fn new(
        config: LibraryConfig,
        artists: Arc<dyn ArtistRepository>,
        albums: Arc<dyn AlbumRepository>,
    ) -> Self {
        Self {
            config,
            artists,
            albums,
        }
    }

    /// Link `artist_id` to a folder, or remove the link with `None`.
    /// Returns the stored root-relative path.
    pub async fn link_artist_folder(
        &self,
        artist_id: ArtistId,
        folder: Option<&str>,
    ) -> Result<Option<String>, ManualDecisionError> {
        let relative = match folder {
            Some(folder) => Some(self.existing_folder(folder)?),
            None => None,
        };

        if !self
            .artists
            .set_folder_link(artist_id, relative.as_deref())
            .await?
        {
            return Err(ManualDecisionError::ArtistNotFound(artist_id));
        }

        info!(target: "application", %artist_id, folder = ?relative, "artist folder link updated");
        Ok(relative)
    }

    /// Pin the ownership of an album. Later reconciliation passes leave it alone.
    pub async fn set_album_ownership(
        &self,
        album_id: AlbumId,
        status: OwnershipStatus,
        folder: Option<&str>,
    ) -> Result<AlbumRecord, ManualDecisionError> {
        let relative = match (status, folder) {
            (OwnershipStatus::Owned, None) => {
                return Err(ManualDecisionError::Validation(
                    "an owned album needs a folder".to_string(),
                ))
            }
            (OwnershipStatus::Missing, _) => None,
            (_, Some(folder)) => Some(self.existing_folder(folder)?),
            (_, None) => None,
        };

        let album = self
            .albums
            .set_manual_ownership(album_id, status, relative.as_deref())
            .await?
            .ok_or(ManualDecisionError::AlbumNotFound(album_id))?;

        info!(target: "application", %album_id, %status, folder = ?relative, "manual ownership set");
        Ok(album)
    }

    /// Hand an album back to automatic matching.
    pub async fn clear_album_override(
        &self,
        album_id: AlbumId,
    ) -> Result<AlbumRecord, ManualDecisionError> {
        let album = self
            .albums
            .clear_manual_override(album_id)
            .await?
            .ok_or(ManualDecisionError::AlbumNotFound(album_id))?;
        info!(target: "application", %album_id, "manual override cleared");
        Ok(album)
    }

    fn existing_folder(&self, folder: &str) -> Result<String, ManualDecisionError> {
        let root = self.config.root_path.as_deref().ok_or_else(|| {
            ManualDecisionError::Configuration("library.root_path is not configured".to_string())
        })?;
        let guard = PathGuard::new(root).map_err(|err| {
            ManualDecisionError::Configuration(format!("library root is unusable: {err}"))
        })?;

        let resolved = guard.resolve(folder)?;
        if !resolved.is_dir() {
            return Err(ManualDecisionError::FolderNotFound(folder.to_string()));
        }
        let relative = guard.relative_to_root(&resolved).unwrap_or_default();
        if relative.is_empty() {
            return Err(ManualDecisionError::Validation(
                "the library root itself cannot be linked".to_string(),
            ));
        }
        Ok(relative)
    }
}
