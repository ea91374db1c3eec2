// SPDX-License-Identifier: GPL-3.0-or-later
//! Catalog album import.
//!
//! Albums come from an external metadata catalog keyed by their foreign id.
//! Importing refreshes title and year but never touches ownership, so a
//! catalog refresh cannot undo a reconciliation pass or a manual decision.

use std::collections::HashSet;
use std::sync::Arc;

use curatarr_domain::{describe_validation_errors, AlbumRecord, ArtistId, Validate};
use curatarr_infrastructure::{AlbumRepository, ArtistRepository};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogAlbum {
    pub foreign_album_id: String,
    pub title: String,
    pub release_year: Option<i32>,
}

/// Read-only source of album lists.
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    async fn fetch_albums(&self, artist_foreign_id: &str) -> anyhow::Result<Vec<CatalogAlbum>>;
}

#[derive(Debug, Error)]
pub enum CatalogSyncError {
    #[error("artist {0} not found")]
    ArtistNotFound(ArtistId),

    #[error("artist {0} has no catalog id")]
    MissingForeignId(ArtistId),

    #[error("invalid catalog album: {0}")]
    InvalidAlbum(String),

    #[error("catalog request failed: {0}")]
    Catalog(#[source] anyhow::Error),

    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CatalogSyncSummary {
    pub received: usize,
    pub inserted: usize,
    pub refreshed: usize,
}

pub struct CatalogSyncService {
    artists: Arc<dyn ArtistRepository>,
    albums: Arc<dyn AlbumRepository>,
}

impl CatalogSyncService {
    pub fn new(artists: Arc<dyn ArtistRepository>, albums: Arc<dyn AlbumRepository>) -> Self {
        Self { artists, albums }
    }

    /// Pull the album list for `artist_id` from `client` and import it.
    pub async fn sync_artist(
        &self,
        client: &dyn CatalogClient,
        artist_id: ArtistId,
    ) -> Result<CatalogSyncSummary, CatalogSyncError> {
        let artist = self
            .artists
            .get_by_id(artist_id)
            .await?
            .ok_or(CatalogSyncError::ArtistNotFound(artist_id))?;
        let foreign_id = artist
            .foreign_artist_id
            .as_deref()
            .ok_or(CatalogSyncError::MissingForeignId(artist_id))?;

        let fetched = client
            .fetch_albums(foreign_id)
            .await
            .map_err(CatalogSyncError::Catalog)?;
        self.import_albums(artist_id, fetched).await
    }

    /// Upsert `albums` for `artist_id`. New albums start `Missing`.
    pub async fn import_albums(
        &self,
        artist_id: ArtistId,
        albums: Vec<CatalogAlbum>,
    ) -> Result<CatalogSyncSummary, CatalogSyncError> {
        if self.artists.get_by_id(artist_id).await?.is_none() {
            return Err(CatalogSyncError::ArtistNotFound(artist_id));
        }

        let known: HashSet<String> = self
            .albums
            .get_by_artist(artist_id)
            .await?
            .into_iter()
            .filter_map(|album| album.foreign_album_id)
            .collect();

        let mut summary = CatalogSyncSummary {
            received: albums.len(),
            ..CatalogSyncSummary::default()
        };

        for catalog_album in albums {
            let mut record =
                AlbumRecord::new(artist_id, catalog_album.title.trim(), catalog_album.release_year);
            record.foreign_album_id = Some(catalog_album.foreign_album_id.clone());
            record
                .validate()
                .map_err(|errors| CatalogSyncError::InvalidAlbum(describe_validation_errors(&errors)))?;

            let stored = self.albums.upsert(record).await?;
            if known.contains(&catalog_album.foreign_album_id) {
                summary.refreshed += 1;
            } else {
                summary.inserted += 1;
            }
            debug!(target: "catalog", album_id = %stored.id, title = %stored.title, "catalog album stored");
        }

        info!(
            target: "catalog",
            %artist_id,
            received = summary.received,
            inserted = summary.inserted,
            refreshed = summary.refreshed,
            "catalog import complete"
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use curatarr_domain::{Artist, OwnershipStatus};
    use curatarr_infrastructure::InMemoryLibrary;

    struct FixedCatalog(Vec<CatalogAlbum>);

    #[async_trait::async_trait]
    impl CatalogClient for FixedCatalog {
        async fn fetch_albums(&self, artist_foreign_id: &str) -> anyhow::Result<Vec<CatalogAlbum>> {
            assert_eq!(artist_foreign_id, "mb-radiohead");
            Ok(self.0.clone())
        }
    }

    fn album(id: &str, title: &str, year: i32) -> CatalogAlbum {
        CatalogAlbum {
            foreign_album_id: id.to_string(),
            title: title.to_string(),
            release_year: Some(year),
        }
    }

    async fn service() -> (Arc<InMemoryLibrary>, CatalogSyncService, Artist) {
        let library = Arc::new(InMemoryLibrary::new());
        let mut artist = Artist::new("Radiohead");
        artist.foreign_artist_id = Some("mb-radiohead".to_string());
        let artist = ArtistRepository::create(library.as_ref(), artist).await.unwrap();
        let service = CatalogSyncService::new(library.clone(), library.clone());
        (library, service, artist)
    }

    #[tokio::test]
    async fn sync_inserts_then_refreshes_without_touching_ownership() {
        let (library, service, artist) = service().await;
        let client = FixedCatalog(vec![album("mb-1", "In Rainbows", 2007), album("mb-2", "Kid A", 2000)]);

        let first = service.sync_artist(&client, artist.id).await.unwrap();
        assert_eq!(first.inserted, 2);
        assert_eq!(first.refreshed, 0);

        let stored = library.get_by_artist(artist.id).await.unwrap();
        assert!(stored
            .iter()
            .all(|album| album.ownership_status == OwnershipStatus::Missing));
        let kid_a = stored.iter().find(|album| album.title == "Kid A").unwrap();
        library
            .set_manual_ownership(kid_a.id, OwnershipStatus::Owned, Some("Radiohead/Kid A"))
            .await
            .unwrap();

        let second = service.sync_artist(&client, artist.id).await.unwrap();
        assert_eq!(second.inserted, 0);
        assert_eq!(second.refreshed, 2);

        let kid_a = AlbumRepository::get_by_id(library.as_ref(), kid_a.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(kid_a.ownership_status, OwnershipStatus::Owned);
        assert!(kid_a.manual_override);
    }

    #[tokio::test]
    async fn artist_without_catalog_id_cannot_sync() {
        let (library, service, _) = service().await;
        let local = ArtistRepository::create(library.as_ref(), Artist::new("Local Band"))
            .await
            .unwrap();
        let client = FixedCatalog(Vec::new());
        assert!(matches!(
            service.sync_artist(&client, local.id).await,
            Err(CatalogSyncError::MissingForeignId(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_years_are_rejected() {
        let (library, service, artist) = service().await;
        for year in [i32::MIN, i32::MAX] {
            let result = service
                .import_albums(artist.id, vec![album("mb-x", "Kid A", year)])
                .await;
            assert!(matches!(result, Err(CatalogSyncError::InvalidAlbum(_))), "year {year}");
        }
        assert!(library.get_by_artist(artist.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_titles_are_rejected() {
        let (_, service, artist) = service().await;
        let result = service
            .import_albums(artist.id, vec![album("mb-x", "   ", 2001)])
            .await;
        assert!(matches!(result, Err(CatalogSyncError::InvalidAlbum(_))));
    }
}
