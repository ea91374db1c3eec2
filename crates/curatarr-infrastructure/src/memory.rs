// SPDX-License-Identifier: GPL-3.0-or-later
//! In-process repository used by tests and by embedders that do not need persistence.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use anyhow::{anyhow, Result};
use chrono::Utc;
use curatarr_domain::{AlbumId, AlbumRecord, Artist, ArtistId, OwnershipStatus};

use crate::repositories::{AlbumRepository, ArtistRepository, MatchUpdate};

#[derive(Default)]
struct Tables {
    artists: HashMap<ArtistId, Artist>,
    albums: HashMap<AlbumId, AlbumRecord>,
}

/// Implements both repositories over shared maps.
#[derive(Default)]
pub struct InMemoryLibrary {
    tables: Mutex<Tables>,
    match_writes: Mutex<usize>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of successful `update_match` calls so far.
    pub fn match_writes(&self) -> usize {
        self.match_writes.lock().map(|count| *count).unwrap_or_default()
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| anyhow!("in-memory library lock poisoned"))
    }
}

#[async_trait::async_trait]
impl ArtistRepository for InMemoryLibrary {
    async fn create(&self, artist: Artist) -> Result<Artist> {
        self.tables()?.artists.insert(artist.id, artist.clone());
        Ok(artist)
    }

    async fn get_by_id(&self, id: ArtistId) -> Result<Option<Artist>> {
        Ok(self.tables()?.artists.get(&id).cloned())
    }

    async fn get_by_foreign_id(&self, foreign_id: &str) -> Result<Option<Artist>> {
        Ok(self
            .tables()?
            .artists
            .values()
            .find(|artist| artist.foreign_artist_id.as_deref() == Some(foreign_id))
            .cloned())
    }

    async fn set_folder_link(&self, id: ArtistId, folder_link: Option<&str>) -> Result<bool> {
        let mut tables = self.tables()?;
        let Some(artist) = tables.artists.get_mut(&id) else {
            return Ok(false);
        };
        artist.folder_link = folder_link.map(str::to_string);
        artist.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait::async_trait]
impl AlbumRepository for InMemoryLibrary {
    async fn upsert(&self, album: AlbumRecord) -> Result<AlbumRecord> {
        let mut tables = self.tables()?;
        if !tables.artists.contains_key(&album.artist_id) {
            return Err(anyhow!("artist {} does not exist", album.artist_id));
        }

        let existing = album.foreign_album_id.as_deref().and_then(|foreign_id| {
            tables.albums.values_mut().find(|stored| {
                stored.artist_id == album.artist_id
                    && stored.foreign_album_id.as_deref() == Some(foreign_id)
            })
        });

        if let Some(stored) = existing {
            stored.title = album.title;
            stored.release_year = album.release_year;
            stored.updated_at = album.updated_at;
            return Ok(stored.clone());
        }

        tables.albums.insert(album.id, album.clone());
        Ok(album)
    }

    async fn get_by_id(&self, id: AlbumId) -> Result<Option<AlbumRecord>> {
        Ok(self.tables()?.albums.get(&id).cloned())
    }

    async fn get_by_artist(&self, artist_id: ArtistId) -> Result<Vec<AlbumRecord>> {
        let mut albums: Vec<AlbumRecord> = self
            .tables()?
            .albums
            .values()
            .filter(|album| album.artist_id == artist_id)
            .cloned()
            .collect();
        albums.sort_by(|a, b| {
            (a.release_year, &a.title, a.id.0).cmp(&(b.release_year, &b.title, b.id.0))
        });
        Ok(albums)
    }

    async fn update_match(
        &self,
        id: AlbumId,
        status: OwnershipStatus,
        matched_folder_path: Option<&str>,
        confidence: Option<f64>,
    ) -> Result<MatchUpdate> {
        if status == OwnershipStatus::Owned && matched_folder_path.is_none() {
            return Err(anyhow!("owned album {id} needs a folder path"));
        }

        let mut tables = self.tables()?;
        let Some(album) = tables.albums.get_mut(&id) else {
            return Ok(MatchUpdate::NotFound);
        };
        if album.manual_override {
            return Ok(MatchUpdate::ManualOverride);
        }

        album.ownership_status = status;
        album.matched_folder_path = matched_folder_path.map(str::to_string);
        album.confidence = confidence;
        album.updated_at = Utc::now();
        drop(tables);

        if let Ok(mut count) = self.match_writes.lock() {
            *count += 1;
        }
        Ok(MatchUpdate::Applied)
    }

    async fn set_manual_ownership(
        &self,
        id: AlbumId,
        status: OwnershipStatus,
        matched_folder_path: Option<&str>,
    ) -> Result<Option<AlbumRecord>> {
        if status == OwnershipStatus::Owned && matched_folder_path.is_none() {
            return Err(anyhow!("owned album {id} needs a folder path"));
        }

        let mut tables = self.tables()?;
        Ok(tables.albums.get_mut(&id).map(|album| {
            album.ownership_status = status;
            album.matched_folder_path = matched_folder_path.map(str::to_string);
            album.confidence = None;
            album.manual_override = true;
            album.updated_at = Utc::now();
            album.clone()
        }))
    }

    async fn clear_manual_override(&self, id: AlbumId) -> Result<Option<AlbumRecord>> {
        let mut tables = self.tables()?;
        Ok(tables.albums.get_mut(&id).map(|album| {
            album.manual_override = false;
            album.updated_at = Utc::now();
            album.clone()
        }))
    }
}
