// SPDX-License-Identifier: GPL-3.0-or-later
//! One reconciliation pass: find an artist's folder, match every catalog
//! album against its `[YYYY] Title` children and persist the verdicts.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use curatarr_config::LibraryConfig;
use curatarr_domain::{ArtistId, OwnershipStatus};
use curatarr_infrastructure::{AlbumRepository, ArtistRepository, MatchUpdate};
use curatarr_library::{
    ArtistFolderLocator, DirectoryScanner, FolderEntry, PathGuard, ScanError, ScanOptions,
    SecurityError,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::matcher::{AlbumQuery, CandidateMatcher};

#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("reconciliation already running for artist {0}")]
    ConcurrentOperation(ArtistId),

    #[error("artist {0} not found")]
    ArtistNotFound(ArtistId),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("library scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("repository error: {0}")]
    Repository(#[from] anyhow::Error),

    #[error("scan task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Counts for one pass. `matched` covers `Owned` and `Ambiguous` verdicts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileSummary {
    pub scanned_folders: usize,
    pub matched: usize,
    pub missing: usize,
    pub ambiguous: usize,
    pub skipped_overrides: usize,
    pub permission_denied: usize,
    /// Root-relative path of the artist folder, when one was found.
    pub artist_folder: Option<String>,
}

/// Where the album folders of one artist were looked for.
struct ArtistFolder {
    guard: PathGuard,
    path: Option<PathBuf>,
    candidates: Vec<FolderEntry>,
    scanned_folders: usize,
    permission_denied: usize,
}

type InFlight = Arc<Mutex<HashSet<ArtistId>>>;

/// Marks an artist as being reconciled until dropped.
struct InFlightGuard {
    registry: InFlight,
    artist_id: ArtistId,
}

impl InFlightGuard {
    fn acquire(registry: &InFlight, artist_id: ArtistId) -> Result<Self, ReconcileError> {
        let mut running = registry.lock().unwrap_or_else(PoisonError::into_inner);
        if !running.insert(artist_id) {
            return Err(ReconcileError::ConcurrentOperation(artist_id));
        }
        Ok(Self {
            registry: Arc::clone(registry),
            artist_id,
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.artist_id);
    }
}

pub struct ReconciliationEngine {
    config: LibraryConfig,
    artists: Arc<dyn ArtistRepository>,
    albums: Arc<dyn AlbumRepository>,
    matcher: Arc<dyn CandidateMatcher>,
    locator: ArtistFolderLocator,
    in_flight: InFlight,
}

impl ReconciliationEngine {
    pub fn new(
        config: LibraryConfig,
        artists: Arc<dyn ArtistRepository>,
        albums: Arc<dyn AlbumRepository>,
        matcher: Arc<dyn CandidateMatcher>,
    ) -> Self {
        Self {
            config,
            artists,
            albums,
            matcher,
            locator: ArtistFolderLocator::default(),
            in_flight: Arc::default(),
        }
    }

    pub fn with_locator(mut self, locator: ArtistFolderLocator) -> Self {
        self.locator = locator;
        self
    }

    /// True while a pass for `artist_id` is running.
    pub fn is_running(&self, artist_id: ArtistId) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&artist_id)
    }

    /// Run one pass for `artist_id`. Albums with a manual override are left alone.
    ///
    /// A missing artist folder is not an error: every album it would hold
    /// becomes `Missing`.
    #[tracing::instrument(target = "reconcile", skip_all, fields(artist_id = %artist_id))]
    pub async fn reconcile(&self, artist_id: ArtistId) -> Result<ReconcileSummary, ReconcileError> {
        let root = self.config.root_path.clone().ok_or_else(|| {
            ReconcileError::Configuration("library.root_path is not configured".to_string())
        })?;

        let _in_flight = InFlightGuard::acquire(&self.in_flight, artist_id)?;

        let artist = self
            .artists
            .get_by_id(artist_id)
            .await?
            .ok_or(ReconcileError::ArtistNotFound(artist_id))?;
        let albums = self.albums.get_by_artist(artist_id).await?;

        let options = ScanOptions {
            max_depth: self.config.max_scan_depth,
            follow_symlinks: self.config.follow_symlinks,
        };
        let locator = self.locator.clone();
        let artist_name = artist.name.clone();
        let folder_link = artist.folder_link.clone();
        let folder = tokio::task::spawn_blocking(move || {
            find_artist_folder(&root, options, &locator, &artist_name, folder_link.as_deref())
        })
        .await??;

        let mut summary = ReconcileSummary {
            scanned_folders: folder.scanned_folders,
            permission_denied: folder.permission_denied,
            artist_folder: folder
                .path
                .as_deref()
                .and_then(|path| folder.guard.relative_to_root(path)),
            ..ReconcileSummary::default()
        };

        for album in &albums {
            if album.manual_override {
                debug!(target: "reconcile", album_id = %album.id, "manual override, skipping");
                summary.skipped_overrides += 1;
                continue;
            }

            let result = self
                .matcher
                .match_album(&AlbumQuery::from(album), &folder.candidates);
            let relative = result
                .folder_path
                .as_deref()
                .and_then(|path| folder.guard.relative_to_root(path));
            let (status, path, confidence) = match (result.status, relative) {
                (OwnershipStatus::Missing, _) | (_, None) => (OwnershipStatus::Missing, None, None),
                (status, Some(path)) => (status, Some(path), Some(result.confidence)),
            };

            if !album.has_match(status, path.as_deref(), confidence) {
                let update = self
                    .albums
                    .update_match(album.id, status, path.as_deref(), confidence)
                    .await?;
                match update {
                    MatchUpdate::Applied => {
                        info!(
                            target: "reconcile",
                            album_id = %album.id,
                            title = %album.title,
                            from = %album.ownership_status,
                            to = %status,
                            ?path,
                            "album ownership updated"
                        );
                    }
                    MatchUpdate::ManualOverride => {
                        // overridden after the albums were loaded
                        summary.skipped_overrides += 1;
                        continue;
                    }
                    MatchUpdate::NotFound => {
                        warn!(target: "reconcile", album_id = %album.id, "album disappeared during reconciliation");
                        continue;
                    }
                }
            }

            match status {
                OwnershipStatus::Owned => summary.matched += 1,
                OwnershipStatus::Ambiguous => {
                    summary.matched += 1;
                    summary.ambiguous += 1;
                }
                OwnershipStatus::Missing => summary.missing += 1,
            }
        }

        info!(
            target: "reconcile",
            artist = %artist.name,
            scanned_folders = summary.scanned_folders,
            matched = summary.matched,
            missing = summary.missing,
            ambiguous = summary.ambiguous,
            skipped_overrides = summary.skipped_overrides,
            "reconciliation complete"
        );
        Ok(summary)
    }
}

fn find_artist_folder(
    root: &Path,
    options: ScanOptions,
    locator: &ArtistFolderLocator,
    artist_name: &str,
    folder_link: Option<&str>,
) -> Result<ArtistFolder, ReconcileError> {
    let guard = PathGuard::new(root)?;
    let scanner = DirectoryScanner::new(guard.clone(), options);

    if let Some(link) = folder_link {
        let path = guard.resolve(link)?;
        return match scanner.scan_children(&path) {
            Ok(snapshot) => Ok(ArtistFolder {
                guard,
                candidates: album_folders(snapshot.entries().iter()),
                scanned_folders: snapshot.len(),
                permission_denied: snapshot.permission_denied(),
                path: Some(path),
            }),
            Err(ScanError::NotFound(_) | ScanError::NotADirectory(_)) => {
                warn!(target: "reconcile", link, "linked artist folder no longer exists");
                Ok(ArtistFolder::not_located(guard, 0))
            }
            Err(ScanError::PermissionDenied(_)) => {
                warn!(target: "reconcile", link, "linked artist folder is not readable");
                Ok(ArtistFolder::not_located(guard, 1))
            }
            Err(err) => Err(err.into()),
        };
    }

    let snapshot = scanner.scan();
    let located = locator.locate(&snapshot, artist_name);
    let Some(found) = located else {
        debug!(target: "reconcile", artist = artist_name, "artist folder not located");
        return Ok(ArtistFolder {
            guard,
            path: None,
            candidates: Vec::new(),
            scanned_folders: snapshot.len(),
            permission_denied: snapshot.permission_denied(),
        });
    };

    Ok(ArtistFolder {
        candidates: album_folders(snapshot.children_of(&found.path)),
        scanned_folders: snapshot.len(),
        permission_denied: snapshot.permission_denied(),
        path: Some(found.path),
        guard,
    })
}

impl ArtistFolder {
    fn not_located(guard: PathGuard, permission_denied: usize) -> Self {
        Self {
            guard,
            path: None,
            candidates: Vec::new(),
            scanned_folders: 0,
            permission_denied,
        }
    }
}

fn album_folders<'a>(entries: impl Iterator<Item = &'a FolderEntry>) -> Vec<FolderEntry> {
    entries
        .filter(|entry| entry.is_album_folder())
        .cloned()
        .collect()
}
