// SPDX-License-Identifier: GPL-3.0-or-later
use std::sync::Arc;

use curatarr_config::AppConfig;
use curatarr_infrastructure::{AlbumRepository, ArtistRepository};
use tracing::info;

pub mod browse;
pub mod catalog;
pub mod manual;
pub mod matcher;
pub mod reconcile;

pub use browse::{BrowseEntry, BrowseError, BrowseListing, LibraryBrowser};
pub use catalog::{CatalogAlbum, CatalogClient, CatalogSyncError, CatalogSyncService, CatalogSyncSummary};
pub use manual::{ManualDecisionError, ManualDecisionService};
pub use matcher::{title_similarity, AlbumQuery, CandidateMatcher, FuzzyCandidateMatcher, MatchResult};
pub use reconcile::{ReconcileError, ReconcileSummary, ReconciliationEngine};

/// Shared services handed to the HTTP layer.
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub artists: Arc<dyn ArtistRepository>,
    pub albums: Arc<dyn AlbumRepository>,
    pub reconciler: Arc<ReconciliationEngine>,
    pub browser: LibraryBrowser,
    pub catalog: Arc<CatalogSyncService>,
    pub decisions: Arc<ManualDecisionService>,
}

impl AppState {
    pub fn new(
        config: AppConfig,
        artists: Arc<dyn ArtistRepository>,
        albums: Arc<dyn AlbumRepository>,
    ) -> Self {
        let library = config.library.clone();
        let matcher = Arc::new(FuzzyCandidateMatcher::new(library.similarity_threshold));
        let reconciler = Arc::new(ReconciliationEngine::new(
            library.clone(),
            artists.clone(),
            albums.clone(),
            matcher,
        ));
        let catalog = Arc::new(CatalogSyncService::new(artists.clone(), albums.clone()));
        let decisions = Arc::new(ManualDecisionService::new(
            library.clone(),
            artists.clone(),
            albums.clone(),
        ));

        Self {
            browser: LibraryBrowser::new(library),
            config,
            artists,
            albums,
            reconciler,
            catalog,
            decisions,
        }
    }

    pub fn on_start(&self) {
        info!(
            target: "application",
            library_root = ?self.config.library.root_path,
            similarity_threshold = self.config.library.similarity_threshold,
            "application state initialized"
        );
    }
}
