// SPDX-License-Identifier: GPL-3.0-or-later
use curatarr_config::LibraryConfig;
use curatarr_library::{DirectoryScanner, PathGuard, ScanError, ScanOptions, SecurityError};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BrowseError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error(transparent)]
    Security(#[from] SecurityError),

    #[error("path does not exist: {0}")]
    NotFound(String),

    #[error("path is not a directory: {0}")]
    NotADirectory(String),

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseEntry {
    pub name: String,
    /// Root-relative, `/`-separated.
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BrowseListing {
    /// Root-relative path of the listed directory, empty for the root itself.
    pub path: String,
    /// Root-relative parent, `None` at the root.
    pub parent: Option<String>,
    pub entries: Vec<BrowseEntry>,
}

/// Single-level directory listings below the library root, for picking folders by hand.
#[derive(Debug, Clone)]
pub struct LibraryBrowser {
    config: LibraryConfig,
}

impl LibraryBrowser {
    pub fn new(config: LibraryConfig) -> Self {
        Self { config }
    }

    /// List the child directories of `relative_path`. Blocking; call from a
    /// blocking context.
    ///
    /// Paths that fail containment are rejected before existence is checked.
    pub fn browse(&self, relative_path: &str) -> Result<BrowseListing, BrowseError> {
        let root = self.config.root_path.as_deref().ok_or_else(|| {
            BrowseError::Configuration("library.root_path is not configured".to_string())
        })?;
        let guard = PathGuard::new(root).map_err(|err| {
            BrowseError::Configuration(format!("library root is unusable: {err}"))
        })?;

        let resolved = guard.resolve(relative_path)?;
        let path = guard.relative_to_root(&resolved).unwrap_or_default();

        let scanner = DirectoryScanner::new(
            guard.clone(),
            ScanOptions {
                max_depth: 1,
                follow_symlinks: self.config.follow_symlinks,
            },
        );
        let children = scanner
            .list_directory(relative_path)
            .map_err(|err| browse_error(err, &path))?;

        let entries = children
            .into_iter()
            .filter_map(|entry| {
                guard.relative_to_root(&entry.path).map(|path| BrowseEntry {
                    name: entry.name,
                    path,
                })
            })
            .collect::<Vec<_>>();

        debug!(target: "library", path = %path, entries = entries.len(), "directory listed");
        Ok(BrowseListing {
            parent: parent_of(&path),
            path,
            entries,
        })
    }
}

fn browse_error(err: ScanError, path: &str) -> BrowseError {
    match err {
        ScanError::Security(err) => BrowseError::Security(err),
        ScanError::NotFound(_) => BrowseError::NotFound(path.to_string()),
        ScanError::NotADirectory(_) => BrowseError::NotADirectory(path.to_string()),
        ScanError::PermissionDenied(_) => BrowseError::PermissionDenied(path.to_string()),
        other => BrowseError::Io(other.to_string()),
    }
}

fn parent_of(path: &str) -> Option<String> {
    if path.is_empty() {
        return None;
    }
    Some(
        path.rsplit_once('/')
            .map(|(parent, _)| parent.to_string())
            .unwrap_or_default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn browser() -> (tempfile::TempDir, LibraryBrowser) {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let root = dir.path();
        fs::create_dir_all(root.join("= B =").join("Beatles, The").join("[1969] Abbey Road")).unwrap();
        fs::create_dir_all(root.join("Radiohead").join("[2007] In Rainbows")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("Radiohead").join("cover.jpg"), b"jpg").unwrap();
        let config = LibraryConfig::with_root(root);
        (dir, LibraryBrowser::new(config))
    }

    fn names(listing: &BrowseListing) -> Vec<&str> {
        listing.entries.iter().map(|entry| entry.name.as_str()).collect()
    }

    #[test]
    fn root_listing_hides_dot_directories() {
        let (_dir, browser) = browser();
        let listing = browser.browse("").unwrap();
        assert_eq!(listing.path, "");
        assert_eq!(listing.parent, None);
        assert_eq!(names(&listing), vec!["= B =", "Radiohead"]);
        assert_eq!(listing.entries[0].path, "= B =");
    }

    #[test]
    fn nested_listing_returns_relative_paths_and_skips_files() {
        let (_dir, browser) = browser();
        let listing = browser.browse("= B =/Beatles, The").unwrap();
        assert_eq!(listing.parent.as_deref(), Some("= B ="));
        assert_eq!(
            listing.entries,
            vec![BrowseEntry {
                name: "[1969] Abbey Road".to_string(),
                path: "= B =/Beatles, The/[1969] Abbey Road".to_string(),
            }]
        );

        let listing = browser.browse("Radiohead").unwrap();
        assert_eq!(listing.parent.as_deref(), Some(""));
        assert_eq!(names(&listing), vec!["[2007] In Rainbows"]);
    }

    #[test]
    fn traversal_is_a_security_error_not_missing() {
        let (_dir, browser) = browser();
        assert!(matches!(
            browser.browse("../../etc"),
            Err(BrowseError::Security(SecurityError::OutsideRoot))
        ));
        assert!(matches!(
            browser.browse("Nobody"),
            Err(BrowseError::NotFound(path)) if path == "Nobody"
        ));
    }

    #[test]
    fn files_are_not_browsable() {
        let (_dir, browser) = browser();
        assert!(matches!(
            browser.browse("Radiohead/cover.jpg"),
            Err(BrowseError::NotADirectory(_))
        ));
    }

    #[test]
    fn unconfigured_root_is_a_configuration_error() {
        let browser = LibraryBrowser::new(LibraryConfig::default());
        assert!(matches!(browser.browse(""), Err(BrowseError::Configuration(_))));
    }
}
