// SPDX-License-Identifier: GPL-3.0-or-later

//! Library directory scanning.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::error::ScanError;
use crate::folder_name::{is_grouping_bucket, parse_folder_name};
use crate::path_guard::PathGuard;

/// One directory observed during a scan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FolderEntry {
    pub path: PathBuf,
    pub name: String,
    pub parent_path: PathBuf,
    /// Levels below the library root (1 = direct child).
    pub depth: usize,
    pub is_artist_folder_candidate: bool,
    pub parsed_year: Option<i32>,
    pub parsed_title: Option<String>,
}

impl FolderEntry {
    /// Build an entry from a directory path. Only the name is inspected, the
    /// filesystem is not touched.
    pub fn from_path(path: impl Into<PathBuf>, depth: usize) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let parent_path = path.parent().map(Path::to_path_buf).unwrap_or_default();

        let parsed = parse_folder_name(&name);
        let (parsed_year, parsed_title) = match parsed.year {
            Some(year) => (Some(year), Some(parsed.title)),
            None => (None, None),
        };
        let is_artist_folder_candidate = parsed_year.is_none() && !is_grouping_bucket(&name);

        Self {
            path,
            name,
            parent_path,
            depth,
            is_artist_folder_candidate,
            parsed_year,
            parsed_title,
        }
    }

    pub fn is_album_folder(&self) -> bool {
        self.parsed_year.is_some()
    }
}

/// Immutable result of one scan pass. A new scan produces a new snapshot;
/// nothing updates one in place.
#[derive(Debug, Clone, Serialize)]
pub struct LibrarySnapshot {
    root: PathBuf,
    entries: Vec<FolderEntry>,
    permission_denied: usize,
    other_errors: usize,
}

impl LibrarySnapshot {
    pub fn new(
        root: impl Into<PathBuf>,
        mut entries: Vec<FolderEntry>,
        permission_denied: usize,
        other_errors: usize,
    ) -> Self {
        entries.sort_by(|left, right| left.path.cmp(&right.path));
        Self {
            root: root.into(),
            entries,
            permission_denied,
            other_errors,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn entries(&self) -> &[FolderEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Directories that could not be read and whose subtrees were skipped.
    pub fn permission_denied(&self) -> usize {
        self.permission_denied
    }

    pub fn other_errors(&self) -> usize {
        self.other_errors
    }

    pub fn top_level(&self) -> impl Iterator<Item = &FolderEntry> {
        self.entries.iter().filter(|entry| entry.depth == 1)
    }

    pub fn children_of<'a>(&'a self, parent: &'a Path) -> impl Iterator<Item = &'a FolderEntry> {
        self.entries
            .iter()
            .filter(move |entry| entry.parent_path == parent)
    }

    pub fn get(&self, path: &Path) -> Option<&FolderEntry> {
        self.entries
            .binary_search_by(|entry| entry.path.as_path().cmp(path))
            .ok()
            .map(|index| &self.entries[index])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanOptions {
    pub max_depth: usize,
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_depth: 3,
            follow_symlinks: false,
        }
    }
}

/// Walks the library root. Read-only: never creates, renames or removes anything.
#[derive(Debug, Clone)]
pub struct DirectoryScanner {
    guard: PathGuard,
    options: ScanOptions,
}

impl DirectoryScanner {
    pub fn new(guard: PathGuard, options: ScanOptions) -> Self {
        Self { guard, options }
    }

    pub fn guard(&self) -> &PathGuard {
        &self.guard
    }

    /// Walk the whole library root up to the configured depth.
    ///
    /// Unreadable directories are counted and skipped, they never fail the scan.
    pub fn scan(&self) -> LibrarySnapshot {
        let root = self.guard.root().to_path_buf();
        let snapshot = self.walk(&root, self.options.max_depth);
        info!(
            target: "library",
            root = %root.display(),
            folders = snapshot.len(),
            permission_denied = snapshot.permission_denied(),
            other_errors = snapshot.other_errors(),
            "library scan complete"
        );
        snapshot
    }

    /// Scan only the direct child folders of an already resolved directory.
    pub fn scan_children(&self, directory: &Path) -> Result<LibrarySnapshot, ScanError> {
        if !self.guard.contains(directory) {
            return Err(crate::SecurityError::OutsideRoot.into());
        }
        let metadata =
            fs::metadata(directory).map_err(|err| ScanError::from_io(directory, err))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(directory.to_path_buf()));
        }
        Ok(self.walk(directory, 1))
    }

    /// Single level listing of a root-relative directory, for folder pickers.
    pub fn list_directory(&self, relative_path: &str) -> Result<Vec<FolderEntry>, ScanError> {
        let directory = self.guard.resolve(relative_path)?;
        let metadata =
            fs::metadata(&directory).map_err(|err| ScanError::from_io(&directory, err))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(directory));
        }

        let base_depth = self.depth_of(&directory);
        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&directory).map_err(|err| ScanError::from_io(&directory, err))?;
        for entry in read_dir {
            let entry = entry.map_err(|err| ScanError::from_io(&directory, err))?;
            let path = entry.path();
            if !self.is_visible_directory(&path) {
                continue;
            }
            entries.push(FolderEntry::from_path(path, base_depth + 1));
        }
        entries.sort_by(|left, right| left.name.cmp(&right.name));
        Ok(entries)
    }

    fn walk(&self, start: &Path, max_depth: usize) -> LibrarySnapshot {
        let base_depth = self.depth_of(start);
        let mut entries = Vec::new();
        let mut permission_denied = 0;
        let mut other_errors = 0;

        let mut walker = WalkDir::new(start)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(self.options.follow_symlinks)
            .sort_by_file_name()
            .into_iter()
            // dot-directories and everything below them are not library content
            .filter_entry(|entry| entry.depth() == 0 || !is_hidden_name(entry.file_name()));

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                    if err.io_error().map(|io| io.kind()) == Some(ErrorKind::PermissionDenied) {
                        permission_denied += 1;
                        warn!(target: "library", path = %path.display(), "permission denied, skipping subtree");
                    } else {
                        other_errors += 1;
                        warn!(target: "library", path = %path.display(), error = %err, "scan error, skipping");
                    }
                    continue;
                }
            };

            if !entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path().to_path_buf();
            if entry.path_is_symlink() {
                // keep the link path so parent/child relations stay consistent
                let contained = path
                    .canonicalize()
                    .map(|target| self.guard.contains(&target))
                    .unwrap_or(false);
                if !contained {
                    debug!(target: "library", path = %path.display(), "symlink leaves library root, ignoring");
                    walker.skip_current_dir();
                    continue;
                }
            }

            entries.push(FolderEntry::from_path(path, base_depth + entry.depth()));
        }

        LibrarySnapshot::new(self.guard.root(), entries, permission_denied, other_errors)
    }

    fn depth_of(&self, path: &Path) -> usize {
        path.strip_prefix(self.guard.root())
            .map(|relative| relative.components().count())
            .unwrap_or(0)
    }

    fn is_visible_directory(&self, path: &Path) -> bool {
        match path.file_name() {
            Some(name) if !is_hidden_name(name) => {}
            _ => return false,
        }
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => {
                let is_link = fs::symlink_metadata(path)
                    .map(|meta| meta.file_type().is_symlink())
                    .unwrap_or(false);
                if !is_link {
                    return true;
                }
                self.options.follow_symlinks
                    && path
                        .canonicalize()
                        .map(|target| self.guard.contains(&target))
                        .unwrap_or(false)
            }
            _ => false,
        }
    }
}

fn is_hidden_name(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> (tempfile::TempDir, DirectoryScanner) {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let root = dir.path();
        for folder in [
            "Radiohead/[2007] In Rainbows",
            "Radiohead/[2000] Kid A",
            "Radiohead/artwork",
            "= # =/1975, The/[2013] The 1975",
            "= B =/Beatles, The/[1969] Abbey Road",
        ] {
            fs::create_dir_all(root.join(folder)).expect("fixture dir should be created");
        }
        fs::write(root.join("Radiohead").join("cover.jpg"), b"jpg").expect("file should exist");

        let guard = PathGuard::new(root).expect("guard should be created");
        (dir, DirectoryScanner::new(guard, ScanOptions::default()))
    }

    #[test]
    fn scan_records_directories_only() {
        let (_dir, scanner) = library();
        let snapshot = scanner.scan();

        assert!(snapshot.entries().iter().all(|entry| entry.name != "cover.jpg"));
        assert_eq!(snapshot.len(), 10);
        assert_eq!(snapshot.permission_denied(), 0);
    }

    #[test]
    fn scan_skips_dot_directories_and_their_contents() {
        let (dir, scanner) = library();
        fs::create_dir_all(dir.path().join(".stfolder").join("Radiohead").join("[2000] Kid A"))
            .expect("hidden fixture should be created");
        fs::create_dir_all(dir.path().join("Radiohead").join(".thumbnails"))
            .expect("hidden fixture should be created");

        let snapshot = scanner.scan();
        assert_eq!(snapshot.len(), 10);
        for entry in snapshot.entries() {
            let relative = scanner
                .guard()
                .relative_to_root(&entry.path)
                .expect("entries stay below the root");
            assert!(
                relative.split('/').all(|part| !part.starts_with('.')),
                "{relative} is inside a dot-directory"
            );
        }
    }

    #[test]
    fn entries_are_sorted_and_classified() {
        let (_dir, scanner) = library();
        let snapshot = scanner.scan();

        let paths: Vec<_> = snapshot.entries().iter().map(|e| e.path.clone()).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        assert_eq!(paths, sorted);

        let top: Vec<_> = snapshot.top_level().map(|e| e.name.as_str()).collect();
        assert_eq!(top, vec!["= # =", "= B =", "Radiohead"]);

        let radiohead = scanner.guard().root().join("Radiohead");
        let entry = snapshot.get(&radiohead).expect("artist folder should be scanned");
        assert!(entry.is_artist_folder_candidate);

        let albums: Vec<_> = snapshot
            .children_of(&radiohead)
            .filter(|e| e.is_album_folder())
            .map(|e| (e.parsed_year, e.parsed_title.clone()))
            .collect();
        assert_eq!(
            albums,
            vec![
                (Some(2000), Some("kid a".to_string())),
                (Some(2007), Some("in rainbows".to_string())),
            ]
        );
    }

    #[test]
    fn buckets_are_not_artist_candidates() {
        let (_dir, scanner) = library();
        let snapshot = scanner.scan();
        let bucket = snapshot
            .top_level()
            .find(|e| e.name == "= B =")
            .expect("bucket should be scanned");
        assert!(!bucket.is_artist_folder_candidate);
        assert!(bucket.parsed_year.is_none());
    }

    #[test]
    fn depth_limit_is_respected() {
        let (_dir, scanner) = library();
        let shallow = DirectoryScanner::new(
            scanner.guard().clone(),
            ScanOptions {
                max_depth: 1,
                follow_symlinks: false,
            },
        );
        let snapshot = shallow.scan();
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.entries().iter().all(|e| e.depth == 1));
    }

    #[test]
    fn scan_children_lists_one_level() {
        let (_dir, scanner) = library();
        let artist = scanner.guard().root().join("= B =").join("Beatles, The");
        let children = scanner.scan_children(&artist).expect("children should scan");
        assert_eq!(children.len(), 1);
        let album = &children.entries()[0];
        assert_eq!(album.depth, 3);
        assert_eq!(album.parsed_year, Some(1969));
        assert_eq!(album.parent_path, artist);
    }

    #[test]
    fn scan_children_rejects_paths_outside_root() {
        let (_dir, scanner) = library();
        let outside = tempfile::tempdir().expect("temp dir should be created");
        assert!(matches!(
            scanner.scan_children(outside.path()),
            Err(ScanError::Security(_))
        ));
    }

    #[test]
    fn list_directory_reports_missing_and_escaping_paths() {
        let (_dir, scanner) = library();

        let listing = scanner.list_directory("Radiohead").expect("listing should succeed");
        let names: Vec<_> = listing.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["[2000] Kid A", "[2007] In Rainbows", "artwork"]);

        assert!(matches!(
            scanner.list_directory("Nobody"),
            Err(ScanError::NotFound(_))
        ));
        assert!(matches!(
            scanner.list_directory("Radiohead/cover.jpg"),
            Err(ScanError::NotADirectory(_))
        ));
        assert!(matches!(
            scanner.list_directory("../.."),
            Err(ScanError::Security(_))
        ));
    }

    #[test]
    fn hidden_directories_are_not_listed() {
        let (_dir, scanner) = library();
        fs::create_dir(scanner.guard().root().join(".cache")).expect("dir should be created");
        let listing = scanner.list_directory("").expect("listing should succeed");
        assert!(listing.iter().all(|e| e.name != ".cache"));
    }

    #[cfg(unix)]
    #[test]
    fn unreadable_directory_is_skipped_and_counted() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, scanner) = library();
        let locked = scanner.guard().root().join("Locked");
        fs::create_dir_all(locked.join("[1999] Hidden")).expect("dir should be created");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000))
            .expect("permissions should be set");

        // root ignores permission bits, nothing to observe then
        let readable = fs::read_dir(&locked).is_ok();
        let snapshot = scanner.scan();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755))
            .expect("permissions should be restored");

        if !readable {
            assert_eq!(snapshot.permission_denied(), 1);
            assert!(snapshot.entries().iter().all(|e| e.name != "[1999] Hidden"));
            assert!(snapshot.get(&locked).is_some());
        }
        assert!(snapshot.len() >= 11);
    }

    #[cfg(unix)]
    #[test]
    fn symlinks_are_not_followed_by_default() {
        let (_dir, scanner) = library();
        let outside = tempfile::tempdir().expect("temp dir should be created");
        fs::create_dir(outside.path().join("[1990] Elsewhere")).expect("dir should be created");
        std::os::unix::fs::symlink(outside.path(), scanner.guard().root().join("Linked"))
            .expect("symlink should be created");

        let snapshot = scanner.scan();
        assert!(snapshot.entries().iter().all(|e| e.name != "Linked"));
        assert!(snapshot.entries().iter().all(|e| e.name != "[1990] Elsewhere"));
    }
}
