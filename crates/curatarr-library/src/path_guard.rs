// SPDX-License-Identifier: GPL-3.0-or-later

//! Containment checks for paths supplied by API callers.
//!
//! The only authoritative control is the final prefix comparison against the
//! canonical root in [`PathGuard::resolve`]. Everything before it only narrows
//! what reaches that check.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::{debug, warn};

use crate::error::{ScanError, SecurityError};

const RESERVED_DEVICE_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Resolves root-relative paths and guarantees the result stays below the root.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
    reject_reserved_names: bool,
}

impl PathGuard {
    /// Create a guard for `root`. The root must exist and be a directory; it is
    /// canonicalized once here so every later comparison is against the real path.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ScanError> {
        let root = root.as_ref();
        let canonical = root
            .canonicalize()
            .map_err(|err| ScanError::from_io(root, err))?;
        if !canonical.is_dir() {
            return Err(ScanError::NotADirectory(canonical));
        }

        Ok(Self {
            root: canonical,
            reject_reserved_names: cfg!(windows),
        })
    }

    /// Toggle the Windows device name check (on by default only on Windows).
    pub fn with_reserved_name_check(mut self, enabled: bool) -> Self {
        self.reject_reserved_names = enabled;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `user_path` (percent-encoded, root-relative) to an absolute path
    /// that is either the root itself or below it.
    ///
    /// A path that does not exist is still returned; existence is the
    /// caller's concern.
    pub fn resolve(&self, user_path: &str) -> Result<PathBuf, SecurityError> {
        let decoded = percent_decode_str(user_path)
            .decode_utf8()
            .map_err(|_| SecurityError::Decode)?;

        if decoded.contains('\0') {
            return Err(SecurityError::NullByte);
        }

        let mut joined = self.root.clone();
        for segment in decoded.split(['/', '\\']) {
            match segment {
                "" | "." => continue,
                ".." => {
                    // may climb above the root; the containment check below rejects it
                    joined.pop();
                }
                name => {
                    if self.reject_reserved_names && is_reserved_device_name(name) {
                        warn!(target: "library", segment = name, "rejected reserved device name");
                        return Err(SecurityError::ReservedName(name.to_string()));
                    }
                    joined.push(name);
                }
            }
        }

        let resolved = canonicalize_existing_prefix(&joined);
        if !self.contains(&resolved) {
            warn!(
                target: "library",
                requested = %decoded,
                resolved = %resolved.display(),
                "rejected path outside library root"
            );
            return Err(SecurityError::OutsideRoot);
        }

        debug!(target: "library", resolved = %resolved.display(), "path resolved");
        Ok(resolved)
    }

    /// Component-wise containment: `/music2` is not inside `/music`.
    pub fn contains(&self, path: &Path) -> bool {
        path == self.root || path.starts_with(&self.root)
    }

    /// Express a contained absolute path relative to the root with `/`
    /// separators, the form stored in the database and returned by the API.
    ///
    /// A literal `%` is written as `%25`, so passing the result back to
    /// [`PathGuard::resolve`] yields the same directory.
    pub fn relative_to_root(&self, path: &Path) -> Option<String> {
        let relative = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(part) => Some(part.to_string_lossy().replace('%', "%25")),
                _ => None,
            })
            .collect();
        Some(parts.join("/"))
    }
}

/// Windows device names are reserved regardless of extension or trailing dots.
pub fn is_reserved_device_name(segment: &str) -> bool {
    let trimmed = segment.trim_end_matches(['.', ' ']);
    let stem = trimmed.split('.').next().unwrap_or(trimmed).trim_end();
    RESERVED_DEVICE_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(stem))
}

/// Canonicalize the longest existing ancestor of `path` and re-append the rest,
/// so symlinks anywhere along an existing prefix are resolved before the
/// containment check.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }

    let mut remainder = Vec::new();
    let mut current = path.to_path_buf();
    loop {
        let Some(name) = current.file_name().map(|n| n.to_os_string()) else {
            return path.to_path_buf();
        };
        remainder.push(name);
        if !current.pop() {
            return path.to_path_buf();
        }
        if let Ok(mut canonical) = current.canonicalize() {
            for part in remainder.iter().rev() {
                canonical.push(part);
            }
            return canonical;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn guard() -> (tempfile::TempDir, PathGuard) {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        fs::create_dir_all(dir.path().join("Radiohead").join("[2007] In Rainbows"))
            .expect("fixture dirs should be created");
        let guard = PathGuard::new(dir.path()).expect("guard should be created");
        (dir, guard)
    }

    #[test]
    fn empty_path_resolves_to_root() {
        let (_dir, guard) = guard();
        assert_eq!(guard.resolve("").unwrap(), guard.root());
        assert_eq!(guard.resolve("/").unwrap(), guard.root());
        assert_eq!(guard.resolve(".").unwrap(), guard.root());
    }

    #[test]
    fn resolves_nested_and_percent_encoded_paths() {
        let (_dir, guard) = guard();
        let expected = guard.root().join("Radiohead").join("[2007] In Rainbows");
        assert_eq!(guard.resolve("Radiohead/[2007] In Rainbows").unwrap(), expected);
        assert_eq!(
            guard.resolve("Radiohead/%5B2007%5D%20In%20Rainbows").unwrap(),
            expected
        );
    }

    #[test]
    fn parent_segments_inside_root_are_allowed() {
        let (_dir, guard) = guard();
        assert_eq!(
            guard.resolve("Radiohead/../Radiohead").unwrap(),
            guard.root().join("Radiohead")
        );
    }

    #[test]
    fn traversal_outside_root_is_rejected() {
        let (_dir, guard) = guard();
        for attempt in [
            "..",
            "../etc/passwd",
            "Radiohead/../../..",
            "%2e%2e/%2e%2e/etc",
            "..\\..\\windows",
        ] {
            assert_eq!(
                guard.resolve(attempt),
                Err(SecurityError::OutsideRoot),
                "{attempt} should be rejected"
            );
        }
    }

    #[test]
    fn absolute_input_is_treated_as_root_relative() {
        let (_dir, guard) = guard();
        let resolved = guard.resolve("/etc/passwd").unwrap();
        assert!(resolved.starts_with(guard.root()));
    }

    #[test]
    fn null_bytes_and_bad_encoding_are_rejected() {
        let (_dir, guard) = guard();
        assert_eq!(guard.resolve("Radiohead%00"), Err(SecurityError::NullByte));
        assert_eq!(guard.resolve("bad%ff%fe"), Err(SecurityError::Decode));
    }

    #[test]
    fn relative_form_of_percent_names_resolves_back() {
        let (dir, guard) = guard();
        let folder = dir.path().join("Tracks %41").join("[1999] 100%");
        fs::create_dir_all(&folder).expect("fixture dirs should be created");
        let canonical = folder.canonicalize().expect("fixture should canonicalize");

        let relative = guard.relative_to_root(&canonical).unwrap();
        assert_eq!(relative, "Tracks %2541/[1999] 100%25");
        assert_eq!(guard.resolve(&relative).unwrap(), canonical);

        // ordinary names are stored as written
        let plain = guard.resolve("Radiohead/[2007] In Rainbows").unwrap();
        assert_eq!(
            guard.relative_to_root(&plain).as_deref(),
            Some("Radiohead/[2007] In Rainbows")
        );
    }

    #[test]
    fn nonexistent_paths_resolve_without_error() {
        let (_dir, guard) = guard();
        let resolved = guard.resolve("Nobody/Nothing").unwrap();
        assert_eq!(resolved, guard.root().join("Nobody").join("Nothing"));
        assert!(!resolved.exists());
    }

    #[test]
    fn sibling_directory_with_common_prefix_is_not_contained() {
        let (dir, guard) = guard();
        let sibling = PathBuf::from(format!("{}2", guard.root().display()));
        assert!(!guard.contains(&sibling));
        drop(dir);
    }

    #[test]
    fn reserved_names_are_detected() {
        assert!(is_reserved_device_name("CON"));
        assert!(is_reserved_device_name("nul.txt"));
        assert!(is_reserved_device_name("com1."));
        assert!(is_reserved_device_name("LPT9"));
        assert!(!is_reserved_device_name("Console"));
        assert!(!is_reserved_device_name("COM10"));
    }

    #[test]
    fn reserved_name_check_can_be_enabled() {
        let (_dir, guard) = guard();
        let guard = guard.with_reserved_name_check(true);
        assert_eq!(
            guard.resolve("Radiohead/aux"),
            Err(SecurityError::ReservedName("aux".to_string()))
        );
    }

    #[test]
    fn relative_to_root_uses_forward_slashes() {
        let (_dir, guard) = guard();
        let path = guard.root().join("Radiohead").join("[2007] In Rainbows");
        assert_eq!(
            guard.relative_to_root(&path).as_deref(),
            Some("Radiohead/[2007] In Rainbows")
        );
        assert_eq!(guard.relative_to_root(guard.root()).as_deref(), Some(""));
        assert_eq!(guard.relative_to_root(Path::new("/elsewhere")), None);
    }

    #[test]
    fn missing_root_is_reported() {
        let err = PathGuard::new("/definitely/not/a/library/root").unwrap_err();
        assert!(matches!(err, ScanError::NotFound(_)));
    }

    #[cfg(unix)]
    #[test]
    fn symlink_escaping_root_is_rejected() {
        let outside = tempfile::tempdir().expect("outside dir should be created");
        let (_dir, guard) = guard();
        std::os::unix::fs::symlink(outside.path(), guard.root().join("escape"))
            .expect("symlink should be created");

        assert_eq!(guard.resolve("escape"), Err(SecurityError::OutsideRoot));
        assert_eq!(guard.resolve("escape/new"), Err(SecurityError::OutsideRoot));
    }

    #[test]
    fn resolution_never_leaves_root() {
        let (_dir, guard) = guard();
        let inputs = [
            "a/b/../../..",
            "./././..",
            "Radiohead/./../..//",
            "%2F..%2F..",
            "....//....",
            "a\\..\\..\\b",
            "..%5c..%5cb",
            "~/music",
        ];
        for input in inputs {
            match guard.resolve(input) {
                Ok(path) => assert!(guard.contains(&path), "{input} resolved outside root"),
                Err(err) => assert!(matches!(
                    err,
                    SecurityError::OutsideRoot
                        | SecurityError::Decode
                        | SecurityError::NullByte
                        | SecurityError::ReservedName(_)
                )),
            }
        }
    }
}
