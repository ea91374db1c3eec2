// SPDX-License-Identifier: GPL-3.0-or-later

//! Read-only view of the music library on disk.
//!
//! Everything in this crate works below a single library root:
//! - [`PathGuard`] resolves user supplied relative paths and refuses anything
//!   that would leave the root
//! - [`parse_folder_name`] splits `[1969] Abbey Road` style names into year and title
//! - [`DirectoryScanner`] walks the root into an immutable [`LibrarySnapshot`]
//! - [`ArtistFolderLocator`] finds an artist's folder inside a snapshot
//!
//! Nothing here writes to the filesystem.

pub mod error;
pub mod folder_name;
pub mod locator;
pub mod path_guard;
pub mod scanner;

pub use error::{ScanError, SecurityError};
pub use folder_name::{is_grouping_bucket, normalize_title, parse_folder_name, ParsedFolderName};
pub use locator::{ArtistFolderLocator, ArtistFolderMatch, NameRule};
pub use path_guard::PathGuard;
pub use scanner::{DirectoryScanner, FolderEntry, LibrarySnapshot, ScanOptions};
