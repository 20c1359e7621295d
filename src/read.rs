//! Loads the source directory into a [`Site`].

use crate::document::{Document, Metadata, Site};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Walks `source_directory` and parses every file into a [`Document`] keyed
/// by its relative path. Directories are traversed recursively and symlinks
/// are followed.
pub fn read_site(source_directory: &Path, metadata: Metadata) -> Result<Site> {
    let mut site = Site::new(metadata);
    for result in WalkDir::new(source_directory).follow_links(true) {
        let entry = result?;
        if !entry.file_type().is_file() {
            continue;
        }

        // strip_prefix() should never fail since `source_directory` is an
        // ancestor of every entry
        let relative_path = match entry.path().strip_prefix(source_directory) {
            Ok(p) => p.to_owned(),
            Err(_) => continue,
        };
        let raw = std::fs::read(entry.path()).map_err(|err| Error::Io {
            path: entry.path().to_owned(),
            err,
        })?;
        let document = Document::parse(&relative_path, raw)
            .map_err(|err| Error::Parse(relative_path.clone(), err))?;
        site.insert(document);
    }

    tracing::info!(
        "read {} files from `{}`",
        site.files.len(),
        source_directory.display()
    );
    Ok(site)
}

/// Represents the result of reading the source directory.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error reading the source directory.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors traversing the source directory.
    WalkDir(walkdir::Error),

    /// Returned for I/O errors reading a source file.
    Io { path: PathBuf, err: std::io::Error },

    /// Returned when a source file's front matter is invalid.
    Parse(PathBuf, crate::document::Error),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::WalkDir(err) => err.fmt(f),
            Error::Io { path, err } => {
                write!(f, "Reading source file '{}': {}", path.display(), err)
            }
            Error::Parse(path, err) => {
                write!(f, "Parsing source file '{}': {}", path.display(), err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::WalkDir(err) => Some(err),
            Error::Io { path: _, err } => Some(err),
            Error::Parse(_, err) => Some(err),
        }
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator while traversing directories.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}
