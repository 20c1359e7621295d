//! Writes the finished [`Site`] to the destination directory.

use crate::document::Site;
use std::collections::HashSet;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Writes every document in `site` to `destination` at its output path. If
/// `clean` is set, the destination directory is removed first so files from
/// earlier builds don't linger.
pub fn write_site(site: &Site, destination: &Path, clean: bool) -> Result<()> {
    if clean {
        rmdir(destination)?;
    }

    let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
    for document in site.files.values() {
        let path = destination.join(&document.path);
        if let Some(dir) = path.parent() {
            if seen_dirs.insert(dir.to_owned()) {
                std::fs::create_dir_all(dir).map_err(|err| Error::Io {
                    path: dir.to_owned(),
                    err,
                })?;
            }
        }
        std::fs::write(&path, &document.contents).map_err(|err| Error::Io {
            path: path.clone(),
            err,
        })?;
        tracing::trace!("wrote `{}`", path.display());
    }
    Ok(())
}

/// Fails if removing `destination` would also remove any of the `protected`
/// directories, i.e. if `destination` is one of them or an ancestor of one.
/// Paths are compared after resolving `.`, `..` and symlinks; a destination
/// that doesn't exist yet is always safe.
pub fn check_clean(destination: &Path, protected: &[&Path]) -> Result<()> {
    let resolved = match std::fs::canonicalize(destination) {
        Ok(path) => path,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => {
            return Err(Error::Io {
                path: destination.to_owned(),
                err,
            })
        }
    };
    for dir in protected {
        if let Ok(dir) = std::fs::canonicalize(dir) {
            if dir.starts_with(&resolved) {
                return Err(Error::UnsafeClean {
                    path: destination.to_owned(),
                    protected: dir,
                });
            }
        }
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

/// The result of a fallible write operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error writing the site to disk.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while cleaning the destination directory.
    Clean { path: PathBuf, err: io::Error },

    /// Returned for I/O problems while writing an output file.
    Io { path: PathBuf, err: io::Error },

    /// Returned when cleaning the destination would remove project files.
    UnsafeClean { path: PathBuf, protected: PathBuf },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::Io { path, err } => write!(f, "Writing '{}': {}", path.display(), err),
            Error::UnsafeClean { path, protected } => write!(
                f,
                "Refusing to clean '{}': it contains '{}'",
                path.display(),
                protected.display()
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Clean { path: _, err } => Some(err),
            Error::Io { path: _, err } => Some(err),
            Error::UnsafeClean { .. } => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::document::Document;

    fn site(files: &[(&str, &str)]) -> Site {
        let mut site = Site::default();
        for (path, contents) in files {
            site.insert(Document {
                path: PathBuf::from(path),
                contents: contents.as_bytes().to_vec(),
                ..Document::default()
            });
        }
        site
    }

    #[test]
    fn test_write_nested() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let out = dir.path().join("build");
        write_site(
            &site(&[("index.html", "home"), ("blog/a/index.html", "a")]),
            &out,
            true,
        )?;
        assert_eq!("home", std::fs::read_to_string(out.join("index.html"))?);
        assert_eq!("a", std::fs::read_to_string(out.join("blog/a/index.html"))?);
        Ok(())
    }

    #[test]
    fn test_clean() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let stale = dir.path().join("stale.html");
        std::fs::write(&stale, "old")?;

        write_site(&site(&[("new.html", "new")]), dir.path(), false)?;
        assert!(stale.exists());

        write_site(&site(&[("new.html", "new")]), dir.path(), true)?;
        assert!(!stale.exists());
        assert!(dir.path().join("new.html").exists());
        Ok(())
    }

    #[test]
    fn test_check_clean() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let root = dir.path();
        let source = root.join("src");
        std::fs::create_dir_all(&source)?;
        std::fs::create_dir_all(root.join("build"))?;
        let protected = [root, source.as_path()];

        check_clean(&root.join("build"), &protected)?;
        check_clean(&root.join("missing"), &protected)?;

        for destination in [
            root.to_owned(),
            root.join("."),
            source.join(".."),
            source.clone(),
            root.join("build").join("..").join(".."),
        ] {
            assert!(
                matches!(
                    check_clean(&destination, &protected),
                    Err(Error::UnsafeClean { .. })
                ),
                "cleaning {} should be refused",
                destination.display()
            );
        }
        Ok(())
    }
}
