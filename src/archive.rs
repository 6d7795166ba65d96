//! Container access for packaged documents.
//!
//! An [`Archive`] yields the raw bytes behind a container-relative path.
//! Two forms are supported: a zip container ([`ZipArchive`]) and an
//! unpacked container on disk ([`DirectoryArchive`]).

use percent_encoding::percent_decode_str;
use std::cell::RefCell;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Seek};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive as Zip;

/// Alias for `Result<T, ArchiveError>`.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// Possible errors from a container backing a
/// [`Document`](crate::Document).
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum ArchiveError {
    /// The container itself cannot be opened: missing, unsupported
    /// format, or malformed state.
    ///
    /// `path` is [`None`] when the container was supplied as a plain
    /// `Read + Seek` instance.
    #[error("[UnreadableArchive - `{path:?}`]: {source}")]
    UnreadableArchive {
        /// The root cause of the error.
        source: io::Error,
        /// The path responsible for triggering the error, if applicable.
        path: Option<PathBuf>,
    },

    /// A given path does not point to a valid entry in the container.
    #[error("[InvalidEntry - `{entry}`]: {source}")]
    InvalidEntry {
        /// The root cause of the error.
        source: io::Error,
        /// The container-relative path responsible for the error.
        entry: String,
    },

    /// The entry exists although its content cannot be read.
    #[error("[CannotRead - `{entry}`]: {source}")]
    CannotRead {
        /// The root cause of the error.
        source: io::Error,
        /// The container-relative path responsible for the error.
        entry: String,
    },
}

/// Read access to the entries of a container.
///
/// Paths are container-relative and use forward slashes, as found in
/// manifest hrefs.
pub trait Archive {
    /// Returns the raw bytes of the entry at `path`.
    ///
    /// # Errors
    /// [`ArchiveError`]: When the entry is absent or unreadable.
    fn read_entry(&self, path: &str) -> ArchiveResult<Vec<u8>>;
}

/// Opens the container at `path`.
///
/// The file is treated as a zip container. If `path` is a directory,
/// its contents are accessed directly instead, which makes a zip
/// file unnecessary.
pub(crate) fn open_archive(path: &Path) -> ArchiveResult<Box<dyn Archive>> {
    Ok(if path.is_file() {
        let file = File::open(path).map_err(|error| ArchiveError::UnreadableArchive {
            source: error,
            path: Some(path.to_path_buf()),
        })?;
        Box::new(ZipArchive::new(BufReader::new(file), Some(path))?)
    } else {
        Box::new(DirectoryArchive::new(path)?)
    })
}

/// A zip-backed container.
///
/// Interior mutability is required as the zip reader seeks while
/// extracting; access is single-threaded (see crate-level notes).
pub(crate) struct ZipArchive<R>(RefCell<Zip<R>>);

impl<R: Read + Seek> ZipArchive<R> {
    /// `reader` (and optional `path` for a more descriptive error message).
    pub(crate) fn new(reader: R, path: Option<&Path>) -> ArchiveResult<Self> {
        Zip::new(reader)
            .map(|zip| Self(RefCell::new(zip)))
            .map_err(|error| ArchiveError::UnreadableArchive {
                source: io::Error::from(error),
                path: path.map(Path::to_path_buf),
            })
    }
}

impl<R: Read + Seek> Archive for ZipArchive<R> {
    fn read_entry(&self, path: &str) -> ArchiveResult<Vec<u8>> {
        let mut zip = self.0.borrow_mut();
        let key = relative_key(path);

        // Manifest hrefs are URIs while zip entries store decoded
        // names; retry with the percent-decoded form when the literal
        // name is absent.
        let name = if zip.index_for_name(key).is_some() {
            key.to_string()
        } else {
            percent_decode_str(key).decode_utf8_lossy().into_owned()
        };

        let mut file = zip
            .by_name(&name)
            .map_err(|error| ArchiveError::InvalidEntry {
                source: io::Error::from(error),
                entry: path.to_string(),
            })?;

        let mut buf = Vec::new();
        file.read_to_end(&mut buf)
            .map(|_| buf)
            .map_err(|error| ArchiveError::CannotRead {
                source: error,
                entry: path.to_string(),
            })
    }
}

/// An unpacked container rooted at a directory.
pub(crate) struct DirectoryArchive(PathBuf);

impl DirectoryArchive {
    pub(crate) fn new(path: &Path) -> ArchiveResult<Self> {
        match path.try_exists() {
            Ok(true) => Ok(Self(path.to_path_buf())),
            Ok(false) => Err(ArchiveError::UnreadableArchive {
                source: io::Error::from(io::ErrorKind::NotFound),
                path: Some(path.to_path_buf()),
            }),
            Err(error) => Err(ArchiveError::UnreadableArchive {
                source: error,
                path: Some(path.to_path_buf()),
            }),
        }
    }

    fn resolve(&self, path: &str) -> ArchiveResult<PathBuf> {
        let decoded = percent_decode_str(relative_key(path)).decode_utf8_lossy();
        let joined = normalize(&self.0.join(decoded.as_ref()));

        // Entries must stay inside the container root.
        if joined.starts_with(&self.0) && joined.is_file() {
            Ok(joined)
        } else {
            Err(ArchiveError::InvalidEntry {
                source: io::Error::from(io::ErrorKind::NotFound),
                entry: path.to_string(),
            })
        }
    }
}

impl Archive for DirectoryArchive {
    fn read_entry(&self, path: &str) -> ArchiveResult<Vec<u8>> {
        let resolved = self.resolve(path)?;

        fs::read(&resolved).map_err(|error| ArchiveError::CannotRead {
            source: error,
            entry: path.to_string(),
        })
    }
}

// Container entries are addressed relative to the root.
fn relative_key(path: &str) -> &str {
    path.strip_prefix('/').unwrap_or(path)
}

/// Removes `.` and `..` components without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut stack: Vec<Component> = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => match stack.last() {
                Some(Component::Normal(_)) => {
                    stack.pop();
                }
                // Never above the root
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => stack.push(component),
            },
            Component::CurDir => {}
            _ => stack.push(component),
        }
    }

    PathBuf::from_iter(stack)
}
