//! Error types for [`Document`](crate::Document) construction.

use crate::archive::ArchiveError;

/// Alias for `Result<T, DocError>`.
pub type DocResult<T> = Result<T, DocError>;

/// Possible errors when constructing a [`Document`](crate::Document).
///
/// Construction is all-or-nothing: any of these leaves no partially
/// built document behind. Queries on a constructed document report
/// not-found as [`None`] instead of an error.
#[non_exhaustive]
#[derive(thiserror::Error, Debug)]
pub enum DocError {
    /// The container, its `META-INF/container.xml`, or the package
    /// root file could not be read.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// `META-INF/container.xml` carries no usable `rootfile`
    /// reference to the package description.
    #[error("no package root file reference in `META-INF/container.xml`")]
    NoRootFile,
}
