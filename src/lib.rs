//! # lectern
//!
//! A lightweight document model for EPUB-style packaged documents.
//!
//! A [`Document`] is built from a container (a zip file or an unpacked
//! directory) holding an OPF-style package description. It exposes the
//! manifest as a resource registry, the spine as an ordered reading
//! sequence with a navigation cursor, and on-demand metadata, cover,
//! and mime queries.
//!
//! ## Examples
//! Opening a container and walking the reading order:
//! ```no_run
//! use lectern::Document;
//!
//! let mut doc = Document::open("example.epub").unwrap();
//!
//! println!("Title = {:?}", doc.metadata("title"));
//!
//! // The cursor starts at the first spine entry
//! while let Some(chunks) = doc.text() {
//!     for chunk in chunks {
//!         println!("<{}> {}", chunk.tag(), chunk.text());
//!     }
//!     if !doc.go_next() {
//!         break;
//!     }
//! }
//! ```
//! Fetching a resource by manifest identifier:
//! ```no_run
//! # use lectern::Document;
//! # let doc = Document::open("example.epub").unwrap();
//! if let Some(cover_id) = doc.cover() {
//!     let bytes = doc.resource(&cover_id).unwrap();
//!     let mime = doc.mime_by_id(&cover_id).unwrap();
//!     println!("cover: {} bytes of {mime}", bytes.len());
//! }
//! ```

mod archive;
mod doc;
mod error;
pub mod xml;

pub use self::archive::{Archive, ArchiveError, ArchiveResult};
pub use self::doc::{Document, Resource};
pub use self::error::{DocError, DocResult};
pub use self::xml::{TextChunk, TextChunks};
