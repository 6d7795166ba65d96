//! The packaged-document model: resource registry, spine, cursor,
//! and metadata queries.

use crate::archive::{self, Archive, ZipArchive};
use crate::error::{DocError, DocResult};
use crate::xml::{self, TextChunks, XmlNode};
use std::collections::HashMap;
use std::io::{Read, Seek};
use std::path::Path;

// Location of the .xml file that leads to the package description
const CONTAINER: &str = "META-INF/container.xml";
const PACKAGE_MIME: &str = "application/oebps-package+xml";

/// One manifest entry: its media type and resolved container path.
///
/// The `uri` is always the content base joined with the raw manifest
/// href; bare hrefs are never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resource {
    mime: String,
    uri: String,
}

impl Resource {
    /// The entry's `media-type` attribute, possibly empty.
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// The container-absolute path of the entry.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

/// An opened packaged document.
///
/// Holds the resource registry and reading order parsed from the
/// package description, plus a cursor over the spine. The registry
/// and spine are fixed once construction succeeds; only the cursor
/// moves.
///
/// # Examples
/// ```no_run
/// use lectern::Document;
///
/// let mut doc = Document::open("example.epub").unwrap();
///
/// assert_eq!(0, doc.current_index());
/// let first_chapter = doc.current().unwrap();
///
/// doc.go_next();
/// let second_chapter = doc.current().unwrap();
/// ```
pub struct Document {
    archive: Box<dyn Archive>,
    content: Vec<u8>,
    content_base: String,
    resources: HashMap<String, Resource>,
    spine: Vec<String>,
    cursor: usize,
}

impl Document {
    /// Opens the container at `path` and builds the document model
    /// from its package description.
    ///
    /// `path` may be a zip container or a directory holding the
    /// unpacked contents.
    ///
    /// # Errors
    /// [`DocError`]: When the container, `META-INF/container.xml`, or
    /// the package root file is missing or unreadable.
    pub fn open<P: AsRef<Path>>(path: P) -> DocResult<Self> {
        Self::build(archive::open_archive(path.as_ref())?)
    }

    /// Builds the document model from a zip container supplied as a
    /// reader.
    ///
    /// # Errors
    /// See [`Self::open`].
    pub fn from_reader<R: Read + Seek + 'static>(reader: R) -> DocResult<Self> {
        Self::build(Box::new(ZipArchive::new(reader, None)?))
    }

    fn build(archive: Box<dyn Archive>) -> DocResult<Self> {
        let container = archive.read_entry(CONTAINER)?;
        let root_file = root_file_path(&container).ok_or(DocError::NoRootFile)?;

        let content = archive.read_entry(&root_file)?;
        let content_base = content_base(&root_file);

        let package = XmlNode::parse(&content);
        let resources = parse_manifest(&package, &content_base);
        let spine = parse_spine(&package);

        Ok(Self {
            archive,
            content,
            content_base,
            resources,
            spine,
            cursor: 0,
        })
    }

    /// The raw bytes of the package description.
    pub fn content(&self) -> &[u8] {
        &self.content
    }

    /// The directory of the package root file, including the trailing
    /// separator, or empty when the root file sits at the container
    /// root. All manifest hrefs resolve against this.
    pub fn content_base(&self) -> &str {
        &self.content_base
    }

    /// The resource registry: manifest identifier to [`Resource`].
    pub fn resources(&self) -> &HashMap<String, Resource> {
        &self.resources
    }

    /// The reading order as manifest identifiers, duplicates kept.
    pub fn spine(&self) -> &[String] {
        &self.spine
    }

    /// Returns the content of the resource registered under `id`,
    /// or [`None`] when the identifier is unknown or the entry
    /// cannot be read.
    pub fn resource(&self, id: &str) -> Option<Vec<u8>> {
        let resource = self.resources.get(id)?;
        self.archive.read_entry(&resource.uri).ok()
    }

    /// Returns the content at the base-relative `path`, bypassing the
    /// registry.
    ///
    /// Used when a path is already known, e.g. discovered through a
    /// link inside a chapter rather than through the manifest.
    pub fn resource_by_path(&self, path: &str) -> Option<Vec<u8>> {
        let resolved = self.resolve(path);
        self.archive.read_entry(&resolved).ok()
    }

    /// Returns the container-absolute path of the resource registered
    /// under `id` without reading it.
    pub fn resource_path(&self, id: &str) -> Option<&str> {
        self.resources.get(id).map(Resource::uri)
    }

    /// Returns the media type of the resource registered under `id`.
    pub fn mime_by_id(&self, id: &str) -> Option<&str> {
        self.resources.get(id).map(Resource::mime)
    }

    /// Returns the media type of the resource at the base-relative
    /// `path`.
    ///
    /// There is no reverse index from path to identifier; this scans
    /// the registry and is O(registry size).
    pub fn mime_by_path(&self, path: &str) -> Option<&str> {
        let resolved = self.resolve(path);
        self.resources
            .values()
            .find(|resource| resource.uri == resolved)
            .map(Resource::mime)
    }

    /// Returns the text content of the first element named `tag`
    /// inside the `metadata` section.
    ///
    /// The package description is re-parsed on each call; no tree is
    /// retained between queries.
    ///
    /// # Examples
    /// ```no_run
    /// # use lectern::Document;
    /// # let doc = Document::open("example.epub").unwrap();
    /// assert_eq!(Some("Sample Book".to_string()), doc.metadata("title"));
    /// assert_eq!(None, doc.metadata("nonexistent"));
    /// ```
    pub fn metadata(&self, tag: &str) -> Option<String> {
        let package = XmlNode::parse(&self.content);
        let metadata = package.find_by_tag("metadata")?;
        Some(metadata.find_by_tag(tag)?.text_content())
    }

    /// Returns the cover reference: the `content` attribute of the
    /// meta element named `cover`, verbatim.
    ///
    /// The value is a manifest identifier, not a path; pass it to
    /// [`Self::resource`] or [`Self::resource_path`].
    pub fn cover(&self) -> Option<String> {
        let package = XmlNode::parse(&self.content);
        let meta = package.find_by_attribute("name", "cover")?;
        meta.attr("content").map(str::to_string)
    }

    /// The cursor position within the spine.
    pub fn current_index(&self) -> usize {
        self.cursor
    }

    /// The manifest identifier at the cursor, or [`None`] on an empty
    /// spine.
    pub fn current_id(&self) -> Option<&str> {
        self.spine.get(self.cursor).map(String::as_str)
    }

    /// Returns the content of the spine entry at the cursor.
    ///
    /// [`None`] when the spine is empty, the entry's identifier has
    /// no manifest counterpart, or the entry cannot be read.
    pub fn current(&self) -> Option<Vec<u8>> {
        self.resource(self.current_id()?)
    }

    /// Moves the cursor to the next spine entry.
    ///
    /// Returns whether the cursor moved; at the last entry this is a
    /// no-op.
    pub fn go_next(&mut self) -> bool {
        if self.cursor + 1 < self.spine.len() {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    /// Moves the cursor to the previous spine entry.
    ///
    /// Returns whether the cursor moved; at the first entry this is a
    /// no-op.
    pub fn go_prev(&mut self) -> bool {
        if self.cursor > 0 {
            self.cursor -= 1;
            true
        } else {
            false
        }
    }

    /// Extracts the text of the spine entry at the cursor as ordered
    /// [`TextChunk`](crate::TextChunk)s.
    ///
    /// [`None`] when the current entry cannot be resolved. The
    /// chapter tree is parsed leniently and released before
    /// returning; the chunks own their data.
    pub fn text(&self) -> Option<TextChunks> {
        let bytes = self.current()?;
        let tree = XmlNode::parse(&bytes);
        Some(xml::text_chunks(&tree))
    }

    /// Extracts the text of the resource registered under `id`.
    ///
    /// See [`Self::text`].
    pub fn text_by_id(&self, id: &str) -> Option<TextChunks> {
        let bytes = self.resource(id)?;
        let tree = XmlNode::parse(&bytes);
        Some(xml::text_chunks(&tree))
    }

    // The single place that turns a base-relative path into a
    // container-absolute one.
    fn resolve(&self, path: &str) -> String {
        format!("{}{}", self.content_base, path)
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, fmt: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fmt.debug_struct("Document")
            .field("content_base", &self.content_base)
            .field("resources", &self.resources)
            .field("spine", &self.spine)
            .field("cursor", &self.cursor)
            .finish()
    }
}

/// Extracts the package root file location from
/// `META-INF/container.xml`.
///
/// Although rare, multiple rootfile entries could exist; the one
/// declaring the package media type wins, falling back to the first
/// rootfile at all.
fn root_file_path(container: &[u8]) -> Option<String> {
    let tree = XmlNode::parse(container);

    tree.find_by_attribute("media-type", PACKAGE_MIME)
        .or_else(|| tree.find_by_tag("rootfile"))
        .and_then(|rootfile| rootfile.attr("full-path"))
        .map(str::to_string)
}

/// The root file's directory up to and including the first separator,
/// or empty when the root file has no directory component.
fn content_base(root_file: &str) -> String {
    match root_file.find('/') {
        Some(index) => root_file[..=index].to_string(),
        None => String::new(),
    }
}

/// Builds the resource registry from the manifest children.
///
/// Absent attributes become empty strings and propagate silently;
/// duplicate identifiers overwrite, last one wins.
fn parse_manifest(package: &XmlNode, content_base: &str) -> HashMap<String, Resource> {
    let mut resources = HashMap::new();

    let Some(manifest) = package.find_by_tag("manifest") else {
        return resources;
    };
    for item in manifest.children() {
        let id = item.attr("id").unwrap_or_default();
        let href = item.attr("href").unwrap_or_default();
        let mime = item.attr("media-type").unwrap_or_default();

        resources.insert(
            id.to_string(),
            Resource {
                mime: mime.to_string(),
                uri: format!("{content_base}{href}"),
            },
        );
    }

    resources
}

/// Builds the reading order from the spine children, document order
/// preserved, duplicates kept.
///
/// Identifiers are not checked against the registry here; dangling
/// references surface as not-found when resolved.
fn parse_spine(package: &XmlNode) -> Vec<String> {
    package
        .find_by_tag("spine")
        .map(|spine| {
            spine
                .children()
                .iter()
                .map(|item| item.attr("idref").unwrap_or_default().to_string())
                .collect()
        })
        .unwrap_or_default()
}
