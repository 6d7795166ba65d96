//! Shared helpers to assemble in-memory zip containers for tests.

use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const FIXTURE_DIR: &str = "tests/ebooks/sample-book";

pub const CONTAINER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<container xmlns="urn:oasis:names:tc:opendocument:xmlns:container" version="1.0">
  <rootfiles>
    <rootfile full-path="OEBPS/content.opf" media-type="application/oebps-package+xml"/>
  </rootfiles>
</container>"#;

/// Zips `entries` in order into an in-memory container.
pub fn container(entries: &[(&str, &[u8])]) -> Cursor<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    for (name, data) in entries {
        writer.start_file(*name, options).unwrap();
        writer.write_all(data).unwrap();
    }

    writer.finish().unwrap()
}

/// A minimal container: the given package description plus one
/// chapter and one image.
pub fn container_with_package(package: &str) -> Cursor<Vec<u8>> {
    container(&[
        ("META-INF/container.xml", CONTAINER_XML.as_bytes()),
        ("OEBPS/content.opf", package.as_bytes()),
        (
            "OEBPS/chap1.html",
            b"<html><body><p>First chapter.</p></body></html>",
        ),
        ("OEBPS/img/cover.jpg", b"fake image bytes"),
    ])
}
