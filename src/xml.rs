//! Markup traversal utilities.
//!
//! [`XmlNode::parse`] builds a best-effort owned tree from loosely
//! structured markup: parsing never fails, malformed input simply
//! yields the tree built so far. Lookup is by tag name or by an
//! attribute name/value pair, matching how package descriptions are
//! consulted. [`text_chunks`] extracts the ordered text content of a
//! chapter tree.

use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesStart, BytesText, Event};

/// A named attribute of an [`XmlNode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

/// An element of a parsed markup tree.
///
/// Children hold element nodes only; character data is consolidated
/// into [`text`](Self::text) per element, so iterating
/// [`children`](Self::children) visits the direct child elements in
/// document order with nothing to skip.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlNode {
    name: String,
    attributes: Vec<Attribute>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    /// Parses `data` into a tree, tolerating malformed markup.
    ///
    /// Mismatched or unclosed tags are folded into their nearest
    /// parent; the first unrecoverable reader error ends parsing with
    /// the tree built so far. The returned node is a synthetic
    /// document node whose children are the top-level elements.
    pub fn parse(data: &[u8]) -> XmlNode {
        let mut reader = Reader::from_reader(data);
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;

        let mut stack = vec![XmlNode::document()];

        loop {
            match reader.read_event() {
                Ok(Event::Start(el)) => stack.push(XmlNode::from_start(&el)),
                Ok(Event::Empty(el)) => {
                    let node = XmlNode::from_start(&el);
                    if let Some(parent) = stack.last_mut() {
                        parent.children.push(node);
                    }
                }
                Ok(Event::End(_)) => fold_top(&mut stack),
                Ok(Event::Text(mut text)) => {
                    if let Some(node) = stack.last_mut() {
                        append_text(&mut node.text, &mut text);
                    }
                }
                Ok(Event::CData(cdata)) => {
                    if let Some(node) = stack.last_mut() {
                        append_cdata(&mut node.text, &cdata);
                    }
                }
                Ok(Event::GeneralRef(entity)) => {
                    if let Some(resolved) = resolve_entity(entity.as_ref()) {
                        if let Some(node) = stack.last_mut() {
                            node.text.push(resolved);
                        }
                    }
                }
                Ok(Event::Eof) => break,
                // Best-effort tree: keep what has been built so far
                Err(_) => break,
                Ok(_) => {}
            }
        }

        // Fold unclosed elements into their parents
        while stack.len() > 1 {
            fold_top(&mut stack);
        }
        stack.pop().unwrap_or_else(XmlNode::document)
    }

    fn document() -> XmlNode {
        XmlNode {
            name: String::new(),
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn from_start(el: &BytesStart) -> XmlNode {
        let attributes = el
            .attributes()
            .filter_map(Result::ok)
            .map(|attribute| Attribute {
                name: String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                value: match attribute.unescape_value() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&attribute.value).into_owned(),
                },
            })
            .collect();

        XmlNode {
            name: String::from_utf8_lossy(el.local_name().as_ref()).into_owned(),
            attributes,
            text: String::new(),
            children: Vec::new(),
        }
    }

    /// The element's local tag name, namespace prefix stripped.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The character data placed directly inside this element.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The direct child elements, in document order.
    pub fn children(&self) -> &[XmlNode] {
        &self.children
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    /// Retrieves the value of the named attribute.
    /// Namespace prefix may be omitted from the argument.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| {
                attribute.name == name
                    || attribute
                        .name
                        .strip_suffix(name)
                        .is_some_and(|prefix| prefix.ends_with(':'))
            })
            .map(|attribute| attribute.value.as_str())
    }

    /// Finds the first element in this subtree (self included) whose
    /// local tag name equals `tag`, depth-first in document order.
    pub fn find_by_tag(&self, tag: &str) -> Option<&XmlNode> {
        if self.name == tag {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_tag(tag))
    }

    /// Finds the first element in this subtree (self included) that
    /// carries an attribute `name` whose value equals `value`.
    pub fn find_by_attribute(&self, name: &str, value: &str) -> Option<&XmlNode> {
        if self.attr(name) == Some(value) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_by_attribute(name, value))
    }

    /// Concatenated text of this element followed by that of its
    /// descendants, single-space separated.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if !self.text.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&self.text);
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }
}

/// A single run of text extracted from a chapter tree.
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    tag: String,
    text: String,
}

impl TextChunk {
    /// The local tag name of the element that held the text.
    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// Owning iterator over the [`TextChunk`]s of a chapter.
///
/// Produced by [`text_chunks`]; independent of the tree it was
/// extracted from.
#[derive(Debug)]
pub struct TextChunks(std::vec::IntoIter<TextChunk>);

impl PartialEq for TextChunks {
    fn eq(&self, other: &Self) -> bool {
        self.0.as_slice() == other.0.as_slice()
    }
}

impl Iterator for TextChunks {
    type Item = TextChunk;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

/// Extracts one [`TextChunk`] per text-bearing element of `root`,
/// in document order.
///
/// Script and style content does not qualify as text.
pub fn text_chunks(root: &XmlNode) -> TextChunks {
    let mut chunks = Vec::new();
    collect_chunks(root, &mut chunks);
    TextChunks(chunks.into_iter())
}

fn collect_chunks(node: &XmlNode, chunks: &mut Vec<TextChunk>) {
    if matches!(node.name(), "script" | "style") {
        return;
    }
    if !node.name().is_empty() && !node.text().is_empty() {
        chunks.push(TextChunk {
            tag: node.name().to_string(),
            text: node.text().to_string(),
        });
    }
    for child in node.children() {
        collect_chunks(child, chunks);
    }
}

fn fold_top(stack: &mut Vec<XmlNode>) {
    if stack.len() > 1 {
        if let Some(node) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }
}

fn append_cdata(value: &mut String, cdata: &BytesCData) {
    let text = cdata
        .decode()
        .unwrap_or_else(|_| String::from_utf8_lossy(cdata.as_ref()));

    value.push_str(text.trim());
}

fn append_text(value: &mut String, text: &mut BytesText) {
    // Determine when to add spacing
    let before = text.len();
    text.inplace_trim_start();
    let had_padding_start = text.len() != before;

    let before = text.len();
    text.inplace_trim_end();
    let had_padding_end = text.len() != before;

    if (text.is_empty() || had_padding_start)
        && !value.is_empty()
        && !value.ends_with(' ')
    {
        value.push(' ');
    }
    if text.is_empty() {
        return;
    }
    let text = text
        .decode()
        .unwrap_or_else(|_| String::from_utf8_lossy(text.as_ref()));

    // Consolidate multi-line character data into a single run
    for line in text.lines().map(str::trim).filter(|line| !line.is_empty()) {
        value.push_str(line);
        value.push(' ');
    }
    if !had_padding_end {
        value.pop();
    }
}

// Predefined named entities plus numeric character references;
// unknown entities are dropped.
fn resolve_entity(raw: &[u8]) -> Option<char> {
    match raw {
        b"amp" => Some('&'),
        b"lt" => Some('<'),
        b"gt" => Some('>'),
        b"apos" => Some('\''),
        b"quot" => Some('"'),
        b"nbsp" => Some(' '),
        _ => {
            let reference = raw.strip_prefix(b"#")?;
            let (digits, radix) = match reference.strip_prefix(b"x").or_else(|| reference.strip_prefix(b"X")) {
                Some(hex) => (hex, 16),
                None => (reference, 10),
            };
            let code = u32::from_str_radix(std::str::from_utf8(digits).ok()?, radix).ok()?;
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{XmlNode, text_chunks};

    const PACKAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
        <package xmlns="http://www.idpf.org/2007/opf" version="2.0">
          <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
            <dc:title>Sample Book</dc:title>
            <meta name="cover" content="im1"/>
          </metadata>
          <manifest>
            <item id="c1" href="chap1.html" media-type="text/html"/>
            <item id="im1" href="img/cover.jpg" media-type="image/jpeg"/>
          </manifest>
        </package>"#;

    #[test]
    fn test_find_by_tag() {
        let tree = XmlNode::parse(PACKAGE.as_bytes());

        // Namespace prefixes are stripped from tag names
        let title = tree.find_by_tag("title").unwrap();
        assert_eq!("Sample Book", title.text());

        let manifest = tree.find_by_tag("manifest").unwrap();
        assert_eq!(2, manifest.children().len());
        assert_eq!("chap1.html", manifest.children()[0].attr("href").unwrap());

        assert!(tree.find_by_tag("spine").is_none());
    }

    #[test]
    fn test_find_by_attribute() {
        let tree = XmlNode::parse(PACKAGE.as_bytes());

        let cover = tree.find_by_attribute("name", "cover").unwrap();
        assert_eq!("meta", cover.name());
        assert_eq!(Some("im1"), cover.attr("content"));

        assert!(tree.find_by_attribute("name", "missing").is_none());
    }

    #[test]
    fn test_recoverable_parse() {
        // Unclosed manifest and a truncated item tag
        let malformed = r#"
            <package>
              <manifest>
                <item id="c1" href="chap1.html" media-type="text/html"/>
                <item id="c2" href="chap2.html"
            </package>"#;

        let tree = XmlNode::parse(malformed.as_bytes());
        let manifest = tree.find_by_tag("manifest").unwrap();

        // The well-formed prefix survives
        assert_eq!(
            Some("c1"),
            manifest.children().first().and_then(|item| item.attr("id")),
        );
    }

    #[test]
    fn test_garbage_input() {
        let tree = XmlNode::parse(b"\xff\xfenot markup at all");
        assert!(tree.children().is_empty());
    }

    #[test]
    fn test_text_chunks_order() {
        let chapter = r#"
            <html><body>
              <h1>Chapter One</h1>
              <p>It was a dark and stormy night.</p>
              <script>ignored();</script>
              <p>The rain fell <em>in torrents</em>.</p>
            </body></html>"#;

        let tree = XmlNode::parse(chapter.as_bytes());
        let chunks: Vec<_> = text_chunks(&tree)
            .map(|chunk| (chunk.tag().to_string(), chunk.text().to_string()))
            .collect();

        assert_eq!(
            vec![
                ("h1".to_string(), "Chapter One".to_string()),
                ("p".to_string(), "It was a dark and stormy night.".to_string()),
                ("p".to_string(), "The rain fell .".to_string()),
                ("em".to_string(), "in torrents".to_string()),
            ],
            chunks,
        );
    }

    #[test]
    fn test_entity_resolution() {
        let tree = XmlNode::parse(b"<p>AT&amp;T &#8212; &#x41;</p>");
        let p = tree.find_by_tag("p").unwrap();
        assert_eq!("AT&T \u{2014} A", p.text());
    }

    #[test]
    fn test_text_content_recurses() {
        let tree =
            XmlNode::parse(b"<metadata><dc:creator><name>Jane Doe</name></dc:creator></metadata>");
        let creator = tree.find_by_tag("creator").unwrap();
        assert_eq!("Jane Doe", creator.text_content());

        let title = tree.find_by_tag("metadata").unwrap();
        assert_eq!("Jane Doe", title.text_content());
    }
}
