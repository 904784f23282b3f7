// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Minimal XML document tree for testsuite and testcase files
//!
//! Documents are read completely into a tree of [`Node`]s so the loader can
//! walk them with plain pattern matching. Each element carries its resolved
//! base URI (document location combined with any `xml:base` attributes on the
//! element or its ancestors).

use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use url::Url;

use super::error::LoadError;

/// One node of a parsed document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    CharData(String),
    Comment(String),
    ProcessingInstruction(String),
}

/// An element with its attributes and children in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    /// Qualified name as written in the document
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
    pub base: Url,
}

impl Element {
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Attribute value by qualified name, or by local name for unprefixed lookups
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .or_else(|| {
                if name.contains(':') {
                    return None;
                }
                self.attributes.iter().find(|(key, _)| {
                    match key.split_once(':') {
                        Some((prefix, local)) => {
                            local == name && prefix != "xmlns" && prefix != "xml"
                        }
                        None => false,
                    }
                })
            })
            .map(|(_, value)| value.as_str())
    }

    /// Boolean attribute: `true`/`1` are true, anything else present is false
    pub fn attr_bool(&self, name: &str) -> Option<bool> {
        self.attr(name)
            .map(|value| matches!(value.trim(), "1" | "true"))
    }

    pub fn element_children(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            _ => None,
        })
    }

    pub fn find_child(&self, local_name: &str) -> Option<&Element> {
        self.element_children()
            .find(|child| child.local_name() == local_name)
    }

    /// Concatenated character data of the direct children, trimmed
    pub fn text(&self) -> String {
        let mut text = String::new();
        for node in &self.children {
            if let Node::CharData(data) = node {
                text.push_str(data);
            }
        }
        text.trim().to_string()
    }

    /// Serialized content of the element without its own start and end tags
    pub fn inner_xml(&self) -> String {
        let mut out = String::new();
        for node in &self.children {
            write_node(node, &mut out);
        }
        out
    }
}

fn write_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => {
            out.push('<');
            out.push_str(&element.name);
            for (key, value) in &element.attributes {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape(value.as_str()));
                out.push('"');
            }
            if element.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &element.children {
                    write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&element.name);
                out.push('>');
            }
        }
        Node::CharData(data) => out.push_str(&escape(data.as_str())),
        Node::Comment(comment) => {
            out.push_str("<!--");
            out.push_str(comment);
            out.push_str("-->");
        }
        Node::ProcessingInstruction(content) => {
            out.push_str("<?");
            out.push_str(content);
            out.push_str("?>");
        }
    }
}

fn local_part(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

/// A parsed XML document
#[derive(Debug, Clone)]
pub struct XmlDocument {
    pub uri: Url,
    pub root: Element,
}

impl XmlDocument {
    /// Read and parse the document at `uri`. Only `file:` URIs can be read.
    pub fn load(uri: &Url) -> Result<Self, LoadError> {
        if uri.scheme() != "file" {
            return Err(LoadError::UnsupportedScheme {
                scheme: uri.scheme().to_string(),
                uri: uri.to_string(),
            });
        }
        let path = uri.to_file_path().map_err(|_| LoadError::InvalidLocation {
            location: uri.to_string(),
            reason: "not a local file path".to_string(),
        })?;
        let bytes = std::fs::read(&path).map_err(|source| LoadError::Read {
            uri: uri.to_string(),
            source,
        })?;
        Self::parse_bytes(uri.clone(), &bytes)
    }

    /// Parse document text that was retrieved from `uri`
    pub fn parse(uri: Url, text: &str) -> Result<Self, LoadError> {
        Self::read_tree(uri, Reader::from_str(text))
    }

    /// Parse raw document bytes, decoding them per the BOM or the encoding
    /// declared in the XML declaration (UTF-8 when neither is present)
    pub fn parse_bytes(uri: Url, bytes: &[u8]) -> Result<Self, LoadError> {
        Self::read_tree(uri, Reader::from_reader(bytes))
    }

    fn read_tree(uri: Url, mut reader: Reader<&[u8]>) -> Result<Self, LoadError> {
        let mut stack: Vec<Element> = Vec::new();
        let mut root: Option<Element> = None;

        loop {
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(source) => {
                    return Err(LoadError::Parse {
                        uri: uri.to_string(),
                        position: reader.error_position() as u64,
                        source,
                    })
                }
            };
            match event {
                Event::Start(start) => {
                    let parent_base = stack.last().map(|e| &e.base).unwrap_or(&uri);
                    let element = open_element(&start, parent_base, &uri, &reader)?;
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let parent_base = stack.last().map(|e| &e.base).unwrap_or(&uri);
                    let element = open_element(&start, parent_base, &uri, &reader)?;
                    close_element(element, &mut stack, &mut root, &uri)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| LoadError::Malformed {
                        uri: uri.to_string(),
                        reason: "unbalanced end tag".to_string(),
                    })?;
                    close_element(element, &mut stack, &mut root, &uri)?;
                }
                Event::Text(text) => {
                    let value = text.unescape().map_err(|source| LoadError::Parse {
                        uri: uri.to_string(),
                        position: reader.buffer_position() as u64,
                        source,
                    })?;
                    push_child(&mut stack, Node::CharData(value.into_owned()));
                }
                Event::CData(data) => {
                    let value = decode(&reader, &data, &uri)?;
                    push_child(&mut stack, Node::CharData(value));
                }
                Event::Comment(comment) => {
                    let value = decode(&reader, &comment, &uri)?;
                    push_child(&mut stack, Node::Comment(value));
                }
                Event::PI(pi) => {
                    let value = decode(&reader, &pi, &uri)?;
                    push_child(&mut stack, Node::ProcessingInstruction(value));
                }
                Event::Decl(_) | Event::DocType(_) => {}
                Event::Eof => break,
            }
        }

        if !stack.is_empty() {
            return Err(LoadError::Malformed {
                uri: uri.to_string(),
                reason: format!("unexpected end of document inside <{}>", stack[stack.len() - 1].name),
            });
        }
        let root = root.ok_or_else(|| LoadError::Malformed {
            uri: uri.to_string(),
            reason: "no document element".to_string(),
        })?;
        Ok(Self { uri, root })
    }
}

fn open_element(
    start: &BytesStart<'_>,
    parent_base: &Url,
    doc_uri: &Url,
    reader: &Reader<&[u8]>,
) -> Result<Element, LoadError> {
    let parse_error = |source: quick_xml::Error| LoadError::Parse {
        uri: doc_uri.to_string(),
        position: reader.buffer_position() as u64,
        source,
    };

    let decoder = reader.decoder();
    let name = decode(reader, start.name().as_ref(), doc_uri)?;
    let mut attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| parse_error(e.into()))?;
        let key = decode(reader, attr.key.as_ref(), doc_uri)?;
        let value = attr
            .decode_and_unescape_value(decoder)
            .map_err(parse_error)?
            .into_owned();
        attributes.push((key, value));
    }

    let mut base = parent_base.clone();
    if let Some((_, xml_base)) = attributes.iter().find(|(key, _)| key == "xml:base") {
        match parent_base.join(xml_base.trim()) {
            Ok(resolved) => base = resolved,
            Err(e) => tracing::warn!(
                "Document {} contains unresolvable xml:base `{}` on <{}>: {}",
                doc_uri,
                xml_base,
                name,
                e
            ),
        }
    }

    Ok(Element {
        name,
        attributes,
        children: Vec::new(),
        base,
    })
}

fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<Element>,
    uri: &Url,
) -> Result<(), LoadError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(LoadError::Malformed {
                uri: uri.to_string(),
                reason: format!("second document element <{}>", element.name),
            })
        }
    }
    Ok(())
}

/// Decode raw event bytes with the document's detected encoding
fn decode(reader: &Reader<&[u8]>, bytes: &[u8], uri: &Url) -> Result<String, LoadError> {
    reader
        .decoder()
        .decode(bytes)
        .map(|value| value.into_owned())
        .map_err(|source| LoadError::Parse {
            uri: uri.to_string(),
            position: reader.buffer_position() as u64,
            source,
        })
}

fn push_child(stack: &mut [Element], node: Node) {
    // Character data and comments outside the document element are dropped
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(text: &str) -> XmlDocument {
        XmlDocument::parse(Url::parse("file:///suite/dir/doc.xml").unwrap(), text).unwrap()
    }

    #[test]
    fn test_parse_tree() {
        let d = doc(r#"<?xml version="1.0"?>
            <!-- header -->
            <t:testcase xmlns:t="urn:test" t:name="A &amp; B" owner="me">
                <variation id="V1"><description>Some <b>bold</b> text</description></variation>
                <?pi data?>
                <!-- inside -->
            </t:testcase>"#);
        assert_eq!(d.root.local_name(), "testcase");
        assert_eq!(d.root.attr("name"), Some("A & B"));
        assert_eq!(d.root.attr("owner"), Some("me"));
        assert_eq!(d.root.attr("xmlns"), None);
        assert_eq!(d.root.element_children().count(), 1);
        assert!(d.root.children.iter().any(|n| matches!(n, Node::Comment(c) if c.trim() == "inside")));
        assert!(d.root.children.iter().any(|n| matches!(n, Node::ProcessingInstruction(_))));
        let description = d.root.find_child("variation").unwrap().find_child("description").unwrap();
        assert_eq!(description.inner_xml(), "Some <b>bold</b> text");
    }

    #[test]
    fn test_xml_base_resolution() {
        let d = doc(r#"<root><a xml:base="sub/"><b xml:base="deeper/"/></a><c/></root>"#);
        let a = d.root.find_child("a").unwrap();
        assert_eq!(a.base.as_str(), "file:///suite/dir/sub/");
        assert_eq!(a.find_child("b").unwrap().base.as_str(), "file:///suite/dir/sub/deeper/");
        assert_eq!(d.root.find_child("c").unwrap().base.as_str(), "file:///suite/dir/doc.xml");
    }

    #[test]
    fn test_bool_and_text() {
        let d = doc("<data><instance readMeFirst=\" true \">\n  a.xml\n</instance><xsd readMeFirst=\"0\">b.xsd</xsd></data>");
        let instance = d.root.find_child("instance").unwrap();
        assert_eq!(instance.attr_bool("readMeFirst"), Some(true));
        assert_eq!(instance.text(), "a.xml");
        assert_eq!(d.root.find_child("xsd").unwrap().attr_bool("readMeFirst"), Some(false));
        assert_eq!(d.root.attr_bool("readMeFirst"), None);
    }

    #[test]
    fn test_malformed_documents() {
        let uri = Url::parse("file:///x.xml").unwrap();
        assert!(XmlDocument::parse(uri.clone(), "<a><b></a>").is_err());
        assert!(XmlDocument::parse(uri.clone(), "<a>").is_err());
        assert!(XmlDocument::parse(uri.clone(), "").is_err());
        assert!(XmlDocument::parse(uri, "<a/><b/>").is_err());
    }

    #[test]
    fn test_declared_encoding_is_honored() {
        let uri = Url::parse("file:///suite/latin1.xml").unwrap();
        let mut bytes =
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?>\n<testcase name=\"Caf".to_vec();
        bytes.extend_from_slice(b"\xE9\"><!-- r\xE9sum\xE9 --><description>na\xEFve</description></testcase>");
        let d = XmlDocument::parse_bytes(uri, &bytes).unwrap();
        assert_eq!(d.root.attr("name"), Some("Caf\u{e9}"));
        assert_eq!(d.root.find_child("description").unwrap().text(), "na\u{ef}ve");
        assert!(d.root.children.iter().any(|n| matches!(n, Node::Comment(c) if c.trim() == "r\u{e9}sum\u{e9}")));
    }

    #[test]
    fn test_load_latin1_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("latin1.xml");
        std::fs::write(
            &path,
            b"<?xml version=\"1.0\" encoding=\"ISO-8859-1\"?><testcases name=\"Caf\xE9\"/>",
        )
        .unwrap();
        let d = XmlDocument::load(&Url::from_file_path(&path).unwrap()).unwrap();
        assert_eq!(d.root.attr("name"), Some("Caf\u{e9}"));
    }

    #[test]
    fn test_non_file_scheme_rejected() {
        let uri = Url::parse("http://example.com/index.xml").unwrap();
        assert!(matches!(
            XmlDocument::load(&uri),
            Err(LoadError::UnsupportedScheme { .. })
        ));
    }
}
