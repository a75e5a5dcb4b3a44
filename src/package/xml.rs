//! Lossless XML part model
//!
//! Parses a part's byte buffer into a navigable element tree and serializes
//! it back. Text and attribute values are kept in their escaped source form
//! and written out verbatim, so any subtree that is not explicitly edited
//! round-trips byte-identically. Namespaced elements are handled generically:
//! the qualified name is the node's identity, matching is by local name, and
//! unknown elements pass through untouched.

use quick_xml::Reader;
use quick_xml::escape::{escape, partial_escape, unescape};
use quick_xml::events::Event;

use crate::error::{DocxError, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    /// Character data in its escaped source form.
    Text(String),
    CData(String),
    Comment(String),
    /// Processing instruction content, without the `<?` / `?>` delimiters.
    ProcessingInstruction(String),
    DocType(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    /// Qualified name as written in the source, e.g. `w:hyperlink`.
    pub name: String,
    /// Attributes in source order; values in escaped source form.
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
    /// Whether the source used the `<name/>` form.
    pub self_closing: bool,
}

/// One parsed XML part: optional declaration plus top-level nodes
/// (whitespace between the declaration and the root element is kept as a
/// text node).
#[derive(Debug, Clone, PartialEq)]
pub struct XmlPart {
    /// Raw declaration content, without the `<?` / `?>` delimiters.
    pub declaration: Option<String>,
    pub nodes: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
            self_closing: false,
        }
    }

    /// The name without its namespace prefix (`w:p` -> `p`).
    pub fn local_name(&self) -> &str {
        match self.name.rsplit_once(':') {
            Some((_, local)) => local,
            None => &self.name,
        }
    }

    /// Decoded attribute value looked up by local name.
    pub fn attr(&self, local: &str) -> Option<String> {
        self.attributes
            .iter()
            .find(|(name, _)| local_of(name) == local)
            .map(|(_, value)| decode(value))
    }

    /// Set an attribute by its exact qualified name, appending if absent.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        let escaped = escape(value).into_owned();
        if let Some(slot) = self.attributes.iter_mut().find(|(n, _)| n == name) {
            slot.1 = escaped;
        } else {
            self.attributes.push((name.to_string(), escaped));
        }
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    /// Decoded character data directly under this element.
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            match child {
                XmlNode::Text(raw) => out.push_str(&decode(raw)),
                XmlNode::CData(raw) => out.push_str(raw),
                _ => {}
            }
        }
        out
    }

    /// Replace this element's content with a single text node.
    pub fn set_text(&mut self, value: &str) {
        self.children = vec![XmlNode::Text(partial_escape(value).into_owned())];
        self.self_closing = false;
    }

    /// Count descendant elements (self excluded) matching a predicate.
    pub fn count_descendants(&self, pred: &impl Fn(&Element) -> bool) -> usize {
        let mut count = 0;
        for child in self.child_elements() {
            if pred(child) {
                count += 1;
            }
            count += child.count_descendants(pred);
        }
        count
    }

    /// Depth-first search for the first descendant with the given local name.
    pub fn find_descendant(&self, local: &str) -> Option<&Element> {
        for child in self.child_elements() {
            if child.local_name() == local {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(local) {
                return Some(found);
            }
        }
        None
    }
}

/// Decode an escaped source string, tolerating unknown entities.
pub(crate) fn decode(raw: &str) -> String {
    match unescape(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

fn local_of(name: &str) -> &str {
    match name.rsplit_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

impl XmlPart {
    /// Parse a part's bytes into a tree. `part_name` is only used for error
    /// reporting.
    pub fn parse(bytes: &[u8], part_name: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        let malformed = |message: String| DocxError::MalformedXml {
            part: part_name.to_string(),
            message,
        };

        let mut part = XmlPart {
            declaration: None,
            nodes: Vec::new(),
        };
        let mut stack: Vec<Element> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|e| malformed(e.to_string()))?;
            match event {
                Event::Decl(decl) => {
                    part.declaration = Some(String::from_utf8_lossy(decl.as_ref()).into_owned());
                }
                Event::Start(start) => {
                    let mut element =
                        Element::new(&String::from_utf8_lossy(start.name().as_ref()));
                    for attr in start.attributes() {
                        let attr = attr.map_err(|e| malformed(e.to_string()))?;
                        element.attributes.push((
                            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                            String::from_utf8_lossy(&attr.value).into_owned(),
                        ));
                    }
                    stack.push(element);
                }
                Event::Empty(start) => {
                    let mut element =
                        Element::new(&String::from_utf8_lossy(start.name().as_ref()));
                    element.self_closing = true;
                    for attr in start.attributes() {
                        let attr = attr.map_err(|e| malformed(e.to_string()))?;
                        element.attributes.push((
                            String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
                            String::from_utf8_lossy(&attr.value).into_owned(),
                        ));
                    }
                    append(&mut stack, &mut part.nodes, XmlNode::Element(element));
                }
                Event::End(_) => {
                    let element = stack
                        .pop()
                        .ok_or_else(|| malformed("unexpected closing tag".to_string()))?;
                    append(&mut stack, &mut part.nodes, XmlNode::Element(element));
                }
                Event::Text(text) => {
                    let raw = String::from_utf8_lossy(text.as_ref()).into_owned();
                    append(&mut stack, &mut part.nodes, XmlNode::Text(raw));
                }
                Event::CData(cdata) => {
                    let raw = String::from_utf8_lossy(cdata.as_ref()).into_owned();
                    append(&mut stack, &mut part.nodes, XmlNode::CData(raw));
                }
                Event::Comment(comment) => {
                    let raw = String::from_utf8_lossy(comment.as_ref()).into_owned();
                    append(&mut stack, &mut part.nodes, XmlNode::Comment(raw));
                }
                Event::PI(pi) => {
                    let raw = String::from_utf8_lossy(pi.as_ref()).into_owned();
                    append(&mut stack, &mut part.nodes, XmlNode::ProcessingInstruction(raw));
                }
                Event::DocType(doctype) => {
                    let raw = String::from_utf8_lossy(doctype.as_ref()).into_owned();
                    append(&mut stack, &mut part.nodes, XmlNode::DocType(raw));
                }
                Event::Eof => {
                    if !stack.is_empty() {
                        return Err(malformed("unexpected end of file".to_string()));
                    }
                    break;
                }
            }
        }

        Ok(part)
    }

    /// The root element, if the part has one.
    pub fn root(&self) -> Option<&Element> {
        self.nodes.iter().find_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn root_mut(&mut self) -> Option<&mut Element> {
        self.nodes.iter_mut().find_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = String::new();
        if let Some(decl) = &self.declaration {
            out.push_str("<?");
            out.push_str(decl);
            out.push_str("?>");
        }
        for node in &self.nodes {
            write_node(node, &mut out);
        }
        out.into_bytes()
    }
}

fn append(stack: &mut [Element], top_level: &mut Vec<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => top_level.push(node),
    }
}

fn write_node(node: &XmlNode, out: &mut String) {
    match node {
        XmlNode::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (name, value) in &el.attributes {
                out.push(' ');
                out.push_str(name);
                out.push_str("=\"");
                out.push_str(value);
                out.push('"');
            }
            if el.self_closing && el.children.is_empty() {
                out.push_str("/>");
            } else {
                out.push('>');
                for child in &el.children {
                    write_node(child, out);
                }
                out.push_str("</");
                out.push_str(&el.name);
                out.push('>');
            }
        }
        XmlNode::Text(raw) => out.push_str(raw),
        XmlNode::CData(raw) => {
            out.push_str("<![CDATA[");
            out.push_str(raw);
            out.push_str("]]>");
        }
        XmlNode::Comment(raw) => {
            out.push_str("<!--");
            out.push_str(raw);
            out.push_str("-->");
        }
        XmlNode::ProcessingInstruction(raw) => {
            out.push_str("<?");
            out.push_str(raw);
            out.push_str("?>");
        }
        XmlNode::DocType(raw) => {
            out.push_str("<!DOCTYPE ");
            out.push_str(raw);
            out.push('>');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:r><w:rPr><w:b/></w:rPr><w:t xml:space="preserve">Tom &amp; Jerry </w:t></w:r></w:p></w:body></w:document>"#;

    #[test]
    fn round_trip_is_byte_identical() {
        let part = XmlPart::parse(SAMPLE.as_bytes(), "word/document.xml").unwrap();
        assert_eq!(part.to_bytes(), SAMPLE.as_bytes());
    }

    #[test]
    fn text_is_decoded() {
        let part = XmlPart::parse(SAMPLE.as_bytes(), "word/document.xml").unwrap();
        let t = part.root().unwrap().find_descendant("t").unwrap();
        assert_eq!(t.text(), "Tom & Jerry ");
    }

    #[test]
    fn set_text_escapes() {
        let mut el = Element::new("w:t");
        el.set_text("a < b & c");
        let mut out = String::new();
        write_node(&XmlNode::Element(el), &mut out);
        assert_eq!(out, "<w:t>a &lt; b &amp; c</w:t>");
    }

    #[test]
    fn attr_lookup_ignores_prefix() {
        let xml = r#"<w:hyperlink r:id="rId4" w:history="1"/>"#;
        let part = XmlPart::parse(xml.as_bytes(), "test").unwrap();
        let link = part.root().unwrap();
        assert_eq!(link.attr("id").as_deref(), Some("rId4"));
        assert_eq!(link.attr("history").as_deref(), Some("1"));
        assert_eq!(link.attr("missing"), None);
    }

    #[test]
    fn malformed_xml_is_rejected() {
        let err = XmlPart::parse(b"<w:p><w:r></w:p>", "word/document.xml").unwrap_err();
        assert!(matches!(err, DocxError::MalformedXml { .. }));
    }

    #[test]
    fn self_closing_survives_round_trip() {
        let xml = r#"<w:p><w:r><w:br/><w:t>x</w:t></w:r></w:p>"#;
        let part = XmlPart::parse(xml.as_bytes(), "test").unwrap();
        assert_eq!(part.to_bytes(), xml.as_bytes());
    }
}
