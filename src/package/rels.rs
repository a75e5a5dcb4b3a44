//! Relationship manifest model
//!
//! The `word/_rels/document.xml.rels` part maps relationship IDs (`rId1`,
//! `rId2`, ...) to targets: external URLs for hyperlinks, sibling parts for
//! images and the like. Hyperlink references in the body resolve against
//! this manifest. Document order is preserved so an untouched manifest
//! serializes back the way it was written.

use std::collections::HashMap;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;

use crate::error::{DocxError, Result};
use crate::package::xml::decode;

pub const HYPERLINK_RELTYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// A single relationship entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub rel_type: String,
    pub target: String,
    pub is_external: bool,
}

impl Relationship {
    pub fn is_hyperlink(&self) -> bool {
        self.rel_type == HYPERLINK_RELTYPE
    }
}

/// Ordered collection of relationships with O(1) lookup by ID.
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    entries: Vec<Relationship>,
    index: HashMap<String, usize>,
}

impl Relationships {
    /// Parse a `.rels` part. An absent manifest is modeled as the empty
    /// collection by the caller.
    pub fn parse(bytes: &[u8], part_name: &str) -> Result<Self> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);
        let malformed = |message: String| DocxError::MalformedXml {
            part: part_name.to_string(),
            message,
        };

        let mut rels = Relationships::default();
        loop {
            match reader.read_event().map_err(|e| malformed(e.to_string()))? {
                Event::Start(e) | Event::Empty(e)
                    if e.local_name().as_ref() == b"Relationship" =>
                {
                    let mut id = String::new();
                    let mut rel_type = String::new();
                    let mut target = String::new();
                    let mut is_external = false;
                    for attr in e.attributes() {
                        let attr = attr.map_err(|e| malformed(e.to_string()))?;
                        let value = decode(&String::from_utf8_lossy(&attr.value));
                        match attr.key.local_name().as_ref() {
                            b"Id" => id = value,
                            b"Type" => rel_type = value,
                            b"Target" => target = value,
                            b"TargetMode" => is_external = value == "External",
                            _ => {}
                        }
                    }
                    if id.is_empty() {
                        return Err(malformed("relationship without Id".to_string()));
                    }
                    rels.push(Relationship {
                        id,
                        rel_type,
                        target,
                        is_external,
                    });
                }
                Event::Eof => break,
                _ => {}
            }
        }
        Ok(rels)
    }

    fn push(&mut self, rel: Relationship) {
        self.index.insert(rel.id.clone(), self.entries.len());
        self.entries.push(rel);
    }

    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.index.get(id).map(|&i| &self.entries[i])
    }

    /// Rewrite an entry's target string. Returns false if the ID is unknown.
    pub fn set_target(&mut self, id: &str, target: &str) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.entries[i].target = target.to_string();
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Relationship> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize back to `.rels` XML, preserving entry order.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut xml = String::with_capacity(256 + self.entries.len() * 128);
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str("\r\n");
        xml.push_str(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for rel in &self.entries {
            xml.push_str("<Relationship Id=\"");
            xml.push_str(&escape(&rel.id));
            xml.push_str("\" Type=\"");
            xml.push_str(&escape(&rel.rel_type));
            xml.push_str("\" Target=\"");
            xml.push_str(&escape(&rel.target));
            xml.push('"');
            if rel.is_external {
                xml.push_str(" TargetMode=\"External\"");
            }
            xml.push_str("/>");
        }
        xml.push_str("</Relationships>");
        xml.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="https://example.com/?a=1&amp;b=2" TargetMode="External"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/></Relationships>"#;

    #[test]
    fn parses_entries_in_order() {
        let rels = Relationships::parse(SAMPLE.as_bytes(), "test").unwrap();
        assert_eq!(rels.len(), 2);
        let first = rels.iter().next().unwrap();
        assert_eq!(first.id, "rId1");
        assert_eq!(first.target, "https://example.com/?a=1&b=2");
        assert!(first.is_external);
        assert!(first.is_hyperlink());
        assert!(!rels.get("rId2").unwrap().is_external);
    }

    #[test]
    fn unknown_id_is_none() {
        let rels = Relationships::parse(SAMPLE.as_bytes(), "test").unwrap();
        assert!(rels.get("rId99").is_none());
    }

    #[test]
    fn set_target_rewrites_entry() {
        let mut rels = Relationships::parse(SAMPLE.as_bytes(), "test").unwrap();
        assert!(rels.set_target("rId1", "https://new.example.com"));
        assert_eq!(rels.get("rId1").unwrap().target, "https://new.example.com");
        assert!(!rels.set_target("rId99", "x"));
    }

    #[test]
    fn serialization_round_trips_semantically() {
        let rels = Relationships::parse(SAMPLE.as_bytes(), "test").unwrap();
        let reparsed = Relationships::parse(&rels.to_bytes(), "test").unwrap();
        assert_eq!(
            rels.iter().collect::<Vec<_>>(),
            reparsed.iter().collect::<Vec<_>>()
        );
    }
}
