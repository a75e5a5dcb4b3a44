//! Hyperlink extraction and classification
//!
//! Two storage shapes exist in the wild: `<w:hyperlink>` elements that
//! resolve a relationship ID against the manifest (or carry a bookmark
//! anchor inline), and legacy field instructions (`w:instrText` containing
//! `HYPERLINK "..."`). Both are reported. A relationship ID with no
//! manifest entry classifies the link as broken; it is data, never an
//! error.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::package::rels::Relationships;
use crate::package::xml::Element;

use super::models::{Hyperlink, LinkKind};
use super::replace::collect_run_texts;

/// URL inside a `HYPERLINK` field instruction: double-quoted, single-quoted,
/// or a bare token, in that order of preference.
static FIELD_INSTRUCTION_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"HYPERLINK\s+(?:"([^"]+)"|'([^']+)'|([^\s\\]+))"#)
        .expect("field instruction pattern is valid")
});

/// Extract all hyperlinks from a body tree in document order.
pub(crate) fn extract(root: &Element, rels: &Relationships, source: &Path) -> Vec<Hyperlink> {
    let mut links = Vec::new();
    walk(root, None, rels, source, &mut links);
    links
}

fn walk<'a>(
    el: &'a Element,
    paragraph: Option<&'a Element>,
    rels: &Relationships,
    source: &Path,
    out: &mut Vec<Hyperlink>,
) {
    for child in el.child_elements() {
        match child.local_name() {
            "hyperlink" => out.push(from_element(child, rels, source)),
            "instrText" => {
                if let Some(link) = from_field_instruction(child, paragraph.unwrap_or(el), source) {
                    out.push(link);
                }
            }
            "p" => walk(child, Some(child), rels, source, out),
            _ => walk(child, paragraph, rels, source, out),
        }
    }
}

fn from_element(link_el: &Element, rels: &Relationships, source: &Path) -> Hyperlink {
    let (text, _) = collect_run_texts(link_el);
    let rel_id = link_el.attr("id");
    let anchor = link_el.attr("anchor");

    let (url, kind) = match (&rel_id, &anchor) {
        (Some(id), _) => match rels.get(id) {
            Some(rel) => (Some(rel.target.clone()), LinkKind::External),
            None => (None, LinkKind::Broken),
        },
        (None, Some(anchor)) => (Some(anchor.clone()), LinkKind::InternalAnchor),
        (None, None) => (None, LinkKind::Broken),
    };

    Hyperlink {
        text,
        url,
        kind,
        rel_id,
        source_path: source.to_path_buf(),
    }
}

/// Field-instruction hyperlink; the visible text is the enclosing
/// paragraph's text since the field result runs are not delimited per link.
fn from_field_instruction(
    instr: &Element,
    paragraph: &Element,
    source: &Path,
) -> Option<Hyperlink> {
    let url = parse_field_url(&instr.text())?;
    let (text, _) = collect_run_texts(paragraph);
    Some(Hyperlink {
        text,
        url: Some(url),
        kind: LinkKind::External,
        rel_id: None,
        source_path: source.to_path_buf(),
    })
}

pub(crate) fn parse_field_url(instruction: &str) -> Option<String> {
    if !instruction.contains("HYPERLINK") {
        return None;
    }
    let captures = FIELD_INSTRUCTION_URL.captures(instruction)?;
    captures
        .get(1)
        .or_else(|| captures.get(2))
        .or_else(|| captures.get(3))
        .map(|m| m.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::package::xml::XmlPart;
    use std::path::PathBuf;

    fn body(xml: &str) -> Element {
        XmlPart::parse(xml.as_bytes(), "test")
            .unwrap()
            .root()
            .unwrap()
            .clone()
    }

    fn rels(entries: &[(&str, &str)]) -> Relationships {
        let mut xml = String::from(
            r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (id, target) in entries {
            xml.push_str(&format!(
                r#"<Relationship Id="{id}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="{target}" TargetMode="External"/>"#
            ));
        }
        xml.push_str("</Relationships>");
        Relationships::parse(xml.as_bytes(), "test").unwrap()
    }

    #[test]
    fn resolved_link_is_external() {
        let root = body(
            r#"<w:body><w:p><w:hyperlink r:id="rId1"><w:r><w:t>SKF</w:t></w:r></w:hyperlink></w:p></w:body>"#,
        );
        let rels = rels(&[("rId1", "https://example.com")]);
        let links = extract(&root, &rels, &PathBuf::from("a.docx"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].text, "SKF");
        assert_eq!(links[0].url.as_deref(), Some("https://example.com"));
        assert_eq!(links[0].kind, LinkKind::External);
        assert_eq!(links[0].rel_id.as_deref(), Some("rId1"));
    }

    #[test]
    fn missing_relationship_is_broken_not_an_error() {
        let root = body(
            r#"<w:body><w:p><w:hyperlink r:id="rId9"><w:r><w:t>dangling</w:t></w:r></w:hyperlink></w:p></w:body>"#,
        );
        let links = extract(&root, &rels(&[]), &PathBuf::from("a.docx"));
        assert_eq!(links[0].kind, LinkKind::Broken);
        assert_eq!(links[0].url, None);
    }

    #[test]
    fn anchor_link_is_internal() {
        let root = body(
            r#"<w:body><w:p><w:hyperlink w:anchor="section2"><w:r><w:t>see below</w:t></w:r></w:hyperlink></w:p></w:body>"#,
        );
        let links = extract(&root, &rels(&[]), &PathBuf::from("a.docx"));
        assert_eq!(links[0].kind, LinkKind::InternalAnchor);
        assert_eq!(links[0].url.as_deref(), Some("section2"));
    }

    #[test]
    fn links_come_back_in_document_order() {
        let root = body(
            r#"<w:body><w:p><w:hyperlink r:id="rId1"><w:r><w:t>one</w:t></w:r></w:hyperlink></w:p><w:tbl><w:tr><w:tc><w:p><w:hyperlink r:id="rId2"><w:r><w:t>two</w:t></w:r></w:hyperlink></w:p></w:tc></w:tr></w:tbl></w:body>"#,
        );
        let rels = rels(&[("rId1", "https://a.com"), ("rId2", "https://b.com")]);
        let links = extract(&root, &rels, &PathBuf::from("a.docx"));
        let texts: Vec<_> = links.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[test]
    fn deleted_text_excluded_from_visible_text() {
        let root = body(
            r#"<w:body><w:p><w:hyperlink r:id="rId1"><w:r><w:t>kept</w:t></w:r><w:del><w:r><w:delText>dropped</w:delText></w:r></w:del></w:hyperlink></w:p></w:body>"#,
        );
        let rels = rels(&[("rId1", "https://a.com")]);
        let links = extract(&root, &rels, &PathBuf::from("a.docx"));
        assert_eq!(links[0].text, "kept");
    }

    #[test]
    fn field_instruction_url_forms() {
        assert_eq!(
            parse_field_url(r#" HYPERLINK "https://example.com/x" "#).as_deref(),
            Some("https://example.com/x")
        );
        assert_eq!(
            parse_field_url(r#" HYPERLINK 'https://example.com/y' "#).as_deref(),
            Some("https://example.com/y")
        );
        assert_eq!(
            parse_field_url(" HYPERLINK https://example.com/z ").as_deref(),
            Some("https://example.com/z")
        );
        assert_eq!(parse_field_url(" PAGEREF _Toc1 "), None);
    }

    #[test]
    fn field_hyperlink_is_extracted() {
        let root = body(
            r#"<w:body><w:p><w:r><w:instrText xml:space="preserve"> HYPERLINK "https://example.com/field" </w:instrText></w:r><w:r><w:t>click</w:t></w:r></w:p></w:body>"#,
        );
        let links = extract(&root, &rels(&[]), &PathBuf::from("a.docx"));
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url.as_deref(), Some("https://example.com/field"));
        assert_eq!(links[0].text, "click");
        assert_eq!(links[0].rel_id, None);
    }
}
