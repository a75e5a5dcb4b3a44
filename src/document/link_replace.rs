//! Find/replace scoped to hyperlinks
//!
//! The text side reuses the cross-run engine, restricted to runs inside the
//! hyperlink element. The URL side rewrites the relationship manifest
//! entry's target string (or the field instruction text for legacy field
//! hyperlinks) and never touches body runs, so visible text is unchanged by
//! a URL-only replace. A relationship shared by several hyperlinks is
//! rewritten once; every referencing hyperlink still counts its own match.

use std::collections::HashMap;

use regex::Regex;

use crate::package::rels::Relationships;
use crate::package::xml::{Element, XmlNode};

use super::links::parse_field_url;
use super::models::{LinkTarget, Snippet};
use super::replace::{
    apply_run_texts, collect_run_texts, find_ranges, snippet_around, splice_runs, splice_string,
};

#[derive(Debug, Default)]
pub(crate) struct LinkPassOutcome {
    pub match_count: usize,
    pub snippets: Vec<Snippet>,
    pub body_changed: bool,
    pub rels_changed: bool,
}

/// One pass over all hyperlinks. With `replacement = None` this is a pure
/// search; otherwise matching sides are rewritten in memory.
pub(crate) fn process(
    root: &mut Element,
    rels: &mut Relationships,
    matcher: &Regex,
    replacement: Option<&str>,
    target: LinkTarget,
) -> LinkPassOutcome {
    let mut pass = Pass {
        matcher,
        replacement,
        target,
        outcome: LinkPassOutcome::default(),
        rel_matches: HashMap::new(),
        link_index: 0,
    };
    pass.walk(root, rels);
    pass.outcome
}

struct Pass<'a> {
    matcher: &'a Regex,
    replacement: Option<&'a str>,
    target: LinkTarget,
    outcome: LinkPassOutcome,
    /// Pre-pass target and match ranges per relationship ID. The manifest
    /// entry is rewritten when the ID is first seen; later hyperlinks
    /// sharing it must still count against the original URL, not the
    /// mutated one.
    rel_matches: HashMap<String, (String, Vec<(usize, usize)>)>,
    link_index: usize,
}

impl Pass<'_> {
    fn walk(&mut self, el: &mut Element, rels: &mut Relationships) {
        for child in el.children.iter_mut() {
            let XmlNode::Element(child) = child else {
                continue;
            };
            match child.local_name() {
                "hyperlink" => {
                    self.link_index += 1;
                    self.hyperlink(child, rels);
                }
                "instrText" => {
                    if matches!(self.target, LinkTarget::Url | LinkTarget::Both) {
                        self.field_instruction(child);
                    }
                }
                _ => self.walk(child, rels),
            }
        }
    }

    fn hyperlink(&mut self, link_el: &mut Element, rels: &mut Relationships) {
        let index = self.link_index;

        if matches!(self.target, LinkTarget::Text | LinkTarget::Both) {
            let (logical, runs) = collect_run_texts(link_el);
            let ranges = find_ranges(self.matcher, &logical);
            if !ranges.is_empty() {
                self.outcome.match_count += ranges.len();
                self.outcome.snippets.push(Snippet {
                    text: format!("text: {}", snippet_around(&logical, self.matcher)),
                    location: format!("link {index}"),
                });
                if let Some(replacement) = self.replacement {
                    let updates = splice_runs(&logical, &runs, &ranges, replacement);
                    apply_run_texts(link_el, &updates);
                    self.outcome.body_changed = true;
                }
            }
        }

        if matches!(self.target, LinkTarget::Url | LinkTarget::Both) {
            let Some(rel_id) = link_el.attr("id") else {
                return;
            };
            let (url, ranges) = match self.rel_matches.get(&rel_id) {
                Some(cached) => cached.clone(),
                None => {
                    let Some(url) = rels.get(&rel_id).map(|rel| rel.target.clone()) else {
                        return;
                    };
                    let ranges = find_ranges(self.matcher, &url);
                    if let Some(replacement) = self.replacement
                        && !ranges.is_empty()
                    {
                        let new_url = splice_string(&url, &ranges, replacement);
                        if rels.set_target(&rel_id, &new_url) {
                            self.outcome.rels_changed = true;
                        }
                    }
                    self.rel_matches
                        .insert(rel_id.clone(), (url.clone(), ranges.clone()));
                    (url, ranges)
                }
            };
            if ranges.is_empty() {
                return;
            }
            self.outcome.match_count += ranges.len();
            self.outcome.snippets.push(Snippet {
                text: format!("url: {url}"),
                location: format!("link {index} ({rel_id})"),
            });
        }
    }

    fn field_instruction(&mut self, instr: &mut Element) {
        let instruction = instr.text();
        let Some(url) = parse_field_url(&instruction) else {
            return;
        };
        let ranges = find_ranges(self.matcher, &url);
        if ranges.is_empty() {
            return;
        }
        self.outcome.match_count += ranges.len();
        self.outcome.snippets.push(Snippet {
            text: format!("url: {url}"),
            location: "field hyperlink".to_string(),
        });
        if let Some(replacement) = self.replacement {
            let new_url = splice_string(&url, &ranges, replacement);
            let new_instruction = instruction.replace(&url, &new_url);
            instr.set_text(&new_instruction);
            if new_instruction != new_instruction.trim() {
                instr.set_attr("xml:space", "preserve");
            }
            self.outcome.body_changed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::models::MatchMode;
    use crate::document::replace::build_matcher;
    use crate::package::xml::XmlPart;

    const RELS_XML: &str = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink" Target="http://old.example.com/page" TargetMode="External"/></Relationships>"#;

    fn setup(body_xml: &str) -> (Element, Relationships) {
        let root = XmlPart::parse(body_xml.as_bytes(), "test")
            .unwrap()
            .root()
            .unwrap()
            .clone();
        let rels = Relationships::parse(RELS_XML.as_bytes(), "test").unwrap();
        (root, rels)
    }

    const BODY: &str = r#"<w:body><w:p><w:hyperlink r:id="rId1"><w:r><w:t>old site</w:t></w:r></w:hyperlink></w:p></w:body>"#;

    #[test]
    fn url_replace_leaves_visible_text_alone() {
        let (mut root, mut rels) = setup(BODY);
        let matcher = build_matcher("old.example.com", false, MatchMode::Literal).unwrap();
        let outcome = process(
            &mut root,
            &mut rels,
            &matcher,
            Some("new.example.com"),
            LinkTarget::Url,
        );
        assert_eq!(outcome.match_count, 1);
        assert!(outcome.rels_changed);
        assert!(!outcome.body_changed);
        assert_eq!(rels.get("rId1").unwrap().target, "http://new.example.com/page");
        // Visible text untouched.
        let (text, _) = collect_run_texts(&root);
        assert_eq!(text, "old site");
    }

    #[test]
    fn text_target_does_not_touch_manifest() {
        let (mut root, mut rels) = setup(BODY);
        let matcher = build_matcher("old", false, MatchMode::Literal).unwrap();
        let outcome = process(&mut root, &mut rels, &matcher, Some("new"), LinkTarget::Text);
        assert_eq!(outcome.match_count, 1);
        assert!(outcome.body_changed);
        assert!(!outcome.rels_changed);
        assert_eq!(rels.get("rId1").unwrap().target, "http://old.example.com/page");
        let (text, _) = collect_run_texts(&root);
        assert_eq!(text, "new site");
    }

    #[test]
    fn both_sides_rewritten_independently() {
        let (mut root, mut rels) = setup(BODY);
        let matcher = build_matcher("old", false, MatchMode::Literal).unwrap();
        let outcome = process(&mut root, &mut rels, &matcher, Some("new"), LinkTarget::Both);
        // One match in the text, one in the URL.
        assert_eq!(outcome.match_count, 2);
        assert_eq!(rels.get("rId1").unwrap().target, "http://new.example.com/page");
        let (text, _) = collect_run_texts(&root);
        assert_eq!(text, "new site");
    }

    #[test]
    fn shared_relationship_rewritten_once() {
        let body = r#"<w:body><w:p><w:hyperlink r:id="rId1"><w:r><w:t>a</w:t></w:r></w:hyperlink><w:hyperlink r:id="rId1"><w:r><w:t>b</w:t></w:r></w:hyperlink></w:p></w:body>"#;
        let (mut root, mut rels) = setup(body);
        let matcher = build_matcher("old", false, MatchMode::Literal).unwrap();
        let outcome = process(&mut root, &mut rels, &matcher, Some("new"), LinkTarget::Url);
        // Each referencing hyperlink reports its match; the entry itself is
        // rewritten exactly once (no double substitution).
        assert_eq!(outcome.match_count, 2);
        assert_eq!(rels.get("rId1").unwrap().target, "http://new.example.com/page");
    }

    #[test]
    fn shared_relationship_counts_match_search() {
        // Three hyperlinks through one entry: a replace must report the
        // same count a search does, regardless of rewrite order.
        let body = r#"<w:body><w:p><w:hyperlink r:id="rId1"><w:r><w:t>a</w:t></w:r></w:hyperlink><w:hyperlink r:id="rId1"><w:r><w:t>b</w:t></w:r></w:hyperlink><w:hyperlink r:id="rId1"><w:r><w:t>c</w:t></w:r></w:hyperlink></w:p></w:body>"#;
        let matcher = build_matcher("old", false, MatchMode::Literal).unwrap();

        let (mut root, mut rels) = setup(body);
        let searched = process(&mut root, &mut rels, &matcher, None, LinkTarget::Url);

        let (mut root, mut rels) = setup(body);
        let replaced = process(&mut root, &mut rels, &matcher, Some("new"), LinkTarget::Url);

        assert_eq!(searched.match_count, 3);
        assert_eq!(replaced.match_count, searched.match_count);
        assert_eq!(rels.get("rId1").unwrap().target, "http://new.example.com/page");
    }

    #[test]
    fn plain_body_text_is_out_of_scope() {
        let body = r#"<w:body><w:p><w:r><w:t>old text outside links</w:t></w:r></w:p></w:body>"#;
        let (mut root, mut rels) = setup(body);
        let matcher = build_matcher("old", false, MatchMode::Literal).unwrap();
        let outcome = process(&mut root, &mut rels, &matcher, Some("new"), LinkTarget::Both);
        assert_eq!(outcome.match_count, 0);
        assert!(!outcome.body_changed);
    }

    #[test]
    fn field_instruction_url_is_rewritten() {
        let body = r#"<w:body><w:p><w:r><w:instrText xml:space="preserve"> HYPERLINK "http://old.example.com/doc" </w:instrText></w:r></w:p></w:body>"#;
        let (mut root, mut rels) = setup(body);
        let matcher = build_matcher("old.example.com", false, MatchMode::Literal).unwrap();
        let outcome = process(
            &mut root,
            &mut rels,
            &matcher,
            Some("new.example.com"),
            LinkTarget::Url,
        );
        assert_eq!(outcome.match_count, 1);
        assert!(outcome.body_changed);
        let instr = root.find_descendant("instrText").unwrap();
        assert!(instr.text().contains("http://new.example.com/doc"));
    }
}
