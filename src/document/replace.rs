//! Text search/replace across run boundaries
//!
//! Word splits a paragraph's text into runs wherever formatting, spell-check
//! state, or editing history changes, so a query like "world" may be stored
//! as "wor" + "ld". Matching therefore works on the paragraph's logical text
//! (run texts concatenated in document order) and matched ranges are mapped
//! back onto the contributing text nodes afterwards. The replacement is
//! attached to the node contributing the first matched character; later
//! contributing nodes lose their matched portion but keep their formatting
//! properties, which live on the run, not the text node.

use regex::{Regex, RegexBuilder};

use crate::error::{DocxError, Result};
use crate::package::xml::{Element, XmlNode};

use super::models::{MatchMode, Snippet};

/// Build the matcher for a query. Literal mode goes through `regex::escape`
/// so user input is never interpreted; pattern mode surfaces compile errors
/// as `InvalidPattern`.
pub(crate) fn build_matcher(query: &str, case_sensitive: bool, mode: MatchMode) -> Result<Regex> {
    if query.is_empty() {
        return Err(DocxError::InvalidQuery);
    }
    let pattern = match mode {
        MatchMode::Literal => regex::escape(query),
        MatchMode::Pattern => query.to_string(),
    };
    RegexBuilder::new(&pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| DocxError::InvalidPattern(e.to_string()))
}

/// One text node's contribution to a scope's logical text.
#[derive(Debug)]
pub(crate) struct RunText {
    /// Byte offset of this node's text within the logical string.
    pub start: usize,
    pub text: String,
}

/// Collect the logical text of a scope element (paragraph or hyperlink) and
/// the contributing `w:t` nodes in document order. Text inside `w:del`
/// (tracked deletions) is excluded.
pub(crate) fn collect_run_texts(scope: &Element) -> (String, Vec<RunText>) {
    let mut logical = String::new();
    let mut runs = Vec::new();
    collect(scope, false, &mut logical, &mut runs);
    (logical, runs)
}

fn collect(el: &Element, in_del: bool, logical: &mut String, runs: &mut Vec<RunText>) {
    for child in el.child_elements() {
        let deleted = in_del || child.local_name() == "del";
        if deleted {
            continue;
        }
        if child.local_name() == "t" {
            let text = child.text();
            runs.push(RunText {
                start: logical.len(),
                text: text.clone(),
            });
            logical.push_str(&text);
        } else {
            collect(child, deleted, logical, runs);
        }
    }
}

/// Non-overlapping, non-empty match ranges (byte offsets) in `text`.
pub(crate) fn find_ranges(matcher: &Regex, text: &str) -> Vec<(usize, usize)> {
    matcher
        .find_iter(text)
        .filter(|m| m.start() < m.end())
        .map(|m| (m.start(), m.end()))
        .collect()
}

/// Map match ranges on the logical string back onto per-node output
/// strings. Each match's replacement lands in the node owning the match's
/// first character; other overlapped nodes contribute nothing for the
/// matched span.
pub(crate) fn splice_runs(
    logical: &str,
    runs: &[RunText],
    matches: &[(usize, usize)],
    replacement: &str,
) -> Vec<Option<String>> {
    let mut out = Vec::with_capacity(runs.len());
    for run in runs {
        let a = run.start;
        let b = a + run.text.len();
        let mut rebuilt = String::new();
        let mut cursor = a;
        for &(s, e) in matches {
            if e <= a {
                continue;
            }
            if s >= b {
                break;
            }
            let keep_until = s.clamp(a, b);
            if keep_until > cursor {
                rebuilt.push_str(&logical[cursor..keep_until]);
            }
            if s >= a {
                rebuilt.push_str(replacement);
            }
            cursor = e.clamp(cursor, b);
        }
        if cursor < b {
            rebuilt.push_str(&logical[cursor..b]);
        }
        out.push(if rebuilt == run.text { None } else { Some(rebuilt) });
    }
    out
}

/// Splice a replacement over match ranges in a plain string (used for
/// relationship targets and field instructions, which are single strings).
pub(crate) fn splice_string(text: &str, matches: &[(usize, usize)], replacement: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for &(s, e) in matches {
        out.push_str(&text[cursor..s]);
        out.push_str(replacement);
        cursor = e;
    }
    out.push_str(&text[cursor..]);
    out
}

/// Write updated node texts back in the same traversal order used by
/// `collect_run_texts`. Edited nodes with boundary whitespace get
/// `xml:space="preserve"` so Word does not strip it.
pub(crate) fn apply_run_texts(scope: &mut Element, updates: &[Option<String>]) {
    let mut idx = 0;
    apply(scope, false, &mut idx, updates);
}

fn apply(el: &mut Element, in_del: bool, idx: &mut usize, updates: &[Option<String>]) {
    for child in el.children.iter_mut() {
        let XmlNode::Element(child) = child else {
            continue;
        };
        let deleted = in_del || child.local_name() == "del";
        if deleted {
            continue;
        }
        if child.local_name() == "t" {
            if let Some(Some(new_text)) = updates.get(*idx) {
                child.set_text(new_text);
                if new_text != new_text.trim() || new_text.is_empty() {
                    child.set_attr("xml:space", "preserve");
                }
            }
            *idx += 1;
        } else {
            apply(child, deleted, idx, updates);
        }
    }
}

/// Context snippet around the first match: the trimmed paragraph,
/// windowed with ellipses once it exceeds ~100 characters.
pub(crate) fn snippet_around(text: &str, matcher: &Regex) -> String {
    let trimmed = text.trim();
    let total_chars = trimmed.chars().count();
    if total_chars <= 100 {
        return trimmed.to_string();
    }
    let (match_start, match_end) = matcher
        .find(trimmed)
        .map(|m| (m.start(), m.end()))
        .unwrap_or((0, 0));
    let start_char = trimmed[..match_start].chars().count().saturating_sub(40);
    let match_chars = trimmed[match_start..match_end].chars().count();
    let end_char = (trimmed[..match_start].chars().count() + match_chars + 40).min(total_chars);
    let window: String = trimmed
        .chars()
        .skip(start_char)
        .take(end_char - start_char)
        .collect();
    format!("...{window}...")
}

/// Visit every paragraph at or under `el` in document order (depth-first),
/// which includes paragraphs nested in table cells. A scope that is itself
/// a `w:p` counts as one paragraph.
pub(crate) fn for_each_paragraph<'a>(el: &'a Element, f: &mut impl FnMut(&'a Element)) {
    if el.local_name() == "p" {
        f(el);
        return;
    }
    for child in el.child_elements() {
        for_each_paragraph(child, f);
    }
}

pub(crate) fn for_each_paragraph_mut(el: &mut Element, f: &mut impl FnMut(&mut Element)) {
    if el.local_name() == "p" {
        f(el);
        return;
    }
    for child in el.children.iter_mut() {
        let XmlNode::Element(child) = child else {
            continue;
        };
        for_each_paragraph_mut(child, f);
    }
}

/// Count matches across all paragraphs without mutating anything.
pub(crate) fn find_in_body(root: &Element, matcher: &Regex) -> (usize, Vec<Snippet>) {
    let mut count = 0;
    let mut snippets = Vec::new();
    let mut index = 0;
    for_each_paragraph(root, &mut |paragraph| {
        index += 1;
        let (logical, _) = collect_run_texts(paragraph);
        let ranges = find_ranges(matcher, &logical);
        if !ranges.is_empty() {
            count += ranges.len();
            snippets.push(Snippet {
                text: snippet_around(&logical, matcher),
                location: format!("paragraph {index}"),
            });
        }
    });
    (count, snippets)
}

/// Replace matches across all paragraphs in the body tree (in memory only;
/// persistence is the caller's explicit step). Returns the match count and
/// per-paragraph snippets of the pre-replacement text.
pub(crate) fn replace_in_body(
    root: &mut Element,
    matcher: &Regex,
    replacement: &str,
) -> (usize, Vec<Snippet>) {
    let mut count = 0;
    let mut snippets = Vec::new();
    let mut index = 0;
    for_each_paragraph_mut(root, &mut |paragraph| {
        index += 1;
        let (logical, runs) = collect_run_texts(paragraph);
        let ranges = find_ranges(matcher, &logical);
        if ranges.is_empty() {
            return;
        }
        count += ranges.len();
        snippets.push(Snippet {
            text: snippet_around(&logical, matcher),
            location: format!("paragraph {index}"),
        });
        let updates = splice_runs(&logical, &runs, &ranges, replacement);
        apply_run_texts(paragraph, &updates);
    });
    (count, snippets)
}
