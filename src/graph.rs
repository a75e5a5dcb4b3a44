//! Cross-document link dependency graph
//!
//! Aggregates extracted hyperlinks across a document set into a directed
//! graph keyed by resolved local file names. Resolution is deliberately
//! loose, matching how word processors mangle targets: case-insensitive
//! file name comparison ignoring any path prefix, percent-decoded, with
//! fragments and query strings stripped. Link text equal to another
//! document's stem also resolves, since Word frequently stores display
//! text where an author meant a file reference. Absolute web/mail URLs are
//! external and never become edges, but still count in per-document
//! totals. Construction is a pure function of the snapshot handed in.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::document::{Document, Hyperlink};
use crate::error::Result;
use crate::scan::scan;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub from: PathBuf,
    pub to: PathBuf,
    /// Number of links from `from` to `to` (deduplicated edge, counted
    /// occurrences).
    pub link_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyNode {
    pub outgoing: Vec<DependencyEdge>,
    /// Number of distinct source documents linking here, not the number of
    /// individual links.
    pub incoming_count: usize,
    /// All hyperlinks extracted from this document, edges or not.
    pub total_links: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyGraph {
    pub nodes: BTreeMap<PathBuf, DependencyNode>,
    /// Documents that could not be read, with the reason; they still get a
    /// (linkless) node.
    pub errors: BTreeMap<PathBuf, String>,
}

/// Scan a tree, extract every document's links, and build the graph.
pub fn build_dependency_graph(root: &Path) -> Result<DependencyGraph> {
    let mut documents = Vec::new();
    let mut errors = BTreeMap::new();
    for path in scan(root) {
        match Document::open(&path) {
            Ok(doc) => documents.push((path, doc.links())),
            Err(err) => {
                errors.insert(path.clone(), err.to_string());
                documents.push((path, Vec::new()));
            }
        }
    }
    let mut graph = build_graph(&documents);
    graph.errors = errors;
    Ok(graph)
}

/// Build the graph from an extracted snapshot.
pub fn build_graph(documents: &[(PathBuf, Vec<Hyperlink>)]) -> DependencyGraph {
    // Case-insensitive name and stem indexes over the scanned set.
    let mut by_name: HashMap<String, Vec<&PathBuf>> = HashMap::new();
    let mut by_stem: HashMap<String, Vec<&PathBuf>> = HashMap::new();
    for (path, _) in documents {
        if let Some(name) = lower_component(path.file_name()) {
            by_name.entry(name).or_default().push(path);
        }
        if let Some(stem) = lower_component(path.file_stem()) {
            by_stem.entry(stem).or_default().push(path);
        }
    }

    let mut edge_counts: HashMap<(&PathBuf, &PathBuf), usize> = HashMap::new();
    let mut incoming_sources: HashMap<&PathBuf, HashSet<&PathBuf>> = HashMap::new();
    let mut totals: HashMap<&PathBuf, usize> = HashMap::new();

    for (source, links) in documents {
        for link in links {
            *totals.entry(source).or_default() += 1;

            let mut targets: HashSet<&PathBuf> = HashSet::new();
            if let Some(name) = link.url.as_deref().and_then(target_file_name) {
                if let Some(matches) = by_name.get(&name) {
                    targets.extend(matches.iter().copied());
                }
            }
            let text_stem = link.text.trim().to_lowercase();
            if !text_stem.is_empty()
                && let Some(matches) = by_stem.get(&text_stem)
            {
                targets.extend(matches.iter().copied());
            }

            for target in targets {
                if target == source {
                    continue;
                }
                *edge_counts.entry((source, target)).or_default() += 1;
                incoming_sources.entry(target).or_default().insert(source);
            }
        }
    }

    let mut graph = DependencyGraph::default();
    for (path, _) in documents {
        let mut outgoing: Vec<DependencyEdge> = edge_counts
            .iter()
            .filter(|((from, _), _)| *from == path)
            .map(|((from, to), count)| DependencyEdge {
                from: (*from).clone(),
                to: (*to).clone(),
                link_count: *count,
            })
            .collect();
        outgoing.sort_by(|a, b| a.to.cmp(&b.to));
        graph.nodes.insert(
            path.clone(),
            DependencyNode {
                outgoing,
                incoming_count: incoming_sources.get(path).map_or(0, HashSet::len),
                total_links: totals.get(path).copied().unwrap_or(0),
            },
        );
    }
    graph
}

/// Reduce a link target to a candidate local file name: scheme-qualified
/// web/mail targets are external (no candidate); everything else is
/// percent-decoded, stripped of fragment/query, slash-normalized, and cut
/// down to its lowercased last component.
fn target_file_name(url: &str) -> Option<String> {
    let trimmed = url.trim();
    let without_scheme = match scheme_of(trimmed) {
        Some(scheme) if scheme.eq_ignore_ascii_case("file") => {
            trimmed[scheme.len() + 1..].trim_start_matches('/')
        }
        Some(_) => return None,
        None => trimmed,
    };
    let without_fragment = without_scheme
        .split(['#', '?'])
        .next()
        .unwrap_or(without_scheme);
    let decoded = urlencoding::decode(without_fragment)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| without_fragment.to_string());
    let name = decoded
        .replace('\\', "/")
        .rsplit('/')
        .next()
        .map(str::to_lowercase)?;
    if name.ends_with(".docx") {
        Some(name)
    } else {
        None
    }
}

fn scheme_of(url: &str) -> Option<&str> {
    let colon = url.find(':')?;
    let scheme = &url[..colon];
    // Single letters are Windows drive prefixes, not schemes.
    if scheme.len() >= 2
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        && scheme.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
    {
        Some(scheme)
    } else {
        None
    }
}

fn lower_component(component: Option<&std::ffi::OsStr>) -> Option<String> {
    component.map(|c| c.to_string_lossy().to_lowercase())
}
