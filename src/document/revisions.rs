//! Track-changes detection
//!
//! Any revision marker in the body means the document carries unaccepted
//! changes; no accepted/rejected distinction exists in the format. The
//! settings part additionally records whether tracking is switched on for
//! future edits.

use crate::package::archive::SETTINGS_PART;
use crate::package::xml::{Element, XmlPart};

use super::models::TrackChangesStatus;

/// Element local names that mark a tracked insertion, deletion, move, or
/// property change.
const REVISION_MARKERS: &[&str] = &[
    "ins",
    "del",
    "moveFrom",
    "moveTo",
    "rPrChange",
    "pPrChange",
    "sectPrChange",
    "tblPrChange",
    "tblGridChange",
    "trPrChange",
    "tcPrChange",
    "numberingChange",
    "cellIns",
    "cellDel",
    "cellMerge",
];

pub(crate) fn status(body_root: &Element, settings: Option<&[u8]>) -> TrackChangesStatus {
    let revision_count =
        body_root.count_descendants(&|el| REVISION_MARKERS.contains(&el.local_name()));
    TrackChangesStatus {
        has_unaccepted_revisions: revision_count > 0,
        revision_count,
        tracking_enabled: settings.is_some_and(tracking_enabled),
    }
}

/// `<w:trackRevisions/>` in settings.xml enables tracking; an explicit
/// `w:val` of `false`/`0` disables it. An unreadable settings part reads as
/// not enabled.
fn tracking_enabled(settings: &[u8]) -> bool {
    let Ok(part) = XmlPart::parse(settings, SETTINGS_PART) else {
        return false;
    };
    let Some(root) = part.root() else {
        return false;
    };
    match root.find_descendant("trackRevisions") {
        Some(el) => !matches!(el.attr("val").as_deref(), Some("false") | Some("0")),
        None => false,
    }
}
