//! Shared fixture builders: small .docx packages assembled in temp dirs.
#![allow(dead_code)]

use std::io::Write;
use std::path::Path;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
pub const HYPERLINK_RELTYPE: &str =
    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";

/// Write a zip package with the given (part name, content) pairs.
pub fn docx_with_parts(path: &Path, parts: &[(&str, &str)]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dirs");
    }
    let file = std::fs::File::create(path).expect("create fixture file");
    let mut zip = zip::ZipWriter::new(file);
    let opts = zip::write::SimpleFileOptions::default();
    for (name, content) in parts {
        zip.start_file(*name, opts).expect("start zip entry");
        zip.write_all(content.as_bytes()).expect("write zip entry");
    }
    zip.finish().expect("finish zip");
}

/// A minimal document part wrapping `inner` in `<w:body>`.
pub fn body_document(inner: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
         <w:document xmlns:w=\"{W_NS}\" xmlns:r=\"{R_NS}\"><w:body>{inner}</w:body></w:document>"
    )
}

pub fn paragraph(inner: &str) -> String {
    format!("<w:p>{inner}</w:p>")
}

pub fn run(text: &str) -> String {
    format!("<w:r><w:t>{text}</w:t></w:r>")
}

pub fn hyperlink(rel_id: &str, text: &str) -> String {
    format!("<w:hyperlink r:id=\"{rel_id}\">{}</w:hyperlink>", run(text))
}

/// A relationship manifest of hyperlink entries (id, target).
pub fn hyperlink_rels(entries: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\r\n\
         <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
    );
    for (id, target) in entries {
        xml.push_str(&format!(
            "<Relationship Id=\"{id}\" Type=\"{HYPERLINK_RELTYPE}\" \
             Target=\"{target}\" TargetMode=\"External\"/>"
        ));
    }
    xml.push_str("</Relationships>");
    xml
}

/// A plain document with one paragraph per entry, plus a styles part that
/// mutation must never touch.
pub fn simple_docx(path: &Path, paragraphs: &[&str]) {
    let body: String = paragraphs.iter().map(|p| paragraph(&run(p))).collect();
    docx_with_parts(
        path,
        &[
            ("word/document.xml", &body_document(&body)),
            ("word/styles.xml", STYLES_PART),
        ],
    );
}

pub const STYLES_PART: &str = "<?xml version=\"1.0\"?>\
    <w:styles xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
    <w:style w:styleId=\"Normal\"/></w:styles>";

/// Read one part's bytes back out of a saved package.
pub fn read_part(path: &Path, part: &str) -> Vec<u8> {
    let file = std::fs::File::open(path).expect("open package");
    let mut zip = zip::ZipArchive::new(file).expect("read zip");
    let mut entry = zip.by_name(part).expect("part present");
    let mut bytes = Vec::new();
    std::io::Read::read_to_end(&mut entry, &mut bytes).expect("read part");
    bytes
}
