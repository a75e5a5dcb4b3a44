//! Package container I/O
//!
//! A .docx file is a zip archive of named parts. The whole archive is read
//! into memory on open; parts that are never written are carried through to
//! `save` byte-identical. Saving writes a complete archive to a temporary
//! file next to the destination and promotes it with an atomic rename, so a
//! failed write never leaves a partial or truncated document behind.

use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};

use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use crate::error::{DocxError, Result};

/// Main content part; mandatory.
pub const DOCUMENT_PART: &str = "word/document.xml";
/// Relationship manifest for the main content part; optional in degenerate
/// documents.
pub const RELS_PART: &str = "word/_rels/document.xml.rels";
/// Document settings; optional.
pub const SETTINGS_PART: &str = "word/settings.xml";

/// An opened package: ordered part list, names as stored in the archive.
#[derive(Debug, Clone)]
pub struct DocxPackage {
    path: PathBuf,
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxPackage {
    pub fn open(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        let mut archive = ZipArchive::new(Cursor::new(bytes))
            .map_err(|e| DocxError::CorruptPackage(format!("{}: {e}", path.display())))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| DocxError::CorruptPackage(format!("{}: {e}", path.display())))?;
            if entry.is_dir() {
                continue;
            }
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry
                .read_to_end(&mut data)
                .map_err(|e| DocxError::CorruptPackage(format!("{}: {e}", path.display())))?;
            parts.push((entry.name().to_string(), data));
        }

        let package = Self {
            path: path.to_path_buf(),
            parts,
        };
        if package.part(DOCUMENT_PART).is_none() {
            // Distinguish the common case of pointing the tool at a workbook.
            let detail = if package.part("xl/workbook.xml").is_some() {
                format!("{DOCUMENT_PART} (this looks like an Excel workbook, not a Word document)")
            } else {
                DOCUMENT_PART.to_string()
            };
            return Err(DocxError::PartNotFound(detail));
        }
        Ok(package)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn part(&self, name: &str) -> Option<&[u8]> {
        self.parts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, data)| data.as_slice())
    }

    pub fn read_part(&self, name: &str) -> Result<&[u8]> {
        self.part(name)
            .ok_or_else(|| DocxError::PartNotFound(name.to_string()))
    }

    /// Replace a part's content, appending the part if it does not exist.
    /// All other parts are left untouched.
    pub fn write_part(&mut self, name: &str, data: Vec<u8>) {
        match self.parts.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = data,
            None => self.parts.push((name.to_string(), data)),
        }
    }

    /// Flush all parts into a fresh archive at `dest`. The archive is fully
    /// written to a temporary file first and only then renamed into place.
    pub fn save(&self, dest: &Path) -> Result<()> {
        let parent = dest.parent().unwrap_or_else(|| Path::new("."));
        let write_failed = |message: String| DocxError::WriteFailed {
            path: dest.to_path_buf(),
            message,
        };

        let mut tmp = tempfile::Builder::new()
            .prefix(".docxgrep-")
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| write_failed(e.to_string()))?;

        {
            let mut writer = zip::ZipWriter::new(tmp.as_file_mut());
            let options = SimpleFileOptions::default()
                .compression_method(zip::CompressionMethod::Deflated);
            for (name, data) in &self.parts {
                writer
                    .start_file(name.as_str(), options)
                    .map_err(|e| write_failed(e.to_string()))?;
                writer
                    .write_all(data)
                    .map_err(|e| write_failed(e.to_string()))?;
            }
            writer.finish().map_err(|e| write_failed(e.to_string()))?;
        }

        tmp.persist(dest)
            .map_err(|e| write_failed(e.error.to_string()))?;
        Ok(())
    }

    pub fn part_names(&self) -> impl Iterator<Item = &str> {
        self.parts.iter().map(|(n, _)| n.as_str())
    }
}
