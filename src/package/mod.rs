//! Package container, XML part model, and relationship manifest
//!
//! Everything below the document level: zip I/O, the lossless element tree,
//! and relationship resolution.

pub mod archive;
pub mod rels;
pub mod xml;

pub use archive::{DOCUMENT_PART, DocxPackage, RELS_PART, SETTINGS_PART};
pub use rels::{HYPERLINK_RELTYPE, Relationship, Relationships};
pub use xml::{Element, XmlNode, XmlPart};
