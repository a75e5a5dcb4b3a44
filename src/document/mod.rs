//! Document-level operations
//!
//! Couples a file path with its parsed parts and exposes extraction,
//! detection, and the search/replace engines on top of the package layer.

pub(crate) mod link_replace;
pub(crate) mod links;
pub mod models;
pub(crate) mod replace;
pub(crate) mod revisions;

mod handle;

pub use handle::Document;
pub use models::*;
