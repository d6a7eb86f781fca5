//! PDF inspection
//!
//! Read-only queries on exported PDFs, used to check appends and to report
//! page sizes.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::eps::BoundingBox;

/// Maximum depth followed when resolving inherited page attributes
const MAX_TREE_DEPTH: usize = 32;

/// PDF inspection error types
#[derive(Debug, Error)]
pub enum PdfError {
    #[error("PDF not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),

    #[error("Page {page} out of range (document has {count} pages)")]
    PageOutOfRange { page: u32, count: usize },

    #[error("Page {0} has no valid MediaBox")]
    MissingMediaBox(u32),
}

pub type Result<T> = std::result::Result<T, PdfError>;

fn load(path: &Path) -> Result<Document> {
    if !path.is_file() {
        return Err(PdfError::NotFound(path.to_path_buf()));
    }
    let doc = Document::load(path)?;
    debug!(path = %path.display(), version = %doc.version, "loaded PDF");
    Ok(doc)
}

/// Number of pages in the document
pub fn page_count(path: &Path) -> Result<usize> {
    Ok(load(path)?.get_pages().len())
}

/// MediaBox of a 1-based page, following inheritance up the page tree
pub fn media_box(path: &Path, page: u32) -> Result<BoundingBox> {
    let doc = load(path)?;
    let pages = doc.get_pages();
    let page_id = *pages.get(&page).ok_or(PdfError::PageOutOfRange {
        page,
        count: pages.len(),
    })?;

    let values = inherited_media_box(&doc, page_id).ok_or(PdfError::MissingMediaBox(page))?;
    match values[..] {
        [llx, lly, urx, ury] => Ok(BoundingBox::new(
            llx.min(urx),
            lly.min(ury),
            llx.max(urx),
            lly.max(ury),
        )),
        _ => Err(PdfError::MissingMediaBox(page)),
    }
}

fn inherited_media_box(doc: &Document, page_id: ObjectId) -> Option<Vec<f64>> {
    let mut dict = resolve(doc, doc.get_object(page_id).ok()?)?.as_dict().ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(obj) = dict.get(b"MediaBox") {
            return numbers(doc, obj);
        }
        dict = parent(doc, dict)?;
    }
    None
}

fn parent<'a>(doc: &'a Document, dict: &Dictionary) -> Option<&'a Dictionary> {
    match dict.get(b"Parent").ok()? {
        Object::Reference(id) => doc.get_object(*id).ok()?.as_dict().ok(),
        _ => None,
    }
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

fn numbers(doc: &Document, obj: &Object) -> Option<Vec<f64>> {
    resolve(doc, obj)?
        .as_array()
        .ok()?
        .iter()
        .map(|item| match resolve(doc, item)? {
            Object::Integer(i) => Some(*i as f64),
            Object::Real(r) => Some(*r as f64),
            _ => None,
        })
        .collect()
}
