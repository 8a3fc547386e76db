//! Size reducer: page-by-page re-serialization of oversized documents.
//!
//! The rewrite copies every page unchanged into a fresh document and lets
//! lopdf compress its streams on save. It is not a guaranteed shrink: image
//! streams are already compressed, so the result can come out about the same
//! size or, in edge cases, slightly larger. Downsampling images would be the
//! way to get a real reduction.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use tracing::{debug, info};

use super::paginator::save_document;
use crate::error::{Error, Result};

/// Page attributes a page can inherit from its ancestors in the page tree.
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// What the size reducer did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOutcome {
    /// No file at the given path; nothing attempted
    Missing,
    /// The file is within budget and was left untouched
    WithinBudget { size: u64 },
    /// The file was rewritten in place
    Rewritten { before: u64, after: u64 },
}

/// Rewrite `path` if it is larger than `threshold` bytes.
///
/// The new document is saved to a temporary file next to `path` and renamed
/// over it only once complete, so on error the original is left intact.
pub fn reduce_if_oversized(path: &Path, threshold: u64) -> Result<ReduceOutcome> {
    let before = match fs::metadata(path) {
        Ok(meta) => meta.len(),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("{} does not exist, skipping size reduction", path.display());
            return Ok(ReduceOutcome::Missing);
        }
        Err(e) => {
            return Err(Error::Reduction(format!(
                "failed to stat {}: {e}",
                path.display()
            )));
        }
    };

    if before <= threshold {
        debug!(
            "{} is {} bytes, within the {} byte threshold",
            path.display(),
            before,
            threshold
        );
        return Ok(ReduceOutcome::WithinBudget { size: before });
    }

    info!(
        "{} is {} bytes (threshold {}), rewriting",
        path.display(),
        before,
        threshold
    );

    let source = Document::load(path)
        .map_err(|e| Error::Reduction(format!("failed to load {}: {e}", path.display())))?;
    let mut rewritten = rewrite_pages(&source)?;

    save_document(&mut rewritten, path).map_err(|e| Error::Reduction(e.to_string()))?;

    let after = fs::metadata(path).map(|m| m.len()).map_err(|e| {
        Error::Reduction(format!("failed to stat {}: {e}", path.display()))
    })?;
    info!("Rewrote {}: {} -> {} bytes", path.display(), before, after);

    Ok(ReduceOutcome::Rewritten { before, after })
}

/// Copy every page of `source`, in order, into a new document.
pub fn rewrite_pages(source: &Document) -> Result<Document> {
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();
    if page_ids.is_empty() {
        return Err(Error::Reduction("document has no pages".to_string()));
    }

    let mut document = Document::with_version(source.version.clone());

    for (object_id, object) in &source.objects {
        match object.type_name().unwrap_or(b"") {
            b"Catalog" | b"Pages" | b"Page" | b"Outlines" | b"Outline" => {}
            _ => {
                document.objects.insert(*object_id, object.clone());
            }
        }
    }

    document.max_id = source.max_id;
    let pages_id = document.new_object_id();

    for &page_id in &page_ids {
        let page = source
            .get_dictionary(page_id)
            .map_err(|e| Error::Reduction(format!("failed to read page {page_id:?}: {e}")))?;

        let mut new_page = page.clone();
        for key in INHERITABLE {
            if !new_page.has(key)
                && let Some(value) = inherited(source, page, key)
            {
                new_page.set(key, value);
            }
        }
        new_page.set("Parent", Object::Reference(pages_id));
        document.objects.insert(page_id, Object::Dictionary(new_page));
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();

    #[allow(clippy::cast_possible_wrap)]
    let total_pages = kids.len() as i64;

    let pages_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Pages".to_vec())),
        ("Kids", Object::Array(kids)),
        ("Count", Object::Integer(total_pages)),
    ]);
    document.objects.insert(pages_id, Object::Dictionary(pages_dict));

    let catalog_id = document.new_object_id();
    let catalog_dict = Dictionary::from_iter([
        ("Type", Object::Name(b"Catalog".to_vec())),
        ("Pages", Object::Reference(pages_id)),
    ]);
    document.objects.insert(catalog_id, Object::Dictionary(catalog_dict));

    document.trailer.set("Root", Object::Reference(catalog_id));

    document.renumber_objects();
    document.compress();

    Ok(document)
}

/// Look `key` up on the ancestors of `page`.
fn inherited(doc: &Document, page: &Dictionary, key: &[u8]) -> Option<Object> {
    let mut current = page;
    // Bounded walk, in case of a cyclic page tree.
    for _ in 0..64 {
        let parent_id = current.get(b"Parent").and_then(Object::as_reference).ok()?;
        let parent = doc.get_dictionary(parent_id).ok()?;
        if let Ok(value) = parent.get(key) {
            return Some(value.clone());
        }
        current = parent;
    }
    None
}
