//! Merges converted PDFs into one document, preserving input order.

use std::path::Path;

use lopdf::{dictionary, Document, Object, ObjectId};

use crate::error::ConversionError;

/// Concatenates `sources` into a single PDF at `destination`. Page order
/// follows the slice order exactly.
pub fn merge_pdfs<P: AsRef<Path>>(sources: &[P], destination: &Path) -> Result<(), ConversionError> {
    if sources.is_empty() {
        return Err(ConversionError::Merge("no documents to merge".to_string()));
    }

    let mut merged = Document::with_version("1.5");
    let mut merged_pages: Vec<ObjectId> = Vec::new();
    let mut next_id = 1;

    for source in sources {
        let source = source.as_ref();
        let mut doc = Document::load(source).map_err(|e| {
            ConversionError::Merge(format!("failed to load '{}': {}", source.display(), e))
        })?;
        doc.renumber_objects_with(next_id);
        next_id = doc.max_id + 1;

        // get_pages is keyed by page number, so iteration preserves the
        // document's own page order.
        merged_pages.extend(doc.get_pages().into_values());

        for (object_id, object) in doc.objects {
            if is_structural_object(&object) {
                continue;
            }
            merged.objects.insert(object_id, object);
        }
    }

    if merged_pages.is_empty() {
        return Err(ConversionError::Merge(
            "merged documents contain no pages".to_string(),
        ));
    }

    merged.max_id = next_id - 1;
    let pages_id = merged.new_object_id();

    for page_id in &merged_pages {
        if let Ok(Object::Dictionary(page)) = merged.get_object_mut(*page_id) {
            page.set("Parent", pages_id);
        }
    }

    let kids: Vec<Object> = merged_pages.iter().map(|id| (*id).into()).collect();
    merged.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => merged_pages.len() as i64,
        }),
    );

    let catalog_id = merged.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    merged.trailer.set("Root", catalog_id);
    merged.compress();

    if let Some(parent) = destination.parent() {
        std::fs::create_dir_all(parent)
            .map_err(|e| ConversionError::Merge(format!("failed to create output dir: {}", e)))?;
    }
    merged
        .save(destination)
        .map_err(|e| ConversionError::Merge(format!("failed to save merged PDF: {}", e)))?;

    Ok(())
}

/// Per-document catalogs and page trees are replaced by the merged ones.
fn is_structural_object(object: &Object) -> bool {
    object
        .as_dict()
        .ok()
        .and_then(|dict| dict.get(b"Type").ok())
        .and_then(|value| value.as_name().ok())
        .map(|name| name == b"Catalog" || name == b"Pages")
        .unwrap_or(false)
}
