use crate::document::{Collection, Document};

/// Drop every cluster, context and user called `name`.
///
/// If `name` was the current context it is set to an empty string; the key is
/// kept since clients expect it. Returns whether any entry matched.
pub fn remove(mut doc: Document, name: &str) -> (Document, bool) {
    let mut removed = false;
    for collection in Collection::ALL {
        let entries = doc.collection_mut(collection);
        let before = entries.len();
        entries.retain(|entry| !entry.is_named(name));
        removed |= entries.len() != before;
    }

    if doc.current_context.as_deref() == Some(name) {
        doc.current_context = Some(String::new());
    }

    (doc, removed)
}
