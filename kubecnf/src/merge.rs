use crate::document::{Collection, Document};

/// Append `incoming`'s clusters, contexts and users to `main`'s.
///
/// Entries are not de-duplicated by name. Every other field of `incoming` is
/// ignored.
pub fn merge(mut main: Document, mut incoming: Document) -> Document {
    for collection in Collection::ALL {
        let added = std::mem::take(incoming.collection_mut(collection));
        main.collection_mut(collection).extend(added);
    }
    main
}
