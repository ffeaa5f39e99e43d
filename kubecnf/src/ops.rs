//! The commands `kubecnf` runs against a main config file.
//!
//! Each takes the already-expanded path of the main config. Mutating commands
//! back the file up right before writing the new version.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::backup::{self, Snapshot};
use crate::codec;
use crate::document::{Collection, Document, Strictness};
use crate::error::{Error, Result};
use crate::merge::merge;
use crate::remove::remove as remove_entries;

#[derive(Debug)]
pub enum AddOutcome {
    /// There was no main config; the input was copied to its place.
    Created,
    Merged {
        snapshot: Snapshot,
        /// Entries appended across clusters, contexts and users.
        added: usize,
    },
}

fn exists(path: &Path) -> Result<bool> {
    path.try_exists()
        .map_err(|e| Error::io("failed to check", path, e))
}

/// Add the clusters, contexts and users of `input` to `main`.
pub fn add(main: &Path, input: &Path) -> Result<AddOutcome> {
    if !exists(main)? {
        let bytes = codec::read(input)?;
        codec::decode(&bytes, Strictness::Lenient).map_err(|e| Error::parse(input, e))?;
        codec::ensure_parent_dir(main)?;
        codec::write_atomic(main, &bytes)?;
        info!(config = %main.display(), input = %input.display(), "created config from input");
        return Ok(AddOutcome::Created);
    }

    let mut current = codec::load(main)?;
    if current.is_blank() {
        debug!(config = %main.display(), "config is empty, starting from skeleton");
        current = Document::skeleton();
    }
    let incoming = codec::load_lenient(input)?;
    let added: usize = Collection::ALL
        .iter()
        .map(|&collection| {
            let count = incoming.collection(collection).len();
            debug!(collection = collection.key(), count, "entries to merge");
            count
        })
        .sum();

    let snapshot = backup::snapshot(main)?;
    codec::save(main, &merge(current, incoming))?;
    info!(config = %main.display(), added, "merged config");
    Ok(AddOutcome::Merged { snapshot, added })
}

/// Remove every entry called `name` from `main`.
///
/// Nothing is backed up or written if no entry matches.
pub fn remove(main: &Path, name: &str) -> Result<Snapshot> {
    let current = codec::load(main)?;
    let (updated, removed) = remove_entries(current, name);
    if !removed {
        return Err(Error::ClusterNotFound(name.to_owned()));
    }

    let snapshot = backup::snapshot(main)?;
    codec::save(main, &updated)?;
    info!(config = %main.display(), cluster = name, "removed cluster");
    Ok(snapshot)
}

/// Sorted cluster names. A missing config has none; it is not created.
pub fn list(main: &Path) -> Result<Vec<String>> {
    let doc = match codec::load(main) {
        Ok(doc) => doc,
        Err(Error::NotFound(_)) => {
            debug!(config = %main.display(), "config missing, listing empty skeleton");
            Document::skeleton()
        }
        Err(e) => return Err(e),
    };
    Ok(doc.cluster_names())
}

pub fn rollback(main: &Path) -> Result<PathBuf> {
    backup::rollback(main)
}
