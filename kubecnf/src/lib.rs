pub mod backup;
pub mod codec;
pub mod document;
pub mod error;
pub mod merge;
pub mod ops;
pub mod remove;

use std::path::{Path, PathBuf};

use tracing::warn;

pub use backup::Snapshot;
pub use document::{Collection, Document, Entry, Strictness};
pub use error::{Error, Result};

pub const DEFAULT_CONFIG_PATH: &str = "~/.kube/config";

/// Expand a leading `~/` to the home directory.
pub fn expand_path(path: &str) -> PathBuf {
    expand_with_home(path, dirs::home_dir().as_deref())
}

fn expand_with_home(path: &str, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~/"), home) {
        (Some(rest), Some(home)) => home.join(rest),
        (Some(_), None) => {
            warn!(path, "could not determine home directory, using path as given");
            PathBuf::from(path)
        }
        (None, _) => PathBuf::from(path),
    }
}
