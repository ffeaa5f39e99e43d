//! Reading and writing config documents.
//!
//! Writes go to a temporary file in the target directory which is then renamed
//! over the target, so a failed write never leaves a truncated config behind.

use std::fs;
use std::io::{self, Write as _};
use std::path::{Path, PathBuf};

use serde_yaml::Value as YamlValue;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::document::{Document, Strictness};
use crate::error::{Error, ParseError, Result};

/// Load the config at `path`, rejecting known fields with the wrong shape.
pub fn load(path: &Path) -> Result<Document> {
    load_with(path, Strictness::Strict)
}

/// Load a merge input. Malformed collections are read as empty.
pub fn load_lenient(path: &Path) -> Result<Document> {
    load_with(path, Strictness::Lenient)
}

pub fn load_with(path: &Path, strictness: Strictness) -> Result<Document> {
    let bytes = read(path)?;
    debug!(path = %path.display(), bytes = bytes.len(), ?strictness, "loading config");
    decode(&bytes, strictness).map_err(|e| Error::parse(path, e))
}

pub fn decode(bytes: &[u8], strictness: Strictness) -> Result<Document, ParseError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Document::default());
    }
    let value: YamlValue = serde_yaml::from_slice(bytes)?;
    Ok(Document::from_value(value, strictness)?)
}

pub fn encode(doc: &Document) -> Result<String, serde_yaml::Error> {
    serde_yaml::to_string(doc)
}

pub fn save(path: &Path, doc: &Document) -> Result<()> {
    let text = encode(doc).map_err(|e| {
        Error::io(
            "failed to encode",
            path,
            io::Error::new(io::ErrorKind::InvalidData, e),
        )
    })?;
    write_atomic(path, text.as_bytes())?;
    debug!(path = %path.display(), bytes = text.len(), "saved config");
    Ok(())
}

/// Read a whole file, reporting a missing file as [`Error::NotFound`].
pub(crate) fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::NotFound(path.to_owned()),
        _ => Error::io("failed to read", path, e),
    })
}

fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    let dir = parent_dir(path);
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder
        .create(dir)
        .map_err(|e| Error::io("failed to create directory", dir, e))
}

/// The file a write to `path` should land in, following symlinks.
fn write_target(path: &Path) -> Result<PathBuf> {
    match fs::canonicalize(path) {
        Ok(target) => Ok(target),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(path.to_owned()),
        Err(e) => Err(Error::io("failed to resolve", path, e)),
    }
}

/// Replace `path` with `bytes`. The new file is only visible once complete.
///
/// If `path` is a symlink, its target is replaced and the link is kept.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let target = write_target(path)?;
    let path = target.as_path();
    let dir = parent_dir(path);
    let mut temp = NamedTempFile::new_in(dir)
        .map_err(|e| Error::io("failed to create temporary file in", dir, e))?;
    temp.write_all(bytes)
        .and_then(|()| temp.flush())
        .and_then(|()| temp.as_file().sync_all())
        .map_err(|e| Error::io("failed to write", path, e))?;
    temp.persist(path)
        .map_err(|e| Error::io("failed to replace", path, e.error))?;
    Ok(())
}
