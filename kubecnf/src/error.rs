use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// A document had the right YAML syntax but the wrong structure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ShapeError(pub String);

#[derive(Error, Debug)]
pub enum ParseError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to parse {}: {source}", .path.display())]
    Parse { path: PathBuf, source: ParseError },

    #[error("{action} {}: {source}", .path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        source: io::Error,
    },

    #[error("failed to create backup of {}: {source}", .path.display())]
    Backup { path: PathBuf, source: io::Error },

    #[error("no backup files found for {}", .0.display())]
    NoBackupFound(PathBuf),

    #[error("cluster {0} not found")]
    ClusterNotFound(String),

    #[error("{0} is required")]
    MissingArgument(&'static str),
}

impl Error {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, source: impl Into<ParseError>) -> Self {
        Error::Parse {
            path: path.into(),
            source: source.into(),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
