//! Error types shared by the parsers, collectors and the watch loop.

use std::io;
use std::path::PathBuf;

/// Error type for parsing failures (CPU lists, counter tables, status files).
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
}

impl ParseError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self {
            message: msg.into(),
        }
    }
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "parse error: {}", self.message)
    }
}

impl std::error::Error for ParseError {}

/// Error returned by every collector read.
#[derive(Debug)]
pub enum CollectError {
    /// A pseudo-file or directory could not be read.
    Io { path: PathBuf, source: io::Error },
    /// A pseudo-file was read but its content is malformed.
    Parse { path: PathBuf, error: ParseError },
}

impl CollectError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        CollectError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, error: ParseError) -> Self {
        CollectError::Parse {
            path: path.into(),
            error,
        }
    }

    /// Path of the pseudo-file the error refers to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            CollectError::Io { path, .. } | CollectError::Parse { path, .. } => path,
        }
    }

    /// True when the underlying I/O error is `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CollectError::Io { source, .. } if source.kind() == io::ErrorKind::NotFound)
    }
}

impl std::fmt::Display for CollectError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            CollectError::Parse { path, error } => {
                write!(f, "{}: {}", path.display(), error)
            }
        }
    }
}

impl std::error::Error for CollectError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CollectError::Io { source, .. } => Some(source),
            CollectError::Parse { error, .. } => Some(error),
        }
    }
}
