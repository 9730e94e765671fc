//! Document sources

use std::fmt;
use std::path::{Path, PathBuf};

/// Where a document comes from: a file or an in-memory buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    Path(PathBuf),
    /// Bytes with a display name used in logs and errors
    Bytes { name: String, data: Vec<u8> },
}

impl Source {
    pub fn bytes(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Source::Bytes {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Identifier carried by every error and log line for this source
    pub fn name(&self) -> String {
        match self {
            Source::Path(path) => path.display().to_string(),
            Source::Bytes { name, .. } => name.clone(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<PathBuf> for Source {
    fn from(path: PathBuf) -> Self {
        Source::Path(path)
    }
}

impl From<&Path> for Source {
    fn from(path: &Path) -> Self {
        Source::Path(path.to_path_buf())
    }
}
