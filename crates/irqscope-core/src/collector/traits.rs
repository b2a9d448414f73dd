//! Abstractions for filesystem access to enable testing and mocking.
//!
//! The `FileSystem` trait lets collectors read the real `/proc` and `/sys`
//! trees on Linux or an in-memory [`MockFs`](super::MockFs) in tests.

use std::io;
use std::path::{Path, PathBuf};

/// Abstraction for filesystem operations.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Lists entries in a directory, as full paths.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;

    /// Checks if a path is a directory.
    fn is_dir(&self, path: &Path) -> bool;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_fs_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("interrupts");
        std::fs::write(&file, "CPU0\n").unwrap();
        std::fs::create_dir(dir.path().join("irq")).unwrap();

        let fs = RealFs::new();
        assert_eq!(fs.read_to_string(&file).unwrap(), "CPU0\n");
        assert!(fs.read_to_string(Path::new("/nonexistent/path/12345")).is_err());
        assert!(fs.is_dir(&dir.path().join("irq")));
        assert!(!fs.is_dir(&file));

        let mut entries = fs.read_dir(dir.path()).unwrap();
        entries.sort();
        assert_eq!(entries, vec![dir.path().join("interrupts"), dir.path().join("irq")]);
    }
}
