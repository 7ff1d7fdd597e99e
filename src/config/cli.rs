use crate::domain::ports::ResultStore;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores run records under a base directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn full_path(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl ResultStore for LocalStorage {
    fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        Ok(fs::read(self.full_path(path))?)
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(full_path, data)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_creates_directories() {
        let dir = TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path().join("nested/results"));

        storage.write_file("run.json", b"{}").unwrap();
        assert_eq!(storage.read_file("run.json").unwrap(), b"{}");
        assert!(storage.read_file("missing.json").is_err());
    }
}
