//! Filesystem capability
//!
//! The engine never touches `std::fs` directly: it reads and writes migration
//! files through an injected [`MigrationFilesystem`], so tests and embedders
//! can swap the disk for memory without global state.

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// File access needed by the migration engine
#[async_trait]
pub trait MigrationFilesystem: Send + Sync {
    /// Names of the files directly inside `dir`, sorted.
    ///
    /// A missing directory yields an empty list, not an error.
    async fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>>;

    /// Read a whole file
    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>>;

    /// Write a whole file, creating parent directories as needed
    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> io::Result<()>;
}

/// Local filesystem backed by `tokio::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFilesystem;

impl LocalFilesystem {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MigrationFilesystem for LocalFilesystem {
    async fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                continue;
            }
            names.push(entry.file_name().to_string_lossy().into_owned());
        }

        names.sort();
        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        fs::read(path).await
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        fs::write(path, data).await
    }

    async fn delete_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path).await
    }
}

/// In-memory filesystem keyed by full path
#[derive(Debug, Default)]
pub struct MemoryFilesystem {
    files: RwLock<BTreeMap<PathBuf, Vec<u8>>>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a file exists
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        self.files.read().contains_key(path.as_ref())
    }

    /// Content of a file, if present
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<Vec<u8>> {
        self.files.read().get(path.as_ref()).cloned()
    }

    /// Number of stored files
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

fn not_found(path: &Path) -> io::Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("{} does not exist", path.display()),
    )
}

#[async_trait]
impl MigrationFilesystem for MemoryFilesystem {
    async fn list_entries(&self, dir: &Path) -> io::Result<Vec<String>> {
        let files = self.files.read();
        let names = files
            .keys()
            .filter(|path| path.parent() == Some(dir))
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        Ok(names)
    }

    async fn read_file(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.contents(path).ok_or_else(|| not_found(path))
    }

    async fn write_file(&self, path: &Path, data: &[u8]) -> io::Result<()> {
        self.files.write().insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    async fn delete_file(&self, path: &Path) -> io::Result<()> {
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| not_found(path))
    }
}
