//! Local disk handles

use crate::{browser, file_operations, DirEntry, FileHandle, FolderHandle, FsError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::AsyncReadExt;

/// A file on the local disk.
///
/// The path is updated in place when the file is moved, so the handle keeps
/// addressing the same file afterwards.
#[derive(Debug)]
pub struct LocalFile {
    name: String,
    path: RwLock<PathBuf>,
}

impl LocalFile {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            name,
            path: RwLock::new(path),
        }
    }

    /// Current location of the file
    pub fn path(&self) -> PathBuf {
        self.path.read().clone()
    }
}

#[async_trait]
impl FileHandle for LocalFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_head(&self, limit: usize) -> Result<Vec<u8>> {
        let path = self.path();
        let file = tokio::fs::File::open(&path).await?;

        let mut data = Vec::with_capacity(limit.min(1 << 20));
        file.take(limit as u64).read_to_end(&mut data).await?;
        Ok(data)
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        Ok(tokio::fs::read(self.path()).await?)
    }

    async fn move_into(&self, folder: &dyn FolderHandle) -> Result<()> {
        let source = self.path();
        let target = file_operations::move_file(&source, folder.location()).await?;
        *self.path.write() = target;
        Ok(())
    }
}

/// A directory on the local disk
#[derive(Debug, Clone)]
pub struct LocalFolder {
    name: String,
    path: PathBuf,
}

impl LocalFolder {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        Self { name, path }
    }
}

#[async_trait]
impl FolderHandle for LocalFolder {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn entries(&self) -> Result<Vec<DirEntry>> {
        browser::read_entries(&self.path).await
    }

    async fn get_or_create_dir(&self, name: &str) -> Result<Arc<dyn FolderHandle>> {
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return Err(FsError::InvalidPath(format!("Invalid folder name: {}", name)));
        }

        let path = self.path.join(name);
        file_operations::ensure_dir(&path).await?;
        Ok(Arc::new(LocalFolder::new(path)))
    }
}
