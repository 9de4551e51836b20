//! In-memory folder and file handles for testing.
//!
//! All handles created from one root share a single tree, so a file moved into
//! a sub-folder disappears from its old folder's entries and shows up in the
//! new one. Reads and moves are counted so tests can assert on I/O.

use crate::{DirEntry, FileHandle, FolderHandle, FsError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

#[derive(Debug, Default)]
struct Tree {
    dirs: RwLock<BTreeSet<PathBuf>>,
    files: RwLock<Vec<Arc<MemoryFile>>>,
}

impl Tree {
    fn file_at(&self, path: &Path) -> bool {
        self.files.read().iter().any(|f| *f.path.read() == path)
    }
}

/// In-memory file
#[derive(Debug)]
pub struct MemoryFile {
    tree: Weak<Tree>,
    name: String,
    data: Vec<u8>,
    path: RwLock<PathBuf>,
    reads: AtomicUsize,
    fail_reads: AtomicBool,
    fail_moves: AtomicBool,
}

impl MemoryFile {
    /// Current location of the file
    pub fn path(&self) -> PathBuf {
        self.path.read().clone()
    }

    /// Number of read calls served so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    /// Make every following read fail with an I/O error
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every following move fail with a permission error
    pub fn fail_moves(&self, fail: bool) {
        self.fail_moves.store(fail, Ordering::SeqCst);
    }

    fn check_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(io::Error::new(io::ErrorKind::Other, format!("read failed: {}", self.name)).into());
        }
        Ok(())
    }
}

#[async_trait]
impl FileHandle for MemoryFile {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_head(&self, limit: usize) -> Result<Vec<u8>> {
        self.check_read()?;
        Ok(self.data[..self.data.len().min(limit)].to_vec())
    }

    async fn read_all(&self) -> Result<Vec<u8>> {
        self.check_read()?;
        Ok(self.data.clone())
    }

    async fn move_into(&self, folder: &dyn FolderHandle) -> Result<()> {
        if self.fail_moves.load(Ordering::SeqCst) {
            return Err(FsError::AccessDenied(self.path().display().to_string()));
        }

        let tree = self
            .tree
            .upgrade()
            .ok_or_else(|| FsError::NotFound(self.path().display().to_string()))?;

        let target_dir = folder.location().to_path_buf();
        if !tree.dirs.read().contains(&target_dir) {
            return Err(FsError::NotFound(target_dir.display().to_string()));
        }

        let target = target_dir.join(&self.name);
        if tree.file_at(&target) {
            return Err(FsError::AlreadyExists(target.display().to_string()));
        }

        *self.path.write() = target;
        Ok(())
    }
}

/// In-memory folder
#[derive(Debug, Clone)]
pub struct MemoryFolder {
    tree: Arc<Tree>,
    name: String,
    path: PathBuf,
}

impl MemoryFolder {
    /// Create an empty root folder at `path`
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let tree = Arc::new(Tree::default());
        tree.dirs.write().insert(path.clone());
        Self::at(tree, path)
    }

    fn at(tree: Arc<Tree>, path: PathBuf) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        Self { tree, name, path }
    }

    /// Add a file with the given contents to this folder
    pub fn add_file(&self, name: &str, data: impl Into<Vec<u8>>) -> Arc<MemoryFile> {
        let file = Arc::new(MemoryFile {
            tree: Arc::downgrade(&self.tree),
            name: name.to_string(),
            data: data.into(),
            path: RwLock::new(self.path.join(name)),
            reads: AtomicUsize::new(0),
            fail_reads: AtomicBool::new(false),
            fail_moves: AtomicBool::new(false),
        });
        self.tree.files.write().push(file.clone());
        file
    }

    /// Add an empty sub-directory to this folder
    pub fn add_dir(&self, name: &str) -> MemoryFolder {
        let path = self.path.join(name);
        self.tree.dirs.write().insert(path.clone());
        Self::at(self.tree.clone(), path)
    }

    /// Names of files currently located directly in this folder
    pub fn file_names(&self) -> Vec<String> {
        self.tree
            .files
            .read()
            .iter()
            .filter(|f| f.path.read().parent() == Some(self.path.as_path()))
            .map(|f| f.name.clone())
            .collect()
    }
}

#[async_trait]
impl FolderHandle for MemoryFolder {
    fn name(&self) -> &str {
        &self.name
    }

    fn location(&self) -> &Path {
        &self.path
    }

    async fn entries(&self) -> Result<Vec<DirEntry>> {
        if !self.tree.dirs.read().contains(&self.path) {
            return Err(FsError::NotFound(self.path.display().to_string()));
        }

        let mut entries: Vec<DirEntry> = self
            .tree
            .files
            .read()
            .iter()
            .filter(|f| f.path.read().parent() == Some(self.path.as_path()))
            .map(|f| DirEntry::File(f.clone() as Arc<dyn FileHandle>))
            .collect();

        entries.extend(
            self.tree
                .dirs
                .read()
                .iter()
                .filter(|d| d.parent() == Some(self.path.as_path()))
                .filter_map(|d| d.file_name())
                .map(|n| DirEntry::Directory(n.to_string_lossy().to_string())),
        );

        Ok(entries)
    }

    async fn get_or_create_dir(&self, name: &str) -> Result<Arc<dyn FolderHandle>> {
        Ok(Arc::new(self.add_dir(name)))
    }
}
