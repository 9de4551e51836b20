//! FlashCull File System Capability Layer
//!
//! Provides the handles the core operates on without knowing where bytes live:
//! - FolderHandle: enumerate a folder, create sub-folders
//! - FileHandle: read bytes, move itself into another folder
//! - Local disk implementations on top of tokio::fs
//! - Natural-order name comparison

mod browser;
mod file_operations;
mod local;
#[cfg(feature = "mock")]
mod memory;

pub use browser::{extension_of, natural_cmp, read_entries};
pub use file_operations::{ensure_dir, move_file};
pub use local::{LocalFile, LocalFolder};
#[cfg(feature = "mock")]
pub use memory::{MemoryFile, MemoryFolder};

use async_trait::async_trait;
use std::fmt;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

/// File system errors
#[derive(Error, Debug)]
pub enum FsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Path not found: {0}")]
    NotFound(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("File already exists: {0}")]
    AlreadyExists(String),
}

pub type Result<T> = std::result::Result<T, FsError>;

/// Kind of a folder child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Directory,
}

/// Immediate child of a folder
#[derive(Debug, Clone)]
pub enum DirEntry {
    File(Arc<dyn FileHandle>),
    Directory(String),
}

impl DirEntry {
    pub fn name(&self) -> &str {
        match self {
            DirEntry::File(handle) => handle.name(),
            DirEntry::Directory(name) => name,
        }
    }

    pub fn kind(&self) -> EntryKind {
        match self {
            DirEntry::File(_) => EntryKind::File,
            DirEntry::Directory(_) => EntryKind::Directory,
        }
    }
}

/// Capability for reading a single file and relocating it.
///
/// The handle is owned by whoever enumerated it; the core only keeps `Arc`s.
#[async_trait]
pub trait FileHandle: Send + Sync + fmt::Debug {
    /// File name including extension
    fn name(&self) -> &str;

    /// Read at most `limit` bytes from the start of the file
    async fn read_head(&self, limit: usize) -> Result<Vec<u8>>;

    /// Read the whole file
    async fn read_all(&self) -> Result<Vec<u8>>;

    /// Move the underlying file into `folder`, keeping its name
    async fn move_into(&self, folder: &dyn FolderHandle) -> Result<()>;
}

/// Capability for a directory chosen by the user
#[async_trait]
pub trait FolderHandle: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    /// Location used by file handles to address this folder as a move target
    fn location(&self) -> &Path;

    /// Immediate children, files and directories, in enumeration order
    async fn entries(&self) -> Result<Vec<DirEntry>>;

    /// Open the child directory `name`, creating it when missing
    async fn get_or_create_dir(&self, name: &str) -> Result<Arc<dyn FolderHandle>>;
}
