//! Triage store: the working set and its keep/reject decisions

use app_fs::{natural_cmp, FileHandle};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;

/// Decision recorded for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriageStatus {
    #[default]
    Unreviewed,
    Keep,
    Reject,
}

impl TriageStatus {
    /// Position under the status sort
    fn rank(self) -> u8 {
        match self {
            TriageStatus::Keep => 1,
            TriageStatus::Unreviewed => 2,
            TriageStatus::Reject => 3,
        }
    }
}

/// Sort order of the grid and viewer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortMode {
    #[default]
    NameAsc,
    NameDesc,
    Status,
}

/// One candidate image in the working set
#[derive(Debug, Clone)]
pub struct FileEntry {
    pub name: String,
    pub handle: Arc<dyn FileHandle>,
    pub status: TriageStatus,
}

impl FileEntry {
    pub fn new(handle: Arc<dyn FileHandle>) -> Self {
        Self {
            name: handle.name().to_string(),
            handle,
            status: TriageStatus::Unreviewed,
        }
    }
}

/// Number of entries per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriageCounts {
    pub unreviewed: usize,
    pub keep: usize,
    pub reject: usize,
}

/// Working set in enumeration order. Sorting never reorders it.
#[derive(Debug, Default)]
pub struct TriageStore {
    entries: Vec<FileEntry>,
}

impl TriageStore {
    pub fn new(entries: Vec<FileEntry>) -> Self {
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in enumeration order
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn get(&self, name: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.name == name)
    }

    pub fn status(&self, name: &str) -> Option<TriageStatus> {
        self.get(name).map(|e| e.status)
    }

    /// Set the status of `name`. Returns false for unknown names.
    pub fn mark(&mut self, name: &str, status: TriageStatus) -> bool {
        match self.entries.iter_mut().find(|e| e.name == name) {
            Some(entry) => {
                if entry.status != status {
                    tracing::debug!("Marked {}: {:?} -> {:?}", name, entry.status, status);
                    entry.status = status;
                }
                true
            }
            None => {
                tracing::debug!("Mark ignored, no entry named {}", name);
                false
            }
        }
    }

    /// Sorted view of the working set
    pub fn sorted(&self, mode: SortMode) -> Vec<FileEntry> {
        let mut view = self.entries.clone();
        view.sort_by(|a, b| compare(a, b, mode));
        view
    }

    /// Entries currently marked reject, in enumeration order
    pub fn rejects(&self) -> Vec<FileEntry> {
        self.entries
            .iter()
            .filter(|e| e.status == TriageStatus::Reject)
            .cloned()
            .collect()
    }

    pub fn reject_count(&self) -> usize {
        self.entries.iter().filter(|e| e.status == TriageStatus::Reject).count()
    }

    pub fn counts(&self) -> TriageCounts {
        self.entries.iter().fold(TriageCounts::default(), |mut counts, e| {
            match e.status {
                TriageStatus::Unreviewed => counts.unreviewed += 1,
                TriageStatus::Keep => counts.keep += 1,
                TriageStatus::Reject => counts.reject += 1,
            }
            counts
        })
    }

    /// Drop the named entries. Returns how many were removed.
    pub fn remove(&mut self, names: &[String]) -> usize {
        let names: HashSet<&str> = names.iter().map(String::as_str).collect();
        let before = self.entries.len();
        self.entries.retain(|e| !names.contains(e.name.as_str()));
        before - self.entries.len()
    }
}

fn compare(a: &FileEntry, b: &FileEntry, mode: SortMode) -> Ordering {
    match mode {
        SortMode::NameAsc => natural_cmp(&a.name, &b.name),
        SortMode::NameDesc => natural_cmp(&b.name, &a.name),
        SortMode::Status => a.status.rank().cmp(&b.status.rank()),
    }
}
