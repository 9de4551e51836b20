//! Moving rejected files into the session's holding folder

use crate::triage::FileEntry;
use crate::AppError;
use app_fs::FolderHandle;
use async_trait::async_trait;

/// Yes/no gate shown before files are moved
#[async_trait]
pub trait Confirm: Send + Sync {
    async fn confirm(&self, message: &str) -> bool;
}

/// Confirmation that always agrees
#[derive(Debug, Default, Clone, Copy)]
pub struct AutoConfirm;

#[async_trait]
impl Confirm for AutoConfirm {
    async fn confirm(&self, message: &str) -> bool {
        tracing::debug!("Auto-confirmed: {}", message);
        true
    }
}

/// Prompt text for moving `count` files
pub fn confirm_message(count: usize, folder_name: &str) -> String {
    format!("Move {} files to '{}'?", count, folder_name)
}

/// How a trash request ended without error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrashReport {
    /// No entry was marked reject
    NothingToMove,
    /// The user said no
    Declined,
    /// Every reject was moved and dropped from the working set
    Moved { count: usize, folder: String },
}

/// Move every entry into `folder_name` under `root`.
///
/// Stops at the first failure; files moved before it stay in the holding
/// folder and the error reports how many that was.
pub async fn move_all(root: &dyn FolderHandle, entries: &[FileEntry], folder_name: &str) -> Result<Vec<String>, AppError> {
    let total = entries.len();
    let fail = |moved: usize, reason: String| AppError::Trash { moved, total, reason };

    let holding = root
        .get_or_create_dir(folder_name)
        .await
        .map_err(|e| fail(0, e.to_string()))?;

    let mut moved = Vec::with_capacity(total);
    for entry in entries {
        if let Err(e) = entry.handle.move_into(holding.as_ref()).await {
            tracing::error!("Failed to move {} into {}: {}", entry.name, folder_name, e);
            return Err(fail(moved.len(), format!("{}: {}", entry.name, e)));
        }
        tracing::debug!("Moved: {} -> {}", entry.name, folder_name);
        moved.push(entry.name.clone());
    }

    tracing::info!("Moved {} files to {}", moved.len(), folder_name);
    Ok(moved)
}
