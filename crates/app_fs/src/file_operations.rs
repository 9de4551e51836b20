//! File operations module
//! Provides directory creation and move-into-directory operations

use crate::{FsError, Result};
use std::path::{Path, PathBuf};

/// Create `path` as a directory unless it already exists as one
pub async fn ensure_dir(path: &Path) -> Result<()> {
    match tokio::fs::metadata(path).await {
        Ok(m) if m.is_dir() => Ok(()),
        Ok(_) => Err(FsError::InvalidPath(format!("Not a directory: {}", path.display()))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tokio::fs::create_dir_all(path).await?;
            tracing::info!("Created directory: {}", path.display());
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Move a file into `target_dir`, keeping its file name.
///
/// Refuses to overwrite an existing file of the same name. Returns the new path.
pub async fn move_file(source: &Path, target_dir: &Path) -> Result<PathBuf> {
    if !tokio::fs::try_exists(source).await? {
        return Err(FsError::NotFound(source.display().to_string()));
    }

    if !tokio::fs::metadata(target_dir).await.map(|m| m.is_dir()).unwrap_or(false) {
        return Err(FsError::InvalidPath(format!(
            "Target must be a directory: {}",
            target_dir.display()
        )));
    }

    let file_name = source
        .file_name()
        .ok_or_else(|| FsError::InvalidPath(format!("Invalid file name: {}", source.display())))?;
    let target = target_dir.join(file_name);

    if tokio::fs::try_exists(&target).await? {
        return Err(FsError::AlreadyExists(target.display().to_string()));
    }

    // Try rename first (fast, same filesystem)
    match tokio::fs::rename(source, &target).await {
        Ok(()) => {
            tracing::info!("Moved: {} -> {}", source.display(), target.display());
        }
        Err(e) => {
            // Unix: EXDEV = 18, Windows: ERROR_NOT_SAME_DEVICE = 17
            let is_cross_device = match e.raw_os_error() {
                Some(18) => cfg!(unix),
                Some(17) => cfg!(windows),
                _ => false,
            };

            if !is_cross_device {
                return Err(e.into());
            }

            tracing::info!(
                "Cross-filesystem move, using copy+delete: {} -> {}",
                source.display(),
                target.display()
            );
            tokio::fs::copy(source, &target).await?;
            tokio::fs::remove_file(source).await?;
        }
    }

    Ok(target)
}
