//! Directory listing and name ordering

use crate::{DirEntry, FsError, LocalFile, Result};
use std::cmp::Ordering;
use std::path::Path;
use std::sync::Arc;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// List the immediate children of a directory, in the order the OS returns them
pub async fn read_entries<P: AsRef<Path>>(path: P) -> Result<Vec<DirEntry>> {
    let path = path.as_ref();

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(FsError::NotFound(path.display().to_string()));
        }
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(FsError::AccessDenied(path.display().to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    if !metadata.is_dir() {
        return Err(FsError::InvalidPath(format!("Not a directory: {}", path.display())));
    }

    let mut entries = Vec::new();
    let mut dir = tokio::fs::read_dir(path).await?;

    while let Some(entry) = dir.next_entry().await? {
        let file_type = match entry.file_type().await {
            Ok(t) => t,
            Err(e) => {
                tracing::debug!("Skipping unreadable entry {:?}: {}", entry.path(), e);
                continue;
            }
        };

        let name = entry.file_name().to_string_lossy().to_string();
        if file_type.is_dir() {
            entries.push(DirEntry::Directory(name));
        } else if file_type.is_file() {
            entries.push(DirEntry::File(Arc::new(LocalFile::new(entry.path()))));
        }
    }

    Ok(entries)
}

/// Lowercased text after the last dot, empty when there is no dot.
/// A bare ".jpg" counts as a jpg.
pub fn extension_of(name: &str) -> String {
    match name.rsplit_once('.') {
        Some((_, ext)) => ext.to_lowercase(),
        None => String::new(),
    }
}

/// Case- and accent-insensitive, numeric-aware comparison.
///
/// "IMG2.jpg" < "img10.jpg", "photo.jpg" < "photo2.jpg", "é.jpg" < "f.jpg".
/// Names that differ only in case or accents compare equal.
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    natural_sort_key(a).cmp(&natural_sort_key(b))
}

/// Generate a natural sort key (handles numbers correctly)
fn natural_sort_key(s: &str) -> Vec<NaturalSortPart> {
    let mut parts = Vec::new();
    let mut current_num = String::new();

    // Decompose so accents become separate marks that can be dropped
    for c in s.nfd().filter(|c| !is_combining_mark(*c)) {
        if c.is_ascii_digit() {
            current_num.push(c);
            continue;
        }

        if !current_num.is_empty() {
            parts.push(NaturalSortPart::num(&current_num));
            current_num.clear();
        }

        if c.is_alphabetic() {
            parts.extend(c.to_lowercase().map(NaturalSortPart::Letter));
        } else {
            parts.push(NaturalSortPart::Punct(c));
        }
    }

    if !current_num.is_empty() {
        parts.push(NaturalSortPart::num(&current_num));
    }

    parts
}

/// Variant order gives punctuation < digits < letters
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum NaturalSortPart {
    Punct(char),
    Num(u64),
    Letter(char),
}

impl NaturalSortPart {
    // Digit runs too long for u64 saturate instead of being dropped
    fn num(digits: &str) -> Self {
        NaturalSortPart::Num(digits.parse::<u64>().unwrap_or(u64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EntryKind;

    #[test]
    fn test_natural_sort() {
        let mut names = vec!["image10.jpg", "image2.jpg", "image1.jpg", "image20.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["image1.jpg", "image2.jpg", "image10.jpg", "image20.jpg"]);
    }

    #[test]
    fn test_natural_sort_ignores_case() {
        let mut names = vec!["IMG10.jpg", "IMG2.jpg", "img1.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["img1.jpg", "IMG2.jpg", "IMG10.jpg"]);
        assert_eq!(natural_cmp("DSC_0001.NEF", "dsc_0001.nef"), Ordering::Equal);
    }

    #[test]
    fn test_natural_sort_punctuation_before_digits() {
        let mut names = vec!["photo2.jpg", "photo.jpg", "photo10.jpg", "photo_1.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["photo.jpg", "photo_1.jpg", "photo2.jpg", "photo10.jpg"]);
    }

    #[test]
    fn test_natural_sort_folds_accents() {
        let mut names = vec!["photo2.jpg", "photo.jpg", "f.jpg", "\u{e9}.jpg"];
        names.sort_by(|a, b| natural_cmp(a, b));
        assert_eq!(names, vec!["\u{e9}.jpg", "f.jpg", "photo.jpg", "photo2.jpg"]);

        assert_eq!(natural_cmp("\u{c9}t\u{e9}.nef", "ete.nef"), Ordering::Equal);
        assert_eq!(natural_cmp("\u{e9}cole.jpg", "ecrin.jpg"), Ordering::Less);
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("photo.JPG"), "jpg");
        assert_eq!(extension_of("archive.tar.CR3"), "cr3");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".jpg"), "jpg");
    }

    #[tokio::test]
    async fn test_read_entries() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.jpg"), b"a").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();

        let mut entries = read_entries(dir.path()).await.unwrap();
        entries.sort_by(|a, b| a.name().cmp(b.name()));

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name(), "a.jpg");
        assert_eq!(entries[0].kind(), EntryKind::File);
        assert_eq!(entries[1].name(), "sub");
        assert_eq!(entries[1].kind(), EntryKind::Directory);
    }

    #[tokio::test]
    async fn test_read_entries_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_entries(dir.path().join("nope")).await;
        assert!(matches!(result, Err(FsError::NotFound(_))));
    }
}
