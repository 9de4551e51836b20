//! One open folder: working set, view state and preview cache

use crate::cache::{PreviewCache, PreviewOutcome};
use crate::config::{AppConfig, TrashConfig};
use crate::format;
use crate::navigation::ViewState;
use crate::resolver::ResolvePreview;
use crate::trash::{self, Confirm, TrashReport};
use crate::triage::{FileEntry, SortMode, TriageCounts, TriageStatus, TriageStore};
use crate::AppError;
use app_fs::{DirEntry, FolderHandle};
use parking_lot::RwLock;
use std::sync::Arc;

/// Everything tied to the currently open folder. Dropping the session
/// releases its cached previews.
///
/// Lock order is store, then view.
pub struct Session {
    root: Arc<dyn FolderHandle>,
    store: RwLock<TriageStore>,
    view: RwLock<ViewState>,
    cache: PreviewCache,
    trash: TrashConfig,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").field("root", &self.root).finish_non_exhaustive()
    }
}

impl Session {
    /// Enumerate `root` and build the working set from allowed image files
    pub async fn open(
        root: Arc<dyn FolderHandle>,
        config: &AppConfig,
        resolver: Arc<dyn ResolvePreview>,
    ) -> Result<Self, AppError> {
        let entries: Vec<FileEntry> = root
            .entries()
            .await?
            .into_iter()
            .filter_map(|entry| match entry {
                DirEntry::File(handle) if format::is_allowed(handle.name()) => Some(FileEntry::new(handle)),
                _ => None,
            })
            .collect();

        tracing::info!("Opened {} with {} images", root.location().display(), entries.len());

        Ok(Self {
            root,
            store: RwLock::new(TriageStore::new(entries)),
            view: RwLock::new(ViewState::new(config.grid.sort_mode, config.grid.columns)),
            cache: PreviewCache::new(resolver, config.preview.cache_unavailable)
                .with_prefetch_limit(config.preview.prefetch_concurrency),
            trash: config.trash.clone(),
        })
    }

    pub fn root(&self) -> &Arc<dyn FolderHandle> {
        &self.root
    }

    pub fn cache(&self) -> &PreviewCache {
        &self.cache
    }

    pub fn len(&self) -> usize {
        self.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.read().is_empty()
    }

    /// Working set in the current sort order
    pub fn sorted_view(&self) -> Vec<FileEntry> {
        let store = self.store.read();
        self.view.read().view(&store)
    }

    /// Snapshot of the view state
    pub fn view_state(&self) -> ViewState {
        self.view.read().clone()
    }

    pub fn status(&self, name: &str) -> Option<TriageStatus> {
        self.store.read().status(name)
    }

    pub fn mark(&self, name: &str, status: TriageStatus) -> bool {
        self.store.write().mark(name, status)
    }

    pub fn reject_count(&self) -> usize {
        self.store.read().reject_count()
    }

    pub fn counts(&self) -> TriageCounts {
        self.store.read().counts()
    }

    pub fn set_sort_mode(&self, mode: SortMode) {
        let store = self.store.read();
        self.view.write().set_sort_mode(mode, &store);
    }

    pub fn set_columns(&self, columns: usize) -> usize {
        self.view.write().set_columns(columns)
    }

    /// Select an index of the sorted view; out of range is ignored
    pub fn navigate(&self, target: isize) -> bool {
        let len = self.len();
        self.view.write().navigate(target, len)
    }

    /// Move the selection forward or back by `delta`
    pub fn step(&self, delta: isize) -> bool {
        let len = self.len();
        self.view.write().step(delta, len)
    }

    pub fn selected(&self) -> Option<usize> {
        self.view.read().selected()
    }

    pub fn selected_entry(&self) -> Option<FileEntry> {
        let store = self.store.read();
        self.view.read().selected_entry(&store)
    }

    pub fn clear_selection(&self) {
        self.view.write().clear_selection();
    }

    /// Mark whatever is selected
    pub fn mark_selected(&self, status: TriageStatus) -> bool {
        let mut store = self.store.write();
        self.view.write().mark_selected(&mut store, status)
    }

    /// Preview for the entry called `name`
    pub async fn preview(&self, name: &str) -> PreviewOutcome {
        let handle = self.store.read().get(name).map(|e| e.handle.clone());
        match handle {
            Some(handle) => self.cache.request(handle.as_ref()).await,
            None => PreviewOutcome::Unavailable,
        }
    }

    /// Request previews for the whole working set, in view order
    pub async fn prefetch_all(&self) -> Vec<PreviewOutcome> {
        let handles: Vec<_> = self.sorted_view().into_iter().map(|e| e.handle).collect();
        self.cache.prefetch(&handles).await
    }

    /// Move every reject into the holding folder and drop it from the
    /// working set. On error nothing is removed.
    pub async fn trash_rejects(&self, confirm: &dyn Confirm) -> Result<TrashReport, AppError> {
        let rejects = self.store.read().rejects();
        if rejects.is_empty() {
            return Ok(TrashReport::NothingToMove);
        }

        if self.trash.confirm {
            let message = trash::confirm_message(rejects.len(), &self.trash.folder_name);
            if !confirm.confirm(&message).await {
                tracing::info!("Trash declined");
                return Ok(TrashReport::Declined);
            }
        }

        let moved = trash::move_all(self.root.as_ref(), &rejects, &self.trash.folder_name).await?;

        self.store.write().remove(&moved);
        for name in &moved {
            self.cache.invalidate(name);
        }
        self.view.write().clear_selection();

        Ok(TrashReport::Moved {
            count: moved.len(),
            folder: self.trash.folder_name.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{Preview, PreviewSource};
    use app_fs::{FileHandle, LocalFolder, MemoryFolder};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct EchoResolver;

    #[async_trait]
    impl ResolvePreview for EchoResolver {
        async fn resolve(&self, file: &dyn FileHandle) -> Option<Preview> {
            let data = file.read_all().await.ok()?;
            Some(Preview::new(file.name(), "image/jpeg", PreviewSource::Direct, data))
        }
    }

    struct Answer {
        yes: bool,
        asked: AtomicBool,
    }

    impl Answer {
        fn new(yes: bool) -> Self {
            Self {
                yes,
                asked: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl Confirm for Answer {
        async fn confirm(&self, message: &str) -> bool {
            assert!(message.starts_with("Move "));
            self.asked.store(true, Ordering::SeqCst);
            self.yes
        }
    }

    async fn open(folder: &MemoryFolder) -> Session {
        Session::open(Arc::new(folder.clone()), &AppConfig::default(), Arc::new(EchoResolver))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_open_filters_entries() {
        let folder = MemoryFolder::new("/shoot");
        folder.add_file("a.JPG", vec![1]);
        folder.add_file("b.nef", vec![2]);
        folder.add_file("notes.txt", vec![3]);
        folder.add_file("README", vec![4]);
        folder.add_dir("sub.jpg");

        let session = open(&folder).await;
        let names: Vec<_> = session.sorted_view().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["a.JPG", "b.nef"]);
        assert_eq!(session.counts().unreviewed, 2);
    }

    #[tokio::test]
    async fn test_preview_goes_through_cache() {
        let folder = MemoryFolder::new("/shoot");
        let file = folder.add_file("a.jpg", vec![7, 7]);
        let session = open(&folder).await;

        let first = session.preview("a.jpg").await;
        let second = session.preview("a.jpg").await;
        assert!(Arc::ptr_eq(first.preview().unwrap(), second.preview().unwrap()));
        assert_eq!(file.reads(), 1);
        assert!(!session.preview("missing.jpg").await.is_ready());
    }

    #[tokio::test]
    async fn test_trash_removes_exactly_rejects() {
        let folder = MemoryFolder::new("/shoot");
        for name in ["a.jpg", "b.jpg", "c.jpg", "d.jpg", "e.jpg"] {
            folder.add_file(name, vec![0]);
        }
        let session = open(&folder).await;
        session.mark("a.jpg", TriageStatus::Reject);
        session.mark("c.jpg", TriageStatus::Reject);
        session.mark("c.jpg", TriageStatus::Reject);
        session.mark("d.jpg", TriageStatus::Keep);
        session.navigate(4);
        session.preview("a.jpg").await;

        let answer = Answer::new(true);
        let report = session.trash_rejects(&answer).await.unwrap();

        assert!(answer.asked.load(Ordering::SeqCst));
        assert_eq!(
            report,
            TrashReport::Moved {
                count: 2,
                folder: "_Trash".into()
            }
        );
        let names: Vec<_> = session.sorted_view().into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["b.jpg", "d.jpg", "e.jpg"]);
        assert_eq!(session.status("d.jpg"), Some(TriageStatus::Keep));
        assert_eq!(session.status("b.jpg"), Some(TriageStatus::Unreviewed));
        assert_eq!(session.selected(), None);
        assert!(session.cache().peek("a.jpg").is_none());
        assert_eq!(folder.file_names(), vec!["b.jpg", "d.jpg", "e.jpg"]);
    }

    #[tokio::test]
    async fn test_trash_declined_or_empty() {
        let folder = MemoryFolder::new("/shoot");
        folder.add_file("a.jpg", vec![0]);
        let session = open(&folder).await;

        let answer = Answer::new(false);
        assert_eq!(session.trash_rejects(&answer).await.unwrap(), TrashReport::NothingToMove);
        assert!(!answer.asked.load(Ordering::SeqCst));

        session.mark("a.jpg", TriageStatus::Reject);
        assert_eq!(session.trash_rejects(&answer).await.unwrap(), TrashReport::Declined);
        assert_eq!(session.reject_count(), 1);
        assert_eq!(folder.file_names(), vec!["a.jpg"]);
    }

    #[tokio::test]
    async fn test_trash_failure_leaves_working_set() {
        let folder = MemoryFolder::new("/shoot");
        folder.add_file("a.jpg", vec![0]);
        let b = folder.add_file("b.jpg", vec![0]);
        b.fail_moves(true);
        let session = open(&folder).await;
        session.mark("a.jpg", TriageStatus::Reject);
        session.mark("b.jpg", TriageStatus::Reject);

        let err = session.trash_rejects(&Answer::new(true)).await.unwrap_err();

        assert!(matches!(err, AppError::Trash { moved: 1, total: 2, .. }));
        assert_eq!(err.user_message(), "Error moving files.");
        assert_eq!(session.len(), 2);
        assert_eq!(session.reject_count(), 2);
    }

    #[tokio::test]
    async fn test_mark_selected_by_name_under_status_sort() {
        let folder = MemoryFolder::new("/shoot");
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            folder.add_file(name, vec![0]);
        }
        let session = open(&folder).await;
        session.set_sort_mode(SortMode::Status);
        session.navigate(0);

        assert!(session.mark_selected(TriageStatus::Reject));
        assert_eq!(session.status("a.jpg"), Some(TriageStatus::Reject));
        assert_eq!(session.selected_entry().unwrap().name, "a.jpg");
        assert_eq!(session.selected(), Some(2));
    }

    #[tokio::test]
    async fn test_trash_on_local_disk() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.jpg", "b.nef", "c.cr2", "notes.txt"] {
            std::fs::write(dir.path().join(name), name).unwrap();
        }

        let session = Session::open(Arc::new(LocalFolder::new(dir.path())), &AppConfig::default(), Arc::new(EchoResolver))
            .await
            .unwrap();
        assert_eq!(session.len(), 3);
        assert_eq!(session.preview("b.nef").await.preview().unwrap().bytes(), b"b.nef");

        session.mark("b.nef", TriageStatus::Reject);
        session.mark("c.cr2", TriageStatus::Reject);
        session.mark("a.jpg", TriageStatus::Keep);

        let report = session.trash_rejects(&Answer::new(true)).await.unwrap();

        assert!(matches!(report, TrashReport::Moved { count: 2, .. }));
        let trash = dir.path().join("_Trash");
        assert_eq!(std::fs::read(trash.join("b.nef")).unwrap(), b"b.nef");
        assert!(trash.join("c.cr2").exists());
        assert!(!dir.path().join("b.nef").exists());
        assert!(dir.path().join("a.jpg").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(session.len(), 1);
        assert_eq!(session.status("a.jpg"), Some(TriageStatus::Keep));
    }
}
