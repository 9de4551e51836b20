//! View state: sort order, grid columns and the selected index

use crate::config::{MAX_COLUMNS, MIN_COLUMNS};
use crate::triage::{FileEntry, SortMode, TriageStatus, TriageStore};

/// How the working set is currently presented.
///
/// `selected`, when set, indexes the view produced by `sort_mode`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewState {
    sort_mode: SortMode,
    columns: usize,
    selected: Option<usize>,
}

impl ViewState {
    pub fn new(sort_mode: SortMode, columns: usize) -> Self {
        Self {
            sort_mode,
            columns: columns.clamp(MIN_COLUMNS, MAX_COLUMNS),
            selected: None,
        }
    }

    pub fn sort_mode(&self) -> SortMode {
        self.sort_mode
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Set the grid column count, clamped to the supported range
    pub fn set_columns(&mut self, columns: usize) -> usize {
        self.columns = columns.clamp(MIN_COLUMNS, MAX_COLUMNS);
        self.columns
    }

    /// The sorted view this state describes
    pub fn view(&self, store: &TriageStore) -> Vec<FileEntry> {
        store.sorted(self.sort_mode)
    }

    /// Entry under the selection
    pub fn selected_entry(&self, store: &TriageStore) -> Option<FileEntry> {
        let index = self.selected?;
        self.view(store).into_iter().nth(index)
    }

    /// Select `target` if it lies inside a view of `len` entries.
    /// Anything else is ignored; there is no wraparound.
    pub fn navigate(&mut self, target: isize, len: usize) -> bool {
        match usize::try_from(target) {
            Ok(index) if index < len => {
                self.selected = Some(index);
                true
            }
            _ => false,
        }
    }

    /// Move the selection by `delta` within a view of `len` entries
    pub fn step(&mut self, delta: isize, len: usize) -> bool {
        match self.selected {
            Some(current) => self.navigate(current as isize + delta, len),
            None => false,
        }
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Change the sort mode. An active selection keeps pointing at the same
    /// entry in the new order.
    pub fn set_sort_mode(&mut self, mode: SortMode, store: &TriageStore) {
        let selected_name = self.selected_entry(store).map(|e| e.name);
        self.sort_mode = mode;
        self.selected = selected_name.and_then(|name| self.index_of(store, &name));
    }

    /// Index of `name` in the current view
    pub fn index_of(&self, store: &TriageStore, name: &str) -> Option<usize> {
        self.view(store).iter().position(|e| e.name == name)
    }

    /// Mark the selected entry. The entry is looked up by name, so the
    /// selection stays on it even when the status sort moves it.
    pub fn mark_selected(&mut self, store: &mut TriageStore, status: TriageStatus) -> bool {
        let Some(entry) = self.selected_entry(store) else {
            return false;
        };

        store.mark(&entry.name, status);
        self.selected = self.index_of(store, &entry.name);
        true
    }

    /// Drop a selection that no longer fits a view of `len` entries
    pub fn revalidate(&mut self, len: usize) {
        if self.selected.is_some_and(|i| i >= len) {
            self.selected = None;
        }
    }
}

impl Default for ViewState {
    fn default() -> Self {
        Self::new(SortMode::NameAsc, 6)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use app_fs::MemoryFolder;

    fn store(names: &[&str]) -> TriageStore {
        let folder = MemoryFolder::new("/photos");
        TriageStore::new(
            names
                .iter()
                .map(|n| FileEntry::new(folder.add_file(n, vec![0u8; 4])))
                .collect(),
        )
    }

    #[test]
    fn test_navigate_bounds() {
        let mut view = ViewState::default();
        assert!(view.navigate(0, 5));
        assert!(!view.navigate(-1, 5));
        assert_eq!(view.selected(), Some(0));

        assert!(view.navigate(4, 5));
        assert!(!view.navigate(5, 5));
        assert!(!view.step(1, 5));
        assert_eq!(view.selected(), Some(4));

        assert!(view.step(-1, 5));
        assert_eq!(view.selected(), Some(3));
    }

    #[test]
    fn test_navigate_empty_view() {
        let mut view = ViewState::default();
        assert!(!view.navigate(0, 0));
        assert_eq!(view.selected(), None);
        assert!(!view.step(1, 0));
    }

    #[test]
    fn test_columns_clamped() {
        let mut view = ViewState::new(SortMode::NameAsc, 1);
        assert_eq!(view.columns(), 4);
        assert_eq!(view.set_columns(8), 8);
        assert_eq!(view.set_columns(30), 12);
    }

    #[test]
    fn test_sort_change_keeps_selected_entry() {
        let mut store = store(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut view = ViewState::default();
        view.navigate(0, store.len());

        view.set_sort_mode(SortMode::NameDesc, &store);
        assert_eq!(view.selected(), Some(2));
        assert_eq!(view.selected_entry(&store).unwrap().name, "a.jpg");

        store.mark("c.jpg", TriageStatus::Reject);
        view.set_sort_mode(SortMode::Status, &store);
        assert_eq!(view.selected_entry(&store).unwrap().name, "a.jpg");
    }

    #[test]
    fn test_mark_selected_follows_entry() {
        let mut store = store(&["a.jpg", "b.jpg", "c.jpg"]);
        let mut view = ViewState::new(SortMode::Status, 6);
        view.navigate(2, store.len());
        assert_eq!(view.selected_entry(&store).unwrap().name, "c.jpg");

        assert!(view.mark_selected(&mut store, TriageStatus::Keep));
        assert_eq!(store.status("c.jpg"), Some(TriageStatus::Keep));
        assert_eq!(view.selected(), Some(0));
        assert_eq!(view.selected_entry(&store).unwrap().name, "c.jpg");
    }

    #[test]
    fn test_revalidate_after_shrink() {
        let mut view = ViewState::default();
        view.navigate(4, 5);
        view.revalidate(5);
        assert_eq!(view.selected(), Some(4));
        view.revalidate(3);
        assert_eq!(view.selected(), None);
    }
}
