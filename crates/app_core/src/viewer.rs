//! Single-item viewer driven by keyboard commands

use crate::cache::PreviewOutcome;
use crate::command::{CommandId, InputHandler};
use crate::session::Session;
use crate::triage::{FileEntry, TriageStatus};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Key presses published by the shell. Only subscribed viewers see them.
#[derive(Debug, Clone)]
pub struct KeyEvents {
    tx: broadcast::Sender<String>,
}

impl KeyEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(64);
        Self { tx }
    }

    /// Publish a key name. Returns how many subscribers received it.
    pub fn press(&self, key: &str) -> usize {
        self.tx.send(key.to_string()).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }

    pub fn subscribers(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for KeyEvents {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of handling one key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewerAction {
    /// Selection moved to this index
    Moved(usize),
    Marked { name: String, status: TriageStatus },
    Closed,
    /// Unbound key, boundary reached, or viewer already closed
    Ignored,
}

/// Viewer over the session's sorted view.
///
/// Holds the key subscription while open; closing or dropping it clears the
/// selection and unsubscribes.
pub struct Viewer {
    session: Arc<Session>,
    input: InputHandler,
    keys: Option<broadcast::Receiver<String>>,
}

impl Viewer {
    /// Open on `index` of the sorted view. `None` if the index is out of range.
    pub fn open(
        session: Arc<Session>,
        index: usize,
        events: &KeyEvents,
        bindings: &HashMap<String, Vec<String>>,
    ) -> Option<Self> {
        if !session.navigate(index as isize) {
            return None;
        }

        Some(Self {
            session,
            input: InputHandler::new(bindings),
            keys: Some(events.subscribe()),
        })
    }

    pub fn is_open(&self) -> bool {
        self.keys.is_some()
    }

    /// Entry being shown
    pub fn current(&self) -> Option<FileEntry> {
        self.keys.as_ref()?;
        self.session.selected_entry()
    }

    /// Whole sorted view plus the selected index
    pub fn filmstrip(&self) -> (Vec<FileEntry>, Option<usize>) {
        (self.session.sorted_view(), self.session.selected())
    }

    /// Preview of the entry being shown
    pub async fn current_preview(&self) -> Option<PreviewOutcome> {
        let entry = self.current()?;
        Some(self.session.preview(&entry.name).await)
    }

    /// Apply one key press
    pub fn handle_key(&mut self, key: &str) -> ViewerAction {
        if !self.is_open() {
            return ViewerAction::Ignored;
        }
        let Some(command) = self.input.handle_key(key) else {
            return ViewerAction::Ignored;
        };

        match command.id.as_str() {
            CommandId::NAV_NEXT_ITEM => self.step(1),
            CommandId::NAV_PREV_ITEM => self.step(-1),
            CommandId::TRIAGE_KEEP => self.mark(TriageStatus::Keep),
            CommandId::TRIAGE_REJECT => self.mark(TriageStatus::Reject),
            CommandId::TRIAGE_RESET => self.mark(TriageStatus::Unreviewed),
            CommandId::VIEWER_CLOSE => {
                self.close();
                ViewerAction::Closed
            }
            other => {
                tracing::warn!("Unknown command: {}", other);
                ViewerAction::Ignored
            }
        }
    }

    fn step(&self, delta: isize) -> ViewerAction {
        if !self.session.step(delta) {
            return ViewerAction::Ignored;
        }
        self.session.selected().map_or(ViewerAction::Ignored, ViewerAction::Moved)
    }

    fn mark(&self, status: TriageStatus) -> ViewerAction {
        let Some(entry) = self.session.selected_entry() else {
            return ViewerAction::Ignored;
        };
        self.session.mark_selected(status);
        ViewerAction::Marked { name: entry.name, status }
    }

    /// Wait for the next key and apply it. `None` once the viewer is closed
    /// or the key source is gone.
    pub async fn next_key(&mut self) -> Option<ViewerAction> {
        loop {
            let rx = self.keys.as_mut()?;
            match rx.recv().await {
                Ok(key) => return Some(self.handle_key(&key)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!("Viewer skipped {} key presses", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => {
                    self.close();
                    return None;
                }
            }
        }
    }

    /// Handle keys until the viewer closes
    pub async fn run(&mut self) {
        while let Some(action) = self.next_key().await {
            if action == ViewerAction::Closed {
                break;
            }
        }
    }

    /// Stop listening and clear the selection
    pub fn close(&mut self) {
        if self.keys.take().is_some() {
            self.session.clear_selection();
        }
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        self.close();
    }
}
