//! Application state management

use crate::resolver::{PreviewResolver, ResolvePreview};
use crate::session::Session;
use crate::trash::{Confirm, TrashReport};
use crate::{AppConfig, AppError};
use app_fs::FolderHandle;
use parking_lot::RwLock;
use std::sync::Arc;

/// What the application is doing right now
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppPhase {
    /// No folder open
    Idle,
    /// Enumerating a folder
    Loading,
    /// A folder is open
    Ready,
    /// Moving rejects
    Processing,
}

/// Main application state
pub struct AppState {
    /// Application configuration
    pub config: RwLock<AppConfig>,

    phase: RwLock<AppPhase>,

    /// Open folder, if any
    session: RwLock<Option<Arc<Session>>>,

    resolver: Arc<dyn ResolvePreview>,
}

impl AppState {
    /// Create a new application state with the default preview pipeline
    pub fn new(config: AppConfig) -> Self {
        let resolver = Arc::new(PreviewResolver::new(config.preview.clone()));
        Self::with_resolver(config, resolver)
    }

    pub fn with_resolver(config: AppConfig, resolver: Arc<dyn ResolvePreview>) -> Self {
        Self {
            config: RwLock::new(config),
            phase: RwLock::new(AppPhase::Idle),
            session: RwLock::new(None),
            resolver,
        }
    }

    pub fn phase(&self) -> AppPhase {
        *self.phase.read()
    }

    fn set_phase(&self, phase: AppPhase) {
        let mut current = self.phase.write();
        if *current != phase {
            tracing::debug!("Phase: {:?} -> {:?}", *current, phase);
            *current = phase;
        }
    }

    /// Current session
    pub fn session(&self) -> Option<Arc<Session>> {
        self.session.read().clone()
    }

    /// Replace the current session with one for `root`. On failure the
    /// application is left with no folder open.
    pub async fn open_folder(&self, root: Arc<dyn FolderHandle>) -> Result<Arc<Session>, AppError> {
        self.close();
        self.set_phase(AppPhase::Loading);

        let config = self.config.read().clone();
        match Session::open(root.clone(), &config, self.resolver.clone()).await {
            Ok(session) => {
                let session = Arc::new(session);
                *self.session.write() = Some(session.clone());
                self.set_phase(AppPhase::Ready);
                Ok(session)
            }
            Err(e) => {
                tracing::error!("Failed to open {}: {}", root.location().display(), e);
                self.set_phase(AppPhase::Idle);
                Err(e)
            }
        }
    }

    /// Drop the current session and everything it cached
    pub fn close(&self) {
        if self.session.write().take().is_some() {
            tracing::info!("Session closed");
        }
        self.set_phase(AppPhase::Idle);
    }

    /// Move rejects of the current session to its holding folder
    pub async fn trash_rejects(&self, confirm: &dyn Confirm) -> Result<TrashReport, AppError> {
        let session = self.session().ok_or(AppError::NoSession)?;

        self.set_phase(AppPhase::Processing);
        let result = session.trash_rejects(confirm).await;
        self.set_phase(AppPhase::Ready);

        match &result {
            Ok(report) => tracing::info!("Trash finished: {:?}", report),
            Err(e) => tracing::error!("Trash failed: {}", e),
        }
        result
    }

    /// Save the current configuration
    pub fn save_config(&self) -> anyhow::Result<()> {
        self.config.read().save()
    }
}
