//! FlashCull Core Domain Logic
//!
//! This crate contains:
//! - Format classification and the preview fallback chain
//! - Embedded JPEG scanning and metadata thumbnails
//! - The per-session preview cache with request de-duplication
//! - Triage state, view state and the trash transaction
//! - Command system, configuration and error types

pub mod cache;
pub mod command;
pub mod config;
pub mod error;
pub mod format;
pub mod metadata;
pub mod navigation;
pub mod resolver;
pub mod scanner;
pub mod session;
pub mod state;
pub mod transcode;
pub mod trash;
pub mod triage;
pub mod viewer;

pub use cache::{CacheStats, Interest, PreviewCache, PreviewOutcome};
pub use command::{Command, CommandId, InputHandler};
pub use config::{AppConfig, GridConfig, PreviewConfig, TrashConfig};
pub use error::AppError;
pub use format::{is_allowed, FormatClass, ALLOWED_EXTENSIONS};
pub use metadata::{ExifThumbnailer, MetadataThumbnailer, ThumbnailMode};
pub use navigation::ViewState;
pub use resolver::{Preview, PreviewResolver, PreviewSource, ResolvePreview};
pub use scanner::{extract_largest_jpeg, find_largest_jpeg, ScanLimits};
pub use session::Session;
pub use state::{AppPhase, AppState};
pub use transcode::{default_transcoder, HeicTranscoder, NoHeicSupport};
pub use trash::{AutoConfirm, Confirm, TrashReport};
pub use triage::{FileEntry, SortMode, TriageCounts, TriageStatus, TriageStore};
pub use viewer::{KeyEvents, Viewer, ViewerAction};
