//! Format classification by file extension

use app_fs::extension_of;

/// Extensions accepted when a folder is opened
pub const ALLOWED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "webp", "avif",
    "heic", "heif",
    "arw", "cr2", "cr3", "nef", "dng", "raf", "orf", "rw2",
];

/// How a preview is obtained for a file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormatClass {
    /// Bytes can be shown as-is
    DirectRenderable,
    /// Needs a transcode to JPEG
    HeicFamily,
    /// Container expected to embed a JPEG preview
    RawContainer,
    /// Anything else; goes through the same scan and metadata fallbacks
    Fallback,
}

impl FormatClass {
    /// Classify a file name by its lowercased extension
    pub fn of(name: &str) -> Self {
        match extension_of(name).as_str() {
            "jpg" | "jpeg" | "png" | "webp" | "avif" => FormatClass::DirectRenderable,
            "heic" | "heif" => FormatClass::HeicFamily,
            "arw" | "cr2" | "cr3" | "nef" | "dng" | "raf" | "orf" | "rw2" => FormatClass::RawContainer,
            _ => FormatClass::Fallback,
        }
    }
}

/// Whether a file name passes the open-folder allow-list
pub fn is_allowed(name: &str) -> bool {
    let ext = extension_of(name);
    ALLOWED_EXTENSIONS.contains(&ext.as_str())
}

/// MIME type of a directly renderable file
pub fn mime_type(name: &str) -> &'static str {
    match extension_of(name).as_str() {
        "png" => "image/png",
        "webp" => "image/webp",
        "avif" => "image/avif",
        _ => "image/jpeg",
    }
}
