//! Preview resolution
//!
//! Produces something displayable for one file, trying in order:
//! 1. the file itself (formats a renderer understands)
//! 2. a HEIC -> JPEG transcode
//! 3. the largest JPEG embedded in the first bytes of the file
//! 4. the metadata preview, then the metadata thumbnail
//!
//! Failures inside steps 2-4 are logged and treated as "nothing found".

use crate::config::PreviewConfig;
use crate::format::{mime_type, FormatClass};
use crate::metadata::{ExifThumbnailer, MetadataThumbnailer, ThumbnailMode};
use crate::scanner::{extract_largest_jpeg, ScanLimits};
use crate::transcode::{default_transcoder, HeicTranscoder};
use crate::AppError;
use app_fs::FileHandle;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Which step of the chain produced a preview
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PreviewSource {
    Direct,
    Transcoded,
    EmbeddedJpeg,
    MetadataPreview,
    MetadataThumbnail,
}

/// Encoded, displayable image bytes for one file
pub struct Preview {
    name: String,
    mime: &'static str,
    source: PreviewSource,
    data: Vec<u8>,
}

impl Preview {
    pub fn new(name: impl Into<String>, mime: &'static str, source: PreviewSource, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime,
            source,
            data,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &'static str {
        self.mime
    }

    pub fn source(&self) -> PreviewSource {
        self.source
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Decode to RGBA, downscaled so neither edge exceeds `max_edge`
    pub fn decode_rgba(&self, max_edge: u32) -> Result<image::RgbaImage, AppError> {
        let img = image::load_from_memory(&self.data)?;
        let img = if img.width() > max_edge || img.height() > max_edge {
            img.thumbnail(max_edge, max_edge)
        } else {
            img
        };
        Ok(img.to_rgba8())
    }
}

impl fmt::Debug for Preview {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preview")
            .field("name", &self.name)
            .field("mime", &self.mime)
            .field("source", &self.source)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Anything that can turn a file into a preview; `None` means no preview exists
#[async_trait]
pub trait ResolvePreview: Send + Sync {
    async fn resolve(&self, file: &dyn FileHandle) -> Option<Preview>;
}

/// The fallback chain
pub struct PreviewResolver {
    config: PreviewConfig,
    transcoder: Arc<dyn HeicTranscoder>,
    metadata: Arc<dyn MetadataThumbnailer>,
}

impl PreviewResolver {
    /// Resolver with the collaborators compiled into this build
    pub fn new(config: PreviewConfig) -> Self {
        Self::with_collaborators(config, default_transcoder(), Arc::new(ExifThumbnailer))
    }

    pub fn with_collaborators(
        config: PreviewConfig,
        transcoder: Arc<dyn HeicTranscoder>,
        metadata: Arc<dyn MetadataThumbnailer>,
    ) -> Self {
        Self {
            config,
            transcoder,
            metadata,
        }
    }

    async fn read_whole(&self, file: &dyn FileHandle) -> Option<Arc<[u8]>> {
        match file.read_all().await {
            Ok(data) => Some(data.into()),
            Err(e) => {
                tracing::warn!("Reading {} failed: {}", file.name(), e);
                None
            }
        }
    }

    async fn transcode(&self, name: &str, data: Vec<u8>) -> Option<Vec<u8>> {
        match self.transcoder.to_jpeg(data, self.config.heic_quality).await {
            Ok(images) => images.into_iter().next(),
            Err(e) => {
                tracing::warn!("HEIC transcode failed for {}: {}", name, e);
                None
            }
        }
    }

    async fn scan(&self, file: &dyn FileHandle, whole: Option<&Arc<[u8]>>) -> Option<Vec<u8>> {
        let limit = self.config.scan_limit_bytes;
        let limits = ScanLimits::from(&self.config);

        let scanned = match whole {
            Some(data) => {
                let data = data.clone();
                tokio::task::spawn_blocking(move || extract_largest_jpeg(&data[..data.len().min(limit)], limits)).await
            }
            None => {
                let head = match file.read_head(limit).await {
                    Ok(data) => data,
                    Err(e) => {
                        tracing::warn!("Reading {} for embedded JPEG scan failed: {}", file.name(), e);
                        return None;
                    }
                };
                tokio::task::spawn_blocking(move || extract_largest_jpeg(&head, limits)).await
            }
        };

        match scanned {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!("Embedded JPEG scan of {} aborted: {}", file.name(), e);
                None
            }
        }
    }

    async fn metadata(&self, name: &str, data: &Arc<[u8]>, mode: ThumbnailMode) -> Option<Vec<u8>> {
        match self.metadata.extract(data.clone(), mode).await {
            Ok(found) => found.filter(|data| !data.is_empty()),
            Err(e) => {
                tracing::debug!("Metadata {:?} extraction failed for {}: {}", mode, name, e);
                None
            }
        }
    }
}

#[async_trait]
impl ResolvePreview for PreviewResolver {
    async fn resolve(&self, file: &dyn FileHandle) -> Option<Preview> {
        let name = file.name();
        let class = FormatClass::of(name);
        tracing::debug!("Resolving preview for {} ({:?})", name, class);

        if class == FormatClass::DirectRenderable {
            return match file.read_all().await {
                Ok(data) => Some(Preview::new(name, mime_type(name), PreviewSource::Direct, data)),
                Err(e) => {
                    tracing::error!("Reading {} failed: {}", name, e);
                    None
                }
            };
        }

        // The whole file, once read, is shared by every later step
        let mut whole = None;

        if class == FormatClass::HeicFamily {
            if let Some(data) = self.read_whole(file).await {
                if let Some(jpeg) = self.transcode(name, data.to_vec()).await {
                    return Some(Preview::new(name, "image/jpeg", PreviewSource::Transcoded, jpeg));
                }
                whole = Some(data);
            }
        }

        if let Some(jpeg) = self.scan(file, whole.as_ref()).await {
            tracing::debug!("Embedded JPEG of {} bytes found in {}", jpeg.len(), name);
            return Some(Preview::new(name, "image/jpeg", PreviewSource::EmbeddedJpeg, jpeg));
        }

        let data = match whole {
            Some(data) => Some(data),
            None => self.read_whole(file).await,
        };

        if let Some(data) = data {
            if let Some(jpeg) = self.metadata(name, &data, ThumbnailMode::Preview).await {
                return Some(Preview::new(name, "image/jpeg", PreviewSource::MetadataPreview, jpeg));
            }

            if let Some(jpeg) = self.metadata(name, &data, ThumbnailMode::Thumbnail).await {
                return Some(Preview::new(name, "image/jpeg", PreviewSource::MetadataThumbnail, jpeg));
            }
        }

        tracing::error!("No preview available for {}", name);
        None
    }
}
