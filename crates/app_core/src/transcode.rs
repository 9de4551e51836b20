//! HEIC/HEIF transcoding to JPEG

use crate::AppError;
use async_trait::async_trait;

/// Converts HEIC-family bytes to JPEG.
///
/// Returns one JPEG per top-level image; callers use the first.
#[async_trait]
pub trait HeicTranscoder: Send + Sync {
    async fn to_jpeg(&self, data: Vec<u8>, quality: f32) -> Result<Vec<Vec<u8>>, AppError>;
}

/// Transcoder used when no HEIC decoder is compiled in.
///
/// Always fails, which sends HEIC files down the scan and metadata fallbacks.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHeicSupport;

#[async_trait]
impl HeicTranscoder for NoHeicSupport {
    async fn to_jpeg(&self, _data: Vec<u8>, _quality: f32) -> Result<Vec<Vec<u8>>, AppError> {
        Err(AppError::UnsupportedFormat("heic (built without libheif)".into()))
    }
}

/// Best transcoder available in this build
pub fn default_transcoder() -> std::sync::Arc<dyn HeicTranscoder> {
    #[cfg(feature = "heic")]
    {
        std::sync::Arc::new(libheif::LibHeifTranscoder)
    }

    #[cfg(not(feature = "heic"))]
    {
        std::sync::Arc::new(NoHeicSupport)
    }
}

/// Copy `height` rows of `row_len` bytes out of a plane with row pitch `stride`
#[cfg_attr(not(feature = "heic"), allow(dead_code))]
fn pack_rows(data: &[u8], stride: usize, row_len: usize, height: usize) -> Result<Vec<u8>, AppError> {
    if stride < row_len {
        return Err(AppError::Transcode(format!("stride {} below row length {}", stride, row_len)));
    }

    let mut packed = Vec::with_capacity(row_len * height);
    for y in 0..height {
        let start = y * stride;
        let row = data
            .get(start..start + row_len)
            .ok_or_else(|| AppError::Transcode(format!("short pixel row {} of {}", y, height)))?;
        packed.extend_from_slice(row);
    }
    Ok(packed)
}

#[cfg(feature = "heic")]
pub use libheif::LibHeifTranscoder;

#[cfg(feature = "heic")]
mod libheif {
    use super::{pack_rows, HeicTranscoder};
    use crate::AppError;
    use async_trait::async_trait;
    use image::codecs::jpeg::JpegEncoder;
    use image::RgbImage;
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    /// libheif backed transcoder
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LibHeifTranscoder;

    #[async_trait]
    impl HeicTranscoder for LibHeifTranscoder {
        async fn to_jpeg(&self, data: Vec<u8>, quality: f32) -> Result<Vec<Vec<u8>>, AppError> {
            tokio::task::spawn_blocking(move || transcode(&data, quality))
                .await
                .map_err(|e| AppError::Transcode(e.to_string()))?
        }
    }

    fn transcode(data: &[u8], quality: f32) -> Result<Vec<Vec<u8>>, AppError> {
        let lib = LibHeif::new();
        let ctx = HeifContext::read_from_bytes(data).map_err(|e| AppError::Transcode(e.to_string()))?;

        let mut out = Vec::new();
        for handle in ctx.top_level_image_handles() {
            let image = lib
                .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
                .map_err(|e| AppError::Transcode(e.to_string()))?;

            let planes = image.planes();
            let plane = planes
                .interleaved
                .ok_or_else(|| AppError::Transcode("no interleaved plane".into()))?;

            let (width, height) = (plane.width, plane.height);
            let rgb = pack_rows(plane.data, plane.stride, width as usize * 3, height as usize)?;

            let img = RgbImage::from_raw(width, height, rgb)
                .ok_or_else(|| AppError::Transcode("short pixel buffer".into()))?;
            out.push(encode_jpeg(&img, quality)?);
        }

        Ok(out)
    }

    /// Encode at `quality` in 0.0 - 1.0
    fn encode_jpeg(img: &RgbImage, quality: f32) -> Result<Vec<u8>, AppError> {
        let q = (quality * 100.0).round().clamp(1.0, 100.0) as u8;
        let mut buf = Vec::new();
        JpegEncoder::new_with_quality(&mut buf, q).encode_image(img)?;
        Ok(buf)
    }
}
