//! Metadata thumbnail extraction (last resort of the preview chain)

use crate::AppError;
use async_trait::async_trait;
use exif::{Exif, In, Tag};
use std::io::Cursor;
use std::sync::Arc;

/// Which embedded image to ask the metadata for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThumbnailMode {
    /// Larger preview referenced from the primary image directory
    Preview,
    /// Small EXIF thumbnail from IFD1
    Thumbnail,
}

/// Pulls an embedded preview out of a file's bytes. `Ok(None)` means the
/// metadata is readable but carries no image for `mode`.
///
/// The bytes are shared so one read can serve both modes.
#[async_trait]
pub trait MetadataThumbnailer: Send + Sync {
    async fn extract(&self, data: Arc<[u8]>, mode: ThumbnailMode) -> Result<Option<Vec<u8>>, AppError>;
}

/// EXIF/TIFF based extractor
#[derive(Debug, Default, Clone, Copy)]
pub struct ExifThumbnailer;

#[async_trait]
impl MetadataThumbnailer for ExifThumbnailer {
    async fn extract(&self, data: Arc<[u8]>, mode: ThumbnailMode) -> Result<Option<Vec<u8>>, AppError> {
        tokio::task::spawn_blocking(move || embedded_image(&data, mode))
            .await
            .map_err(|e| AppError::Metadata(e.to_string()))?
    }
}

/// Parse metadata from a whole file and copy out the requested image
pub fn embedded_image(data: &[u8], mode: ThumbnailMode) -> Result<Option<Vec<u8>>, AppError> {
    let exif = exif::Reader::new().read_from_container(&mut Cursor::new(data))?;

    let found = match mode {
        ThumbnailMode::Preview => primary_preview(&exif),
        ThumbnailMode::Thumbnail => interchange_range(&exif, In::THUMBNAIL),
    };

    Ok(found
        .and_then(|(offset, len)| slice_jpeg(exif.buf(), offset, len))
        .map(<[u8]>::to_vec))
}

fn primary_preview(exif: &Exif) -> Option<(usize, usize)> {
    if let Some(range) = interchange_range(exif, In::PRIMARY) {
        return Some(range);
    }

    // Some containers store the preview as a single JPEG-compressed strip
    let compression = exif.get_field(Tag::Compression, In::PRIMARY)?.value.get_uint(0)?;
    if compression != 6 && compression != 7 {
        return None;
    }
    let offset = exif.get_field(Tag::StripOffsets, In::PRIMARY)?.value.get_uint(0)?;
    let len = exif.get_field(Tag::StripByteCounts, In::PRIMARY)?.value.get_uint(0)?;
    Some((offset as usize, len as usize))
}

fn interchange_range(exif: &Exif, ifd: In) -> Option<(usize, usize)> {
    let offset = exif.get_field(Tag::JPEGInterchangeFormat, ifd)?.value.get_uint(0)?;
    let len = exif.get_field(Tag::JPEGInterchangeFormatLength, ifd)?.value.get_uint(0)?;
    Some((offset as usize, len as usize))
}

fn slice_jpeg(buf: &[u8], offset: usize, len: usize) -> Option<&[u8]> {
    let end = offset.checked_add(len)?;
    let bytes = buf.get(offset..end)?;
    bytes.starts_with(&[0xFF, 0xD8]).then_some(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Little-endian TIFF with IFD0 (optionally pointing at a preview) and an
    /// IFD1 thumbnail
    fn tiff_with_images(preview: Option<&[u8]>, thumb: &[u8]) -> Vec<u8> {
        fn entry(out: &mut Vec<u8>, tag: u16, value: u32) {
            out.extend_from_slice(&tag.to_le_bytes());
            out.extend_from_slice(&4u16.to_le_bytes()); // LONG
            out.extend_from_slice(&1u32.to_le_bytes());
            out.extend_from_slice(&value.to_le_bytes());
        }

        let ifd0_count: u16 = if preview.is_some() { 3 } else { 1 };
        let ifd0_at = 8u32;
        let ifd0_len = 2 + 12 * ifd0_count as u32 + 4;
        let ifd1_at = ifd0_at + ifd0_len;
        let ifd1_len = 2 + 12 * 2 + 4;
        let data_at = ifd1_at + ifd1_len;
        let preview_len = preview.map_or(0, |p| p.len() as u32);
        let thumb_at = data_at + preview_len;

        let mut out = vec![b'I', b'I', 42, 0];
        out.extend_from_slice(&ifd0_at.to_le_bytes());

        out.extend_from_slice(&ifd0_count.to_le_bytes());
        entry(&mut out, 0x0100, 6000); // ImageWidth
        if preview.is_some() {
            entry(&mut out, 0x0201, data_at);
            entry(&mut out, 0x0202, preview_len);
        }
        out.extend_from_slice(&ifd1_at.to_le_bytes());

        out.extend_from_slice(&2u16.to_le_bytes());
        entry(&mut out, 0x0201, thumb_at);
        entry(&mut out, 0x0202, thumb.len() as u32);
        out.extend_from_slice(&0u32.to_le_bytes());

        if let Some(p) = preview {
            out.extend_from_slice(p);
        }
        out.extend_from_slice(thumb);
        out
    }

    fn fake_jpeg(fill: u8, len: usize) -> Vec<u8> {
        let mut v = vec![fill; len];
        v[0] = 0xFF;
        v[1] = 0xD8;
        v[len - 2] = 0xFF;
        v[len - 1] = 0xD9;
        v
    }

    #[test]
    fn test_thumbnail_mode() {
        let thumb = fake_jpeg(0x33, 64);
        let data = tiff_with_images(None, &thumb);

        assert_eq!(embedded_image(&data, ThumbnailMode::Thumbnail).unwrap(), Some(thumb));
        assert_eq!(embedded_image(&data, ThumbnailMode::Preview).unwrap(), None);
    }

    #[test]
    fn test_preview_mode_prefers_primary_image() {
        let preview = fake_jpeg(0x44, 256);
        let thumb = fake_jpeg(0x33, 64);
        let data = tiff_with_images(Some(&preview), &thumb);

        assert_eq!(embedded_image(&data, ThumbnailMode::Preview).unwrap(), Some(preview));
    }

    #[tokio::test]
    async fn test_exif_thumbnailer_serves_both_modes_from_one_buffer() {
        let preview = fake_jpeg(0x44, 256);
        let thumb = fake_jpeg(0x33, 64);
        let data: Arc<[u8]> = tiff_with_images(Some(&preview), &thumb).into();

        let extractor = ExifThumbnailer;
        let found_preview = extractor.extract(data.clone(), ThumbnailMode::Preview).await.unwrap();
        let found_thumb = extractor.extract(data, ThumbnailMode::Thumbnail).await.unwrap();

        assert_eq!(found_preview, Some(preview));
        assert_eq!(found_thumb, Some(thumb));
    }

    #[test]
    fn test_not_a_container() {
        assert!(embedded_image(b"definitely not an image", ThumbnailMode::Preview).is_err());
    }

    #[test]
    fn test_slice_out_of_bounds() {
        assert_eq!(slice_jpeg(&[0xFF, 0xD8, 0x00], 1, 10), None);
        assert_eq!(slice_jpeg(&[0xFF, 0xD8, 0x00], usize::MAX, 2), None);
        assert_eq!(slice_jpeg(&[0x00, 0xFF, 0xD8], 1, 2), Some(&[0xFF, 0xD8][..]));
    }
}
