//! Embedded JPEG scanner
//!
//! RAW containers usually carry one or more complete JPEG renditions next to the
//! sensor data. Finding the biggest one is far cheaper than decoding the RAW.
//! The scan works on marker pairs only and never validates JPEG structure, so
//! truncated or malformed input simply yields no segment.

use crate::config::PreviewConfig;
use std::ops::Range;

const SOI: [u8; 2] = [0xFF, 0xD8];
const EOI: [u8; 2] = [0xFF, 0xD9];

/// Bounds applied while scanning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Maximum distance from a start marker to its end marker
    pub max_segment_distance: usize,
    /// Segments must be larger than this to count
    pub min_segment_bytes: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self {
            max_segment_distance: 5_000_000,
            min_segment_bytes: 50_000,
        }
    }
}

impl From<&PreviewConfig> for ScanLimits {
    fn from(config: &PreviewConfig) -> Self {
        Self {
            max_segment_distance: config.max_segment_distance,
            min_segment_bytes: config.min_segment_bytes,
        }
    }
}

fn marker_offsets(data: &[u8], marker: [u8; 2]) -> Vec<usize> {
    data.windows(2)
        .enumerate()
        .filter(|(_, w)| *w == marker)
        .map(|(i, _)| i)
        .collect()
}

/// Find the byte range of the largest embedded JPEG in `data`.
///
/// Each start marker is paired with the first end marker at least two bytes
/// after it. Pairs further apart than `max_segment_distance` or not larger than
/// `min_segment_bytes` are ignored. On equal sizes the earliest segment wins.
pub fn find_largest_jpeg(data: &[u8], limits: ScanLimits) -> Option<Range<usize>> {
    let starts = marker_offsets(data, SOI);
    if starts.is_empty() {
        return None;
    }
    let ends = marker_offsets(data, EOI);

    let mut best: Option<Range<usize>> = None;

    for start in starts {
        // First end marker at or after start + 2
        let idx = ends.partition_point(|&e| e < start + 2);
        let Some(&marker) = ends.get(idx) else {
            continue;
        };

        // Distance runs from the start marker to the end marker; equal to the limit is kept
        if marker - start > limits.max_segment_distance {
            continue;
        }

        let end = marker + EOI.len();
        let size = end - start;
        let best_size = best.as_ref().map_or(0, |r| r.len());

        if size > limits.min_segment_bytes && size > best_size {
            best = Some(start..end);
        }
    }

    best
}

/// Copy the largest embedded JPEG out of `data`
pub fn extract_largest_jpeg(data: &[u8], limits: ScanLimits) -> Option<Vec<u8>> {
    find_largest_jpeg(data, limits).map(|range| data[range].to_vec())
}
