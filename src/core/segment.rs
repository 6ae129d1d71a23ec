//! Clip segmentation: split a time-sorted run of files into clips.
//!
//! A burst has near-uniform spacing between frames, whatever the camera's
//! frame interval is. The walk therefore compares successive *gaps* rather
//! than absolute gap sizes: while the gap stays within `threshold` seconds of
//! the previous one, the clip continues; an irregular gap starts a new clip.
//!
//! Walk state per index `i`:
//! - `Starting`: a clip was just opened at `i - 1`. Look ahead and compare
//!   `gap(i, i+1)` with `gap(i-1, i)`. The last element never looks past the
//!   end; it joins the open clip.
//! - `Continuing`: compare the two gaps ending at `i`.

use std::cmp::Ordering;

use serde::Serialize;
use tracing::{debug, trace};

use crate::core::classify::Capability;
use crate::core::error::ClipseqError;
use crate::core::metadata::FileRecord;

/// Default max difference between consecutive gaps, in seconds.
pub const DEFAULT_SPAN_THRESHOLD: f64 = 5.0;

/// How an extension's files are cut into clips.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SegmentMode {
    /// One clip per file
    Single,
    /// The whole extension is one clip
    WholeExtension,
    /// Gap-consistency walk
    Span { threshold: f64 },
}

impl SegmentMode {
    /// Mode for an extension given its capability and the run options.
    pub fn select(capability: Capability, one_sequence: bool, threshold: f64) -> Self {
        match capability {
            Capability::Single => SegmentMode::Single,
            Capability::Sequence if one_sequence => SegmentMode::WholeExtension,
            Capability::Sequence => SegmentMode::Span { threshold },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SpanMarker {
    Starting,
    Continuing,
}

/// A numbered, non-empty, time-ordered run of files of one extension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Clip {
    pub number: usize,
    pub extension: String,
    pub members: Vec<FileRecord>,
}

/// Order by modification time, then path.
pub fn sort_records(records: &mut [FileRecord]) {
    records.sort_by(|a, b| match a.modified_at.cmp(&b.modified_at) {
        Ordering::Equal => a.path.cmp(&b.path),
        other => other,
    });
}

/// Sort `records` and cut them into member lists, in emission order.
pub fn segment(
    extension: &str,
    mut records: Vec<FileRecord>,
    mode: SegmentMode,
) -> Result<Vec<Vec<FileRecord>>, ClipseqError> {
    sort_records(&mut records);

    let groups = match mode {
        SegmentMode::Single => records.into_iter().map(|r| vec![r]).collect(),
        SegmentMode::WholeExtension if records.is_empty() => Vec::new(),
        SegmentMode::WholeExtension => vec![records],
        SegmentMode::Span { threshold } => split_by_span(extension, records, threshold)?,
    };

    debug!(extension, ?mode, clips = groups.len(), "segmented");
    Ok(groups)
}

/// Seconds from record `a` to record `b`.
fn gap(list: &[FileRecord], a: usize, b: usize) -> f64 {
    let delta = list[b].modified_at - list[a].modified_at;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

fn split_by_span(
    extension: &str,
    list: Vec<FileRecord>,
    threshold: f64,
) -> Result<Vec<Vec<FileRecord>>, ClipseqError> {
    let n = list.len();
    if n < 2 {
        return Ok(if n == 0 { Vec::new() } else { vec![list] });
    }

    // Group index per record; filled in walk order.
    let mut group_of: Vec<usize> = Vec::with_capacity(n);
    let mut group_index = 0usize;
    let mut marker: Option<SpanMarker> = None;

    for i in 0..n {
        if i == 0 {
            group_of.push(group_index);
            marker = Some(SpanMarker::Starting);
            continue;
        }

        let (delta, next) = match marker {
            Some(SpanMarker::Starting) if i + 1 == n => {
                // Last element: nothing to look ahead at, keep it in the open clip.
                (None, SpanMarker::Starting)
            }
            Some(SpanMarker::Starting) => {
                let d = (gap(&list, i, i + 1) - gap(&list, i - 1, i)).abs();
                (Some(d), SpanMarker::Continuing)
            }
            Some(SpanMarker::Continuing) if i >= 2 => {
                let d = (gap(&list, i - 1, i) - gap(&list, i - 2, i - 1)).abs();
                (Some(d), SpanMarker::Continuing)
            }
            Some(SpanMarker::Continuing) => {
                return Err(ClipseqError::Segmentation {
                    extension: extension.to_string(),
                    index: i,
                    detail: "continuing marker before two gaps exist".to_string(),
                });
            }
            None => {
                return Err(ClipseqError::Segmentation {
                    extension: extension.to_string(),
                    index: i,
                    detail: "walk marker unset".to_string(),
                });
            }
        };

        match delta {
            Some(d) if d > threshold => {
                trace!(extension, index = i, delta = d, "clip boundary");
                group_index += 1;
                marker = Some(SpanMarker::Starting);
            }
            _ => marker = Some(next),
        }
        group_of.push(group_index);
    }

    let mut groups: Vec<Vec<FileRecord>> = Vec::with_capacity(group_index + 1);
    for (record, g) in list.into_iter().zip(group_of) {
        if g == groups.len() {
            groups.push(Vec::new());
        }
        groups[g].push(record);
    }
    Ok(groups)
}
