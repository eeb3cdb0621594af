use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Filters a raw hardware-id tag taken from the URL path: `[A-Za-z0-9_-]` is
/// kept verbatim, `:` and `.` are mapped to `_`, everything else is dropped.
/// An empty result is treated as absent.
pub fn sanitize_hwid(raw: &str) -> Option<String> {
    let filtered: String = raw
        .chars()
        .filter_map(|c| match c {
            'A'..='Z' | 'a'..='z' | '0'..='9' | '_' | '-' => Some(c),
            ':' | '.' => Some('_'),
            _ => None,
        })
        .collect();

    if filtered.is_empty() {
        None
    } else {
        Some(filtered)
    }
}

/// Computes the directory and filename pair for one segment.
///
/// Layout: `<project>/data/received/[<hwid>/]stream_{streamId}_[{hwid}_]{yyyyMMdd_HHmmss}.{bin,wav}`.
pub struct SegmentPaths {
    pub bin_path: PathBuf,
    pub wav_path: PathBuf,
}

pub fn segment_paths(
    project_root: &std::path::Path,
    stream_id: u32,
    hwid: Option<&str>,
    opened_at: DateTime<Utc>,
) -> SegmentPaths {
    let mut dir = project_root.join("data").join("received");
    if let Some(hwid) = hwid {
        dir.push(hwid);
    }

    let timestamp = opened_at.format("%Y%m%d_%H%M%S");
    let stem = match hwid {
        Some(hwid) => format!("stream_{stream_id}_{hwid}_{timestamp}"),
        None => format!("stream_{stream_id}_{timestamp}"),
    };

    SegmentPaths {
        bin_path: dir.join(format!("{stem}.bin")),
        wav_path: dir.join(format!("{stem}.wav")),
    }
}
