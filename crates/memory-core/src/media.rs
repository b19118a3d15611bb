use std::path::PathBuf;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::date::TimestampSource;

pub const UNKNOWN_TRACK: &str = "Unknown Track";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

/// One play from a streaming-history export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListeningEvent {
    /// Album artist, or the show name for podcast episodes
    pub artist: String,
    /// Track title, or the episode name for podcast episodes
    pub track: String,
    /// When the play ended, with the offset the export recorded
    pub timestamp: DateTime<FixedOffset>,
    pub ms_played: Option<u64>,
    /// `spotify:track:...` or `spotify:episode:...`
    pub uri: Option<String>,
}

/// One photo on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoRecord {
    pub path: PathBuf,
    /// Local wall-clock time the photo was taken (or last modified)
    pub timestamp: NaiveDateTime,
    pub source: TimestampSource,
}

impl PhotoRecord {
    /// Just the filename
    pub fn filename(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}
