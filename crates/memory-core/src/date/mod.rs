pub mod exif;
pub mod listening;

use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDateTime};
use filetime::FileTime;
use serde::{Deserialize, Serialize};

pub use listening::parse_stream_timestamp;

/// Where a photo's timestamp came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimestampSource {
    /// Capture time written into the file by the camera.
    Embedded,
    /// Last-modified time of the file.
    Filesystem,
}

/// A photo file found during discovery. The modification time is captured
/// while listing so the last step of the chain cannot fail later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoFile {
    pub path: PathBuf,
    pub modified: NaiveDateTime,
}

impl PhotoFile {
    pub fn from_metadata(path: PathBuf, metadata: &std::fs::Metadata) -> Self {
        let mtime = FileTime::from_last_modification_time(metadata);
        Self {
            path,
            modified: local_time(mtime),
        }
    }
}

/// Result of resolving a photo's timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoTimestamp {
    pub time: NaiveDateTime,
    pub source: TimestampSource,
}

/// One way of finding out when a photo was taken.
pub trait TimestampStrategy {
    fn source(&self) -> TimestampSource;
    fn resolve(&self, photo: &PhotoFile) -> Option<NaiveDateTime>;
}

/// EXIF `DateTimeOriginal`.
pub struct EmbeddedCaptureTime;

impl TimestampStrategy for EmbeddedCaptureTime {
    fn source(&self) -> TimestampSource {
        TimestampSource::Embedded
    }

    fn resolve(&self, photo: &PhotoFile) -> Option<NaiveDateTime> {
        exif::read_exif(&photo.path).and_then(|e| exif::capture_time(&e))
    }
}

/// File modification time, in local wall-clock time.
pub struct FileModifiedTime;

impl TimestampStrategy for FileModifiedTime {
    fn source(&self) -> TimestampSource {
        TimestampSource::Filesystem
    }

    fn resolve(&self, photo: &PhotoFile) -> Option<NaiveDateTime> {
        Some(photo.modified)
    }
}

/// Ordered strategies, first success wins. Falls back to the modification
/// time captured at discovery, so resolution always yields a value.
pub struct PhotoTimestampChain {
    strategies: Vec<Box<dyn TimestampStrategy>>,
}

impl Default for PhotoTimestampChain {
    fn default() -> Self {
        Self::new(vec![Box::new(EmbeddedCaptureTime), Box::new(FileModifiedTime)])
    }
}

impl PhotoTimestampChain {
    pub fn new(strategies: Vec<Box<dyn TimestampStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn resolve(&self, photo: &PhotoFile) -> PhotoTimestamp {
        for strategy in &self.strategies {
            if let Some(time) = strategy.resolve(photo) {
                return PhotoTimestamp {
                    time,
                    source: strategy.source(),
                };
            }
        }

        PhotoTimestamp {
            time: photo.modified,
            source: TimestampSource::Filesystem,
        }
    }
}

/// Convert a filesystem time to local naive time, the same frame EXIF uses.
pub fn local_time(mtime: FileTime) -> NaiveDateTime {
    let utc = DateTime::from_timestamp(mtime.unix_seconds(), mtime.nanoseconds()).unwrap_or_default();
    utc.with_timezone(&Local).naive_local()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct Fixed(TimestampSource, Option<NaiveDateTime>);

    impl TimestampStrategy for Fixed {
        fn source(&self) -> TimestampSource {
            self.0
        }
        fn resolve(&self, _photo: &PhotoFile) -> Option<NaiveDateTime> {
            self.1
        }
    }

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap()
    }

    fn photo() -> PhotoFile {
        PhotoFile {
            path: PathBuf::from("missing.jpg"),
            modified: at(2022, 6, 1),
        }
    }

    #[test]
    fn test_first_success_wins() {
        let chain = PhotoTimestampChain::new(vec![
            Box::new(Fixed(TimestampSource::Embedded, None)),
            Box::new(Fixed(TimestampSource::Embedded, Some(at(2020, 1, 1)))),
            Box::new(FileModifiedTime),
        ]);
        let resolved = chain.resolve(&photo());
        assert_eq!(resolved.time, at(2020, 1, 1));
        assert_eq!(resolved.source, TimestampSource::Embedded);
    }

    #[test]
    fn test_default_chain_falls_back_to_mtime() {
        // Nonexistent file: EXIF read fails, modification time from discovery is used
        let resolved = PhotoTimestampChain::default().resolve(&photo());
        assert_eq!(resolved.time, at(2022, 6, 1));
        assert_eq!(resolved.source, TimestampSource::Filesystem);
    }

    #[test]
    fn test_empty_chain_still_resolves() {
        let resolved = PhotoTimestampChain::new(Vec::new()).resolve(&photo());
        assert_eq!(resolved.source, TimestampSource::Filesystem);
    }

    #[test]
    fn test_local_time_round_trip() {
        let local = at(2021, 1, 1);
        let stamp = local
            .and_local_timezone(Local)
            .single()
            .unwrap()
            .timestamp();
        assert_eq!(local_time(FileTime::from_unix_time(stamp, 0)), local);
    }
}
