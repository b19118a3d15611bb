use std::path::Path;

use crate::date::{PhotoFile, PhotoTimestampChain, TimestampSource};
use crate::error::{Diagnostic, DiagnosticKind, IngestReport};
use crate::media::PhotoRecord;
use crate::scan;
use crate::week::{WeekBuckets, WeekKey};
use crate::ThrottledProgress;

const PHOTO_EXTENSIONS: [&str; 2] = ["jpg", "jpeg"];

/// Scans a photo directory into week buckets. Every JPEG found gets a
/// bucket: the timestamp chain always ends in the file modification time.
#[derive(Default)]
pub struct PhotoIngester {
    chain: PhotoTimestampChain,
}

impl PhotoIngester {
    pub fn new(chain: PhotoTimestampChain) -> Self {
        Self { chain }
    }

    pub fn ingest(
        &self,
        dir: &Path,
        progress: &ThrottledProgress,
    ) -> (WeekBuckets<PhotoRecord>, IngestReport) {
        let mut buckets = WeekBuckets::new();
        let mut report = IngestReport::default();

        let files = match scan::list_files(dir) {
            Ok(files) => files,
            Err(e) => {
                report.record(Diagnostic::DirectoryUnreadable {
                    path: dir.to_path_buf(),
                    message: e.to_string(),
                });
                return (buckets, report);
            }
        };

        let photos: Vec<PhotoFile> = files
            .into_iter()
            .filter(|(path, _)| is_photo(path))
            .map(|(path, meta)| PhotoFile::from_metadata(path, &meta))
            .collect();
        let total = photos.len() as u64;

        for (i, photo) in photos.into_iter().enumerate() {
            progress.report("photos", i as u64, total, "Reading capture dates");
            report.files_seen += 1;

            let resolved = self.chain.resolve(&photo);
            if resolved.source == TimestampSource::Filesystem {
                report.record(Diagnostic::MetadataMissing {
                    path: photo.path.clone(),
                });
            }

            buckets.push(
                WeekKey::of(resolved.time.date()),
                PhotoRecord {
                    path: photo.path,
                    timestamp: resolved.time,
                    source: resolved.source,
                },
            );
            report.items_ingested += 1;
        }

        tracing::info!(
            "photos: {} photos in {} weeks ({} dated from file modification time)",
            report.items_ingested,
            buckets.week_count(),
            report.count(DiagnosticKind::MetadataMissing)
        );

        (buckets, report)
    }
}

fn is_photo(path: &Path) -> bool {
    scan::extension_lower(path).is_some_and(|ext| PHOTO_EXTENSIONS.contains(&ext.as_str()))
}
