use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::date::parse_stream_timestamp;
use crate::error::{Diagnostic, IngestReport};
use crate::media::{ListeningEvent, UNKNOWN_ARTIST, UNKNOWN_TRACK};
use crate::scan;
use crate::week::{WeekBuckets, WeekKey};
use crate::ThrottledProgress;

pub const DEFAULT_PATTERN: &str = "Streams*.json";

static DEFAULT_PATTERN_RE: LazyLock<Regex> =
    LazyLock::new(|| scan::glob_to_regex(DEFAULT_PATTERN).unwrap());

/// Object fields that may hold the list of plays, in priority order.
const LIST_KEYS: [&str; 3] = ["streaming_history", "playback", "plays"];

/// Reads streaming-history exports from one directory into week buckets.
pub struct HistoryIngester {
    pattern: Regex,
}

impl Default for HistoryIngester {
    fn default() -> Self {
        Self {
            pattern: DEFAULT_PATTERN_RE.clone(),
        }
    }
}

impl HistoryIngester {
    /// Match export files against a filename glob instead of `Streams*.json`.
    pub fn with_pattern(glob: &str) -> anyhow::Result<Self> {
        Ok(Self {
            pattern: scan::glob_to_regex(glob)?,
        })
    }

    /// Ingest every matching file in `dir`. Never fails: unreadable
    /// directories, bad files and bad records end up in the report.
    pub fn ingest(
        &self,
        dir: &Path,
        progress: &ThrottledProgress,
    ) -> (WeekBuckets<ListeningEvent>, IngestReport) {
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

        let exports: Vec<_> = files
            .into_iter()
            .map(|(path, _)| path)
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|name| self.pattern.is_match(name))
            })
            .collect();
        let total = exports.len() as u64;

        for (i, path) in exports.iter().enumerate() {
            progress.report("history", i as u64, total, &format!("Reading {}", path.display()));
            report.files_seen += 1;

            let records = match read_records(path) {
                Ok(records) => records,
                Err(diagnostic) => {
                    report.files_skipped += 1;
                    report.record(diagnostic);
                    continue;
                }
            };

            for (index, record) in records.iter().enumerate() {
                match to_event(path, index, record) {
                    Ok(event) => {
                        let week = WeekKey::of(event.timestamp.date_naive());
                        buckets.push(week, event);
                        report.items_ingested += 1;
                    }
                    Err(diagnostic) => {
                        report.items_skipped += 1;
                        report.record(diagnostic);
                    }
                }
            }
        }

        tracing::info!(
            "history: {} plays in {} weeks from {} files ({} files skipped, {} records skipped)",
            report.items_ingested,
            buckets.week_count(),
            report.files_seen,
            report.files_skipped,
            report.items_skipped
        );

        (buckets, report)
    }
}

/// Load one export file and return its list of records.
fn read_records(path: &Path) -> Result<Vec<Value>, Diagnostic> {
    let bytes = fs::read(path).map_err(|e| Diagnostic::Parse {
        file: path.to_path_buf(),
        message: format!("cannot read: {}", e),
    })?;
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(&bytes);

    let data: Value = serde_json::from_slice(bytes).map_err(|e| Diagnostic::Parse {
        file: path.to_path_buf(),
        message: format!("invalid JSON: {}", e),
    })?;

    extract_list(data).map_err(|found| Diagnostic::UnsupportedShape {
        file: path.to_path_buf(),
        found,
    })
}

/// Accept a top-level array, or an object carrying the array under one of
/// [`LIST_KEYS`]. On failure, name what was found instead.
fn extract_list(data: Value) -> Result<Vec<Value>, &'static str> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in LIST_KEYS {
                if let Some(Value::Array(items)) = map.remove(key) {
                    return Ok(items);
                }
            }
            Err("object without a list of plays")
        }
        Value::String(_) => Err("string"),
        Value::Number(_) => Err("number"),
        Value::Bool(_) => Err("boolean"),
        Value::Null => Err("null"),
    }
}

fn to_event(path: &Path, index: usize, record: &Value) -> Result<ListeningEvent, Diagnostic> {
    let Some(record) = record.as_object() else {
        return Err(Diagnostic::Parse {
            file: path.to_path_buf(),
            message: format!("record {} is not an object", index),
        });
    };

    let Some(ts) = record.get("ts").and_then(Value::as_str) else {
        return Err(Diagnostic::MissingTimestamp {
            file: path.to_path_buf(),
            index,
        });
    };

    let timestamp = parse_stream_timestamp(ts).ok_or_else(|| Diagnostic::Parse {
        file: path.to_path_buf(),
        message: format!("record {}: unparseable timestamp {:?}", index, ts),
    })?;

    let track = text(record, "master_metadata_track_name")
        .or_else(|| text(record, "episode_name"))
        .unwrap_or_else(|| UNKNOWN_TRACK.to_string());
    let artist = text(record, "master_metadata_album_artist_name")
        .or_else(|| text(record, "episode_show_name"))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    Ok(ListeningEvent {
        artist,
        track,
        timestamp,
        ms_played: record.get("ms_played").and_then(Value::as_u64),
        uri: text(record, "spotify_track_uri").or_else(|| text(record, "spotify_episode_uri")),
    })
}

/// Non-empty string field; null, missing and blank all count as absent.
fn text(record: &Map<String, Value>, key: &str) -> Option<String> {
    record
        .get(key)?
        .as_str()
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DiagnosticKind;
    use crate::test_support::quiet;
    use serde_json::json;
    use tempfile::tempdir;

    fn play(ts: &str, track: &str, artist: &str) -> Value {
        json!({
            "ts": ts,
            "master_metadata_track_name": track,
            "master_metadata_album_artist_name": artist,
            "ms_played": 215000,
            "spotify_track_uri": format!("spotify:track:{}", track.to_lowercase()),
        })
    }

    fn write_json(dir: &Path, name: &str, value: &Value) {
        fs::write(dir.join(name), serde_json::to_vec(value).unwrap()).unwrap();
    }

    #[test]
    fn test_top_level_array() {
        let dir = tempdir().unwrap();
        write_json(
            dir.path(),
            "Streams0.json",
            &json!([
                play("2024-03-05T18:22:41Z", "Alpha", "Band"),
                play("2024-03-12T09:00:00Z", "Beta", "Band"),
            ]),
        );

        let (buckets, report) = HistoryIngester::default().ingest(dir.path(), &quiet());
        assert_eq!(report.files_seen, 1);
        assert_eq!(report.items_ingested, 2);
        assert!(report.warnings.is_empty());

        let week10 = buckets.get(&WeekKey::new(2024, 10)).unwrap();
        assert_eq!(week10.len(), 1);
        assert_eq!(week10[0].track, "Alpha");
        assert_eq!(week10[0].artist, "Band");
        assert_eq!(week10[0].ms_played, Some(215000));
        assert_eq!(week10[0].uri.as_deref(), Some("spotify:track:alpha"));
        assert!(buckets.get(&WeekKey::new(2024, 11)).is_some());
    }

    #[test]
    fn test_object_shapes_in_priority_order() {
        let dir = tempdir().unwrap();
        write_json(
            dir.path(),
            "Streams_a.json",
            &json!({
                "plays": [play("2024-01-10T10:00:00Z", "Plays", "X")],
                "streaming_history": [play("2024-01-10T10:00:00Z", "History", "X")],
            }),
        );
        write_json(
            dir.path(),
            "Streams_b.json",
            &json!({ "playback": [play("2024-01-10T10:00:00Z", "Playback", "X")] }),
        );
        write_json(
            dir.path(),
            "Streams_c.json",
            &json!({ "streaming_history": "not a list", "plays": [play("2024-01-10T10:00:00Z", "Fallback", "X")] }),
        );

        let (buckets, report) = HistoryIngester::default().ingest(dir.path(), &quiet());
        assert_eq!(report.files_skipped, 0);
        let tracks: Vec<_> = buckets
            .get(&WeekKey::new(2024, 2))
            .unwrap()
            .iter()
            .map(|e| e.track.as_str())
            .collect();
        assert_eq!(tracks, vec!["History", "Playback", "Fallback"]);
    }

    #[test]
    fn test_bad_files_are_skipped() {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "Streams1.json", &json!([play("2024-03-05T18:22:41Z", "Good", "A")]));
        write_json(dir.path(), "Streams2.json", &json!([play("2024-03-06T18:22:41Z", "Good2", "A")]));
        fs::write(dir.path().join("Streams3.json"), b"[{\"ts\": \"2024-03-05T").unwrap();
        fs::write(dir.path().join("Streams4.json"), b"not json at all").unwrap();
        write_json(dir.path(), "Streams5.json", &json!({ "other": [] }));
        write_json(dir.path(), "Streams6.json", &json!("just a string"));
        // Not matching the pattern at all
        write_json(dir.path(), "Userdata.json", &json!([play("2024-05-01T00:00:00Z", "Ignored", "A")]));

        let (buckets, report) = HistoryIngester::default().ingest(dir.path(), &quiet());
        assert_eq!(report.files_seen, 6);
        assert_eq!(report.files_skipped, 4);
        assert_eq!(report.count(DiagnosticKind::Parse), 2);
        assert_eq!(report.count(DiagnosticKind::UnsupportedShape), 2);
        assert_eq!(report.items_ingested, 2);
        assert_eq!(buckets.week_count(), 1);
        let tracks: Vec<_> = buckets.iter().flat_map(|(_, events)| events).map(|e| e.track.clone()).collect();
        assert_eq!(tracks, vec!["Good", "Good2"]);
    }

    #[test]
    fn test_bad_records_are_skipped() {
        let dir = tempdir().unwrap();
        write_json(
            dir.path(),
            "Streams.json",
            &json!([
                play("2024-03-05T18:22:41Z", "Kept", "A"),
                { "master_metadata_track_name": "No ts" },
                { "ts": 1709662961, "master_metadata_track_name": "Numeric ts" },
                play("last tuesday", "Bad ts", "A"),
                "not an object",
                play("2024-03-05T20:00:00+01:00", "Offset", "A"),
            ]),
        );

        let (buckets, report) = HistoryIngester::default().ingest(dir.path(), &quiet());
        assert_eq!(report.items_ingested, 2);
        assert_eq!(report.items_skipped, 4);
        assert_eq!(report.count(DiagnosticKind::MissingTimestamp), 2);
        assert_eq!(report.count(DiagnosticKind::Parse), 2);
        assert_eq!(buckets.get(&WeekKey::new(2024, 10)).unwrap().len(), 2);
    }

    #[test]
    fn test_field_fallbacks() {
        let dir = tempdir().unwrap();
        write_json(
            dir.path(),
            "Streams.json",
            &json!([
                {
                    "ts": "2024-03-05T18:22:41Z",
                    "master_metadata_track_name": null,
                    "master_metadata_album_artist_name": null,
                    "episode_name": "Episode 12",
                    "episode_show_name": "The Show",
                    "spotify_track_uri": null,
                    "spotify_episode_uri": "spotify:episode:abc",
                    "ms_played": null
                },
                {
                    "ts": "2024-03-05T19:00:00Z",
                    "master_metadata_track_name": "",
                },
            ]),
        );

        let (buckets, _) = HistoryIngester::default().ingest(dir.path(), &quiet());
        let events = buckets.get(&WeekKey::new(2024, 10)).unwrap();
        assert_eq!(events[0].track, "Episode 12");
        assert_eq!(events[0].artist, "The Show");
        assert_eq!(events[0].uri.as_deref(), Some("spotify:episode:abc"));
        assert_eq!(events[0].ms_played, None);
        assert_eq!(events[1].track, UNKNOWN_TRACK);
        assert_eq!(events[1].artist, UNKNOWN_ARTIST);
        assert_eq!(events[1].uri, None);
    }

    #[test]
    fn test_reingest_is_stable() {
        let dir = tempdir().unwrap();
        for (i, day) in ["2020-12-28", "2021-01-01", "2021-01-04"].iter().enumerate() {
            write_json(
                dir.path(),
                &format!("Streams{}.json", i),
                &json!([play(&format!("{}T12:00:00Z", day), &format!("T{}", i), "A")]),
            );
        }

        let ingester = HistoryIngester::default();
        let (first, _) = ingester.ingest(dir.path(), &quiet());
        let (second, _) = ingester.ingest(dir.path(), &quiet());
        assert_eq!(first, second);
        assert_eq!(first.get(&WeekKey::new(2020, 53)).unwrap().len(), 2);
        assert_eq!(first.get(&WeekKey::new(2021, 1)).unwrap().len(), 1);
    }

    #[test]
    fn test_custom_pattern_and_missing_dir() {
        let dir = tempdir().unwrap();
        write_json(dir.path(), "Streaming_History_Audio_2024.json", &json!([play("2024-03-05T18:22:41Z", "A", "B")]));

        let (buckets, _) = HistoryIngester::default().ingest(dir.path(), &quiet());
        assert!(buckets.is_empty());

        let ingester = HistoryIngester::with_pattern("Streaming_History_*.json").unwrap();
        let (buckets, _) = ingester.ingest(dir.path(), &quiet());
        assert_eq!(buckets.item_count(), 1);

        let (buckets, report) = ingester.ingest(&dir.path().join("missing"), &quiet());
        assert!(buckets.is_empty());
        assert_eq!(report.count(DiagnosticKind::DirectoryUnreadable), 1);
    }
}
