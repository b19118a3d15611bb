pub mod date;
pub mod error;
pub mod history;
pub mod media;
pub mod options;
pub mod photos;
pub mod sampler;
pub mod scan;
pub mod session;
pub mod week;

use std::cell::Cell;
use std::time::{Duration, Instant};

use anyhow::Context;

pub use error::{Diagnostic, DiagnosticKind, IngestReport, SampleError};
pub use media::{ListeningEvent, PhotoRecord};
pub use options::SessionOptions;
pub use sampler::{Sample, Sampler};
pub use session::{Overlay, PhotoDisplay, Playback, PlaybackOutcome, PlaybackStatus, Session, Step};
pub use week::{WeekBuckets, WeekKey};

/// Type alias for progress callback: (stage, current, total, message)
pub type ProgressCallback<'a> = dyn Fn(&str, u64, u64, &str) + Send + Sync + 'a;

/// Throttled progress reporter - emits at most every 200ms or on completion.
pub struct ThrottledProgress<'a> {
    inner: &'a ProgressCallback<'a>,
    last_emit: Cell<Instant>,
}

impl<'a> ThrottledProgress<'a> {
    pub fn new(inner: &'a ProgressCallback<'a>) -> Self {
        Self {
            inner,
            last_emit: Cell::new(Instant::now() - Duration::from_secs(1)),
        }
    }

    pub fn report(&self, stage: &str, current: u64, total: u64, message: &str) {
        let is_done = current + 1 >= total;
        if !is_done {
            if self.last_emit.get().elapsed().as_millis() < 200 {
                return;
            }
            self.last_emit.set(Instant::now());
        }
        (self.inner)(stage, current, total, message);
    }
}

/// Both week-bucketed collections, built once per run.
#[derive(Debug, Clone)]
pub struct Library {
    pub history: WeekBuckets<ListeningEvent>,
    pub photos: WeekBuckets<PhotoRecord>,
    pub history_report: IngestReport,
    pub photo_report: IngestReport,
}

impl Library {
    /// Number of weeks with both plays and photos.
    pub fn overlap_weeks(&self) -> usize {
        week::intersect(&self.history, &self.photos).len()
    }

    /// Hand the collections to a sampler, seeded if the options ask for it.
    pub fn into_sampler(self, seed: Option<u64>) -> Sampler {
        match seed {
            Some(seed) => Sampler::seeded(self.history, self.photos, seed),
            None => Sampler::from_entropy(self.history, self.photos),
        }
    }
}

/// Ingest both directories named in `options`. Problems with individual
/// files are recorded in the reports; only missing or invalid options fail.
pub fn load_library(
    options: &SessionOptions,
    progress_callback: &ProgressCallback<'_>,
) -> anyhow::Result<Library> {
    let history_dir = options
        .history_dir
        .as_deref()
        .context("no listening history directory given")?;
    let photo_dir = options
        .photo_dir
        .as_deref()
        .context("no photo directory given")?;

    let tp = ThrottledProgress::new(progress_callback);
    let t_start = Instant::now();

    let history_ingester = history::HistoryIngester::with_pattern(&options.history_pattern)
        .with_context(|| format!("invalid history file pattern {:?}", options.history_pattern))?;
    let (history, history_report) = history_ingester.ingest(history_dir, &tp);

    let (photos, photo_report) = photos::PhotoIngester::default().ingest(photo_dir, &tp);

    let library = Library {
        history,
        photos,
        history_report,
        photo_report,
    };
    tracing::info!(
        "ingested in {:.2}s, {} weeks overlap",
        t_start.elapsed().as_secs_f64(),
        library.overlap_weeks()
    );
    Ok(library)
}
