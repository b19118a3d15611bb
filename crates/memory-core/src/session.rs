//! The "next" command and the collaborators it hands samples to.
//!
//! Rendering and playback live outside the engine. A front end implements
//! [`PhotoDisplay`] and [`Playback`], then calls [`Session::next`] whenever
//! its own input loop decides a new pair is wanted. Failures in either
//! collaborator are reported in the returned [`Step`] and never end the
//! session.

use rand::Rng;

use crate::error::SampleError;
use crate::media::PhotoRecord;
use crate::sampler::{Sample, Sampler};

/// Where playback starts inside the track.
pub const DEFAULT_START_OFFSET_MS: u64 = 30_000;

/// Text drawn over the photo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlay {
    pub title: String,
    pub artist: String,
    /// Capture date of the photo, `YYYY-MM-DD HH:MM`
    pub captured: String,
}

impl Overlay {
    pub fn for_sample(sample: &Sample) -> Self {
        Self {
            title: sample.event.track.clone(),
            artist: sample.event.artist.clone(),
            captured: sample.photo.timestamp.format("%Y-%m-%d %H:%M").to_string(),
        }
    }

    pub fn headline(&self) -> String {
        format!("{} - {}", self.title, self.artist)
    }
}

/// Largest size that fits inside `max_width` x `max_height` with the same
/// aspect ratio. Images already inside the box are left alone.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    let scale = f64::min(
        max_width as f64 / width as f64,
        max_height as f64 / height as f64,
    );
    if scale >= 1.0 {
        return (width, height);
    }
    (
        ((width as f64 * scale).round() as u32).max(1),
        ((height as f64 * scale).round() as u32).max(1),
    )
}

pub trait PhotoDisplay {
    fn show(&mut self, photo: &PhotoRecord, overlay: &Overlay) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    Started,
    /// Nothing to play on; not an error.
    DeviceUnavailable(String),
}

pub trait Playback {
    fn play(&mut self, uri: &str, position_ms: u64) -> anyhow::Result<PlaybackOutcome>;
}

/// What happened to the audio half of a step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackStatus {
    Started,
    /// The play has no track URI in the export.
    NoTrack,
    DeviceUnavailable(String),
    Failed(String),
}

/// Result of one "next" request.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub sample: Sample,
    pub playback: PlaybackStatus,
    /// Display error, if the photo could not be shown
    pub display_error: Option<String>,
}

pub struct Session<R> {
    sampler: Sampler<R>,
    start_offset_ms: u64,
    steps: u64,
}

impl<R: Rng> Session<R> {
    pub fn new(sampler: Sampler<R>, start_offset_ms: u64) -> Self {
        Self {
            sampler,
            start_offset_ms,
            steps: 0,
        }
    }

    pub fn sampler(&self) -> &Sampler<R> {
        &self.sampler
    }

    /// Successful steps so far.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    /// Draw a pair, start its track and show its photo.
    ///
    /// Only [`SampleError::NoOverlap`] is returned as an error; collaborator
    /// failures are logged and carried in the [`Step`].
    pub fn next(
        &mut self,
        display: &mut dyn PhotoDisplay,
        playback: &mut dyn Playback,
    ) -> Result<Step, SampleError> {
        let sample = self.sampler.pick_next()?;

        let status = match sample.event.uri.as_deref() {
            None => {
                tracing::info!("no track URI for {:?}, skipping playback", sample.event.track);
                PlaybackStatus::NoTrack
            }
            Some(uri) => match playback.play(uri, self.start_offset_ms) {
                Ok(PlaybackOutcome::Started) => PlaybackStatus::Started,
                Ok(PlaybackOutcome::DeviceUnavailable(reason)) => {
                    tracing::warn!("no playback device: {}", reason);
                    PlaybackStatus::DeviceUnavailable(reason)
                }
                Err(e) => {
                    tracing::warn!("playback failed for {}: {:#}", uri, e);
                    PlaybackStatus::Failed(format!("{:#}", e))
                }
            },
        };

        let overlay = Overlay::for_sample(&sample);
        let display_error = match display.show(&sample.photo, &overlay) {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("cannot show {}: {:#}", sample.photo.path.display(), e);
                Some(format!("{:#}", e))
            }
        };

        self.steps += 1;
        Ok(Step {
            sample,
            playback: status,
            display_error,
        })
    }
}
