use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::error::SampleError;
use crate::media::{ListeningEvent, PhotoRecord};
use crate::week::{intersect, WeekBuckets, WeekKey};

/// A play and a photo from the same ISO week.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub event: ListeningEvent,
    pub photo: PhotoRecord,
    pub week: WeekKey,
}

/// Draws pairs from the weeks both collections share.
///
/// The week is drawn first, uniformly over the overlap, so a week with one
/// photo is picked as often as a week with a hundred. The play and the photo
/// are then drawn uniformly and independently from that week. Every draw is
/// with replacement.
pub struct Sampler<R = StdRng> {
    history: WeekBuckets<ListeningEvent>,
    photos: WeekBuckets<PhotoRecord>,
    overlap: Vec<WeekKey>,
    rng: R,
}

impl Sampler<StdRng> {
    pub fn from_entropy(history: WeekBuckets<ListeningEvent>, photos: WeekBuckets<PhotoRecord>) -> Self {
        Self::new(history, photos, StdRng::from_entropy())
    }

    /// Reproducible draws for a given seed.
    pub fn seeded(
        history: WeekBuckets<ListeningEvent>,
        photos: WeekBuckets<PhotoRecord>,
        seed: u64,
    ) -> Self {
        Self::new(history, photos, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Sampler<R> {
    pub fn new(history: WeekBuckets<ListeningEvent>, photos: WeekBuckets<PhotoRecord>, rng: R) -> Self {
        let overlap: Vec<WeekKey> = intersect(&history, &photos).into_iter().collect();
        tracing::debug!("{} overlap weeks", overlap.len());
        Self {
            history,
            photos,
            overlap,
            rng,
        }
    }

    /// Weeks with both plays and photos, in ascending order.
    pub fn overlap(&self) -> &[WeekKey] {
        &self.overlap
    }

    pub fn history(&self) -> &WeekBuckets<ListeningEvent> {
        &self.history
    }

    pub fn photos(&self) -> &WeekBuckets<PhotoRecord> {
        &self.photos
    }

    pub fn pick_next(&mut self) -> Result<Sample, SampleError> {
        let week = *self.overlap.choose(&mut self.rng).ok_or(SampleError::NoOverlap)?;

        // Overlap weeks are present, and buckets are never empty, in both collections
        let event = self
            .history
            .get(&week)
            .and_then(|events| events.choose(&mut self.rng))
            .ok_or(SampleError::NoOverlap)?;
        let photo = self
            .photos
            .get(&week)
            .and_then(|photos| photos.choose(&mut self.rng))
            .ok_or(SampleError::NoOverlap)?;

        tracing::debug!("{}: {} / {}", week, event.track, photo.path.display());

        Ok(Sample {
            event: event.clone(),
            photo: photo.clone(),
            week,
        })
    }
}
