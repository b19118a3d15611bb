use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// ISO-8601 week: week 1 is the week containing the year's first Thursday,
/// so late-December dates can land in week 1 of the next year and early-January
/// dates in week 52/53 of the previous one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WeekKey {
    pub iso_year: i32,
    pub iso_week: u32,
}

impl WeekKey {
    pub fn new(iso_year: i32, iso_week: u32) -> Self {
        Self { iso_year, iso_week }
    }

    pub fn of(date: NaiveDate) -> Self {
        let week = date.iso_week();
        Self {
            iso_year: week.year(),
            iso_week: week.week(),
        }
    }
}

impl fmt::Display for WeekKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-W{:02}", self.iso_year, self.iso_week)
    }
}

/// Items grouped by the ISO week of their timestamp.
///
/// A week only has an entry once something has been pushed into it, so every
/// bucket is non-empty. Iteration is ordered by week.
#[derive(Debug, Clone, PartialEq)]
pub struct WeekBuckets<T> {
    buckets: BTreeMap<WeekKey, Vec<T>>,
}

impl<T> Default for WeekBuckets<T> {
    fn default() -> Self {
        Self {
            buckets: BTreeMap::new(),
        }
    }
}

impl<T> WeekBuckets<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, week: WeekKey, item: T) {
        self.buckets.entry(week).or_default().push(item);
    }

    pub fn get(&self, week: &WeekKey) -> Option<&[T]> {
        self.buckets.get(week).map(Vec::as_slice)
    }

    pub fn contains_week(&self, week: &WeekKey) -> bool {
        self.buckets.contains_key(week)
    }

    pub fn weeks(&self) -> impl Iterator<Item = &WeekKey> {
        self.buckets.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WeekKey, &[T])> {
        self.buckets.iter().map(|(k, v)| (k, v.as_slice()))
    }

    /// Number of weeks with at least one item.
    pub fn week_count(&self) -> usize {
        self.buckets.len()
    }

    /// Total number of items across all weeks.
    pub fn item_count(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

impl<T> FromIterator<(WeekKey, T)> for WeekBuckets<T> {
    fn from_iter<I: IntoIterator<Item = (WeekKey, T)>>(iter: I) -> Self {
        let mut buckets = Self::new();
        for (week, item) in iter {
            buckets.push(week, item);
        }
        buckets
    }
}

/// Weeks present in both collections.
pub fn intersect<A, B>(history: &WeekBuckets<A>, photos: &WeekBuckets<B>) -> BTreeSet<WeekKey> {
    history
        .weeks()
        .filter(|week| photos.contains_week(week))
        .copied()
        .collect()
}
