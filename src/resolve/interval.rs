//! Half-open validity intervals and versioned attribute values
//!
//! Every attribute of an entity is stored as a timeline: an ordered list of
//! values, each paired with the interval over which it held. Intervals are
//! half-open, `[start, end)`, so the entry ending at `t` and the entry starting
//! at `t` never both match. A missing end means the value is still current.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A half-open time range `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Interval {
    /// Start of the interval (inclusive).
    pub start: DateTime<Utc>,
    /// End of the interval (exclusive). `None` means still active.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<DateTime<Utc>>,
}

impl Interval {
    /// Create a closed interval.
    ///
    /// Returns `ValidationError::InvalidInterval` unless `start < end`.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, ValidationError> {
        let interval = Self {
            start,
            end: Some(end),
        };
        interval.validate()?;
        Ok(interval)
    }

    /// Create an interval that is still active.
    pub const fn starting_at(start: DateTime<Utc>) -> Self {
        Self { start, end: None }
    }

    pub const fn is_open_ended(&self) -> bool {
        self.end.is_none()
    }

    /// Check that `start < end` when an end is present.
    ///
    /// Deserialized intervals bypass `new`, so ingest re-checks them here.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self.end {
            Some(end) if end <= self.start => Err(ValidationError::InvalidInterval {
                start: self.start,
                end,
            }),
            _ => Ok(()),
        }
    }

    /// Whether `at` falls inside `[start, end)`.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start <= at && self.end.map_or(true, |end| at < end)
    }

    pub fn overlaps(&self, other: &Self) -> bool {
        let self_end = self.end.unwrap_or(DateTime::<Utc>::MAX_UTC);
        let other_end = other.end.unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.start < other_end && other.start < self_end
    }
}

/// A value paired with the interval over which it held.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailDuration<T> {
    pub value: T,
    pub interval: Interval,
}

impl<T> DetailDuration<T> {
    pub fn new(value: T, interval: Interval) -> Self {
        Self { value, interval }
    }

    pub fn is_active_at(&self, at: DateTime<Utc>) -> bool {
        self.interval.contains(at)
    }
}

/// The ordered history of one attribute of one entity.
pub type Timeline<T> = Vec<DetailDuration<T>>;

/// The entry active at `at`, if any.
///
/// A well-formed timeline has at most one. When entries overlap the one
/// that started last wins, since it is the most recent statement about `at`.
pub fn active_at<T>(timeline: &[DetailDuration<T>], at: DateTime<Utc>) -> Option<&DetailDuration<T>> {
    timeline
        .iter()
        .filter(|entry| entry.is_active_at(at))
        .max_by_key(|entry| entry.interval.start)
}

/// Validate every interval of a timeline and reject overlapping entries.
///
/// `attribute` names the timeline in the returned error.
pub fn validate_timeline<T>(
    timeline: &[DetailDuration<T>],
    attribute: &'static str,
) -> Result<(), ValidationError> {
    for entry in timeline {
        entry.interval.validate()?;
    }

    let mut intervals: Vec<&Interval> = timeline.iter().map(|entry| &entry.interval).collect();
    intervals.sort_by_key(|interval| interval.start);

    for pair in intervals.windows(2) {
        if pair[0].overlaps(pair[1]) {
            return Err(ValidationError::OverlappingIntervals {
                attribute,
                first: *pair[0],
                second: *pair[1],
            });
        }
    }

    Ok(())
}
