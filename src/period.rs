// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Half-open interval implementation.
//!
//! This module provides:
//! - [`Interval<T>`]: generic `[start, end)` interval over any [`TimeInstant`]
//! - [`DateSpan`]: interval of civil dates (lunar month segments, day table)

use crate::instant::TimeInstant;
use chrono::NaiveDate;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Represents the half-open interval `[start, end)` between two instants.
///
/// Containment is always evaluated half-open: an instant equal to `end`
/// belongs to the *next* interval of a contiguous partition, never to this
/// one.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use koyomi::Interval;
///
/// let start = NaiveDate::from_ymd_opt(2020, 5, 23).unwrap();
/// let end = NaiveDate::from_ymd_opt(2020, 6, 21).unwrap();
/// let month = Interval::new(start, end);
///
/// assert!(month.contains(&start));
/// assert!(!month.contains(&end));
/// assert_eq!(month.day_count(), 29);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Interval<T: TimeInstant> {
    pub start: T,
    pub end: T,
}

/// Interval of civil dates.
pub type DateSpan = Interval<NaiveDate>;

impl<T: TimeInstant> Interval<T> {
    /// Creates a new interval between two time instants.
    pub fn new(start: T, end: T) -> Self {
        Interval { start, end }
    }

    /// Returns the duration of the interval as the difference between end and start.
    pub fn duration(&self) -> T::Duration {
        self.end.difference(&self.start)
    }

    /// `true` when `start <= instant < end`.
    #[inline]
    pub fn contains(&self, instant: &T) -> bool {
        self.start <= *instant && *instant < self.end
    }

    /// Projects both endpoints onto the civil dates they fall on.
    pub fn civil_dates(&self) -> DateSpan {
        Interval::new(self.start.civil_date(), self.end.civil_date())
    }
}

impl<T: TimeInstant + fmt::Display> fmt::Display for Interval<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {}", self.start, self.end)
    }
}

impl Interval<NaiveDate> {
    /// Number of civil days in `[start, end)`.
    pub fn day_count(&self) -> i64 {
        self.duration().num_days()
    }

    /// Iterates over every civil date in `[start, end)`.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// Splits an ordered list of boundaries into the contiguous intervals
/// `[b₀, b₁), [b₁, b₂), …`.
///
/// Fewer than two boundaries yield no interval.
pub fn windows<T: TimeInstant>(boundaries: &[T]) -> Vec<Interval<T>> {
    boundaries
        .windows(2)
        .map(|pair| Interval::new(pair[0], pair[1]))
        .collect()
}
