// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Civil-time instants.
//!
//! Every event handed to this crate is a **local civil timestamp**
//! ([`NaiveDateTime`]) carrying its own year context; no time-zone or
//! time-scale conversion happens here.  The day table, on the other hand,
//! is indexed by civil [`NaiveDate`].  Both are points on a line that can be
//! bounded by an [`Interval`](crate::Interval), so both implement
//! [`TimeInstant`].
//!
//! Spans configured in (fractional) days use [`qtty::Days`]; [`delta_of`]
//! turns that quantity into a [`chrono::TimeDelta`].

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use qtty::Days;

const NANOS_PER_DAY: f64 = 86_400_000_000_000.0;
const SECONDS_PER_DAY: f64 = 86_400.0;

// ═══════════════════════════════════════════════════════════════════════════
// TimeInstant trait
// ═══════════════════════════════════════════════════════════════════════════

/// Trait for types that represent a point on the civil time line.
///
/// Types implementing this trait can be used as endpoints of
/// [`Interval<T>`](crate::Interval) and projected onto the civil date they
/// fall on.
pub trait TimeInstant: Copy + Clone + PartialEq + PartialOrd + Sized {
    /// The duration type used for arithmetic operations.
    type Duration;

    /// Civil calendar date this instant falls on.
    fn civil_date(&self) -> NaiveDate;

    /// Compute the difference between two time instants.
    fn difference(&self, other: &Self) -> Self::Duration;

    /// Add a duration to this time instant.
    fn add_duration(&self, duration: Self::Duration) -> Self;
}

impl TimeInstant for NaiveDateTime {
    type Duration = TimeDelta;

    #[inline]
    fn civil_date(&self) -> NaiveDate {
        self.date()
    }

    #[inline]
    fn difference(&self, other: &Self) -> Self::Duration {
        *self - *other
    }

    #[inline]
    fn add_duration(&self, duration: Self::Duration) -> Self {
        *self + duration
    }
}

impl TimeInstant for NaiveDate {
    type Duration = TimeDelta;

    #[inline]
    fn civil_date(&self) -> NaiveDate {
        *self
    }

    #[inline]
    fn difference(&self, other: &Self) -> Self::Duration {
        self.signed_duration_since(*other)
    }

    #[inline]
    fn add_duration(&self, duration: Self::Duration) -> Self {
        *self + duration
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Days → TimeDelta
// ═══════════════════════════════════════════════════════════════════════════

/// Convert a span in days to a [`TimeDelta`], rounded to the nanosecond.
///
/// Returns `None` for non-finite spans or spans outside `TimeDelta`'s range.
pub fn delta_of(days: Days) -> Option<TimeDelta> {
    let value = days.value();
    if !value.is_finite() {
        return None;
    }
    let nanos = (value * NANOS_PER_DAY).round();
    if nanos.abs() < i64::MAX as f64 {
        Some(TimeDelta::nanoseconds(nanos as i64))
    } else {
        TimeDelta::try_seconds((value * SECONDS_PER_DAY).round() as i64)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════
