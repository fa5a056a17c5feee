// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Lunar phases and the new-moon timeline.
//!
//! [`PhaseTimeline`] holds the phase crossings of a queried span in strict
//! chronological order.  Only [`PhaseKind::NewMoon`] opens a lunar month;
//! the other kinds are carried for descriptive stamping of the day table.

use crate::error::{CalendarError, Result};
use crate::instant::TimeInstant;
use chrono::{NaiveDateTime, TimeDelta};
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// PhaseKind
// ═══════════════════════════════════════════════════════════════════════════

/// Principal lunar phases, keyed by the Moon–Sun elongation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum PhaseKind {
    NewMoon,
    FirstQuarter,
    FullMoon,
    LastQuarter,
}

/// `(kind, elongation in degrees, traditional label, English name)`.
const PHASE_TABLE: [(PhaseKind, u16, &str, &str); 4] = [
    (PhaseKind::NewMoon, 0, "朔", "new moon"),
    (PhaseKind::FirstQuarter, 90, "上弦", "first quarter"),
    (PhaseKind::FullMoon, 180, "望", "full moon"),
    (PhaseKind::LastQuarter, 270, "下弦", "last quarter"),
];

impl PhaseKind {
    /// All phases in order of increasing elongation.
    pub const ALL: [PhaseKind; 4] = [
        PhaseKind::NewMoon,
        PhaseKind::FirstQuarter,
        PhaseKind::FullMoon,
        PhaseKind::LastQuarter,
    ];

    #[inline]
    fn row(self) -> &'static (PhaseKind, u16, &'static str, &'static str) {
        &PHASE_TABLE[self as usize]
    }

    /// Moon–Sun elongation at which this phase occurs, in degrees.
    #[inline]
    pub fn longitude(self) -> u16 {
        self.row().1
    }

    /// Traditional label (朔, 上弦, 望, 下弦).
    #[inline]
    pub fn label(self) -> &'static str {
        self.row().2
    }

    /// English name.
    #[inline]
    pub fn name(self) -> &'static str {
        self.row().3
    }

    /// Looks a phase up by its elongation. Any multiple of 360° is folded.
    pub fn from_longitude(degrees: u16) -> Option<Self> {
        let degrees = degrees % 360;
        PHASE_TABLE
            .iter()
            .find(|row| row.1 == degrees)
            .map(|row| row.0)
    }

    /// Looks a phase up by its traditional label.
    pub fn from_label(label: &str) -> Option<Self> {
        PHASE_TABLE
            .iter()
            .find(|row| row.2 == label)
            .map(|row| row.0)
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PhaseEvent
// ═══════════════════════════════════════════════════════════════════════════

/// A lunar phase crossing at a local civil timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PhaseEvent {
    pub at: NaiveDateTime,
    pub kind: PhaseKind,
}

impl PhaseEvent {
    pub fn new(at: NaiveDateTime, kind: PhaseKind) -> Self {
        Self { at, kind }
    }

    /// Shorthand for a [`PhaseKind::NewMoon`] event.
    pub fn new_moon(at: NaiveDateTime) -> Self {
        Self::new(at, PhaseKind::NewMoon)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// PhaseTimeline
// ═══════════════════════════════════════════════════════════════════════════

/// Strictly ordered phase crossings covering a queried span.
///
/// The timeline is immutable once built; [`with_sentinel`](Self::with_sentinel)
/// returns a new value.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use koyomi::{PhaseEvent, PhaseTimeline};
///
/// let at = |m, d| NaiveDate::from_ymd_opt(2020, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// let timeline = PhaseTimeline::new(vec![
///     PhaseEvent::new_moon(at(1, 25)),
///     PhaseEvent::new_moon(at(2, 24)),
///     PhaseEvent::new_moon(at(3, 24)),
/// ])
/// .unwrap();
///
/// let inside = timeline.new_moons_in_range(at(2, 1), at(3, 1)).unwrap();
/// assert_eq!(inside, vec![at(2, 24)]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseTimeline {
    events: Vec<PhaseEvent>,
}

impl PhaseTimeline {
    /// Builds a timeline from events already in strictly increasing order.
    ///
    /// # Errors
    ///
    /// [`CalendarError::UnorderedEvents`] if any event is not later than its
    /// predecessor.
    pub fn new(events: Vec<PhaseEvent>) -> Result<Self> {
        if let Some(index) = events.windows(2).position(|pair| pair[1].at <= pair[0].at) {
            return Err(CalendarError::UnorderedEvents { index: index + 1 });
        }
        Ok(Self { events })
    }

    /// All events, in chronological order.
    #[inline]
    pub fn events(&self) -> &[PhaseEvent] {
        &self.events
    }

    /// New-moon timestamps, in chronological order.
    pub fn new_moons(&self) -> impl Iterator<Item = NaiveDateTime> + '_ {
        self.events
            .iter()
            .filter(|e| e.kind == PhaseKind::NewMoon)
            .map(|e| e.at)
    }

    /// Latest new moon in the timeline.
    pub fn last_new_moon(&self) -> Option<NaiveDateTime> {
        self.new_moons().last()
    }

    /// New moons falling in `[lo, hi)`.
    ///
    /// # Errors
    ///
    /// [`CalendarError::InsufficientData`] unless the timeline holds a new
    /// moon at or before `lo` (so the month containing `lo` is known) and
    /// one at or after `hi`.
    pub fn new_moons_in_range(
        &self,
        lo: NaiveDateTime,
        hi: NaiveDateTime,
    ) -> Result<Vec<NaiveDateTime>> {
        let mut moons = self.new_moons().peekable();
        let leading = moons.peek().is_some_and(|first| *first <= lo);
        let trailing = self.last_new_moon().is_some_and(|last| last >= hi);
        if !leading || !trailing {
            return Err(CalendarError::InsufficientData { lo, hi });
        }
        Ok(moons.filter(|t| lo <= *t && *t < hi).collect())
    }

    /// Events of any phase kind falling in `[lo, hi)`.
    pub fn events_in_range(
        &self,
        lo: NaiveDateTime,
        hi: NaiveDateTime,
    ) -> impl Iterator<Item = &PhaseEvent> + '_ {
        let from = self.events.partition_point(|e| e.at < lo);
        let to = self.events.partition_point(|e| e.at < hi);
        self.events[from..to.max(from)].iter()
    }

    /// Returns a copy with a synthetic new moon placed `span` after the last
    /// known one, closing the final lunar month.
    ///
    /// A timeline without new moons is returned unchanged.
    pub fn with_sentinel(&self, span: TimeDelta) -> Self {
        let mut events = self.events.clone();
        if let Some(last) = self.last_new_moon() {
            let sentinel = last.add_duration(span);
            let at = events.partition_point(|e| e.at <= sentinel);
            events.insert(at, PhaseEvent::new_moon(sentinel));
        }
        Self { events }
    }
}
