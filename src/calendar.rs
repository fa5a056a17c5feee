// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Lunisolar calendar construction.
//!
//! [`CalendarBuilder`] turns a [`PhaseTimeline`] and a [`TermTimeline`] into
//! an immutable [`LunisolarCalendar`]: one row per civil date from the month
//! holding the prior winter solstice up to the month holding the target
//! winter solstice, each row carrying its lunar day, month, leap flag and
//! year.
//!
//! # Month containment
//!
//! A lunar month is the half-open span of civil dates
//! `[date(mᵢ), date(mᵢ₊₁))` between two new moons.  Events are assigned to
//! months by the civil date they fall on, so a new moon's whole day is day 1
//! of its month and an event sharing an instant with a new moon belongs to
//! the month that new moon opens.
//!
//! # Numbering
//!
//! Months are walked in chronological order starting at 11:
//!
//! | Principal terms in the month | Result |
//! |------------------------------|--------|
//! | winter solstice | month 11 |
//! | vernal equinox | month 2 |
//! | summer solstice | month 5 |
//! | autumnal equinox | month 8 |
//! | any other principal term | previous month + 1 (12 wraps to 1, next year) |
//! | none | leap month repeating the previous number |

use crate::config::CalendarConfig;
use crate::error::{CalendarError, Result};
use crate::instant::TimeInstant;
use crate::period::{windows, DateSpan, Interval};
use crate::phase::{PhaseKind, PhaseTimeline};
use crate::source::EventSource;
use crate::term::{TermKind, TermStrategy, TermTimeline};
use chrono::{Datelike, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use tracing::{debug, trace, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// Output rows
// ═══════════════════════════════════════════════════════════════════════════

/// Position of a civil date in the lunisolar calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LunarDate {
    /// Day of the lunar month, starting at 1 on the new-moon date.
    pub day: u32,
    /// Month number, `1..=12`.
    pub month: u8,
    /// `true` for an inserted leap month.
    pub is_leap: bool,
    /// Lunar year; months 11 and 12 carry the year of the winter they open.
    pub year: i32,
}

/// One row of the day table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub lunar: LunarDate,
    /// Lunar phase crossing on this date, if any.
    pub phase: Option<PhaseKind>,
    /// Solar term crossing on this date, if any.
    pub term: Option<TermKind>,
}

/// A numbered lunar month: the civil dates between two new moons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LunarMonthSegment {
    /// `[first day, first day of the next month)`.
    pub span: DateSpan,
    pub month: u8,
    pub is_leap: bool,
    pub year: i32,
}

impl LunarMonthSegment {
    /// Date of the new moon opening the month.
    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.span.start
    }

    /// First date of the following month.
    #[inline]
    pub fn end_exclusive(&self) -> NaiveDate {
        self.span.end
    }

    /// Number of days in the month (29 or 30 for real lunations).
    #[inline]
    pub fn day_count(&self) -> i64 {
        self.span.day_count()
    }

    #[inline]
    pub fn contains(&self, date: &NaiveDate) -> bool {
        self.span.contains(date)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Numbering state
// ═══════════════════════════════════════════════════════════════════════════

/// Running `(month, leap, year)` carried across month segments.
#[derive(Debug, Clone, Copy)]
struct MonthCursor {
    month: u8,
    is_leap: bool,
    year: i32,
    leap_seen: bool,
}

impl MonthCursor {
    fn seed(year: i32) -> Self {
        Self {
            month: 11,
            is_leap: false,
            year,
            leap_seen: false,
        }
    }

    fn next_year(&mut self) {
        self.year += 1;
        self.leap_seen = false;
    }

    fn step_forward(&mut self) {
        if self.month == 12 {
            self.month = 1;
            self.next_year();
        } else {
            self.month += 1;
        }
        self.is_leap = false;
    }

    fn anchor(&mut self, month: u8) {
        // An anchor behind the running number means month 1 was crossed.
        if month < self.month {
            self.next_year();
        }
        self.month = month;
        self.is_leap = false;
    }

    /// Applies the classification of one month from its principal terms.
    fn advance(&mut self, principal: &[TermKind], start: NaiveDate) {
        const ANCHORS: [TermKind; 4] = [
            TermKind::WinterSolstice,
            TermKind::VernalEquinox,
            TermKind::SummerSolstice,
            TermKind::AutumnalEquinox,
        ];

        let anchor = ANCHORS
            .iter()
            .find(|a| principal.contains(*a))
            .and_then(|a| a.anchor_month());
        if let Some(month) = anchor {
            self.anchor(month);
        } else if !principal.is_empty() {
            self.step_forward();
        } else if !self.leap_seen {
            self.is_leap = true;
            self.leap_seen = true;
        } else {
            warn!(
                %start,
                year = self.year,
                "second month without a principal term in one lunar year; numbering it as ordinary"
            );
            self.step_forward();
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CalendarBuilder
// ═══════════════════════════════════════════════════════════════════════════

/// Per-date stamps collected before numbering.
#[derive(Debug, Clone, Copy, Default)]
struct Stamp {
    phase: Option<PhaseKind>,
    term: Option<TermKind>,
}

#[inline]
fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

/// Builds the lunisolar calendar of one target year.
///
/// The builder owns both timelines for the duration of the build; the
/// result is immutable.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use koyomi::{CalendarBuilder, PhaseEvent, PhaseTimeline, TermEvent, TermKind, TermTimeline};
///
/// let at = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
///
/// // Fourteen new moons roughly 29.5 days apart, starting before the
/// // 2019 winter solstice.
/// let first = at(2019, 11, 27);
/// let moons = (0..14)
///     .map(|i| PhaseEvent::new_moon(first + chrono::TimeDelta::minutes(i * 42_524)))
///     .collect();
/// let phases = PhaseTimeline::new(moons).unwrap();
/// let terms = TermTimeline::mean_division(
///     &[
///         TermEvent::new(at(2019, 12, 22), TermKind::WinterSolstice),
///         TermEvent::new(at(2020, 12, 21), TermKind::WinterSolstice),
///     ],
///     2020,
/// )
/// .unwrap();
///
/// let calendar = CalendarBuilder::new(2020, phases, terms).build().unwrap();
/// let first_day = calendar.lunar_date_of(NaiveDate::from_ymd_opt(2019, 11, 27).unwrap()).unwrap();
/// assert_eq!((first_day.day, first_day.month, first_day.year), (1, 11, 2019));
/// ```
#[derive(Debug, Clone)]
pub struct CalendarBuilder {
    target_year: i32,
    phases: PhaseTimeline,
    terms: TermTimeline,
    sentinel: TimeDelta,
}

impl CalendarBuilder {
    /// Creates a builder with the default 29-day sentinel.
    pub fn new(target_year: i32, phases: PhaseTimeline, terms: TermTimeline) -> Self {
        Self {
            target_year,
            phases,
            terms,
            sentinel: TimeDelta::days(29),
        }
    }

    /// Distance from the last known new moon to the synthetic one closing
    /// the final month.
    pub fn with_sentinel(mut self, sentinel: TimeDelta) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Runs the build.
    ///
    /// # Errors
    ///
    /// - [`CalendarError::InvalidSentinel`] if the sentinel span is not
    ///   strictly positive.
    /// - [`CalendarError::MissingAnchor`] if the term timeline lacks either
    ///   winter solstice.
    /// - [`CalendarError::AmbiguousRange`] if no new-moon interval contains
    ///   one of the two winter solstices.
    /// - [`CalendarError::InsufficientData`] if the new moons do not bracket
    ///   the resolved range.
    #[tracing::instrument(
        skip(self),
        fields(target_year = self.target_year, strategy = ?self.terms.strategy())
    )]
    pub fn build(self) -> Result<LunisolarCalendar> {
        if self.sentinel <= TimeDelta::zero() {
            return Err(CalendarError::InvalidSentinel {
                days: self.sentinel.num_seconds() as f64 / 86_400.0,
            });
        }
        let year = self.target_year;
        let prior_ws = self
            .terms
            .winter_solstice(year - 1)
            .ok_or(CalendarError::MissingAnchor { year: year - 1 })?;
        let target_ws = self
            .terms
            .winter_solstice(year)
            .ok_or(CalendarError::MissingAnchor { year })?;

        // Step 1: range resolution.
        let phases = self.phases.with_sentinel(self.sentinel);
        let (start, end) = resolve_range(&phases, prior_ws, target_ws)?;
        let mut boundaries = phases.new_moons_in_range(start, end)?;
        boundaries.push(end);
        debug!(%start, %end, months = boundaries.len() - 1, "range resolved");

        // Step 2: one stamp per date in [start, end], the last one closing
        // the final month.
        let first = start.civil_date();
        let last = end.civil_date();
        let mut stamps = vec![Stamp::default(); (last - first).num_days() as usize + 1];
        let offset = |date: NaiveDate| (date - first).num_days() as usize;

        // Step 3: stamping.
        for event in phases.events_in_range(midnight(first), midnight(last)) {
            let slot = &mut stamps[offset(event.at.civil_date())];
            if let Some(previous) = slot.phase.replace(event.kind) {
                warn!(date = %event.at.date(), %previous, current = %event.kind, "phase stamp overwritten");
            }
            trace!(at = %event.at, kind = %event.kind, "phase stamped");
        }
        if let Some(closing) = stamps.last_mut() {
            closing.phase = Some(PhaseKind::NewMoon);
        }
        for event in self.terms.terms_in_range(midnight(first), midnight(last)) {
            let slot = &mut stamps[offset(event.at.civil_date())];
            if let Some(previous) = slot.term.replace(event.kind) {
                warn!(date = %event.at.date(), %previous, current = %event.kind, "term stamp overwritten");
            }
            trace!(at = %event.at, kind = %event.kind, "term stamped");
        }

        // Step 4: numbering.
        let dates: Vec<NaiveDate> = boundaries.iter().map(|t| t.civil_date()).collect();
        let mut cursor = MonthCursor::seed(first.year());
        let mut segments = Vec::with_capacity(dates.len().saturating_sub(1));
        let mut days = Vec::with_capacity(stamps.len() - 1);
        for span in windows(&dates) {
            let principal: Vec<TermKind> = span
                .dates()
                .filter_map(|d| stamps[offset(d)].term)
                .filter(|t| t.is_principal())
                .collect();
            cursor.advance(&principal, span.start);
            debug!(
                start = %span.start,
                month = cursor.month,
                is_leap = cursor.is_leap,
                year = cursor.year,
                "month numbered"
            );

            for date in span.dates() {
                let stamp = stamps[offset(date)];
                days.push(CalendarDay {
                    date,
                    lunar: LunarDate {
                        day: (date - span.start).num_days() as u32 + 1,
                        month: cursor.month,
                        is_leap: cursor.is_leap,
                        year: cursor.year,
                    },
                    phase: stamp.phase,
                    term: stamp.term,
                });
            }
            segments.push(LunarMonthSegment {
                span,
                month: cursor.month,
                is_leap: cursor.is_leap,
                year: cursor.year,
            });
        }

        let span = Interval::new(first, last);
        debug!(%span, days = days.len(), "day table built");
        Ok(LunisolarCalendar {
            target_year: year,
            strategy: self.terms.strategy(),
            span,
            days,
            segments,
        })
    }
}

/// Finds the new moon opening the month of the prior solstice and the new
/// moon closing the month of the target solstice.
fn resolve_range(
    phases: &PhaseTimeline,
    prior_ws: NaiveDateTime,
    target_ws: NaiveDateTime,
) -> Result<(NaiveDateTime, NaiveDateTime)> {
    let moons: Vec<NaiveDateTime> = phases.new_moons().collect();
    let months = windows(&moons);
    let containing = |ws: NaiveDateTime| {
        months
            .iter()
            .find(|m| m.civil_dates().contains(&ws.civil_date()))
            .ok_or(CalendarError::AmbiguousRange { solstice: ws })
    };
    let start = containing(prior_ws)?.start;
    let end = containing(target_ws)?.end;
    Ok((start, end))
}

// ═══════════════════════════════════════════════════════════════════════════
// LunisolarCalendar
// ═══════════════════════════════════════════════════════════════════════════

/// The finished, read-only day table of one target year.
#[derive(Debug, Clone, PartialEq)]
pub struct LunisolarCalendar {
    target_year: i32,
    strategy: TermStrategy,
    span: DateSpan,
    days: Vec<CalendarDay>,
    segments: Vec<LunarMonthSegment>,
}

impl LunisolarCalendar {
    /// Fetches `target_year - 1 ..= target_year` from `source` and builds
    /// the calendar with `config`.
    ///
    /// # Errors
    ///
    /// Any error of [`CalendarConfig::validate`], of the source, of the two
    /// timeline constructors, or of [`CalendarBuilder::build`].
    #[tracing::instrument(skip(source, config), fields(strategy = ?config.strategy()))]
    pub fn from_source<S>(source: &S, target_year: i32, config: &CalendarConfig) -> Result<Self>
    where
        S: EventSource + ?Sized,
    {
        let sentinel = config.sentinel_delta()?;
        let years = target_year - 1..=target_year;
        let phases = PhaseTimeline::new(source.phase_events(years.clone())?)?;
        let raw_terms = source.term_events(years, config.strategy())?;
        let terms = TermTimeline::build(config.strategy(), &raw_terms, target_year)?;
        CalendarBuilder::new(target_year, phases, terms)
            .with_sentinel(sentinel)
            .build()
    }

    #[inline]
    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    /// Strategy that timed the solar terms.
    #[inline]
    pub fn strategy(&self) -> TermStrategy {
        self.strategy
    }

    /// Covered dates, `[first day, day after the last day)`.
    #[inline]
    pub fn span(&self) -> DateSpan {
        self.span
    }

    /// All rows, one per date in [`span`](Self::span).
    #[inline]
    pub fn days(&self) -> &[CalendarDay] {
        &self.days
    }

    /// All months, in order.
    #[inline]
    pub fn segments(&self) -> &[LunarMonthSegment] {
        &self.segments
    }

    /// Leap months of the table, in order.
    pub fn leap_months(&self) -> impl Iterator<Item = &LunarMonthSegment> + '_ {
        self.segments.iter().filter(|s| s.is_leap)
    }

    /// The leap month of the lunar year ending at the target winter
    /// solstice, if it has one.
    pub fn leap_month(&self) -> Option<&LunarMonthSegment> {
        self.leap_months().next()
    }

    fn out_of_range(&self, date: NaiveDate) -> CalendarError {
        CalendarError::OutOfRange {
            date,
            first: self.span.start,
            last: self.span.end - TimeDelta::days(1),
        }
    }

    /// Row of `date`.
    ///
    /// # Errors
    ///
    /// [`CalendarError::OutOfRange`] if `date` is outside [`span`](Self::span).
    pub fn day(&self, date: NaiveDate) -> Result<&CalendarDay> {
        if !self.span.contains(&date) {
            return Err(self.out_of_range(date));
        }
        let index = (date - self.span.start).num_days() as usize;
        self.days
            .get(index)
            .ok_or_else(|| self.out_of_range(date))
    }

    /// Lunar day, month, leap flag and year of `date`.
    ///
    /// # Errors
    ///
    /// [`CalendarError::OutOfRange`] if `date` is outside [`span`](Self::span).
    pub fn lunar_date_of(&self, date: NaiveDate) -> Result<LunarDate> {
        self.day(date).map(|row| row.lunar)
    }

    /// Month containing `date`.
    ///
    /// # Errors
    ///
    /// [`CalendarError::OutOfRange`] if `date` is outside [`span`](Self::span).
    pub fn segment_of(&self, date: NaiveDate) -> Result<&LunarMonthSegment> {
        let index = self.segments.partition_point(|s| s.span.end <= date);
        self.segments
            .get(index)
            .filter(|s| s.contains(&date))
            .ok_or_else(|| self.out_of_range(date))
    }
}
