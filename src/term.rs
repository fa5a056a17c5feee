// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! The 24 solar terms and the two ways of timing them.
//!
//! A solar term is the instant the apparent solar longitude crosses a
//! multiple of 15°.  Terms on multiples of 30° are *principal* terms (中気)
//! and decide lunar month numbering; the others are *minor* terms (節気).
//!
//! A [`TermTimeline`] is produced by one of two [`TermStrategy`] variants:
//!
//! | Strategy | Source of each crossing |
//! |----------|-------------------------|
//! | [`TermStrategy::MeanDivision`] | the interval between two winter solstices split into 24 equal parts (平気法) |
//! | [`TermStrategy::TruePosition`] | externally supplied exact crossings, one per term per year (定気法) |

use crate::error::{CalendarError, Result};
use crate::instant::TimeInstant;
use chrono::{Datelike, NaiveDateTime, TimeDelta};
use std::fmt;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════
// TermKind
// ═══════════════════════════════════════════════════════════════════════════

/// One of the 24 solar terms, declared in order of solar longitude from the
/// vernal equinox (0°).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TermKind {
    VernalEquinox,
    ClearAndBright,
    GrainRain,
    StartOfSummer,
    SmallFull,
    GrainInEar,
    SummerSolstice,
    MinorHeat,
    MajorHeat,
    StartOfAutumn,
    LimitOfHeat,
    WhiteDew,
    AutumnalEquinox,
    ColdDew,
    FrostDescent,
    StartOfWinter,
    MinorSnow,
    MajorSnow,
    WinterSolstice,
    MinorCold,
    MajorCold,
    StartOfSpring,
    RainWater,
    AwakeningOfInsects,
}

/// `(kind, traditional label, English name)`, indexed by `longitude / 15`.
const TERM_TABLE: [(TermKind, &str, &str); 24] = [
    (TermKind::VernalEquinox, "春分", "vernal equinox"),
    (TermKind::ClearAndBright, "清明", "clear and bright"),
    (TermKind::GrainRain, "穀雨", "grain rain"),
    (TermKind::StartOfSummer, "立夏", "start of summer"),
    (TermKind::SmallFull, "小満", "small full"),
    (TermKind::GrainInEar, "芒種", "grain in ear"),
    (TermKind::SummerSolstice, "夏至", "summer solstice"),
    (TermKind::MinorHeat, "小暑", "minor heat"),
    (TermKind::MajorHeat, "大暑", "major heat"),
    (TermKind::StartOfAutumn, "立秋", "start of autumn"),
    (TermKind::LimitOfHeat, "処暑", "limit of heat"),
    (TermKind::WhiteDew, "白露", "white dew"),
    (TermKind::AutumnalEquinox, "秋分", "autumnal equinox"),
    (TermKind::ColdDew, "寒露", "cold dew"),
    (TermKind::FrostDescent, "霜降", "frost descent"),
    (TermKind::StartOfWinter, "立冬", "start of winter"),
    (TermKind::MinorSnow, "小雪", "minor snow"),
    (TermKind::MajorSnow, "大雪", "major snow"),
    (TermKind::WinterSolstice, "冬至", "winter solstice"),
    (TermKind::MinorCold, "小寒", "minor cold"),
    (TermKind::MajorCold, "大寒", "major cold"),
    (TermKind::StartOfSpring, "立春", "start of spring"),
    (TermKind::RainWater, "雨水", "rain water"),
    (TermKind::AwakeningOfInsects, "啓蟄", "awakening of insects"),
];

impl TermKind {
    /// All terms in order of increasing solar longitude from 0°.
    pub const ALL: [TermKind; 24] = {
        let mut all = [TermKind::VernalEquinox; 24];
        let mut i = 0;
        while i < 24 {
            all[i] = TERM_TABLE[i].0;
            i += 1;
        }
        all
    };

    /// Position in the 15° cycle anchored at the vernal equinox, `0..24`.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Solar longitude of the crossing, in degrees.
    #[inline]
    pub fn longitude(self) -> u16 {
        self.index() as u16 * 15
    }

    /// `true` for the twelve principal terms (longitude a multiple of 30°).
    #[inline]
    pub fn is_principal(self) -> bool {
        (self.longitude() / 15) % 2 == 0
    }

    /// Lunar month number fixed by this term, for the four cardinal terms.
    ///
    /// The winter solstice pins month 11, the vernal equinox month 2, the
    /// summer solstice month 5, the autumnal equinox month 8.
    pub fn anchor_month(self) -> Option<u8> {
        match self {
            TermKind::WinterSolstice => Some(11),
            TermKind::VernalEquinox => Some(2),
            TermKind::SummerSolstice => Some(5),
            TermKind::AutumnalEquinox => Some(8),
            _ => None,
        }
    }

    /// Traditional label (立春, 雨水, …).
    #[inline]
    pub fn label(self) -> &'static str {
        TERM_TABLE[self.index()].1
    }

    /// English name.
    #[inline]
    pub fn name(self) -> &'static str {
        TERM_TABLE[self.index()].2
    }

    /// Looks a term up by solar longitude. Any multiple of 360° is folded;
    /// longitudes off the 15° grid yield `None`.
    pub fn from_longitude(degrees: u16) -> Option<Self> {
        let degrees = degrees % 360;
        if degrees % 15 != 0 {
            return None;
        }
        Some(TERM_TABLE[(degrees / 15) as usize].0)
    }

    /// Looks a term up by its traditional label.
    pub fn from_label(label: &str) -> Option<Self> {
        TERM_TABLE
            .iter()
            .find(|row| row.1 == label)
            .map(|row| row.0)
    }
}

impl fmt::Display for TermKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TermEvent
// ═══════════════════════════════════════════════════════════════════════════

/// A solar term crossing at a local civil timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TermEvent {
    pub at: NaiveDateTime,
    pub kind: TermKind,
}

impl TermEvent {
    pub fn new(at: NaiveDateTime, kind: TermKind) -> Self {
        Self { at, kind }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// TermStrategy
// ═══════════════════════════════════════════════════════════════════════════

/// How solar term crossings are timed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum TermStrategy {
    /// Divide the interval between two consecutive winter solstices into 24
    /// equal parts.
    MeanDivision,
    /// Use the supplied exact crossing of every term.
    #[default]
    TruePosition,
}

impl TermStrategy {
    /// Produces the ordered term events for the lunar year ending at the
    /// winter solstice of `target_year`.
    fn compute(self, raw: &[TermEvent], target_year: i32) -> Result<Vec<TermEvent>> {
        match self {
            TermStrategy::MeanDivision => mean_division(raw, target_year),
            TermStrategy::TruePosition => true_position(raw, target_year),
        }
    }
}

fn winter_solstice_in(events: &[TermEvent], year: i32) -> Option<NaiveDateTime> {
    events
        .iter()
        .find(|e| e.kind == TermKind::WinterSolstice && e.at.year() == year)
        .map(|e| e.at)
}

fn total_nanos(delta: TimeDelta) -> i128 {
    delta.num_seconds() as i128 * 1_000_000_000 + delta.subsec_nanos() as i128
}

fn delta_from_nanos(nanos: i128) -> TimeDelta {
    let secs = (nanos / 1_000_000_000) as i64;
    let rest = (nanos % 1_000_000_000) as i64;
    TimeDelta::seconds(secs) + TimeDelta::nanoseconds(rest)
}

/// Splits `[prior solstice, current solstice]` into 24 equal steps.
///
/// Step `i` is assigned the term at longitude `(270 + 15·i) mod 360`; the
/// 24th boundary is the known current solstice itself, so rounding never
/// drifts the anchor.
fn mean_division(raw: &[TermEvent], target_year: i32) -> Result<Vec<TermEvent>> {
    let prior = winter_solstice_in(raw, target_year - 1).ok_or(CalendarError::MissingAnchor {
        year: target_year - 1,
    })?;
    let current = winter_solstice_in(raw, target_year)
        .ok_or(CalendarError::MissingAnchor { year: target_year })?;

    let span = total_nanos(current.difference(&prior));
    let mut events = Vec::with_capacity(25);
    events.push(TermEvent::new(prior, TermKind::WinterSolstice));
    for i in 1..24usize {
        let offset = delta_from_nanos(span * i as i128 / 24);
        let kind = TermKind::ALL[(TermKind::WinterSolstice.index() + i) % 24];
        events.push(TermEvent::new(prior.add_duration(offset), kind));
    }
    events.push(TermEvent::new(current, TermKind::WinterSolstice));

    debug!(
        target_year,
        %prior,
        %current,
        "mean-division terms computed"
    );
    Ok(events)
}

/// Passes the supplied crossings through after checking that each term
/// occurs exactly once in each of `target_year - 1` and `target_year`.
fn true_position(raw: &[TermEvent], target_year: i32) -> Result<Vec<TermEvent>> {
    for year in [target_year - 1, target_year] {
        for term in TermKind::ALL {
            let count = raw
                .iter()
                .filter(|e| e.kind == term && e.at.year() == year)
                .count();
            if count != 1 {
                return Err(CalendarError::DuplicateOrMissingTerm { term, year, count });
            }
        }
    }
    debug!(target_year, events = raw.len(), "true-position terms validated");
    Ok(raw.to_vec())
}

// ═══════════════════════════════════════════════════════════════════════════
// TermTimeline
// ═══════════════════════════════════════════════════════════════════════════

/// Strictly ordered solar term crossings for the lunar year ending at the
/// winter solstice of `target_year`.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use koyomi::{TermEvent, TermKind, TermStrategy, TermTimeline};
///
/// let at = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
/// let raw = vec![
///     TermEvent::new(at(2019, 12, 22), TermKind::WinterSolstice),
///     TermEvent::new(at(2020, 12, 21), TermKind::WinterSolstice),
/// ];
///
/// let terms = TermTimeline::build(TermStrategy::MeanDivision, &raw, 2020).unwrap();
/// assert_eq!(terms.events().len(), 25);
/// assert_eq!(terms.events()[6].kind, TermKind::VernalEquinox);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct TermTimeline {
    strategy: TermStrategy,
    target_year: i32,
    events: Vec<TermEvent>,
}

impl TermTimeline {
    /// Builds the timeline with the given strategy.
    ///
    /// # Errors
    ///
    /// - [`CalendarError::UnorderedEvents`] if `raw` is not strictly
    ///   increasing in time.
    /// - [`CalendarError::MissingAnchor`] (mean division) if either bounding
    ///   winter solstice is absent.
    /// - [`CalendarError::DuplicateOrMissingTerm`] (true position) if a term
    ///   does not occur exactly once per year.
    pub fn build(strategy: TermStrategy, raw: &[TermEvent], target_year: i32) -> Result<Self> {
        if let Some(index) = raw.windows(2).position(|pair| pair[1].at <= pair[0].at) {
            return Err(CalendarError::UnorderedEvents { index: index + 1 });
        }
        let events = strategy.compute(raw, target_year)?;
        Ok(Self {
            strategy,
            target_year,
            events,
        })
    }

    /// Shorthand for [`build`](Self::build) with [`TermStrategy::MeanDivision`].
    pub fn mean_division(raw: &[TermEvent], target_year: i32) -> Result<Self> {
        Self::build(TermStrategy::MeanDivision, raw, target_year)
    }

    /// Shorthand for [`build`](Self::build) with [`TermStrategy::TruePosition`].
    pub fn true_position(raw: &[TermEvent], target_year: i32) -> Result<Self> {
        Self::build(TermStrategy::TruePosition, raw, target_year)
    }

    /// Wraps events without running any strategy or validation.
    #[cfg(test)]
    pub(crate) fn from_unchecked(
        strategy: TermStrategy,
        target_year: i32,
        events: Vec<TermEvent>,
    ) -> Self {
        Self {
            strategy,
            target_year,
            events,
        }
    }

    #[inline]
    pub fn strategy(&self) -> TermStrategy {
        self.strategy
    }

    #[inline]
    pub fn target_year(&self) -> i32 {
        self.target_year
    }

    #[inline]
    pub fn events(&self) -> &[TermEvent] {
        &self.events
    }

    /// Winter solstice falling in civil year `year`, if the timeline holds it.
    pub fn winter_solstice(&self, year: i32) -> Option<NaiveDateTime> {
        winter_solstice_in(&self.events, year)
    }

    /// Term events falling in `[lo, hi)`, in chronological order.
    pub fn terms_in_range(&self, lo: NaiveDateTime, hi: NaiveDateTime) -> Vec<TermEvent> {
        self.events
            .iter()
            .filter(|e| lo <= e.at && e.at < hi)
            .copied()
            .collect()
    }
}
