// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Lunisolar calendar construction
//!
//! This crate derives the traditional East-Asian lunisolar calendar from two
//! streams of astronomical events: lunar phase crossings (new moons open the
//! months) and the 24 solar term crossings (principal terms number them).
//! It does not compute ephemerides; crossings are supplied as local civil
//! timestamps.
//!
//! # Core types
//!
//! - [`PhaseTimeline`] — ordered phase crossings, new-moon range queries.
//! - [`TermTimeline`] — ordered solar terms, timed by a [`TermStrategy`].
//! - [`CalendarBuilder`] — partitions the dates into months and numbers them.
//! - [`LunisolarCalendar`] — the immutable day table and its lookups.
//! - [`Interval<T>`] — half-open interval over any [`TimeInstant`].
//! - [`EventSource`] — capability supplying raw crossings; [`EventTable`]
//!   is the in-memory implementation.
//!
//! # Solar term strategies
//!
//! | Strategy | Crossing times |
//! |----------|----------------|
//! | [`TermStrategy::MeanDivision`] | winter-solstice interval split into 24 equal steps |
//! | [`TermStrategy::TruePosition`] | exact crossings as supplied |
//!
//! # Example
//!
//! ```
//! use chrono::{NaiveDate, TimeDelta};
//! use koyomi::{
//!     CalendarConfig, EventTable, LunisolarCalendar, PhaseEvent, TermEvent, TermKind,
//!     TermStrategy,
//! };
//!
//! let at = |y, m, d| NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(12, 0, 0).unwrap();
//! let first = at(2019, 11, 27);
//! let table = EventTable::new()
//!     .with_phases((0..14).map(|i| PhaseEvent::new_moon(first + TimeDelta::minutes(i * 42_524))))
//!     .with_terms([
//!         TermEvent::new(at(2019, 12, 22), TermKind::WinterSolstice),
//!         TermEvent::new(at(2020, 12, 21), TermKind::WinterSolstice),
//!     ]);
//!
//! let config = CalendarConfig::new().with_strategy(TermStrategy::MeanDivision);
//! let calendar = LunisolarCalendar::from_source(&table, 2020, &config).unwrap();
//!
//! let solstice = calendar.lunar_date_of(NaiveDate::from_ymd_opt(2019, 12, 22).unwrap()).unwrap();
//! assert_eq!((solstice.month, solstice.is_leap, solstice.year), (11, false, 2019));
//! ```

mod calendar;
mod config;
mod error;
mod instant;
mod period;
mod phase;
mod source;
mod term;

// ── Re-exports ────────────────────────────────────────────────────────────

pub use calendar::{CalendarBuilder, CalendarDay, LunarDate, LunarMonthSegment, LunisolarCalendar};
pub use config::CalendarConfig;
pub use error::{CalendarError, Result};
pub use instant::{delta_of, TimeInstant};
pub use period::{windows, DateSpan, Interval};
pub use phase::{PhaseEvent, PhaseKind, PhaseTimeline};
pub use source::{EventSource, EventTable};
pub use term::{TermEvent, TermKind, TermStrategy, TermTimeline};
