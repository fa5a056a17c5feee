// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Event source capability.
//!
//! The calendar core never fetches anything itself: whatever supplies the
//! crossings (a published almanac table, a file, a numerical ephemeris)
//! implements [`EventSource`].  [`EventTable`] is the in-memory
//! implementation.

use crate::error::Result;
use crate::phase::PhaseEvent;
use crate::term::{TermEvent, TermKind, TermStrategy};
use chrono::Datelike;
use std::ops::RangeInclusive;

/// Supplier of raw phase and term crossings.
///
/// Implementations must return events in strictly increasing time order,
/// without duplicates, as local civil timestamps.
pub trait EventSource {
    /// Phase crossings whose civil year lies in `years`.
    fn phase_events(&self, years: RangeInclusive<i32>) -> Result<Vec<PhaseEvent>>;

    /// Term crossings whose civil year lies in `years`.
    ///
    /// `strategy` is a hint: under [`TermStrategy::MeanDivision`] only the
    /// winter solstices are needed.
    fn term_events(
        &self,
        years: RangeInclusive<i32>,
        strategy: TermStrategy,
    ) -> Result<Vec<TermEvent>>;
}

/// In-memory [`EventSource`].
///
/// Events may be inserted in any order; queries return them sorted and
/// de-duplicated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    phases: Vec<PhaseEvent>,
    terms: Vec<TermEvent>,
}

impl EventTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_phases(mut self, events: impl IntoIterator<Item = PhaseEvent>) -> Self {
        self.phases.extend(events);
        self
    }

    pub fn with_terms(mut self, events: impl IntoIterator<Item = TermEvent>) -> Self {
        self.terms.extend(events);
        self
    }

    pub fn push_phase(&mut self, event: PhaseEvent) {
        self.phases.push(event);
    }

    pub fn push_term(&mut self, event: TermEvent) {
        self.terms.push(event);
    }
}

impl EventSource for EventTable {
    fn phase_events(&self, years: RangeInclusive<i32>) -> Result<Vec<PhaseEvent>> {
        let mut events: Vec<PhaseEvent> = self
            .phases
            .iter()
            .filter(|e| years.contains(&e.at.year()))
            .copied()
            .collect();
        events.sort_by_key(|e| (e.at, e.kind));
        events.dedup();
        Ok(events)
    }

    fn term_events(
        &self,
        years: RangeInclusive<i32>,
        strategy: TermStrategy,
    ) -> Result<Vec<TermEvent>> {
        let mut events: Vec<TermEvent> = self
            .terms
            .iter()
            .filter(|e| years.contains(&e.at.year()))
            .filter(|e| {
                strategy == TermStrategy::TruePosition || e.kind == TermKind::WinterSolstice
            })
            .copied()
            .collect();
        events.sort_by_key(|e| (e.at, e.kind));
        events.dedup();
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::phase::PhaseKind;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn table() -> EventTable {
        EventTable::new()
            .with_phases([
                PhaseEvent::new_moon(at(2020, 1, 25)),
                PhaseEvent::new_moon(at(2019, 12, 26)),
                PhaseEvent::new(at(2020, 2, 9), PhaseKind::FullMoon),
                PhaseEvent::new_moon(at(2018, 12, 7)),
                PhaseEvent::new_moon(at(2020, 1, 25)),
            ])
            .with_terms([
                TermEvent::new(at(2020, 3, 20), TermKind::VernalEquinox),
                TermEvent::new(at(2019, 12, 22), TermKind::WinterSolstice),
                TermEvent::new(at(2020, 12, 21), TermKind::WinterSolstice),
            ])
    }

    #[test]
    fn test_phase_events_sorted_filtered_deduplicated() {
        let events = table().phase_events(2019..=2020).unwrap();
        let times: Vec<_> = events.iter().map(|e| e.at).collect();
        assert_eq!(
            times,
            vec![at(2019, 12, 26), at(2020, 1, 25), at(2020, 2, 9)]
        );
    }

    #[test]
    fn test_term_events_true_position_returns_all() {
        let events = table()
            .term_events(2019..=2020, TermStrategy::TruePosition)
            .unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, TermKind::WinterSolstice);
        assert_eq!(events[1].kind, TermKind::VernalEquinox);
    }

    #[test]
    fn test_term_events_mean_division_returns_solstices() {
        let events = table()
            .term_events(2019..=2020, TermStrategy::MeanDivision)
            .unwrap();
        assert!(events.iter().all(|e| e.kind == TermKind::WinterSolstice));
        assert_eq!(events.len(), 2);
    }

    #[test]
    fn test_push_methods() {
        let mut table = EventTable::new();
        table.push_phase(PhaseEvent::new_moon(at(2020, 1, 25)));
        table.push_term(TermEvent::new(at(2020, 3, 20), TermKind::VernalEquinox));
        assert_eq!(table.phase_events(2020..=2020).unwrap().len(), 1);
        assert!(table.phase_events(2021..=2021).unwrap().is_empty());
        assert_eq!(
            table
                .term_events(2020..=2020, TermStrategy::TruePosition)
                .unwrap()
                .len(),
            1
        );
    }
}
