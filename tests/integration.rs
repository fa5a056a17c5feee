use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta};
use koyomi::{
    CalendarConfig, CalendarError, EventSource, EventTable, LunisolarCalendar, PhaseEvent,
    PhaseKind, TermEvent, TermKind, TermStrategy,
};
use qtty::Days;
use std::collections::BTreeMap;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    date(y, m, d).and_hms_opt(h, min, 0).unwrap()
}

/// New moons of 2019 and 2020 (JST).
fn new_moons() -> Vec<NaiveDateTime> {
    vec![
        at(2019, 1, 6, 10, 28),
        at(2019, 2, 5, 6, 4),
        at(2019, 3, 7, 1, 4),
        at(2019, 4, 5, 17, 50),
        at(2019, 5, 5, 7, 45),
        at(2019, 6, 3, 19, 2),
        at(2019, 7, 3, 4, 16),
        at(2019, 8, 1, 12, 12),
        at(2019, 8, 30, 19, 37),
        at(2019, 9, 29, 3, 26),
        at(2019, 10, 28, 12, 38),
        at(2019, 11, 27, 0, 6),
        at(2019, 12, 26, 14, 13),
        at(2020, 1, 25, 6, 42),
        at(2020, 2, 24, 0, 32),
        at(2020, 3, 24, 18, 28),
        at(2020, 4, 23, 11, 26),
        at(2020, 5, 23, 2, 39),
        at(2020, 6, 21, 15, 41),
        at(2020, 7, 21, 2, 33),
        at(2020, 8, 19, 11, 42),
        at(2020, 9, 17, 20, 0),
        at(2020, 10, 17, 4, 31),
        at(2020, 11, 15, 14, 7),
        at(2020, 12, 15, 1, 17),
    ]
}

/// Full moons of 2020 (JST).
fn full_moons() -> Vec<NaiveDateTime> {
    vec![
        at(2020, 1, 11, 4, 21),
        at(2020, 2, 9, 16, 33),
        at(2020, 3, 10, 2, 48),
        at(2020, 4, 8, 11, 35),
        at(2020, 5, 7, 19, 45),
        at(2020, 6, 6, 4, 12),
        at(2020, 7, 5, 13, 44),
        at(2020, 8, 4, 0, 59),
        at(2020, 9, 2, 14, 22),
        at(2020, 10, 2, 6, 5),
        at(2020, 10, 31, 23, 49),
        at(2020, 11, 30, 18, 30),
        at(2020, 12, 30, 12, 28),
    ]
}

/// All 24 solar terms of 2019 and 2020 (JST), from minor cold onwards.
fn solar_terms() -> Vec<TermEvent> {
    let y2019 = [
        at(2019, 1, 6, 1, 39),
        at(2019, 1, 20, 19, 0),
        at(2019, 2, 4, 12, 14),
        at(2019, 2, 19, 8, 4),
        at(2019, 3, 6, 6, 10),
        at(2019, 3, 21, 6, 58),
        at(2019, 4, 5, 10, 51),
        at(2019, 4, 20, 17, 55),
        at(2019, 5, 6, 4, 3),
        at(2019, 5, 21, 16, 59),
        at(2019, 6, 6, 8, 6),
        at(2019, 6, 22, 0, 54),
        at(2019, 7, 7, 18, 21),
        at(2019, 7, 23, 11, 50),
        at(2019, 8, 8, 4, 13),
        at(2019, 8, 23, 18, 2),
        at(2019, 9, 8, 7, 17),
        at(2019, 9, 23, 16, 50),
        at(2019, 10, 8, 23, 6),
        at(2019, 10, 24, 2, 20),
        at(2019, 11, 8, 2, 24),
        at(2019, 11, 22, 23, 59),
        at(2019, 12, 7, 19, 18),
        at(2019, 12, 22, 13, 19),
    ];
    let y2020 = [
        at(2020, 1, 6, 7, 30),
        at(2020, 1, 20, 23, 55),
        at(2020, 2, 4, 18, 3),
        at(2020, 2, 19, 13, 57),
        at(2020, 3, 5, 11, 57),
        at(2020, 3, 20, 12, 50),
        at(2020, 4, 4, 16, 38),
        at(2020, 4, 19, 23, 45),
        at(2020, 5, 5, 9, 51),
        at(2020, 5, 20, 22, 49),
        at(2020, 6, 5, 13, 58),
        at(2020, 6, 21, 6, 44),
        at(2020, 7, 7, 0, 14),
        at(2020, 7, 22, 17, 37),
        at(2020, 8, 7, 10, 6),
        at(2020, 8, 23, 0, 45),
        at(2020, 9, 7, 13, 8),
        at(2020, 9, 22, 22, 31),
        at(2020, 10, 8, 5, 55),
        at(2020, 10, 23, 8, 59),
        at(2020, 11, 7, 9, 14),
        at(2020, 11, 22, 6, 40),
        at(2020, 12, 7, 2, 9),
        at(2020, 12, 21, 19, 2),
    ];
    y2019
        .into_iter()
        .chain(y2020)
        .enumerate()
        .map(|(i, t)| {
            let longitude = TermKind::MinorCold.longitude() + 15 * (i % 24) as u16;
            TermEvent::new(t, TermKind::from_longitude(longitude).unwrap())
        })
        .collect()
}

fn table() -> EventTable {
    EventTable::new()
        .with_phases(new_moons().into_iter().map(PhaseEvent::new_moon))
        .with_phases(
            full_moons()
                .into_iter()
                .map(|t| PhaseEvent::new(t, PhaseKind::FullMoon)),
        )
        .with_terms(solar_terms())
}

fn build(strategy: TermStrategy) -> LunisolarCalendar {
    let config = CalendarConfig::new().with_strategy(strategy);
    LunisolarCalendar::from_source(&table(), 2020, &config).unwrap()
}

fn numbering(calendar: &LunisolarCalendar) -> Vec<(NaiveDate, u8, bool, i32)> {
    calendar
        .segments()
        .iter()
        .map(|s| (s.start(), s.month, s.is_leap, s.year))
        .collect()
}

#[test]
fn true_position_2020_has_leap_fourth_month() {
    let calendar = build(TermStrategy::TruePosition);
    let leap = calendar.leap_month().expect("leap month");
    assert_eq!((leap.month, leap.year), (4, 2020));
    assert_eq!(leap.start(), date(2020, 5, 23));
    assert_eq!(leap.end_exclusive(), date(2020, 6, 21));

    let new_year = calendar.lunar_date_of(date(2020, 1, 25)).unwrap();
    assert_eq!(
        (new_year.day, new_year.month, new_year.is_leap, new_year.year),
        (1, 1, false, 2020)
    );
}

#[test]
fn solstice_month_after_prior_solstice_is_twelve() {
    let calendar = build(TermStrategy::TruePosition);
    let opened = calendar.segment_of(date(2019, 12, 26)).unwrap();
    assert_eq!((opened.month, opened.is_leap, opened.year), (12, false, 2019));
    let solstice = calendar.segment_of(date(2019, 12, 22)).unwrap();
    assert_eq!(solstice.start(), date(2019, 11, 27));
    assert_eq!((solstice.month, solstice.year), (11, 2019));
}

#[test]
fn winter_solstice_months_are_eleven() {
    for strategy in [TermStrategy::TruePosition, TermStrategy::MeanDivision] {
        let calendar = build(strategy);
        for solstice in [date(2019, 12, 22), date(2020, 12, 21)] {
            let month = calendar.segment_of(solstice).unwrap();
            assert_eq!((month.month, month.is_leap), (11, false), "{strategy:?}");
        }
    }
}

#[test]
fn strategies_agree_on_month_numbering() {
    let true_position = build(TermStrategy::TruePosition);
    let mean_division = build(TermStrategy::MeanDivision);
    assert_eq!(numbering(&true_position), numbering(&mean_division));
    assert_eq!(true_position.span(), mean_division.span());
    assert_eq!(mean_division.strategy(), TermStrategy::MeanDivision);
}

#[test]
fn every_date_maps_to_exactly_one_row() {
    let calendar = build(TermStrategy::TruePosition);
    let dates: Vec<NaiveDate> = calendar.days().iter().map(|d| d.date).collect();
    let expected: Vec<NaiveDate> = calendar.span().dates().collect();
    assert_eq!(dates, expected);
}

#[test]
fn lunar_days_restart_at_each_new_moon() {
    let calendar = build(TermStrategy::TruePosition);
    let mut previous: Option<(u32, u8, bool)> = None;
    for row in calendar.days() {
        let lunar = row.lunar;
        match previous {
            Some((day, month, is_leap)) if month == lunar.month && is_leap == lunar.is_leap => {
                assert_eq!(lunar.day, day + 1, "gap at {}", row.date)
            }
            _ => assert_eq!(lunar.day, 1, "month change at {}", row.date),
        }
        previous = Some((lunar.day, lunar.month, lunar.is_leap));
    }
}

#[test]
fn at_most_one_leap_month_per_lunar_year() {
    for strategy in [TermStrategy::TruePosition, TermStrategy::MeanDivision] {
        let calendar = build(strategy);
        let mut leaps: BTreeMap<i32, usize> = BTreeMap::new();
        for segment in calendar.leap_months() {
            *leaps.entry(segment.year).or_default() += 1;
        }
        assert!(leaps.values().all(|&n| n <= 1), "{leaps:?}");
    }
}

#[test]
fn segment_lengths_match_new_moon_dates() {
    let calendar = build(TermStrategy::TruePosition);
    let moons: Vec<NaiveDate> = new_moons().iter().map(|t| t.date()).collect();
    for segment in calendar.segments() {
        if let Some(i) = moons.iter().position(|d| *d == segment.start()) {
            if let Some(next) = moons.get(i + 1) {
                assert_eq!(segment.day_count(), (*next - moons[i]).num_days());
            }
        }
        assert!(segment.day_count() == 29 || segment.day_count() == 30);
    }
    let total: i64 = calendar.segments().iter().map(|s| s.day_count()).sum();
    assert_eq!(total, calendar.span().day_count());
}

#[test]
fn phases_and_terms_are_stamped() {
    let calendar = build(TermStrategy::TruePosition);
    assert_eq!(
        calendar.day(date(2020, 2, 9)).unwrap().phase,
        Some(PhaseKind::FullMoon)
    );
    assert_eq!(
        calendar.day(date(2020, 2, 4)).unwrap().term,
        Some(TermKind::StartOfSpring)
    );
    assert_eq!(
        calendar.day(date(2019, 12, 7)).unwrap().term,
        Some(TermKind::MajorSnow)
    );
    let stamped_moons = calendar
        .days()
        .iter()
        .filter(|d| d.phase == Some(PhaseKind::NewMoon))
        .count();
    assert_eq!(stamped_moons, calendar.segments().len());
}

#[test]
fn lookup_at_table_edges() {
    let calendar = build(TermStrategy::TruePosition);
    let last = calendar.span().end - TimeDelta::days(1);
    assert_eq!(last, date(2021, 1, 12));
    let lunar = calendar.lunar_date_of(last).unwrap();
    assert_eq!((lunar.month, lunar.is_leap, lunar.year), (11, false, 2020));

    let past = calendar.span().end;
    assert_eq!(
        calendar.lunar_date_of(past),
        Err(CalendarError::OutOfRange {
            date: past,
            first: date(2019, 11, 27),
            last,
        })
    );
}

#[test]
fn narrow_source_is_rejected() {
    let late_only = EventTable::new()
        .with_phases(
            new_moons()
                .into_iter()
                .filter(|t| t.year() == 2020)
                .map(PhaseEvent::new_moon),
        )
        .with_terms(solar_terms());
    let config = CalendarConfig::new();
    assert_eq!(
        LunisolarCalendar::from_source(&late_only, 2020, &config),
        Err(CalendarError::AmbiguousRange {
            solstice: at(2019, 12, 22, 13, 19)
        })
    );
}

#[test]
fn missing_prior_year_terms_are_rejected() {
    let config = CalendarConfig::new();
    let source = EventTable::new()
        .with_phases(new_moons().into_iter().map(PhaseEvent::new_moon))
        .with_terms(solar_terms().into_iter().filter(|e| e.at.year() == 2020));
    assert_eq!(
        LunisolarCalendar::from_source(&source, 2020, &config),
        Err(CalendarError::DuplicateOrMissingTerm {
            term: TermKind::VernalEquinox,
            year: 2019,
            count: 0,
        })
    );

    let config = config.with_strategy(TermStrategy::MeanDivision);
    assert_eq!(
        LunisolarCalendar::from_source(&source, 2020, &config),
        Err(CalendarError::MissingAnchor { year: 2019 })
    );
}

#[test]
fn invalid_sentinel_is_rejected_before_fetching() {
    struct Unreachable;
    impl EventSource for Unreachable {
        fn phase_events(
            &self,
            _years: std::ops::RangeInclusive<i32>,
        ) -> koyomi::Result<Vec<PhaseEvent>> {
            Err(CalendarError::from_source("phase source should not be queried"))
        }
        fn term_events(
            &self,
            _years: std::ops::RangeInclusive<i32>,
            _strategy: TermStrategy,
        ) -> koyomi::Result<Vec<TermEvent>> {
            Err(CalendarError::from_source("term source should not be queried"))
        }
    }

    let config = CalendarConfig::new().with_sentinel(Days::new(0.0));
    assert_eq!(
        LunisolarCalendar::from_source(&Unreachable, 2020, &config),
        Err(CalendarError::InvalidSentinel { days: 0.0 })
    );
    let config = CalendarConfig::new();
    assert!(matches!(
        LunisolarCalendar::from_source(&Unreachable, 2020, &config),
        Err(CalendarError::Source { .. })
    ));
}

#[test]
fn independent_builds_run_concurrently() {
    let source = table();
    let (a, b) = std::thread::scope(|scope| {
        let a = scope.spawn(|| {
            LunisolarCalendar::from_source(&source, 2020, &CalendarConfig::new()).unwrap()
        });
        let b = scope.spawn(|| {
            let config = CalendarConfig::new().with_strategy(TermStrategy::MeanDivision);
            LunisolarCalendar::from_source(&source, 2020, &config).unwrap()
        });
        (a.join().unwrap(), b.join().unwrap())
    });
    assert_eq!(numbering(&a), numbering(&b));
}

#[cfg(feature = "serde")]
#[test]
fn serde_calendar_day_fields() {
    let calendar = build(TermStrategy::TruePosition);
    let row = calendar.day(date(2020, 5, 23)).unwrap();
    let json = serde_json::to_string(row).unwrap();
    assert!(json.contains("\"is_leap\":true"));
    assert!(json.contains("NewMoon"));
    let back: koyomi::CalendarDay = serde_json::from_str(&json).unwrap();
    assert_eq!(&back, row);
}
