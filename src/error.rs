// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Error types for the koyomi crate.

use crate::term::TermKind;
use chrono::{NaiveDate, NaiveDateTime};

/// Convenience alias used by every fallible operation in the crate.
pub type Result<T> = std::result::Result<T, CalendarError>;

/// Error type for all fallible operations in the koyomi crate.
///
/// Every variant is recoverable by handing the failing call wider or
/// corrected input; construction never leaves partial state behind.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalendarError {
    /// The new-moon list does not reach far enough on one side of the
    /// requested span.
    #[error("new moons do not cover {lo} to {hi}")]
    InsufficientData {
        /// Lower end of the requested span.
        lo: NaiveDateTime,
        /// Upper end of the requested span.
        hi: NaiveDateTime,
    },

    /// A winter solstice bounding the mean-division interval is absent.
    #[error("no winter solstice found in {year}")]
    MissingAnchor {
        /// Civil year whose solstice is missing.
        year: i32,
    },

    /// A true-position term list does not hold exactly one crossing of a
    /// term within a year.
    #[error("{term} occurs {count} times in {year} (expected exactly once)")]
    DuplicateOrMissingTerm {
        /// The offending term.
        term: TermKind,
        /// Civil year under validation.
        year: i32,
        /// Number of occurrences found.
        count: usize,
    },

    /// No new-moon interval contains the given winter solstice.
    #[error("no lunar month contains the winter solstice of {solstice}")]
    AmbiguousRange {
        /// The uncontained solstice.
        solstice: NaiveDateTime,
    },

    /// A lookup fell outside the built day table.
    #[error("{date} is outside the calendar table {first} to {last}")]
    OutOfRange {
        /// The requested date.
        date: NaiveDate,
        /// First date of the table.
        first: NaiveDate,
        /// Last date of the table (inclusive).
        last: NaiveDate,
    },

    /// An event list is not strictly increasing in time.
    #[error("event {index} is not later than its predecessor")]
    UnorderedEvents {
        /// Position of the first out-of-order event.
        index: usize,
    },

    /// The sentinel span closing the last month is unusable.
    #[error("sentinel span must be finite and positive, got {days} days")]
    InvalidSentinel {
        /// The rejected span in days.
        days: f64,
    },

    /// An [`EventSource`](crate::EventSource) failed to deliver events.
    #[error("event source failed: {reason}")]
    Source {
        /// Description of the underlying failure.
        reason: String,
    },
}

impl CalendarError {
    /// Wraps any displayable source failure.
    pub fn from_source(err: impl std::fmt::Display) -> Self {
        Self::Source {
            reason: err.to_string(),
        }
    }
}
