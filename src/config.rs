// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Configuration for building a lunisolar calendar.

use crate::error::{CalendarError, Result};
use crate::instant::delta_of;
use crate::term::TermStrategy;
use chrono::TimeDelta;
use qtty::Days;

#[cfg(feature = "serde")]
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Settings for one calendar build.
///
/// # Example
///
/// ```
/// use koyomi::{CalendarConfig, TermStrategy};
/// use qtty::Days;
///
/// let config = CalendarConfig::new()
///     .with_strategy(TermStrategy::MeanDivision)
///     .with_sentinel(Days::new(30.0));
///
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalendarConfig {
    /// How solar term crossings are timed.
    strategy: TermStrategy,
    /// Distance from the last known new moon to the synthetic one that
    /// closes the final month.
    #[cfg_attr(feature = "serde", serde(with = "days_as_f64"))]
    sentinel: Days,
}

impl CalendarConfig {
    /// Default sentinel span: the shorter of the two civil month lengths.
    pub const DEFAULT_SENTINEL: Days = Days::new(29.0);

    /// Creates a configuration with the defaults.
    ///
    /// Defaults: `strategy = TruePosition`, `sentinel = 29 days`.
    pub fn new() -> Self {
        Self {
            strategy: TermStrategy::default(),
            sentinel: Self::DEFAULT_SENTINEL,
        }
    }

    pub fn with_strategy(mut self, strategy: TermStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    pub fn with_sentinel(mut self, sentinel: Days) -> Self {
        self.sentinel = sentinel;
        self
    }

    #[inline]
    pub fn strategy(&self) -> TermStrategy {
        self.strategy
    }

    #[inline]
    pub fn sentinel(&self) -> Days {
        self.sentinel
    }

    /// Checks every setting.
    ///
    /// # Errors
    ///
    /// [`CalendarError::InvalidSentinel`] if the sentinel span is not finite
    /// and strictly positive.
    pub fn validate(&self) -> Result<()> {
        self.sentinel_delta().map(|_| ())
    }

    /// The sentinel span as a [`TimeDelta`], validated.
    pub(crate) fn sentinel_delta(&self) -> Result<TimeDelta> {
        let days = self.sentinel.value();
        match delta_of(self.sentinel) {
            Some(delta) if days > 0.0 && delta > TimeDelta::zero() => Ok(delta),
            _ => Err(CalendarError::InvalidSentinel { days }),
        }
    }
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self::new()
    }
}

// Days travel as a bare number of days.
#[cfg(feature = "serde")]
mod days_as_f64 {
    use super::*;

    pub fn serialize<S>(days: &Days, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(days.value())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> std::result::Result<Days, D::Error>
    where
        D: Deserializer<'de>,
    {
        f64::deserialize(deserializer).map(Days::new)
    }
}
