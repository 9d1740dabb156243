use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::calendar::CalendarId;
use crate::errors::QueryError;

/// A plain half-open time range `[start, end)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSlot {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeSlot {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        if self.start >= self.end {
            return Err(QueryError::InvalidWindow { start: self.start, end: self.end });
        }
        Ok(())
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeOfDay {
    Morning,
    Afternoon,
    Evening,
}

impl TimeOfDay {
    /// Preferred block as UTC hours `[start, end)`.
    pub fn hours(self) -> (u32, u32) {
        match self {
            Self::Morning => (6, 12),
            Self::Afternoon => (12, 17),
            Self::Evening => (17, 22),
        }
    }
}

/// Weights for ranking candidate slots.
///
/// Each component contributes `weight * factor` with the factor normalized
/// to `0.0..=1.0`, so a weight of zero disables its component and raising a
/// weight never lowers a candidate's score.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreferenceWeights {
    /// Preferred block of the day, if any.
    pub time_of_day: Option<TimeOfDay>,
    pub time_of_day_weight: f64,
    /// Preference for slots closer to the start of the search window.
    pub earliness_weight: f64,
    /// Preference for slots with breathing room before and after.
    pub buffer_weight: f64,
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        Self {
            time_of_day: None,
            time_of_day_weight: 1.0,
            earliness_weight: 0.5,
            buffer_weight: 0.25,
        }
    }
}

impl PreferenceWeights {
    pub fn preferring(time_of_day: TimeOfDay) -> Self {
        Self { time_of_day: Some(time_of_day), ..Self::default() }
    }
}

/// A free-slot search over one or more calendars.
#[derive(Clone, Debug, PartialEq)]
pub struct AvailabilityQuery {
    pub window: TimeSlot,
    pub duration: Duration,
    pub calendars: Vec<CalendarId>,
    pub weights: PreferenceWeights,
}

impl AvailabilityQuery {
    pub fn new(window: TimeSlot, duration: Duration, calendars: Vec<CalendarId>) -> Self {
        Self { window, duration, calendars, weights: PreferenceWeights::default() }
    }

    pub fn with_weights(mut self, weights: PreferenceWeights) -> Self {
        self.weights = weights;
        self
    }

    pub fn validate(&self) -> Result<(), QueryError> {
        self.window.validate()?;
        if self.duration <= Duration::zero() {
            return Err(QueryError::ZeroDuration);
        }
        if self.calendars.is_empty() {
            return Err(QueryError::EmptyCalendarSet);
        }
        Ok(())
    }
}

/// One feasible slot of exactly the requested duration, ranked by score.
/// Generated fresh per query and never cached: the underlying calendar
/// state is externally mutable.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub score: f64,
}
