//! Availability Engine - free/busy computation over calendar intervals
//!
//! Purely computational: consumes busy intervals already fetched by the
//! dispatcher, produces conflict verdicts and ranked candidate slots, and
//! discards all working state on return. No I/O, no locks, no caching.

mod merge;
mod scoring;

pub use scoring::{DefaultSlotScorer, SlotContext, SlotScorer};

use chrono::Duration;

use crate::domain::calendar::BusyInterval;
use crate::domain::query::{AvailabilityQuery, Candidate, TimeSlot};
use crate::errors::QueryError;

use merge::{free_gaps, merge_busy};

const DEFAULT_GRANULARITY_MINUTES: i64 = 15;

/// Computes free windows and conflicts across one or more calendars.
#[derive(Clone, Debug)]
pub struct AvailabilityEngine<S = DefaultSlotScorer> {
    granularity: Duration,
    scorer: S,
}

impl Default for AvailabilityEngine<DefaultSlotScorer> {
    fn default() -> Self {
        Self::new()
    }
}

impl AvailabilityEngine<DefaultSlotScorer> {
    pub fn new() -> Self {
        Self::with_granularity(Duration::minutes(DEFAULT_GRANULARITY_MINUTES))
    }

    /// Candidate start times step by `granularity` inside each gap.
    /// Values below one minute are clamped to one minute.
    pub fn with_granularity(granularity: Duration) -> Self {
        Self { granularity: granularity.max(Duration::minutes(1)), scorer: DefaultSlotScorer }
    }
}

impl<S> AvailabilityEngine<S>
where
    S: SlotScorer,
{
    pub fn with_scorer(granularity: Duration, scorer: S) -> Self {
        Self { granularity: granularity.max(Duration::minutes(1)), scorer }
    }

    /// Every busy interval overlapping the proposed slot, sorted by start.
    ///
    /// An empty result means the proposal is conflict-free. Insensitive to
    /// the input ordering of `busy`.
    pub fn detect_conflicts(
        &self,
        proposed: &TimeSlot,
        busy: &[BusyInterval],
    ) -> Result<Vec<BusyInterval>, QueryError> {
        proposed.validate()?;

        let mut conflicts: Vec<BusyInterval> = busy
            .iter()
            .filter(|interval| interval.overlaps(proposed.start, proposed.end))
            .cloned()
            .collect();
        conflicts.sort_by(|a, b| {
            (a.start, a.end, &a.calendar_id, &a.source_event_id)
                .cmp(&(b.start, b.end, &b.calendar_id, &b.source_event_id))
        });
        Ok(conflicts)
    }

    /// Ranked candidate slots of exactly `query.duration`, none overlapping
    /// any busy interval of the requested calendars.
    ///
    /// "No availability" is a valid outcome, not an error: when the
    /// duration exceeds every free gap the result is an empty list. Only a
    /// structurally invalid query fails.
    pub fn find_available(
        &self,
        query: &AvailabilityQuery,
        busy: &[BusyInterval],
    ) -> Result<Vec<Candidate>, QueryError> {
        query.validate()?;

        let merged = merge_busy(busy, &query.calendars);
        let gaps = free_gaps(&query.window, &merged);

        let mut candidates = Vec::new();
        for gap in &gaps {
            let mut start = gap.start;
            while start + query.duration <= gap.end {
                let end = start + query.duration;
                let slot = SlotContext {
                    start,
                    end,
                    gap_start: gap.start,
                    gap_end: gap.end,
                    window: query.window,
                };
                let score = self.scorer.score(&slot, &query.weights);
                candidates.push(Candidate { start, end, score });
                start += self.granularity;
            }
        }

        candidates
            .sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.start.cmp(&b.start)));
        Ok(candidates)
    }
}
