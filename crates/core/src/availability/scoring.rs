use chrono::{DateTime, Duration, Utc};

use crate::domain::query::{PreferenceWeights, TimeSlot};

/// Everything a scorer may look at for one candidate slot.
#[derive(Clone, Copy, Debug)]
pub struct SlotContext {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The free gap containing this candidate.
    pub gap_start: DateTime<Utc>,
    pub gap_end: DateTime<Utc>,
    /// The full search window of the query.
    pub window: TimeSlot,
}

/// Ranks a candidate slot. Implementations must be deterministic: identical
/// inputs produce identical scores, with no clock reads or randomness.
pub trait SlotScorer: Send + Sync {
    fn score(&self, slot: &SlotContext, weights: &PreferenceWeights) -> f64;
}

/// Default ranking: a weighted sum of three normalized factors.
///
/// - time-of-day: the fraction of the slot falling inside the preferred
///   block (morning 06-12, afternoon 12-17, evening 17-22 UTC)
/// - earliness: linear falloff from the window start
/// - buffer: the smaller of the lead and trail margin inside the
///   containing gap, saturating at one hour
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultSlotScorer;

const BUFFER_SATURATION_MINUTES: i64 = 60;

impl SlotScorer for DefaultSlotScorer {
    fn score(&self, slot: &SlotContext, weights: &PreferenceWeights) -> f64 {
        let mut score = 0.0;

        if let Some(preferred) = weights.time_of_day {
            let (block_start, block_end) = preferred.hours();
            score +=
                weights.time_of_day_weight * block_overlap_fraction(slot, block_start, block_end);
        }

        score += weights.earliness_weight * earliness_factor(slot);
        score += weights.buffer_weight * buffer_factor(slot);
        score
    }
}

/// Fraction of the slot that falls inside the `[block_start, block_end)`
/// hour range, on any day the slot touches.
fn block_overlap_fraction(slot: &SlotContext, block_start: u32, block_end: u32) -> f64 {
    let slot_seconds = (slot.end - slot.start).num_seconds();
    if slot_seconds <= 0 {
        return 0.0;
    }

    let mut overlap = Duration::zero();
    let mut day = slot.start.date_naive();
    let last_day = slot.end.date_naive();
    loop {
        let block_from = day
            .and_hms_opt(block_start, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(|| slot.start);
        let block_to = day
            .and_hms_opt(block_end, 0, 0)
            .map(|naive| naive.and_utc())
            .unwrap_or_else(|| slot.end);

        let from = slot.start.max(block_from);
        let to = slot.end.min(block_to);
        if to > from {
            overlap = overlap + (to - from);
        }

        if day >= last_day {
            break;
        }
        day = day.succ_opt().unwrap_or(last_day);
    }

    overlap.num_seconds() as f64 / slot_seconds as f64
}

fn earliness_factor(slot: &SlotContext) -> f64 {
    let window_seconds = slot.window.span().num_seconds();
    if window_seconds <= 0 {
        return 0.0;
    }
    let offset = (slot.start - slot.window.start).num_seconds();
    (1.0 - offset as f64 / window_seconds as f64).clamp(0.0, 1.0)
}

fn buffer_factor(slot: &SlotContext) -> f64 {
    let lead = (slot.start - slot.gap_start).num_minutes();
    let trail = (slot.gap_end - slot.end).num_minutes();
    let margin = lead.min(trail).clamp(0, BUFFER_SATURATION_MINUTES);
    margin as f64 / BUFFER_SATURATION_MINUTES as f64
}
