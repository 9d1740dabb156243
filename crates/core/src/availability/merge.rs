use std::collections::BTreeSet;

use chrono::{DateTime, Utc};

use crate::domain::calendar::{BusyInterval, CalendarId};
use crate::domain::query::TimeSlot;

/// A coalesced busy span, detached from its source calendars.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Span {
    pub(crate) start: DateTime<Utc>,
    pub(crate) end: DateTime<Utc>,
}

/// Merge the busy intervals of the requested calendars into a minimal
/// sorted set: ascending by start, overlapping or back-to-back intervals
/// coalesced into one span.
pub(crate) fn merge_busy(busy: &[BusyInterval], calendars: &[CalendarId]) -> Vec<Span> {
    let requested: BTreeSet<&CalendarId> = calendars.iter().collect();

    let mut spans: Vec<Span> = busy
        .iter()
        .filter(|interval| requested.contains(&interval.calendar_id))
        .map(|interval| Span { start: interval.start, end: interval.end })
        .collect();
    spans.sort_by_key(|span| (span.start, span.end));

    let mut merged: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match merged.last_mut() {
            Some(current) if span.start <= current.end => {
                current.end = current.end.max(span.end);
            }
            _ => merged.push(span),
        }
    }
    merged
}

/// Complement of the merged busy set within the window: the maximal free
/// gaps, in ascending order. `merged` must be sorted and coalesced.
pub(crate) fn free_gaps(window: &TimeSlot, merged: &[Span]) -> Vec<Span> {
    let mut gaps = Vec::new();
    let mut cursor = window.start;

    for span in merged {
        if span.end <= window.start || span.start >= window.end {
            continue;
        }
        if span.start > cursor {
            gaps.push(Span { start: cursor, end: span.start.min(window.end) });
        }
        cursor = cursor.max(span.end);
        if cursor >= window.end {
            return gaps;
        }
    }

    if cursor < window.end {
        gaps.push(Span { start: cursor, end: window.end });
    }
    gaps
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{free_gaps, merge_busy, Span};
    use crate::domain::calendar::{BusyInterval, CalendarId};
    use crate::domain::query::TimeSlot;

    fn at(hour: u32, minute: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 2, hour, minute, 0).unwrap()
    }

    fn busy(calendar: &str, start_hour: u32, end_hour: u32) -> BusyInterval {
        BusyInterval::new(
            CalendarId::new(calendar),
            at(start_hour, 0),
            at(end_hour, 0),
            format!("{calendar}-{start_hour}"),
        )
        .unwrap()
    }

    fn personal() -> Vec<CalendarId> {
        vec![CalendarId::new("personal")]
    }

    #[test]
    fn overlapping_and_adjacent_intervals_coalesce() {
        let intervals = vec![busy("personal", 9, 11), busy("personal", 10, 12), busy("personal", 12, 13)];
        let merged = merge_busy(&intervals, &personal());
        assert_eq!(merged, vec![Span { start: at(9, 0), end: at(13, 0) }]);
    }

    #[test]
    fn disjoint_intervals_stay_separate_and_sorted() {
        let intervals = vec![busy("personal", 14, 15), busy("personal", 9, 10)];
        let merged = merge_busy(&intervals, &personal());
        assert_eq!(
            merged,
            vec![
                Span { start: at(9, 0), end: at(10, 0) },
                Span { start: at(14, 0), end: at(15, 0) },
            ]
        );
    }

    #[test]
    fn intervals_from_unrequested_calendars_are_ignored() {
        let intervals = vec![busy("personal", 9, 10), busy("family", 11, 12)];
        let merged = merge_busy(&intervals, &personal());
        assert_eq!(merged, vec![Span { start: at(9, 0), end: at(10, 0) }]);
    }

    #[test]
    fn merge_spans_multiple_calendars_together() {
        let intervals = vec![busy("personal", 9, 11), busy("family", 10, 12)];
        let calendars = vec![CalendarId::new("personal"), CalendarId::new("family")];
        let merged = merge_busy(&intervals, &calendars);
        assert_eq!(merged, vec![Span { start: at(9, 0), end: at(12, 0) }]);
    }

    #[test]
    fn gaps_are_the_window_complement() {
        let window = TimeSlot::new(at(9, 0), at(13, 0));
        let merged =
            vec![Span { start: at(9, 0), end: at(10, 0) }, Span { start: at(11, 0), end: at(12, 0) }];

        let gaps = free_gaps(&window, &merged);
        assert_eq!(
            gaps,
            vec![
                Span { start: at(10, 0), end: at(11, 0) },
                Span { start: at(12, 0), end: at(13, 0) },
            ]
        );
    }

    #[test]
    fn busy_outside_the_window_leaves_it_fully_free() {
        let window = TimeSlot::new(at(9, 0), at(12, 0));
        let merged =
            vec![Span { start: at(6, 0), end: at(8, 0) }, Span { start: at(13, 0), end: at(15, 0) }];

        let gaps = free_gaps(&window, &merged);
        assert_eq!(gaps, vec![Span { start: at(9, 0), end: at(12, 0) }]);
    }

    #[test]
    fn busy_covering_the_window_leaves_no_gap() {
        let window = TimeSlot::new(at(9, 0), at(12, 0));
        let merged = vec![Span { start: at(8, 0), end: at(13, 0) }];
        assert!(free_gaps(&window, &merged).is_empty());
    }

    #[test]
    fn busy_straddling_window_edges_is_clamped() {
        let window = TimeSlot::new(at(9, 0), at(17, 0));
        let merged =
            vec![Span { start: at(8, 0), end: at(10, 0) }, Span { start: at(16, 30), end: at(18, 0) }];

        let gaps = free_gaps(&window, &merged);
        assert_eq!(gaps, vec![Span { start: at(10, 0), end: at(16, 30) }]);
    }
}
