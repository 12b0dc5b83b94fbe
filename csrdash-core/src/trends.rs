//! Weekly trends - bucket timestamps into ISO weeks
//!
//! Global invariants enforced:
//! - Week labels use the ISO-8601 week-numbering year (`2025-W01` may start in December)
//! - Labels are zero-padded so lexical order equals chronological order
//! - Records without the timestamp are skipped, never bucketed

use crate::record::{Record, Stamp};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

/// ISO week label for a day, e.g. `2024-W09`
pub fn week_label(day: NaiveDate) -> String {
    let week = day.iso_week();
    format!("{:04}-W{:02}", week.year(), week.week())
}

/// Count records per ISO week of the given timestamp, ordered by label
pub fn weekly_counts<'a, I>(records: I, stamp: Stamp) -> BTreeMap<String, usize>
where
    I: IntoIterator<Item = &'a Record>,
{
    let mut counts = BTreeMap::new();
    for record in records {
        if let Some(ts) = record.stamp(stamp) {
            *counts.entry(week_label(ts.date())).or_insert(0) += 1;
        }
    }
    counts
}
