//! Dashboard filtering - the predicate behind the filter controls
//!
//! Mirrors `matchesFilter` / `filterData` / `resetFilters` in the embedded dashboard
//! script so filtered views can be reproduced (and tested) without a browser.
//!
//! Global invariants enforced:
//! - Filtering is a projection; the record set is never mutated
//! - Every filter change recomputes the snapshot from scratch

use crate::aggregates::{compute, MetricsSnapshot};
use crate::record::{Category, Record};
use chrono::NaiveDate;

/// Filter control values
///
/// `None` on a categorical field matches every record. A record without a release date
/// fails the date test only when at least one bound is set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    pub status: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub assignee: Option<String>,
    pub developer: Option<String>,
    pub release_from: Option<NaiveDate>,
    pub release_to: Option<NaiveDate>,
}

impl Filter {
    /// Control defaults after a reset: no categorical selection, date bounds spanning the
    /// release dates of the whole record set
    pub fn full_range(records: &[Record]) -> Self {
        let (release_from, release_to) = release_range(records)
            .map(|(lo, hi)| (Some(lo), Some(hi)))
            .unwrap_or((None, None));
        Filter {
            release_from,
            release_to,
            ..Default::default()
        }
    }

    pub fn selection(&self, category: Category) -> Option<&str> {
        let value = match category {
            Category::Status => &self.status,
            Category::Priority => &self.priority,
            Category::Type => &self.issue_type,
            Category::Assignee => &self.assignee,
            Category::Developer => &self.developer,
        };
        value.as_deref().filter(|v| !v.is_empty())
    }

    pub fn select(&mut self, category: Category, value: Option<String>) {
        let slot = match category {
            Category::Status => &mut self.status,
            Category::Priority => &mut self.priority,
            Category::Type => &mut self.issue_type,
            Category::Assignee => &mut self.assignee,
            Category::Developer => &mut self.developer,
        };
        *slot = value;
    }

    pub fn has_date_bounds(&self) -> bool {
        self.release_from.is_some() || self.release_to.is_some()
    }

    pub fn matches(&self, record: &Record) -> bool {
        let categories_match = Category::ALL.iter().all(|c| match self.selection(*c) {
            Some(wanted) => record.category(*c) == Some(wanted),
            None => true,
        });
        categories_match && self.matches_release(record)
    }

    fn matches_release(&self, record: &Record) -> bool {
        if !self.has_date_bounds() {
            return true;
        }
        let Some(day) = record.release_day() else {
            return false;
        };
        self.release_from.map_or(true, |from| day >= from)
            && self.release_to.map_or(true, |to| day <= to)
    }

    /// Records passing the filter, in input order
    pub fn apply<'a>(&self, records: &'a [Record]) -> Vec<&'a Record> {
        records.iter().filter(|r| self.matches(r)).collect()
    }
}

/// Earliest and latest release day in the record set
pub fn release_range(records: &[Record]) -> Option<(NaiveDate, NaiveDate)> {
    let mut days = records.iter().filter_map(Record::release_day);
    let first = days.next()?;
    Some(days.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
}

/// One interactive dashboard session: the full record set plus the current filter
///
/// `filter` is `None` right after loading or a reset, when the unfiltered records are
/// shown while the controls display their defaults.
#[derive(Debug, Clone)]
pub struct DashboardView {
    records: Vec<Record>,
    filter: Option<Filter>,
}

impl DashboardView {
    pub fn new(records: Vec<Record>) -> Self {
        Self {
            records,
            filter: None,
        }
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Values the filter controls currently show
    pub fn controls(&self) -> Filter {
        match &self.filter {
            Some(filter) => filter.clone(),
            None => Filter::full_range(&self.records),
        }
    }

    /// Apply new control values (one filter-change event)
    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = Some(filter);
    }

    /// Change one categorical control, keeping the others as displayed
    pub fn select(&mut self, category: Category, value: Option<String>) {
        let mut filter = self.controls();
        filter.select(category, value);
        self.filter = Some(filter);
    }

    /// Clear every control and show the unfiltered records again
    pub fn reset(&mut self) {
        self.filter = None;
    }

    /// Records in the current view
    pub fn visible(&self) -> Vec<&Record> {
        match &self.filter {
            Some(filter) => filter.apply(&self.records),
            None => self.records.iter().collect(),
        }
    }

    /// Snapshot of the current view, recomputed from scratch
    pub fn snapshot(&self) -> MetricsSnapshot {
        compute(self.visible())
    }
}
