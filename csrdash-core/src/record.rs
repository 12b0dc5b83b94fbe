//! Record model - the data contract shared by the loader, aggregator and renderer
//!
//! Global invariants enforced:
//! - Categorical text is never empty (empty cells become `None`)
//! - Numeric fields are finite or `None`
//! - `delay_days` is derived from the release dates whenever the source omits it

use chrono::{NaiveDate, NaiveDateTime};

/// Timestamp format used for display and for the embedded dashboard payload
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Day format used for date filter bounds
pub const DAY_FORMAT: &str = "%Y-%m-%d";

const SECONDS_PER_DAY: i64 = 86_400;

/// One issue-tracker record (one row of the export)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    pub key: String,
    pub summary: String,
    pub status: Option<String>,
    pub priority: Option<String>,
    pub issue_type: Option<String>,
    pub assignee: Option<String>,
    pub developer: Option<String>,
    pub created_at: Option<NaiveDateTime>,
    pub updated_at: Option<NaiveDateTime>,
    pub ready_at: Option<NaiveDateTime>,
    pub planned_release_at: Option<NaiveDateTime>,
    pub actual_release_at: Option<NaiveDateTime>,
    pub delay_days: Option<f64>,
    pub dev_duration_flag: Option<f64>,
    pub dev_to_release_flag: Option<f64>,
}

impl Record {
    /// Fill `delay_days` from the release dates when the source left it empty.
    ///
    /// Returns true if a value was derived.
    pub fn derive_delay(&mut self) -> bool {
        if self.delay_days.is_some() {
            return false;
        }
        match (self.planned_release_at, self.actual_release_at) {
            (Some(planned), Some(actual)) => {
                self.delay_days = Some(days_between(planned, actual));
                true
            }
            _ => false,
        }
    }

    /// Release day, used by the date-range filter
    pub fn release_day(&self) -> Option<NaiveDate> {
        self.actual_release_at.map(|ts| ts.date())
    }

    pub fn category(&self, category: Category) -> Option<&str> {
        let value = match category {
            Category::Status => &self.status,
            Category::Priority => &self.priority,
            Category::Type => &self.issue_type,
            Category::Assignee => &self.assignee,
            Category::Developer => &self.developer,
        };
        value.as_deref()
    }

    pub fn metric(&self, metric: Metric) -> Option<f64> {
        let value = match metric {
            Metric::Delay => self.delay_days,
            Metric::DevDuration => self.dev_duration_flag,
            Metric::DevToRelease => self.dev_to_release_flag,
        };
        value.filter(|v| v.is_finite())
    }

    pub fn stamp(&self, stamp: Stamp) -> Option<NaiveDateTime> {
        match stamp {
            Stamp::Created => self.created_at,
            Stamp::Updated => self.updated_at,
            Stamp::Ready => self.ready_at,
            Stamp::PlannedRelease => self.planned_release_at,
            Stamp::ActualRelease => self.actual_release_at,
        }
    }
}

/// Whole days from `from` to `to`, floored (negative when `to` is earlier)
pub fn days_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_seconds().div_euclid(SECONDS_PER_DAY) as f64
}

/// Normalize a categorical cell: trimmed, empty becomes `None`
pub fn clean_text(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Categorical fields that can be grouped and filtered on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Status,
    Priority,
    Type,
    Assignee,
    Developer,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Status,
        Category::Priority,
        Category::Type,
        Category::Assignee,
        Category::Developer,
    ];

    /// Field name in the embedded payload and the client-side filter
    pub fn field_name(self) -> &'static str {
        match self {
            Category::Status => "status",
            Category::Priority => "priority",
            Category::Type => "type",
            Category::Assignee => "assignee",
            Category::Developer => "developer",
        }
    }

    /// Human label used in the dashboard
    pub fn label(self) -> &'static str {
        match self {
            Category::Status => "Estado",
            Category::Priority => "Prioridad",
            Category::Type => "Tipo",
            Category::Assignee => "Persona asignada",
            Category::Developer => "Desarrollador",
        }
    }
}

/// Numeric fields ranked in the outlier tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    Delay,
    DevDuration,
    DevToRelease,
}

impl Metric {
    pub const ALL: [Metric; 3] = [Metric::Delay, Metric::DevDuration, Metric::DevToRelease];
}

/// Timestamp fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stamp {
    Created,
    Updated,
    Ready,
    PlannedRelease,
    ActualRelease,
}
