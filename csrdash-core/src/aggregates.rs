//! Aggregation - derive the dashboard metrics snapshot from a record set
//!
//! The embedded dashboard script re-implements this pass (see `html::aggregator_script`);
//! both must produce the same numbers for the same records.
//!
//! Global invariants enforced:
//! - Snapshots are strictly derived (recomputed from scratch, never updated in place)
//! - Missing or non-finite values are skipped, never coerced to zero
//! - Sums accumulate in input order; ties keep input order
//! - Empty input yields zeros and empty collections

use crate::record::{Category, Metric, Record, Stamp};
use crate::trends::weekly_counts;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of rows kept in each outlier table
pub const TOP_N: usize = 10;

/// Average delay for one assignee or developer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct GroupAverage {
    pub name: String,
    pub average: f64,
}

/// Projection of a record shown in an outlier table
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct OutlierRow {
    pub summary: String,
    pub key: String,
    pub value: f64,
    pub assignee: Option<String>,
    pub developer: Option<String>,
}

/// All metrics shown on the dashboard for one record subset
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub struct MetricsSnapshot {
    pub total: usize,
    pub avg_delay: f64,
    pub pct_late: f64,
    pub avg_dev_gt30: f64,
    pub num_dev_gt30: usize,
    pub avg_devlib_gt60: f64,
    pub num_devlib_gt60: usize,
    pub max_delay: f64,
    pub min_delay: f64,
    pub by_status: BTreeMap<String, usize>,
    pub by_priority: BTreeMap<String, usize>,
    pub by_type: BTreeMap<String, usize>,
    pub by_assignee: BTreeMap<String, usize>,
    pub by_developer: BTreeMap<String, usize>,
    pub delay_by_assignee: Vec<GroupAverage>,
    pub delay_by_developer: Vec<GroupAverage>,
    pub created_trend: BTreeMap<String, usize>,
    pub resolved_trend: BTreeMap<String, usize>,
    pub top_late: Vec<OutlierRow>,
    pub top_dev_gt30: Vec<OutlierRow>,
    pub top_devlib_gt60: Vec<OutlierRow>,
}

impl MetricsSnapshot {
    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("failed to serialize metrics snapshot to JSON")
    }

    /// Group counts for one categorical field
    pub fn counts(&self, category: Category) -> &BTreeMap<String, usize> {
        match category {
            Category::Status => &self.by_status,
            Category::Priority => &self.by_priority,
            Category::Type => &self.by_type,
            Category::Assignee => &self.by_assignee,
            Category::Developer => &self.by_developer,
        }
    }

    /// Outlier table for one numeric field
    pub fn outliers(&self, metric: Metric) -> &[OutlierRow] {
        match metric {
            Metric::Delay => &self.top_late,
            Metric::DevDuration => &self.top_dev_gt30,
            Metric::DevToRelease => &self.top_devlib_gt60,
        }
    }
}

/// Compute the metrics snapshot for a record set
///
/// Total function: dirty or missing values degrade to zero / empty results.
pub fn compute<'a, I>(records: I) -> MetricsSnapshot
where
    I: IntoIterator<Item = &'a Record>,
{
    let records: Vec<&Record> = records.into_iter().collect();
    let total = records.len();

    let delays = finite_values(&records, Metric::Delay);
    let dev30 = finite_values(&records, Metric::DevDuration);
    let dev60 = finite_values(&records, Metric::DevToRelease);

    let late = count_positive(&delays);
    let pct_late = if total > 0 {
        (100.0 * late as f64) / total as f64
    } else {
        0.0
    };

    MetricsSnapshot {
        total,
        avg_delay: mean(&delays),
        pct_late,
        avg_dev_gt30: mean(&dev30),
        num_dev_gt30: count_positive(&dev30),
        avg_devlib_gt60: mean(&dev60),
        num_devlib_gt60: count_positive(&dev60),
        max_delay: delays.iter().copied().reduce(f64::max).unwrap_or(0.0),
        // Shortest delay only considers releases that were actually late
        min_delay: delays
            .iter()
            .copied()
            .filter(|d| *d > 0.0)
            .reduce(f64::min)
            .unwrap_or(0.0),
        by_status: tally(&records, Category::Status),
        by_priority: tally(&records, Category::Priority),
        by_type: tally(&records, Category::Type),
        by_assignee: tally(&records, Category::Assignee),
        by_developer: tally(&records, Category::Developer),
        delay_by_assignee: average_delay_by(&records, Category::Assignee),
        delay_by_developer: average_delay_by(&records, Category::Developer),
        created_trend: weekly_counts(records.iter().copied(), Stamp::Created),
        resolved_trend: weekly_counts(records.iter().copied(), Stamp::ActualRelease),
        top_late: top_outliers(&records, Metric::Delay),
        top_dev_gt30: top_outliers(&records, Metric::DevDuration),
        top_devlib_gt60: top_outliers(&records, Metric::DevToRelease),
    }
}

fn finite_values(records: &[&Record], metric: Metric) -> Vec<f64> {
    records.iter().filter_map(|r| r.metric(metric)).collect()
}

fn count_positive(values: &[f64]) -> usize {
    values.iter().filter(|v| **v > 0.0).count()
}

/// Arithmetic mean, 0.0 for an empty slice
fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let sum = values.iter().fold(0.0, |acc, v| acc + v);
    sum / values.len() as f64
}

fn tally(records: &[&Record], category: Category) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for record in records {
        if let Some(value) = record.category(category) {
            *counts.entry(value.to_string()).or_insert(0) += 1;
        }
    }
    counts
}

/// Mean delay per distinct value, highest first
///
/// Groups without a single finite delay are left out. Equal averages keep the order in
/// which the groups first appear.
fn average_delay_by(records: &[&Record], category: Category) -> Vec<GroupAverage> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(&str, f64, usize)> = Vec::new();

    for record in records {
        let (Some(name), Some(delay)) = (record.category(category), record.metric(Metric::Delay))
        else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            groups.push((name, 0.0, 0));
            groups.len() - 1
        });
        groups[slot].1 += delay;
        groups[slot].2 += 1;
    }

    let mut averages: Vec<GroupAverage> = groups
        .into_iter()
        .map(|(name, sum, count)| GroupAverage {
            name: name.to_string(),
            average: sum / count as f64,
        })
        .collect();

    // Stable sort: ties stay in first-appearance order
    averages.sort_by(|a, b| {
        b.average
            .partial_cmp(&a.average)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    averages
}

/// Top `TOP_N` records by a numeric field, descending, records without a value excluded
fn top_outliers(records: &[&Record], metric: Metric) -> Vec<OutlierRow> {
    let mut ranked: Vec<(f64, &Record)> = records
        .iter()
        .filter_map(|r| r.metric(metric).map(|v| (v, *r)))
        .collect();

    ranked.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    ranked
        .into_iter()
        .take(TOP_N)
        .map(|(value, record)| OutlierRow {
            summary: record.summary.clone(),
            key: record.key.clone(),
            value,
            assignee: record.assignee.clone(),
            developer: record.developer.clone(),
        })
        .collect()
}
