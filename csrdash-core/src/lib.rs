//! csrdash core library - CSR metrics and interactive HTML dashboards from Jira exports

#![deny(warnings)]

// Global invariants enforced in this crate:
// - The record set is immutable once loaded; filtering builds projections
// - Missing or malformed values are absent, never zero
// - No global mutable state
// - Grouped output is ordered explicitly, never by hash order
// - The Rust and embedded JavaScript aggregators share one set of policies
// - Identical input yields byte-for-byte identical output

pub mod aggregates;
pub mod config;
pub mod filter;
pub mod html;
pub mod load;
pub mod record;
pub mod trends;

pub use aggregates::{compute, MetricsSnapshot};
pub use config::ResolvedConfig;
pub use filter::{DashboardView, Filter};
pub use html::{render_dashboard, RenderOptions};
pub use load::{load_records, ColumnMap};
pub use record::Record;

use anyhow::Result;

/// Load the input table named by `config` and render its dashboard
///
/// Returns the page together with the records it was built from.
pub fn build_dashboard(
    config: &ResolvedConfig,
    generated_at: &str,
) -> Result<(String, Vec<Record>)> {
    let records = load_records(&config.input, &config.columns)?;
    let snapshot = compute(&records);
    log::debug!(
        "computed snapshot: {} records, {:.1}% late",
        snapshot.total,
        snapshot.pct_late
    );

    let options = RenderOptions {
        title: config.title.clone(),
        subtitle: config.subtitle.clone(),
        generated_at: generated_at.to_string(),
    };
    let html = render_dashboard(&records, &snapshot, &options)?;
    Ok((html, records))
}

/// Load records for a summary run
pub fn load_from_config(config: &ResolvedConfig) -> Result<Vec<Record>> {
    load_records(&config.input, &config.columns)
}
