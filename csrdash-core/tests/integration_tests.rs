//! Integration tests for loading, filtering and rendering the fixture export

use chrono::NaiveDate;
use csrdash_core::config::DashboardConfig;
use csrdash_core::record::Category;
use csrdash_core::{build_dashboard, compute, load_records, ColumnMap, DashboardView, Filter};
use std::path::PathBuf;

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .unwrap()
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn day(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

fn fixture_records() -> Vec<csrdash_core::Record> {
    load_records(&fixture_path("csrs.csv"), &ColumnMap::default()).unwrap()
}

#[test]
fn test_fixture_loads_every_non_blank_row() {
    let records = fixture_records();
    assert_eq!(records.len(), 16);
    assert_eq!(records[0].key, "CSR-101");
    assert_eq!(records[15].key, "CSR-116");
}

#[test]
fn test_fixture_dirty_cells_are_absent() {
    let records = fixture_records();
    let timeout = records.iter().find(|r| r.key == "CSR-108").unwrap();
    assert_eq!(timeout.delay_days, None);
    assert_eq!(timeout.dev_duration_flag, None);
    assert_eq!(timeout.assignee, None);
    assert_eq!(timeout.actual_release_at, None);

    // Ragged final row: trailing cells missing
    let ragged = records.iter().find(|r| r.key == "CSR-116").unwrap();
    assert_eq!(ragged.delay_days, Some(2.0));
    assert_eq!(ragged.dev_duration_flag, None);
    assert_eq!(ragged.dev_to_release_flag, None);
}

#[test]
fn test_fixture_jira_dates_and_derived_delay() {
    let records = fixture_records();
    let report = records.iter().find(|r| r.key == "CSR-102").unwrap();
    assert_eq!(
        report.created_at,
        day("2024-01-09").and_hms_opt(14, 30, 0)
    );

    // Empty delay cell: derived from planned and actual release, floored
    let roles = records.iter().find(|r| r.key == "CSR-106").unwrap();
    assert_eq!(roles.delay_days, Some(8.0));
}

#[test]
fn test_filter_by_developer() {
    let records = fixture_records();
    let filter = Filter {
        developer: Some("Marta Ruiz".to_string()),
        ..Default::default()
    };
    let snapshot = compute(filter.apply(&records));
    assert_eq!(snapshot.total, 5);
    assert_eq!(snapshot.max_delay, 20.0);
    assert_eq!(snapshot.min_delay, 3.0);
    assert_eq!(snapshot.by_developer.len(), 1);
    assert_eq!(snapshot.delay_by_developer.len(), 1);
    assert!((snapshot.delay_by_developer[0].average - 10.2).abs() < 1e-9);
}

#[test]
fn test_filter_by_release_window() {
    let records = fixture_records();
    let filter = Filter {
        release_from: Some(day("2024-04-01")),
        release_to: Some(day("2024-04-30")),
        ..Default::default()
    };
    let keys: Vec<&str> = filter.apply(&records).iter().map(|r| r.key.as_str()).collect();
    assert_eq!(keys, vec!["CSR-107", "CSR-109", "CSR-110", "CSR-111", "CSR-112"]);
}

#[test]
fn test_view_select_and_reset() {
    let mut view = DashboardView::new(fixture_records());
    let unfiltered = view.snapshot();

    view.select(Category::Assignee, Some("Ops & Infra".to_string()));
    let ops = view.snapshot();
    assert_eq!(ops.total, 3);
    assert_eq!(ops.pct_late, 100.0);

    view.reset();
    assert_eq!(view.snapshot(), unfiltered);
}

#[test]
fn test_build_dashboard_writes_self_contained_page() {
    let config = DashboardConfig {
        input: Some(fixture_path("csrs.csv")),
        title: Some("Soporte Q1".to_string()),
        ..Default::default()
    }
    .resolve()
    .unwrap();

    let (html, records) = build_dashboard(&config, "2024-06-01 09:00").unwrap();
    assert_eq!(records.len(), 16);
    assert!(html.starts_with("<!DOCTYPE html>"));
    assert!(html.contains("<title>Soporte Q1</title>"));
    assert!(html.contains(r#"<div class="card-value" id="kpiTotal">16</div>"#));
    assert!(html.contains(r#"<div class="card-value" id="kpiPctLate">75.0%</div>"#));
    assert!(html.contains("Reporte &lt;mensual&gt; vacío"));
    assert!(!html.contains("Reporte <mensual>"));
    assert!(html.contains(r#"id="startDate" value="2024-02-15""#));
    assert!(html.contains(r#"id="endDate" value="2024-05-20""#));
}

#[test]
fn test_build_dashboard_missing_input_is_fatal() {
    let config = DashboardConfig {
        input: Some(fixture_path("does-not-exist.csv")),
        ..Default::default()
    }
    .resolve()
    .unwrap();

    let err = build_dashboard(&config, "now").unwrap_err();
    assert!(format!("{:#}", err).contains("failed to read input table"));
}
