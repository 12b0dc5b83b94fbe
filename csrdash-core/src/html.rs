//! HTML dashboard generation
//!
//! Generates a single self-contained HTML dashboard with embedded CSS and JavaScript.
//! The page carries the full record set as an inline JSON payload plus a JavaScript
//! port of `aggregates::compute`, so filter changes recompute every widget in the
//! browser. The initial KPI cards and outlier tables are rendered here from the
//! Rust snapshot.
//!
//! Global invariants enforced:
//! - All record text is HTML-escaped, in markup and in the payload
//! - Absent numbers are `null` in the payload, never zero
//! - Identical input yields byte-for-byte identical output

use crate::aggregates::{MetricsSnapshot, OutlierRow};
use crate::filter::release_range;
use crate::record::{Category, Metric, Record, Stamp, DAY_FORMAT, TIMESTAMP_FORMAT};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeSet;

/// Charting library loaded by the page
const PLOTLY_URL: &str = "https://cdn.plot.ly/plotly-2.35.2.min.js";

/// Web font loaded by the page
const FONT_URL: &str =
    "https://fonts.googleapis.com/css2?family=Inter:wght@300;400;700;900&display=swap";

/// Page-level text and metadata
#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub title: String,
    pub subtitle: String,
    /// Shown in the "Last updated" card, e.g. `2024-05-01 09:30`
    pub generated_at: String,
}

/// One record as embedded in the page payload
#[derive(Debug, Serialize)]
struct PayloadRecord {
    key: String,
    summary: String,
    status: String,
    priority: String,
    #[serde(rename = "type")]
    issue_type: String,
    assignee: String,
    developer: String,
    created_at: String,
    updated_at: String,
    ready_at: String,
    planned_release_at: String,
    actual_release_at: String,
    delay_days: Option<f64>,
    dev_duration_flag: Option<f64>,
    dev_to_release_flag: Option<f64>,
}

impl PayloadRecord {
    fn from_record(record: &Record) -> Self {
        let text = |category: Category| record.category(category).map(html_escape).unwrap_or_default();
        let stamp = |stamp: Stamp| {
            record
                .stamp(stamp)
                .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
                .unwrap_or_default()
        };
        PayloadRecord {
            key: html_escape(&record.key),
            summary: html_escape(&record.summary),
            status: text(Category::Status),
            priority: text(Category::Priority),
            issue_type: text(Category::Type),
            assignee: text(Category::Assignee),
            developer: text(Category::Developer),
            created_at: stamp(Stamp::Created),
            updated_at: stamp(Stamp::Updated),
            ready_at: stamp(Stamp::Ready),
            planned_release_at: stamp(Stamp::PlannedRelease),
            actual_release_at: stamp(Stamp::ActualRelease),
            delay_days: record.metric(Metric::Delay),
            dev_duration_flag: record.metric(Metric::DevDuration),
            dev_to_release_flag: record.metric(Metric::DevToRelease),
        }
    }
}

/// Serialize records into the JSON array embedded in the dashboard.
///
/// The output is safe to place inside a `<script>` element.
pub fn payload_json(records: &[Record]) -> Result<String> {
    let payload: Vec<PayloadRecord> = records.iter().map(PayloadRecord::from_record).collect();
    let json = serde_json::to_string(&payload).context("failed to serialize dashboard payload")?;
    Ok(json.replace("</", "<\\/"))
}

/// Render the dashboard page
///
/// `snapshot` is the Rust-side snapshot of `records`; it fills the widgets that are
/// visible before the page script runs.
pub fn render_dashboard(
    records: &[Record],
    snapshot: &MetricsSnapshot,
    options: &RenderOptions,
) -> Result<String> {
    let payload = payload_json(records)?;

    Ok(format!(
        r#"<!DOCTYPE html>
<html lang="es">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title}</title>
    <script src="{plotly}"></script>
    <link href="{font}" rel="stylesheet">
    <style>{css}</style>
</head>
<body>
    {header}
    {cards}
    {filters}
    {distribution}
    {trends}
    {tables}
    {workload}
    {delays}
    {footer}
    <script>const originalData = {payload};</script>
    <script>{aggregator}</script>
    <script>{dashboard}</script>
</body>
</html>"#,
        title = html_escape(&options.title),
        plotly = PLOTLY_URL,
        font = FONT_URL,
        css = inline_css(),
        header = render_header(options),
        cards = render_cards(snapshot, &options.generated_at),
        filters = render_filters(records),
        distribution = render_distribution_section(),
        trends = render_trends_section(),
        tables = render_outlier_tables(snapshot),
        workload = render_workload_section(),
        delays = render_delay_section(),
        footer = render_footer(&options.generated_at),
        payload = payload,
        aggregator = aggregator_script(),
        dashboard = dashboard_script(),
    ))
}

/// Client-side aggregator and filter predicate
///
/// DOM-free: it only defines functions, so it can run outside a browser. Every function
/// here has a counterpart in `aggregates`, `trends` or `filter` and must produce the
/// same numbers.
pub fn aggregator_script() -> &'static str {
    r##"
const TOP_N = 10;
const DAY_MS = 86400000;
const CATEGORY_FIELDS = ['status', 'priority', 'type', 'assignee', 'developer'];

function isNumber(value) {
    return typeof value === 'number' && isFinite(value);
}

function finiteValues(records, field) {
    const values = [];
    for (const record of records) {
        if (isNumber(record[field])) values.push(record[field]);
    }
    return values;
}

function mean(values) {
    if (values.length === 0) return 0;
    let sum = 0;
    for (const value of values) sum += value;
    return sum / values.length;
}

function countPositive(values) {
    return values.filter(v => v > 0).length;
}

// Code point order of the unescaped text, matching how labels sort before escaping
function compareText(a, b) {
    const x = Array.from(unescapeHtml(a));
    const y = Array.from(unescapeHtml(b));
    const shared = Math.min(x.length, y.length);
    for (let i = 0; i < shared; i++) {
        const diff = x[i].codePointAt(0) - y[i].codePointAt(0);
        if (diff !== 0) return diff;
    }
    return x.length - y.length;
}

function byLabel(a, b) {
    return compareText(a[0], b[0]);
}

// [value, count] pairs ordered by value
function tally(records, field) {
    const counts = new Map();
    for (const record of records) {
        const value = record[field];
        if (value) counts.set(value, (counts.get(value) || 0) + 1);
    }
    return Array.from(counts.entries()).sort(byLabel);
}

// [name, average delay] pairs, highest first; ties keep first appearance
function averageDelayBy(records, field) {
    const groups = new Map();
    for (const record of records) {
        const name = record[field];
        const delay = record.delay_days;
        if (!name || !isNumber(delay)) continue;
        let group = groups.get(name);
        if (!group) {
            group = { sum: 0, count: 0 };
            groups.set(name, group);
        }
        group.sum += delay;
        group.count += 1;
    }
    const averages = Array.from(groups.entries(), ([name, group]) => [name, group.sum / group.count]);
    averages.sort((a, b) => b[1] - a[1]);
    return averages;
}

// Date.UTC maps years 0-99 to 1900-1999; setUTCFullYear does not
function utcDay(year, month, day) {
    const date = new Date(0);
    date.setUTCFullYear(year, month, day);
    return date.getTime() / DAY_MS;
}

// Days since 1970-01-01 for a "YYYY-MM-DD..." string, null when empty
function dayNumber(stamp) {
    const match = /^(\d{4})-(\d{2})-(\d{2})/.exec(stamp || '');
    if (!match) return null;
    return utcDay(Number(match[1]), Number(match[2]) - 1, Number(match[3]));
}

function formatDay(day) {
    return new Date(day * DAY_MS).toISOString().slice(0, 10);
}

// ISO-8601 week label, e.g. 2024-W09
function weekLabel(day) {
    const weekday = (new Date(day * DAY_MS).getUTCDay() + 6) % 7;
    const thursday = day - weekday + 3;
    const year = new Date(thursday * DAY_MS).getUTCFullYear();
    const week = Math.floor((thursday - utcDay(year, 0, 1)) / 7) + 1;
    return String(year).padStart(4, '0') + '-W' + String(week).padStart(2, '0');
}

function weeklyCounts(records, field) {
    const counts = new Map();
    for (const record of records) {
        const day = dayNumber(record[field]);
        if (day === null) continue;
        const label = weekLabel(day);
        counts.set(label, (counts.get(label) || 0) + 1);
    }
    return Array.from(counts.entries()).sort(byLabel);
}

function topOutliers(records, field) {
    const ranked = records.filter(record => isNumber(record[field]));
    ranked.sort((a, b) => b[field] - a[field]);
    return ranked.slice(0, TOP_N).map(record => ({
        summary: record.summary,
        key: record.key,
        value: record[field],
        assignee: record.assignee,
        developer: record.developer,
    }));
}

function calculateMetrics(records) {
    const total = records.length;
    const delays = finiteValues(records, 'delay_days');
    const dev30 = finiteValues(records, 'dev_duration_flag');
    const dev60 = finiteValues(records, 'dev_to_release_flag');
    // Shortest delay only considers releases that were actually late
    const lateDelays = delays.filter(d => d > 0);

    return {
        total: total,
        avg_delay: mean(delays),
        pct_late: total > 0 ? (100 * countPositive(delays)) / total : 0,
        avg_dev_gt30: mean(dev30),
        num_dev_gt30: countPositive(dev30),
        avg_devlib_gt60: mean(dev60),
        num_devlib_gt60: countPositive(dev60),
        max_delay: delays.length > 0 ? delays.reduce((a, b) => Math.max(a, b)) : 0,
        min_delay: lateDelays.length > 0 ? lateDelays.reduce((a, b) => Math.min(a, b)) : 0,
        by_status: tally(records, 'status'),
        by_priority: tally(records, 'priority'),
        by_type: tally(records, 'type'),
        by_assignee: tally(records, 'assignee'),
        by_developer: tally(records, 'developer'),
        delay_by_assignee: averageDelayBy(records, 'assignee'),
        delay_by_developer: averageDelayBy(records, 'developer'),
        created_trend: weeklyCounts(records, 'created_at'),
        resolved_trend: weeklyCounts(records, 'actual_release_at'),
        top_late: topOutliers(records, 'delay_days'),
        top_dev_gt30: topOutliers(records, 'dev_duration_flag'),
        top_devlib_gt60: topOutliers(records, 'dev_to_release_flag'),
    };
}

// filter: { status, priority, type, assignee, developer, release_from, release_to }
// Empty selections match everything; release bounds are day numbers or null.
function matchesFilter(record, filter) {
    for (const field of CATEGORY_FIELDS) {
        if (filter[field] && record[field] !== filter[field]) return false;
    }
    const from = filter.release_from;
    const to = filter.release_to;
    if (from == null && to == null) return true;
    const day = dayNumber(record.actual_release_at);
    if (day === null) return false;
    if (from != null && day < from) return false;
    if (to != null && day > to) return false;
    return true;
}

function applyFilter(records, filter) {
    return records.filter(record => matchesFilter(record, filter));
}

function releaseRange(records) {
    let lo = null;
    let hi = null;
    for (const record of records) {
        const day = dayNumber(record.actual_release_at);
        if (day === null) continue;
        if (lo === null || day < lo) lo = day;
        if (hi === null || day > hi) hi = day;
    }
    return lo === null ? null : [lo, hi];
}

function escapeHtml(text) {
    return String(text)
        .replace(/&/g, '&amp;')
        .replace(/</g, '&lt;')
        .replace(/>/g, '&gt;')
        .replace(/"/g, '&quot;')
        .replace(/'/g, '&#39;');
}

function unescapeHtml(text) {
    return String(text)
        .replace(/&lt;/g, '<')
        .replace(/&gt;/g, '>')
        .replace(/&quot;/g, '"')
        .replace(/&#39;/g, "'")
        .replace(/&amp;/g, '&');
}
"##
}

/// Page glue: reads the filter controls and redraws every widget
fn dashboard_script() -> &'static str {
    r##"
const FILTER_CONTROLS = [
    ['status', 'filterStatus'],
    ['priority', 'filterPriority'],
    ['type', 'filterType'],
    ['assignee', 'filterAssignee'],
    ['developer', 'filterDeveloper'],
];
const PALETTE = ['#6a82fb', '#fc5c7d', '#4caf50', '#ffc107', '#2196f3', '#ff5722'];
let currentData = originalData;

function setText(id, text) {
    const el = document.getElementById(id);
    if (el) el.textContent = text;
}

function controlValue(id) {
    const el = document.getElementById(id);
    return el ? el.value : '';
}

function pieChart(id, title, pairs) {
    Plotly.react(id, [{
        labels: pairs.map(p => p[0]),
        values: pairs.map(p => p[1]),
        type: 'pie',
        hole: 0.5,
        textinfo: 'label+percent',
        marker: { colors: PALETTE },
    }], { title: title, height: 350 });
}

function barChart(id, title, pairs, color) {
    Plotly.react(id, [{
        x: pairs.map(p => p[0]),
        y: pairs.map(p => p[1]),
        type: 'bar',
        marker: { color: color },
    }], { title: title, height: 350 });
}

function renderTable(tableId, rows) {
    const body = document.querySelector('#' + tableId + ' tbody');
    if (!body) return;
    // Payload text is already escaped
    body.innerHTML = rows.map(row =>
        '<tr><td>' + row.summary + '</td><td>' + row.key + '</td><td>' + row.value.toFixed(1) +
        '</td><td>' + (row.assignee || '') + '</td><td>' + (row.developer || '') + '</td></tr>'
    ).join('');
}

function updateDashboard(metrics) {
    setText('kpiTotal', metrics.total);
    setText('kpiAvgDelay', metrics.avg_delay.toFixed(1));
    setText('kpiPctLate', metrics.pct_late.toFixed(1) + '%');
    setText('kpiNumDevGT30', metrics.num_dev_gt30);
    setText('kpiNumDevLibGT60', metrics.num_devlib_gt60);
    setText('kpiMaxDelay', metrics.max_delay.toFixed(1));
    setText('kpiMinDelay', metrics.min_delay.toFixed(1));

    if (window.Plotly) {
        pieChart('statusPie', 'Estado', metrics.by_status);
        pieChart('priorityPie', 'Prioridad', metrics.by_priority);
        pieChart('typePie', 'Tipo', metrics.by_type);

        Plotly.react('trendChart', [
            {
                x: metrics.created_trend.map(p => p[0]),
                y: metrics.created_trend.map(p => p[1]),
                name: 'Created',
                type: 'scatter',
                mode: 'lines+markers',
                line: { color: '#6a82fb' },
            },
            {
                x: metrics.resolved_trend.map(p => p[0]),
                y: metrics.resolved_trend.map(p => p[1]),
                name: 'Released',
                type: 'scatter',
                mode: 'lines+markers',
                line: { color: '#4caf50' },
            },
        ], {
            title: 'CSRs Created & Released by Week',
            xaxis: { title: 'Week' },
            yaxis: { title: 'Number of CSRs' },
            height: 400,
        });

        barChart('assigneeBar', 'CSRs by Persona Asignada', metrics.by_assignee, '#6a82fb');
        barChart('developerBar', 'CSRs by Desarrollador', metrics.by_developer, '#fc5c7d');

        const rounded = pairs => pairs.map(p => [p[0], Number(p[1].toFixed(1))]);
        barChart('assigneeDelay', 'Avg Delay by Persona Asignada (Days)', rounded(metrics.delay_by_assignee), '#6a82fb');
        barChart('developerDelay', 'Avg Delay by Desarrollador (Days)', rounded(metrics.delay_by_developer), '#fc5c7d');
    }

    renderTable('tableLate', metrics.top_late);
    renderTable('tableDevGT30', metrics.top_dev_gt30);
    renderTable('tableDevLibGT60', metrics.top_devlib_gt60);
}

function readFilter() {
    const filter = {
        release_from: dayNumber(controlValue('startDate')),
        release_to: dayNumber(controlValue('endDate')),
    };
    // Option values arrive unescaped; payload text is escaped
    for (const [field, id] of FILTER_CONTROLS) {
        filter[field] = escapeHtml(controlValue(id));
    }
    return filter;
}

function filterData() {
    currentData = applyFilter(originalData, readFilter());
    updateDashboard(calculateMetrics(currentData));
}

function resetFilters() {
    for (const [, id] of FILTER_CONTROLS) {
        const el = document.getElementById(id);
        if (el) el.value = '';
    }
    const range = releaseRange(originalData);
    document.getElementById('startDate').value = range ? formatDay(range[0]) : '';
    document.getElementById('endDate').value = range ? formatDay(range[1]) : '';

    currentData = originalData;
    updateDashboard(calculateMetrics(currentData));
}

document.addEventListener('DOMContentLoaded', resetFilters);
"##
}

/// Inline CSS styles
fn inline_css() -> &'static str {
    r#"
/* Reset & Base */
* {
    box-sizing: border-box;
}

body {
    font-family: 'Inter', system-ui, -apple-system, 'Segoe UI', sans-serif;
    background: #f5f6fa;
    color: #222222;
    margin: 0;
    padding: 0;
    line-height: 1.6;
}

/* Header */
.header {
    background: linear-gradient(90deg, #6a82fb 0%, #fc5c7d 100%);
    color: #ffffff;
    padding: 2rem 1rem 4rem 1rem;
    text-align: center;
    border-bottom-left-radius: 1rem;
    border-bottom-right-radius: 1rem;
    box-shadow: 0 4px 10px rgba(0, 0, 0, 0.1);
}

.header h1 {
    font-size: 2.8rem;
    margin: 0 0 0.5rem 0;
    font-weight: 900;
}

.header p {
    font-size: 1.1rem;
    opacity: 0.9;
    margin: 0;
}

/* KPI cards */
.cards-row {
    display: flex;
    flex-wrap: wrap;
    gap: 1.5rem;
    justify-content: center;
    margin: -3rem auto 2rem auto;
    max-width: 1200px;
    padding: 0 1rem;
}

.card {
    background: #ffffff;
    border-radius: 1rem;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.08);
    padding: 1.5rem 2rem;
    text-align: center;
    min-width: 160px;
    flex: 1 1 auto;
}

.card-label {
    font-size: 0.9rem;
    color: #888888;
    margin-bottom: 0.3rem;
    font-weight: 700;
    text-transform: uppercase;
}

.card-value {
    font-size: 2.5rem;
    font-weight: 900;
    color: #6a82fb;
}

.card-value.small {
    font-size: 1.2rem;
}

/* Section */
.section {
    margin: 2rem auto;
    max-width: 1200px;
    background: #ffffff;
    border-radius: 1rem;
    box-shadow: 0 4px 12px rgba(0, 0, 0, 0.08);
    padding: 2rem;
}

.section h2 {
    color: #333333;
    margin: 0 0 1.5rem 0;
    font-size: 1.8rem;
    border-bottom: 2px solid #eeeeee;
    padding-bottom: 0.5rem;
}

/* Table */
table {
    width: 100%;
    border-collapse: collapse;
    border-radius: 0.5rem;
    overflow: hidden;
}

th, td {
    border-bottom: 1px solid #eeeeee;
    padding: 0.8rem 1rem;
    font-size: 0.95rem;
    text-align: left;
}

th {
    color: #ffffff;
    background: #6a82fb;
    font-weight: 700;
    text-transform: uppercase;
    letter-spacing: 0.5px;
}

tbody tr:nth-child(even) {
    background: #f9f9fc;
}

tbody tr:hover td {
    background: #eef1f9;
}

/* Charts */
.charts-row {
    display: flex;
    flex-wrap: wrap;
    gap: 2rem;
    justify-content: center;
}

.chart-block {
    flex: 1 1 45%;
    min-width: 300px;
    padding: 1rem;
}

#trendChart {
    width: 100%;
    min-height: 400px;
}

/* Filters */
.filters-grid {
    display: grid;
    grid-template-columns: repeat(auto-fit, minmax(200px, 1fr));
    gap: 1rem;
    align-items: end;
}

.filter-group label {
    display: block;
    margin-bottom: 0.5rem;
    font-weight: 700;
    color: #555555;
}

.filter-group select,
.filter-group input[type="date"] {
    width: 100%;
    padding: 0.6rem;
    border: 1px solid #dddddd;
    border-radius: 0.5rem;
    background-color: #ffffff;
    font-size: 1rem;
}

.filters-grid button {
    background: #4caf50;
    color: #ffffff;
    padding: 0.8rem 1.5rem;
    border: none;
    border-radius: 0.5rem;
    cursor: pointer;
    font-size: 1rem;
    font-weight: 700;
}

.filters-grid button:hover {
    background: #45a049;
}

/* Footer */
footer {
    margin: 3rem auto 2rem auto;
    text-align: center;
    color: #888888;
    font-size: 0.875rem;
}

/* Mobile */
@media (max-width: 900px) {
    .cards-row {
        margin-top: 1rem;
        flex-direction: column;
        align-items: center;
    }

    .card {
        min-width: 80%;
    }

    .charts-row {
        flex-direction: column;
        align-items: center;
    }

    .chart-block {
        min-width: 95%;
    }

    .header h1 {
        font-size: 2rem;
    }

    .filters-grid {
        grid-template-columns: 1fr;
    }
}
"#
}

fn render_header(options: &RenderOptions) -> String {
    format!(
        r#"<div class="header">
    <h1>{title}</h1>
    <p>{subtitle}</p>
</div>"#,
        title = html_escape(&options.title),
        subtitle = html_escape(&options.subtitle),
    )
}

/// Render KPI cards from the initial snapshot
fn render_cards(snapshot: &MetricsSnapshot, generated_at: &str) -> String {
    let cards = [
        ("Total CSRs", "kpiTotal", snapshot.total.to_string()),
        (
            "Avg Delay (Days)",
            "kpiAvgDelay",
            format!("{:.1}", snapshot.avg_delay),
        ),
        (
            "% Released Late",
            "kpiPctLate",
            format!("{:.1}%", snapshot.pct_late),
        ),
        (
            "&gt;30d in Dev",
            "kpiNumDevGT30",
            snapshot.num_dev_gt30.to_string(),
        ),
        (
            "&gt;60d Dev&rarr;Release",
            "kpiNumDevLibGT60",
            snapshot.num_devlib_gt60.to_string(),
        ),
        (
            "Longest Delay (Days)",
            "kpiMaxDelay",
            format!("{:.1}", snapshot.max_delay),
        ),
        (
            "Shortest Delay (Days)",
            "kpiMinDelay",
            format!("{:.1}", snapshot.min_delay),
        ),
    ];

    let mut html = String::from(r#"<div class="cards-row">"#);
    for (label, id, value) in cards {
        html.push_str(&format!(
            r#"
    <div class="card"><div class="card-label">{label}</div><div class="card-value" id="{id}">{value}</div></div>"#,
        ));
    }
    html.push_str(&format!(
        r#"
    <div class="card"><div class="card-label">Last updated</div><div class="card-value small">{}</div></div>
</div>"#,
        html_escape(generated_at)
    ));
    html
}

/// Render the filter controls, with options drawn from the full record set
fn render_filters(records: &[Record]) -> String {
    let controls = [
        (Category::Status, "filterStatus"),
        (Category::Priority, "filterPriority"),
        (Category::Type, "filterType"),
        (Category::Assignee, "filterAssignee"),
        (Category::Developer, "filterDeveloper"),
    ];

    let mut groups = String::new();
    for (category, id) in controls {
        let values: BTreeSet<&str> = records.iter().filter_map(|r| r.category(category)).collect();
        let options: String = values
            .iter()
            .map(|v| {
                let escaped = html_escape(v);
                format!(r#"<option value="{escaped}">{escaped}</option>"#)
            })
            .collect();
        groups.push_str(&format!(
            r#"
        <div class="filter-group">
            <label for="{id}">{label}:</label>
            <select id="{id}" onchange="filterData()">
                <option value="">All</option>{options}
            </select>
        </div>"#,
            label = category.label(),
        ));
    }

    let (start, end) = release_range(records)
        .map(|(lo, hi)| {
            (
                lo.format(DAY_FORMAT).to_string(),
                hi.format(DAY_FORMAT).to_string(),
            )
        })
        .unwrap_or_default();

    format!(
        r#"<div class="section filters-section">
    <h2>Filter Data</h2>
    <div class="filters-grid">{groups}
        <div class="filter-group">
            <label for="startDate">Fecha Liberación (Start):</label>
            <input type="date" id="startDate" value="{start}" onchange="filterData()">
        </div>
        <div class="filter-group">
            <label for="endDate">Fecha Liberación (End):</label>
            <input type="date" id="endDate" value="{end}" onchange="filterData()">
        </div>
        <button onclick="resetFilters()">Reset Filters</button>
    </div>
</div>"#,
    )
}

fn render_distribution_section() -> String {
    r#"<div class="section">
    <h2>Status, Priority &amp; Type Distribution</h2>
    <div class="charts-row">
        <div class="chart-block"><div id="statusPie"></div></div>
        <div class="chart-block"><div id="priorityPie"></div></div>
        <div class="chart-block"><div id="typePie"></div></div>
    </div>
</div>"#
        .to_string()
}

fn render_trends_section() -> String {
    r#"<div class="section">
    <h2>Trends: CSRs Created &amp; Released by Week</h2>
    <div id="trendChart"></div>
</div>"#
        .to_string()
}

fn render_workload_section() -> String {
    r#"<div class="section">
    <h2>Workload by Assignee / Developer</h2>
    <div class="charts-row">
        <div class="chart-block"><div id="assigneeBar"></div></div>
        <div class="chart-block"><div id="developerBar"></div></div>
    </div>
</div>"#
        .to_string()
}

fn render_delay_section() -> String {
    r#"<div class="section">
    <h2>Average Delay by Person / Developer</h2>
    <div class="charts-row">
        <div class="chart-block"><div id="assigneeDelay"></div></div>
        <div class="chart-block"><div id="developerDelay"></div></div>
    </div>
</div>"#
        .to_string()
}

/// Render the three top-10 tables
fn render_outlier_tables(snapshot: &MetricsSnapshot) -> String {
    let tables = [
        (
            Metric::Delay,
            "tableLate",
            "Top 10 Most Delayed Releases",
            "Días retraso",
        ),
        (
            Metric::DevDuration,
            "tableDevGT30",
            "Top 10 Longest Development (&gt;30d)",
            "Días en dev",
        ),
        (
            Metric::DevToRelease,
            "tableDevLibGT60",
            "Top 10 Longest Dev to Release (&gt;60d)",
            "Días dev&rarr;liberada",
        ),
    ];

    tables
        .iter()
        .map(|(metric, id, heading, value_header)| {
            format!(
                r#"<div class="section">
    <h2>{heading}</h2>
    <table id="{id}">
        <thead><tr><th>Resumen</th><th>Clave</th><th>{value_header}</th><th>Persona asignada</th><th>Desarrollador</th></tr></thead>
        <tbody>{rows}</tbody>
    </table>
</div>"#,
                rows = render_outlier_rows(snapshot.outliers(*metric)),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn render_outlier_rows(rows: &[OutlierRow]) -> String {
    rows.iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{:.1}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&row.summary),
                html_escape(&row.key),
                row.value,
                html_escape(row.assignee.as_deref().unwrap_or("")),
                html_escape(row.developer.as_deref().unwrap_or("")),
            )
        })
        .collect()
}

fn render_footer(generated_at: &str) -> String {
    format!(
        r#"<footer>
    <p>Generated by csrdash &middot; {}</p>
</footer>"#,
        html_escape(generated_at)
    )
}

/// Escape HTML special characters
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
