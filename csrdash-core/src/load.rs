//! Table loading - read a Jira CSR export (xlsx workbook or CSV) into records
//!
//! Reading is the only fatal step of the pipeline: a missing or unreadable file is an
//! error. Everything inside the table degrades instead:
//! - Missing columns leave their field empty on every record
//! - Unparseable timestamps and numbers become `None`
//! - Ragged rows are padded with empty cells
//! - Fully blank rows are skipped
//! - Rows hidden in the workbook are skipped

use crate::record::{clean_text, Record};
use anyhow::{Context, Result};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use std::io::Cursor;
use std::path::Path;

/// Datetime layouts accepted in timestamp columns, tried in order
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%b/%y %I:%M %p",
];

/// Date-only layouts, interpreted as midnight
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d/%b/%y"];

/// Years below this come from a two-digit year read by a four-digit layout
const MIN_YEAR: i32 = 1000;

/// Largest spreadsheet serial day number (9999-12-31)
const MAX_SERIAL_DAY: f64 = 2_958_465.0;

/// Input columns, one per record field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Key,
    Summary,
    Status,
    Priority,
    Type,
    Assignee,
    Developer,
    CreatedAt,
    UpdatedAt,
    ReadyAt,
    PlannedReleaseAt,
    ActualReleaseAt,
    DelayDays,
    DevDurationFlag,
    DevToReleaseFlag,
}

impl Column {
    pub const ALL: [Column; 15] = [
        Column::Key,
        Column::Summary,
        Column::Status,
        Column::Priority,
        Column::Type,
        Column::Assignee,
        Column::Developer,
        Column::CreatedAt,
        Column::UpdatedAt,
        Column::ReadyAt,
        Column::PlannedReleaseAt,
        Column::ActualReleaseAt,
        Column::DelayDays,
        Column::DevDurationFlag,
        Column::DevToReleaseFlag,
    ];

    /// Record field name (also the config file key)
    pub fn field_name(self) -> &'static str {
        match self {
            Column::Key => "key",
            Column::Summary => "summary",
            Column::Status => "status",
            Column::Priority => "priority",
            Column::Type => "type",
            Column::Assignee => "assignee",
            Column::Developer => "developer",
            Column::CreatedAt => "created_at",
            Column::UpdatedAt => "updated_at",
            Column::ReadyAt => "ready_at",
            Column::PlannedReleaseAt => "planned_release_at",
            Column::ActualReleaseAt => "actual_release_at",
            Column::DelayDays => "delay_days",
            Column::DevDurationFlag => "dev_duration_flag",
            Column::DevToReleaseFlag => "dev_to_release_flag",
        }
    }

    /// Header name in a Jira CSR export
    pub fn default_header(self) -> &'static str {
        match self {
            Column::Key => "Clave",
            Column::Summary => "Resumen",
            Column::Status => "Estado",
            Column::Priority => "Pr",
            Column::Type => "T",
            Column::Assignee => "Persona asignada",
            Column::Developer => "Desarrollador",
            Column::CreatedAt => "Creada",
            Column::UpdatedAt => "Actualizada",
            Column::ReadyAt => "Latest Transition to Listo",
            Column::PlannedReleaseAt => "Fecha Planificada de Liberación",
            Column::ActualReleaseAt => "Fecha Real de Liberación",
            Column::DelayDays => "Liberación retrasada por",
            Column::DevDurationFlag => "Estado Desarrollo > 30 días",
            Column::DevToReleaseFlag => "Desarrollo y liberada > 60 Días",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Header name for every column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMap {
    headers: Vec<String>,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            headers: Column::ALL
                .iter()
                .map(|c| c.default_header().to_string())
                .collect(),
        }
    }
}

impl ColumnMap {
    pub fn header(&self, column: Column) -> &str {
        &self.headers[column.index()]
    }

    pub fn set_header(&mut self, column: Column, header: impl Into<String>) {
        self.headers[column.index()] = header.into();
    }

    /// Pairs of columns mapped to the same header
    pub fn duplicates(&self) -> Vec<(Column, Column)> {
        let mut pairs = Vec::new();
        for (i, a) in Column::ALL.iter().enumerate() {
            for b in &Column::ALL[i + 1..] {
                if self.header(*a) == self.header(*b) {
                    pairs.push((*a, *b));
                }
            }
        }
        pairs
    }
}

/// Decoded input table, before any field parsing
struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    /// `,` is the decimal separator in numeric cells
    decimal_comma: bool,
    hidden_rows: usize,
}

/// Load records from an export file
///
/// `.xlsx`/`.xlsm` files are read as workbooks (first worksheet); anything else as CSV.
pub fn load_records(path: &Path, columns: &ColumnMap) -> Result<Vec<Record>> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("failed to read input table: {}", path.display()))?;
    let records = if is_workbook(path) {
        read_workbook_records(&bytes, columns)
    } else {
        read_records(&bytes, columns)
    };
    records.with_context(|| format!("failed to parse input table: {}", path.display()))
}

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("xlsx") || ext.eq_ignore_ascii_case("xlsm"))
}

/// Parse records from CSV bytes
///
/// The delimiter is sniffed from the header line (`,` or `;`); cells that are not valid
/// UTF-8 are decoded lossily. Semicolon-delimited files use `,` as decimal separator.
pub fn read_records(bytes: &[u8], columns: &ColumnMap) -> Result<Vec<Record>> {
    Ok(records_from_table(&csv_table(bytes)?, columns))
}

/// Parse records from xlsx workbook bytes, skipping hidden rows
pub fn read_workbook_records(bytes: &[u8], columns: &ColumnMap) -> Result<Vec<Record>> {
    Ok(records_from_table(&workbook_table(bytes)?, columns))
}

fn clean_header(raw: &str) -> String {
    raw.trim_matches(|c: char| c.is_whitespace() || c == '\u{feff}')
        .to_string()
}

fn csv_table(bytes: &[u8]) -> Result<Table> {
    let delimiter = detect_delimiter(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .byte_headers()
        .context("failed to read header row")?
        .iter()
        .map(|h| clean_header(&String::from_utf8_lossy(h)))
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    for (row_index, row) in reader.byte_records().enumerate() {
        // Header is line 1
        let row = row.with_context(|| format!("failed to read row {}", row_index + 2))?;
        rows.push(
            row.iter()
                .map(|cell| String::from_utf8_lossy(cell).into_owned())
                .collect(),
        );
    }

    Ok(Table {
        headers,
        rows,
        decimal_comma: delimiter == b';',
        hidden_rows: 0,
    })
}

fn workbook_table(bytes: &[u8]) -> Result<Table> {
    let book = umya_spreadsheet::reader::xlsx::read_reader(Cursor::new(bytes), true)
        .map_err(|e| anyhow::anyhow!("failed to open workbook: {:?}", e))?;
    let sheet = book
        .get_sheet_collection()
        .first()
        .context("workbook has no worksheets")?;

    // Coordinates are 1-based (column, row)
    let (last_column, last_row) = sheet.get_highest_column_and_row();
    let cells = |row: u32| -> Vec<String> {
        (1..=last_column)
            .map(|column| sheet.get_value((column, row)))
            .collect()
    };

    let headers = if last_row == 0 {
        Vec::new()
    } else {
        cells(1).iter().map(String::as_str).map(clean_header).collect()
    };

    let mut rows = Vec::new();
    let mut hidden_rows = 0usize;
    for row in 2..=last_row {
        let hidden = sheet
            .get_row_dimension(&row)
            .is_some_and(|dimension| *dimension.get_hidden());
        if hidden {
            hidden_rows += 1;
            continue;
        }
        rows.push(cells(row));
    }

    Ok(Table {
        headers,
        rows,
        decimal_comma: false,
        hidden_rows,
    })
}

fn records_from_table(table: &Table, columns: &ColumnMap) -> Vec<Record> {
    let positions: Vec<Option<usize>> = Column::ALL
        .iter()
        .map(|column| {
            let wanted = columns.header(*column);
            let found = table.headers.iter().position(|h| h == wanted);
            if found.is_none() {
                log::warn!(
                    "column '{}' not found in input; {} will be empty",
                    wanted,
                    column.field_name()
                );
            }
            found
        })
        .collect();

    let mut records = Vec::new();
    let mut rejected = vec![0usize; Column::ALL.len()];
    let mut blank_rows = 0usize;
    let mut derived = 0usize;

    for row in &table.rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            blank_rows += 1;
            continue;
        }

        let cell = |column: Column| {
            positions[column.index()]
                .and_then(|pos| row.get(pos))
                .map(String::as_str)
                .filter(|text| !text.trim().is_empty())
        };
        let text = |column: Column| cell(column).and_then(clean_text);
        let mut stamp = |column: Column| {
            let raw = cell(column)?;
            let parsed = parse_timestamp(raw);
            if parsed.is_none() {
                rejected[column.index()] += 1;
            }
            parsed
        };
        let created_at = stamp(Column::CreatedAt);
        let updated_at = stamp(Column::UpdatedAt);
        let ready_at = stamp(Column::ReadyAt);
        let planned_release_at = stamp(Column::PlannedReleaseAt);
        let actual_release_at = stamp(Column::ActualReleaseAt);

        let mut number = |column: Column| {
            let raw = cell(column)?;
            let parsed = parse_number(raw, table.decimal_comma);
            if parsed.is_none() {
                rejected[column.index()] += 1;
            }
            parsed
        };
        let delay_days = number(Column::DelayDays);
        let dev_duration_flag = number(Column::DevDurationFlag);
        let dev_to_release_flag = number(Column::DevToReleaseFlag);

        let mut record = Record {
            key: text(Column::Key).unwrap_or_default(),
            summary: text(Column::Summary).unwrap_or_default(),
            status: text(Column::Status),
            priority: text(Column::Priority),
            issue_type: text(Column::Type),
            assignee: text(Column::Assignee),
            developer: text(Column::Developer),
            created_at,
            updated_at,
            ready_at,
            planned_release_at,
            actual_release_at,
            delay_days,
            dev_duration_flag,
            dev_to_release_flag,
        };
        if record.derive_delay() {
            derived += 1;
        }
        records.push(record);
    }

    for column in Column::ALL {
        let count = rejected[column.index()];
        if count > 0 {
            log::warn!(
                "{} value(s) in column '{}' could not be parsed and were left empty",
                count,
                columns.header(column)
            );
        }
    }
    log::debug!(
        "loaded {} record(s); skipped {} blank and {} hidden row(s); derived {} delay(s)",
        records.len(),
        blank_rows,
        table.hidden_rows,
        derived
    );

    records
}

/// Pick `;` when the header line has more semicolons than commas
fn detect_delimiter(bytes: &[u8]) -> u8 {
    let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
    let commas = first_line.iter().filter(|b| **b == b',').count();
    let semicolons = first_line.iter().filter(|b| **b == b';').count();
    if semicolons > commas {
        b';'
    } else {
        b','
    }
}

/// Parse a timestamp cell; `None` when no known layout matches
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    for format in DATETIME_FORMATS {
        match NaiveDateTime::parse_from_str(raw, format) {
            Ok(ts) if ts.year() >= MIN_YEAR => return Some(ts),
            _ => {}
        }
    }
    for format in DATE_FORMATS {
        match NaiveDate::parse_from_str(raw, format) {
            Ok(day) if day.year() >= MIN_YEAR => return day.and_hms_opt(0, 0, 0),
            _ => {}
        }
    }
    parse_serial_day(raw)
}

/// Spreadsheet serial day number (days since 1899-12-30, fraction = time of day)
fn parse_serial_day(raw: &str) -> Option<NaiveDateTime> {
    let serial: f64 = raw.parse().ok()?;
    if !(1.0..=MAX_SERIAL_DAY).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (serial * 86_400.0).round() as i64;
    epoch.checked_add_signed(Duration::seconds(seconds))
}

/// Parse a numeric cell; non-finite values count as missing
///
/// With `decimal_comma`, `,` is the decimal separator and `.` groups thousands
/// (`1.234,5`).
pub fn parse_number(raw: &str, decimal_comma: bool) -> Option<f64> {
    let raw = raw.trim();
    let parsed = if decimal_comma && raw.contains(',') {
        raw.replace('.', "").replace(',', ".").parse::<f64>()
    } else {
        raw.parse::<f64>()
    };
    parsed.ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn test_parse_timestamp_layouts() {
        assert_eq!(
            parse_timestamp("2024-03-05 14:30:00"),
            Some(ts("2024-03-05 14:30:00"))
        );
        assert_eq!(
            parse_timestamp("2024-03-05T14:30:00"),
            Some(ts("2024-03-05 14:30:00"))
        );
        assert_eq!(parse_timestamp("2024-03-05"), Some(ts("2024-03-05 00:00:00")));
        assert_eq!(parse_timestamp("05/03/2024"), Some(ts("2024-03-05 00:00:00")));
        assert_eq!(
            parse_timestamp("05/Mar/24 2:30 PM"),
            Some(ts("2024-03-05 14:30:00"))
        );
    }

    #[test]
    fn test_parse_timestamp_serial_day() {
        assert_eq!(parse_timestamp("45356"), Some(ts("2024-03-05 00:00:00")));
        assert_eq!(parse_timestamp("45356.5"), Some(ts("2024-03-05 12:00:00")));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        assert_eq!(parse_timestamp("not a date"), None);
        assert_eq!(parse_timestamp("   "), None);
        assert_eq!(parse_timestamp("-5"), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_two_digit_years() {
        // `%Y` alone would read these as year 24
        assert_eq!(parse_timestamp("05/03/24"), None);
        assert_eq!(parse_timestamp("05/03/24 10:00"), None);
        assert_eq!(parse_timestamp("24-03-05"), None);
        assert_eq!(
            parse_timestamp("05/Mar/24 10:00 AM"),
            Some(ts("2024-03-05 10:00:00"))
        );
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number(" 12.5 ", false), Some(12.5));
        assert_eq!(parse_number("-3", false), Some(-3.0));
        assert_eq!(parse_number("inf", false), None);
        assert_eq!(parse_number("NaN", false), None);
        assert_eq!(parse_number("n/a", false), None);
        assert_eq!(parse_number("2,5", false), None);
    }

    #[test]
    fn test_parse_number_decimal_comma() {
        assert_eq!(parse_number("2,5", true), Some(2.5));
        assert_eq!(parse_number("-0,25", true), Some(-0.25));
        assert_eq!(parse_number("1.234,5", true), Some(1234.5));
        assert_eq!(parse_number("12.5", true), Some(12.5));
        assert_eq!(parse_number("1,2,3", true), None);
    }

    #[test]
    fn test_detect_delimiter() {
        assert_eq!(detect_delimiter(b"Clave;Resumen;Estado\nA;B;C"), b';');
        assert_eq!(detect_delimiter(b"Clave,Resumen,Estado\nA;B;C"), b',');
    }

    #[test]
    fn test_read_records_maps_columns_and_derives_delay() {
        let csv = "Clave,Resumen,Estado,Fecha Planificada de Liberación,Fecha Real de Liberación,Liberación retrasada por\n\
                   CSR-1,Login fails,Done,2024-03-01,2024-03-04,\n\
                   CSR-2,Export slow,Open,,,oops\n";
        let records = read_records(csv.as_bytes(), &ColumnMap::default()).unwrap();
        assert_eq!(records.len(), 2);

        assert_eq!(records[0].key, "CSR-1");
        assert_eq!(records[0].summary, "Login fails");
        assert_eq!(records[0].status.as_deref(), Some("Done"));
        assert_eq!(records[0].delay_days, Some(3.0));

        assert_eq!(records[1].status.as_deref(), Some("Open"));
        assert_eq!(records[1].delay_days, None);
        assert_eq!(records[1].assignee, None);
    }

    #[test]
    fn test_read_records_skips_blank_rows_and_pads_ragged_rows() {
        let csv = " Clave ;Estado;Persona asignada\nCSR-1;Done;Ana\n;;\nCSR-2\n";
        let records = read_records(csv.as_bytes(), &ColumnMap::default()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].assignee.as_deref(), Some("Ana"));
        assert_eq!(records[1].key, "CSR-2");
        assert_eq!(records[1].status, None);
    }

    #[test]
    fn test_read_records_semicolon_export_uses_decimal_comma() {
        let csv = "Clave;Liberación retrasada por;Estado Desarrollo > 30 días\n\
                   CSR-1;2,5;31\n\
                   CSR-2;-1,5;n/a\n";
        let records = read_records(csv.as_bytes(), &ColumnMap::default()).unwrap();
        assert_eq!(records[0].delay_days, Some(2.5));
        assert_eq!(records[0].dev_duration_flag, Some(31.0));
        assert_eq!(records[1].delay_days, Some(-1.5));
        assert_eq!(records[1].dev_duration_flag, None);
    }

    #[test]
    fn test_read_records_rejects_two_digit_year_dates() {
        let csv = "Clave,Fecha Planificada de Liberación,Fecha Real de Liberación\n\
                   CSR-1,01/03/2024,05/03/24\n";
        let records = read_records(csv.as_bytes(), &ColumnMap::default()).unwrap();
        assert!(records[0].planned_release_at.is_some());
        assert_eq!(records[0].actual_release_at, None);
        assert_eq!(records[0].delay_days, None);
    }

    fn workbook(rows: &[&[&str]], hidden: &[u32]) -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        for (r, cells) in rows.iter().enumerate() {
            for (c, cell) in cells.iter().enumerate().filter(|(_, cell)| !cell.is_empty()) {
                sheet.write_string(r as u32, c as u16, *cell).unwrap();
            }
        }
        for row in hidden {
            sheet.set_row_hidden(*row).unwrap();
        }
        workbook.save_to_buffer().unwrap()
    }

    #[test]
    fn test_read_workbook_records_skips_hidden_rows() {
        let bytes = workbook(
            &[
                &["Clave", "Estado", "Liberación retrasada por"],
                &["CSR-1", "Liberado", "4"],
                &["CSR-2", "Liberado", "90"],
                &["CSR-3", "Abierto", ""],
            ],
            &[2],
        );
        let records = read_workbook_records(&bytes, &ColumnMap::default()).unwrap();
        let keys: Vec<&str> = records.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["CSR-1", "CSR-3"]);
        assert_eq!(records[0].delay_days, Some(4.0));
        assert_eq!(records[1].status.as_deref(), Some("Abierto"));
    }

    #[test]
    fn test_load_records_picks_reader_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let bytes = workbook(&[&["Clave", "Estado"], &["CSR-9", "Liberado"]], &[]);

        let xlsx = dir.path().join("Export Jira CSRs 1.XLSX");
        std::fs::write(&xlsx, &bytes).unwrap();
        let records = load_records(&xlsx, &ColumnMap::default()).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "CSR-9");

        let csv = dir.path().join("export.csv");
        std::fs::write(&csv, "Clave;Estado\nCSR-10;Abierto\n").unwrap();
        let records = load_records(&csv, &ColumnMap::default()).unwrap();
        assert_eq!(records[0].key, "CSR-10");
        assert_eq!(records[0].status.as_deref(), Some("Abierto"));
    }

    #[test]
    fn test_read_workbook_records_rejects_non_workbook() {
        let err = read_workbook_records(b"Clave,Estado\nCSR-1,Liberado\n", &ColumnMap::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to open workbook"));
    }

    #[test]
    fn test_read_records_custom_headers() {
        let mut columns = ColumnMap::default();
        columns.set_header(Column::Key, "Issue key");
        columns.set_header(Column::Status, "Status");
        let csv = "Issue key,Status\nABC-7,Closed\n";
        let records = read_records(csv.as_bytes(), &columns).unwrap();
        assert_eq!(records[0].key, "ABC-7");
        assert_eq!(records[0].status.as_deref(), Some("Closed"));
    }

    #[test]
    fn test_load_records_missing_file_is_fatal() {
        let err = load_records(Path::new("/nonexistent/export.csv"), &ColumnMap::default())
            .unwrap_err();
        assert!(format!("{:#}", err).contains("failed to read input table"));
    }

    #[test]
    fn test_column_map_duplicates() {
        let mut columns = ColumnMap::default();
        assert!(columns.duplicates().is_empty());
        columns.set_header(Column::Developer, "Persona asignada");
        assert_eq!(
            columns.duplicates(),
            vec![(Column::Assignee, Column::Developer)]
        );
    }
}
