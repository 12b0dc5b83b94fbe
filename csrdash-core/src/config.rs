//! Configuration file support for csrdash
//!
//! Loads dashboard configuration from JSON files.
//!
//! Search order:
//! 1. Explicit path (--config CLI flag)
//! 2. `.csrdashrc.json` in the working directory
//! 3. `csrdash.config.json` in the working directory
//!
//! All fields are optional. CLI flags take precedence over config file values.

use crate::load::{Column, ColumnMap};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Input table read when neither the CLI nor the config names one
pub const DEFAULT_INPUT: &str = "Export Jira CSRs 1.xlsx";

/// Dashboard written when neither the CLI nor the config names one
pub const DEFAULT_OUTPUT: &str = "dashboard.html";

pub const DEFAULT_TITLE: &str = "CSR Analytics Dashboard";

pub const DEFAULT_SUBTITLE: &str = "Automated metrics & analysis from Jira export";

/// Config file names checked by `discover_config`, in order
const CONFIG_FILE_NAMES: &[&str] = &[".csrdashrc.json", "csrdash.config.json"];

/// csrdash configuration loaded from a JSON config file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DashboardConfig {
    /// Input table (default: `Export Jira CSRs 1.xlsx`)
    #[serde(default)]
    pub input: Option<PathBuf>,

    /// Dashboard output file (default: `dashboard.html`)
    #[serde(default)]
    pub output: Option<PathBuf>,

    /// Page heading
    #[serde(default)]
    pub title: Option<String>,

    /// Line under the page heading
    #[serde(default)]
    pub subtitle: Option<String>,

    /// Header overrides for exports with renamed columns
    #[serde(default)]
    pub columns: Option<ColumnConfig>,
}

/// Header name overrides, keyed by record field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub key: Option<String>,
    pub summary: Option<String>,
    pub status: Option<String>,
    pub priority: Option<String>,
    #[serde(rename = "type")]
    pub issue_type: Option<String>,
    pub assignee: Option<String>,
    pub developer: Option<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
    pub ready_at: Option<String>,
    pub planned_release_at: Option<String>,
    pub actual_release_at: Option<String>,
    pub delay_days: Option<String>,
    pub dev_duration_flag: Option<String>,
    pub dev_to_release_flag: Option<String>,
}

impl ColumnConfig {
    fn get(&self, column: Column) -> Option<&str> {
        let value = match column {
            Column::Key => &self.key,
            Column::Summary => &self.summary,
            Column::Status => &self.status,
            Column::Priority => &self.priority,
            Column::Type => &self.issue_type,
            Column::Assignee => &self.assignee,
            Column::Developer => &self.developer,
            Column::CreatedAt => &self.created_at,
            Column::UpdatedAt => &self.updated_at,
            Column::ReadyAt => &self.ready_at,
            Column::PlannedReleaseAt => &self.planned_release_at,
            Column::ActualReleaseAt => &self.actual_release_at,
            Column::DelayDays => &self.delay_days,
            Column::DevDurationFlag => &self.dev_duration_flag,
            Column::DevToReleaseFlag => &self.dev_to_release_flag,
        };
        value.as_deref()
    }
}

/// Resolved configuration with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub title: String,
    pub subtitle: String,
    /// Header name for every column
    pub columns: ColumnMap,
    /// Path the config was loaded from (None if defaults)
    pub config_path: Option<PathBuf>,
}

impl DashboardConfig {
    /// Validate the configuration for logical errors
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("title", &self.title), ("subtitle", &self.subtitle)] {
            if matches!(value, Some(v) if v.trim().is_empty()) {
                anyhow::bail!("{} must not be empty", name);
            }
        }

        for (name, value) in [("input", &self.input), ("output", &self.output)] {
            if matches!(value, Some(p) if p.as_os_str().is_empty()) {
                anyhow::bail!("{} must not be an empty path", name);
            }
        }

        if let Some(ref columns) = self.columns {
            for column in Column::ALL {
                if let Some(header) = columns.get(column) {
                    if header.trim().is_empty() {
                        anyhow::bail!("columns.{} must not be empty", column.field_name());
                    }
                }
            }
        }

        if let Some((a, b)) = self.column_map().duplicates().first() {
            anyhow::bail!(
                "columns.{} and columns.{} both map to header {:?}",
                a.field_name(),
                b.field_name(),
                self.column_map().header(*a)
            );
        }

        Ok(())
    }

    /// Default headers with this config's overrides applied
    fn column_map(&self) -> ColumnMap {
        let mut map = ColumnMap::default();
        if let Some(ref columns) = self.columns {
            for column in Column::ALL {
                if let Some(header) = columns.get(column) {
                    map.set_header(column, header.trim());
                }
            }
        }
        map
    }

    /// Resolve config into concrete values, applying defaults
    pub fn resolve(&self) -> Result<ResolvedConfig> {
        self.validate()?;

        Ok(ResolvedConfig {
            input: self
                .input
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_INPUT)),
            output: self
                .output
                .clone()
                .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            title: self
                .title
                .clone()
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            subtitle: self
                .subtitle
                .clone()
                .unwrap_or_else(|| DEFAULT_SUBTITLE.to_string()),
            columns: self.column_map(),
            config_path: None,
        })
    }
}

/// Discover and load a config file from the working directory
///
/// Returns `None` if no config file is found (use defaults).
pub fn discover_config(root: &Path) -> Result<Option<(DashboardConfig, PathBuf)>> {
    for name in CONFIG_FILE_NAMES {
        let path = root.join(name);
        if path.exists() {
            let config = load_config_file(&path)?;
            return Ok(Some((config, path)));
        }
    }
    Ok(None)
}

/// Load config from an explicit file path
pub fn load_config_file(path: &Path) -> Result<DashboardConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;

    let config: DashboardConfig = serde_json::from_str(&content)
        .with_context(|| format!("failed to parse config file: {}", path.display()))?;

    config
        .validate()
        .with_context(|| format!("invalid config in: {}", path.display()))?;

    Ok(config)
}

/// Load and resolve config
///
/// If `config_path` is provided, loads from that file.
/// Otherwise, discovers config in `root`.
/// Returns default config if nothing is found.
pub fn load_and_resolve(root: &Path, config_path: Option<&Path>) -> Result<ResolvedConfig> {
    let (config, source_path) = if let Some(path) = config_path {
        let config = load_config_file(path)?;
        (config, Some(path.to_path_buf()))
    } else {
        match discover_config(root)? {
            Some((config, path)) => (config, Some(path)),
            None => (DashboardConfig::default(), None),
        }
    };

    let mut resolved = config.resolve()?;
    resolved.config_path = source_path;
    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_default_config_is_valid() {
        let config = DashboardConfig::default();
        config.validate().expect("default config should be valid");
        let resolved = config.resolve().expect("default config should resolve");
        assert_eq!(resolved.input, PathBuf::from("Export Jira CSRs 1.xlsx"));
        assert_eq!(resolved.output, PathBuf::from("dashboard.html"));
        assert_eq!(resolved.title, DEFAULT_TITLE);
        assert_eq!(resolved.columns, ColumnMap::default());
        assert!(resolved.config_path.is_none());
    }

    #[test]
    fn test_parse_minimal_config() {
        let config: DashboardConfig = serde_json::from_str("{}").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "input": "exports/csrs.csv",
            "output": "site/index.html",
            "title": "Q3 CSRs",
            "subtitle": "Support backlog",
            "columns": {
                "type": "Tipo",
                "assignee": "Asignado"
            }
        }"#;
        let config: DashboardConfig = serde_json::from_str(json).unwrap();
        let resolved = config.resolve().unwrap();
        assert_eq!(resolved.input, PathBuf::from("exports/csrs.csv"));
        assert_eq!(resolved.output, PathBuf::from("site/index.html"));
        assert_eq!(resolved.title, "Q3 CSRs");
        assert_eq!(resolved.subtitle, "Support backlog");
        assert_eq!(resolved.columns.header(Column::Type), "Tipo");
        assert_eq!(resolved.columns.header(Column::Assignee), "Asignado");
        assert_eq!(resolved.columns.header(Column::Key), "Clave");
    }

    #[test]
    fn test_reject_unknown_fields() {
        let result: Result<DashboardConfig, _> = serde_json::from_str(r#"{"theme": "dark"}"#);
        assert!(result.is_err(), "unknown fields should be rejected");

        let result: Result<DashboardConfig, _> =
            serde_json::from_str(r#"{"columns": {"reporter": "Informador"}}"#);
        assert!(result.is_err(), "unknown columns should be rejected");
    }

    #[test]
    fn test_reject_empty_title() {
        let config: DashboardConfig = serde_json::from_str(r#"{"title": "  "}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_empty_column_header() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"columns": {"status": ""}}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_reject_duplicate_column_header() {
        let config: DashboardConfig =
            serde_json::from_str(r#"{"columns": {"developer": "Persona asignada"}}"#).unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("columns.assignee"), "got: {}", err);
        assert!(err.contains("columns.developer"), "got: {}", err);
    }

    #[test]
    fn test_discover_rc_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(".csrdashrc.json"), r#"{"title": "From rc"}"#).unwrap();
        fs::write(dir.path().join("csrdash.config.json"), r#"{"title": "From config"}"#).unwrap();

        let (config, path) = discover_config(dir.path()).unwrap().unwrap();
        assert_eq!(config.title.as_deref(), Some("From rc"));
        assert!(path.ends_with(".csrdashrc.json"));
    }

    #[test]
    fn test_discover_config_json() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("csrdash.config.json"), r#"{"output": "out.html"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert_eq!(resolved.output, PathBuf::from("out.html"));
        assert!(resolved
            .config_path
            .as_ref()
            .unwrap()
            .ends_with("csrdash.config.json"));
    }

    #[test]
    fn test_no_config_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        assert!(discover_config(dir.path()).unwrap().is_none());
        let resolved = load_and_resolve(dir.path(), None).unwrap();
        assert!(resolved.config_path.is_none());
        assert_eq!(resolved.input, PathBuf::from(DEFAULT_INPUT));
    }

    #[test]
    fn test_explicit_config_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.json");
        fs::write(&path, r#"{"input": "data.csv"}"#).unwrap();

        let resolved = load_and_resolve(dir.path(), Some(&path)).unwrap();
        assert_eq!(resolved.input, PathBuf::from("data.csv"));
        assert_eq!(resolved.config_path, Some(path));
    }

    #[test]
    fn test_invalid_config_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".csrdashrc.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_and_resolve(dir.path(), None).unwrap_err();
        assert!(format!("{:#}", err).contains("failed to parse config file"));
    }
}
