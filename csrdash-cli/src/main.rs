//! csrdash CLI - interactive CSR dashboards from Jira exports

#![deny(warnings)]

// Global invariants enforced:
// - Deterministic output ordering
// - Identical input yields byte-for-byte identical output (apart from the generation time)

use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use csrdash_core::aggregates::MetricsSnapshot;
use csrdash_core::config::{self, ResolvedConfig};
use csrdash_core::record::{Category, DAY_FORMAT};
use csrdash_core::{build_dashboard, load_from_config, DashboardView, Filter};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "csrdash")]
#[command(about = "Generate an interactive CSR analytics dashboard from a Jira export")]
#[command(version = env!("CSRDASH_VERSION"))]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the HTML dashboard (default command)
    Generate {
        /// Input table, `.xlsx` workbook or CSV (overrides config file)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output HTML file (overrides config file)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the metrics of a filtered view
    Summary {
        /// Input table, `.xlsx` workbook or CSV (overrides config file)
        #[arg(long)]
        input: Option<PathBuf>,

        /// Path to config file (default: auto-discover)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(long, default_value = "text")]
        format: OutputFormat,

        /// Only CSRs with this status
        #[arg(long)]
        status: Option<String>,

        /// Only CSRs with this priority
        #[arg(long)]
        priority: Option<String>,

        /// Only CSRs of this type
        #[arg(long = "type")]
        issue_type: Option<String>,

        /// Only CSRs assigned to this person
        #[arg(long)]
        assignee: Option<String>,

        /// Only CSRs handled by this developer
        #[arg(long)]
        developer: Option<String>,

        /// Earliest actual release day, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        released_from: Option<NaiveDate>,

        /// Latest actual release day, inclusive (YYYY-MM-DD)
        #[arg(long, value_parser = parse_day)]
        released_to: Option<NaiveDate>,
    },
    /// Validate or show the configuration
    #[command(name = "config")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Validate a config file without generating a dashboard
    Validate {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Show the resolved configuration (merged defaults + config file)
    Show {
        /// Path to config file (default: auto-discover from current directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, DAY_FORMAT)
        .map_err(|e| format!("expected YYYY-MM-DD ({})", e))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Generate {
        input: None,
        output: None,
        config: None,
    });

    match command {
        Commands::Generate {
            input,
            output,
            config: config_path,
        } => {
            let mut resolved = load_config(config_path.as_deref())?;

            // CLI flags override config file values
            if let Some(input) = input {
                resolved.input = input;
            }
            if let Some(output) = output {
                resolved.output = output;
            }

            let generated_at = chrono::Local::now().format("%Y-%m-%d %H:%M").to_string();
            let (html, records) = build_dashboard(&resolved, &generated_at).with_context(|| {
                format!("failed to build dashboard from {}", resolved.input.display())
            })?;

            write_html_report(&resolved.output, &html)?;
            eprintln!(
                "Dashboard written to: {} ({} CSRs)",
                resolved.output.display(),
                records.len()
            );
        }
        Commands::Summary {
            input,
            config: config_path,
            format,
            status,
            priority,
            issue_type,
            assignee,
            developer,
            released_from,
            released_to,
        } => {
            let mut resolved = load_config(config_path.as_deref())?;
            if let Some(input) = input {
                resolved.input = input;
            }

            let records = load_from_config(&resolved)?;
            let mut view = DashboardView::new(records);
            let filter = Filter {
                status,
                priority,
                issue_type,
                assignee,
                developer,
                release_from: released_from,
                release_to: released_to,
            };
            if filter != Filter::default() {
                log::debug!("summary filter: {:?}", filter);
                view.set_filter(filter);
            }

            let snapshot = view.snapshot();
            match format {
                OutputFormat::Json => println!("{}", snapshot.to_json()?),
                OutputFormat::Text => print_summary(&snapshot),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Validate { path } => {
                let root = std::env::current_dir()?;
                match config::load_and_resolve(&root, path.as_deref()) {
                    Ok(config) => {
                        if let Some(ref p) = config.config_path {
                            println!("Config valid: {}", p.display());
                        } else {
                            println!("No config file found. Using defaults.");
                        }
                    }
                    Err(e) => {
                        eprintln!("Config validation failed: {:#}", e);
                        std::process::exit(1);
                    }
                }
            }
            ConfigAction::Show { path } => {
                let root = std::env::current_dir()?;
                let resolved = config::load_and_resolve(&root, path.as_deref())
                    .context("failed to load configuration")?;
                print_config(&resolved);
            }
        },
    }

    Ok(())
}

/// Load configuration from `--config` or the current directory
fn load_config(config_path: Option<&Path>) -> anyhow::Result<ResolvedConfig> {
    let root = std::env::current_dir()?;
    let resolved = config::load_and_resolve(&root, config_path)
        .context("failed to load configuration")?;

    if let Some(config_path) = &resolved.config_path {
        eprintln!("Using config: {}", config_path.display());
    }
    Ok(resolved)
}

fn print_config(resolved: &ResolvedConfig) {
    println!("Configuration:");
    if let Some(ref p) = resolved.config_path {
        println!("  Source: {}", p.display());
    } else {
        println!("  Source: defaults (no config file found)");
    }
    println!();
    println!("Files:");
    println!("  input: {}", resolved.input.display());
    println!("  output: {}", resolved.output.display());
    println!();
    println!("Page:");
    println!("  title: {}", resolved.title);
    println!("  subtitle: {}", resolved.subtitle);
    println!();
    println!("Columns:");
    for column in csrdash_core::load::Column::ALL {
        println!(
            "  {}: {}",
            column.field_name(),
            resolved.columns.header(column)
        );
    }
}

fn print_summary(snapshot: &MetricsSnapshot) {
    println!("Total CSRs:            {}", snapshot.total);
    println!("Avg delay (days):      {:.1}", snapshot.avg_delay);
    println!("Released late:         {:.1}%", snapshot.pct_late);
    println!(
        ">30d in dev:           {} (avg {:.1})",
        snapshot.num_dev_gt30, snapshot.avg_dev_gt30
    );
    println!(
        ">60d dev to release:   {} (avg {:.1})",
        snapshot.num_devlib_gt60, snapshot.avg_devlib_gt60
    );
    println!("Longest delay (days):  {:.1}", snapshot.max_delay);
    println!("Shortest delay (days): {:.1}", snapshot.min_delay);

    for category in Category::ALL {
        let counts = snapshot.counts(category);
        if counts.is_empty() {
            continue;
        }
        println!();
        println!("By {}:", category.label());
        for (label, count) in counts {
            println!("  {:<30} {}", label, count);
        }
    }

    if !snapshot.top_late.is_empty() {
        println!();
        println!("Most delayed releases:");
        for row in &snapshot.top_late {
            println!("  {:<12} {:>7.1}  {}", row.key, row.value, row.summary);
        }
    }
}

fn write_html_report(path: &Path, html: &str) -> anyhow::Result<()> {
    use std::fs;

    // Create parent directories if needed
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    // Atomic write (temp + rename pattern)
    let temp_path = path.with_extension("html.tmp");
    fs::write(&temp_path, html)
        .with_context(|| format!("Failed to write temporary file: {}", temp_path.display()))?;
    fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temporary file to: {}", path.display()))?;

    Ok(())
}
