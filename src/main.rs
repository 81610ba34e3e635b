//! ClassPulse - Weekly Classroom Teaching Metrics Analyzer
//!
//! A CLI tool that ingests a CSV of weekly teaching records, computes
//! hours-weighted metrics per class and subject, and writes a JSON
//! analysis artifact plus an optional Markdown narrative report.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (unreadable input, empty dataset, write failure)

mod analysis;
mod cli;
mod config;
mod error;
mod ingest;
mod models;
mod report;

use anyhow::{Context, Result};
use cli::Args;
use config::Config;
use ingest::LoadedTable;
use models::AnalysisResult;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("ClassPulse v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    // Run the analysis
    match run_analysis(args) {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .classpulse.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(".classpulse.toml");

    if path.exists() {
        eprintln!("⚠️  .classpulse.toml already exists. Remove it first or edit it manually.");
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).context("Failed to write .classpulse.toml")?;

    println!("✅ Created .classpulse.toml with default settings.");
    println!("   Edit it to remap column headers or tune the scoring weights.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete analysis workflow.
fn run_analysis(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let input = args.input_path();

    // Step 1: Ingest and clean the records table
    println!("📥 Reading records: {}", input.display());
    let table = ingest::load_records(input, &config.columns)?;
    info!(
        "Loaded {} rows ({} dropped during cleaning)",
        table.records.len(),
        table.dropped_rows
    );

    // Handle --dry-run: report what survived cleaning and exit
    if args.dry_run {
        return handle_dry_run(&table);
    }

    // Step 2: Aggregate
    println!("📊 Computing weighted metrics...");
    let file_name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| input.display().to_string());
    let result = analysis::analyze(
        &table.records,
        &file_name,
        &config.scoring,
        config.report.top_subjects,
    )?;

    // Step 3: Persist the JSON artifact
    report::write_json_artifact(&result, &args.output)
        .with_context(|| format!("Failed to write artifact to {}", args.output.display()))?;
    println!("💾 Artifact saved to: {}", args.output.display());

    // Step 4: Optional Markdown narrative
    if let Some(ref path) = args.report {
        report::write_markdown_report(&result, &config.report, path)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        println!("📝 Report written to: {}", path.display());
    }

    print_summary(&result, &table);

    println!("\n✅ Analysis complete!");
    Ok(())
}

/// Handle --dry-run: show what cleaning kept, write nothing.
fn handle_dry_run(table: &LoadedTable) -> Result<()> {
    println!("\n🔍 Dry run: ingest and clean only, no output files.\n");

    let weeks: std::collections::BTreeSet<_> = table.records.iter().map(|r| r.week).collect();
    let classes: std::collections::BTreeSet<_> =
        table.records.iter().map(|r| r.class_name.as_str()).collect();
    let subjects: std::collections::BTreeSet<_> =
        table.records.iter().map(|r| r.subject.as_str()).collect();

    println!("   Rows kept: {} of {}", table.records.len(), table.raw_rows);
    println!("   Weeks: {}", weeks.len());
    println!("   Classes: {}", classes.len());
    println!("   Subjects: {}", subjects.len());

    println!("\n✅ Dry run complete. No output files were written.");
    Ok(())
}

/// Console summary of the run, including week-over-week deltas when a
/// previous week exists.
fn print_summary(result: &AnalysisResult, table: &LoadedTable) {
    println!("\n📊 Analysis Summary:");

    if let Some(ref metrics) = result.current_week.metrics {
        println!(
            "   Week {}: {} hours across {} classes and {} subjects",
            result.current_week.date,
            metrics.total_hours,
            metrics.total_classes,
            metrics.total_subjects
        );
        println!(
            "   Attendance {:.1}% | Micro-lesson completion {:.1}% | Correctness {:.1}%",
            metrics.attendance_rate * 100.0,
            metrics.micro_completion_rate * 100.0,
            metrics.correctness_rate * 100.0
        );
    }

    match result.best_class.name {
        Some(ref name) => println!("   🏆 Top class: {}", name),
        None => println!("   🏆 Top class: none (no class groups this week)"),
    }
    match result.focus_class.name {
        Some(ref name) => println!("   ⚠️  Focus class: {}", name),
        None => println!("   ⚠️  Focus class: none flagged"),
    }

    print_week_over_week(table);

    println!("   Trend weeks: {}", result.weekly_trends.len());
}

/// Week-over-week deltas against the previous period, skipped when the
/// dataset holds a single week.
fn print_week_over_week(table: &LoadedTable) {
    let Some(periods) = analysis::split_periods(&table.records) else {
        return;
    };
    if periods.previous.is_empty() {
        debug!("No previous week to compare against");
        return;
    }

    let current = analysis::period_metrics(&periods.current);
    let previous = analysis::period_metrics(&periods.previous);
    let (Some(current), Some(previous)) = (current, previous) else {
        warn!("Skipping week-over-week deltas: empty period metrics");
        return;
    };

    println!("   Week-over-week:");
    let deltas = [
        (
            "total hours",
            current.total_hours as f64,
            previous.total_hours as f64,
        ),
        ("attendance", current.attendance_rate, previous.attendance_rate),
        (
            "micro-lesson completion",
            current.micro_completion_rate,
            previous.micro_completion_rate,
        ),
        ("correctness", current.correctness_rate, previous.correctness_rate),
    ];
    for (label, now, then) in deltas {
        if then == 0.0 {
            continue;
        }
        let change = (now - then) / then * 100.0;
        let arrow = if change > 0.0 {
            "↑"
        } else if change < 0.0 {
            "↓"
        } else {
            "→"
        };
        println!("     {} {} {:.1}%", arrow, label, change.abs());
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from .classpulse.toml");
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
