// Entry point and high-level CLI flow.
//
// - `load` reads and joins every configured period and prints diagnostics.
// - `report` runs the full analysis, writes CSV/JSON outputs and prints
//   Markdown previews of each insight.
use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tour_insights::output;
use tour_insights::pipeline::{self, MultiPeriodReport, PeriodReport};
use tour_insights::types::Metric;
use tour_insights::util::format_int;
use tour_insights::Config;

/// Monthly guided-tour booking and guide analytics
#[derive(Parser, Debug)]
#[command(name = "tour_insights")]
#[command(about = "Analyze monthly tour bookings, guide availability and certifications")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    opts: Overrides,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load and join every period, printing row and join diagnostics
    Load,
    /// Compute every insight and write the reports
    Report {
        /// Also export the joined booking table per period
        #[arg(long)]
        export_joined: bool,
    },
}

#[derive(Args, Debug)]
struct Overrides {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the monthly CSV exports
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Directory reports are written to
    #[arg(long, global = true)]
    output_dir: Option<PathBuf>,

    /// Year of the periods
    #[arg(long, global = true)]
    year: Option<i32>,

    /// Comma-separated month codes, e.g. 03,04,05
    #[arg(long, global = true, value_delimiter = ',')]
    periods: Option<Vec<String>>,

    /// Entries kept in the "top" rankings
    #[arg(long, global = true)]
    top_n: Option<usize>,

    /// Rows shown in console previews
    #[arg(long, global = true)]
    preview_rows: Option<usize>,
}

impl Overrides {
    fn into_config(self) -> Result<Config> {
        let mut cfg = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        if let Some(v) = self.data_dir {
            cfg.data_dir = v;
        }
        if let Some(v) = self.output_dir {
            cfg.output_dir = v;
        }
        if let Some(v) = self.year {
            cfg.year = v;
        }
        if let Some(v) = self.periods {
            cfg.periods = v;
        }
        if let Some(v) = self.top_n {
            cfg.top_n = v;
        }
        if let Some(v) = self.preview_rows {
            cfg.preview_rows = v;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Handle `load`: read and join every period, printing a short summary.
fn handle_load(cfg: &Config) -> Result<()> {
    let (contexts, failures) = pipeline::load_all(cfg)?;
    for ctx in &contexts {
        let r = &ctx.data.report;
        let joins = ctx.joins().report;
        println!("Period {} ({})", ctx.period().suffix(), ctx.period().label);
        println!(
            "  {} bookings, {} tours, {} guides, {} availability rows, {} skill rows",
            format_int(r.bookings),
            format_int(r.tours),
            format_int(r.guides),
            format_int(r.availability),
            format_int(r.skills)
        );
        println!(
            "  Unmatched: {} bookings without tour, {} without guide, {} skills and {} availability rows without guide",
            format_int(joins.bookings_without_tour),
            format_int(joins.bookings_without_guide),
            format_int(joins.skills_without_guide),
            format_int(joins.availability_without_guide)
        );
        for c in &r.name_collisions {
            println!("  Note: {} '{}' shared by IDs {}", c.table, c.name, c.ids.join(", "));
        }
        println!();
    }
    print_failures(&failures);
    if contexts.is_empty() {
        bail!("no period could be loaded");
    }
    Ok(())
}

fn print_failures(failures: &[pipeline::PeriodFailure]) {
    for f in failures {
        println!("Period {} failed ({}): {}", f.period.suffix(), f.kind, f.error);
    }
    if !failures.is_empty() {
        println!();
    }
}

fn preview_period(report: &PeriodReport, rows: usize) {
    let label = &report.period.label;
    let counts = [
        (Metric::TopTours, &report.top_tours),
        (Metric::ActiveGuides, &report.active_guides),
        (Metric::AvailableDays, &report.available_days),
        (Metric::NotAvailableDays, &report.not_available.rows),
        (Metric::OccupiedDays, &report.occupied_days),
        (Metric::Certifications, &report.certifications),
        (Metric::OperatingDays, &report.operating_days),
    ];
    for (metric, data) in counts {
        println!("{} - {}\n", metric.title(), label);
        output::preview_counts(metric, data, rows);
    }

    println!("Daily Bookings - {}\n", label);
    output::preview_table_rows(&report.daily_bookings, rows);
    println!("Guide Occupancy - {}\n", label);
    output::preview_table_rows(&report.occupancy, rows);
    println!("Most Common Time Slot per Location - {}\n", label);
    output::preview_table_rows(&report.time_slots, rows);

    if !report.not_available.inconsistencies.is_empty() {
        println!("Warning: availability exceeds the month for:\n");
        output::preview_table_rows(&report.not_available.inconsistencies, rows);
    }
    if !report.availability_outside_period.is_empty() {
        println!("Warning: availability recorded outside {}:\n", label);
        output::preview_table_rows(&report.availability_outside_period, rows);
    }
}

/// Handle `report`: run every period, write outputs and print previews.
fn handle_report(cfg: &Config, export_joined: bool) -> Result<()> {
    fs::create_dir_all(&cfg.output_dir)
        .with_context(|| format!("creating {}", cfg.output_dir.display()))?;

    let (contexts, failures) = pipeline::load_all(cfg)?;
    let run: MultiPeriodReport = pipeline::analyze_all(cfg, &contexts, failures);
    print_failures(&run.failures);
    if run.reports.is_empty() {
        bail!("every period failed to load");
    }

    println!("Generating reports...");
    println!("Outputs saved to {}\n", cfg.output_dir.display());

    for report in &run.reports {
        let written = output::write_period_report(&cfg.output_dir, report)
            .with_context(|| format!("writing reports for {}", report.period))?;
        info!(period = %report.period, files = written.len(), "Period reports written");
        preview_period(report, cfg.preview_rows);
    }

    if export_joined {
        for ctx in &contexts {
            let path = output::write_joined_bookings(&cfg.output_dir, ctx)?;
            println!("(Joined bookings exported to {})", path.display());
        }
        println!();
    }

    for table in &run.combined {
        let path = output::write_combined(&cfg.output_dir, table)?;
        println!("{} - All Periods\n", table.metric.title());
        output::preview_combined(table, cfg.preview_rows);
        println!("(Full table exported to {})\n", path.display());
    }

    let summary = output::write_run_summary(&cfg.output_dir, &run)?;
    println!("Run summary written to {}", summary.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let cfg = cli.opts.into_config()?;

    match cli.command {
        Command::Load => handle_load(&cfg),
        Command::Report { export_joined } => handle_report(&cfg, export_joined),
    }
}
