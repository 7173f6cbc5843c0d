use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{builder::Builder, settings::Style, Table, Tabled};
use tracing::debug;

use crate::combine::CombinedTable;
use crate::error::OutputError;
use crate::join::JoinedBookingExport;
use crate::pipeline::{MultiPeriodReport, PeriodContext, PeriodFailure, PeriodReport};
use crate::types::{CountRow, Metric, Period};

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    debug!(path = %path.display(), rows = rows.len(), "Wrote CSV");
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), OutputError> {
    let s = serde_json::to_string_pretty(value)?;
    fs::write(path, s)?;
    debug!(path = %path.display(), "Wrote JSON");
    Ok(())
}

/// Count rows with the metric's own column names.
pub fn write_counts(path: &Path, metric: Metric, rows: &[CountRow]) -> Result<(), OutputError> {
    let mut wtr = csv::Writer::from_path(path)?;
    wtr.write_record([metric.key_header(), metric.value_header()])?;
    for r in rows {
        wtr.write_record([r.name.as_str(), r.count.to_string().as_str()])?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_combined(dir: &Path, table: &CombinedTable) -> Result<PathBuf, OutputError> {
    let path = dir.join(format!("combined_{}.csv", table.metric.file_stem()));
    let mut wtr = csv::Writer::from_path(&path)?;
    wtr.write_record(table.header())?;
    for record in table.records() {
        wtr.write_record(record)?;
    }
    wtr.flush()?;
    Ok(path)
}

fn period_file(dir: &Path, stem: &str, period: &Period, ext: &str) -> PathBuf {
    dir.join(format!("{}_{}.{}", stem, period.suffix(), ext))
}

/// One CSV per metric plus a JSON summary for the period.
pub fn write_period_report(dir: &Path, report: &PeriodReport) -> Result<Vec<PathBuf>, OutputError> {
    let p = &report.period;
    let mut written = Vec::new();

    let counts: [(Metric, &[CountRow]); 7] = [
        (Metric::TopTours, report.top_tours.as_slice()),
        (Metric::ActiveGuides, report.active_guides.as_slice()),
        (Metric::AvailableDays, report.available_days.as_slice()),
        (Metric::NotAvailableDays, report.not_available.rows.as_slice()),
        (Metric::OccupiedDays, report.occupied_days.as_slice()),
        (Metric::Certifications, report.certifications.as_slice()),
        (Metric::OperatingDays, report.operating_days.as_slice()),
    ];
    for (metric, rows) in counts {
        let path = period_file(dir, metric.file_stem(), p, "csv");
        write_counts(&path, metric, rows)?;
        written.push(path);
    }

    let path = period_file(dir, "daily_bookings", p, "csv");
    write_csv(&path, &report.daily_bookings)?;
    written.push(path);

    let path = period_file(dir, "occupancy", p, "csv");
    write_csv(&path, &report.occupancy)?;
    written.push(path);

    let path = period_file(dir, "time_slots", p, "csv");
    write_csv(&path, &report.time_slots)?;
    written.push(path);

    let path = period_file(dir, "summary", p, "json");
    write_json(&path, report)?;
    written.push(path);

    Ok(written)
}

/// The booking join, with both sides' ID columns kept.
pub fn write_joined_bookings(dir: &Path, ctx: &PeriodContext) -> Result<PathBuf, OutputError> {
    let joined = ctx.joins();
    let rows: Vec<JoinedBookingExport> = joined.bookings.iter().map(Into::into).collect();
    let path = period_file(dir, "bookings_joined", ctx.period(), "csv");
    write_csv(&path, &rows)?;
    Ok(path)
}

#[derive(Debug, Serialize)]
struct RunSummary<'a> {
    analyzed: Vec<&'a Period>,
    failures: &'a [PeriodFailure],
    combined_tables: Vec<&'static str>,
    warnings: usize,
}

pub fn write_run_summary(dir: &Path, run: &MultiPeriodReport) -> Result<PathBuf, OutputError> {
    let summary = RunSummary {
        analyzed: run.reports.iter().map(|r| &r.period).collect(),
        failures: &run.failures,
        combined_tables: run.combined.iter().map(|t| t.metric.file_stem()).collect(),
        warnings: run.reports.iter().map(PeriodReport::warning_count).sum(),
    };
    let path = dir.join("run_summary.json");
    write_json(&path, &summary)?;
    Ok(path)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}

pub fn preview_counts(metric: Metric, rows: &[CountRow], max_rows: usize) {
    if rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record([metric.key_header().to_string(), metric.value_header().to_string()]);
    for r in rows.iter().take(max_rows) {
        builder.push_record([r.name.clone(), r.count.to_string()]);
    }
    println!("{}\n", builder.build().with(Style::markdown()));
}

pub fn preview_combined(table: &CombinedTable, max_rows: usize) {
    if table.rows.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let mut builder = Builder::default();
    builder.push_record(table.header());
    for record in table.records().take(max_rows) {
        builder.push_record(record);
    }
    println!("{}\n", builder.build().with(Style::markdown()));
}
