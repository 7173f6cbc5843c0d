//! The data-driven run: load every configured period, analyze each one on
//! its own, then combine the periods that succeeded.

use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{self, NotAvailableReport};
use crate::combine::{by_day_of_month, combine, CombinedTable};
use crate::config::Config;
use crate::error::{ConfigError, DataSourceError};
use crate::join::{join_all, JoinReport, JoinedTables};
use crate::loader::{load_period, LoadReport, PeriodData};
use crate::types::{
    CountRow, DailyCountRow, Metric, OccupancyRow, OutOfPeriodRow, Period, TimeSlotRow,
};

/// A loaded period; joins borrow from it on demand.
#[derive(Debug, Clone)]
pub struct PeriodContext {
    pub data: PeriodData,
}

impl PeriodContext {
    pub fn new(data: PeriodData) -> Self {
        Self { data }
    }

    pub fn period(&self) -> &Period {
        &self.data.period
    }

    pub fn joins(&self) -> JoinedTables<'_> {
        let d = &self.data;
        join_all(
            &d.period,
            &d.bookings,
            &d.tours,
            &d.guides,
            &d.availability,
            &d.skills,
        )
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodReport {
    pub period: Period,
    pub load: LoadReport,
    pub joins: JoinReport,
    pub top_tours: Vec<CountRow>,
    pub daily_bookings: Vec<DailyCountRow>,
    pub active_guides: Vec<CountRow>,
    pub available_days: Vec<CountRow>,
    pub not_available: NotAvailableReport,
    pub occupied_days: Vec<CountRow>,
    pub occupancy: Vec<OccupancyRow>,
    pub certifications: Vec<CountRow>,
    pub operating_days: Vec<CountRow>,
    pub time_slots: Vec<TimeSlotRow>,
    pub availability_outside_period: Vec<OutOfPeriodRow>,
    /// Un-truncated rankings, kept for the cross-period tables.
    #[serde(skip)]
    pub all_tours: Vec<CountRow>,
    #[serde(skip)]
    pub all_guides: Vec<CountRow>,
    #[serde(skip)]
    pub all_certifications: Vec<CountRow>,
}

impl PeriodReport {
    /// Count rows for a metric as computed for this period.
    pub fn rows_for(&self, metric: Metric) -> Vec<CountRow> {
        match metric {
            Metric::TopTours => self.all_tours.clone(),
            Metric::ActiveGuides => self.all_guides.clone(),
            Metric::AvailableDays => self.available_days.clone(),
            Metric::NotAvailableDays => self.not_available.rows.clone(),
            Metric::OccupiedDays => self.occupied_days.clone(),
            Metric::Certifications => self.all_certifications.clone(),
            Metric::OperatingDays => self.operating_days.clone(),
            Metric::DailyBookings => by_day_of_month(&self.daily_bookings),
        }
    }

    pub fn warning_count(&self) -> usize {
        self.not_available.inconsistencies.len()
            + self.availability_outside_period.len()
            + self.load.name_collisions.len()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PeriodFailure {
    pub period: Period,
    pub kind: &'static str,
    pub error: String,
}

impl PeriodFailure {
    fn new(period: &Period, err: &DataSourceError) -> Self {
        Self {
            period: period.clone(),
            kind: err.kind(),
            error: err.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MultiPeriodReport {
    pub reports: Vec<PeriodReport>,
    pub failures: Vec<PeriodFailure>,
    pub combined: Vec<CombinedTable>,
}

/// Metrics that get a cross-period table.
pub const COMBINED_METRICS: &[Metric] = &[
    Metric::AvailableDays,
    Metric::OperatingDays,
    Metric::TopTours,
    Metric::ActiveGuides,
    Metric::OccupiedDays,
    Metric::Certifications,
    Metric::DailyBookings,
];

pub fn analyze_period(ctx: &PeriodContext, top_n: usize) -> PeriodReport {
    let period = ctx.period();
    let joined = ctx.joins();

    let all_tours = aggregate::bookings_per_tour(&joined.bookings);
    let all_guides = aggregate::bookings_per_guide(&joined.bookings);
    let all_certifications = aggregate::certifications_per_guide(&joined.skills);
    let available_days = aggregate::available_days_per_guide(&joined.availability);
    let occupied_days = aggregate::occupied_days_per_guide(&joined.bookings);
    let not_available = aggregate::not_available_days(&available_days, period);
    let occupancy = aggregate::occupancy_stats(&occupied_days, &available_days);
    let availability_outside_period =
        aggregate::availability_outside_period(&joined.availability, period);

    for bad in &not_available.inconsistencies {
        warn!(
            period = %period,
            guide = %bad.guide_name,
            available_days = bad.available_days,
            days_in_month = bad.days_in_month,
            "Guide has more availability days than the month"
        );
    }
    if !availability_outside_period.is_empty() {
        warn!(
            period = %period,
            records = availability_outside_period.len(),
            "Availability recorded outside the period's month"
        );
    }
    for row in occupancy.iter().filter(|r| r.exceeds_availability) {
        warn!(
            period = %period,
            guide = %row.guide_name,
            occupied = row.days_occupied,
            available = row.available_days,
            "Guide occupied on more days than available"
        );
    }

    PeriodReport {
        period: period.clone(),
        load: ctx.data.report.clone(),
        joins: joined.report.clone(),
        top_tours: all_tours.iter().take(top_n).cloned().collect(),
        daily_bookings: aggregate::daily_booking_counts(&ctx.data.bookings),
        active_guides: all_guides.iter().take(top_n).cloned().collect(),
        available_days,
        not_available,
        occupied_days,
        occupancy,
        certifications: all_certifications.iter().take(top_n).cloned().collect(),
        operating_days: aggregate::operating_days_by_location(&ctx.data.tours),
        time_slots: aggregate::dominant_time_slot_by_location(&ctx.data.tours),
        availability_outside_period,
        all_tours,
        all_guides,
        all_certifications,
    }
}

/// Load every period independently. A failing period is recorded and the
/// rest carry on.
pub fn load_all(config: &Config) -> Result<(Vec<PeriodContext>, Vec<PeriodFailure>), ConfigError> {
    let periods = config.resolve_periods()?;
    let mut loaded = Vec::with_capacity(periods.len());
    let mut failures = Vec::new();
    for period in &periods {
        match load_period(config, period) {
            Ok(data) => loaded.push(PeriodContext::new(data)),
            Err(e) => {
                warn!(period = %period, kind = e.kind(), "Skipping period: {}", e);
                failures.push(PeriodFailure::new(period, &e));
            }
        }
    }
    Ok((loaded, failures))
}

/// Build a cross-period table for `metric` from the given reports.
pub fn combine_reports(metric: Metric, reports: &[PeriodReport]) -> CombinedTable {
    let rows: Vec<(String, Vec<CountRow>)> = reports
        .iter()
        .map(|r| (r.period.label.clone(), r.rows_for(metric)))
        .collect();
    let columns: Vec<(String, &[CountRow])> = rows
        .iter()
        .map(|(label, rows)| (label.clone(), rows.as_slice()))
        .collect();
    combine(metric, &columns)
}

/// Library entry point: validate, load and analyze in one call. The binary
/// keeps the loaded contexts around for the joined export, so it calls
/// [`load_all`] and [`analyze_all`] itself.
pub fn run(config: &Config) -> Result<MultiPeriodReport, ConfigError> {
    config.validate()?;
    let (contexts, failures) = load_all(config)?;
    Ok(analyze_all(config, &contexts, failures))
}

/// Analyze loaded periods and build the cross-period tables when more than
/// one period succeeded.
pub fn analyze_all(
    config: &Config,
    contexts: &[PeriodContext],
    failures: Vec<PeriodFailure>,
) -> MultiPeriodReport {
    let reports: Vec<PeriodReport> = contexts
        .iter()
        .map(|ctx| analyze_period(ctx, config.top_n))
        .collect();

    let combined = if reports.len() > 1 {
        COMBINED_METRICS
            .iter()
            .map(|m| combine_reports(*m, &reports))
            .collect()
    } else {
        Vec::new()
    };

    info!(
        analyzed = reports.len(),
        failed = failures.len(),
        combined = combined.len(),
        "Run finished"
    );
    MultiPeriodReport {
        reports,
        failures,
        combined,
    }
}
