//! Per-period metrics. Every function is pure: it reads joined rows and
//! returns a freshly sorted result.

use crate::join::{AvailabilityWithGuide, BookingWithTourAndGuide, SkillWithGuide};
use crate::types::{
    Booking, CountRow, DailyCountRow, DataInconsistency, OccupancyRow, OutOfPeriodRow, Period,
    TimeSlotRow, Tour,
};
use crate::util::round2;
use chrono::NaiveDate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Count occurrences per key, keeping first-appearance order, then sort by
/// count descending. The sort is stable, so equal counts stay in the order
/// their keys first appeared. Missing or empty keys are skipped.
fn count_ranked<'a, I>(keys: I) -> Vec<CountRow>
where
    I: IntoIterator<Item = Option<&'a str>>,
{
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<CountRow> = Vec::new();
    for key in keys.into_iter().flatten() {
        if key.is_empty() {
            continue;
        }
        match position.get(key) {
            Some(&idx) => rows[idx].count += 1,
            None => {
                position.insert(key, rows.len());
                rows.push(CountRow::new(key, 1));
            }
        }
    }
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Distinct dates per name, ranked like [`count_ranked`].
fn distinct_dates_ranked<'a, I>(pairs: I) -> Vec<CountRow>
where
    I: IntoIterator<Item = (Option<&'a str>, NaiveDate)>,
{
    let mut seen: HashSet<(&str, NaiveDate)> = HashSet::new();
    count_ranked(pairs.into_iter().filter_map(|(name, date)| {
        let name = name?;
        seen.insert((name, date)).then_some(Some(name))
    }))
}

fn top(mut rows: Vec<CountRow>, n: usize) -> Vec<CountRow> {
    rows.truncate(n);
    rows
}

/// Bookings per tour name, descending.
pub fn bookings_per_tour(joined: &[BookingWithTourAndGuide<'_>]) -> Vec<CountRow> {
    count_ranked(joined.iter().map(|b| b.tour_name()))
}

pub fn top_booked_tours(joined: &[BookingWithTourAndGuide<'_>], n: usize) -> Vec<CountRow> {
    top(bookings_per_tour(joined), n)
}

/// Bookings per calendar date, ascending by date.
pub fn daily_booking_counts(bookings: &[Booking]) -> Vec<DailyCountRow> {
    let mut by_date: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for b in bookings {
        *by_date.entry(b.booking_date).or_insert(0) += 1;
    }
    by_date
        .into_iter()
        .map(|(date, count)| DailyCountRow { date, count })
        .collect()
}

/// Bookings per guide name, descending.
pub fn bookings_per_guide(joined: &[BookingWithTourAndGuide<'_>]) -> Vec<CountRow> {
    count_ranked(joined.iter().map(|b| b.guide_name()))
}

pub fn top_active_guides(joined: &[BookingWithTourAndGuide<'_>], n: usize) -> Vec<CountRow> {
    top(bookings_per_guide(joined), n)
}

/// Distinct dates with a non-empty slot, per guide name.
pub fn available_days_per_guide(availability: &[AvailabilityWithGuide<'_>]) -> Vec<CountRow> {
    distinct_dates_ranked(
        availability
            .iter()
            .filter(|a| a.record.has_slot())
            .map(|a| (a.guide.map(|g| g.name.as_str()), a.record.date)),
    )
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct NotAvailableReport {
    pub rows: Vec<CountRow>,
    /// Guides left out of `rows` because their availability exceeds the
    /// month length.
    pub inconsistencies: Vec<DataInconsistency>,
}

/// Days in the period's month minus available days, per guide, descending.
pub fn not_available_days(available: &[CountRow], period: &Period) -> NotAvailableReport {
    let days = period.days_in_month();
    let mut report = NotAvailableReport::default();
    for row in available {
        match u64::from(days).checked_sub(row.count) {
            Some(missing) => report.rows.push(CountRow::new(row.name.clone(), missing)),
            None => report.inconsistencies.push(DataInconsistency {
                guide_name: row.name.clone(),
                available_days: row.count,
                days_in_month: days,
            }),
        }
    }
    report.rows.sort_by(|a, b| b.count.cmp(&a.count));
    report
}

/// Distinct booking dates per guide name, descending.
pub fn occupied_days_per_guide(joined: &[BookingWithTourAndGuide<'_>]) -> Vec<CountRow> {
    distinct_dates_ranked(
        joined
            .iter()
            .map(|b| (b.guide_name(), b.booking.booking_date)),
    )
}

/// Occupied days as a percentage of available days for every guide present
/// in either input. Guides without availability get `None`.
pub fn occupancy_stats(occupied: &[CountRow], available: &[CountRow]) -> Vec<OccupancyRow> {
    let mut acc: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for row in occupied {
        acc.entry(row.name.as_str()).or_default().0 = row.count;
    }
    for row in available {
        acc.entry(row.name.as_str()).or_default().1 = row.count;
    }

    let mut rows: Vec<OccupancyRow> = acc
        .into_iter()
        .map(|(name, (days_occupied, available_days))| {
            let occupancy_pct = if available_days == 0 {
                None
            } else {
                Some(round2(days_occupied as f64 / available_days as f64 * 100.0))
            };
            OccupancyRow {
                guide_name: name.to_string(),
                days_occupied,
                available_days,
                occupancy_pct,
                exceeds_availability: available_days > 0 && days_occupied > available_days,
            }
        })
        .collect();

    // Highest occupancy first, undefined last, then by name.
    rows.sort_by(|a, b| match (a.occupancy_pct, b.occupancy_pct) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.guide_name.cmp(&b.guide_name)));
    rows
}

/// Skill records per guide name, descending.
pub fn certifications_per_guide(skills: &[SkillWithGuide<'_>]) -> Vec<CountRow> {
    count_ranked(skills.iter().map(|s| s.guide.map(|g| g.name.as_str())))
}

pub fn certification_counts(skills: &[SkillWithGuide<'_>], n: usize) -> Vec<CountRow> {
    top(certifications_per_guide(skills), n)
}

/// Weekly operating days summed per tour location, descending. Tours without
/// a location are skipped.
pub fn operating_days_by_location(tours: &[Tour]) -> Vec<CountRow> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut rows: Vec<CountRow> = Vec::new();
    for t in tours.iter().filter(|t| !t.location.is_empty()) {
        let days = t.operating_days();
        match position.get(t.location.as_str()) {
            Some(&idx) => rows[idx].count += days,
            None => {
                position.insert(t.location.as_str(), rows.len());
                rows.push(CountRow::new(t.location.clone(), days));
            }
        }
    }
    rows.sort_by(|a, b| b.count.cmp(&a.count));
    rows
}

/// Most common time slot per location among tours that run at least one day.
/// Ties go to the lexicographically smallest slot.
pub fn dominant_time_slot_by_location(tours: &[Tour]) -> Vec<TimeSlotRow> {
    let mut counts: BTreeMap<(&str, String), u64> = BTreeMap::new();
    for t in tours
        .iter()
        .filter(|t| !t.location.is_empty() && t.operating_days() > 0)
    {
        *counts.entry((t.location.as_str(), t.time_slot())).or_insert(0) += 1;
    }

    // BTreeMap order is (location, slot) ascending, so keeping only strictly
    // greater counts leaves the smallest slot on ties.
    let mut best: BTreeMap<&str, (String, u64)> = BTreeMap::new();
    for ((location, slot), count) in counts {
        let replace = best
            .get(location)
            .map_or(true, |(_, best_count)| count > *best_count);
        if replace {
            best.insert(location, (slot, count));
        }
    }

    let mut rows: Vec<TimeSlotRow> = best
        .into_iter()
        .map(|(location, (time_slot, count))| TimeSlotRow {
            location: location.to_string(),
            time_slot,
            count,
        })
        .collect();
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.location.cmp(&b.location)));
    rows
}

/// Availability records dated outside the period's month.
pub fn availability_outside_period(
    availability: &[AvailabilityWithGuide<'_>],
    period: &Period,
) -> Vec<OutOfPeriodRow> {
    availability
        .iter()
        .filter(|a| !period.contains(a.record.date))
        .map(|a| OutOfPeriodRow {
            guide_name: a
                .guide
                .map(|g| g.name.clone())
                .or_else(|| a.record.guide_id.clone())
                .unwrap_or_default(),
            date: a.record.date,
        })
        .collect()
}
