//! Cross-period wide tables.

use serde::Serialize;
use std::collections::HashMap;

use crate::types::{CountRow, DailyCountRow, Metric};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedRow {
    pub name: String,
    /// One value per period column, zero where the entity was absent.
    pub values: Vec<u64>,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CombinedTable {
    pub metric: Metric,
    pub columns: Vec<String>,
    pub rows: Vec<CombinedRow>,
}

impl CombinedTable {
    /// Header line: key column, one column per period, then `Total`.
    pub fn header(&self) -> Vec<String> {
        let mut header = Vec::with_capacity(self.columns.len() + 2);
        header.push(self.metric.key_header().to_string());
        header.extend(self.columns.iter().cloned());
        header.push("Total".to_string());
        header
    }

    pub fn records(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.rows.iter().map(|row| {
            let mut record = Vec::with_capacity(row.values.len() + 2);
            record.push(row.name.clone());
            record.extend(row.values.iter().map(u64::to_string));
            record.push(row.total.to_string());
            record
        })
    }
}

/// Full outer join of per-period results keyed by entity name. Every name
/// seen in any period gets a row; absent periods are filled with 0. Rows are
/// ordered by total descending, then name. Daily bookings stay a calendar
/// series, ordered by day of month.
pub fn combine(metric: Metric, periods: &[(String, &[CountRow])]) -> CombinedTable {
    let width = periods.len();
    let mut by_name: HashMap<&str, Vec<u64>> = HashMap::new();
    for (col, (_, rows)) in periods.iter().enumerate() {
        for row in rows.iter() {
            let values = by_name
                .entry(row.name.as_str())
                .or_insert_with(|| vec![0; width]);
            values[col] += row.count;
        }
    }

    let mut rows: Vec<CombinedRow> = by_name
        .into_iter()
        .map(|(name, values)| CombinedRow {
            name: name.to_string(),
            total: values.iter().sum(),
            values,
        })
        .collect();
    match metric {
        Metric::DailyBookings => rows.sort_by(|a, b| a.name.cmp(&b.name)),
        _ => rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name))),
    }

    CombinedTable {
        metric,
        columns: periods.iter().map(|(label, _)| label.clone()).collect(),
        rows,
    }
}

/// Re-key daily counts by day of month so different months line up.
pub fn by_day_of_month(daily: &[DailyCountRow]) -> Vec<CountRow> {
    use chrono::Datelike;
    daily
        .iter()
        .map(|d| CountRow::new(format!("{:02}", d.date.day()), d.count))
        .collect()
}
