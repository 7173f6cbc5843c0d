use chrono::{Month, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

use crate::util::{days_in_month, format_number};

/// One month of data, e.g. March 2025.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Period {
    pub month: u32,
    pub year: i32,
    pub label: String,
}

impl Period {
    /// Builds a period with the default English label ("March 2025").
    /// Returns `None` when `month` is not 1..=12.
    pub fn new(month: u32, year: i32) -> Option<Self> {
        let name = Month::try_from(u8::try_from(month).ok()?).ok()?.name();
        Some(Self {
            month,
            year,
            label: format!("{} {}", name, year),
        })
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Two-digit month code used in file names ("03").
    pub fn code(&self) -> String {
        format!("{:02}", self.month)
    }

    /// `MM-YYYY` suffix embedded in every source file name.
    pub fn suffix(&self) -> String {
        format!("{:02}-{}", self.month, self.year)
    }

    pub fn days_in_month(&self) -> u32 {
        days_in_month(self.year, self.month)
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        use chrono::Datelike;
        date.year() == self.year && date.month() == self.month
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix())
    }
}

// ---------------------------------------------------------------------------
// Raw CSV rows. Everything is optional text; the loader does the typing.
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RawBooking {
    #[serde(rename = "BookingID", alias = "id")]
    pub booking_id: Option<String>,
    #[serde(rename = "TourID")]
    pub tour_id: Option<String>,
    #[serde(rename = "GuideID")]
    pub guide_id: Option<String>,
    #[serde(rename = "BookingDate")]
    pub booking_date: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawTour {
    #[serde(rename = "TourID", alias = "id")]
    pub tour_id: Option<String>,
    #[serde(rename = "TourName")]
    pub tour_name: Option<String>,
    #[serde(rename = "TourLocation")]
    pub tour_location: Option<String>,
    #[serde(rename = "TimeStart")]
    pub time_start: Option<String>,
    #[serde(rename = "TimeEnd")]
    pub time_end: Option<String>,
    #[serde(rename = "Op_Monday")]
    pub op_monday: Option<String>,
    #[serde(rename = "Op_Tuesday")]
    pub op_tuesday: Option<String>,
    #[serde(rename = "Op_Wednesday")]
    pub op_wednesday: Option<String>,
    #[serde(rename = "Op_Thursday")]
    pub op_thursday: Option<String>,
    #[serde(rename = "Op_Friday")]
    pub op_friday: Option<String>,
    #[serde(rename = "Op_Saturday")]
    pub op_saturday: Option<String>,
    #[serde(rename = "Op_Sunday")]
    pub op_sunday: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawGuide {
    #[serde(rename = "GuideID", alias = "id")]
    pub guide_id: Option<String>,
    #[serde(rename = "GuideName")]
    pub guide_name: Option<String>,
    #[serde(rename = "GuideLocation")]
    pub guide_location: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawAvailability {
    #[serde(rename = "GuideID")]
    pub guide_id: Option<String>,
    #[serde(rename = "AvailabilityDate")]
    pub availability_date: Option<String>,
    #[serde(rename = "GuideAvailability")]
    pub guide_availability: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RawSkill {
    #[serde(rename = "GuideID")]
    pub guide_id: Option<String>,
    #[serde(rename = "TourID", alias = "SkillID")]
    pub skill_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Clean, typed records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub booking_id: String,
    pub tour_id: Option<String>,
    pub guide_id: Option<String>,
    pub booking_date: NaiveDate,
}

/// Weekly operating flags, Monday first.
pub type OperatingWeek = [bool; 7];

#[derive(Debug, Clone, PartialEq)]
pub struct Tour {
    pub tour_id: String,
    pub name: String,
    pub location: String,
    pub time_start: String,
    pub time_end: String,
    pub operating: OperatingWeek,
}

impl Tour {
    /// Number of weekdays the tour runs on, always within 0..=7.
    pub fn operating_days(&self) -> u64 {
        self.operating.iter().filter(|d| **d).count() as u64
    }

    pub fn time_slot(&self) -> String {
        format!("{} - {}", self.time_start, self.time_end)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Guide {
    pub guide_id: String,
    pub name: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityRecord {
    pub guide_id: Option<String>,
    pub date: NaiveDate,
    pub slot: Option<String>,
}

impl AvailabilityRecord {
    /// A record counts toward availability only if its slot has content.
    pub fn has_slot(&self) -> bool {
        self.slot.as_deref().map(|s| !s.trim().is_empty()).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillRecord {
    pub guide_id: Option<String>,
    pub skill_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Report rows
// ---------------------------------------------------------------------------

/// Entity name with an integer metric value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountRow {
    pub name: String,
    pub count: u64,
}

impl CountRow {
    pub fn new(name: impl Into<String>, count: u64) -> Self {
        Self {
            name: name.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct DailyCountRow {
    #[serde(rename = "BookingDate")]
    #[tabled(rename = "BookingDate")]
    pub date: NaiveDate,
    #[serde(rename = "Bookings")]
    #[tabled(rename = "Bookings")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Tabled)]
pub struct OccupancyRow {
    #[serde(rename = "GuideName")]
    #[tabled(rename = "GuideName")]
    pub guide_name: String,
    #[serde(rename = "DaysOccupied")]
    #[tabled(rename = "DaysOccupied")]
    pub days_occupied: u64,
    #[serde(rename = "AvailableDays")]
    #[tabled(rename = "AvailableDays")]
    pub available_days: u64,
    /// `None` when the guide has no availability days.
    #[serde(rename = "OccupancyPct")]
    #[tabled(rename = "OccupancyPct", display_with = "display_pct")]
    pub occupancy_pct: Option<f64>,
    #[serde(rename = "ExceedsAvailability")]
    #[tabled(rename = "ExceedsAvailability")]
    pub exceeds_availability: bool,
}

fn display_pct(pct: &Option<f64>) -> String {
    match pct {
        Some(p) => format_number(*p, 2),
        None => "undefined".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct TimeSlotRow {
    #[serde(rename = "TourLocation")]
    #[tabled(rename = "TourLocation")]
    pub location: String,
    #[serde(rename = "TimeSlot")]
    #[tabled(rename = "TimeSlot")]
    pub time_slot: String,
    #[serde(rename = "Count")]
    #[tabled(rename = "Count")]
    pub count: u64,
}

/// A guide whose availability exceeds the days of the period's month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct DataInconsistency {
    #[serde(rename = "GuideName")]
    #[tabled(rename = "GuideName")]
    pub guide_name: String,
    #[serde(rename = "AvailableDays")]
    #[tabled(rename = "AvailableDays")]
    pub available_days: u64,
    #[serde(rename = "DaysInMonth")]
    #[tabled(rename = "DaysInMonth")]
    pub days_in_month: u32,
}

/// An availability record dated outside its period's month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Tabled)]
pub struct OutOfPeriodRow {
    #[serde(rename = "GuideName")]
    #[tabled(rename = "GuideName")]
    pub guide_name: String,
    #[serde(rename = "AvailabilityDate")]
    #[tabled(rename = "AvailabilityDate")]
    pub date: NaiveDate,
}

/// The count-valued metrics, with the headers and file stems used when they
/// are rendered or exported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    TopTours,
    ActiveGuides,
    AvailableDays,
    NotAvailableDays,
    OccupiedDays,
    Certifications,
    OperatingDays,
    DailyBookings,
}

impl Metric {
    pub fn file_stem(&self) -> &'static str {
        match self {
            Metric::TopTours => "top_tours",
            Metric::ActiveGuides => "active_guides",
            Metric::AvailableDays => "available_days",
            Metric::NotAvailableDays => "not_available_days",
            Metric::OccupiedDays => "occupied_days",
            Metric::Certifications => "certifications",
            Metric::OperatingDays => "operating_days",
            Metric::DailyBookings => "daily_bookings",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            Metric::TopTours => "Most Booked Tours",
            Metric::ActiveGuides => "Most Active Guides",
            Metric::AvailableDays => "Guide Availability Days",
            Metric::NotAvailableDays => "Guide Not Available Days",
            Metric::OccupiedDays => "Guide Occupied Days",
            Metric::Certifications => "Guides Certified for the Most Tours",
            Metric::OperatingDays => "Operating Days by Location",
            Metric::DailyBookings => "Daily Bookings by Day of Month",
        }
    }

    pub fn key_header(&self) -> &'static str {
        match self {
            Metric::TopTours => "TourName",
            Metric::OperatingDays => "TourLocation",
            Metric::DailyBookings => "DayOfMonth",
            _ => "GuideName",
        }
    }

    pub fn value_header(&self) -> &'static str {
        match self {
            Metric::TopTours | Metric::ActiveGuides | Metric::DailyBookings => "Bookings",
            Metric::AvailableDays => "AvailableDays",
            Metric::NotAvailableDays => "NotAvailableDays",
            Metric::OccupiedDays => "DaysOccupied",
            Metric::Certifications => "Certifications",
            Metric::OperatingDays => "OperatingDays",
        }
    }
}
