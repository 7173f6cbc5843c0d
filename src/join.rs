//! Left outer joins between a period's tables.
//!
//! Orphaned foreign keys are not errors: the joined row keeps the left side
//! and leaves the missing side empty. Orphans and duplicate keys are counted
//! in a [`JoinReport`].

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::HashMap;
use tracing::warn;

use crate::types::{AvailabilityRecord, Booking, Guide, Period, SkillRecord, Tour};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct JoinReport {
    pub bookings_without_tour: usize,
    pub bookings_without_guide: usize,
    pub skills_without_guide: usize,
    pub availability_without_guide: usize,
    pub duplicate_tour_ids: usize,
    pub duplicate_guide_ids: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookingWithTourAndGuide<'a> {
    pub booking: &'a Booking,
    pub tour: Option<&'a Tour>,
    pub guide: Option<&'a Guide>,
}

impl BookingWithTourAndGuide<'_> {
    pub fn tour_name(&self) -> Option<&str> {
        self.tour.map(|t| t.name.as_str())
    }

    pub fn guide_name(&self) -> Option<&str> {
        self.guide.map(|g| g.name.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkillWithGuide<'a> {
    pub skill: &'a SkillRecord,
    pub guide: Option<&'a Guide>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AvailabilityWithGuide<'a> {
    pub record: &'a AvailabilityRecord,
    pub guide: Option<&'a Guide>,
}

/// Flat export row of the booking join. Both sides' ID columns are kept,
/// suffixed with the name of the table they came from.
#[derive(Debug, Clone, Serialize)]
pub struct JoinedBookingExport {
    #[serde(rename = "BookingID")]
    pub booking_id: String,
    #[serde(rename = "BookingDate")]
    pub booking_date: NaiveDate,
    #[serde(rename = "TourID_Bookings")]
    pub tour_id_bookings: Option<String>,
    #[serde(rename = "TourID_Tours")]
    pub tour_id_tours: Option<String>,
    #[serde(rename = "TourName")]
    pub tour_name: Option<String>,
    #[serde(rename = "TourLocation")]
    pub tour_location: Option<String>,
    #[serde(rename = "GuideID_Bookings")]
    pub guide_id_bookings: Option<String>,
    #[serde(rename = "GuideID_Guides")]
    pub guide_id_guides: Option<String>,
    #[serde(rename = "GuideName")]
    pub guide_name: Option<String>,
    #[serde(rename = "GuideLocation")]
    pub guide_location: Option<String>,
}

impl From<&BookingWithTourAndGuide<'_>> for JoinedBookingExport {
    fn from(row: &BookingWithTourAndGuide<'_>) -> Self {
        Self {
            booking_id: row.booking.booking_id.clone(),
            booking_date: row.booking.booking_date,
            tour_id_bookings: row.booking.tour_id.clone(),
            tour_id_tours: row.tour.map(|t| t.tour_id.clone()),
            tour_name: row.tour.map(|t| t.name.clone()),
            tour_location: row.tour.map(|t| t.location.clone()),
            guide_id_bookings: row.booking.guide_id.clone(),
            guide_id_guides: row.guide.map(|g| g.guide_id.clone()),
            guide_name: row.guide.map(|g| g.name.clone()),
            guide_location: row.guide.map(|g| g.location.clone()),
        }
    }
}

/// Index a lookup table by key. The first row with a given key wins; the
/// number of shadowed duplicates is returned alongside.
fn index_by<'a, T>(rows: &'a [T], key: impl Fn(&T) -> &str) -> (HashMap<&'a str, &'a T>, usize) {
    let mut map: HashMap<&'a str, &'a T> = HashMap::with_capacity(rows.len());
    let mut duplicates = 0usize;
    for row in rows {
        let k = key(row);
        if map.contains_key(k) {
            duplicates += 1;
        } else {
            map.insert(k, row);
        }
    }
    (map, duplicates)
}

fn lookup<'a, T>(index: &HashMap<&str, &'a T>, key: Option<&str>) -> Option<&'a T> {
    key.and_then(|k| index.get(k).copied())
}

/// All joins of one period.
#[derive(Debug, Clone)]
pub struct JoinedTables<'a> {
    pub bookings: Vec<BookingWithTourAndGuide<'a>>,
    pub skills: Vec<SkillWithGuide<'a>>,
    pub availability: Vec<AvailabilityWithGuide<'a>>,
    pub report: JoinReport,
}

pub fn join_all<'a>(
    period: &Period,
    bookings: &'a [Booking],
    tours: &'a [Tour],
    guides: &'a [Guide],
    availability: &'a [AvailabilityRecord],
    skills: &'a [SkillRecord],
) -> JoinedTables<'a> {
    let (tour_index, duplicate_tour_ids) = index_by(tours, |t| t.tour_id.as_str());
    let (guide_index, duplicate_guide_ids) = index_by(guides, |g| g.guide_id.as_str());

    let bookings = join_bookings_indexed(bookings, &tour_index, &guide_index);
    let skills = join_skills_indexed(skills, &guide_index);
    let availability = join_availability_indexed(availability, &guide_index);

    let report = JoinReport {
        bookings_without_tour: bookings.iter().filter(|b| b.tour.is_none()).count(),
        bookings_without_guide: bookings.iter().filter(|b| b.guide.is_none()).count(),
        skills_without_guide: skills.iter().filter(|s| s.guide.is_none()).count(),
        availability_without_guide: availability.iter().filter(|a| a.guide.is_none()).count(),
        duplicate_tour_ids,
        duplicate_guide_ids,
    };
    if report.duplicate_tour_ids > 0 || report.duplicate_guide_ids > 0 {
        warn!(
            period = %period,
            duplicate_tour_ids,
            duplicate_guide_ids,
            "Duplicate IDs in lookup tables; first occurrence used"
        );
    }
    if report.bookings_without_tour > 0 || report.bookings_without_guide > 0 {
        warn!(
            period = %period,
            without_tour = report.bookings_without_tour,
            without_guide = report.bookings_without_guide,
            "Bookings reference unknown tours or guides"
        );
    }

    JoinedTables {
        bookings,
        skills,
        availability,
        report,
    }
}

pub fn join_bookings<'a>(
    bookings: &'a [Booking],
    tours: &'a [Tour],
    guides: &'a [Guide],
) -> Vec<BookingWithTourAndGuide<'a>> {
    let (tour_index, _) = index_by(tours, |t| t.tour_id.as_str());
    let (guide_index, _) = index_by(guides, |g| g.guide_id.as_str());
    join_bookings_indexed(bookings, &tour_index, &guide_index)
}

pub fn join_skills<'a>(skills: &'a [SkillRecord], guides: &'a [Guide]) -> Vec<SkillWithGuide<'a>> {
    let (guide_index, _) = index_by(guides, |g| g.guide_id.as_str());
    join_skills_indexed(skills, &guide_index)
}

pub fn join_availability<'a>(
    availability: &'a [AvailabilityRecord],
    guides: &'a [Guide],
) -> Vec<AvailabilityWithGuide<'a>> {
    let (guide_index, _) = index_by(guides, |g| g.guide_id.as_str());
    join_availability_indexed(availability, &guide_index)
}

fn join_bookings_indexed<'a>(
    bookings: &'a [Booking],
    tours: &HashMap<&str, &'a Tour>,
    guides: &HashMap<&str, &'a Guide>,
) -> Vec<BookingWithTourAndGuide<'a>> {
    bookings
        .iter()
        .map(|booking| BookingWithTourAndGuide {
            booking,
            tour: lookup(tours, booking.tour_id.as_deref()),
            guide: lookup(guides, booking.guide_id.as_deref()),
        })
        .collect()
}

fn join_skills_indexed<'a>(
    skills: &'a [SkillRecord],
    guides: &HashMap<&str, &'a Guide>,
) -> Vec<SkillWithGuide<'a>> {
    skills
        .iter()
        .map(|skill| SkillWithGuide {
            skill,
            guide: lookup(guides, skill.guide_id.as_deref()),
        })
        .collect()
}

fn join_availability_indexed<'a>(
    availability: &'a [AvailabilityRecord],
    guides: &HashMap<&str, &'a Guide>,
) -> Vec<AvailabilityWithGuide<'a>> {
    availability
        .iter()
        .map(|record| AvailabilityWithGuide {
            record,
            guide: lookup(guides, record.guide_id.as_deref()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
    }

    fn tour(id: &str, name: &str) -> Tour {
        Tour {
            tour_id: id.into(),
            name: name.into(),
            location: "Centro".into(),
            time_start: "09:00".into(),
            time_end: "11:00".into(),
            operating: [true; 7],
        }
    }

    fn guide(id: &str, name: &str) -> Guide {
        Guide {
            guide_id: id.into(),
            name: name.into(),
            location: "Centro".into(),
        }
    }

    fn booking(id: &str, tour: Option<&str>, guide: Option<&str>) -> Booking {
        Booking {
            booking_id: id.into(),
            tour_id: tour.map(Into::into),
            guide_id: guide.map(Into::into),
            booking_date: d(1),
        }
    }

    #[test]
    fn keeps_every_booking_row() {
        let tours = vec![tour("T1", "Old Town")];
        let guides = vec![guide("G1", "Ana")];
        let bookings = vec![
            booking("1", Some("T1"), Some("G1")),
            booking("2", Some("T404"), Some("G1")),
            booking("3", Some("T1"), None),
        ];
        let joined = join_bookings(&bookings, &tours, &guides);
        assert_eq!(joined.len(), 3);
        assert_eq!(joined[0].tour_name(), Some("Old Town"));
        assert_eq!(joined[1].tour, None);
        assert_eq!(joined[1].guide_name(), Some("Ana"));
        assert_eq!(joined[2].guide, None);
    }

    #[test]
    fn first_duplicate_key_wins_and_is_reported() {
        let period = Period::new(3, 2025).unwrap();
        let tours = vec![tour("T1", "First"), tour("T1", "Second")];
        let guides = vec![guide("G1", "Ana")];
        let bookings = vec![booking("1", Some("T1"), Some("G9"))];
        let skills = vec![SkillRecord {
            guide_id: Some("G1".into()),
            skill_id: Some("T1".into()),
        }];
        let availability = vec![AvailabilityRecord {
            guide_id: Some("G2".into()),
            date: d(2),
            slot: Some("9-12".into()),
        }];
        let joined = join_all(&period, &bookings, &tours, &guides, &availability, &skills);
        assert_eq!(joined.bookings[0].tour_name(), Some("First"));
        assert_eq!(joined.report.duplicate_tour_ids, 1);
        assert_eq!(joined.report.bookings_without_guide, 1);
        assert_eq!(joined.report.bookings_without_tour, 0);
        assert_eq!(joined.report.skills_without_guide, 0);
        assert_eq!(joined.report.availability_without_guide, 1);
    }

    #[test]
    fn export_keeps_both_id_columns() {
        let tours = vec![tour("T1", "Old Town")];
        let guides: Vec<Guide> = vec![];
        let bookings = vec![booking("1", Some("T1"), Some("G7"))];
        let joined = join_bookings(&bookings, &tours, &guides);
        let row = JoinedBookingExport::from(&joined[0]);
        assert_eq!(row.tour_id_bookings.as_deref(), Some("T1"));
        assert_eq!(row.tour_id_tours.as_deref(), Some("T1"));
        assert_eq!(row.guide_id_bookings.as_deref(), Some("G7"));
        assert_eq!(row.guide_id_guides, None);
    }
}
