use crate::config::Config;
use crate::error::{DataSourceError, LoadResult};
use crate::types::{
    AvailabilityRecord, Booking, Guide, Period, RawAvailability, RawBooking, RawGuide, RawSkill,
    RawTour, SkillRecord, Tour,
};
use crate::util::{non_empty, normalize_text, parse_date_safe, parse_flag};
use csv::{ReaderBuilder, StringRecord, Trim};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use tracing::{debug, info, warn};

const BOOKING_COLUMNS: &[&[&str]] = &[
    &["BookingID", "id"],
    &["TourID"],
    &["GuideID"],
    &["BookingDate"],
];
const TOUR_COLUMNS: &[&[&str]] = &[
    &["TourID", "id"],
    &["TourName"],
    &["TourLocation"],
    &["TimeStart"],
    &["TimeEnd"],
    &["Op_Monday"],
    &["Op_Tuesday"],
    &["Op_Wednesday"],
    &["Op_Thursday"],
    &["Op_Friday"],
    &["Op_Saturday"],
    &["Op_Sunday"],
];
const GUIDE_COLUMNS: &[&[&str]] = &[&["GuideID", "id"], &["GuideName"], &["GuideLocation"]];
const AVAILABILITY_COLUMNS: &[&[&str]] =
    &[&["GuideID"], &["AvailabilityDate"], &["GuideAvailability"]];
const SKILL_COLUMNS: &[&[&str]] = &[&["GuideID"]];

/// Two or more distinct IDs that share one name after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NameCollision {
    pub table: &'static str,
    pub name: String,
    pub ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LoadReport {
    pub bookings: usize,
    pub tours: usize,
    pub guides: usize,
    pub availability: usize,
    pub skills: usize,
    pub name_collisions: Vec<NameCollision>,
}

/// All five tables of one period.
#[derive(Debug, Clone)]
pub struct PeriodData {
    pub period: Period,
    pub bookings: Vec<Booking>,
    pub tours: Vec<Tour>,
    pub guides: Vec<Guide>,
    pub availability: Vec<AvailabilityRecord>,
    pub skills: Vec<SkillRecord>,
    pub report: LoadReport,
}

pub fn load_period(config: &Config, period: &Period) -> LoadResult<PeriodData> {
    let src = &config.sources;
    info!(period = %period, dir = %config.data_dir.display(), "Loading period");

    let bookings = read_table::<RawBooking, _, _>(
        "bookings",
        &config.source_path(&src.bookings, period),
        BOOKING_COLUMNS,
        clean_booking,
    )?;
    let tours = read_table::<RawTour, _, _>(
        "tours",
        &config.source_path(&src.tours, period),
        TOUR_COLUMNS,
        clean_tour,
    )?;
    let guides = read_table::<RawGuide, _, _>(
        "guides",
        &config.source_path(&src.guides, period),
        GUIDE_COLUMNS,
        clean_guide,
    )?;
    let availability = read_table::<RawAvailability, _, _>(
        "availability",
        &config.source_path(&src.availability, period),
        AVAILABILITY_COLUMNS,
        clean_availability,
    )?;
    let skills = read_table::<RawSkill, _, _>(
        "skills",
        &config.source_path(&src.skills, period),
        SKILL_COLUMNS,
        clean_skill,
    )?;

    let mut name_collisions = find_collisions(
        "guides",
        guides.iter().map(|g| (g.name.as_str(), g.guide_id.as_str())),
    );
    name_collisions.extend(find_collisions(
        "tours",
        tours.iter().map(|t| (t.name.as_str(), t.tour_id.as_str())),
    ));
    for c in &name_collisions {
        warn!(
            period = %period,
            table = c.table,
            name = %c.name,
            ids = ?c.ids,
            "Distinct IDs share one normalized name; they will be aggregated together"
        );
    }

    let report = LoadReport {
        bookings: bookings.len(),
        tours: tours.len(),
        guides: guides.len(),
        availability: availability.len(),
        skills: skills.len(),
        name_collisions,
    };
    debug!(period = %period, ?report, "Period loaded");

    Ok(PeriodData {
        period: period.clone(),
        bookings,
        tours,
        guides,
        availability,
        skills,
        report,
    })
}

/// Read one CSV source, check its header and convert every row with `clean`.
/// Any row that fails to deserialize or clean fails the whole source.
pub fn read_table<R, T, F>(
    source_name: &str,
    path: &Path,
    required: &[&[&str]],
    clean: F,
) -> LoadResult<Vec<T>>
where
    R: DeserializeOwned,
    F: Fn(R) -> Result<T, String>,
{
    if !path.is_file() {
        return Err(DataSourceError::SourceNotFound {
            source_name: source_name.to_string(),
            path: path.to_path_buf(),
        });
    }
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(Trim::All)
        .from_path(path)
        .map_err(|e| io_error(source_name, e))?;

    let headers: StringRecord = rdr.headers().map_err(|e| malformed_csv(source_name, e))?.clone();
    check_columns(source_name, &headers, required)?;

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(|e| malformed_csv(source_name, e))?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let raw: R = record
            .deserialize(Some(&headers))
            .map_err(|e| malformed(source_name, line, e.to_string()))?;
        rows.push(clean(raw).map_err(|msg| malformed(source_name, line, msg))?);
    }
    debug!(source = source_name, rows = rows.len(), path = %path.display(), "Read source");
    Ok(rows)
}

fn check_columns(
    source_name: &str,
    headers: &StringRecord,
    required: &[&[&str]],
) -> LoadResult<()> {
    for alternatives in required {
        if !alternatives.iter().any(|col| headers.iter().any(|h| h == *col)) {
            return Err(DataSourceError::SchemaMismatch {
                source_name: source_name.to_string(),
                column: alternatives.join("|"),
            });
        }
    }
    Ok(())
}

fn io_error(source_name: &str, e: csv::Error) -> DataSourceError {
    DataSourceError::Io {
        source_name: source_name.to_string(),
        message: e.to_string(),
    }
}

fn malformed_csv(source_name: &str, e: csv::Error) -> DataSourceError {
    let line = e.position().map(|p| p.line()).unwrap_or(0);
    if matches!(e.kind(), csv::ErrorKind::Io(_)) {
        return io_error(source_name, e);
    }
    malformed(source_name, line, e.to_string())
}

fn malformed(source_name: &str, line: u64, message: String) -> DataSourceError {
    DataSourceError::Malformed {
        source_name: source_name.to_string(),
        line,
        message,
    }
}

fn text(s: Option<String>) -> String {
    s.as_deref().map(normalize_text).unwrap_or_default()
}

fn id(s: Option<String>) -> Option<String> {
    non_empty(s.as_deref()).map(str::to_string)
}

fn required_id(s: Option<String>, column: &str) -> Result<String, String> {
    id(s).ok_or_else(|| format!("empty {}", column))
}

fn required_date(s: Option<String>, column: &str) -> Result<chrono::NaiveDate, String> {
    parse_date_safe(s.as_deref())
        .ok_or_else(|| format!("invalid {} '{}'", column, s.unwrap_or_default()))
}

pub fn clean_booking(row: RawBooking) -> Result<Booking, String> {
    Ok(Booking {
        booking_id: id(row.booking_id).unwrap_or_default(),
        tour_id: id(row.tour_id),
        guide_id: id(row.guide_id),
        booking_date: required_date(row.booking_date, "BookingDate")?,
    })
}

pub fn clean_tour(row: RawTour) -> Result<Tour, String> {
    let flags = [
        ("Op_Monday", row.op_monday),
        ("Op_Tuesday", row.op_tuesday),
        ("Op_Wednesday", row.op_wednesday),
        ("Op_Thursday", row.op_thursday),
        ("Op_Friday", row.op_friday),
        ("Op_Saturday", row.op_saturday),
        ("Op_Sunday", row.op_sunday),
    ];
    let mut operating = [false; 7];
    for (slot, (column, value)) in operating.iter_mut().zip(flags) {
        *slot = parse_flag(value.as_deref())
            .ok_or_else(|| format!("invalid {} '{}'", column, value.unwrap_or_default()))?;
    }
    Ok(Tour {
        tour_id: required_id(row.tour_id, "TourID")?,
        name: text(row.tour_name),
        location: text(row.tour_location),
        time_start: text(row.time_start),
        time_end: text(row.time_end),
        operating,
    })
}

pub fn clean_guide(row: RawGuide) -> Result<Guide, String> {
    Ok(Guide {
        guide_id: required_id(row.guide_id, "GuideID")?,
        name: text(row.guide_name),
        location: text(row.guide_location),
    })
}

pub fn clean_availability(row: RawAvailability) -> Result<AvailabilityRecord, String> {
    Ok(AvailabilityRecord {
        guide_id: id(row.guide_id),
        date: required_date(row.availability_date, "AvailabilityDate")?,
        slot: row.guide_availability,
    })
}

pub fn clean_skill(row: RawSkill) -> Result<SkillRecord, String> {
    Ok(SkillRecord {
        guide_id: id(row.guide_id),
        skill_id: id(row.skill_id),
    })
}

fn find_collisions<'a>(
    table: &'static str,
    entries: impl Iterator<Item = (&'a str, &'a str)>,
) -> Vec<NameCollision> {
    let mut by_name: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (name, id) in entries {
        if !name.is_empty() {
            by_name.entry(name).or_default().insert(id);
        }
    }
    by_name
        .into_iter()
        .filter(|(_, ids)| ids.len() > 1)
        .map(|(name, ids)| NameCollision {
            table,
            name: name.to_string(),
            ids: ids.into_iter().map(str::to_string).collect(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    fn march() -> Period {
        Period::new(3, 2025).unwrap()
    }

    fn config_for(dir: &Path) -> Config {
        Config {
            data_dir: dir.to_path_buf(),
            ..Config::default()
        }
    }

    fn write_valid_period(dir: &Path) {
        write(
            dir,
            "bookings_03-2025.csv",
            "BookingID,TourID,GuideID,BookingDate\n1,T1,G1,2025-03-01\n2,T1,,2025-03-01 10:00:00\n",
        );
        write(
            dir,
            "tours_03-2025.csv",
            "id,TourName,TourLocation,TimeStart,TimeEnd,Op_Monday,Op_Tuesday,Op_Wednesday,Op_Thursday,Op_Friday,Op_Saturday,Op_Sunday\n\
             T1,' old town walk ',CENTRO,09:00,11:00,1,1,0,0,1,True,false\n",
        );
        write(
            dir,
            "guides_03-2025.csv",
            "id,GuideName,GuideLocation\nG1,\"ana ruiz\",centro\nG2,Ana Ruiz,norte\n",
        );
        write(
            dir,
            "guide_avail_03-2025.csv",
            "GuideID,AvailabilityDate,GuideAvailability\nG1,2025-03-01,9-12\nG1,2025-03-02,\n",
        );
        write(dir, "guide_skills_03-2025.csv", "GuideID,TourID\nG1,T1\nG2,T1\n");
    }

    #[test]
    fn loads_and_normalizes_a_period() {
        let tmp = TempDir::new().unwrap();
        write_valid_period(tmp.path());
        let data = load_period(&config_for(tmp.path()), &march()).unwrap();

        assert_eq!(data.report.bookings, 2);
        assert_eq!(data.bookings[1].guide_id, None);
        assert_eq!(data.tours[0].name, "Old Town Walk");
        assert_eq!(data.tours[0].location, "Centro");
        assert_eq!(data.tours[0].operating_days(), 4);
        assert_eq!(data.guides[0].name, "Ana Ruiz");
        assert!(data.availability[0].has_slot());
        assert!(!data.availability[1].has_slot());
        assert_eq!(data.skills.len(), 2);

        assert_eq!(data.report.name_collisions.len(), 1);
        assert_eq!(data.report.name_collisions[0].ids, vec!["G1", "G2"]);
    }

    #[test]
    fn missing_file_is_source_not_found() {
        let tmp = TempDir::new().unwrap();
        write_valid_period(tmp.path());
        fs::remove_file(tmp.path().join("guide_skills_03-2025.csv")).unwrap();
        let err = load_period(&config_for(tmp.path()), &march()).unwrap_err();
        assert!(matches!(err, DataSourceError::SourceNotFound { ref source_name, .. } if source_name == "skills"));
    }

    #[test]
    fn missing_column_is_schema_mismatch() {
        let tmp = TempDir::new().unwrap();
        write_valid_period(tmp.path());
        write(
            tmp.path(),
            "bookings_03-2025.csv",
            "BookingID,TourID,GuideID\n1,T1,G1\n",
        );
        let err = load_period(&config_for(tmp.path()), &march()).unwrap_err();
        match err {
            DataSourceError::SchemaMismatch { column, .. } => assert_eq!(column, "BookingDate"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn bad_value_is_malformed_with_line() {
        let tmp = TempDir::new().unwrap();
        write_valid_period(tmp.path());
        write(
            tmp.path(),
            "guide_avail_03-2025.csv",
            "GuideID,AvailabilityDate,GuideAvailability\nG1,2025-03-01,9-12\nG1,not-a-date,9-12\n",
        );
        let err = load_period(&config_for(tmp.path()), &march()).unwrap_err();
        match err {
            DataSourceError::Malformed { source_name, line, .. } => {
                assert_eq!(source_name, "availability");
                assert_eq!(line, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unreadable_header_is_malformed() {
        let tmp = TempDir::new().unwrap();
        write_valid_period(tmp.path());
        fs::write(
            tmp.path().join("guides_03-2025.csv"),
            b"id,Guide\xffName,GuideLocation\nG1,Ana,Centro\n",
        )
        .unwrap();
        let err = load_period(&config_for(tmp.path()), &march()).unwrap_err();
        assert_eq!(err.kind(), "malformed");
        assert!(matches!(err, DataSourceError::Malformed { ref source_name, .. } if source_name == "guides"));
    }

    #[test]
    fn invalid_operating_flag_is_rejected() {
        let row = RawTour {
            tour_id: Some("T9".into()),
            tour_name: Some("x".into()),
            tour_location: Some("y".into()),
            time_start: None,
            time_end: None,
            op_monday: Some("often".into()),
            op_tuesday: None,
            op_wednesday: None,
            op_thursday: None,
            op_friday: None,
            op_saturday: None,
            op_sunday: None,
        };
        assert!(clean_tour(row).unwrap_err().contains("Op_Monday"));
    }
}
