use std::fs;
use std::path::Path;
use tempfile::TempDir;

use tour_insights::output;
use tour_insights::pipeline::{analyze_all, load_all, run};
use tour_insights::types::Metric;
use tour_insights::Config;

const TOUR_HEADER: &str = "id,TourName,TourLocation,TimeStart,TimeEnd,Op_Monday,Op_Tuesday,Op_Wednesday,Op_Thursday,Op_Friday,Op_Saturday,Op_Sunday";

fn write(dir: &Path, name: &str, content: &str) {
    fs::write(dir.join(name), content).unwrap();
}

/// March: the worked booking example plus two guides with availability.
fn write_march(dir: &Path) {
    write(
        dir,
        "bookings_03-2025.csv",
        "BookingID,TourID,GuideID,BookingDate\n\
         1,T1,G1,2025-03-01\n\
         2,T1,G2,2025-03-01\n\
         3,T2,G1,2025-03-02\n",
    );
    write(
        dir,
        "tours_03-2025.csv",
        &format!(
            "{TOUR_HEADER}\n\
             T1,old town,centro,09:00,11:00,1,1,1,1,1,0,0\n\
             T2,harbour,puerto,10:00,12:00,0,0,0,0,0,1,1\n"
        ),
    );
    write(
        dir,
        "guides_03-2025.csv",
        "id,GuideName,GuideLocation\nG1,ana,centro\nG2,luis,puerto\n",
    );
    write(
        dir,
        "guide_avail_03-2025.csv",
        "GuideID,AvailabilityDate,GuideAvailability\n\
         G1,2025-03-01,9-12\n\
         G1,2025-03-01,13-15\n\
         G1,2025-03-02,\n",
    );
    write(
        dir,
        "guide_skills_03-2025.csv",
        "GuideID,TourID\nG1,T1\nG1,T2\nG2,T1\n",
    );
}

/// April: a different guide roster so the combined tables need zero fill.
fn write_april(dir: &Path) {
    write(
        dir,
        "bookings_04-2025.csv",
        "BookingID,TourID,GuideID,BookingDate\n1,T1,G3,2025-04-10\n",
    );
    write(
        dir,
        "tours_04-2025.csv",
        &format!("{TOUR_HEADER}\nT1,old town,centro,09:00,11:00,1,0,0,0,0,0,0\n"),
    );
    write(
        dir,
        "guides_04-2025.csv",
        "id,GuideName,GuideLocation\nG3,eva,centro\n",
    );
    write(
        dir,
        "guide_avail_04-2025.csv",
        "GuideID,AvailabilityDate,GuideAvailability\nG3,2025-04-10,9-12\nG3,2025-04-11,9-12\n",
    );
    write(dir, "guide_skills_04-2025.csv", "GuideID,TourID\nG3,T1\n");
}

fn config(dir: &Path, periods: &[&str]) -> Config {
    Config {
        data_dir: dir.to_path_buf(),
        output_dir: dir.join("out"),
        periods: periods.iter().map(|p| p.to_string()).collect(),
        ..Config::default()
    }
}

#[test]
fn single_period_matches_worked_examples() {
    let tmp = TempDir::new().unwrap();
    write_march(tmp.path());
    let report = run(&config(tmp.path(), &["03"])).unwrap();

    assert!(report.failures.is_empty());
    assert!(report.combined.is_empty());
    let march = &report.reports[0];

    let tours: Vec<(&str, u64)> = march
        .top_tours
        .iter()
        .map(|r| (r.name.as_str(), r.count))
        .collect();
    assert_eq!(tours, vec![("Old Town", 2), ("Harbour", 1)]);

    let daily: Vec<(String, u64)> = march
        .daily_bookings
        .iter()
        .map(|r| (r.date.to_string(), r.count))
        .collect();
    assert_eq!(
        daily,
        vec![("2025-03-01".to_string(), 2), ("2025-03-02".to_string(), 1)]
    );

    assert_eq!(march.available_days.len(), 1);
    assert_eq!(march.available_days[0].name, "Ana");
    assert_eq!(march.available_days[0].count, 1);
    assert_eq!(march.not_available.rows[0].count, 30);

    // Luis has bookings but no availability: occupancy is undefined.
    let luis = march
        .occupancy
        .iter()
        .find(|r| r.guide_name == "Luis")
        .unwrap();
    assert_eq!(luis.days_occupied, 1);
    assert_eq!(luis.occupancy_pct, None);
    let ana = march.occupancy.iter().find(|r| r.guide_name == "Ana").unwrap();
    assert_eq!(ana.occupancy_pct, Some(200.0));
    assert!(ana.exceeds_availability);

    assert_eq!(march.certifications[0].name, "Ana");
    assert_eq!(march.certifications[0].count, 2);
    assert_eq!(march.operating_days[0].name, "Centro");
    assert_eq!(march.operating_days[0].count, 5);
    assert_eq!(march.time_slots.len(), 2);
}

#[test]
fn failed_period_does_not_stop_the_others() {
    let tmp = TempDir::new().unwrap();
    write_march(tmp.path());
    write_april(tmp.path());
    let report = run(&config(tmp.path(), &["03", "04", "05"])).unwrap();

    assert_eq!(report.reports.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].period.suffix(), "05-2025");
    assert_eq!(report.failures[0].kind, "source_not_found");

    let available = report
        .combined
        .iter()
        .find(|t| t.metric == Metric::AvailableDays)
        .unwrap();
    assert_eq!(available.columns, vec!["March 2025", "April 2025"]);
    let names: Vec<&str> = available.rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Eva", "Ana"]);
    assert_eq!(available.rows[0].values, vec![0, 2]);
    assert_eq!(available.rows[1].values, vec![1, 0]);

    let tours = report
        .combined
        .iter()
        .find(|t| t.metric == Metric::TopTours)
        .unwrap();
    assert_eq!(tours.rows[0].name, "Old Town");
    assert_eq!(tours.rows[0].values, vec![2, 1]);
    assert_eq!(tours.rows[0].total, 3);
}

#[test]
fn runs_are_idempotent_and_write_outputs() {
    let tmp = TempDir::new().unwrap();
    write_march(tmp.path());
    write_april(tmp.path());
    let cfg = config(tmp.path(), &["03", "04"]);

    let (contexts, failures) = load_all(&cfg).unwrap();
    let first = analyze_all(&cfg, &contexts, failures.clone());
    let second = analyze_all(&cfg, &contexts, failures);
    assert_eq!(first.reports[0].available_days, second.reports[0].available_days);
    assert_eq!(first.combined, second.combined);

    fs::create_dir_all(&cfg.output_dir).unwrap();
    let written = output::write_period_report(&cfg.output_dir, &first.reports[0]).unwrap();
    assert!(written.iter().all(|p| p.exists()));
    let occupancy = fs::read_to_string(cfg.output_dir.join("occupancy_03-2025.csv")).unwrap();
    assert!(occupancy.starts_with("GuideName,DaysOccupied,AvailableDays,OccupancyPct"));
    assert!(occupancy.contains("Luis,1,0,,false"));

    let joined = output::write_joined_bookings(&cfg.output_dir, &contexts[0]).unwrap();
    let content = fs::read_to_string(joined).unwrap();
    assert!(content.starts_with("BookingID,BookingDate,TourID_Bookings,TourID_Tours"));

    let summary = output::write_run_summary(&cfg.output_dir, &first).unwrap();
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(summary).unwrap()).unwrap();
    assert_eq!(json["analyzed"].as_array().unwrap().len(), 2);
}
