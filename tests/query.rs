mod common;

use assert_matches::assert_matches;

use liftmetrics::deadline::Deadline;
use liftmetrics::error::LiftError;
use liftmetrics::loader::RecordLoader;
use liftmetrics::metrics::MetricsPipeline;
use liftmetrics::store::Store;

use common::{row, sample_rows, write_csv};

fn two_meet_rows() -> Vec<String> {
    let mut rows = sample_rows();
    rows.push(row(&[
        ("Name", "Alice Smith"),
        ("Sex", "F"),
        ("Event", "SBD"),
        ("Equipment", "Raw"),
        ("AgeClass", "24-34"),
        ("WeightClassKg", "63"),
        ("Squat1Kg", "105"),
        ("Squat2Kg", "110"),
        ("Squat3Kg", "-112.5"),
        ("Best3SquatKg", "110"),
        ("Bench1Kg", "60"),
        ("Best3BenchKg", "60"),
        ("Deadlift1Kg", "135"),
        ("Best3DeadliftKg", "135"),
        ("TotalKg", "305"),
        ("Date", "2024-09-07"),
        ("MeetName", "Autumn Cup"),
    ]));
    rows
}

fn store_on_disk() -> (tempfile::TempDir, std::path::PathBuf) {
    let temp = tempfile::tempdir().unwrap();
    let csv = write_csv(temp.path(), "openipf-2024-abc.csv", &two_meet_rows());
    let db_path = temp.path().join("db").join("openipf.db");
    let mut store = Store::open(&db_path).unwrap();
    RecordLoader::load(&mut store, &csv, &Deadline::none()).unwrap();
    MetricsPipeline::default()
        .run(&mut store, &Deadline::none())
        .unwrap();
    (temp, db_path)
}

#[test]
fn names_are_distinct_and_sorted() {
    let (_temp, db_path) = store_on_disk();
    let store = Store::open_read_only(&db_path).unwrap();
    assert_eq!(
        store.lifter_names().unwrap(),
        vec!["Alice Smith", "Bob Jones", "Carl Young"]
    );
}

#[test]
fn details_are_newest_first_and_performance_oldest_first() {
    let (_temp, db_path) = store_on_disk();
    let store = Store::open_read_only(&db_path).unwrap();

    let details = store.lifter_details("Alice Smith").unwrap();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0].date, "2024-09-07");
    assert_eq!(details[0].meet_name.as_deref(), Some("Autumn Cup"));
    assert_eq!(details[0].successful_squat_attempts, 2);
    assert_eq!(details[1].squat_perc[1], Some(100.0));

    let performance = store.lifter_performance("Alice Smith").unwrap();
    assert_eq!(performance[0].date, "2023-05-14");
    assert_eq!(performance[1].total, Some(305.0));
}

#[test]
fn stats_average_across_meets() {
    let (_temp, db_path) = store_on_disk();
    let store = Store::open_read_only(&db_path).unwrap();

    let stats = store.lifter_stats("Alice Smith").unwrap();
    assert_eq!(stats.avg_squat_success, Some(1.5));

    let report = store.lifter_report("Alice Smith").unwrap();
    assert_eq!(report.details.len(), 2);
    assert_eq!(report.stats, stats);
}

#[test]
fn unknown_lifter_is_not_found() {
    let (_temp, db_path) = store_on_disk();
    let store = Store::open_read_only(&db_path).unwrap();

    assert_matches!(store.lifter_details("Nobody"), Err(LiftError::LifterNotFound(_)));
    assert_matches!(store.lifter_stats("Nobody"), Err(LiftError::LifterNotFound(_)));
    assert_matches!(
        store.lifter_performance("Nobody"),
        Err(LiftError::LifterNotFound(_))
    );
}

#[test]
fn read_only_store_rejects_writes() {
    let (_temp, db_path) = store_on_disk();
    let store = Store::open_read_only(&db_path).unwrap();
    assert!(store.connection().execute("DELETE FROM records", []).is_err());
}
