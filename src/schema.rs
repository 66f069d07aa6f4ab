//! SQLite schema for the raw records and every derived table.

pub const CURRENT_VERSION: i32 = 1;

pub const SCHEMA_VERSION_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    ID TEXT PRIMARY KEY,
    Name TEXT,
    Sex TEXT,
    Event TEXT,
    Equipment TEXT,
    Age REAL,
    AgeClass TEXT,
    BirthYearClass TEXT,
    Division TEXT,
    BodyweightKg REAL,
    WeightClassKg TEXT,
    Squat1Kg REAL,
    Squat2Kg REAL,
    Squat3Kg REAL,
    Squat4Kg REAL,
    Best3SquatKg REAL,
    Bench1Kg REAL,
    Bench2Kg REAL,
    Bench3Kg REAL,
    Bench4Kg REAL,
    Best3BenchKg REAL,
    Deadlift1Kg REAL,
    Deadlift2Kg REAL,
    Deadlift3Kg REAL,
    Deadlift4Kg REAL,
    Best3DeadliftKg REAL,
    TotalKg REAL,
    Place TEXT,
    Dots REAL,
    Wilks REAL,
    Glossbrenner REAL,
    Goodlift REAL,
    Tested TEXT,
    Country TEXT,
    State TEXT,
    Federation TEXT,
    ParentFederation TEXT,
    Date TEXT,
    MeetCountry TEXT,
    MeetState TEXT,
    MeetTown TEXT,
    MeetName TEXT,
    Sanctioned TEXT
);

CREATE TABLE IF NOT EXISTS lifter_metrics (
    ID TEXT NOT NULL,
    Name TEXT,
    Date TEXT NOT NULL,
    Equipment TEXT NOT NULL,
    SuccessfulSquatAttempts INTEGER DEFAULT 0,
    SuccessfulBenchAttempts INTEGER DEFAULT 0,
    SuccessfulDeadliftAttempts INTEGER DEFAULT 0,
    TotalSuccessfulAttempts INTEGER DEFAULT 0,
    Squat1Perc REAL,
    Squat2Perc REAL,
    Squat3Perc REAL,
    Bench1Perc REAL,
    Bench2Perc REAL,
    Bench3Perc REAL,
    Deadlift1Perc REAL,
    Deadlift2Perc REAL,
    Deadlift3Perc REAL,
    Squat1To2Kg REAL,
    Squat2To3Kg REAL,
    Bench1To2Kg REAL,
    Bench2To3Kg REAL,
    Deadlift1To2Kg REAL,
    Deadlift2To3Kg REAL,
    PRIMARY KEY (ID, Date, Equipment)
);

CREATE TABLE IF NOT EXISTS max_lifts (
    ID TEXT PRIMARY KEY,
    Name TEXT,
    Date TEXT,
    MeetName TEXT,
    Equipment TEXT,
    Event TEXT,
    Best3SquatKg REAL,
    Best3BenchKg REAL,
    Best3DeadliftKg REAL,
    TotalKg REAL
);

CREATE TABLE IF NOT EXISTS aggregated_metrics_sbd (
    Name TEXT NOT NULL,
    Equipment TEXT NOT NULL,
    AvgSuccessfulSquatAttempts REAL,
    AvgSuccessfulBenchAttempts REAL,
    AvgSuccessfulDeadliftAttempts REAL,
    AvgTotalSuccessfulAttempts REAL,
    AvgSquat1Perc REAL,
    AvgSquat2Perc REAL,
    AvgSquat3Perc REAL,
    AvgBench1Perc REAL,
    AvgBench2Perc REAL,
    AvgBench3Perc REAL,
    AvgDeadlift1Perc REAL,
    AvgDeadlift2Perc REAL,
    AvgDeadlift3Perc REAL,
    AvgSquat1To2Kg REAL,
    AvgSquat2To3Kg REAL,
    AvgBench1To2Kg REAL,
    AvgBench2To3Kg REAL,
    AvgDeadlift1To2Kg REAL,
    AvgDeadlift2To3Kg REAL,
    PRIMARY KEY (Name, Equipment)
);

CREATE TABLE IF NOT EXISTS aggregated_metrics_bench (
    Name TEXT NOT NULL,
    Equipment TEXT NOT NULL,
    AvgSuccessfulBenchAttempts REAL,
    AvgBench1Perc REAL,
    AvgBench2Perc REAL,
    AvgBench3Perc REAL,
    AvgBench1To2Kg REAL,
    AvgBench2To3Kg REAL,
    PRIMARY KEY (Name, Equipment)
);

CREATE TABLE IF NOT EXISTS weight_class_distribution (
    WeightClass TEXT NOT NULL,
    Sex TEXT NOT NULL,
    Count INTEGER NOT NULL,
    PRIMARY KEY (WeightClass, Sex)
);

CREATE TABLE IF NOT EXISTS age_group_performance (
    AgeClass TEXT NOT NULL,
    Sex TEXT NOT NULL,
    AvgSquat REAL,
    AvgBench REAL,
    AvgDeadlift REAL,
    AvgTotal REAL,
    PRIMARY KEY (AgeClass, Sex)
);

CREATE TABLE IF NOT EXISTS performance_trends (
    Year TEXT NOT NULL,
    Sex TEXT NOT NULL,
    AvgSquat REAL,
    AvgBench REAL,
    AvgDeadlift REAL,
    AvgTotal REAL,
    PRIMARY KEY (Year, Sex)
);

CREATE INDEX IF NOT EXISTS idx_records_name_date ON records(Name, Date);
CREATE INDEX IF NOT EXISTS idx_lifter_metrics_name_date ON lifter_metrics(Name, Date);
"#;

/// Tables written by the metrics pipeline, in the order they are produced.
pub const DERIVED_TABLES: [&str; 7] = [
    "max_lifts",
    "lifter_metrics",
    "aggregated_metrics_sbd",
    "aggregated_metrics_bench",
    "weight_class_distribution",
    "age_group_performance",
    "performance_trends",
];
