//! Read-only views over the finished tables, for consumers outside the
//! ingestion run.

use rusqlite::{Row, params};
use serde::Serialize;

use crate::error::LiftError;
use crate::store::Store;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifterDetails {
    pub name: String,
    pub age: Option<f64>,
    pub date: String,
    pub meet_name: Option<String>,
    pub equipment: String,
    pub successful_squat_attempts: i64,
    pub successful_bench_attempts: i64,
    pub successful_deadlift_attempts: i64,
    pub total_successful_attempts: i64,
    pub squat_perc: [Option<f64>; 3],
    pub bench_perc: [Option<f64>; 3],
    pub deadlift_perc: [Option<f64>; 3],
    pub squat1_to2_kg: Option<f64>,
    pub squat2_to3_kg: Option<f64>,
    pub bench1_to2_kg: Option<f64>,
    pub bench2_to3_kg: Option<f64>,
    pub deadlift1_to2_kg: Option<f64>,
    pub deadlift2_to3_kg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifterPerformance {
    pub date: String,
    pub squat: Option<f64>,
    pub bench: Option<f64>,
    pub deadlift: Option<f64>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LifterStats {
    pub name: String,
    pub avg_squat_success: Option<f64>,
    pub avg_bench_success: Option<f64>,
    pub avg_deadlift_success: Option<f64>,
    pub avg_squat1_to2_kg: Option<f64>,
    pub avg_squat2_to3_kg: Option<f64>,
    pub avg_bench1_to2_kg: Option<f64>,
    pub avg_bench2_to3_kg: Option<f64>,
    pub avg_deadlift1_to2_kg: Option<f64>,
    pub avg_deadlift2_to3_kg: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightClassCount {
    pub weight_class: String,
    pub sex: String,
    pub count: i64,
}

/// Averages for one (group, sex) pair; the group is an age class or a year.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupAverages {
    pub group: String,
    pub sex: String,
    pub avg_squat: Option<f64>,
    pub avg_bench: Option<f64>,
    pub avg_deadlift: Option<f64>,
    pub avg_total: Option<f64>,
}

/// Everything known about one lifter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifterReport {
    pub stats: LifterStats,
    pub details: Vec<LifterDetails>,
    pub performance: Vec<LifterPerformance>,
}

impl Store {
    pub fn lifter_report(&self, name: &str) -> Result<LifterReport, LiftError> {
        Ok(LifterReport {
            stats: self.lifter_stats(name)?,
            details: self.lifter_details(name)?,
            performance: self.lifter_performance(name)?,
        })
    }

    /// Distinct lifter names, sorted.
    pub fn lifter_names(&self) -> Result<Vec<String>, LiftError> {
        let mut stmt = self
            .connection()
            .prepare("SELECT DISTINCT Name FROM records WHERE Name IS NOT NULL ORDER BY Name")
            .map_err(|err| query_error("lifter names", err))?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(|err| query_error("lifter names", err))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| query_error("lifter names", err))
    }

    /// Every meet of `name` with its attempt metrics, newest first.
    pub fn lifter_details(&self, name: &str) -> Result<Vec<LifterDetails>, LiftError> {
        let mut stmt = self
            .connection()
            .prepare(
                "SELECT r.Name, r.Age, r.Date, r.MeetName, r.Equipment,
                    lm.SuccessfulSquatAttempts, lm.SuccessfulBenchAttempts,
                    lm.SuccessfulDeadliftAttempts, lm.TotalSuccessfulAttempts,
                    lm.Squat1Perc, lm.Squat2Perc, lm.Squat3Perc,
                    lm.Bench1Perc, lm.Bench2Perc, lm.Bench3Perc,
                    lm.Deadlift1Perc, lm.Deadlift2Perc, lm.Deadlift3Perc,
                    lm.Squat1To2Kg, lm.Squat2To3Kg,
                    lm.Bench1To2Kg, lm.Bench2To3Kg,
                    lm.Deadlift1To2Kg, lm.Deadlift2To3Kg
                FROM records r
                JOIN lifter_metrics lm
                  ON r.ID = lm.ID AND r.Date = lm.Date AND r.Equipment = lm.Equipment
                WHERE r.Name = ?1
                ORDER BY r.Date DESC",
            )
            .map_err(|err| query_error("lifter details", err))?;
        let rows = stmt
            .query_map(params![name], details_row)
            .map_err(|err| query_error("lifter details", err))?;
        let details = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| query_error("lifter details", err))?;
        non_empty(details, name)
    }

    /// Best lifts and total per meet, oldest first.
    pub fn lifter_performance(&self, name: &str) -> Result<Vec<LifterPerformance>, LiftError> {
        let mut stmt = self
            .connection()
            .prepare(
                "SELECT Date, Best3SquatKg, Best3BenchKg, Best3DeadliftKg, TotalKg
                FROM records WHERE Name = ?1 ORDER BY Date",
            )
            .map_err(|err| query_error("lifter performance", err))?;
        let rows = stmt
            .query_map(params![name], |row| {
                Ok(LifterPerformance {
                    date: row.get(0)?,
                    squat: row.get(1)?,
                    bench: row.get(2)?,
                    deadlift: row.get(3)?,
                    total: row.get(4)?,
                })
            })
            .map_err(|err| query_error("lifter performance", err))?;
        let performance = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| query_error("lifter performance", err))?;
        non_empty(performance, name)
    }

    pub fn lifter_stats(&self, name: &str) -> Result<LifterStats, LiftError> {
        let mut stmt = self
            .connection()
            .prepare(
                "SELECT r.Name,
                    AVG(lm.SuccessfulSquatAttempts), AVG(lm.SuccessfulBenchAttempts),
                    AVG(lm.SuccessfulDeadliftAttempts),
                    AVG(lm.Squat1To2Kg), AVG(lm.Squat2To3Kg),
                    AVG(lm.Bench1To2Kg), AVG(lm.Bench2To3Kg),
                    AVG(lm.Deadlift1To2Kg), AVG(lm.Deadlift2To3Kg)
                FROM records r
                JOIN lifter_metrics lm
                  ON r.ID = lm.ID AND r.Date = lm.Date AND r.Equipment = lm.Equipment
                WHERE r.Name = ?1
                GROUP BY r.Name",
            )
            .map_err(|err| query_error("lifter stats", err))?;
        let mut rows = stmt
            .query_map(params![name], |row| {
                Ok(LifterStats {
                    name: row.get(0)?,
                    avg_squat_success: row.get(1)?,
                    avg_bench_success: row.get(2)?,
                    avg_deadlift_success: row.get(3)?,
                    avg_squat1_to2_kg: row.get(4)?,
                    avg_squat2_to3_kg: row.get(5)?,
                    avg_bench1_to2_kg: row.get(6)?,
                    avg_bench2_to3_kg: row.get(7)?,
                    avg_deadlift1_to2_kg: row.get(8)?,
                    avg_deadlift2_to3_kg: row.get(9)?,
                })
            })
            .map_err(|err| query_error("lifter stats", err))?;
        match rows.next() {
            Some(stats) => stats.map_err(|err| query_error("lifter stats", err)),
            None => Err(LiftError::LifterNotFound(name.to_string())),
        }
    }

    pub fn weight_class_distribution(&self) -> Result<Vec<WeightClassCount>, LiftError> {
        let mut stmt = self
            .connection()
            .prepare(
                "SELECT WeightClass, Sex, Count FROM weight_class_distribution
                ORDER BY Sex, WeightClass",
            )
            .map_err(|err| query_error("weight class distribution", err))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(WeightClassCount {
                    weight_class: row.get(0)?,
                    sex: row.get(1)?,
                    count: row.get(2)?,
                })
            })
            .map_err(|err| query_error("weight class distribution", err))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| query_error("weight class distribution", err))
    }

    pub fn age_group_performance(&self) -> Result<Vec<GroupAverages>, LiftError> {
        self.group_averages(
            "SELECT AgeClass, Sex, AvgSquat, AvgBench, AvgDeadlift, AvgTotal
            FROM age_group_performance ORDER BY AgeClass, Sex",
            "age group performance",
        )
    }

    pub fn performance_trends(&self) -> Result<Vec<GroupAverages>, LiftError> {
        self.group_averages(
            "SELECT Year, Sex, AvgSquat, AvgBench, AvgDeadlift, AvgTotal
            FROM performance_trends ORDER BY Year, Sex",
            "performance trends",
        )
    }

    fn group_averages(&self, sql: &str, context: &str) -> Result<Vec<GroupAverages>, LiftError> {
        let mut stmt = self
            .connection()
            .prepare(sql)
            .map_err(|err| query_error(context, err))?;
        let rows = stmt
            .query_map([], |row| {
                Ok(GroupAverages {
                    group: row.get(0)?,
                    sex: row.get(1)?,
                    avg_squat: row.get(2)?,
                    avg_bench: row.get(3)?,
                    avg_deadlift: row.get(4)?,
                    avg_total: row.get(5)?,
                })
            })
            .map_err(|err| query_error(context, err))?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(|err| query_error(context, err))
    }
}

fn details_row(row: &Row<'_>) -> rusqlite::Result<LifterDetails> {
    Ok(LifterDetails {
        name: row.get(0)?,
        age: row.get(1)?,
        date: row.get(2)?,
        meet_name: row.get(3)?,
        equipment: row.get(4)?,
        successful_squat_attempts: row.get::<_, Option<i64>>(5)?.unwrap_or(0),
        successful_bench_attempts: row.get::<_, Option<i64>>(6)?.unwrap_or(0),
        successful_deadlift_attempts: row.get::<_, Option<i64>>(7)?.unwrap_or(0),
        total_successful_attempts: row.get::<_, Option<i64>>(8)?.unwrap_or(0),
        squat_perc: [row.get(9)?, row.get(10)?, row.get(11)?],
        bench_perc: [row.get(12)?, row.get(13)?, row.get(14)?],
        deadlift_perc: [row.get(15)?, row.get(16)?, row.get(17)?],
        squat1_to2_kg: row.get(18)?,
        squat2_to3_kg: row.get(19)?,
        bench1_to2_kg: row.get(20)?,
        bench2_to3_kg: row.get(21)?,
        deadlift1_to2_kg: row.get(22)?,
        deadlift2_to3_kg: row.get(23)?,
    })
}

fn non_empty<T>(rows: Vec<T>, name: &str) -> Result<Vec<T>, LiftError> {
    if rows.is_empty() {
        return Err(LiftError::LifterNotFound(name.to_string()));
    }
    Ok(rows)
}

fn query_error(context: &str, err: rusqlite::Error) -> LiftError {
    LiftError::Storage(format!("{context}: {err}"))
}
