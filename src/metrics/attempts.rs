//! Per-record attempt statistics: success counts, percentages of the heaviest
//! attempt, and kg deltas between consecutive attempts.

use rusqlite::{Row, Transaction, params};

use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::store::storage_error;

const CHECK_EVERY: usize = 5_000;

/// Number of attempts with a strictly positive weight.
pub fn successful_attempts(attempts: [f64; 3]) -> i64 {
    attempts.iter().filter(|kg| **kg > 0.0).count() as i64
}

/// Each attempt as a percentage of the heaviest absolute attempt. All zeros
/// when no attempt was taken.
pub fn attempt_percentages(attempts: [f64; 3]) -> [f64; 3] {
    let max = attempts
        .iter()
        .map(|kg| kg.abs())
        .fold(0.0_f64, f64::max);
    if max == 0.0 {
        return [0.0; 3];
    }
    attempts.map(|kg| kg.abs() / max * 100.0)
}

/// `|a2| - |a1|` and `|a3| - |a2|`.
pub fn attempt_deltas(attempts: [f64; 3]) -> [f64; 2] {
    [
        attempts[1].abs() - attempts[0].abs(),
        attempts[2].abs() - attempts[1].abs(),
    ]
}

struct AttemptRow {
    id: String,
    name: String,
    date: String,
    equipment: String,
    squat: [f64; 3],
    bench: [f64; 3],
    deadlift: [f64; 3],
}

const ATTEMPT_QUERY: &str = "SELECT ID, Name, Date, Equipment, \
     Squat1Kg, Squat2Kg, Squat3Kg, \
     Bench1Kg, Bench2Kg, Bench3Kg, \
     Deadlift1Kg, Deadlift2Kg, Deadlift3Kg \
     FROM records";

fn attempt_row(row: &Row<'_>) -> rusqlite::Result<AttemptRow> {
    let kg = |idx: usize| -> rusqlite::Result<f64> {
        Ok(row.get::<_, Option<f64>>(idx)?.unwrap_or(0.0))
    };
    let text = |idx: usize| -> rusqlite::Result<String> {
        Ok(row.get::<_, Option<String>>(idx)?.unwrap_or_default())
    };
    Ok(AttemptRow {
        id: row.get(0)?,
        name: text(1)?,
        date: text(2)?,
        equipment: text(3)?,
        squat: [kg(4)?, kg(5)?, kg(6)?],
        bench: [kg(7)?, kg(8)?, kg(9)?],
        deadlift: [kg(10)?, kg(11)?, kg(12)?],
    })
}

/// Visits every stored record's attempts, checking `deadline` periodically.
fn for_each_attempt_row<F>(
    tx: &Transaction<'_>,
    deadline: &Deadline,
    context: &str,
    mut visit: F,
) -> Result<usize, LiftError>
where
    F: FnMut(&AttemptRow) -> Result<(), LiftError>,
{
    let mut select = tx
        .prepare(ATTEMPT_QUERY)
        .map_err(|err| storage_error(err, context, deadline))?;
    let mut rows = select
        .query([])
        .map_err(|err| storage_error(err, context, deadline))?;

    let mut seen = 0usize;
    while let Some(row) = rows
        .next()
        .map_err(|err| storage_error(err, context, deadline))?
    {
        if seen % CHECK_EVERY == 0 {
            deadline.check(context)?;
        }
        let attempt = attempt_row(row).map_err(|err| storage_error(err, context, deadline))?;
        visit(&attempt)?;
        seen += 1;
    }
    Ok(seen)
}

/// Opens (or refreshes) the `lifter_metrics` row of every record with its
/// success counts, and drops rows whose record is gone.
pub(crate) fn write_successful_attempts(
    tx: &Transaction<'_>,
    deadline: &Deadline,
) -> Result<usize, LiftError> {
    const CONTEXT: &str = "successful attempts";
    let mut upsert = tx
        .prepare(
            "INSERT INTO lifter_metrics (
                ID, Name, Date, Equipment,
                SuccessfulSquatAttempts, SuccessfulBenchAttempts,
                SuccessfulDeadliftAttempts, TotalSuccessfulAttempts
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT (ID, Date, Equipment) DO UPDATE SET
                Name = excluded.Name,
                SuccessfulSquatAttempts = excluded.SuccessfulSquatAttempts,
                SuccessfulBenchAttempts = excluded.SuccessfulBenchAttempts,
                SuccessfulDeadliftAttempts = excluded.SuccessfulDeadliftAttempts,
                TotalSuccessfulAttempts = excluded.TotalSuccessfulAttempts",
        )
        .map_err(|err| storage_error(err, CONTEXT, deadline))?;

    let rows = for_each_attempt_row(tx, deadline, CONTEXT, |row| {
        let squat = successful_attempts(row.squat);
        let bench = successful_attempts(row.bench);
        let deadlift = successful_attempts(row.deadlift);
        upsert
            .execute(params![
                row.id,
                row.name,
                row.date,
                row.equipment,
                squat,
                bench,
                deadlift,
                squat + bench + deadlift,
            ])
            .map_err(|err| storage_error(err, CONTEXT, deadline))?;
        Ok(())
    })?;

    tx.execute(
        "DELETE FROM lifter_metrics WHERE NOT EXISTS (
            SELECT 1 FROM records r
            WHERE r.ID = lifter_metrics.ID
              AND r.Date IS lifter_metrics.Date
              AND r.Equipment IS lifter_metrics.Equipment
        )",
        [],
    )
    .map_err(|err| storage_error(err, CONTEXT, deadline))?;
    Ok(rows)
}

/// Fills the percentage and delta columns of the rows opened by
/// [`write_successful_attempts`], matched on the shared key.
pub(crate) fn write_lift_differences(
    tx: &Transaction<'_>,
    deadline: &Deadline,
) -> Result<usize, LiftError> {
    const CONTEXT: &str = "lift differences";
    let mut update = tx
        .prepare(
            "UPDATE lifter_metrics SET
                Squat1Perc = ?1, Squat2Perc = ?2, Squat3Perc = ?3,
                Bench1Perc = ?4, Bench2Perc = ?5, Bench3Perc = ?6,
                Deadlift1Perc = ?7, Deadlift2Perc = ?8, Deadlift3Perc = ?9,
                Squat1To2Kg = ?10, Squat2To3Kg = ?11,
                Bench1To2Kg = ?12, Bench2To3Kg = ?13,
                Deadlift1To2Kg = ?14, Deadlift2To3Kg = ?15
            WHERE ID = ?16 AND Date = ?17 AND Equipment = ?18",
        )
        .map_err(|err| storage_error(err, CONTEXT, deadline))?;

    for_each_attempt_row(tx, deadline, CONTEXT, |row| {
        let [s1, s2, s3] = attempt_percentages(row.squat);
        let [b1, b2, b3] = attempt_percentages(row.bench);
        let [d1, d2, d3] = attempt_percentages(row.deadlift);
        let [s12, s23] = attempt_deltas(row.squat);
        let [b12, b23] = attempt_deltas(row.bench);
        let [d12, d23] = attempt_deltas(row.deadlift);
        update
            .execute(params![
                s1, s2, s3, b1, b2, b3, d1, d2, d3, s12, s23, b12, b23, d12, d23, row.id, row.date,
                row.equipment,
            ])
            .map_err(|err| storage_error(err, CONTEXT, deadline))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_only_positive_attempts() {
        assert_eq!(successful_attempts([-100.0, 102.5, 0.0]), 1);
        assert_eq!(successful_attempts([100.0, 105.0, 110.0]), 3);
        assert_eq!(successful_attempts([0.0, 0.0, 0.0]), 0);
        assert_eq!(successful_attempts([-1.0, -2.0, -3.0]), 0);
    }

    #[test]
    fn heaviest_attempt_is_exactly_one_hundred() {
        let [p1, p2, p3] = attempt_percentages([-100.0, 102.5, 0.0]);
        assert_eq!(p2, 100.0);
        assert!((p1 - 97.5609756).abs() < 1e-6);
        assert_eq!(p3, 0.0);

        // A failed attempt can still be the heaviest.
        let [q1, q2, q3] = attempt_percentages([180.0, -190.0, 185.0]);
        assert_eq!(q2, 100.0);
        assert!(q1 < 100.0 && q3 < 100.0);
    }

    #[test]
    fn no_attempts_means_no_percentages() {
        assert_eq!(attempt_percentages([0.0, 0.0, 0.0]), [0.0; 3]);
    }

    #[test]
    fn percentages_stay_in_range() {
        for attempts in [[60.0, -65.0, 67.5], [1.0, 0.0, -0.5], [200.0, 200.0, 200.0]] {
            for pct in attempt_percentages(attempts) {
                assert!((0.0..=100.0).contains(&pct));
            }
        }
    }

    #[test]
    fn deltas_use_absolute_weights() {
        assert_eq!(attempt_deltas([-100.0, 102.5, 0.0]), [2.5, -102.5]);
        assert_eq!(attempt_deltas([140.0, 140.0, -145.0]), [0.0, 5.0]);
    }
}
