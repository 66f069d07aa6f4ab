use std::path::Path;
use std::time::Instant;

use rusqlite::{Transaction, params};
use serde::Serialize;
use uuid::Uuid;

use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::record::{COLUMNS, Record};
use crate::store::{Store, storage_error};

/// Rows inserted between explicit deadline checks.
const CHECK_EVERY: usize = 5_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LoadSummary {
    pub rows: usize,
    pub elapsed_ms: u64,
}

pub struct RecordLoader;

impl RecordLoader {
    /// Parses every row of the CSV at `path`. The header row decides the
    /// column mapping.
    pub fn read_records(path: &Path) -> Result<Vec<Record>, LiftError> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(path)
            .map_err(|err| LiftError::Filesystem(format!("open {}: {err}", path.display())))?;

        let mut records = Vec::new();
        for row in reader.deserialize::<Record>() {
            records.push(row.map_err(csv_error)?);
        }
        tracing::debug!(rows = records.len(), path = %path.display(), "parsed CSV");
        Ok(records)
    }

    /// Replaces the contents of `records` inside `tx`, minting a fresh ID for
    /// every row. Nothing is visible to other connections until the caller
    /// commits.
    pub fn replace_records(
        tx: &Transaction<'_>,
        records: &mut [Record],
        deadline: &Deadline,
    ) -> Result<usize, LiftError> {
        tx.execute("DELETE FROM records", [])
            .map_err(|err| storage_error(err, "clear records", deadline))?;

        let sql = insert_sql();
        let mut stmt = tx
            .prepare(&sql)
            .map_err(|err| storage_error(err, "prepare record insert", deadline))?;

        for (index, record) in records.iter_mut().enumerate() {
            if index % CHECK_EVERY == 0 {
                deadline.check("load records")?;
            }
            record.id = Uuid::new_v4().to_string();
            stmt.execute(params![
                record.id,
                record.name,
                record.sex,
                record.event,
                record.equipment,
                record.age,
                record.age_class,
                record.birth_year_class,
                record.division,
                record.bodyweight_kg,
                record.weight_class_kg,
                record.squat1_kg,
                record.squat2_kg,
                record.squat3_kg,
                record.squat4_kg,
                record.best3_squat_kg,
                record.bench1_kg,
                record.bench2_kg,
                record.bench3_kg,
                record.bench4_kg,
                record.best3_bench_kg,
                record.deadlift1_kg,
                record.deadlift2_kg,
                record.deadlift3_kg,
                record.deadlift4_kg,
                record.best3_deadlift_kg,
                record.total_kg,
                record.place,
                record.dots,
                record.wilks,
                record.glossbrenner,
                record.goodlift,
                record.tested,
                record.country,
                record.state,
                record.federation,
                record.parent_federation,
                record.date,
                record.meet_country,
                record.meet_state,
                record.meet_town,
                record.meet_name,
                record.sanctioned,
            ])
            .map_err(|err| storage_error(err, "insert record", deadline))?;
        }
        Ok(records.len())
    }

    /// Parses `csv_path` and replaces the stored records in their own
    /// transaction.
    pub fn load(
        store: &mut Store,
        csv_path: &Path,
        deadline: &Deadline,
    ) -> Result<LoadSummary, LiftError> {
        let started = Instant::now();
        let mut records = Self::read_records(csv_path)?;

        let rows = store.with_deadline(deadline, |conn| {
            let tx = conn
                .transaction()
                .map_err(|err| storage_error(err, "begin load", deadline))?;
            let rows = Self::replace_records(&tx, &mut records, deadline)?;
            tx.commit()
                .map_err(|err| storage_error(err, "commit load", deadline))?;
            Ok(rows)
        })?;

        let summary = LoadSummary {
            rows,
            elapsed_ms: started.elapsed().as_millis() as u64,
        };
        tracing::info!(rows, elapsed_ms = summary.elapsed_ms, "records loaded");
        Ok(summary)
    }
}

fn insert_sql() -> String {
    let placeholders = vec!["?"; COLUMNS.len() + 1].join(", ");
    format!(
        "INSERT INTO records (ID, {}) VALUES ({placeholders})",
        COLUMNS.join(", ")
    )
}

fn csv_error(err: csv::Error) -> LiftError {
    let line = err.position().map(|pos| pos.line()).unwrap_or(0);
    match err.kind() {
        csv::ErrorKind::Io(io) => LiftError::Filesystem(io.to_string()),
        _ => LiftError::Parse {
            line,
            message: err.to_string(),
        },
    }
}
