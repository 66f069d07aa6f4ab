//! Derived tables, computed from `records` by an ordered chain of calculators
//! inside one transaction.

pub mod attempts;
mod tables;

use std::time::{Duration, Instant};

use rusqlite::Transaction;
use serde::Serialize;

use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::store::{Store, storage_error};

pub use attempts::{attempt_deltas, attempt_percentages, successful_attempts};

/// One stage of the metrics chain. Later stages read columns written by
/// earlier ones, so the order in [`Calculator::ALL`] matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Calculator {
    MaxLifts,
    SuccessfulAttempts,
    LiftDifferences,
    AggregatedMetrics,
    WeightClassDistribution,
    AgeGroupPerformance,
    PerformanceTrends,
}

impl Calculator {
    pub const ALL: [Calculator; 7] = [
        Calculator::MaxLifts,
        Calculator::SuccessfulAttempts,
        Calculator::LiftDifferences,
        Calculator::AggregatedMetrics,
        Calculator::WeightClassDistribution,
        Calculator::AgeGroupPerformance,
        Calculator::PerformanceTrends,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Calculator::MaxLifts => "max lifts",
            Calculator::SuccessfulAttempts => "successful attempts",
            Calculator::LiftDifferences => "lift differences",
            Calculator::AggregatedMetrics => "aggregated metrics",
            Calculator::WeightClassDistribution => "weight class distribution",
            Calculator::AgeGroupPerformance => "age group performance",
            Calculator::PerformanceTrends => "performance trends",
        }
    }

    pub fn execute(&self, tx: &Transaction<'_>, deadline: &Deadline) -> Result<(), LiftError> {
        deadline.check(self.name())?;
        match self {
            Calculator::MaxLifts => batch(tx, tables::MAX_LIFTS, self.name(), deadline),
            Calculator::SuccessfulAttempts => {
                attempts::write_successful_attempts(tx, deadline).map(|_| ())
            }
            Calculator::LiftDifferences => {
                attempts::write_lift_differences(tx, deadline).map(|_| ())
            }
            Calculator::AggregatedMetrics => {
                batch(tx, tables::AGGREGATED_SBD, "aggregated metrics (SBD)", deadline)?;
                batch(tx, tables::AGGREGATED_BENCH, "aggregated metrics (bench)", deadline)
            }
            Calculator::WeightClassDistribution => {
                batch(tx, tables::WEIGHT_CLASS_DISTRIBUTION, self.name(), deadline)
            }
            Calculator::AgeGroupPerformance => {
                batch(tx, tables::AGE_GROUP_PERFORMANCE, self.name(), deadline)
            }
            Calculator::PerformanceTrends => {
                batch(tx, tables::PERFORMANCE_TRENDS, self.name(), deadline)
            }
        }
    }
}

fn batch(
    tx: &Transaction<'_>,
    sql: &str,
    context: &str,
    deadline: &Deadline,
) -> Result<(), LiftError> {
    tx.execute_batch(sql)
        .map_err(|err| storage_error(err, context, deadline))
}

#[derive(Debug, Clone, Serialize)]
pub struct StageTiming {
    pub calculator: Calculator,
    pub elapsed_ms: u64,
}

/// Ordered registry of calculators. Extend it by appending; order is execution
/// order.
#[derive(Debug, Clone)]
pub struct MetricsPipeline {
    calculators: Vec<Calculator>,
}

impl Default for MetricsPipeline {
    fn default() -> Self {
        Self {
            calculators: Calculator::ALL.to_vec(),
        }
    }
}

impl MetricsPipeline {
    pub fn new(calculators: Vec<Calculator>) -> Self {
        Self { calculators }
    }

    pub fn with_calculator(mut self, calculator: Calculator) -> Self {
        self.calculators.push(calculator);
        self
    }

    pub fn calculators(&self) -> &[Calculator] {
        &self.calculators
    }

    /// Runs every calculator in order inside `tx`. Stops at the first failure;
    /// the caller decides whether to commit.
    pub fn execute(
        &self,
        tx: &Transaction<'_>,
        deadline: &Deadline,
    ) -> Result<Vec<StageTiming>, LiftError> {
        let mut timings = Vec::with_capacity(self.calculators.len());
        for calculator in &self.calculators {
            let started = Instant::now();
            calculator.execute(tx, deadline).inspect_err(|err| {
                tracing::warn!(stage = calculator.name(), error = %err, "metrics stage failed");
            })?;
            let elapsed_ms = millis(started.elapsed());
            tracing::debug!(stage = calculator.name(), elapsed_ms, "metrics stage done");
            timings.push(StageTiming {
                calculator: *calculator,
                elapsed_ms,
            });
        }
        Ok(timings)
    }

    /// Recomputes all derived tables in one transaction over the current
    /// `records`. Nothing is committed unless every stage succeeds.
    pub fn run(&self, store: &mut Store, deadline: &Deadline) -> Result<Vec<StageTiming>, LiftError> {
        let started = Instant::now();
        let timings = store.with_deadline(deadline, |conn| {
            let tx = conn
                .transaction()
                .map_err(|err| storage_error(err, "begin metrics", deadline))?;
            let timings = self.execute(&tx, deadline)?;
            tx.commit()
                .map_err(|err| storage_error(err, "commit metrics", deadline))?;
            Ok(timings)
        })?;
        tracing::info!(
            stages = timings.len(),
            elapsed_ms = millis(started.elapsed()),
            "metrics updated"
        );
        Ok(timings)
    }
}

fn millis(duration: Duration) -> u64 {
    duration.as_millis() as u64
}
