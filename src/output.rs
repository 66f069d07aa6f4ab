use std::io::{self, Write};

use serde::Serialize;

use crate::query::LifterReport;
use crate::revision::RevisionStatus;
use crate::sync::{ProgressEvent, ProgressSink, RecomputeResult, SyncResult};

#[derive(Debug, Clone, Serialize)]
pub struct NamesResult {
    pub path: String,
    pub count: usize,
}

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_sync(result: &SyncResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_status(status: &RevisionStatus) -> io::Result<()> {
        Self::print_json(status)
    }

    pub fn print_recompute(result: &RecomputeResult) -> io::Result<()> {
        Self::print_json(result)
    }

    pub fn print_lifter(report: &LifterReport) -> io::Result<()> {
        Self::print_json(report)
    }

    pub fn print_names(result: &NamesResult) -> io::Result<()> {
        Self::print_json(result)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

/// Keeps stdout clean for the JSON result.
impl ProgressSink for JsonOutput {
    fn event(&self, _event: ProgressEvent) {}
}
