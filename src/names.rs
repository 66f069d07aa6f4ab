use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::deadline::CancelFlag;
use crate::error::LiftError;
use crate::fs_util;
use crate::store::Store;

/// Granularity at which the refresher notices cancellation while idle.
const POLL_STEP: Duration = Duration::from_millis(100);

/// Shared list of lifter names. Readers share the lock; a refresh holds it
/// exclusively only to swap in the new list.
#[derive(Debug, Clone, Default)]
pub struct NameCache {
    names: Arc<RwLock<Vec<String>>>,
}

impl NameCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        match self.names.read() {
            Ok(names) => names.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn len(&self) -> usize {
        match self.names.read() {
            Ok(names) => names.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        match self.names.read() {
            Ok(names) => names.binary_search_by(|entry| entry.as_str().cmp(name)).is_ok(),
            Err(poisoned) => poisoned
                .into_inner()
                .binary_search_by(|entry| entry.as_str().cmp(name))
                .is_ok(),
        }
    }

    /// Reloads the names from `store`. The query runs before the write lock is
    /// taken.
    pub fn refresh(&self, store: &Store) -> Result<usize, LiftError> {
        let fresh = store.lifter_names()?;
        let count = fresh.len();
        match self.names.write() {
            Ok(mut names) => *names = fresh,
            Err(poisoned) => *poisoned.into_inner() = fresh,
        }
        Ok(count)
    }

    /// Refreshes from a read-only connection to `db_path` every `interval`
    /// until `cancel` is set. Failed refreshes are logged and keep the old list.
    pub fn spawn_refresher(
        &self,
        db_path: PathBuf,
        interval: Duration,
        cancel: CancelFlag,
    ) -> JoinHandle<()> {
        let cache = self.clone();
        thread::spawn(move || {
            while !cancel.is_cancelled() {
                match Store::open_read_only(&db_path).and_then(|store| cache.refresh(&store)) {
                    Ok(count) => tracing::debug!(count, "name cache refreshed"),
                    Err(err) => tracing::warn!(error = %err, "name cache refresh failed"),
                }
                let next = Instant::now() + interval;
                while !cancel.is_cancelled() && Instant::now() < next {
                    thread::sleep(POLL_STEP.min(next.saturating_duration_since(Instant::now())));
                }
            }
        })
    }
}

/// Writes every distinct lifter name to `path` as a sorted JSON array.
pub fn export_lifter_names(store: &Store, path: &Path) -> Result<usize, LiftError> {
    let names = store.lifter_names()?;
    let json = serde_json::to_vec_pretty(&names)
        .map_err(|err| LiftError::Filesystem(err.to_string()))?;
    fs_util::write_bytes_atomic(path, &json)?;
    tracing::info!(count = names.len(), path = %path.display(), "lifter names exported");
    Ok(names.len())
}
