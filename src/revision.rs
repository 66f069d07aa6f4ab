use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::client::DatasetClient;
use crate::deadline::Deadline;
use crate::error::LiftError;
use crate::fs_util;

pub const REVISION_MARKER: &str = "Revision:";

fn list_item_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?is)<li(?:\s[^>]*)?>(.*?)</li\s*>").expect("valid regex"))
}

fn tag_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?s)<[^>]*>").expect("valid regex"))
}

/// Finds the revision token in the list item whose text starts with
/// [`REVISION_MARKER`]. The last such item wins; a trailing period is dropped.
pub fn parse_revision_page(html: &str) -> Result<String, LiftError> {
    let mut revision = None;
    for caps in list_item_regex().captures_iter(html) {
        let inner = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
        let text = tag_regex().replace_all(inner, "");
        let text = text.trim_start();
        if let Some(rest) = text.strip_prefix(REVISION_MARKER) {
            let token = rest.trim();
            let token = token.strip_suffix('.').unwrap_or(token);
            revision = Some(token.to_string());
        }
    }

    match revision {
        Some(token) if !token.is_empty() => Ok(token),
        _ => Err(LiftError::RevisionNotFound(
            "no revision marker on remote page".to_string(),
        )),
    }
}

/// Revision embedded in a cached CSV name: the segment after the last hyphen,
/// without the `.csv` extension.
pub fn revision_from_filename(path: &Path) -> Result<String, LiftError> {
    let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();

    let parts: Vec<&str> = name.split('-').collect();
    if parts.len() > 1 {
        let last = parts[parts.len() - 1];
        let revision = match last.rsplit_once('.') {
            Some((stem, ext)) if ext.eq_ignore_ascii_case("csv") => stem,
            _ => last,
        };
        if !revision.is_empty() {
            return Ok(revision.to_string());
        }
    }
    Err(LiftError::RevisionNotFound(format!(
        "no revision in file name {name:?}"
    )))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RevisionStatus {
    pub local: Option<String>,
    pub remote: Option<String>,
    pub update_required: bool,
}

pub struct RevisionGate;

impl RevisionGate {
    /// Decides whether the local dataset in `data_dir` is stale.
    ///
    /// A missing local CSV always requires an update and skips the network. Any
    /// failure to read either revision is an error, never "up to date".
    pub fn check<C: DatasetClient + ?Sized>(
        client: &C,
        revision_url: &str,
        data_dir: &Path,
        csv_prefix: &str,
        deadline: &Deadline,
    ) -> Result<RevisionStatus, LiftError> {
        let Some(local_csv) = fs_util::find_csv_file(data_dir, csv_prefix)? else {
            tracing::info!(dir = %data_dir.display(), "no local CSV found; update required");
            return Ok(RevisionStatus {
                local: None,
                remote: None,
                update_required: true,
            });
        };

        let page = client.fetch_page(revision_url, deadline)?;
        let remote = parse_revision_page(&page)?;
        let local = revision_from_filename(&local_csv)?;

        let update_required = remote != local;
        if update_required {
            tracing::info!(%remote, %local, "update needed");
        } else {
            tracing::info!(%remote, "dataset is current");
        }

        Ok(RevisionStatus {
            local: Some(local),
            remote: Some(remote),
            update_required,
        })
    }
}
