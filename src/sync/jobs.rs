use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::reference::{ReferenceError, RepositoryReference};

/// One line of the repository list, parsed or not.
///
/// Unparseable lines stay in the batch so they show up as failures instead of
/// silently vanishing.
#[derive(Debug, Clone)]
pub struct SyncJob {
    pub entry: String,
    pub reference: Result<RepositoryReference, ReferenceError>,
}

/// Read the repository list: one reference per line, trimmed, blanks skipped.
///
/// # Errors
/// Returns an error if the file cannot be read.
pub fn read_reference_list(path: &Path) -> Result<Vec<String>> {
    let txt = fs::read_to_string(path)
        .with_context(|| format!("repository list not found: {}", path.display()))?;
    Ok(parse_reference_list(&txt))
}

pub fn parse_reference_list(txt: &str) -> Vec<String> {
    txt.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn build_jobs(entries: &[String]) -> Vec<SyncJob> {
    entries
        .iter()
        .map(|entry| SyncJob {
            entry: entry.clone(),
            reference: RepositoryReference::parse(entry),
        })
        .collect()
}

/// Directory names claimed by more than one entry, with the entries claiming them.
///
/// Two spellings of the same repository (SSH and HTTPS) land in the same
/// directory; the later one simply updates what the earlier one cloned.
pub fn shared_directories(jobs: &[SyncJob]) -> Vec<(String, Vec<String>)> {
    let mut by_dir: HashMap<String, Vec<String>> = HashMap::new();
    let mut order = Vec::new();
    for job in jobs {
        if let Ok(r) = &job.reference {
            let dir = r.dir_name();
            let claimants = by_dir.entry(dir.clone()).or_default();
            if claimants.is_empty() {
                order.push(dir);
            }
            claimants.push(job.entry.clone());
        }
    }
    order
        .into_iter()
        .filter_map(|dir| {
            let claimants = by_dir.remove(&dir)?;
            (claimants.len() > 1).then_some((dir, claimants))
        })
        .collect()
}
