use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::{error, info, warn};

use super::outcome::{BranchAction, BranchResult, SyncError, SyncMode, SyncOutcome};
use crate::git::{RemoteBranch, Vcs, VcsError};
use crate::reference::RepositoryReference;

/// Knobs the synchronizer passes through to the adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOptions {
    /// Name of the single remote every working copy has.
    pub remote: String,
    pub fetch_tags: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            remote: "origin".to_string(),
            fetch_tags: true,
        }
    }
}

/// Clone-or-update state machine for one repository at a time.
pub struct Synchronizer<'a, V: Vcs> {
    vcs: &'a V,
    options: SyncOptions,
}

impl<'a, V: Vcs> Synchronizer<'a, V> {
    pub fn new(vcs: &'a V, options: SyncOptions) -> Self {
        Self { vcs, options }
    }

    /// Bring `output_root/<dir name>` in line with `reference`.
    ///
    /// Never fails: every error ends up in the returned [`SyncOutcome`].
    pub fn synchronize(&self, reference: &RepositoryReference, output_root: &Path) -> SyncOutcome {
        let path = output_root.join(reference.dir_name());
        let mut outcome = SyncOutcome::new(reference.as_str(), path.clone());
        let name = reference.canonical_name();

        info!(
            repo = %name,
            url = %reference,
            form = ?reference.form(),
            dir = %path.display(),
            "processing repository"
        );

        let wc = match self.acquire(reference, &path, &mut outcome) {
            Ok(wc) => wc,
            Err(e) => {
                error!(repo = %name, stage = e.stage(), error = %e, "repository failed");
                outcome.error = Some(e);
                return outcome;
            }
        };

        if let Err(e) = self.materialize(&wc, name, &mut outcome) {
            error!(repo = %name, stage = e.stage(), error = %e, "repository failed");
            outcome.error = Some(e);
        }
        outcome.final_branch = self.vcs.current_branch(&wc);

        if !outcome.branches.is_empty() {
            info!(repo = %name, total = outcome.branches.len(), "branches processed");
            for b in &outcome.branches {
                info!(repo = %name, "  - {}", b);
            }
        }
        if let Ok(local) = self.vcs.local_branches(&wc) {
            let names: Vec<&str> = local.iter().map(String::as_str).collect();
            info!(
                repo = %name,
                total = local.len(),
                branches = %names.join(", "),
                head = outcome.final_branch.as_deref().unwrap_or("-"),
                "final branch summary"
            );
        }
        if outcome.is_success() {
            info!(repo = %name, "repository ready for offline use");
        }
        outcome
    }

    /// Clone into a missing (or empty) directory, open an existing one.
    fn acquire(
        &self,
        reference: &RepositoryReference,
        path: &Path,
        outcome: &mut SyncOutcome,
    ) -> Result<V::WorkingCopy, SyncError> {
        if is_absent(path) {
            outcome.mode = Some(SyncMode::Cloned);
            info!(repo = %reference.canonical_name(), "not found locally, cloning");
            fs::create_dir_all(path).map_err(|source| SyncError::CreateDir {
                path: path.to_path_buf(),
                source,
            })?;
            let wc = self
                .vcs
                .clone_repo(reference, path, &self.options.remote)
                .map_err(SyncError::Clone)?;
            info!(repo = %reference.canonical_name(), "cloned");
            Ok(wc)
        } else {
            outcome.mode = Some(SyncMode::Updated);
            info!(repo = %reference.canonical_name(), "exists locally, updating");
            self.vcs.open(path).map_err(SyncError::Open)
        }
    }

    /// Fetch, walk every remote branch, then settle on the default branch.
    fn materialize(
        &self,
        wc: &V::WorkingCopy,
        name: &str,
        outcome: &mut SyncOutcome,
    ) -> Result<(), SyncError> {
        let remote = self.options.remote.as_str();

        info!(repo = %name, remote, "fetching remote references");
        let advertised = self
            .vcs
            .fetch(wc, remote, self.options.fetch_tags)
            .map_err(SyncError::Fetch)?;

        let default = resolve_default_branch(&advertised, || self.vcs.current_branch(wc));
        outcome.default_branch = default.clone();

        let mut local = self.vcs.local_branches(wc).map_err(SyncError::ListBranches)?;
        let branches: Vec<&RemoteBranch> =
            advertised.iter().filter(|b| !b.is_symbolic_head()).collect();
        info!(repo = %name, count = branches.len(), "remote branches found");

        for branch in branches {
            let result = self.sync_branch(wc, name, branch, &mut local);
            outcome.branches.push(result);
        }

        match default {
            Some(default) => {
                self.clean(wc, name);
                info!(repo = %name, branch = %default, "checking out default branch");
                self.vcs
                    .checkout(wc, &default, None)
                    .map_err(SyncError::DefaultCheckout)?;
            }
            None => warn!(repo = %name, "no default branch could be resolved; leaving HEAD as is"),
        }
        Ok(())
    }

    fn sync_branch(
        &self,
        wc: &V::WorkingCopy,
        name: &str,
        branch: &RemoteBranch,
        local: &mut BTreeSet<String>,
    ) -> BranchResult {
        if !local.contains(&branch.name) {
            info!(repo = %name, branch = %branch.name, "creating local branch");
            let error = self.vcs.checkout(wc, &branch.name, Some(branch)).err();
            if error.is_none() {
                local.insert(branch.name.clone());
            }
            return self.finish(name, branch, BranchAction::Created, None, error);
        }

        info!(repo = %name, branch = %branch.name, "updating existing branch");
        let clean_warning = self.clean(wc, name);
        let error = self
            .vcs
            .checkout(wc, &branch.name, None)
            .and_then(|()| self.vcs.pull(wc, &self.options.remote, &branch.name))
            .err();
        self.finish(name, branch, BranchAction::Updated, clean_warning, error)
    }

    fn finish(
        &self,
        name: &str,
        branch: &RemoteBranch,
        action: BranchAction,
        clean_warning: Option<VcsError>,
        error: Option<VcsError>,
    ) -> BranchResult {
        if let Some(e) = &error {
            error!(repo = %name, branch = %branch.name, error = %e, "error processing branch");
        }
        BranchResult {
            name: branch.name.clone(),
            action,
            clean_warning,
            error,
        }
    }

    /// Clean untracked files; a failure is logged and handed back, never fatal.
    fn clean(&self, wc: &V::WorkingCopy, name: &str) -> Option<VcsError> {
        match self.vcs.clean_untracked(wc) {
            Ok(()) => None,
            Err(e) => {
                warn!(repo = %name, error = %e, "continuing with a dirty working tree");
                Some(e)
            }
        }
    }
}

/// First advertised branch that is not the symbolic `HEAD`, else whatever
/// `current` reports.
pub fn resolve_default_branch(
    advertised: &[RemoteBranch],
    current: impl FnOnce() -> Option<String>,
) -> Option<String> {
    advertised
        .iter()
        .find(|b| !b.is_symbolic_head())
        .map(|b| b.name.clone())
        .or_else(current)
}

/// Missing, or an empty directory left behind by an interrupted clone.
fn is_absent(path: &Path) -> bool {
    if !path.exists() {
        return true;
    }
    path.is_dir()
        && fs::read_dir(path)
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false)
}
