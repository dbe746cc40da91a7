use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::git::VcsError;
use crate::reference::ReferenceError;

/// Which side of the existence check a repository went through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Cloned,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BranchAction {
    /// Created locally from the remote ref and checked out.
    Created,
    /// Already present; cleaned, checked out and pulled.
    Updated,
}

/// Per-branch result. Never escalated past the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchResult {
    pub name: String,
    pub action: BranchAction,
    /// Untracked-file cleanup failed before checkout; processing went on anyway.
    pub clean_warning: Option<VcsError>,
    pub error: Option<VcsError>,
}

impl BranchResult {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

impl fmt::Display for BranchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.error, self.action) {
            (Some(e), _) => write!(f, "{} (failed: {})", self.name, e),
            (None, BranchAction::Created) => write!(f, "{} (new)", self.name),
            (None, BranchAction::Updated) => write!(f, "{} (updated)", self.name),
        }
    }
}

/// Repository-level failure: whatever stopped this repository short.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),
    #[error("cannot create {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: io::Error },
    #[error(transparent)]
    Clone(VcsError),
    #[error(transparent)]
    Open(VcsError),
    #[error(transparent)]
    Fetch(VcsError),
    #[error(transparent)]
    ListBranches(VcsError),
    #[error(transparent)]
    DefaultCheckout(VcsError),
}

impl SyncError {
    pub fn stage(&self) -> &'static str {
        match self {
            SyncError::Reference(_) => "reference",
            SyncError::CreateDir { .. } => "create-dir",
            SyncError::Clone(_) => "clone",
            SyncError::Open(_) => "open",
            SyncError::Fetch(_) => "fetch",
            SyncError::ListBranches(_) => "list-branches",
            SyncError::DefaultCheckout(_) => "default-checkout",
        }
    }
}

/// Everything one `synchronize` call has to say about its repository.
#[derive(Debug)]
pub struct SyncOutcome {
    /// The list entry this outcome belongs to, verbatim.
    pub reference: String,
    pub path: Option<PathBuf>,
    pub mode: Option<SyncMode>,
    pub branches: Vec<BranchResult>,
    pub default_branch: Option<String>,
    pub final_branch: Option<String>,
    pub error: Option<SyncError>,
}

impl SyncOutcome {
    pub fn new(reference: impl Into<String>, path: PathBuf) -> Self {
        Self {
            reference: reference.into(),
            path: Some(path),
            mode: None,
            branches: Vec::new(),
            default_branch: None,
            final_branch: None,
            error: None,
        }
    }

    /// Outcome for a list entry that never became a reference.
    pub fn rejected(entry: impl Into<String>, err: ReferenceError) -> Self {
        Self {
            reference: entry.into(),
            path: None,
            mode: None,
            branches: Vec::new(),
            default_branch: None,
            final_branch: None,
            error: Some(err.into()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn failed_branches(&self) -> impl Iterator<Item = &BranchResult> {
        self.branches.iter().filter(|b| !b.is_ok())
    }

    pub fn created_count(&self) -> usize {
        self.branches
            .iter()
            .filter(|b| b.is_ok() && b.action == BranchAction::Created)
            .count()
    }

    pub fn updated_count(&self) -> usize {
        self.branches
            .iter()
            .filter(|b| b.is_ok() && b.action == BranchAction::Updated)
            .count()
    }
}
