//! Version-control capability layer.
//!
//! The synchronizer only ever talks to the [`Vcs`] trait. The libgit2-backed
//! implementation lives in `git2_backend`; tests use an in-memory fake.
//! Swapping engines (e.g. shelling out to `git`) means adding another
//! implementation here without touching the sync logic.

mod git2_backend;

#[cfg(test)]
pub(crate) mod fake;

use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::reference::RepositoryReference;

pub use git2_backend::Git2Vcs;

/// Name of the synthetic symbolic reference some remotes advertise.
pub const SYMBOLIC_HEAD: &str = "HEAD";

/// A branch as advertised by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteBranch {
    /// Short branch name, e.g. `feature/x`.
    pub name: String,
    /// Remote-tracking ref the branch is fetched into, e.g. `refs/remotes/origin/feature/x`.
    pub tracking_ref: String,
}

impl RemoteBranch {
    pub fn new(remote: &str, name: &str) -> Self {
        Self {
            name: name.to_string(),
            tracking_ref: format!("refs/remotes/{}/{}", remote, name),
        }
    }

    pub fn is_symbolic_head(&self) -> bool {
        self.name == SYMBOLIC_HEAD
    }
}

/// Failures surfaced by a [`Vcs`] implementation, one variant per operation.
///
/// The message carries the engine's own description; the synchronizer decides
/// how far each kind propagates.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum VcsError {
    #[error("clone failed: {0}")]
    Clone(String),
    #[error("open failed: {0}")]
    Open(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("listing local branches failed: {0}")]
    ListBranches(String),
    #[error("checkout of {branch} failed: {message}")]
    Checkout { branch: String, message: String },
    #[error("pull of {branch} failed: {message}")]
    Pull { branch: String, message: String },
    #[error("cleaning untracked files failed: {0}")]
    Clean(String),
}

/// Capability interface over an installed version-control engine.
///
/// Every operation reports failure explicitly; there is no partial success.
pub trait Vcs {
    type WorkingCopy;

    /// Full clone of `reference` into the existing (empty) directory `dest`,
    /// naming the remote `remote`.
    fn clone_repo(
        &self,
        reference: &RepositoryReference,
        dest: &Path,
        remote: &str,
    ) -> Result<Self::WorkingCopy, VcsError>;

    fn open(&self, path: &Path) -> Result<Self::WorkingCopy, VcsError>;

    /// Fetch every branch (and tags when asked) from `remote`.
    ///
    /// Ordering contract: the list starts with the remote's default branch
    /// when the engine can tell which one it is, followed by the other
    /// branches in the order the remote advertised them. Implementations that
    /// cannot query the default must keep plain advertisement order.
    fn fetch(
        &self,
        wc: &Self::WorkingCopy,
        remote: &str,
        include_tags: bool,
    ) -> Result<Vec<RemoteBranch>, VcsError>;

    fn local_branches(&self, wc: &Self::WorkingCopy) -> Result<BTreeSet<String>, VcsError>;

    /// Branch HEAD is attached to, `None` when detached or unborn.
    fn current_branch(&self, wc: &Self::WorkingCopy) -> Option<String>;

    /// Check out `branch`. With `create_from`, the local branch is created at
    /// that remote branch's tip first and set to track it.
    fn checkout(
        &self,
        wc: &Self::WorkingCopy,
        branch: &str,
        create_from: Option<&RemoteBranch>,
    ) -> Result<(), VcsError>;

    /// Bring the checked-out `branch` up to date with `remote`.
    fn pull(&self, wc: &Self::WorkingCopy, remote: &str, branch: &str) -> Result<(), VcsError>;

    /// Remove untracked files and directories from the working tree.
    fn clean_untracked(&self, wc: &Self::WorkingCopy) -> Result<(), VcsError>;
}
