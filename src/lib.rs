//! Crate entry point for **repomirror**.
//!
//! Mirrors a list of remote git repositories to local disk for offline use,
//! keeping every branch of every repository up to date across runs.
//! Each submodule encapsulates one responsibility (reference parsing, the git
//! capability layer, the per-repository state machine, config, logging).
//! The `pub use` re-exports make the commands and the core types accessible
//! directly from the crate root.

pub mod config;
pub mod git;
mod logging;
mod org;
mod paths;
mod progress;
pub mod reference;
pub mod sync;

/// Re-export commonly used types and commands so they can be accessed from `repomirror::*`.
pub use git::{Git2Vcs, RemoteBranch, Vcs, VcsError};
pub use org::{GithubClient, ListOrgArgs, OrgRepo, cmd_list_org};
pub use paths::repomirror_home;
pub use reference::{ReferenceError, RepositoryReference};
pub use sync::{
    BatchReport, SyncArgs, SyncOptions, SyncOutcome, Synchronizer, cmd_sync, run_batch,
};
