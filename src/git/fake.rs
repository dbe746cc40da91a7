//! Scripted in-memory [`Vcs`] used by the synchronizer tests.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use super::{RemoteBranch, Vcs, VcsError};
use crate::reference::RepositoryReference;

#[derive(Debug, Clone)]
struct FakeCopy {
    url: String,
    local: BTreeSet<String>,
    head: Option<String>,
}

#[derive(Debug)]
pub(crate) struct FakeWc {
    path: PathBuf,
}

#[derive(Debug, Default)]
pub(crate) struct FakeVcs {
    /// Advertised branches per reference, default first.
    remotes: RefCell<HashMap<String, Vec<String>>>,
    copies: RefCell<HashMap<PathBuf, FakeCopy>>,
    fail_fetch: RefCell<HashSet<String>>,
    fail_checkout: RefCell<HashSet<String>>,
    fail_pull: RefCell<HashSet<String>>,
    fail_clean: RefCell<bool>,
    calls: RefCell<Vec<String>>,
}

impl FakeVcs {
    pub fn with_remote(url: &str, branches: &[&str]) -> Self {
        let vcs = Self::default();
        vcs.set_remote(url, branches);
        vcs
    }

    pub fn set_remote(&self, url: &str, branches: &[&str]) {
        self.remotes.borrow_mut().insert(
            url.to_string(),
            branches.iter().map(|b| b.to_string()).collect(),
        );
    }

    pub fn fail_fetch(&self, url: &str) {
        self.fail_fetch.borrow_mut().insert(url.to_string());
    }

    pub fn fail_checkout(&self, branch: &str) {
        self.fail_checkout.borrow_mut().insert(branch.to_string());
    }

    pub fn fail_pull(&self, branch: &str) {
        self.fail_pull.borrow_mut().insert(branch.to_string());
    }

    pub fn fail_clean(&self, on: bool) {
        *self.fail_clean.borrow_mut() = on;
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    pub fn local_at(&self, path: &Path) -> BTreeSet<String> {
        self.copies
            .borrow()
            .get(path)
            .map(|c| c.local.clone())
            .unwrap_or_default()
    }

    pub fn head_at(&self, path: &Path) -> Option<String> {
        self.copies.borrow().get(path).and_then(|c| c.head.clone())
    }

    fn record(&self, call: String) {
        self.calls.borrow_mut().push(call);
    }
}

impl Vcs for FakeVcs {
    type WorkingCopy = FakeWc;

    fn clone_repo(
        &self,
        reference: &RepositoryReference,
        dest: &Path,
        _remote: &str,
    ) -> Result<FakeWc, VcsError> {
        let url = reference.as_str();
        self.record(format!("clone {}", url));
        let remotes = self.remotes.borrow();
        let branches = remotes
            .get(url)
            .ok_or_else(|| VcsError::Clone(format!("repository {} not found", url)))?;
        if !dest.is_dir() {
            return Err(VcsError::Clone(format!("{} does not exist", dest.display())));
        }
        fs::write(dest.join(".fake-git"), url).map_err(|e| VcsError::Clone(e.to_string()))?;

        let first = branches.iter().find(|b| *b != "HEAD").cloned();
        self.copies.borrow_mut().insert(
            dest.to_path_buf(),
            FakeCopy {
                url: url.to_string(),
                local: first.iter().cloned().collect(),
                head: first,
            },
        );
        Ok(FakeWc {
            path: dest.to_path_buf(),
        })
    }

    fn open(&self, path: &Path) -> Result<FakeWc, VcsError> {
        self.record(format!("open {}", path.display()));
        if !self.copies.borrow().contains_key(path) {
            return Err(VcsError::Open("not a repository".to_string()));
        }
        Ok(FakeWc {
            path: path.to_path_buf(),
        })
    }

    fn fetch(
        &self,
        wc: &FakeWc,
        remote: &str,
        _include_tags: bool,
    ) -> Result<Vec<RemoteBranch>, VcsError> {
        self.record("fetch".to_string());
        let url = self.copies.borrow()[&wc.path].url.clone();
        if self.fail_fetch.borrow().contains(&url) {
            return Err(VcsError::Fetch("remote hung up".to_string()));
        }
        let remotes = self.remotes.borrow();
        Ok(remotes[&url]
            .iter()
            .map(|b| RemoteBranch::new(remote, b))
            .collect())
    }

    fn local_branches(&self, wc: &FakeWc) -> Result<BTreeSet<String>, VcsError> {
        Ok(self.local_at(&wc.path))
    }

    fn current_branch(&self, wc: &FakeWc) -> Option<String> {
        self.head_at(&wc.path)
    }

    fn checkout(
        &self,
        wc: &FakeWc,
        branch: &str,
        create_from: Option<&RemoteBranch>,
    ) -> Result<(), VcsError> {
        let verb = if create_from.is_some() { "create" } else { "checkout" };
        self.record(format!("{} {}", verb, branch));
        let failed = |message: &str| VcsError::Checkout {
            branch: branch.to_string(),
            message: message.to_string(),
        };
        if self.fail_checkout.borrow().contains(branch) {
            return Err(failed("scripted failure"));
        }
        let mut copies = self.copies.borrow_mut();
        let copy = copies.get_mut(&wc.path).ok_or_else(|| failed("no working copy"))?;
        if create_from.is_some() {
            if !copy.local.insert(branch.to_string()) {
                return Err(failed("branch already exists"));
            }
        } else if !copy.local.contains(branch) {
            return Err(failed("no such branch"));
        }
        copy.head = Some(branch.to_string());
        Ok(())
    }

    fn pull(&self, wc: &FakeWc, _remote: &str, branch: &str) -> Result<(), VcsError> {
        self.record(format!("pull {}", branch));
        let failed = |message: &str| VcsError::Pull {
            branch: branch.to_string(),
            message: message.to_string(),
        };
        if self.fail_pull.borrow().contains(branch) {
            return Err(failed("scripted failure"));
        }
        if self.head_at(&wc.path).as_deref() != Some(branch) {
            return Err(failed("not checked out"));
        }
        Ok(())
    }

    fn clean_untracked(&self, _wc: &FakeWc) -> Result<(), VcsError> {
        self.record("clean".to_string());
        if *self.fail_clean.borrow() {
            return Err(VcsError::Clean("permission denied".to_string()));
        }
        Ok(())
    }
}
