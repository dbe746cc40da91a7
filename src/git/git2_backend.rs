use git2::{
    AutotagOption, BranchType, Cred, CredentialType, Direction, FetchOptions, RemoteCallbacks,
    Repository, Status, StatusOptions,
    build::{CheckoutBuilder, RepoBuilder},
};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use super::{RemoteBranch, Vcs, VcsError};
use crate::reference::RepositoryReference;

/// Give up after this many credential callbacks for a single operation;
/// libgit2 keeps asking as long as the server rejects what we hand it.
const MAX_CREDENTIAL_ATTEMPTS: usize = 3;

/// [`Vcs`] implementation on top of libgit2.
///
/// The access token, if any, is passed to the server untouched as the
/// password of an HTTPS basic-auth exchange.
#[derive(Debug, Clone, Default)]
pub struct Git2Vcs {
    token: Option<String>,
}

impl Git2Vcs {
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// Build callbacks with token, SSH-agent and default credentials, tried in that order.
    fn callbacks(&self) -> RemoteCallbacks<'_> {
        let token = self.token.as_deref();
        let mut attempts = 0usize;

        let mut cb = RemoteCallbacks::new();
        cb.credentials(move |_url, username_from_url, allowed| {
            attempts += 1;
            if attempts > MAX_CREDENTIAL_ATTEMPTS {
                return Err(git2::Error::from_str("authentication failed"));
            }
            if let Some(tok) = token
                && allowed.contains(CredentialType::USER_PASS_PLAINTEXT)
            {
                return Cred::userpass_plaintext("x-access-token", tok);
            }
            if allowed.contains(CredentialType::SSH_KEY) {
                return Cred::ssh_key_from_agent(username_from_url.unwrap_or("git"));
            }
            Cred::default()
        });
        cb
    }

    /// Fetch options with our credentials; `tags` replaces libgit2's
    /// auto-follow so a tag-less fetch really downloads no tags.
    fn fetch_opts(&self, tags: AutotagOption) -> FetchOptions<'_> {
        let mut fo = FetchOptions::new();
        fo.remote_callbacks(self.callbacks());
        fo.download_tags(tags);
        fo
    }
}

fn msg(e: git2::Error) -> String {
    e.message().to_string()
}

impl Vcs for Git2Vcs {
    type WorkingCopy = Repository;

    fn clone_repo(
        &self,
        reference: &RepositoryReference,
        dest: &Path,
        remote: &str,
    ) -> Result<Repository, VcsError> {
        let mut builder = RepoBuilder::new();
        builder.fetch_options(self.fetch_opts(AutotagOption::Auto));
        builder.remote_create(move |repo, _name, url| repo.remote(remote, url));

        builder
            .clone(reference.as_str(), dest)
            .map_err(|e| VcsError::Clone(msg(e)))
    }

    fn open(&self, path: &Path) -> Result<Repository, VcsError> {
        let repo = Repository::open(path).map_err(|e| VcsError::Open(msg(e)))?;
        if repo.is_bare() {
            return Err(VcsError::Open(format!(
                "{} is a bare repository",
                path.display()
            )));
        }
        Ok(repo)
    }

    /// Connects once to read the advertisement (and the symbolic default),
    /// then fetches branches and tags into the remote-tracking namespace.
    fn fetch(
        &self,
        wc: &Repository,
        remote: &str,
        include_tags: bool,
    ) -> Result<Vec<RemoteBranch>, VcsError> {
        let fetch_err = |e: git2::Error| VcsError::Fetch(msg(e));

        let mut origin = wc.find_remote(remote).map_err(fetch_err)?;

        let (advertised, default) = {
            let conn = origin
                .connect_auth(Direction::Fetch, Some(self.callbacks()), None)
                .map_err(fetch_err)?;
            let default = conn
                .default_branch()
                .ok()
                .and_then(|buf| buf.as_str().map(str::to_string))
                .and_then(|name| name.strip_prefix("refs/heads/").map(str::to_string));
            let advertised: Vec<String> = conn
                .list()
                .map_err(fetch_err)?
                .iter()
                .filter_map(|head| head.name().strip_prefix("refs/heads/"))
                .map(str::to_string)
                .collect();
            (advertised, default)
        };

        let mut refspecs = vec![format!("+refs/heads/*:refs/remotes/{}/*", remote)];
        let tags = if include_tags {
            refspecs.push("+refs/tags/*:refs/tags/*".to_string());
            AutotagOption::All
        } else {
            AutotagOption::None
        };
        origin
            .fetch(refspecs.as_slice(), Some(&mut self.fetch_opts(tags)), None)
            .map_err(fetch_err)?;

        let mut ordered: Vec<RemoteBranch> = Vec::with_capacity(advertised.len());
        if let Some(d) = default.as_deref()
            && advertised.iter().any(|name| name == d)
        {
            ordered.push(RemoteBranch::new(remote, d));
        }
        for name in &advertised {
            if Some(name.as_str()) != default.as_deref() {
                ordered.push(RemoteBranch::new(remote, name));
            }
        }
        Ok(ordered)
    }

    fn local_branches(&self, wc: &Repository) -> Result<BTreeSet<String>, VcsError> {
        let list_err = |e: git2::Error| VcsError::ListBranches(msg(e));
        let mut names = BTreeSet::new();
        for item in wc.branches(Some(BranchType::Local)).map_err(list_err)? {
            let (branch, _) = item.map_err(list_err)?;
            if let Some(name) = branch.name().map_err(list_err)? {
                names.insert(name.to_string());
            }
        }
        Ok(names)
    }

    fn current_branch(&self, wc: &Repository) -> Option<String> {
        let head = wc.head().ok()?;
        if !head.is_branch() {
            return None;
        }
        head.shorthand().map(str::to_string)
    }

    fn checkout(
        &self,
        wc: &Repository,
        branch: &str,
        create_from: Option<&RemoteBranch>,
    ) -> Result<(), VcsError> {
        let err = |e: git2::Error| VcsError::Checkout {
            branch: branch.to_string(),
            message: msg(e),
        };

        if let Some(remote_branch) = create_from {
            let tip = wc
                .find_reference(&remote_branch.tracking_ref)
                .and_then(|r| r.peel_to_commit())
                .map_err(err)?;
            let mut created = wc.branch(branch, &tip, false).map_err(err)?;
            let upstream = remote_branch
                .tracking_ref
                .strip_prefix("refs/remotes/")
                .unwrap_or(&remote_branch.tracking_ref);
            created.set_upstream(Some(upstream)).map_err(err)?;
        }

        let refname = format!("refs/heads/{}", branch);
        let target = wc.revparse_single(&refname).map_err(err)?;
        wc.checkout_tree(&target, Some(CheckoutBuilder::new().safe()))
            .map_err(err)?;
        wc.set_head(&refname).map_err(err)?;
        Ok(())
    }

    /// Fetch the single branch and fast-forward it. Diverged history is an
    /// error; merging is left to the user.
    fn pull(&self, wc: &Repository, remote: &str, branch: &str) -> Result<(), VcsError> {
        let fail = |message: String| VcsError::Pull {
            branch: branch.to_string(),
            message,
        };
        let err = |e: git2::Error| fail(msg(e));

        if self.current_branch(wc).as_deref() != Some(branch) {
            return Err(fail(format!("{} is not checked out", branch)));
        }

        let mut origin = wc.find_remote(remote).map_err(err)?;
        let refspec = format!("+refs/heads/{0}:refs/remotes/{1}/{0}", branch, remote);
        origin
            .fetch(
                &[refspec.as_str()],
                Some(&mut self.fetch_opts(AutotagOption::None)),
                None,
            )
            .map_err(err)?;

        let upstream = wc
            .find_reference(&format!("refs/remotes/{}/{}", remote, branch))
            .map_err(err)?;
        let incoming = wc.reference_to_annotated_commit(&upstream).map_err(err)?;
        let (analysis, _) = wc.merge_analysis(&[&incoming]).map_err(err)?;

        if analysis.is_up_to_date() {
            return Ok(());
        }
        if !analysis.is_fast_forward() {
            return Err(fail(format!(
                "{} has diverged from {}/{}; refusing to merge",
                branch, remote, branch
            )));
        }

        let target = wc.find_commit(incoming.id()).map_err(err)?;
        wc.checkout_tree(target.as_object(), Some(CheckoutBuilder::new().safe()))
            .map_err(err)?;
        let mut local = wc
            .find_reference(&format!("refs/heads/{}", branch))
            .map_err(err)?;
        local
            .set_target(
                target.id(),
                &format!("pull: fast-forward {} to {}", branch, target.id()),
            )
            .map_err(err)?;
        Ok(())
    }

    /// `git clean -fd`: untracked files and directories go, ignored files and
    /// nested repositories stay.
    fn clean_untracked(&self, wc: &Repository) -> Result<(), VcsError> {
        let workdir = wc
            .workdir()
            .ok_or_else(|| VcsError::Clean("repository has no working tree".to_string()))?
            .to_path_buf();

        let mut opts = StatusOptions::new();
        opts.include_untracked(true)
            .recurse_untracked_dirs(false)
            .include_ignored(false);
        let statuses = wc
            .statuses(Some(&mut opts))
            .map_err(|e| VcsError::Clean(msg(e)))?;

        let mut failures = Vec::new();
        for entry in statuses.iter() {
            if !entry.status().contains(Status::WT_NEW) {
                continue;
            }
            let Some(rel) = entry.path() else { continue };
            let path = workdir.join(rel.trim_end_matches('/'));
            let is_dir = fs::symlink_metadata(&path)
                .map(|m| m.is_dir())
                .unwrap_or(false);
            if is_dir && path.join(".git").exists() {
                continue;
            }
            let removed = if is_dir {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            if let Err(e) = removed {
                failures.push(format!("{}: {}", rel, e));
            }
        }

        if failures.is_empty() {
            Ok(())
        } else {
            Err(VcsError::Clean(failures.join(", ")))
        }
    }
}
