use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

/// `<scheme>://<authority><path>`
static URL_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<scheme>[A-Za-z][A-Za-z0-9+.\-]*)://(?P<authority>[^/]*)(?P<path>/.*)?$")
        .expect("static regex")
});

/// scp-like `[user@]host:path`
static SCP_FORM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?P<user>[^@/:\s]+)@)?(?P<host>[^@/:\s]+):(?P<path>[^\s].*)$")
        .expect("static regex")
});

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReferenceError {
    #[error("empty repository reference")]
    Empty,
    #[error("unrecognized repository reference: {0}")]
    Unrecognized(String),
}

/// Which of the recognized spellings a reference was written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceForm {
    /// `scheme://host/owner/name[.git]`
    Url,
    /// `user@host:owner/name[.git]`
    Scp,
}

/// A remote repository identifier as it appears in the repository list.
///
/// The raw string is kept verbatim and handed to the VCS engine untouched;
/// only the canonical name is derived from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryReference {
    raw: String,
    form: ReferenceForm,
    canonical: String,
}

impl RepositoryReference {
    /// Parse a single list entry. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, ReferenceError> {
        let raw = input.trim();
        if raw.is_empty() {
            return Err(ReferenceError::Empty);
        }

        let (form, path) = if let Some(caps) = URL_FORM.captures(raw) {
            let path = caps.name("path").map(|m| m.as_str()).unwrap_or("");
            (ReferenceForm::Url, path)
        } else if let Some(caps) = SCP_FORM.captures(raw) {
            (ReferenceForm::Scp, caps.name("path").map(|m| m.as_str()).unwrap_or(""))
        } else {
            return Err(ReferenceError::Unrecognized(raw.to_string()));
        };

        let canonical = strip_git_suffix(path).to_string();
        if canonical.trim_matches(['/', '\\']).is_empty() {
            return Err(ReferenceError::Unrecognized(raw.to_string()));
        }

        Ok(Self {
            raw: raw.to_string(),
            form,
            canonical,
        })
    }

    /// The reference exactly as written (trimmed).
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn form(&self) -> ReferenceForm {
        self.form
    }

    /// Scheme and host stripped, trailing `.git` removed.
    ///
    /// - `git@host:owner/repo.git` → `owner/repo`
    /// - `https://host/owner/repo.git` → `/owner/repo`
    pub fn canonical_name(&self) -> &str {
        &self.canonical
    }

    /// Directory name used under the output root, see [`flatten`].
    pub fn dir_name(&self) -> String {
        flatten(&self.canonical)
    }
}

impl fmt::Display for RepositoryReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Turn a canonical name into a single path component.
///
/// Leading/trailing separators are dropped so that the SSH and HTTPS spellings
/// of the same repository land in the same directory.
pub fn flatten(canonical: &str) -> String {
    canonical
        .trim_matches(['/', '\\'])
        .chars()
        .map(|c| if c == '/' || c == '\\' { '_' } else { c })
        .collect()
}

fn strip_git_suffix(path: &str) -> &str {
    let path = path.trim_end_matches('/');
    path.strip_suffix(".git").unwrap_or(path)
}
