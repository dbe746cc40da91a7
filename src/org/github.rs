use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;

/// GitHub caps `per_page` at 100.
pub const MAX_PER_PAGE: usize = 100;

#[derive(Debug, Deserialize)]
pub struct OrgRepo {
    pub name: String,
}

/// Blocking client for the handful of REST calls the lister needs.
pub struct GithubClient {
    client: Client,
    api_url: String,
    per_page: usize,
}

impl GithubClient {
    /// The token is sent as-is in a Bearer header.
    pub fn new(api_url: &str, token: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("repomirror"));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .context("token is not a valid header value")?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = Client::builder().default_headers(headers).build()?;
        Ok(Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            per_page: MAX_PER_PAGE,
        })
    }

    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.clamp(1, MAX_PER_PAGE);
        self
    }

    /// Every repository of `org`, in API order, following pages until a short one.
    pub fn org_repositories(&self, org: &str) -> Result<Vec<OrgRepo>> {
        let url = format!("{}/orgs/{}/repos", self.api_url, org);
        let mut repos = Vec::new();
        for page in 1.. {
            let batch: Vec<OrgRepo> = self
                .client
                .get(&url)
                .query(&[("per_page", self.per_page), ("page", page)])
                .send()
                .with_context(|| format!("request to {} failed", url))?
                .error_for_status()
                .with_context(|| format!("listing repositories of {}", org))?
                .json()
                .context("unexpected response body")?;
            let last = batch.len() < self.per_page;
            repos.extend(batch);
            if last {
                break;
            }
        }
        Ok(repos)
    }
}

/// Reference line written for each repository.
pub fn ssh_reference(org: &str, repo: &str) -> String {
    format!("git@github.com:{}/{}.git", org, repo)
}
