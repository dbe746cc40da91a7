mod github;

use anyhow::{Context, Result, bail};
use indicatif::ProgressBar;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::config::{Overrides, Settings};
use crate::progress::{ok_style, spinner_style};

pub use github::{GithubClient, OrgRepo, ssh_reference};

/// Options of the `list-org` command, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ListOrgArgs {
    pub org: Option<String>,
    pub output: Option<PathBuf>,
    pub token: Option<String>,
}

/// Write the SSH reference of every repository in an organisation.
///
/// The result is a ready-made input list for `sync`: written to `--output`
/// when given, printed to stdout otherwise.
///
/// # Errors
/// - No token or no organisation after consulting flags, environment and config.
/// - The API request fails or the output file cannot be written.
pub fn cmd_list_org(args: ListOrgArgs) -> Result<()> {
    let settings = Settings::load(Overrides {
        output: None,
        token: args.token,
        organization: args.org,
    })?;
    let Some(token) = settings.token.as_deref() else {
        bail!("an access token is required: pass --token or set GITHUB_TOKEN");
    };
    let Some(org) = settings.organization.as_deref() else {
        bail!("an organisation is required: pass --org or set ORGANIZATION");
    };

    let pb = ProgressBar::new_spinner();
    pb.set_style(spinner_style());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message(format!("listing repositories of {}", org));

    let client = GithubClient::new(&settings.api_url, token)?;
    let refs = match client.org_repositories(org) {
        Ok(repos) => render_list(org, &repos),
        Err(e) => {
            pb.finish_and_clear();
            return Err(e);
        }
    };

    match &args.output {
        Some(path) => {
            fs::write(path, &refs).with_context(|| format!("cannot write {}", path.display()))?;
            pb.set_style(ok_style());
            pb.finish_with_message(format!(
                "{} repositories of {} saved to {}",
                refs.lines().count(),
                org,
                path.display()
            ));
        }
        None => {
            pb.finish_and_clear();
            print!("{}", refs);
        }
    }
    Ok(())
}

/// One reference per line, newline-terminated.
fn render_list(org: &str, repos: &[OrgRepo]) -> String {
    repos
        .iter()
        .map(|r| format!("{}\n", ssh_reference(org, &r.name)))
        .collect()
}
