//! # repomirror
//!
//! **repomirror** keeps offline mirrors of git repositories.
//!
//! Features:
//! - `repomirror sync` clones or updates every repository of a list file,
//!   with a local branch for every remote branch and the default branch checked out
//! - `repomirror list-org` writes the repository list of a GitHub organisation
//! - `repomirror home` prints the directory holding `config.toml` and the logs
//!
//! This CLI is built with [clap](https://docs.rs/clap).

use anyhow::Result;
use clap::{Parser, Subcommand};
use repomirror::{ListOrgArgs, SyncArgs, cmd_list_org, cmd_sync, repomirror_home};
use std::path::PathBuf;

/// Command-line interface definition.
#[derive(Parser, Debug)]
#[command(
    name = "repomirror",
    version,
    about = "repomirror - keep offline mirrors of git repositories",
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Clone or update every repository listed in the input file
    Sync {
        /// Text file with one repository reference per line
        #[arg(long)]
        input: PathBuf,
        /// Output directory for the mirrors [default: ./repos]
        #[arg(long)]
        output: Option<PathBuf>,
        /// Access token (falls back to GITHUB_TOKEN, then config.toml)
        #[arg(long)]
        token: Option<String>,
        /// Delete the output directory before starting
        #[arg(long)]
        clean: bool,
        /// Only show warnings and errors on the console
        #[arg(long, short)]
        quiet: bool,
    },
    /// Write the repository list of a GitHub organisation
    ListOrg {
        /// Organisation name (falls back to ORGANIZATION, then config.toml)
        #[arg(long)]
        org: Option<String>,
        /// File to save the list to; printed to stdout otherwise
        #[arg(long)]
        output: Option<PathBuf>,
        /// Access token (falls back to GITHUB_TOKEN, then config.toml)
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the repomirror home directory
    Home,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.cmd {
        Cmd::Sync {
            input,
            output,
            token,
            clean,
            quiet,
        } => cmd_sync(SyncArgs {
            input,
            output,
            token,
            clean,
            quiet,
        }),
        Cmd::ListOrg { org, output, token } => cmd_list_org(ListOrgArgs { org, output, token }),
        Cmd::Home => {
            println!("{}", repomirror_home()?.display());
            Ok(())
        }
    }
}
