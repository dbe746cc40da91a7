mod jobs;
mod outcome;
mod repo;

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::ProgressBar;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{Overrides, Settings};
use crate::git::{Git2Vcs, Vcs};
use crate::logging;
use crate::progress::{batch_style, err_style, ok_style};

pub use jobs::{SyncJob, build_jobs, parse_reference_list, read_reference_list, shared_directories};
pub use outcome::{BranchAction, BranchResult, SyncError, SyncMode, SyncOutcome};
pub use repo::{SyncOptions, Synchronizer, resolve_default_branch};

/// Options of the `sync` command, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct SyncArgs {
    pub input: PathBuf,
    pub output: Option<PathBuf>,
    pub token: Option<String>,
    /// Delete the output directory before starting.
    pub clean: bool,
    /// Only warnings and errors on the console.
    pub quiet: bool,
}

/// Outcomes of one batch, in input order.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<SyncOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    pub fn branch_failures(&self) -> usize {
        self.outcomes.iter().map(|o| o.failed_branches().count()).sum()
    }
}

/// Synchronize every job, one after the other.
///
/// A failure of one repository never stops the batch; unparseable entries
/// are reported as failed outcomes.
pub fn run_batch<V: Vcs>(
    sync: &Synchronizer<'_, V>,
    jobs: &[SyncJob],
    output_root: &Path,
    pb: &ProgressBar,
) -> BatchReport {
    let mut report = BatchReport::default();
    for job in jobs {
        pb.set_message(format!("syncing {}", job.entry));
        let outcome = match &job.reference {
            Ok(reference) => sync.synchronize(reference, output_root),
            Err(e) => {
                error!(entry = %job.entry, error = %e, "skipping list entry");
                SyncOutcome::rejected(job.entry.clone(), e.clone())
            }
        };
        pb.inc(1);
        report.outcomes.push(outcome);
    }
    report
}

/// Mirror every repository of the input list into the output directory.
///
/// High-level flow:
/// 1. Resolve settings (flags, environment, `config.toml`) and start logging.
/// 2. With `--clean`, remove the output directory; then make sure it exists.
/// 3. Read the list and synchronize each entry sequentially with a progress bar.
/// 4. Print a per-repository summary.
///
/// Errors in individual repositories are part of the summary, not of the
/// return value; only setup problems (config, logs, list file, output
/// directory) make this fail.
pub fn cmd_sync(args: SyncArgs) -> Result<()> {
    let settings = Settings::load(Overrides {
        output: args.output.clone(),
        token: args.token.clone(),
        organization: None,
    })?;
    let log = logging::init(&settings.log_dir, args.quiet)?;

    info!(log_file = %log.file.display(), "repository mirror started");
    info!(input = %args.input.display(), output = %settings.output.display(), clean = args.clean, "settings");

    prepare_output(&settings.output, args.clean)?;

    if settings.token.is_some() {
        info!("access token loaded");
    } else {
        warn!("no access token provided; private repositories will fail and rate limits may apply");
    }

    let entries = read_reference_list(&args.input)?;
    let jobs = build_jobs(&entries);
    info!(count = jobs.len(), "repositories to process");
    for (dir, claimants) in shared_directories(&jobs) {
        warn!(dir = %dir, entries = %claimants.join(", "), "several entries share one directory");
    }

    let vcs = Git2Vcs::new(settings.token.clone());
    let sync = Synchronizer::new(&vcs, settings.sync.clone());

    let pb = log.progress.add(ProgressBar::new(jobs.len() as u64));
    pb.set_style(batch_style());
    pb.enable_steady_tick(Duration::from_millis(80));

    let report = run_batch(&sync, &jobs, &settings.output, &pb);

    let done = format!(
        "{} synced, {} failed, {} branch failures",
        report.succeeded(),
        report.failed(),
        report.branch_failures()
    );
    if report.failed() == 0 && report.branch_failures() == 0 {
        pb.set_style(ok_style());
    } else {
        pb.set_style(err_style());
    }
    pb.finish_with_message(done);

    info!(
        succeeded = report.succeeded(),
        failed = report.failed(),
        output = %settings.output.display(),
        "processing completed"
    );
    print_summary(&report);
    Ok(())
}

fn prepare_output(output: &Path, clean: bool) -> Result<()> {
    if clean && output.exists() {
        info!(dir = %output.display(), "clean mode: removing existing output directory");
        fs::remove_dir_all(output)
            .with_context(|| format!("cannot remove {}", output.display()))?;
    }
    fs::create_dir_all(output)
        .with_context(|| format!("cannot create output directory {}", output.display()))?;
    Ok(())
}

fn print_summary(report: &BatchReport) {
    for line in summary_lines(report) {
        println!("{}", line);
    }
}

fn summary_lines(report: &BatchReport) -> Vec<String> {
    let mut lines = Vec::new();
    for o in &report.outcomes {
        match &o.error {
            None => lines.push(format!(
                "{} {} ({} new, {} updated, on {})",
                "✔".green(),
                o.reference,
                o.created_count(),
                o.updated_count(),
                o.final_branch.as_deref().unwrap_or("-")
            )),
            Some(e) => lines.push(format!(
                "{} {} [{}] {}",
                "✘".red(),
                o.reference,
                e.stage(),
                e
            )),
        }
        for b in o.failed_branches() {
            lines.push(format!("    {} {}", "✘".red(), b));
        }
    }
    lines
}
