//! Log setup: every run gets its own timestamped file, and the same events
//! go to stderr without tearing the progress bars.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use indicatif::MultiProgress;
use std::fs::{self, File};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::Subscriber;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::{self, MakeWriter};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Handle returned by [`init`].
pub struct Logging {
    /// The log file this run writes to.
    pub file: PathBuf,
    /// Progress bars must be added here so console logging can suspend them.
    pub progress: MultiProgress,
}

pub fn log_file_name(now: DateTime<Local>) -> String {
    format!("repomirror_{}.log", now.format("%Y%m%d_%H%M%S"))
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the default `info` filter. With `quiet`, the console
/// only shows warnings and errors; the file always gets everything that
/// passes the filter.
pub fn init(log_dir: &Path, quiet: bool) -> Result<Logging> {
    let (path, file) = create_log_file(log_dir)?;
    let progress = MultiProgress::new();

    subscriber(file, progress.clone(), quiet)
        .try_init()
        .context("logging already initialised")?;

    Ok(Logging {
        file: path,
        progress,
    })
}

fn create_log_file(log_dir: &Path) -> Result<(PathBuf, File)> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("cannot create log directory {}", log_dir.display()))?;
    let path = log_dir.join(log_file_name(Local::now()));
    let file =
        File::create(&path).with_context(|| format!("cannot create log file {}", path.display()))?;
    Ok((path, file))
}

fn subscriber(
    file: File,
    progress: MultiProgress,
    quiet: bool,
) -> impl Subscriber + Send + Sync + 'static {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let console_level = if quiet {
        LevelFilter::WARN
    } else {
        LevelFilter::TRACE
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(io::stderr().is_terminal())
                .with_writer(ConsoleWriter { progress })
                .with_filter(console_level),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
}

/// Writes each formatted event to stderr while progress bars are hidden.
#[derive(Clone)]
struct ConsoleWriter {
    progress: MultiProgress,
}

impl<'a> MakeWriter<'a> for ConsoleWriter {
    type Writer = ConsoleLine;

    fn make_writer(&'a self) -> ConsoleLine {
        ConsoleLine {
            progress: self.progress.clone(),
            buf: Vec::new(),
        }
    }
}

/// One event's worth of output, flushed on drop.
struct ConsoleLine {
    progress: MultiProgress,
    buf: Vec<u8>,
}

impl Write for ConsoleLine {
    fn write(&mut self, bytes: &[u8]) -> io::Result<usize> {
        self.buf.extend_from_slice(bytes);
        Ok(bytes.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Drop for ConsoleLine {
    fn drop(&mut self) {
        if self.buf.is_empty() {
            return;
        }
        let buf = std::mem::take(&mut self.buf);
        self.progress.suspend(|| {
            let _ = io::stderr().write_all(&buf);
        });
    }
}
