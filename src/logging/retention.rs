//! Log file retention management
//!
//! Handles cleanup of old log files based on age.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use anyhow::{Context, Result};
use chrono::{DateTime, Local, NaiveDate};

/// Outcome of one sweep over the log directory
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Files removed
    pub deleted: Vec<PathBuf>,
    /// Expired files that could not be removed
    pub failed: Vec<(PathBuf, io::Error)>,
    /// Entries whose type or modification time could not be read
    pub unchecked: Vec<(PathBuf, io::Error)>,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.deleted.is_empty() && self.failed.is_empty() && self.unchecked.is_empty()
    }
}

/// What the sweep does with one directory entry
#[derive(Debug)]
enum Verdict {
    Keep,
    Expired,
    Unchecked(io::Error),
}

fn classify(metadata: io::Result<fs::Metadata>, retention_days: u32, today: NaiveDate) -> Verdict {
    let metadata = match metadata {
        Ok(metadata) => metadata,
        Err(e) => return Verdict::Unchecked(e),
    };
    if !metadata.is_file() {
        return Verdict::Keep;
    }

    match metadata.modified() {
        Ok(modified) if is_expired(age_in_days(modified, today), retention_days) => Verdict::Expired,
        Ok(_) => Verdict::Keep,
        Err(e) => Verdict::Unchecked(e),
    }
}

/// Age in calendar days of a file last modified at `modified`, seen from `today`
pub fn age_in_days(modified: SystemTime, today: NaiveDate) -> i64 {
    let modified: DateTime<Local> = modified.into();
    (today - modified.date_naive()).num_days()
}

/// Whether a file of this age falls outside the retention window
pub fn is_expired(age_days: i64, retention_days: u32) -> bool {
    age_days > i64::from(retention_days)
}

/// Delete every regular file in `logs_dir` older than `retention_days`
///
/// A file modified exactly `retention_days` calendar days before `today` is
/// kept. A failed deletion is recorded and the sweep moves on.
pub fn cleanup_old_logs(
    logs_dir: &Path,
    retention_days: u32,
    today: NaiveDate,
) -> Result<SweepReport> {
    let mut report = SweepReport::default();

    if !logs_dir.exists() {
        return Ok(report);
    }

    let entries = fs::read_dir(logs_dir)
        .with_context(|| format!("Failed to list log directory {}", logs_dir.display()))?;

    for entry in entries.flatten() {
        let path = entry.path();
        match classify(entry.metadata(), retention_days, today) {
            Verdict::Keep => {}
            Verdict::Expired => match fs::remove_file(&path) {
                Ok(()) => report.deleted.push(path),
                Err(e) => report.failed.push((path, e)),
            },
            Verdict::Unchecked(e) => report.unchecked.push((path, e)),
        }
    }

    Ok(report)
}
