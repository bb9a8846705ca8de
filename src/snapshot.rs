use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tracing::debug;

use crate::world::StepReport;

#[derive(Serialize)]
struct SnapshotFile<'a> {
    scenario: &'a str,
    written_at: String,
    #[serde(flatten)]
    report: &'a StepReport,
}

/// Writes a JSON census report every `interval` steps. An interval of zero
/// disables snapshots.
pub struct SnapshotWriter {
    dir: PathBuf,
    interval: u64,
}

impl SnapshotWriter {
    pub fn new(dir: impl AsRef<Path>, interval: u64) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            interval,
        }
    }

    pub fn is_due(&self, step: u64) -> bool {
        self.interval != 0 && step != 0 && step % self.interval == 0
    }

    pub fn maybe_write(&self, scenario: &str, report: &StepReport) -> Result<Option<PathBuf>> {
        if !self.is_due(report.step) {
            return Ok(None);
        }
        let dir = self.dir.join(scenario);
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;
        let path = dir.join(format!("step_{:06}.json", report.step));
        let file = SnapshotFile {
            scenario,
            written_at: Utc::now().to_rfc3339(),
            report,
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize snapshot")?;
        fs::write(&path, json).with_context(|| format!("Failed to write snapshot {}", path.display()))?;
        debug!(step = report.step, path = %path.display(), "Snapshot written");
        Ok(Some(path))
    }
}
