use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::{RunId, Sample};
use crate::error::PoseidonError;
use crate::inventory::RunRecord;
use crate::manifest::Manifest;

pub const STATUS_FILE: &str = "sample_list.with_status.txt";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusLabel {
    Done,
    FastqInProgress { done: usize, total: usize },
    SraInProgress { ready: usize, total: usize },
    NotStarted { total: usize },
}

impl StatusLabel {
    pub fn from_records(records: &[&RunRecord]) -> Self {
        let total = records.len();
        let ready = records.iter().filter(|record| record.archive_ok).count();
        let done = records.iter().filter(|record| record.fastq_done()).count();
        if done == total {
            StatusLabel::Done
        } else if ready == total {
            StatusLabel::FastqInProgress { done, total }
        } else if ready > 0 {
            StatusLabel::SraInProgress { ready, total }
        } else {
            StatusLabel::NotStarted { total }
        }
    }
}

impl fmt::Display for StatusLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusLabel::Done => write!(f, "FASTQ_DONE"),
            StatusLabel::FastqInProgress { done, total } => {
                write!(f, "FASTQ_IN_PROGRESS ({done}/{total} done)")
            }
            StatusLabel::SraInProgress { ready, total } => {
                write!(f, "SRA_IN_PROGRESS ({ready}/{total} done)")
            }
            StatusLabel::NotStarted { total } => write!(f, "SRA_IN_PROGRESS (0/{total} done)"),
        }
    }
}

/// One line of `sample_list.with_status.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub sample: String,
    pub r1: Vec<String>,
    pub r2: Vec<String>,
    pub label: StatusLabel,
}

impl StatusRow {
    pub fn build(sample: &Sample, records: &HashMap<&RunId, &RunRecord>) -> Self {
        let mut r1 = Vec::new();
        let mut r2 = Vec::new();
        let mut found = Vec::new();
        for run in &sample.runs {
            let record = records.get(run).copied();
            r1.push(
                record
                    .and_then(|record| record.r1.as_deref())
                    .and_then(file_name)
                    .unwrap_or_else(|| run.r1_name()),
            );
            // Single-end runs leave the R2 column empty.
            if let Some(name) = record
                .and_then(|record| record.r2.as_deref())
                .and_then(file_name)
            {
                r2.push(name);
            }
            if let Some(record) = record {
                found.push(record);
            }
        }
        Self {
            sample: sample.id.clone(),
            r1,
            r2,
            label: StatusLabel::from_records(&found),
        }
    }
}

impl fmt::Display for StatusRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.sample,
            self.r1.join(","),
            self.r2.join(","),
            self.label
        )
    }
}

pub fn status_rows(manifest: &Manifest, records: &[RunRecord]) -> Vec<StatusRow> {
    let by_run = records
        .iter()
        .map(|record| (&record.run, record))
        .collect::<HashMap<_, _>>();
    manifest
        .samples()
        .iter()
        .map(|sample| StatusRow::build(sample, &by_run))
        .collect()
}

/// Writes the snapshot to a temp file in `dir` and renames it over
/// `sample_list.with_status.txt`, so readers never see a partial file.
pub fn write_status_snapshot(
    dir: &Path,
    manifest: &Manifest,
    records: &[RunRecord],
) -> Result<PathBuf, PoseidonError> {
    let rows = status_rows(manifest, records);
    let mut content = rows
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n");
    content.push('\n');

    let destination = dir.join(STATUS_FILE);
    let mut temp = tempfile::Builder::new()
        .prefix(".sample_list.with_status")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|err| PoseidonError::Filesystem(err.to_string()))?;
    temp.write_all(content.as_bytes())
        .map_err(|err| PoseidonError::Filesystem(err.to_string()))?;
    // tempfile creates 0600; the snapshot is read by other users of the directory.
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        temp.as_file()
            .set_permissions(fs::Permissions::from_mode(0o644))
            .map_err(|err| PoseidonError::Filesystem(err.to_string()))?;
    }
    temp.persist(&destination)
        .map_err(|err| PoseidonError::Filesystem(err.to_string()))?;

    info!(samples = rows.len(), path = %destination.display(), "wrote status snapshot");
    Ok(destination)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
}
