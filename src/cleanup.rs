use std::fs;
use std::path::Path;

use tracing::debug;

use crate::fs_util::remove_dir_if_empty;
use crate::inventory::RunRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanReport {
    pub removed: usize,
    pub dirs_removed: usize,
}

/// Deletes archives whose reads are complete, then any empty `dir/<run>/`
/// directories prefetch left behind. Failures are skipped, not counted.
pub fn remove_completed_archives(dir: &Path, records: &[RunRecord]) -> CleanReport {
    let mut report = CleanReport::default();
    for record in records {
        let Some(archive) = record.archive.as_deref() else {
            continue;
        };
        if !record.fastq_done() || !archive.exists() {
            continue;
        }
        match fs::remove_file(archive) {
            Ok(()) => {
                debug!(path = %archive.display(), "removed archive");
                report.removed += 1;
            }
            Err(err) => debug!(path = %archive.display(), error = %err, "could not remove archive"),
        }
    }
    for record in records {
        if record.fastq_done() && remove_dir_if_empty(&dir.join(record.run.as_str())) {
            report.dirs_removed += 1;
        }
    }
    report
}
