use std::path::{Path, PathBuf};

use crate::domain::{RunId, RunState};
use crate::fs_util::{exists_nonempty, fastq_header_ok, find_archive};

/// Filesystem state of one run at scan time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRecord {
    pub run: RunId,
    pub archive: Option<PathBuf>,
    pub r1: Option<PathBuf>,
    pub r2: Option<PathBuf>,
    pub r1_ok: bool,
    pub r2_ok: bool,
    pub archive_ok: bool,
}

impl RunRecord {
    /// R1 valid, and R2 either valid or absent (single-end).
    pub fn fastq_done(&self) -> bool {
        self.r1_ok && (self.r2.is_none() || self.r2_ok)
    }

    pub fn state(&self) -> RunState {
        if self.fastq_done() {
            RunState::Done
        } else if self.archive_ok {
            RunState::NeedConvert
        } else {
            RunState::NeedFetch
        }
    }
}

pub fn scan_run(dir: &Path, run: &RunId) -> RunRecord {
    let r1 = dir.join(run.r1_name());
    let r2 = dir.join(run.r2_name());
    let archive = find_archive(dir, run);

    let r1_ok = exists_nonempty(&r1) && fastq_header_ok(&r1);
    let r2_ok = exists_nonempty(&r2) && fastq_header_ok(&r2);
    let archive_ok = archive.as_deref().map(exists_nonempty).unwrap_or(false);

    RunRecord {
        run: run.clone(),
        archive,
        r1: r1.exists().then_some(r1),
        r2: r2.exists().then_some(r2),
        r1_ok,
        r2_ok,
        archive_ok,
    }
}

/// One record per run, in input order. Always reads the disk afresh.
pub fn scan(dir: &Path, runs: &[RunId]) -> Vec<RunRecord> {
    runs.iter().map(|run| scan_run(dir, run)).collect()
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    #[test]
    fn empty_dir_needs_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let run: RunId = "SRR000001".parse().unwrap();
        let record = scan_run(dir.path(), &run);
        assert!(record.archive.is_none());
        assert!(record.r1.is_none() && record.r2.is_none());
        assert_eq!(record.state(), RunState::NeedFetch);
    }

    #[test]
    fn zero_byte_outputs_are_not_done() {
        let dir = tempfile::tempdir().unwrap();
        let run: RunId = "SRR000001".parse().unwrap();
        fs::write(dir.path().join(run.r1_name()), b"").unwrap();
        fs::write(dir.path().join(run.r2_name()), b"").unwrap();
        fs::write(dir.path().join("SRR000001.sra"), b"archive").unwrap();

        let record = scan_run(dir.path(), &run);
        assert!(record.r1.is_some());
        assert!(!record.r1_ok);
        assert!(!record.r2_ok);
        assert!(record.archive_ok);
        assert_eq!(record.state(), RunState::NeedConvert);
    }

    #[test]
    fn empty_archive_is_not_ok() {
        let dir = tempfile::tempdir().unwrap();
        let run: RunId = "ERR7".parse().unwrap();
        fs::write(dir.path().join("ERR7.sralite"), b"").unwrap();
        let record = scan_run(dir.path(), &run);
        assert!(record.archive.is_some());
        assert!(!record.archive_ok);
        assert_eq!(record.state(), RunState::NeedFetch);
    }
}
