use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use assert_matches::assert_matches;
use flate2::Compression;
use flate2::write::GzEncoder;

use poseidon_core::domain::{Action, RunId};
use poseidon_core::error::PoseidonError;
use poseidon_core::executor::Executor;
use poseidon_core::manifest::MANIFEST_FILE;
use poseidon_core::output::outcome_line;
use poseidon_core::snapshot::STATUS_FILE;
use poseidon_core::workflow::{ActionOutcome, ProgressEvent, ProgressSink, Workflow};

const FASTQ: &str = "@r1\nACGT\n+\nIIII\n@r2\nTTGA\n+\nIIII\n";

fn write_fastq(path: &Path) {
    let file = fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::fast());
    encoder.write_all(FASTQ.as_bytes()).unwrap();
    encoder.finish().unwrap();
}

fn write_manifest(dir: &Path, content: &str) {
    fs::write(dir.join(MANIFEST_FILE), content).unwrap();
}

/// Simulates prefetch and a conversion job that finishes immediately.
#[derive(Default)]
struct MockExecutor {
    calls: Mutex<Vec<String>>,
    fail_fetch: bool,
}

impl Executor for MockExecutor {
    fn fetch_archive(&self, dir: &Path, run: &RunId) -> bool {
        self.calls.lock().unwrap().push(format!("fetch {run}"));
        if self.fail_fetch {
            return false;
        }
        fs::write(dir.join(format!("{run}.sra")), b"archive").unwrap();
        true
    }

    fn submit_convert(&self, dir: &Path, run: &RunId) -> Option<String> {
        self.calls.lock().unwrap().push(format!("convert {run}"));
        write_fastq(&dir.join(run.r1_name()));
        write_fastq(&dir.join(run.r2_name()));
        Some("1001".to_string())
    }
}

#[derive(Default)]
struct RecordingSink {
    lines: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        let line = match event {
            ProgressEvent::Planned { actions } => format!("planned {actions}"),
            ProgressEvent::Finished(outcome) => outcome_line(&outcome),
        };
        self.lines.lock().unwrap().push(line);
    }
}

#[test]
fn empty_directory_plans_two_fetches() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR000001\tSRR000002\n");

    let workflow = Workflow::open(dir.path(), MockExecutor::default()).unwrap();
    let plan = workflow.plan();

    assert_eq!(plan.actions.len(), 2);
    assert_eq!(
        plan.actions,
        vec![
            Action::Fetch {
                run: "SRR000001".parse().unwrap()
            },
            Action::Fetch {
                run: "SRR000002".parse().unwrap()
            },
        ]
    );
}

#[test]
fn archive_without_reads_plans_convert() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR000001\tNA\n");
    fs::write(dir.path().join("SRR000001.sra"), b"archive").unwrap();

    let workflow = Workflow::open(dir.path(), MockExecutor::default()).unwrap();
    let plan = workflow.plan();

    assert_eq!(plan.actions.len(), 1);
    assert_matches!(
        &plan.actions[0],
        Action::Convert { run, archive } if run.as_str() == "SRR000001"
            && archive.ends_with("SRR000001.sra")
    );
}

#[test]
fn apply_then_reapply_is_idempotent() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR1\tSRR2\nS2\tERR3\tNA\n");
    fs::write(dir.path().join("SRR2.sra"), b"archive").unwrap();

    let workflow = Workflow::open(dir.path(), MockExecutor::default()).unwrap();
    let sink = RecordingSink::default();
    let report = workflow.apply(&sink).unwrap();

    assert_eq!(report.outcomes.len(), 3);
    assert!(report.outcomes.iter().all(ActionOutcome::succeeded));
    assert_eq!(
        *sink.lines.lock().unwrap(),
        vec![
            "planned 3".to_string(),
            "✓ prefetch SRR1".to_string(),
            "✓ bsub SRR2 1001".to_string(),
            "✓ prefetch ERR3".to_string(),
        ]
    );

    assert_eq!(
        *workflow.executor().calls.lock().unwrap(),
        vec!["fetch SRR1", "convert SRR2", "fetch ERR3"]
    );

    // Fetched runs still need a convert on the next pass.
    assert_eq!(workflow.plan().actions.len(), 2);
    workflow.apply(&RecordingSink::default()).unwrap();
    assert!(workflow.plan().actions.is_empty());

    let second = workflow.apply(&RecordingSink::default()).unwrap();
    assert!(second.outcomes.is_empty());
}

#[test]
fn failed_fetch_is_reported_not_raised() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR1\tNA\n");
    let executor = MockExecutor {
        fail_fetch: true,
        ..Default::default()
    };

    let workflow = Workflow::open(dir.path(), executor).unwrap();
    let sink = RecordingSink::default();
    let report = workflow.apply(&sink).unwrap();

    assert_eq!(sink.lines.lock().unwrap()[1], "✗ prefetch SRR1");
    assert!(!report.outcomes[0].succeeded());
    let status = fs::read_to_string(report.snapshot).unwrap();
    assert_eq!(status, "S1\tSRR1_1.fastq.gz\t\tSRA_IN_PROGRESS (0/1 done)\n");
}

#[test]
fn done_samples_snapshot_as_fastq_done() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR1\tSRR1\nS2\tSRR2\tNA\n");
    for run in ["SRR1", "SRR2"] {
        write_fastq(&dir.path().join(format!("{run}_1.fastq.gz")));
        write_fastq(&dir.path().join(format!("{run}_2.fastq.gz")));
    }

    let workflow = Workflow::open(dir.path(), MockExecutor::default()).unwrap();
    let path = workflow.status().unwrap();

    assert_eq!(path, dir.path().join(STATUS_FILE));
    let content = fs::read_to_string(&path).unwrap();
    let labels = content
        .lines()
        .map(|line| line.split('\t').nth(3).unwrap())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["FASTQ_DONE", "FASTQ_DONE"]);
    assert!(content.starts_with("S1\tSRR1_1.fastq.gz\tSRR1_2.fastq.gz\t"));

    let leftovers = fs::read_dir(dir.path())
        .unwrap()
        .flatten()
        .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
        .count();
    assert_eq!(leftovers, 0);
}

#[test]
fn zero_byte_read_is_not_done() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR1\tNA\n");
    write_fastq(&dir.path().join("SRR1_1.fastq.gz"));
    fs::write(dir.path().join("SRR1_2.fastq.gz"), b"").unwrap();

    let workflow = Workflow::open(dir.path(), MockExecutor::default()).unwrap();
    let records = workflow.inventory();
    assert!(records[0].r1_ok);
    assert!(!records[0].r2_ok);
    assert_matches!(&workflow.plan().actions[0], Action::Fetch { .. });
}

#[test]
fn clean_removes_archive_after_conversion() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tSRR000001\tNA\n");
    let archive = dir.path().join("SRR000001.sra");
    fs::write(&archive, b"archive").unwrap();
    write_fastq(&dir.path().join("SRR000001_1.fastq.gz"));
    write_fastq(&dir.path().join("SRR000001_2.fastq.gz"));

    let workflow = Workflow::open(dir.path(), MockExecutor::default()).unwrap();
    let report = workflow.clean();

    assert_eq!(report.removed, 1);
    assert!(!archive.exists());
    assert_eq!(workflow.clean().removed, 0);
}

#[test]
fn missing_manifest_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let err = Workflow::open(dir.path(), MockExecutor::default())
        .err()
        .unwrap();
    assert_matches!(err, PoseidonError::ManifestNotFound(_));
}

#[test]
fn manifest_without_accessions_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    write_manifest(dir.path(), "S1\tNA\tNA\nheader only\n");
    let err = Workflow::open(dir.path(), MockExecutor::default())
        .err()
        .unwrap();
    assert_matches!(err, PoseidonError::ManifestEmpty(_));
}
