use std::io::{self, Write};
use std::path::Path;

use crate::cleanup::CleanReport;
use crate::domain::Action;
use crate::workflow::{ActionOutcome, PlanReport, ProgressEvent, ProgressSink};

const OK: &str = "✓";
const FAIL: &str = "✗";

/// Plain-text report on stdout.
pub struct TextOutput;

impl TextOutput {
    pub fn print_plan(report: &PlanReport) -> io::Result<()> {
        let mut stdout = io::stdout().lock();
        for action in &report.actions {
            writeln!(stdout, "{}", plan_line(action))?;
        }
        writeln!(stdout, "— total actions: {}", report.actions.len())
    }

    pub fn print_snapshot(path: &Path) -> io::Result<()> {
        writeln!(io::stdout(), "{}", path.display())
    }

    pub fn print_clean(report: &CleanReport) -> io::Result<()> {
        writeln!(
            io::stdout(),
            "Removed {} converted .sra files",
            report.removed
        )
    }
}

impl ProgressSink for TextOutput {
    fn event(&self, event: ProgressEvent) {
        let line = match event {
            ProgressEvent::Planned { actions } => format!("Planned actions: {actions}"),
            ProgressEvent::Finished(outcome) => outcome_line(&outcome),
        };
        // A closed stdout must not abort the remaining actions.
        let _ = writeln!(io::stdout(), "{line}");
    }
}

pub fn plan_line(action: &Action) -> String {
    match action {
        Action::Fetch { run } => format!("DOWNLOAD {run}\t(prefetch)"),
        Action::Convert { run, .. } => format!("CONVERT  {run}\t(fastq-dump)"),
    }
}

pub fn outcome_line(outcome: &ActionOutcome) -> String {
    let mark = if outcome.succeeded() { OK } else { FAIL };
    match outcome {
        ActionOutcome::Fetched { run, .. } => format!("{mark} prefetch {run}"),
        ActionOutcome::Submitted { run, job_id } => {
            format!("{mark} bsub {run} {}", job_id.as_deref().unwrap_or(""))
        }
        ActionOutcome::MissingArchive { run } => format!("{mark} no SRA to convert for {run}"),
    }
}
