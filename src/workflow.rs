use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::cleanup::{CleanReport, remove_completed_archives};
use crate::domain::{Action, RunId};
use crate::error::PoseidonError;
use crate::executor::Executor;
use crate::fs_util::find_archive;
use crate::inventory::{self, RunRecord};
use crate::manifest::{MANIFEST_FILE, Manifest, parse_manifest};
use crate::plan;
use crate::snapshot::write_status_snapshot;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanReport {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    Fetched { run: RunId, ok: bool },
    Submitted { run: RunId, job_id: Option<String> },
    MissingArchive { run: RunId },
}

impl ActionOutcome {
    pub fn succeeded(&self) -> bool {
        match self {
            ActionOutcome::Fetched { ok, .. } => *ok,
            ActionOutcome::Submitted { job_id, .. } => job_id.is_some(),
            ActionOutcome::MissingArchive { .. } => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApplyReport {
    pub outcomes: Vec<ActionOutcome>,
    pub snapshot: PathBuf,
}

#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Planned { actions: usize },
    Finished(ActionOutcome),
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// One sample directory: its manifest plus the executor used by `apply`.
pub struct Workflow<E: Executor> {
    dir: PathBuf,
    manifest: Manifest,
    executor: E,
}

impl<E: Executor> Workflow<E> {
    pub fn new(dir: PathBuf, manifest: Manifest, executor: E) -> Self {
        Self {
            dir,
            manifest,
            executor,
        }
    }

    /// Reads `dir/sample_list.txt`; a missing or empty manifest is fatal.
    pub fn open(dir: &Path, executor: E) -> Result<Self, PoseidonError> {
        let manifest = parse_manifest(&dir.join(MANIFEST_FILE))?;
        Ok(Self::new(dir.to_path_buf(), manifest, executor))
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn inventory(&self) -> Vec<RunRecord> {
        inventory::scan(&self.dir, &self.manifest.all_runs())
    }

    pub fn plan(&self) -> PlanReport {
        let records = self.inventory();
        for record in &records {
            debug!(run = %record.run, state = %record.state(), "inventory");
        }
        PlanReport {
            actions: plan::plan(&records),
        }
    }

    /// Executes the plan sequentially, then always rewrites the status snapshot.
    pub fn apply(&self, sink: &dyn ProgressSink) -> Result<ApplyReport, PoseidonError> {
        let records = self.inventory();
        let actions = plan::plan(&records);
        info!(actions = actions.len(), dir = %self.dir.display(), "applying plan");
        sink.event(ProgressEvent::Planned {
            actions: actions.len(),
        });

        let mut outcomes = Vec::with_capacity(actions.len());
        for action in actions {
            let outcome = self.execute(action);
            if !outcome.succeeded() {
                warn!(outcome = ?outcome, "action failed");
            }
            sink.event(ProgressEvent::Finished(outcome.clone()));
            outcomes.push(outcome);
        }

        let snapshot = self.status()?;
        Ok(ApplyReport { outcomes, snapshot })
    }

    pub fn status(&self) -> Result<PathBuf, PoseidonError> {
        write_status_snapshot(&self.dir, &self.manifest, &self.inventory())
    }

    pub fn clean(&self) -> CleanReport {
        let report = remove_completed_archives(&self.dir, &self.inventory());
        info!(
            removed = report.removed,
            dirs_removed = report.dirs_removed,
            "cleanup finished"
        );
        report
    }

    fn execute(&self, action: Action) -> ActionOutcome {
        debug!(run = %action.run(), kind = action.kind(), "executing");
        match action {
            Action::Fetch { run } => {
                let ok = self.executor.fetch_archive(&self.dir, &run);
                ActionOutcome::Fetched { run, ok }
            }
            Action::Convert { run, archive } => {
                // The archive may have been removed since the inventory was taken.
                if !archive.exists() && find_archive(&self.dir, &run).is_none() {
                    return ActionOutcome::MissingArchive { run };
                }
                let job_id = self.executor.submit_convert(&self.dir, &run);
                ActionOutcome::Submitted { run, job_id }
            }
        }
    }
}
