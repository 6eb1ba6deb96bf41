use crate::domain::{Action, RunState};
use crate::inventory::RunRecord;

/// Zero or one action for a run: nothing when its reads are complete, a fetch
/// when the archive is missing or empty, a convert otherwise. A record marked
/// convertible but carrying no archive path is fetched again.
pub fn plan_run(record: &RunRecord) -> Option<Action> {
    match record.state() {
        RunState::Done => None,
        RunState::NeedFetch => Some(Action::Fetch {
            run: record.run.clone(),
        }),
        RunState::NeedConvert => match record.archive.clone() {
            Some(archive) => Some(Action::Convert {
                run: record.run.clone(),
                archive,
            }),
            None => Some(Action::Fetch {
                run: record.run.clone(),
            }),
        },
    }
}

pub fn plan(records: &[RunRecord]) -> Vec<Action> {
    records.iter().filter_map(plan_run).collect()
}
