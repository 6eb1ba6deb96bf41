use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::PoseidonError;

const RUN_PREFIXES: [&str; 2] = ["SRR", "ERR"];

/// A sequencing run accession (`SRR…` or `ERR…`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RunId(String);

impl RunId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn r1_name(&self) -> String {
        format!("{}_1.fastq.gz", self.0)
    }

    pub fn r2_name(&self) -> String {
        format!("{}_2.fastq.gz", self.0)
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = PoseidonError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim();
        let is_valid = RUN_PREFIXES.iter().any(|prefix| {
            normalized
                .strip_prefix(prefix)
                .map(|digits| !digits.is_empty() && digits.chars().all(|ch| ch.is_ascii_digit()))
                .unwrap_or(false)
        });
        if !is_valid {
            return Err(PoseidonError::InvalidRunId(value.to_string()));
        }
        Ok(Self(normalized.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sample {
    pub id: String,
    pub runs: Vec<RunId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Sra,
    SraLite,
}

impl ArchiveKind {
    /// Lookup order when both files are present.
    pub const ALL: [ArchiveKind; 2] = [ArchiveKind::Sra, ArchiveKind::SraLite];

    pub fn extension(self) -> &'static str {
        match self {
            ArchiveKind::Sra => "sra",
            ArchiveKind::SraLite => "sralite",
        }
    }

    pub fn file_name(self, run: &RunId) -> String {
        format!("{run}.{}", self.extension())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Fetch { run: RunId },
    Convert { run: RunId, archive: PathBuf },
}

impl Action {
    pub fn run(&self) -> &RunId {
        match self {
            Action::Fetch { run } | Action::Convert { run, .. } => run,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::Fetch { .. } => "download",
            Action::Convert { .. } => "convert",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    NeedFetch,
    NeedConvert,
    Done,
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunState::NeedFetch => write!(f, "NEED_FETCH"),
            RunState::NeedConvert => write!(f, "NEED_CONVERT"),
            RunState::Done => write!(f, "DONE"),
        }
    }
}
