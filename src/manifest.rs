use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{RunId, Sample};
use crate::error::PoseidonError;

pub const MANIFEST_FILE: &str = "sample_list.txt";

// Also matches accessions embedded in file names such as SRR1_1.fastq.gz.
static RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(SRR\d+|ERR\d+)").unwrap());

/// Samples from `sample_list.txt`, in order of first appearance.
#[derive(Debug, Clone, Default)]
pub struct Manifest {
    samples: Vec<Sample>,
}

impl Manifest {
    pub fn from_samples(samples: Vec<Sample>) -> Self {
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Every distinct run once, in first-appearance order.
    pub fn all_runs(&self) -> Vec<RunId> {
        let mut seen = HashSet::new();
        let mut runs = Vec::new();
        for sample in &self.samples {
            for run in &sample.runs {
                if seen.insert(run.clone()) {
                    runs.push(run.clone());
                }
            }
        }
        runs
    }
}

pub fn parse_manifest(path: &Path) -> Result<Manifest, PoseidonError> {
    if !path.exists() {
        return Err(PoseidonError::ManifestNotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path).map_err(|err| PoseidonError::ManifestRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;

    let manifest = parse_manifest_str(&content);
    if manifest.is_empty() {
        return Err(PoseidonError::ManifestEmpty(path.to_path_buf()));
    }
    debug!(
        samples = manifest.len(),
        path = %path.display(),
        "parsed manifest"
    );
    Ok(manifest)
}

/// Parses manifest text, silently dropping lines without usable accessions.
pub fn parse_manifest_str(content: &str) -> Manifest {
    let mut samples: Vec<Sample> = Vec::new();
    let mut index = HashMap::<String, usize>::new();

    for line in content.lines() {
        let parts = line.split_whitespace().collect::<Vec<_>>();
        if parts.len() < 3 {
            continue;
        }
        let runs = extract_runs(&parts[1..3].join(","));
        if runs.is_empty() {
            continue;
        }
        let id = parts[0].to_string();
        match index.get(&id) {
            Some(&pos) => samples[pos].runs = runs,
            None => {
                index.insert(id.clone(), samples.len());
                samples.push(Sample { id, runs });
            }
        }
    }

    Manifest::from_samples(samples)
}

fn extract_runs(text: &str) -> Vec<RunId> {
    let mut output = Vec::new();
    for value in RUN_RE.find_iter(text) {
        if let Ok(run) = value.as_str().parse::<RunId>() {
            output.push(run);
        }
    }
    output.sort();
    output.dedup();
    output
}
