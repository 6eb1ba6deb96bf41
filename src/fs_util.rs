use std::fs;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use tracing::debug;

use crate::domain::{ArchiveKind, RunId};

const SNIFF_LINES: usize = 8;

pub fn exists_nonempty(path: &Path) -> bool {
    fs::metadata(path)
        .map(|meta| meta.is_file() && meta.len() > 0)
        .unwrap_or(false)
}

/// Reads the first few lines of a gzipped FASTQ and checks the record framing.
pub fn fastq_header_ok(path: &Path) -> bool {
    let Ok(file) = fs::File::open(path) else {
        return false;
    };
    let reader = BufReader::new(MultiGzDecoder::new(file));
    let mut lines = Vec::with_capacity(SNIFF_LINES);
    for line in reader.lines().take(SNIFF_LINES) {
        match line {
            Ok(line) => lines.push(line),
            Err(err) => {
                debug!(path = %path.display(), error = %err, "fastq sniff failed");
                return false;
            }
        }
    }
    if lines.len() < 4 {
        return false;
    }
    lines[0].starts_with('@') && lines[..4].iter().any(|line| line.contains('+'))
}

pub fn find_archive(dir: &Path, run: &RunId) -> Option<PathBuf> {
    ArchiveKind::ALL
        .iter()
        .map(|kind| dir.join(kind.file_name(run)))
        .find(|path| path.exists())
}

/// Moves `*.sra*` files that prefetch left in `dir/<run>/` up into `dir`.
/// Existing files in `dir` are never overwritten. Returns the number moved.
pub fn relocate_nested_archives(dir: &Path, run: &RunId) -> usize {
    let nested = dir.join(run.as_str());
    if !nested.is_dir() {
        return 0;
    }
    let mut moved = 0;
    if let Ok(entries) = fs::read_dir(&nested) {
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(name) = path.file_name() else {
                continue;
            };
            let is_archive = name
                .to_str()
                .map(|value| value.contains(".sra"))
                .unwrap_or(false);
            if !is_archive || !path.is_file() {
                continue;
            }
            let target = dir.join(name);
            if target.exists() {
                continue;
            }
            match fs::rename(&path, &target) {
                Ok(()) => moved += 1,
                Err(err) => debug!(from = %path.display(), error = %err, "rename failed"),
            }
        }
    }
    remove_dir_if_empty(&nested);
    moved
}

/// Removes `path` only when it is an empty directory.
pub fn remove_dir_if_empty(path: &Path) -> bool {
    let is_empty = fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false);
    is_empty && fs::remove_dir(path).is_ok()
}
