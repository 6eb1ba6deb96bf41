use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum PoseidonError {
    #[error("invalid run accession: {0}")]
    InvalidRunId(String),

    #[error("missing manifest {}", .0.display())]
    #[diagnostic(help("each sample directory needs a sample_list.txt"))]
    ManifestNotFound(PathBuf),

    #[error("no valid samples with SRR/ERR IDs found in {}", .0.display())]
    ManifestEmpty(PathBuf),

    #[error("failed to read manifest at {}: {message}", path.display())]
    ManifestRead { path: PathBuf, message: String },

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
