use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::LazyLock;

use regex::Regex;
use shell_escape::unix::escape;
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::domain::RunId;
use crate::fs_util::{exists_nonempty, find_archive, relocate_nested_archives};

static JOB_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Job\s*<(?P<id>\d+)>").unwrap());

pub const LOG_DIR: &str = "logs";

/// Side-effecting half of the workflow. Failures are reported as `false` /
/// `None`, never as errors.
pub trait Executor {
    /// Downloads the archive for `run` into `dir`; true iff a non-empty
    /// archive is present afterwards.
    fn fetch_archive(&self, dir: &Path, run: &RunId) -> bool;

    /// Submits a conversion job and returns the scheduler's job id.
    fn submit_convert(&self, dir: &Path, run: &RunId) -> Option<String>;
}

#[derive(Debug, Clone)]
pub enum ToolStatus {
    Ready,
    Missing { tools: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct SystemExecutor {
    config: ResolvedConfig,
    prefetch: Option<PathBuf>,
    fasterq_dump: Option<PathBuf>,
    pigz: Option<PathBuf>,
    gzip: Option<PathBuf>,
    bsub: Option<PathBuf>,
}

impl SystemExecutor {
    pub fn new(config: ResolvedConfig) -> Self {
        let tools = &config.tools;
        Self {
            prefetch: find_in_path(&tools.prefetch),
            fasterq_dump: find_in_path(&tools.fasterq_dump),
            pigz: find_in_path(&tools.pigz),
            gzip: find_in_path(&tools.gzip),
            bsub: find_in_path(&tools.bsub),
            config,
        }
    }

    pub fn tool_status(&self) -> ToolStatus {
        let tools = &self.config.tools;
        let mut missing = Vec::new();
        if self.prefetch.is_none() {
            missing.push(tools.prefetch.clone());
        }
        if self.fasterq_dump.is_none() {
            missing.push(tools.fasterq_dump.clone());
        }
        if self.pigz.is_none() && self.gzip.is_none() {
            missing.push(format!("{} or {}", tools.pigz, tools.gzip));
        }
        if self.bsub.is_none() {
            missing.push(tools.bsub.clone());
        }
        if missing.is_empty() {
            ToolStatus::Ready
        } else {
            ToolStatus::Missing { tools: missing }
        }
    }

    pub fn job_name(&self, run: &RunId) -> String {
        format!("{}{run}", self.config.job_prefix)
    }

    /// Bash body run by the scheduler: fasterq-dump into a scratch dir,
    /// compress (pigz preferred, gzip fallback), move results into `dir`, and
    /// drop the archive once R1 is non-empty and R2 is absent or non-empty.
    pub fn convert_script(&self, dir: &Path, run: &RunId) -> String {
        let threads = self.config.threads;
        let fqd = resolved_or_name(&self.fasterq_dump, &self.config.tools.fasterq_dump);
        let gzip = resolved_or_name(&self.gzip, &self.config.tools.gzip);
        let pigz = self
            .pigz
            .as_ref()
            .map(|path| path.to_string_lossy().to_string());
        let pigz_nonempty = escape(pigz.as_deref().unwrap_or("").into());
        let pigz_executable = escape(pigz.as_deref().unwrap_or("/bin/false").into());
        let cmp_primary = escape(pigz.as_deref().unwrap_or(&gzip).into());
        let cmp_fallback = escape(gzip.as_str().into());
        let id = run.as_str();

        let mut body = vec![
            "set -euo pipefail;".to_string(),
            format!("cd {};", escape(dir.to_string_lossy())),
            format!("mkdir -p {LOG_DIR} || true;"),
            format!("TMPD=\"${{LS_TMPDIR:-${{TMPDIR:-/tmp}}}}/fqd_{id}_$RANDOM\";"),
            "mkdir -p \"$TMPD\";".to_string(),
            format!(
                "{} --split-files --threads {threads} --temp \"$TMPD\" -O \"$TMPD\" {};",
                escape(fqd.as_str().into()),
                escape(id.into())
            ),
            format!(
                "if [[ -n {pigz_nonempty} ]] && [[ -x {pigz_executable} ]]; then CMP={cmp_primary}; else CMP={cmp_fallback}; fi;"
            ),
        ];
        for mate in [1, 2] {
            body.push(format!(
                "[[ -f \"$TMPD/{id}_{mate}.fastq\" ]] && \"$CMP\" -p {threads} \"$TMPD/{id}_{mate}.fastq\" 2>/dev/null || \"$CMP\" \"$TMPD/{id}_{mate}.fastq\" || true;"
            ));
        }
        body.extend([
            "mv \"$TMPD\"/*.fastq.gz . || true;".to_string(),
            "rm -rf \"$TMPD\";".to_string(),
            format!(
                "if [[ -s \"{id}_1.fastq.gz\" && ( ! -e \"{id}_2.fastq.gz\" || -s \"{id}_2.fastq.gz\" ) ]]; then "
            ),
            format!("  [[ -f \"{id}.sra\" ]] && rm -f \"{id}.sra\";"),
            format!("  [[ -f \"{id}.sralite\" ]] && rm -f \"{id}.sralite\";"),
            "fi;".to_string(),
        ]);
        body.join(" ")
    }

    /// Arguments passed to `bsub`, ending with the `bash -lc <body>` command.
    pub fn submit_args(&self, dir: &Path, run: &RunId) -> Vec<String> {
        let job_name = self.job_name(run);
        let logs = dir.join(LOG_DIR);
        vec![
            "-J".to_string(),
            job_name.clone(),
            "-oo".to_string(),
            logs.join(format!("{job_name}.out.txt"))
                .to_string_lossy()
                .to_string(),
            "-eo".to_string(),
            logs.join(format!("{job_name}.err.txt"))
                .to_string_lossy()
                .to_string(),
            "-cwd".to_string(),
            dir.to_string_lossy().to_string(),
            "-n".to_string(),
            self.config.threads.to_string(),
            "bash".to_string(),
            "-lc".to_string(),
            self.convert_script(dir, run),
        ]
    }
}

impl Executor for SystemExecutor {
    fn fetch_archive(&self, dir: &Path, run: &RunId) -> bool {
        let program = resolved_or_name(&self.prefetch, &self.config.tools.prefetch);
        let args = [
            run.as_str().to_string(),
            "-X".to_string(),
            self.config.max_size.clone(),
        ];
        let Some(output) = run_cmd(Path::new(&program), &args, Some(dir)) else {
            return false;
        };
        if !output.status.success() {
            debug!(
                run = %run,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "prefetch failed"
            );
            return false;
        }
        relocate_nested_archives(dir, run);
        find_archive(dir, run)
            .map(|path| exists_nonempty(&path))
            .unwrap_or(false)
    }

    fn submit_convert(&self, dir: &Path, run: &RunId) -> Option<String> {
        if self.pigz.is_none() && self.gzip.is_none() {
            warn!(run = %run, "neither pigz nor gzip found in PATH; compression may fail");
        }
        if let Err(err) = fs::create_dir_all(dir.join(LOG_DIR)) {
            debug!(error = %err, "could not create log directory");
        }
        let program = resolved_or_name(&self.bsub, &self.config.tools.bsub);
        let output = run_cmd(Path::new(&program), &self.submit_args(dir, run), None)?;
        if !output.status.success() {
            debug!(
                run = %run,
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "bsub failed"
            );
            return None;
        }
        let mut text = String::from_utf8_lossy(&output.stdout).to_string();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        parse_job_id(&text)
    }
}

/// Pulls the numeric id out of `Job <12345> is submitted to queue <normal>.`
pub fn parse_job_id(text: &str) -> Option<String> {
    JOB_RE
        .captures(text)
        .and_then(|caps| caps.name("id"))
        .map(|id| id.as_str().to_string())
}

fn run_cmd(program: &Path, args: &[String], cwd: Option<&Path>) -> Option<Output> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    if let Some(dir) = cwd {
        cmd.current_dir(dir);
    }
    match cmd.output() {
        Ok(output) => Some(output),
        Err(err) => {
            debug!(program = %program.display(), error = %err, "failed to spawn");
            None
        }
    }
}

fn resolved_or_name(resolved: &Option<PathBuf>, name: &str) -> String {
    resolved
        .as_ref()
        .map(|path| path.to_string_lossy().to_string())
        .unwrap_or_else(|| name.to_string())
}

fn find_in_path(name: &str) -> Option<PathBuf> {
    if name.contains('/') {
        let path = PathBuf::from(name);
        return path.is_file().then_some(path);
    }
    let path_var = std::env::var_os("PATH")?;
    for path in std::env::split_paths(&path_var) {
        let plain = path.join(name);
        if plain.is_file() {
            return Some(plain);
        }
    }
    None
}
