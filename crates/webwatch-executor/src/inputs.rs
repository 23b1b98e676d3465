//! Resolve a job's code, variables and modules into a [`JobRequest`].

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;
use webwatch_core::Job;

use crate::error::ExecError;
use crate::types::JobRequest;

const DEFAULT_VARS_FILE: &str = "vars.json";
const DEFAULT_MODULES_DIR: &str = "modules";
const MODULE_EXTENSION: &str = "mjs";

/// Read everything `job` needs from disk.
///
/// Relative paths resolve against `base_dir` (the jobs document's directory).
/// `vars_file` and `modules_dir` default to `vars.json` and `modules/` next to
/// the code file; a missing modules directory means no modules.
pub async fn load_request(job: &Job, base_dir: &Path) -> Result<JobRequest, ExecError> {
    let code_path = resolve(base_dir, &job.code_file);
    let code_dir = code_path
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf());

    let vars_path = match &job.vars_file {
        Some(p) => resolve(base_dir, p),
        None => code_dir.join(DEFAULT_VARS_FILE),
    };
    let modules_path = match &job.modules_dir {
        Some(p) => resolve(base_dir, p),
        None => code_dir.join(DEFAULT_MODULES_DIR),
    };

    let code = read_text(&code_path).await?;
    let vars = read_vars(&vars_path).await?;
    let modules = read_modules(&modules_path).await?;

    debug!(
        job = %job.name,
        code = %code_path.display(),
        vars = vars.len(),
        modules = modules.len(),
        "job inputs loaded"
    );
    Ok(JobRequest {
        code,
        vars,
        modules,
    })
}

fn resolve(base_dir: &Path, path: &str) -> PathBuf {
    let p = Path::new(path);
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        base_dir.join(p)
    }
}

fn input_error(path: &Path, reason: impl ToString) -> ExecError {
    ExecError::Input {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

async fn read_text(path: &Path) -> Result<String, ExecError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| input_error(path, e))
}

async fn read_vars(path: &Path) -> Result<BTreeMap<String, String>, ExecError> {
    let raw = read_text(path).await?;
    serde_json::from_str(&raw)
        .map_err(|e| input_error(path, format!("expected a JSON object of strings: {e}")))
}

async fn read_modules(dir: &Path) -> Result<BTreeMap<String, String>, ExecError> {
    let mut modules = BTreeMap::new();
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(modules),
        Err(e) => return Err(input_error(dir, e)),
    };

    while let Some(entry) = entries.next_entry().await.map_err(|e| input_error(dir, e))? {
        let path = entry.path();
        let is_module = path.extension().and_then(|e| e.to_str()) == Some(MODULE_EXTENSION);
        if !is_module || path.is_dir() {
            continue;
        }
        let Some(name) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        let source = read_text(&path).await?;
        modules.insert(name.to_string(), source);
    }
    Ok(modules)
}
