//! Jobs document loading. The file extension selects the syntax.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CoreError, Result};
use crate::types::Job;

/// On-disk shape of a jobs document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobsFile {
    #[serde(default)]
    pub jobs: Vec<Job>,
}

/// A loaded jobs document together with where it came from.
///
/// Relative input paths of every job resolve against [`JobsDocument::base_dir`].
#[derive(Debug, Clone)]
pub struct JobsDocument {
    pub path: PathBuf,
    pub jobs: Vec<Job>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Syntax {
    Json,
    Yaml,
    Toml,
}

impl Syntax {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "json" => Ok(Syntax::Json),
            "yaml" | "yml" => Ok(Syntax::Yaml),
            "toml" => Ok(Syntax::Toml),
            _ => Err(CoreError::UnsupportedFormat { ext }),
        }
    }
}

impl JobsDocument {
    /// Read and parse the jobs document at `path`.
    ///
    /// The path is made absolute first so relative inputs keep resolving
    /// after the working directory changes.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = absolute(path.as_ref())?;
        let syntax = Syntax::from_path(&path)?;

        let raw = std::fs::read_to_string(&path).map_err(|source| CoreError::Read {
            path: path.clone(),
            source,
        })?;

        let file = parse(&raw, syntax).map_err(|reason| CoreError::Parse {
            path: path.clone(),
            reason,
        })?;

        debug!(path = %path.display(), jobs = file.jobs.len(), "jobs document loaded");
        Ok(Self {
            path,
            jobs: file.jobs,
        })
    }

    /// Directory containing the document.
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new("."))
    }

    /// Find a job by its exact display name.
    pub fn find(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

fn parse(raw: &str, syntax: Syntax) -> std::result::Result<JobsFile, String> {
    match syntax {
        Syntax::Json => serde_json::from_str(raw).map_err(|e| e.to_string()),
        Syntax::Yaml => serde_yaml::from_str(raw).map_err(|e| e.to_string()),
        Syntax::Toml => toml::from_str(raw).map_err(|e| e.to_string()),
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = std::env::current_dir().map_err(|source| CoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(cwd.join(path))
}
