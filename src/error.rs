use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} returned status {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("request to {url} was cancelled")]
    Cancelled { url: String },
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ParseError {
    #[error("found {inputs} sample inputs but {outputs} sample outputs")]
    UnpairedSamples { inputs: usize, outputs: usize },

    #[error("invalid identifier {0:?}: only ASCII letters, digits, '_' and '-' are allowed")]
    InvalidId(String),
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no samples archived at {}", .0.display())]
    MissingTask(PathBuf),

    #[error("sample {index} has no matching {missing} file")]
    Unpaired { index: usize, missing: &'static str },
}

impl ArchiveError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("failed to launch {}: {source}", .program.display())]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to talk to the solution process: {0}")]
    Pipe(#[source] std::io::Error),

    #[error("failed to wait for the solution process: {0}")]
    Wait(#[source] std::io::Error),

    #[error("solution run was cancelled")]
    Cancelled,
}

/// Everything that can sink a single task during a harvest.
#[derive(Error, Debug)]
pub enum HarvestError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("harvest cancelled before the task started")]
    Cancelled,
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("failed to render report: {0}")]
    Template(#[from] askama::Error),

    #[error("failed to serialize report: {0}")]
    Json(#[from] serde_json::Error),
}
