use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown scenario `{0}` (see `harness list`)")]
    UnknownScenario(String),
    #[error("preload library {name} not found (searched {searched:?}); build rtcheck-abi first")]
    MissingPreload { name: String, searched: Vec<PathBuf> },
    #[error("scenario binary {0} not found")]
    MissingScenarioBinary(PathBuf),
    #[error("run log {path} is malformed: {first} ({count} problem(s))")]
    InvalidLog {
        path: PathBuf,
        first: String,
        count: usize,
    },
}
