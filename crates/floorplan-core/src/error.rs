use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FloorplanError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{path}: line {line}: {msg}")]
    Parse {
        path: PathBuf,
        line: usize,
        msg: String,
    },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("No feasible bin width for '{instance}' (total area {total_area}, outline {fixed_width}x{fixed_height})")]
    NoFeasibleWidth {
        instance: String,
        total_area: i64,
        fixed_width: i32,
        fixed_height: i32,
    },

    #[error("Nothing to place: instance has no blocks")]
    Empty,
}

pub type Result<T> = std::result::Result<T, FloorplanError>;
