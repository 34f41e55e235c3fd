//! Error types for epfem-io

use thiserror::Error;

pub type Result<T> = std::result::Result<T, IoError>;

#[derive(Error, Debug)]
pub enum IoError {
    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Unsupported cell with {0} points")]
    UnsupportedCell(usize),

    #[error("Unsupported schema version {found} (expected {expected})")]
    SchemaVersion { found: u32, expected: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
