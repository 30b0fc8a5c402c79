use std::path::PathBuf;

/// Errors raised while parsing audio, detecting spaces or exporting narration
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed WAVE container: {0}")]
    MalformedContainer(String),

    #[error("Sample data truncated: expected {expected} bytes, read {read}")]
    TruncatedData { expected: u64, read: u64 },

    #[error("Transcoder not found: {0:?}")]
    TranscoderNotFound(PathBuf),

    #[error("Transcoder {program:?} failed (exit code {exit_code:?}): {stderr}")]
    TranscodeFailed {
        program: PathBuf,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Invalid interval: end {end_ms} ms must be after start {start_ms} ms")]
    InvalidInterval { start_ms: f64, end_ms: f64 },

    #[error("Invalid description: {0}")]
    InvalidDescription(String),

    #[error("Export cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for this crate
pub type Result<T> = std::result::Result<T, Error>;
