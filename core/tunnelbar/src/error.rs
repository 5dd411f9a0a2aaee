use thiserror::Error;
use tunnelbar_core::TunnelbarError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] TunnelbarError),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Rejected(String),

    #[error("Timed out after {seconds}s waiting for {what}")]
    Timeout { what: String, seconds: u64 },
}

pub type CliResult<T = ()> = Result<T, CliError>;
