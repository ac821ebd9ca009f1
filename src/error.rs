use thiserror::Error;

/// Failures that abort a whole scan.
///
/// Per-port network failures are not represented here: a refused, timed out or
/// unreachable probe is simply reported as not-open.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Invalid or missing target/parameters, detected before any worker starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// The scan machinery itself failed (a worker or the producer died).
    #[error("scan aborted: {0}")]
    Fatal(String),
}

impl ScanError {
    pub(crate) fn config(msg: impl Into<String>) -> Self {
        ScanError::Config(msg.into())
    }

    pub fn is_config(&self) -> bool {
        matches!(self, ScanError::Config(_))
    }
}

impl From<tokio::task::JoinError> for ScanError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            ScanError::Fatal(format!("task panicked: {err}"))
        } else {
            ScanError::Fatal(format!("task aborted: {err}"))
        }
    }
}

pub type ScanResult<T> = Result<T, ScanError>;
