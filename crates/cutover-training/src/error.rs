use std::time::Duration;
use thiserror::Error;

pub type TrainingResult<T> = std::result::Result<T, TrainingError>;

#[derive(Debug, Error)]
pub enum TrainingError {
    #[error("{operation} returned unexpected status {status}: {body}")]
    UnexpectedStatus { operation: &'static str, status: u16, body: String },

    #[error("training service rejected credentials after {attempts} attempts")]
    Unauthorized { attempts: u32 },

    #[error("training did not finish within {0:?}")]
    Timeout(Duration),

    #[error("waiting for training was cancelled")]
    Cancelled,

    #[error("request error: {0}")]
    Request(#[from] reqwest::Error),
}
