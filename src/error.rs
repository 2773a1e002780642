use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("could not read ticket payload from {path}: {reason}")]
    ConfigRead { path: String, reason: String },
    #[error("issue tracker error: {0}")]
    IssueTracker(String),
    #[error("invalid issue key '{0}'")]
    InvalidKey(String),
    #[error("{operation}: {source}")]
    Transport {
        operation: String,
        #[source]
        source: Box<AppError>,
    },
}

impl AppError {
    /// Wraps a failure with the operation that was being attempted.
    pub fn during(self, operation: impl Into<String>) -> Self {
        AppError::Transport {
            operation: operation.into(),
            source: Box::new(self),
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
