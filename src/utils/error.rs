use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Inspection failed for {platform}: {message}")]
    Inspection { platform: String, message: String },

    #[error("Config load error: {0}")]
    ConfigLoad(String),

    #[error("Refresh error: {0}")]
    Refresh(String),

    #[error("Startup configuration error: {0}")]
    StartupConfiguration(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}

impl AppError {
    pub fn inspection(platform: impl Into<String>, message: impl std::fmt::Display) -> Self {
        AppError::Inspection {
            platform: platform.into(),
            message: message.to_string(),
        }
    }

    /// Only startup failures are allowed to end the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, AppError::StartupConfiguration(_))
    }
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;
