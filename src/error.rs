use thiserror::Error;

/// Main error type for devlogs
#[derive(Debug, Error)]
pub enum DevLogsError {
    // Log store errors
    #[error("Log error: {0}")]
    LogError(String),

    #[error("Failed to open log file: {0}")]
    LogFileError(String),

    #[error("Log rotation failed: {0}")]
    LogRotationError(String),

    // Channel errors
    #[error("Channel error: {0}")]
    ChannelError(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid configuration file: {0}")]
    InvalidConfig(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // Query validation errors
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    // Collector errors
    #[error("Server capture is already installed")]
    AlreadyInstalled,

    // IO errors (automatically converted from std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for devlogs operations
pub type Result<T> = std::result::Result<T, DevLogsError>;
