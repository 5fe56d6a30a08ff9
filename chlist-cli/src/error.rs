use channels_parser::channel::error::ChannelError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Channel(#[from] ChannelError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] anyhow::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("No stream matches the given filters")]
    NoMatchingStream,

    #[error("Operation timed out")]
    Timeout,

    #[error("Operation cancelled by user")]
    UserCancelled,
}

impl CliError {
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        CliError::InvalidInput(message.into())
    }

    pub fn invalid_filter<S: Into<String>>(message: S) -> Self {
        CliError::InvalidFilter(message.into())
    }

    pub fn no_streams_found() -> Self {
        CliError::Channel(ChannelError::NoStreamsFound)
    }

    pub fn no_matching_stream() -> Self {
        CliError::NoMatchingStream
    }

    pub fn timeout() -> Self {
        CliError::Timeout
    }

    pub fn user_cancelled() -> Self {
        CliError::UserCancelled
    }
}
