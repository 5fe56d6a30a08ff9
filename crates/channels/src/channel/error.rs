use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChannelError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("http error: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("unsupported channel: {0}")]
    UnsupportedChannel(String),
    #[error("json error: {0}")]
    JsonError(#[from] serde_json::Error),
    #[error("no streams found")]
    NoStreamsFound,
    #[error("missing metadata: {0}")]
    MissingMetadata(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("hls playlist error: {0}")]
    HlsPlaylistError(String),
    #[error("other error: {0}")]
    Other(String),
}
