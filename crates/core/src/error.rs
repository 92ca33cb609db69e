/// Result alias that carries the custom [`FeedError`] type.
pub type Result<T> = std::result::Result<T, FeedError>;

/// Common error type for the core crate.
///
/// Navigation never fails: conditions such as an empty catalog or a rejected
/// autoplay attempt degrade into states and flags. The variants below cover
/// configuration, catalog parsing, audio backends and the voice proxy channel.
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// Free-form message for conditions without a dedicated variant.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Malformed JSON while reading configuration, catalogs or proxy frames.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// The audio backend could not load a source.
    #[error("failed to load audio `{source_ref}`: {reason}")]
    AudioLoad { source_ref: String, reason: String },
    /// The runtime refused to start playback (typically no prior gesture).
    #[error("playback rejected: {0}")]
    PlaybackRejected(String),
    #[error("voice proxy channel is not open")]
    ProxyNotOpen,
    #[error("invalid voice proxy endpoint `{0}`")]
    InvalidEndpoint(String),
    #[error("unknown recording `{0}`")]
    UnknownRecording(String),
}

impl FeedError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }
}

impl From<&str> for FeedError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for FeedError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
