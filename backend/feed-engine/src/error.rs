/// Error types for feed-engine
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeedError {
    #[error("Configuration error: {0}")]
    Config(String),

    /// The 64-bit sequence space is used up. Wrapping would break the
    /// global recency order, so this is fatal for the engine instance.
    #[error("Sequence counter exhausted")]
    SequenceExhausted,
}

/// Result type alias for feed engine operations
pub type FeedResult<T> = Result<T, FeedError>;
