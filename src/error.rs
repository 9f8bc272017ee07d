// Engine boundary errors
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// The requested domain would be inverted or non-finite; the previous
    /// domain is retained.
    #[error("viewport request rejected: {0}")]
    Viewport(&'static str),

    /// The engine task has shut down and can no longer answer.
    #[error("engine is not running")]
    Closed,
}
