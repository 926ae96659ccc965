use thiserror::Error;

/// Failures surfaced by the AR viewer.
///
/// Every variant except [`ViewerError::GraphicsContext`] is recoverable: the
/// viewer logs it, updates the UI and keeps the render loop alive.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViewerError {
    #[error("immersive AR is not supported on this platform")]
    Unsupported,

    #[error("AR session request was rejected: {0}")]
    SessionRejected(String),

    #[error("failed to create graphics context: {0}")]
    GraphicsContext(String),

    #[error("hit-test source unavailable: {0}")]
    HitTestSource(String),

    #[error("failed to load model {path}: {reason}")]
    AssetLoad { path: String, reason: String },

    #[error("model index {index} is out of range (catalog has {len} entries)")]
    InvalidSelection { index: usize, len: usize },

    #[error("platform call failed: {0}")]
    Platform(String),
}

/// Result alias used by the session and selection APIs.
pub type Result<T> = std::result::Result<T, ViewerError>;
