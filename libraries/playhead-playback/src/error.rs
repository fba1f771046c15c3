//! Error types for playback control

use thiserror::Error;

/// Playback errors
///
/// Caller mistakes on the command surface (pausing while stopped, skipping
/// out of range, ...) are reported as `false`, not as errors. This type
/// covers the engine boundary, configuration and channel plumbing.
#[derive(Debug, Error)]
pub enum PlaybackError {
    /// The engine refused the song reference
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// Engine command failure
    #[error("Engine error: {0}")]
    Engine(String),

    /// Controller was released
    #[error("Controller has been released")]
    Released,

    /// Configuration value out of range
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Event channel has no receiver left
    #[error("Event channel closed")]
    ChannelClosed,

    /// An event loop already consumes the engine events
    #[error("Event loop already running")]
    EventLoopRunning,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for playback operations
pub type Result<T> = std::result::Result<T, PlaybackError>;
